use std::io::{self, Write};

use kanal::AsyncReceiver;
use utsushi_types::{AppEvent, TranslationEventKind};

use crate::panes::PaneBoard;

/// Terminal front-end: renders the pane board as plain text.
pub struct ConsolePresenter<W: Write> {
    board: PaneBoard,
    out: W,
    /// Engine whose streamed line is still open
    streaming: Option<String>,
}

impl<W: Write> ConsolePresenter<W> {
    pub fn new(out: W) -> Self {
        Self {
            board: PaneBoard::default(),
            out,
            streaming: None,
        }
    }

    pub fn board(&self) -> &PaneBoard {
        &self.board
    }

    pub fn handle(&mut self, event: &AppEvent) -> io::Result<()> {
        if !self.board.apply(event) {
            return Ok(());
        }

        if let AppEvent::Translation(event) = event {
            match &event.kind {
                TranslationEventKind::Chunk(fragment) => {
                    if self.streaming.as_deref() != Some(event.engine.as_str()) {
                        self.close_stream()?;
                        writeln!(self.out, "── {} ──", event.engine)?;
                        self.streaming = Some(event.engine.clone());
                    }
                    write!(self.out, "{fragment}")?;
                }
                TranslationEventKind::Complete
                    if self.streaming.as_deref() == Some(event.engine.as_str()) =>
                {
                    self.close_stream()?;
                }
                _ => {
                    self.close_stream()?;
                    if let Some(pane) = self.board.pane(&event.engine) {
                        writeln!(self.out, "── {} ──", pane.engine)?;
                        writeln!(self.out, "{}", pane.text)?;
                    }
                }
            }
            return self.out.flush();
        }

        self.close_stream()?;
        match event {
            AppEvent::ShowOverlay(bounds) => writeln!(
                self.out,
                "Select a region on {}x{}: `press X Y` twice (`move X Y` to preview), `cancel_selection` to abort",
                bounds.width, bounds.height
            )?,
            AppEvent::SelectionChanged(Some(region)) => writeln!(
                self.out,
                "  selection {}x{} at ({}, {})",
                region.width, region.height, region.x, region.y
            )?,
            AppEvent::OcrResult { text, engine, .. } => {
                writeln!(self.out, "── OCR ({engine}) ──")?;
                writeln!(self.out, "{text}")?;
            }
            AppEvent::TranslationStarted { engines, .. } => {
                writeln!(self.out, "Translating with {}", engines.join(", "))?;
            }
            AppEvent::AvailableEngines { ocr, translation } => {
                writeln!(self.out, "OCR engines: {}", ocr.join(", "))?;
                writeln!(self.out, "Translation engines: {}", translation.join(", "))?;
            }
            AppEvent::TranslationEnginesChanged { active } => {
                writeln!(self.out, "Active translation engines: {}", active.join(", "))?;
            }
            AppEvent::HideOverlay | AppEvent::SelectionChanged(None) => {}
            _ => writeln!(self.out, "[{}]", self.board.status)?,
        }
        self.out.flush()
    }

    fn close_stream(&mut self) -> io::Result<()> {
        if self.streaming.take().is_some() {
            writeln!(self.out)?;
        }
        Ok(())
    }

    /// Render events until the channel closes.
    pub async fn run(mut self, app_to_ui: AsyncReceiver<AppEvent>) -> io::Result<()> {
        while let Ok(event) = app_to_ui.recv().await {
            self.handle(&event)?;
        }
        tracing::debug!("[UI] Console presenter stopped");
        Ok(())
    }
}
