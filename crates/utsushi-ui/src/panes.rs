use utsushi_types::{AppEvent, CaptureRegion, TranslationEvent, TranslationEventKind};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Pane {
    pub engine: String,
    pub text: String,
    pub failed: bool,
    pub finished: bool,
    /// Generation the text belongs to
    pub generation: u64,
}

impl Pane {
    fn new(engine: &str) -> Self {
        Self {
            engine: engine.to_string(),
            ..Default::default()
        }
    }

    /// Drop content older than `generation`.
    fn renew(&mut self, generation: u64) {
        if self.generation < generation {
            self.text.clear();
            self.failed = false;
            self.finished = false;
            self.generation = generation;
        }
    }
}

/// What the results view shows. Front-ends apply every [`AppEvent`] here and
/// render from it, so stale translation output never reaches the screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaneBoard {
    pub ocr_text: String,
    pub ocr_engine: Option<String>,
    pub panes: Vec<Pane>,
    /// Newest generation started; gates the Re-translate button
    pub generation: u64,
    pub retranslate_enabled: bool,
    pub status: String,
    pub available_ocr: Vec<String>,
    pub available_translation: Vec<String>,
    pub selecting: bool,
    pub selection: Option<CaptureRegion>,
}

impl Default for PaneBoard {
    fn default() -> Self {
        Self {
            ocr_text: String::new(),
            ocr_engine: None,
            panes: Vec::new(),
            generation: 0,
            retranslate_enabled: true,
            status: "Starting".to_string(),
            available_ocr: Vec::new(),
            available_translation: Vec::new(),
            selecting: false,
            selection: None,
        }
    }
}

impl PaneBoard {
    /// Fold `event` into the board. Returns `false` if it was ignored.
    pub fn apply(&mut self, event: &AppEvent) -> bool {
        match event {
            AppEvent::ShowOverlay(_) => {
                self.selecting = true;
                self.selection = None;
                self.status = "Select a region".to_string();
            }
            AppEvent::HideOverlay => {
                self.selecting = false;
                self.selection = None;
            }
            AppEvent::SelectionChanged(selection) => self.selection = *selection,
            AppEvent::OcrResult {
                text,
                engine,
                translate,
            } => {
                self.ocr_text = text.clone();
                self.ocr_engine = Some(engine.clone());
                self.status = if *translate {
                    "Translating".to_string()
                } else {
                    "OCR done".to_string()
                };
            }
            AppEvent::OcrFailed { engine, message } => {
                self.status = match engine {
                    Some(engine) => format!("OCR failed ({engine}): {message}"),
                    None => format!("OCR failed: {message}"),
                };
            }
            AppEvent::TranslationStarted {
                generation,
                engines,
            } => {
                // only the listed panes move on; a per-engine retry leaves
                // the others streaming under their own generation
                let mut renewed = false;
                for engine in engines {
                    let pane = self.pane_mut(engine);
                    if pane.generation <= *generation {
                        pane.renew(*generation);
                        renewed = true;
                    }
                }
                if !renewed {
                    return false;
                }
                if *generation > self.generation {
                    self.start_generation(*generation);
                }
            }
            AppEvent::Translation(event) => return self.apply_translation(event),
            AppEvent::OcrEngineChanged { name } => {
                self.ocr_engine = Some(name.clone());
                self.status = format!("OCR engine: {name}");
            }
            AppEvent::TranslationEnginesChanged { active } => {
                let mut panes = Vec::with_capacity(active.len());
                for engine in active {
                    match self.panes.iter().position(|p| &p.engine == engine) {
                        Some(i) => panes.push(self.panes.remove(i)),
                        None => panes.push(Pane::new(engine)),
                    }
                }
                self.panes = panes;
            }
            AppEvent::EngineSwapFailed { message } => {
                self.status = format!("Engine change failed: {message}");
            }
            AppEvent::AvailableEngines { ocr, translation } => {
                self.available_ocr = ocr.clone();
                self.available_translation = translation.clone();
            }
            AppEvent::Status(status) => self.status = status.clone(),
            AppEvent::BackendReady => self.status = "Ready".to_string(),
            _ => return false,
        }
        true
    }

    fn apply_translation(&mut self, event: &TranslationEvent) -> bool {
        let pane = self.pane_mut(&event.engine);
        if event.generation < pane.generation {
            tracing::debug!(
                "Discarding stale result from '{}' (generation {} < {})",
                event.engine,
                event.generation,
                pane.generation
            );
            return false;
        }
        pane.renew(event.generation);
        match &event.kind {
            TranslationEventKind::Ready(text) => pane.text = text.clone(),
            TranslationEventKind::Error(message) => {
                pane.text = format!("Error: {message}");
                pane.failed = true;
            }
            TranslationEventKind::Chunk(fragment) => pane.text.push_str(fragment),
            TranslationEventKind::Complete => {}
        }
        if event.is_terminal() {
            pane.finished = true;
        }

        if event.generation > self.generation {
            // results can overtake their TranslationStarted
            self.start_generation(event.generation);
        }
        if event.is_terminal() {
            if event.generation == self.generation {
                self.retranslate_enabled = true;
            }
            if self
                .panes
                .iter()
                .filter(|p| p.generation > 0)
                .all(|p| p.finished)
            {
                self.status = "Done".to_string();
            }
        }
        true
    }

    fn start_generation(&mut self, generation: u64) {
        self.generation = generation;
        self.retranslate_enabled = false;
        self.status = "Translating".to_string();
    }

    fn pane_mut(&mut self, engine: &str) -> &mut Pane {
        let index = match self.panes.iter().position(|p| p.engine == engine) {
            Some(index) => index,
            None => {
                self.panes.push(Pane::new(engine));
                self.panes.len() - 1
            }
        };
        &mut self.panes[index]
    }

    pub fn pane(&self, engine: &str) -> Option<&Pane> {
        self.panes.iter().find(|p| p.engine == engine)
    }
}
