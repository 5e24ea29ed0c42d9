use std::io::BufRead;
use std::sync::Arc;

use utsushi_ocr::{RegionSelector, actions};
use utsushi_types::{AppEvent, Point, PresetKind};

const HELP: &str = "\
commands:
  ocr_capture | only_ocr        select a region and OCR it (with/without translation)
  press X Y | move X Y          drive the selection
  cancel_selection              abort the selection
  retranslate [ENGINE]          translate the last OCR text again
  ocr ENGINE                    switch the OCR engine
  translate ENGINE[,ENGINE...]  set the translation engines
  preset add|rm ocr|translation NAME
  quit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Action(String),
    Press(Point),
    Move(Point),
    Retranslate(Option<String>),
    Ocr(String),
    Translate(Vec<String>),
    PresetAdd(PresetKind, String),
    PresetRm(PresetKind, String),
    Quit,
    Help,
}

pub fn parse_command(line: &str) -> Result<ConsoleCommand, String> {
    let line = line.trim();
    let (head, rest) = line
        .split_once(char::is_whitespace)
        .map(|(h, r)| (h, r.trim()))
        .unwrap_or((line, ""));

    match head {
        actions::OCR_CAPTURE | actions::ONLY_OCR | actions::CANCEL_SELECTION => {
            Ok(ConsoleCommand::Action(head.to_string()))
        }
        "press" => parse_point(rest).map(ConsoleCommand::Press),
        "move" => parse_point(rest).map(ConsoleCommand::Move),
        "retranslate" => Ok(ConsoleCommand::Retranslate(
            (!rest.is_empty()).then(|| rest.to_string()),
        )),
        "ocr" if !rest.is_empty() => Ok(ConsoleCommand::Ocr(rest.to_string())),
        "translate" => Ok(ConsoleCommand::Translate(
            rest.split(',')
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(str::to_string)
                .collect(),
        )),
        "preset" => parse_preset(rest),
        "quit" | "exit" => Ok(ConsoleCommand::Quit),
        "help" | "?" => Ok(ConsoleCommand::Help),
        _ => Err(format!("unknown command '{line}'")),
    }
}

fn parse_point(args: &str) -> Result<Point, String> {
    let mut parts = args.split_whitespace().map(str::parse::<i32>);
    match (parts.next(), parts.next(), parts.next()) {
        (Some(Ok(x)), Some(Ok(y)), None) => Ok(Point::new(x, y)),
        _ => Err(format!("expected two integer coordinates, got '{args}'")),
    }
}

fn parse_preset(args: &str) -> Result<ConsoleCommand, String> {
    let mut parts = args.splitn(3, char::is_whitespace);
    let (Some(op), Some(kind), Some(name)) = (parts.next(), parts.next(), parts.next()) else {
        return Err("usage: preset add|rm ocr|translation NAME".to_string());
    };
    let kind = match kind {
        "ocr" => PresetKind::Ocr,
        "translation" => PresetKind::Translation,
        other => return Err(format!("unknown preset kind '{other}'")),
    };
    let name = name.trim().to_string();
    match op {
        "add" => Ok(ConsoleCommand::PresetAdd(kind, name)),
        "rm" => Ok(ConsoleCommand::PresetRm(kind, name)),
        other => Err(format!("unknown preset operation '{other}'")),
    }
}

/// Read console commands until EOF or `quit`, then request shutdown.
///
/// Pointer input goes straight to `selector`; it has to keep working while
/// the backend waits for the selection.
pub fn read_commands(
    input: impl BufRead,
    selector: &RegionSelector,
    ui_to_app: &kanal::Sender<AppEvent>,
) -> anyhow::Result<()> {
    for line in input.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let event = match parse_command(&line) {
            Ok(ConsoleCommand::Press(point)) => {
                selector.press(point);
                continue;
            }
            Ok(ConsoleCommand::Move(point)) => {
                selector.pointer_moved(point);
                continue;
            }
            Ok(ConsoleCommand::Help) => {
                println!("{HELP}");
                continue;
            }
            Ok(ConsoleCommand::Quit) => break,
            Ok(ConsoleCommand::Action(action)) => AppEvent::Hotkey(action),
            Ok(ConsoleCommand::Retranslate(engine)) => AppEvent::Retranslate {
                text: String::new(),
                engine,
            },
            Ok(ConsoleCommand::Ocr(name)) => AppEvent::SwapOcrEngine(name),
            Ok(ConsoleCommand::Translate(names)) => AppEvent::SetTranslationEngines(names),
            Ok(ConsoleCommand::PresetAdd(kind, name)) => AppEvent::CreatePreset { kind, name },
            Ok(ConsoleCommand::PresetRm(kind, name)) => AppEvent::DeletePreset { kind, name },
            Err(e) => {
                tracing::warn!("[CONSOLE] {e}");
                println!("{e} (type `help`)");
                continue;
            }
        };
        ui_to_app.send(event)?;
    }

    tracing::info!("[CONSOLE] Input closed");
    ui_to_app.send(AppEvent::Shutdown)?;
    Ok(())
}

/// Run [`read_commands`] over stdin on a dedicated thread.
pub fn spawn_stdin_reader(
    selector: Arc<RegionSelector>,
    ui_to_app: kanal::Sender<AppEvent>,
) -> std::io::Result<std::thread::JoinHandle<()>> {
    std::thread::Builder::new()
        .name("console-input".into())
        .spawn(move || {
            let stdin = std::io::stdin();
            if let Err(e) = read_commands(stdin.lock(), &selector, &ui_to_app) {
                tracing::debug!("[CONSOLE] Reader stopped: {e}");
            }
        })
}

#[cfg(feature = "desktop")]
pub use hotkeys::hotkey_listener;

#[cfg(feature = "desktop")]
mod hotkeys {
    use std::time::Duration;

    use kanal::AsyncSender;
    use tokio_util::sync::CancellationToken;
    use utsushi_ocr::{GlobalHotkeyListener, HotkeyMap};
    use utsushi_types::AppEvent;

    /// Poll system-wide hotkeys and forward each triggered action.
    pub async fn hotkey_listener(
        hotkeys: HotkeyMap,
        event_tx: AsyncSender<AppEvent>,
        cancel: CancellationToken,
    ) -> anyhow::Result<()> {
        let tx = event_tx.to_sync();
        tokio::task::spawn_blocking(move || {
            let listener = GlobalHotkeyListener::new(&hotkeys)?;
            tracing::info!("[HOTKEY] Listening for {:?}", hotkeys.get_hotkeys());

            while !cancel.is_cancelled() {
                if let Some(action) = listener.poll() {
                    tracing::debug!("[HOTKEY] '{action}' pressed");
                    tx.send(AppEvent::Hotkey(action))?;
                }
                std::thread::sleep(Duration::from_millis(50));
            }

            tracing::info!("[HOTKEY] Listener stopping");
            Ok(())
        })
        .await?
    }
}
