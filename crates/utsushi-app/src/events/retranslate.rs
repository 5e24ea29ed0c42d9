use std::sync::Arc;

use kanal::AsyncSender;
use utsushi_types::AppEvent;

use super::notify;
use crate::state::AppState;

/// Start a translation generation and tell the front-end which panes it covers.
///
/// Returns the generation, or `None` when no engine was dispatched.
pub async fn dispatch_translation(
    state: &AppState,
    tx: &AsyncSender<AppEvent>,
    text: &str,
    engine: Option<&str>,
) -> Option<u64> {
    let dispatch = state.translation.read().await.translate(text, engine);
    if dispatch.is_empty() {
        let status = match engine {
            Some(engine) => format!("Translation engine '{engine}' is not active"),
            None => "No translation engine is active".to_string(),
        };
        tracing::warn!("[TRANSLATE] {status}");
        notify(tx, AppEvent::Status(status)).await;
        return None;
    }

    let generation = dispatch.generation;
    notify(
        tx,
        AppEvent::TranslationStarted {
            generation,
            engines: dispatch.engines,
        },
    )
    .await;
    Some(generation)
}

/// Re-run translation of `text`, or of the last OCR result when it is empty.
pub async fn handle_retranslate(
    state: Arc<AppState>,
    tx: AsyncSender<AppEvent>,
    text: String,
    engine: Option<String>,
) {
    let text = if text.trim().is_empty() {
        state.last_ocr_text.read().await.clone()
    } else {
        text
    };
    if text.trim().is_empty() {
        notify(&tx, AppEvent::Status("Nothing to translate".into())).await;
        return;
    }

    dispatch_translation(&state, &tx, &text, engine.as_deref()).await;
}
