use std::sync::Arc;

use kanal::AsyncSender;
use serde_json::Value;
use utsushi_core::EngineOptions;
use utsushi_ocr::SwapOutcome;
use utsushi_types::AppEvent;

use super::notify;
use crate::state::AppState;

/// Switch the OCR engine and remember the choice once it is working.
pub async fn handle_swap_ocr_engine(state: Arc<AppState>, tx: AsyncSender<AppEvent>, name: String) {
    let outcome = state
        .ocr
        .write()
        .await
        .swap_engine(&name, EngineOptions::new())
        .await;

    match outcome {
        Ok(outcome) => {
            if outcome == SwapOutcome::Swapped {
                tracing::info!("[OCR] Switched to '{name}'");
            }
            if let Err(e) = state.settings.set("ocr_engine", name.as_str()) {
                tracing::error!("[OCR] Failed to save engine choice: {e}");
            }
            notify(&tx, AppEvent::OcrEngineChanged { name }).await;
        }
        Err(e) => {
            tracing::error!("[OCR] Engine swap failed: {e}");
            notify(
                &tx,
                AppEvent::EngineSwapFailed {
                    message: e.to_string(),
                },
            )
            .await;
        }
    }
}

/// Persist and rebuild the active translation engine set.
pub async fn handle_set_translation_engines(
    state: Arc<AppState>,
    tx: AsyncSender<AppEvent>,
    names: Vec<String>,
) {
    let stored = Value::Array(names.iter().cloned().map(Value::String).collect());
    if let Err(e) = state.settings.set("translation_engine", stored) {
        tracing::error!("[TRANSLATE] Failed to save engine choice: {e}");
    }

    let active = state
        .translation
        .write()
        .await
        .set_active_engines(&names, EngineOptions::new())
        .await;
    if active.len() < names.len() {
        tracing::warn!("[TRANSLATE] Requested {names:?}, active {active:?}");
    }
    notify(&tx, AppEvent::TranslationEnginesChanged { active }).await;
}

pub async fn publish_available(state: &AppState, tx: &AsyncSender<AppEvent>) {
    let ocr = state.ocr.read().await.available_engines();
    let translation = state.translation.read().await.available_engines();
    notify(tx, AppEvent::AvailableEngines { ocr, translation }).await;
}
