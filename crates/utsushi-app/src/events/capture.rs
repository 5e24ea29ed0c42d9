use std::sync::Arc;

use kanal::AsyncSender;
use utsushi_ocr::{CaptureError, OcrManagerError};
use utsushi_types::AppEvent;

use super::notify;
use super::retranslate::dispatch_translation;
use crate::state::AppState;

/// Let the user pick a region, OCR it and, if `translate`, fan the text out.
pub async fn handle_capture(state: Arc<AppState>, tx: AsyncSender<AppEvent>, translate: bool) {
    let image = match state.selector.start_selection().await {
        Ok(Some(image)) => image,
        Ok(None) => {
            notify(&tx, AppEvent::Status("Selection cancelled".into())).await;
            return;
        }
        Err(CaptureError::SelectionInProgress) => {
            tracing::debug!("[OCR] Selection already in progress");
            return;
        }
        Err(e) => {
            tracing::error!("[OCR] Capture failed: {e}");
            notify(
                &tx,
                AppEvent::OcrFailed {
                    engine: None,
                    message: e.to_string(),
                },
            )
            .await;
            return;
        }
    };
    tracing::debug!("[OCR] Captured {}x{}", image.width, image.height);

    let (engine, result) = {
        let ocr = state.ocr.read().await;
        let engine = ocr.current_engine().map(str::to_string);
        (engine, ocr.predict(&image).await)
    };

    let text = match result {
        Ok(text) => text,
        Err(e) => {
            match &e {
                OcrManagerError::NoActiveEngine => tracing::warn!("[OCR] {e}"),
                _ => tracing::error!("[OCR] Recognition failed: {e}"),
            }
            notify(
                &tx,
                AppEvent::OcrFailed {
                    engine,
                    message: e.to_string(),
                },
            )
            .await;
            return;
        }
    };
    tracing::info!("[OCR] Got {} chars", text.chars().count());

    *state.last_ocr_text.write().await = text.clone();
    let translate = translate && !text.trim().is_empty();
    notify(
        &tx,
        AppEvent::OcrResult {
            text: text.clone(),
            engine: engine.unwrap_or_default(),
            translate,
        },
    )
    .await;

    if translate {
        dispatch_translation(&state, &tx, &text, None).await;
    }
}
