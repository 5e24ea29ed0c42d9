use std::sync::Arc;

use kanal::{AsyncReceiver, AsyncSender};
use tokio_util::sync::CancellationToken;
use utsushi_ocr::actions;
use utsushi_types::{AppEvent, TranslationEvent};

use crate::state::AppState;

pub mod capture;
pub mod engines;
pub mod presets;
pub mod retranslate;

use capture::handle_capture;
use engines::{handle_set_translation_engines, handle_swap_ocr_engine, publish_available};
use presets::{handle_create_preset, handle_delete_preset, handle_update_preset};
use retranslate::handle_retranslate;

/// App's main loop
///
/// Work that can wait on the user or the network (capture, OCR, engine
/// construction) runs in its own task so that `cancel_selection` and other
/// events keep flowing while it is pending.
pub async fn event_loop(
    state: Arc<AppState>,
    ui_to_app_rx: AsyncReceiver<AppEvent>,
    app_to_ui_tx: AsyncSender<AppEvent>,
    cancel: CancellationToken,
) -> anyhow::Result<()> {
    announce(&state, &app_to_ui_tx).await?;

    tracing::info!("[EVENT_LOOP] Starting main loop, waiting for events");
    loop {
        let event = tokio::select! {
            _ = cancel.cancelled() => break,
            event = ui_to_app_rx.recv() => event?,
        };
        tracing::debug!("[EVENT_LOOP] Received {event:?}");

        if let AppEvent::Shutdown = event {
            tracing::info!("[EVENT_LOOP] Shutdown requested");
            cancel.cancel();
            break;
        }
        handle_event(&state, &app_to_ui_tx, event).await;
    }

    tracing::info!("[EVENT_LOOP] Stopped");
    Ok(())
}

async fn handle_event(state: &Arc<AppState>, tx: &AsyncSender<AppEvent>, event: AppEvent) {
    match event {
        AppEvent::Hotkey(action) => match action.as_str() {
            actions::OCR_CAPTURE => {
                tokio::spawn(handle_capture(state.clone(), tx.clone(), true));
            }
            actions::ONLY_OCR => {
                tokio::spawn(handle_capture(state.clone(), tx.clone(), false));
            }
            actions::CANCEL_SELECTION => {
                if !state.selector.cancel_selection() {
                    tracing::debug!("[EVENT_LOOP] No selection to cancel");
                }
            }
            other => tracing::warn!("[EVENT_LOOP] Unknown hotkey action '{other}'"),
        },
        AppEvent::Retranslate { text, engine } => {
            tokio::spawn(handle_retranslate(state.clone(), tx.clone(), text, engine));
        }
        AppEvent::SwapOcrEngine(name) => {
            tokio::spawn(handle_swap_ocr_engine(state.clone(), tx.clone(), name));
        }
        AppEvent::SetTranslationEngines(names) => {
            tokio::spawn(handle_set_translation_engines(
                state.clone(),
                tx.clone(),
                names,
            ));
        }
        AppEvent::CreatePreset { kind, name } => {
            handle_create_preset(state, tx, kind, &name).await;
        }
        AppEvent::UpdatePreset {
            kind,
            name,
            profile,
        } => handle_update_preset(state, tx, kind, &name, profile).await,
        AppEvent::DeletePreset { kind, name } => {
            handle_delete_preset(state, tx, kind, &name).await;
        }
        other => tracing::debug!("[EVENT_LOOP] Ignoring UI-bound event {other:?}"),
    }
}

/// Tell a freshly connected front-end what the backend is running.
async fn announce(state: &AppState, tx: &AsyncSender<AppEvent>) -> anyhow::Result<()> {
    publish_available(state, tx).await;
    tracing::info!(
        "[EVENT_LOOP] Hotkeys: {:?}",
        state.hotkeys.read().await.get_hotkeys()
    );

    let ocr_engine = state.ocr.read().await.current_engine().map(str::to_string);
    if let Some(name) = ocr_engine {
        tx.send(AppEvent::OcrEngineChanged { name }).await?;
    }
    let active = state.translation.read().await.current_engines();
    tx.send(AppEvent::TranslationEnginesChanged { active })
        .await?;
    tx.send(AppEvent::BackendReady).await?;
    Ok(())
}

/// Wrap engine results for the front-end until either side closes.
pub async fn forward_translations(
    events: AsyncReceiver<TranslationEvent>,
    app_to_ui_tx: AsyncSender<AppEvent>,
    cancel: CancellationToken,
) -> anyhow::Result<()> {
    loop {
        let event = tokio::select! {
            _ = cancel.cancelled() => break,
            event = events.recv() => event?,
        };
        app_to_ui_tx.send(AppEvent::Translation(event)).await?;
    }
    Ok(())
}

/// Relay overlay requests into the UI inbox, waiting for room rather than
/// dropping them.
pub async fn forward_overlay(
    requests: AsyncReceiver<AppEvent>,
    app_to_ui_tx: AsyncSender<AppEvent>,
    cancel: CancellationToken,
) -> anyhow::Result<()> {
    loop {
        let event = tokio::select! {
            _ = cancel.cancelled() => break,
            event = requests.recv() => event?,
        };
        tokio::select! {
            _ = cancel.cancelled() => break,
            sent = app_to_ui_tx.send(event) => sent?,
        }
    }
    Ok(())
}

/// Send to the front-end, logging instead of failing when it is gone.
pub(crate) async fn notify(tx: &AsyncSender<AppEvent>, event: AppEvent) {
    if let Err(e) = tx.send(event).await {
        tracing::error!("[EVENT_LOOP] Failed to send to UI: {e}");
    }
}
