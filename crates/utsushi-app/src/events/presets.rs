use kanal::AsyncSender;
use utsushi_types::{AppEvent, PresetKind, PresetProfile};

use super::engines::publish_available;
use super::notify;
use crate::state::AppState;

pub async fn handle_create_preset(
    state: &AppState,
    tx: &AsyncSender<AppEvent>,
    kind: PresetKind,
    name: &str,
) {
    let name = name.trim();
    if name.is_empty() {
        notify(tx, AppEvent::Status("Preset name is empty".into())).await;
        return;
    }

    match state.settings.create_preset(kind, name) {
        Ok(true) => {
            rebuild(state, kind).await;
            publish_available(state, tx).await;
        }
        Ok(false) => {
            notify(tx, AppEvent::Status(format!("Preset '{name}' already exists"))).await;
        }
        Err(e) => {
            tracing::error!("[PRESET] Failed to create '{name}': {e}");
            notify(tx, AppEvent::Status(format!("Failed to create preset: {e}"))).await;
        }
    }
}

/// Store new connection details. Engines read their profile per request, so
/// only a previously unknown name needs a rebuild.
pub async fn handle_update_preset(
    state: &AppState,
    tx: &AsyncSender<AppEvent>,
    kind: PresetKind,
    name: &str,
    profile: PresetProfile,
) {
    let is_new = state.settings.preset(kind, name).is_none();
    match state.settings.update_preset(kind, name, &profile) {
        Ok(()) => {
            tracing::info!("[PRESET] Updated {kind:?} preset '{name}'");
            if is_new {
                rebuild(state, kind).await;
                publish_available(state, tx).await;
            }
        }
        Err(e) => {
            tracing::error!("[PRESET] Failed to update '{name}': {e}");
            notify(tx, AppEvent::Status(format!("Failed to update preset: {e}"))).await;
        }
    }
}

/// Remove a profile. Engines already built from it stay active.
pub async fn handle_delete_preset(
    state: &AppState,
    tx: &AsyncSender<AppEvent>,
    kind: PresetKind,
    name: &str,
) {
    match state.settings.delete_preset(kind, name) {
        Ok(true) => {
            rebuild(state, kind).await;
            publish_available(state, tx).await;
        }
        Ok(false) => {
            notify(tx, AppEvent::Status(format!("No preset named '{name}'"))).await;
        }
        Err(e) => {
            tracing::error!("[PRESET] Failed to delete '{name}': {e}");
            notify(tx, AppEvent::Status(format!("Failed to delete preset: {e}"))).await;
        }
    }
}

async fn rebuild(state: &AppState, kind: PresetKind) {
    let names = match kind {
        PresetKind::Ocr => state.ocr.read().await.rebuild_preset_engines(),
        PresetKind::Translation => state.translation.read().await.rebuild_preset_engines(),
    };
    tracing::debug!("[PRESET] {kind:?} presets now {names:?}");
}
