use std::sync::Arc;

use kanal::{AsyncReceiver, AsyncSender};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use utsushi_types::{AppEvent, TranslationEvent};

use crate::events::{event_loop, forward_overlay, forward_translations};
use crate::state::AppState;

/// Centralized channel management
pub struct ChannelSet {
    pub app_to_ui: (AsyncSender<AppEvent>, AsyncReceiver<AppEvent>),
    pub ui_to_app: (AsyncSender<AppEvent>, AsyncReceiver<AppEvent>),
    pub translation: (
        AsyncSender<TranslationEvent>,
        AsyncReceiver<TranslationEvent>,
    ),
    /// Overlay requests from the selector, relayed into `app_to_ui`
    pub overlay: (AsyncSender<AppEvent>, AsyncReceiver<AppEvent>),
}

impl ChannelSet {
    pub fn new() -> Self {
        Self::with_capacity(
            256, // streaming bursts
            64,  // UI interactions
        )
    }

    pub fn with_capacity(app_to_ui: usize, ui_to_app: usize) -> Self {
        Self {
            app_to_ui: kanal::bounded_async(app_to_ui),
            ui_to_app: kanal::bounded_async(ui_to_app),
            translation: kanal::unbounded_async(),
            overlay: kanal::unbounded_async(),
        }
    }
}

impl Default for ChannelSet {
    fn default() -> Self {
        Self::new()
    }
}

/// Application controller for task spawning and lifecycle
pub struct AppController {
    channels: ChannelSet,
    state: Arc<AppState>,
    cancel_token: CancellationToken,
    tasks: JoinSet<anyhow::Result<()>>,
}

impl AppController {
    pub fn new(channels: ChannelSet, state: Arc<AppState>) -> Self {
        Self {
            channels,
            state,
            cancel_token: CancellationToken::new(),
            tasks: JoinSet::new(),
        }
    }

    #[cfg(feature = "desktop")]
    pub fn state(&self) -> &Arc<AppState> {
        &self.state
    }

    #[cfg(feature = "desktop")]
    pub fn channels(&self) -> &ChannelSet {
        &self.channels
    }

    /// Event loop, translation and overlay forwarders, and Ctrl+C watcher.
    pub fn spawn_core(&mut self) {
        self.tasks.spawn(event_loop(
            self.state.clone(),
            self.channels.ui_to_app.1.clone(),
            self.channels.app_to_ui.0.clone(),
            self.cancel_token.clone(),
        ));

        self.tasks.spawn(forward_translations(
            self.channels.translation.1.clone(),
            self.channels.app_to_ui.0.clone(),
            self.cancel_token.child_token(),
        ));

        self.tasks.spawn(forward_overlay(
            self.channels.overlay.1.clone(),
            self.channels.app_to_ui.0.clone(),
            self.cancel_token.child_token(),
        ));

        let cancel = self.cancel_token.clone();
        self.tasks.spawn(async move {
            tokio::select! {
                result = tokio::signal::ctrl_c() => {
                    result?;
                    tracing::info!("Ctrl+C received, shutting down");
                    cancel.cancel();
                }
                _ = cancel.cancelled() => {}
            }
            Ok(())
        });
    }

    /// Terminal front-end: stdin commands in, rendered events out.
    pub fn spawn_console(&mut self) -> anyhow::Result<()> {
        crate::io::spawn_stdin_reader(
            self.state.selector.clone(),
            self.channels.ui_to_app.0.clone_sync(),
        )?;

        let presenter = utsushi_ui::ConsolePresenter::new(std::io::stdout());
        let app_to_ui = self.channels.app_to_ui.1.clone();
        let cancel = self.cancel_token.child_token();
        self.tasks.spawn(async move {
            tokio::select! {
                result = presenter.run(app_to_ui) => result?,
                _ = cancel.cancelled() => {}
            }
            Ok(())
        });
        Ok(())
    }

    /// Global hotkeys, plus closing the desktop windows on shutdown.
    #[cfg(feature = "desktop")]
    pub fn spawn_desktop(&mut self) {
        let state = self.state.clone();
        let tx = self.channels.ui_to_app.0.clone();
        let cancel = self.cancel_token.child_token();
        self.tasks.spawn(async move {
            let hotkeys = state.hotkeys.read().await.clone();
            crate::io::hotkey_listener(hotkeys, tx, cancel).await
        });

        let app_to_ui = self.channels.app_to_ui.0.clone();
        let cancel = self.cancel_token.clone();
        self.tasks.spawn(async move {
            cancel.cancelled().await;
            app_to_ui.send(AppEvent::Shutdown).await?;
            Ok(())
        });
    }

    /// Wait until shutdown is requested or a task stops, then stop the rest.
    pub async fn wait(&mut self) {
        tokio::select! {
            _ = self.cancel_token.cancelled() => {
                tracing::info!("Shutdown requested");
            }
            Some(result) = self.tasks.join_next() => {
                match result {
                    Ok(Ok(())) => tracing::warn!("A task exited"),
                    Ok(Err(e)) => tracing::error!("A task failed: {e:#}"),
                    Err(e) => tracing::error!("A task panicked: {e}"),
                }
            }
        }
        self.shutdown();

        while let Some(result) = self.tasks.join_next().await {
            if let Ok(Err(e)) = result {
                tracing::debug!("Task stopped with: {e:#}");
            }
        }
    }

    pub fn shutdown(&self) {
        self.cancel_token.cancel();
    }
}
