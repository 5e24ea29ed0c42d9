use std::sync::Arc;
use std::time::Duration;

use kanal::{AsyncReceiver, AsyncSender};
use tokio::task::JoinSet;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use utsushi_config::Settings;
use utsushi_ocr::{OcrRegistry, SyntheticGrabber};
use utsushi_translator::TranslatorRegistry;
use utsushi_types::{AppEvent, Point};
use utsushi_ui::ChannelOverlay;

use crate::controller::ChannelSet;
use crate::events::{event_loop, forward_overlay, forward_translations};
use crate::state::AppState;


const WAIT: Duration = Duration::from_secs(5);

/// Backend running on in-memory settings, driven like a front-end would.
pub(crate) struct Harness {
    pub state: Arc<AppState>,
    pub ui_to_app: AsyncSender<AppEvent>,
    pub app_to_ui: AsyncReceiver<AppEvent>,
    /// Sender side of the UI inbox, for crowding it from a test
    pub to_ui: AsyncSender<AppEvent>,
    cancel: CancellationToken,
    tasks: JoinSet<anyhow::Result<()>>,
}

impl Harness {
    pub async fn start(settings: Settings) -> Self {
        Self::start_with(
            settings,
            utsushi_ocr::default_registry(),
            utsushi_translator::default_registry(),
        )
        .await
    }

    pub async fn start_with(
        settings: Settings,
        ocr: OcrRegistry,
        translators: TranslatorRegistry,
    ) -> Self {
        Self::start_with_channels(settings, ocr, translators, ChannelSet::new()).await
    }

    pub async fn start_with_channels(
        settings: Settings,
        ocr: OcrRegistry,
        translators: TranslatorRegistry,
        channels: ChannelSet,
    ) -> Self {
        let state = AppState::with_registries(
            Arc::new(settings),
            Arc::new(ocr),
            Arc::new(translators),
            Arc::new(ChannelOverlay::new(channels.overlay.0.clone())),
            Arc::new(SyntheticGrabber::new(640, 480)),
            channels.translation.0.clone(),
        )
        .await
        .expect("backend failed to start");
        let state = Arc::new(state);

        let cancel = CancellationToken::new();
        let mut tasks = JoinSet::new();
        tasks.spawn(event_loop(
            state.clone(),
            channels.ui_to_app.1.clone(),
            channels.app_to_ui.0.clone(),
            cancel.clone(),
        ));
        tasks.spawn(forward_translations(
            channels.translation.1.clone(),
            channels.app_to_ui.0.clone(),
            cancel.child_token(),
        ));
        tasks.spawn(forward_overlay(
            channels.overlay.1.clone(),
            channels.app_to_ui.0.clone(),
            cancel.child_token(),
        ));

        let harness = Self {
            state,
            ui_to_app: channels.ui_to_app.0.clone(),
            app_to_ui: channels.app_to_ui.1.clone(),
            to_ui: channels.app_to_ui.0.clone(),
            cancel,
            tasks,
        };
        harness
            .next_matching(|e| matches!(e, AppEvent::BackendReady))
            .await;
        harness
    }

    pub async fn send(&self, event: AppEvent) {
        timeout(WAIT, self.ui_to_app.send(event))
            .await
            .expect("send timed out")
            .expect("backend closed");
    }

    /// Skip events until one satisfies `pred`.
    pub async fn next_matching(&self, mut pred: impl FnMut(&AppEvent) -> bool) -> AppEvent {
        loop {
            let event = timeout(WAIT, self.app_to_ui.recv())
                .await
                .expect("timed out waiting for event")
                .expect("channel closed");
            if pred(&event) {
                return event;
            }
        }
    }

    /// Fire `action` and drag a rectangle once the overlay is up.
    pub async fn capture(&self, action: &str, from: Point, to: Point) {
        self.send(AppEvent::Hotkey(action.to_string())).await;
        self.next_matching(|e| matches!(e, AppEvent::ShowOverlay(_)))
            .await;
        self.state.selector.press(from);
        self.state.selector.pointer_moved(to);
        self.state.selector.press(to);
    }

    pub async fn stop(self) {
        self.send(AppEvent::Shutdown).await;
        self.join().await;
    }

    /// Wait for the backend tasks to finish on their own.
    pub async fn join(mut self) {
        while let Some(result) = timeout(WAIT, self.tasks.join_next())
            .await
            .expect("tasks did not stop")
        {
            result.expect("task panicked").expect("task failed");
        }
        assert!(self.cancel.is_cancelled());
    }
}
