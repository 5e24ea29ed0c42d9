use kanal::AsyncSender;
use utsushi_ocr::Overlay;
use utsushi_types::{AppEvent, CaptureRegion};

/// Overlay that forwards every request to the UI thread as an [`AppEvent`].
///
/// Requests go onto an unbounded queue that the backend relays into the UI
/// inbox. Sends never block, since selection input arrives on the UI thread,
/// and a burst of translation chunks cannot crowd out a `HideOverlay`.
#[derive(Clone)]
pub struct ChannelOverlay {
    to_ui: AsyncSender<AppEvent>,
}

impl ChannelOverlay {
    pub fn new(to_ui: AsyncSender<AppEvent>) -> Self {
        Self { to_ui }
    }

    fn forward(&self, event: AppEvent) {
        match self.to_ui.try_send(event) {
            Ok(true) => {}
            Ok(false) => tracing::warn!("[SELECTION] Overlay queue refused update"),
            Err(e) => tracing::debug!("[SELECTION] Overlay queue closed: {e}"),
        }
    }
}

impl Overlay for ChannelOverlay {
    fn show(&self, bounds: CaptureRegion) {
        self.forward(AppEvent::ShowOverlay(bounds));
    }

    fn repaint(&self, selection: Option<CaptureRegion>) {
        self.forward(AppEvent::SelectionChanged(selection));
    }

    fn hide(&self) {
        self.forward(AppEvent::HideOverlay);
    }
}
