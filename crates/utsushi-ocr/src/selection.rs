//! Interactive region selection over a full-desktop overlay.
//!
//! [`RegionSelector::start_selection`] suspends until the overlay's input
//! handlers resolve the gesture through [`RegionSelector::press`],
//! [`RegionSelector::pointer_moved`] or [`RegionSelector::cancel_selection`].
//! Those handlers may run on any thread.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::oneshot;
use utsushi_types::{CaptureRegion, Point, RawImage};

#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("a region selection is already in progress")]
    SelectionInProgress,

    #[error("no display found")]
    NoDisplay,

    #[error("region {0:?} is outside the desktop")]
    OutOfBounds(CaptureRegion),

    #[error("screen capture failed: {0}")]
    Grab(String),

    #[error("capture task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Full-desktop selection surface.
pub trait Overlay: Send + Sync {
    /// Cover `bounds` and switch the pointer to a crosshair.
    fn show(&self, bounds: CaptureRegion);

    /// Draw the live rectangle, in overlay-local coordinates.
    fn repaint(&self, selection: Option<CaptureRegion>);

    /// Hide and restore the pointer. Must tolerate repeated calls.
    fn hide(&self);
}

/// Pixel source for the desktop.
pub trait ScreenGrabber: Send + Sync {
    /// Union of all display geometries.
    fn desktop_bounds(&self) -> Result<CaptureRegion, CaptureError>;

    /// Pixels of `region`, in desktop coordinates.
    fn grab(&self, region: CaptureRegion) -> Result<RawImage, CaptureError>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SelectionPhase {
    #[default]
    Idle,
    Armed,
    Dragging,
    /// Gesture finished, capture not yet returned.
    Resolved,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SelectionSnapshot {
    pub phase: SelectionPhase,
    pub start: Option<Point>,
    pub current: Option<Point>,
    pub end: Option<Point>,
    pub cancelled: bool,
}

enum Resolution {
    Completed(CaptureRegion),
    Cancelled,
}

#[derive(Default)]
struct SelectionState {
    snapshot: SelectionSnapshot,
    waiter: Option<oneshot::Sender<Resolution>>,
}

impl SelectionState {
    fn resolve(&mut self, resolution: Resolution) {
        self.snapshot.phase = SelectionPhase::Resolved;
        if let Some(waiter) = self.waiter.take() {
            // receiver gone means the caller was dropped; the guard resets
            let _ = waiter.send(resolution);
        }
    }
}

pub struct RegionSelector {
    overlay: Arc<dyn Overlay>,
    grabber: Arc<dyn ScreenGrabber>,
    state: Mutex<SelectionState>,
}

impl RegionSelector {
    pub fn new(overlay: Arc<dyn Overlay>, grabber: Arc<dyn ScreenGrabber>) -> Self {
        Self {
            overlay,
            grabber,
            state: Mutex::new(SelectionState::default()),
        }
    }

    /// Show the overlay and wait for the user to pick a rectangle.
    ///
    /// Returns `None` when cancelled or when the rectangle has no area. The
    /// selector is back to idle with the overlay hidden when this returns,
    /// and also if the returned future is dropped early.
    pub async fn start_selection(&self) -> Result<Option<RawImage>, CaptureError> {
        let (tx, rx) = oneshot::channel();
        {
            let mut state = self.state.lock();
            if state.snapshot.phase != SelectionPhase::Idle {
                return Err(CaptureError::SelectionInProgress);
            }
            state.snapshot.phase = SelectionPhase::Armed;
            state.waiter = Some(tx);
        }
        let _reset = ResetGuard(self);

        let bounds = self.grabber.desktop_bounds()?;
        self.overlay.show(bounds);
        tracing::info!("[SELECTION] Waiting for region on {bounds:?}");

        let region = match rx.await {
            Ok(Resolution::Completed(region)) => region,
            Ok(Resolution::Cancelled) | Err(_) => {
                tracing::info!("[SELECTION] Cancelled");
                return Ok(None);
            }
        };
        if region.is_empty() {
            tracing::info!("[SELECTION] Empty region, nothing to capture");
            return Ok(None);
        }

        // keep the overlay out of the grabbed pixels
        self.overlay.hide();

        let region = CaptureRegion {
            x: region.x + bounds.x,
            y: region.y + bounds.y,
            ..region
        };
        tracing::debug!("[SELECTION] Capturing {region:?}");
        let grabber = Arc::clone(&self.grabber);
        let image = tokio::task::spawn_blocking(move || grabber.grab(region)).await??;
        Ok(Some(image))
    }

    /// Primary button press at `point` (overlay-local).
    pub fn press(&self, point: Point) {
        let repaint = {
            let mut state = self.state.lock();
            let snapshot = &mut state.snapshot;
            match snapshot.phase {
                SelectionPhase::Armed => {
                    snapshot.phase = SelectionPhase::Dragging;
                    snapshot.start = Some(point);
                    snapshot.current = Some(point);
                    Some(CaptureRegion::from_points(point, point))
                }
                SelectionPhase::Dragging => {
                    snapshot.current = Some(point);
                    snapshot.end = Some(point);
                    let start = snapshot.start.unwrap_or(point);
                    state.resolve(Resolution::Completed(CaptureRegion::from_points(
                        start, point,
                    )));
                    None
                }
                SelectionPhase::Idle | SelectionPhase::Resolved => return,
            }
        };

        if repaint.is_some() {
            self.overlay.repaint(repaint);
        }
    }

    pub fn pointer_moved(&self, point: Point) {
        let region = {
            let mut state = self.state.lock();
            let snapshot = &mut state.snapshot;
            if snapshot.phase != SelectionPhase::Dragging {
                return;
            }
            snapshot.current = Some(point);
            snapshot
                .start
                .map(|start| CaptureRegion::from_points(start, point))
        };
        self.overlay.repaint(region);
    }

    /// Abort an armed or dragging selection. Returns whether anything was cancelled.
    pub fn cancel_selection(&self) -> bool {
        let mut state = self.state.lock();
        match state.snapshot.phase {
            SelectionPhase::Armed | SelectionPhase::Dragging => {
                state.snapshot.cancelled = true;
                state.resolve(Resolution::Cancelled);
                true
            }
            SelectionPhase::Idle | SelectionPhase::Resolved => false,
        }
    }

    pub fn snapshot(&self) -> SelectionSnapshot {
        self.state.lock().snapshot
    }

    pub fn is_active(&self) -> bool {
        self.snapshot().phase != SelectionPhase::Idle
    }

    fn reset(&self) {
        *self.state.lock() = SelectionState::default();
        self.overlay.hide();
    }
}

struct ResetGuard<'a>(&'a RegionSelector);

impl Drop for ResetGuard<'_> {
    fn drop(&mut self) {
        self.0.reset();
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::capture::SyntheticGrabber;

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Call {
        Show(CaptureRegion),
        Repaint(Option<CaptureRegion>),
        Hide,
    }

    #[derive(Default)]
    struct RecordingOverlay {
        calls: Mutex<Vec<Call>>,
    }

    impl Overlay for RecordingOverlay {
        fn show(&self, bounds: CaptureRegion) {
            self.calls.lock().push(Call::Show(bounds));
        }

        fn repaint(&self, selection: Option<CaptureRegion>) {
            self.calls.lock().push(Call::Repaint(selection));
        }

        fn hide(&self) {
            self.calls.lock().push(Call::Hide);
        }
    }

    fn selector() -> (Arc<RegionSelector>, Arc<RecordingOverlay>) {
        let overlay = Arc::new(RecordingOverlay::default());
        let selector = RegionSelector::new(
            Arc::clone(&overlay) as Arc<dyn Overlay>,
            Arc::new(SyntheticGrabber::new(1920, 1080)),
        );
        (Arc::new(selector), overlay)
    }

    async fn wait_for(selector: &RegionSelector, phase: SelectionPhase) {
        tokio::time::timeout(Duration::from_secs(2), async {
            while selector.snapshot().phase != phase {
                tokio::time::sleep(Duration::from_millis(1)).await;
            }
        })
        .await
        .expect("selector never reached phase");
    }

    fn spawn_selection(
        selector: &Arc<RegionSelector>,
    ) -> tokio::task::JoinHandle<Result<Option<RawImage>, CaptureError>> {
        let selector = Arc::clone(selector);
        tokio::spawn(async move { selector.start_selection().await })
    }

    #[tokio::test]
    async fn completed_gesture_is_normalized() {
        let (selector, overlay) = selector();
        let task = spawn_selection(&selector);
        wait_for(&selector, SelectionPhase::Armed).await;

        selector.press(Point::new(300, 200));
        selector.pointer_moved(Point::new(150, 90));
        selector.press(Point::new(100, 50));

        let image = task.await.unwrap().unwrap().expect("image");
        assert_eq!((image.width, image.height), (200, 150));
        assert_eq!(image.data.len(), 200 * 150 * 4);

        assert_eq!(selector.snapshot(), SelectionSnapshot::default());
        let calls = overlay.calls.lock();
        assert_eq!(calls[0], Call::Show(CaptureRegion { x: 0, y: 0, width: 1920, height: 1080 }));
        assert!(calls.contains(&Call::Repaint(Some(CaptureRegion {
            x: 150,
            y: 90,
            width: 150,
            height: 110
        }))));
        assert_eq!(calls.last(), Some(&Call::Hide));
    }

    #[tokio::test]
    async fn closing_press_sets_the_end_not_the_last_move() {
        let (selector, _overlay) = selector();
        let task = spawn_selection(&selector);
        wait_for(&selector, SelectionPhase::Armed).await;

        selector.press(Point::new(10, 10));
        selector.pointer_moved(Point::new(500, 500));
        selector.press(Point::new(60, 30));

        let image = task.await.unwrap().unwrap().expect("image");
        assert_eq!((image.width, image.height), (50, 20));
    }

    #[tokio::test]
    async fn two_presses_without_moves_complete() {
        let (selector, _overlay) = selector();
        let task = spawn_selection(&selector);
        wait_for(&selector, SelectionPhase::Armed).await;

        selector.press(Point::new(0, 0));
        selector.press(Point::new(32, 16));

        let image = task.await.unwrap().unwrap().expect("image");
        assert_eq!((image.width, image.height), (32, 16));
    }

    #[tokio::test]
    async fn cancel_returns_none_and_clears_points() {
        let (selector, overlay) = selector();
        let task = spawn_selection(&selector);
        wait_for(&selector, SelectionPhase::Armed).await;

        selector.press(Point::new(10, 10));
        selector.pointer_moved(Point::new(40, 40));
        assert!(selector.cancel_selection());

        assert!(task.await.unwrap().unwrap().is_none());
        assert_eq!(selector.snapshot(), SelectionSnapshot::default());
        assert_eq!(overlay.calls.lock().last(), Some(&Call::Hide));
    }

    #[tokio::test]
    async fn zero_area_selection_returns_none() {
        let (selector, _) = selector();
        let task = spawn_selection(&selector);
        wait_for(&selector, SelectionPhase::Armed).await;

        selector.press(Point::new(50, 50));
        selector.press(Point::new(50, 120));

        assert!(task.await.unwrap().unwrap().is_none());
    }

    #[tokio::test]
    async fn second_selection_while_active_fails() {
        let (selector, _) = selector();
        let task = spawn_selection(&selector);
        wait_for(&selector, SelectionPhase::Armed).await;

        let second = selector.start_selection().await;
        assert!(matches!(second, Err(CaptureError::SelectionInProgress)));

        selector.cancel_selection();
        assert!(task.await.unwrap().unwrap().is_none());
    }

    #[tokio::test]
    async fn dropped_caller_still_resets() {
        let (selector, overlay) = selector();
        let task = spawn_selection(&selector);
        wait_for(&selector, SelectionPhase::Armed).await;
        selector.press(Point::new(5, 5));

        task.abort();
        let _ = task.await;

        assert_eq!(selector.snapshot(), SelectionSnapshot::default());
        assert_eq!(overlay.calls.lock().last(), Some(&Call::Hide));
        assert!(!selector.cancel_selection());
    }

    #[test]
    fn input_outside_selection_is_ignored() {
        let (selector, overlay) = selector();
        selector.press(Point::new(1, 1));
        selector.pointer_moved(Point::new(2, 2));
        assert!(!selector.cancel_selection());
        assert_eq!(selector.snapshot(), SelectionSnapshot::default());
        assert!(overlay.calls.lock().is_empty());
    }
}
