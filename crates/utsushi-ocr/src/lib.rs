mod capture;
mod engine;
pub mod engines;
mod hotkey;
mod manager;
mod selection;

pub use capture::SyntheticGrabber;
#[cfg(feature = "xcap")]
pub use capture::XcapGrabber;
pub use engine::{BoxedOcrEngine, OcrEngine, OcrError, OcrRegistry};
pub use engines::default_registry;
#[cfg(feature = "hotkeys")]
pub use hotkey::{GlobalHotkeyListener, HotkeyError};
pub use hotkey::{HotkeyMap, actions};
pub use manager::{OcrManager, OcrManagerError, SwapOutcome};
pub use selection::{
    CaptureError, Overlay, RegionSelector, ScreenGrabber, SelectionPhase, SelectionSnapshot,
};
