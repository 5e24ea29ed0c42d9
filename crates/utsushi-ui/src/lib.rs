mod bridge;
mod console;
#[cfg(feature = "slint")]
mod desktop;
#[cfg(feature = "slint")]
mod events;
mod panes;

pub use bridge::ChannelOverlay;
pub use console::ConsolePresenter;
#[cfg(feature = "slint")]
pub use desktop::run_desktop;
pub use panes::{Pane, PaneBoard};
