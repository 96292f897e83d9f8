//! Host side of the note panel: lifecycle, message routing and all file I/O
//! for the markdown note shown in the editor webview.

pub mod commands;
pub mod config;
pub mod error;
pub mod fs;
pub mod images;
pub mod panel;
pub mod slot;
pub mod webview;

#[cfg(feature = "desktop")]
mod desktop;

#[cfg(test)]
mod test_support;

pub use config::Config;
pub use error::{PanelError, Result};
pub use panel::{Note, NotePanel, PanelAction};
pub use slot::PanelSlot;

#[cfg(feature = "desktop")]
pub use desktop::run;
