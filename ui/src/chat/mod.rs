//! The chat panel's engine, independent of any rendering framework.

pub mod draft;
pub mod error;
pub mod names;
pub mod panel;
pub mod session;

#[cfg(test)]
mod testing;

pub use draft::{platform_previews, Attachment, PreviewRef, PreviewStore};
pub use error::ChatError;
pub use panel::{KeyAction, KeyPress, PanelChrome, Point};
pub use session::{ChatSession, DeleteOutcome, MessageView, Phase, SessionContext};
