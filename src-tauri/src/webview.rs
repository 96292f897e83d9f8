//! Collaborators the panel needs from its host: the webview it renders
//! into, a way to create one, the command palette and user notifications.

use std::path::Path;

use unotes_protocol::HostMessage;

use crate::error::Result;

pub trait Webview {
    fn post_message(&mut self, message: &HostMessage) -> Result<()>;

    /// Whether the panel is the active (visible and focused) one.
    fn is_active(&self) -> bool;

    fn set_title(&mut self, title: &str);

    fn reveal(&mut self);

    fn dispose(&mut self);

    /// URI under which the webview can load files from `path`.
    fn resource_uri(&self, path: &Path) -> String;
}

pub trait WebviewFactory {
    type View: Webview;

    fn create(&mut self, title: &str) -> Result<Self::View>;
}

pub trait CommandRegistry: Send {
    fn register(&mut self, id: &'static str);

    fn unregister(&mut self, id: &'static str);
}

pub trait Notifier: Send + Sync {
    fn show_warning(&self, message: &str);
}

/// Registry for hosts that route command ids themselves.
#[derive(Debug, Default)]
pub struct NullRegistry;

impl CommandRegistry for NullRegistry {
    fn register(&mut self, _id: &'static str) {}

    fn unregister(&mut self, _id: &'static str) {}
}
