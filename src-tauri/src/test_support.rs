//! Recording fakes for the panel's collaborators.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::{Arc, Mutex};

use unotes_protocol::{ContentUpdate, HostMessage};

use crate::error::{PanelError, Result};
use crate::webview::{CommandRegistry, Notifier, Webview, WebviewFactory};

#[derive(Debug, Default)]
pub struct FakeWebview {
    pub posted: Vec<HostMessage>,
    pub active: bool,
    pub title: String,
    pub revealed: usize,
    pub disposed: bool,
}

impl FakeWebview {
    pub fn active() -> Self {
        Self {
            active: true,
            ..Self::default()
        }
    }

    pub fn set_contents(&self) -> Vec<ContentUpdate> {
        self.posted
            .iter()
            .filter_map(|message| match message {
                HostMessage::SetContent(update) => Some(update.clone()),
                _ => None,
            })
            .collect()
    }
}

impl Webview for FakeWebview {
    fn post_message(&mut self, message: &HostMessage) -> Result<()> {
        if self.disposed {
            return Err(PanelError::Webview("disposed".into()));
        }
        self.posted.push(message.clone());
        Ok(())
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn set_title(&mut self, title: &str) {
        self.title = title.to_string();
    }

    fn reveal(&mut self) {
        self.revealed += 1;
    }

    fn dispose(&mut self) {
        self.disposed = true;
    }

    fn resource_uri(&self, path: &Path) -> String {
        path.to_string_lossy().into_owned()
    }
}

#[derive(Debug, Default)]
pub struct FakeFactory {
    pub created: usize,
}

impl WebviewFactory for FakeFactory {
    type View = FakeWebview;

    fn create(&mut self, title: &str) -> Result<FakeWebview> {
        self.created += 1;
        Ok(FakeWebview {
            title: title.to_string(),
            ..FakeWebview::active()
        })
    }
}

#[derive(Clone, Debug, Default)]
pub struct FakeRegistry {
    pub registered: Arc<Mutex<BTreeSet<&'static str>>>,
}

impl FakeRegistry {
    pub fn ids(&self) -> BTreeSet<&'static str> {
        self.registered.lock().unwrap().clone()
    }
}

impl CommandRegistry for FakeRegistry {
    fn register(&mut self, id: &'static str) {
        assert!(
            self.registered.lock().unwrap().insert(id),
            "{id} registered twice"
        );
    }

    fn unregister(&mut self, id: &'static str) {
        self.registered.lock().unwrap().remove(id);
    }
}

#[derive(Debug, Default)]
pub struct RecordingNotifier {
    warnings: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub fn warnings(&self) -> Vec<String> {
        self.warnings.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn show_warning(&self, message: &str) {
        self.warnings.lock().unwrap().push(message.to_string());
    }
}
