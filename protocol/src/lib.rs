//! Messages exchanged between the panel controller (host) and the editor
//! surface (webview).
//!
//! Messages are fire-and-forget and carry no correlation id. Both sides infer
//! what happened from content hashes and path identity.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

/// Content identity hash. Only ever compared for equality.
pub fn content_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}

/// Current file state pushed to the surface.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentUpdate {
    pub content: String,
    pub file_hash: String,
    /// Empty when the push is forced.
    pub saved_hash: String,
    pub content_path: String,
    /// Webview-visible root used to resolve relative image sources.
    pub folder_path: String,
    pub percent: Option<u32>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EditorSettings {
    #[serde(rename = "display2X")]
    pub display_2x: bool,
    pub extra_focus: bool,
    pub image_max_width_percent: Option<u32>,
}

/// Formatting commands the host can ask the editor to run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "name", rename_all = "camelCase")]
pub enum EditorCommand {
    /// Level 0 turns the line back into a normal paragraph.
    Heading { level: u8 },
    Bold,
    Italic,
    Strike,
    TaskList,
    BulletList,
    OrderedList,
    BlockQuote,
    Code,
    CodeBlock,
    Indent,
    Outdent,
    Hr,
}

/// Controller → surface.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "camelCase")]
pub enum HostMessage {
    SetContent(ContentUpdate),
    Settings { settings: EditorSettings },
    RemarkSettings { settings: Option<Value> },
    Exec { args: EditorCommand },
    ToggleMode,
    ImageMaxWidth { percent: u32 },
    Focus,
}

/// Surface → controller.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "camelCase")]
pub enum SurfaceMessage {
    ApplyChanges {
        content: String,
        #[serde(rename = "contentPath")]
        content_path: Option<String>,
    },
    EditorOpened,
    Resized,
    ConvertImage {
        path: String,
        data: String,
    },
    Console {
        content: String,
    },
    /// The surface failed to load content and wants the panel rebuilt.
    Reopen {
        error: String,
    },
}

impl HostMessage {
    pub fn name(&self) -> &'static str {
        match self {
            HostMessage::SetContent(_) => "setContent",
            HostMessage::Settings { .. } => "settings",
            HostMessage::RemarkSettings { .. } => "remarkSettings",
            HostMessage::Exec { .. } => "exec",
            HostMessage::ToggleMode => "toggleMode",
            HostMessage::ImageMaxWidth { .. } => "imageMaxWidth",
            HostMessage::Focus => "focus",
        }
    }
}
