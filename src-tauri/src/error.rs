use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PanelError {
    #[error("{action} {}: {source}", path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("webview error: {0}")]
    Webview(String),

    #[error("invalid embedded image: {0}")]
    ImagePayload(String),

    #[error("invalid settings in {}: {source}", path.display())]
    Config {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("no panel is open")]
    NoPanel,
}

impl PanelError {
    pub fn io(action: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            action,
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, PanelError>;
