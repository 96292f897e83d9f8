use thiserror::Error;
use unotes_protocol::EditorCommand;

/// Display mode of the editor. Each mode keeps its own scroll cache.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum EditorMode {
    #[default]
    Wysiwyg,
    Markdown,
}

impl EditorMode {
    pub fn toggled(self) -> Self {
        match self {
            EditorMode::Wysiwyg => EditorMode::Markdown,
            EditorMode::Markdown => EditorMode::Wysiwyg,
        }
    }
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("failed to load content: {0}")]
    Load(String),
    #[error("editor command failed: {0}")]
    Command(#[from] crate::editor_core::CoreError),
}

/// The editing engine the surface drives. The surface never looks inside it.
pub trait EditorEngine {
    fn set_markdown(&mut self, markdown: &str) -> Result<(), EngineError>;
    fn markdown(&self) -> String;
    fn scroll_top(&self) -> i32;
    fn set_scroll_top(&mut self, top: i32) -> Result<(), EngineError>;
    fn set_selection(&mut self, start: usize, end: usize);
    fn mode(&self) -> EditorMode;
    fn change_mode(&mut self, mode: EditorMode);
    fn exec(&mut self, command: EditorCommand) -> Result<(), EngineError>;
    fn focus(&mut self);
}
