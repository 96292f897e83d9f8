//! Panel configuration and the optional markdown reformatting rules.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use unotes_protocol::EditorSettings;

use crate::error::{PanelError, Result};
use crate::fs::NoteFs;

pub const SETTINGS_FILE: &str = "unotes_settings.json";
pub const REMARK_SETTINGS_FILE: &str = "remark_settings.json";

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    /// Notes root. Note folders are relative to it.
    pub root_path: PathBuf,
    /// Relative to the note folder, or absolute when it starts with `/`.
    pub media_folder: String,
    pub image_max_width_percent: Option<u32>,
    pub editor: EditorSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            root_path: PathBuf::new(),
            media_folder: "media".to_string(),
            image_max_width_percent: None,
            editor: EditorSettings::default(),
        }
    }
}

impl Config {
    /// Loads `unotes_settings.json` from `root`. A missing file gives the
    /// defaults rooted at `root`.
    pub fn load(fs: &dyn NoteFs, root: &Path) -> Result<Self> {
        let path = root.join(SETTINGS_FILE);
        let mut config = if fs.exists(&path) {
            let data = fs
                .read_to_string(&path)
                .map_err(|e| PanelError::io("read", &path, e))?;
            serde_json::from_str::<Config>(&data)
                .map_err(|source| PanelError::Config { path, source })?
        } else {
            Config::default()
        };
        if config.root_path.as_os_str().is_empty() {
            config.root_path = root.to_path_buf();
        }
        Ok(config)
    }

    pub fn media_folder_is_absolute(&self) -> bool {
        self.media_folder.starts_with('/')
    }

    /// Editor settings as pushed to the surface; the top-level width wins over
    /// the nested one.
    pub fn editor_settings(&self) -> EditorSettings {
        let mut settings = self.editor.clone();
        if self.image_max_width_percent.is_some() {
            settings.image_max_width_percent = self.image_max_width_percent;
        }
        settings
    }
}

/// Result of looking for `remark_settings.json`.
#[derive(Debug)]
pub enum RemarkSettings {
    Missing,
    Loaded(Value),
    Invalid(PanelError),
}

impl RemarkSettings {
    pub fn load(fs: &dyn NoteFs, folder: &Path) -> Self {
        let path = folder.join(REMARK_SETTINGS_FILE);
        if !fs.exists(&path) {
            return RemarkSettings::Missing;
        }
        let data = match fs.read_to_string(&path) {
            Ok(data) => data,
            Err(e) => return RemarkSettings::Invalid(PanelError::io("read", path, e)),
        };
        match serde_json::from_str::<Value>(&data) {
            Ok(value) => RemarkSettings::Loaded(value),
            Err(source) => RemarkSettings::Invalid(PanelError::Config { path, source }),
        }
    }

    pub fn into_value(self) -> Option<Value> {
        match self {
            RemarkSettings::Loaded(value) => Some(value),
            RemarkSettings::Missing | RemarkSettings::Invalid(_) => None,
        }
    }
}
