//! The note panel: what is showing, what was last saved, and every disk
//! access the editor needs.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use unotes_protocol::{content_hash, ContentUpdate, EditorCommand, HostMessage, SurfaceMessage};

use crate::commands::PanelCommand;
use crate::config::{Config, RemarkSettings};
use crate::error::{PanelError, Result};
use crate::fs::{normalize_path, NoteFs};
use crate::images::{self, PendingImage};
use crate::webview::{Notifier, Webview};

pub const PANEL_TITLE: &str = "UNotes";

/// A document the panel can show.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Note {
    /// Absolute path of the markdown file.
    pub path: PathBuf,
    /// Folder of the note relative to the notes root.
    pub folder_path: PathBuf,
    pub label: String,
}

impl Note {
    pub fn new(
        path: impl Into<PathBuf>,
        folder_path: impl Into<PathBuf>,
        label: impl Into<String>,
    ) -> Self {
        Self {
            path: normalize_path(&path.into()),
            folder_path: folder_path.into(),
            label: label.into(),
        }
    }

    pub fn full_path(&self) -> &Path {
        &self.path
    }
}

/// What the owner of the panel has to do after a message was handled.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PanelAction {
    None,
    Recreate,
}

pub struct NotePanel<V: Webview> {
    view: V,
    fs: Arc<dyn NoteFs>,
    notifier: Arc<dyn Notifier>,
    config: Config,
    current_note: Option<Note>,
    saved_content: HashMap<PathBuf, String>,
    /// Path of our own last write, so its change event is not taken for an
    /// external edit.
    writing_file: Option<PathBuf>,
    reload_content_needed: bool,
    update_settings_needed: bool,
    pending_image: PendingImage,
}

impl<V: Webview> NotePanel<V> {
    pub fn new(view: V, fs: Arc<dyn NoteFs>, notifier: Arc<dyn Notifier>, config: Config) -> Self {
        let mut panel = Self {
            view,
            fs,
            notifier,
            config,
            current_note: None,
            saved_content: HashMap::new(),
            writing_file: None,
            reload_content_needed: false,
            update_settings_needed: false,
            pending_image: PendingImage::None,
        };
        panel.update_editor_settings();
        panel
    }

    pub fn initialize(&mut self) {
        self.update_remark_settings();
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    pub fn view_mut(&mut self) -> &mut V {
        &mut self.view
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn set_config(&mut self, config: Config) {
        self.config = config;
        self.update_editor_settings();
    }

    pub fn current_note(&self) -> Option<&Note> {
        self.current_note.as_ref()
    }

    pub fn current_path(&self) -> Option<&Path> {
        self.current_note.as_ref().map(Note::full_path)
    }

    pub fn saved_content(&self, path: &Path) -> Option<&str> {
        self.saved_content.get(path).map(String::as_str)
    }

    pub fn pending_image(&self) -> &PendingImage {
        &self.pending_image
    }

    pub fn reload_pending(&self) -> bool {
        self.reload_content_needed
    }

    pub fn handle_message(&mut self, message: SurfaceMessage) -> Result<PanelAction> {
        match message {
            SurfaceMessage::ApplyChanges {
                content,
                content_path,
            } => {
                self.apply_changes(content, content_path.as_deref())?;
            }
            SurfaceMessage::EditorOpened => {
                if let Err(e) = self.update_contents(true) {
                    log::warn!("failed to load note for new editor: {e}");
                }
                self.update_editor_settings();
                self.update_remark_settings();
            }
            SurfaceMessage::Resized => return Ok(PanelAction::Recreate),
            SurfaceMessage::ConvertImage { path, data } => {
                self.queue_image(Path::new(&path), data);
            }
            SurfaceMessage::Console { content } => {
                log::info!("editor: {content}");
            }
            SurfaceMessage::Reopen { error } => {
                log::error!("editor asked to reopen: {error}");
                return Ok(PanelAction::Recreate);
            }
        }
        Ok(PanelAction::None)
    }

    pub fn run_command(&mut self, command: PanelCommand) -> Result<()> {
        match command {
            PanelCommand::Exec(args) => self.hotkey_exec(args),
            PanelCommand::ToggleMode => self.toggle_editor_mode(),
            PanelCommand::Focus => self.focus(),
            PanelCommand::InsertTemplate => {
                log::debug!("insert template is not available");
                Ok(())
            }
        }
    }

    /// Persists edited content, running a pending image rewrite first.
    pub fn apply_changes(&mut self, content: String, content_path: Option<&str>) -> Result<()> {
        if let (Some(from), Some(current)) = (content_path, self.current_path()) {
            if normalize_path(Path::new(from)) != current {
                log::debug!("changes for {from} saved to {}", current.display());
            }
        }

        let pending = std::mem::take(&mut self.pending_image);
        let content = match &pending {
            PendingImage::None => content,
            PendingImage::Replace {
                payload,
                resolved_path,
            } => self.replace_image(&content, payload, resolved_path),
            PendingImage::Convert { payload } => match self.convert_image(&content, payload) {
                Ok(converted) => converted,
                Err(e) => {
                    log::warn!("image conversion failed: {e}");
                    content
                }
            },
        };

        self.save_changes(&content)?;
        if pending.is_pending() {
            self.update_contents(true)?;
        }
        Ok(())
    }

    pub fn save_changes(&mut self, content: &str) -> Result<()> {
        let Some(path) = self.current_path().map(Path::to_path_buf) else {
            return Ok(());
        };
        self.writing_file = Some(path.clone());
        self.fs
            .write_file(&path, content)
            .map_err(|e| PanelError::io("write", &path, e))?;
        self.saved_content.insert(path, content.to_string());
        Ok(())
    }

    /// Shows `note`. The note is kept even when the file cannot be read, so
    /// the next forced push can retry.
    pub fn show_note(&mut self, note: Note) {
        let title = format!("{PANEL_TITLE} - {}", note.label);
        self.current_note = Some(note);
        if let Err(e) = self.update_contents(true) {
            log::warn!("failed to load note: {e}");
        }
        self.view.set_title(&title);
    }

    /// Pushes the file on disk to the editor. Returns false when no note is
    /// showing.
    pub fn update_contents(&mut self, force: bool) -> Result<bool> {
        let Some(note) = &self.current_note else {
            return Ok(false);
        };
        let path = note.full_path();
        let content = self
            .fs
            .read_to_string(path)
            .map_err(|e| PanelError::io("read", path, e))?;
        let file_hash = content_hash(&content);
        let saved_hash = match self.saved_content.get(path) {
            Some(saved) if !force => content_hash(saved),
            _ => String::new(),
        };
        let folder_path = self
            .view
            .resource_uri(&self.config.root_path.join(&note.folder_path));
        let update = ContentUpdate {
            content,
            file_hash,
            saved_hash,
            content_path: path.to_string_lossy().into_owned(),
            folder_path,
            percent: self.config.image_max_width_percent,
        };
        self.view.post_message(&HostMessage::SetContent(update))?;
        Ok(true)
    }

    /// Entry point for external change notifications. Returns whether the
    /// change concerned the note on display.
    pub fn update_file_if_open(&mut self, path: &Path) -> Result<bool> {
        let path = normalize_path(path);
        let is_current = self.current_path() == Some(path.as_path());
        let self_write = self.writing_file.as_deref() == Some(path.as_path());
        if is_current && !self_write {
            if self.view.is_active() {
                self.update_contents(false)?;
            } else {
                self.reload_content_needed = true;
            }
            return Ok(true);
        }
        self.writing_file = None;
        Ok(false)
    }

    pub fn view_state_changed(&mut self, active: bool) -> Result<()> {
        if !active {
            return Ok(());
        }
        if self.update_settings_needed {
            self.update_settings_needed = false;
            self.update_editor_settings();
        }
        if self.reload_content_needed {
            self.reload_content_needed = false;
            self.update_contents(true)?;
        }
        Ok(())
    }

    /// Whether the note on display is gone from disk.
    pub fn current_file_missing(&self) -> bool {
        self.current_path()
            .is_some_and(|path| !self.fs.exists(path))
    }

    pub fn is_showing(&self, path: &Path) -> bool {
        self.current_path() == Some(normalize_path(path).as_path())
    }

    pub fn update_editor_settings(&mut self) {
        if !self.view.is_active() {
            self.update_settings_needed = true;
            return;
        }
        let settings = self.config.editor_settings();
        if let Err(e) = self.view.post_message(&HostMessage::Settings { settings }) {
            log::warn!("failed to push editor settings: {e}");
        }
    }

    pub fn update_remark_settings(&mut self) {
        let settings = match RemarkSettings::load(self.fs.as_ref(), &self.config.root_path) {
            RemarkSettings::Invalid(e) => {
                log::warn!("{e}");
                self.notifier.show_warning(
                    "Failed to load remark_settings.json file. \nNo Unotes remark formatting will be done.",
                );
                None
            }
            other => other.into_value(),
        };
        if let Err(e) = self.view.post_message(&HostMessage::RemarkSettings { settings }) {
            log::warn!("failed to push remark settings: {e}");
        }
    }

    pub fn image_max_width(&mut self, percent: u32) -> Result<()> {
        if self.view.is_active() {
            self.view.post_message(&HostMessage::ImageMaxWidth { percent })?;
        }
        self.update_contents(true)?;
        Ok(())
    }

    fn hotkey_exec(&mut self, args: EditorCommand) -> Result<()> {
        if self.view.is_active() {
            self.view.post_message(&HostMessage::Exec { args })?;
        }
        Ok(())
    }

    fn toggle_editor_mode(&mut self) -> Result<()> {
        if self.view.is_active() {
            self.view.post_message(&HostMessage::ToggleMode)?;
        }
        Ok(())
    }

    fn focus(&mut self) -> Result<()> {
        if self.view.is_active() {
            self.view.post_message(&HostMessage::Focus)?;
        }
        Ok(())
    }

    fn note_folder_full_path(&self, note: &Note) -> PathBuf {
        self.config.root_path.join(&note.folder_path)
    }

    fn media_folder_full_path(&self, note: &Note) -> PathBuf {
        if self.config.media_folder_is_absolute() {
            return PathBuf::from(&self.config.media_folder);
        }
        self.note_folder_full_path(note).join(&self.config.media_folder)
    }

    /// Records what the next `applyChanges` has to do with a pasted image.
    pub fn queue_image(&mut self, image_path: &Path, data: String) {
        let Some(note) = &self.current_note else {
            self.pending_image = PendingImage::Convert { payload: data };
            return;
        };
        let image_path = normalize_path(image_path);
        let media_dir = normalize_path(&self.media_folder_full_path(note));
        let in_media = image_path
            .parent()
            .is_some_and(|dir| dir.starts_with(&media_dir));
        self.pending_image = match image_path.strip_prefix(&media_dir) {
            Ok(relative) if in_media => PendingImage::Replace {
                payload: data,
                resolved_path: images::image_tag_url(
                    &self.config.media_folder,
                    &relative.to_string_lossy(),
                ),
            },
            _ => PendingImage::Convert { payload: data },
        };
    }

    /// Writes the embedded image(s) to the media folder and links them.
    pub fn convert_image(&self, content: &str, payload: &str) -> Result<String> {
        let Some(note) = &self.current_note else {
            return Ok(content.to_string());
        };
        let media_dir = self.media_folder_full_path(note);
        let conversion = images::convert_images(
            self.fs.as_ref(),
            &media_dir,
            &self.config.media_folder,
            content,
            payload,
        )?;
        for file in &conversion.files {
            log::debug!("saved pasted image to {}", file.display());
        }
        Ok(conversion.content)
    }

    pub fn replace_image(&self, content: &str, payload: &str, resolved_path: &str) -> String {
        if self.current_note.is_none() {
            return content.to_string();
        }
        images::replace_image(content, payload, resolved_path)
    }

    pub fn dispose(&mut self) {
        self.view.dispose();
    }
}
