//! Owns the single live panel for a session.
//!
//! There is never more than one panel: `create_or_show` reveals the existing
//! one, and `recreate` disposes it before building its replacement.

use std::path::Path;
use std::sync::Arc;

use unotes_protocol::SurfaceMessage;

use crate::commands::{self, COMMANDS};
use crate::config::Config;
use crate::error::{PanelError, Result};
use crate::fs::NoteFs;
use crate::panel::{Note, NotePanel, PanelAction, PANEL_TITLE};
use crate::webview::{CommandRegistry, Notifier, Webview, WebviewFactory};

pub struct PanelSlot<F: WebviewFactory> {
    factory: F,
    fs: Arc<dyn NoteFs>,
    notifier: Arc<dyn Notifier>,
    registry: Box<dyn CommandRegistry>,
    config: Config,
    panel: Option<NotePanel<F::View>>,
}

impl<F: WebviewFactory> PanelSlot<F> {
    pub fn new(
        factory: F,
        fs: Arc<dyn NoteFs>,
        notifier: Arc<dyn Notifier>,
        registry: Box<dyn CommandRegistry>,
        config: Config,
    ) -> Self {
        Self {
            factory,
            fs,
            notifier,
            registry,
            config,
            panel: None,
        }
    }

    pub fn instance(&self) -> Option<&NotePanel<F::View>> {
        self.panel.as_ref()
    }

    pub fn instance_mut(&mut self) -> Option<&mut NotePanel<F::View>> {
        self.panel.as_mut()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn create_or_show(&mut self) -> Result<&mut NotePanel<F::View>> {
        match self.panel.as_mut() {
            Some(panel) => panel.view_mut().reveal(),
            None => {
                let view = self.factory.create(PANEL_TITLE)?;
                for (id, _) in COMMANDS {
                    self.registry.register(id);
                }
                let mut panel = NotePanel::new(
                    view,
                    self.fs.clone(),
                    self.notifier.clone(),
                    self.config.clone(),
                );
                panel.initialize();
                log::debug!("panel created");
                self.panel = Some(panel);
            }
        }
        self.panel.as_mut().ok_or(PanelError::NoPanel)
    }

    pub fn close(&mut self) {
        let Some(mut panel) = self.panel.take() else {
            return;
        };
        panel.dispose();
        for (id, _) in COMMANDS {
            self.registry.unregister(id);
        }
        log::debug!("panel closed");
    }

    /// Rebuilds the panel and shows `note` again, if there was one.
    pub fn recreate(&mut self, note: Option<Note>) -> Result<()> {
        self.close();
        let panel = self.create_or_show()?;
        if let Some(note) = note {
            panel.show_note(note);
        }
        Ok(())
    }

    pub fn show_note(&mut self, note: Note) -> Result<()> {
        self.create_or_show()?.show_note(note);
        Ok(())
    }

    /// Handles a message from the editor. Failures are logged, never
    /// propagated to the host.
    pub fn handle_message(&mut self, message: SurfaceMessage) {
        if let Err(e) = self.try_handle_message(message) {
            log::error!("failed to handle editor message: {e}");
        }
    }

    pub fn try_handle_message(&mut self, message: SurfaceMessage) -> Result<()> {
        let panel = self.panel.as_mut().ok_or(PanelError::NoPanel)?;
        match panel.handle_message(message)? {
            PanelAction::None => Ok(()),
            PanelAction::Recreate => self.recreate_current(),
        }
    }

    /// Runs a palette command. Returns false for unknown ids.
    pub fn run_command(&mut self, id: &str) -> bool {
        let Some(command) = commands::lookup(id) else {
            return false;
        };
        if let Some(panel) = self.panel.as_mut() {
            if let Err(e) = panel.run_command(command) {
                log::warn!("command {id} failed: {e}");
            }
        }
        true
    }

    pub fn file_changed(&mut self, path: &Path) -> bool {
        let Some(panel) = self.panel.as_mut() else {
            return false;
        };
        panel.update_file_if_open(path).unwrap_or_else(|e| {
            log::warn!("failed to reload {}: {e}", path.display());
            true
        })
    }

    pub fn view_state_changed(&mut self, active: bool) {
        if let Some(panel) = self.panel.as_mut() {
            if let Err(e) = panel.view_state_changed(active) {
                log::warn!("failed to refresh panel: {e}");
            }
        }
    }

    pub fn config_changed(&mut self, config: Config) {
        self.config = config.clone();
        if let Some(panel) = self.panel.as_mut() {
            panel.set_config(config);
        }
    }

    pub fn image_max_width(&mut self, percent: u32) {
        if let Some(panel) = self.panel.as_mut() {
            if let Err(e) = panel.image_max_width(percent) {
                log::warn!("failed to apply image width: {e}");
            }
        }
    }

    /// The editor cannot restyle itself live, so a theme change rebuilds it.
    pub fn theme_changed(&mut self) {
        if let Err(e) = self.recreate_current() {
            log::error!("failed to recreate panel: {e}");
        }
    }

    /// Closes the panel when the note on display was deleted.
    pub fn check_current_file(&mut self) {
        if self.panel.as_ref().is_some_and(NotePanel::current_file_missing) {
            self.close();
        }
    }

    pub fn close_if_open(&mut self, path: &Path) {
        if self.panel.as_ref().is_some_and(|panel| panel.is_showing(path)) {
            self.close();
        }
    }

    /// Follows a rename of the note on display.
    pub fn switch_if_open(&mut self, old_path: &Path, new_note: Note) {
        if let Some(panel) = self.panel.as_mut() {
            if panel.is_showing(old_path) {
                panel.show_note(new_note);
            }
        }
    }

    fn recreate_current(&mut self) -> Result<()> {
        let note = self
            .panel
            .as_ref()
            .and_then(|panel| panel.current_note().cloned());
        self.recreate(note)
    }
}
