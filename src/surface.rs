//! Surface-side half of the sync protocol: decides whether a content push
//! replaces the buffer, keeps scroll offsets per path and mode, and
//! reports edits back to the host once they settle.

use std::collections::HashMap;

use serde_json::Value;
use unotes_protocol::{ContentUpdate, EditorSettings, HostMessage, SurfaceMessage};

use crate::debounce::Debouncer;
use crate::engine::{EditorEngine, EditorMode};
use crate::render::{self, FormulaRenderer, ImageOptions};

const REOPEN_MESSAGE: &str = "The Unotes panel has encountered an internal error.";

/// Outgoing channel to the host.
pub trait HostPort {
    fn post(&mut self, message: SurfaceMessage);
}

impl HostPort for Vec<SurfaceMessage> {
    fn post(&mut self, message: SurfaceMessage) {
        self.push(message);
    }
}

pub struct EditorSurface<E: EditorEngine, P: HostPort> {
    engine: E,
    port: P,
    content_path: Option<String>,
    /// Closed until a load succeeds; while closed no edits reach the host.
    content_set: bool,
    wysiwyg_scroll: HashMap<String, i32>,
    markdown_scroll: HashMap<String, i32>,
    debouncer: Debouncer,
    settings: EditorSettings,
    remark_settings: Option<Value>,
    images: ImageOptions,
}

impl<E: EditorEngine, P: HostPort> EditorSurface<E, P> {
    pub fn new(engine: E, port: P) -> Self {
        Self {
            engine,
            port,
            content_path: None,
            content_set: false,
            wysiwyg_scroll: HashMap::new(),
            markdown_scroll: HashMap::new(),
            debouncer: Debouncer::default(),
            settings: EditorSettings::default(),
            remark_settings: None,
            images: ImageOptions::default(),
        }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    pub fn port(&self) -> &P {
        &self.port
    }

    pub fn content_path(&self) -> Option<&str> {
        self.content_path.as_deref()
    }

    pub fn is_content_set(&self) -> bool {
        self.content_set
    }

    pub fn settings(&self) -> &EditorSettings {
        &self.settings
    }

    pub fn remark_settings(&self) -> Option<&Value> {
        self.remark_settings.as_ref()
    }

    pub fn images(&self) -> &ImageOptions {
        &self.images
    }

    pub fn display_class(&self) -> &'static str {
        if self.settings.display_2x {
            "display2X"
        } else {
            "display1X"
        }
    }

    pub fn has_pending_change(&self) -> bool {
        self.debouncer.is_pending()
    }

    /// Announces readiness; the host answers with a forced content push.
    pub fn opened(&mut self) {
        self.port.post(SurfaceMessage::EditorOpened);
    }

    pub fn handle_message(&mut self, message: HostMessage, now_ms: f64) {
        log::debug!("host message: {}", message.name());
        match message {
            HostMessage::SetContent(update) => {
                self.set_content(update);
            }
            HostMessage::Settings { settings } => {
                self.images.configured_percent = settings.image_max_width_percent;
                self.settings = settings;
            }
            HostMessage::RemarkSettings { settings } => {
                self.remark_settings = settings;
            }
            HostMessage::Exec { args } => match self.engine.exec(args) {
                Ok(()) => self.on_change(now_ms),
                Err(err) => log::warn!("editor command {args:?} failed: {err}"),
            },
            HostMessage::ToggleMode => self.toggle_mode(),
            HostMessage::ImageMaxWidth { percent } => {
                self.images.override_percent = Some(percent);
            }
            HostMessage::Focus => self.engine.focus(),
        }
    }

    /// Returns whether the buffer was replaced.
    pub fn set_content(&mut self, update: ContentUpdate) -> bool {
        self.images.root = update.folder_path.trim_end_matches('/').to_string();
        self.images.configured_percent = update.percent;

        let is_same_path = self.content_path.as_deref() == Some(update.content_path.as_str());
        if !is_same_path {
            // Stale selections can point past the end of the new document.
            self.engine.set_selection(0, 0);
        }

        let mut replaced = false;
        if !is_same_path || update.file_hash != update.saved_hash {
            match self.engine.set_markdown(&update.content) {
                Ok(()) => {
                    self.content_set = true;
                    replaced = true;
                }
                Err(err) => {
                    self.content_set = false;
                    log::error!("content load failed: {err}");
                    self.console(format!("Error: {err}"));
                    self.port.post(SurfaceMessage::Reopen {
                        error: REOPEN_MESSAGE.to_string(),
                    });
                }
            }
        }

        self.content_path = Some(update.content_path);
        if !is_same_path {
            let top = self.cached_scroll(self.engine.mode());
            if let Err(err) = self.engine.set_scroll_top(top) {
                log::warn!("scroll restore failed: {err}");
                self.console(format!("Error: {err}"));
            }
        }
        replaced
    }

    /// Every edit pushes the report deadline back.
    pub fn on_change(&mut self, now_ms: f64) {
        self.debouncer.schedule(now_ms);
    }

    /// Drives the debouncer; returns whether changes were sent.
    pub fn poll(&mut self, now_ms: f64) -> bool {
        if !self.debouncer.fire_due(now_ms) {
            return false;
        }
        self.emit_changes()
    }

    fn emit_changes(&mut self) -> bool {
        if !self.content_set {
            log::info!("prevented saving empty file");
            return false;
        }
        self.port.post(SurfaceMessage::ApplyChanges {
            content: self.engine.markdown(),
            content_path: self.content_path.clone(),
        });
        true
    }

    pub fn caret_changed(&mut self) {
        let Some(path) = self.content_path.clone() else {
            return;
        };
        let mode = self.engine.mode();
        let top = self.engine.scroll_top();
        self.scroll_cache_mut(mode).insert(path, top);
    }

    /// Switches the view only. Scroll is restored on path changes, not here.
    pub fn toggle_mode(&mut self) {
        let next = self.engine.mode().toggled();
        self.engine.change_mode(next);
    }

    pub fn window_focused(&mut self) {
        if self.settings.extra_focus {
            self.engine.focus();
        }
    }

    pub fn request_image_conversion(&mut self, path: String, data: String) {
        self.port.post(SurfaceMessage::ConvertImage { path, data });
    }

    pub fn console(&mut self, content: String) {
        self.port.post(SurfaceMessage::Console { content });
    }

    pub fn preview_html(&self, formulas: &dyn FormulaRenderer) -> String {
        render::render_markdown(&self.engine.markdown(), &self.images, formulas)
    }

    pub fn cached_scroll(&self, mode: EditorMode) -> i32 {
        let cache = match mode {
            EditorMode::Wysiwyg => &self.wysiwyg_scroll,
            EditorMode::Markdown => &self.markdown_scroll,
        };
        self.content_path
            .as_ref()
            .and_then(|path| cache.get(path))
            .copied()
            .unwrap_or(0)
    }

    fn scroll_cache_mut(&mut self, mode: EditorMode) -> &mut HashMap<String, i32> {
        match mode {
            EditorMode::Wysiwyg => &mut self.wysiwyg_scroll,
            EditorMode::Markdown => &mut self.markdown_scroll,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor_core::MarkdownBuffer;
    use unotes_protocol::{content_hash, EditorCommand};

    type Surface = EditorSurface<MarkdownBuffer, Vec<SurfaceMessage>>;

    fn surface() -> Surface {
        EditorSurface::new(MarkdownBuffer::default(), Vec::new())
    }

    fn update(path: &str, content: &str, saved: &str) -> ContentUpdate {
        ContentUpdate {
            content: content.to_string(),
            file_hash: content_hash(content),
            saved_hash: if saved.is_empty() {
                String::new()
            } else {
                content_hash(saved)
            },
            content_path: path.to_string(),
            folder_path: "/notes/".to_string(),
            percent: None,
        }
    }

    #[test]
    fn same_path_and_matching_hash_keeps_the_buffer() {
        let mut surface = surface();
        assert!(surface.set_content(update("/n/a.md", "one", "")));
        surface.engine_mut().set_markdown("one plus local edit").unwrap();

        assert!(!surface.set_content(update("/n/a.md", "one", "one")));
        assert_eq!(surface.engine().markdown(), "one plus local edit");

        assert!(surface.set_content(update("/n/a.md", "two", "one")));
        assert_eq!(surface.engine().markdown(), "two");
    }

    #[test]
    fn new_path_always_replaces_and_restores_scroll() {
        let mut surface = surface();
        surface.set_content(update("/n/a.md", "a", ""));
        surface.engine_mut().set_scroll_top(120).unwrap();
        surface.caret_changed();

        assert!(surface.set_content(update("/n/b.md", "a", "a")));
        assert_eq!(surface.engine().scroll_top(), 0);
        assert_eq!(surface.content_path(), Some("/n/b.md"));

        surface.set_content(update("/n/a.md", "a", "a"));
        assert_eq!(surface.engine().scroll_top(), 120);
    }

    #[test]
    fn scroll_caches_are_per_mode() {
        let mut surface = surface();
        surface.set_content(update("/n/a.md", "a", ""));
        surface.engine_mut().set_scroll_top(40).unwrap();
        surface.caret_changed();

        surface.toggle_mode();
        assert_eq!(surface.engine().mode(), EditorMode::Markdown);
        assert_eq!(surface.engine().scroll_top(), 40);
        assert_eq!(surface.cached_scroll(EditorMode::Markdown), 0);
        assert_eq!(surface.cached_scroll(EditorMode::Wysiwyg), 40);
    }

    #[test]
    fn caret_change_without_path_is_ignored() {
        let mut surface = surface();
        surface.engine_mut().set_scroll_top(10).unwrap();
        surface.caret_changed();
        assert_eq!(surface.cached_scroll(EditorMode::Wysiwyg), 0);
    }

    #[test]
    fn failed_load_closes_gate_and_asks_for_reopen() {
        let mut surface = surface();
        surface.set_content(update("/n/a.md", "good", ""));
        assert!(surface.is_content_set());

        assert!(!surface.set_content(update("/n/b.md", "bad\0", "")));
        assert!(!surface.is_content_set());
        assert!(surface
            .port()
            .iter()
            .any(|m| matches!(m, SurfaceMessage::Reopen { .. })));

        surface.on_change(0.0);
        assert!(!surface.poll(1000.0));
        assert!(!surface
            .port()
            .iter()
            .any(|m| matches!(m, SurfaceMessage::ApplyChanges { .. })));
    }

    #[test]
    fn edits_are_reported_once_after_quiet_period() {
        let mut surface = surface();
        surface.set_content(update("/n/a.md", "", ""));
        surface.engine_mut().set_markdown("h").unwrap();
        surface.on_change(0.0);
        surface.engine_mut().set_markdown("hello").unwrap();
        surface.on_change(200.0);

        assert!(!surface.poll(500.0));
        assert!(surface.poll(600.0));
        assert!(!surface.poll(2000.0));

        let applied: Vec<_> = surface
            .port()
            .iter()
            .filter(|m| matches!(m, SurfaceMessage::ApplyChanges { .. }))
            .collect();
        assert_eq!(
            applied,
            vec![&SurfaceMessage::ApplyChanges {
                content: "hello".into(),
                content_path: Some("/n/a.md".into()),
            }]
        );
    }

    #[test]
    fn edits_before_first_load_are_not_sent() {
        let mut surface = surface();
        surface.on_change(0.0);
        assert!(!surface.poll(500.0));
        assert!(surface.port().is_empty());
    }

    #[test]
    fn exec_edits_and_schedules_report() {
        let mut surface = surface();
        surface.set_content(update("/n/a.md", "title", ""));
        surface.engine_mut().set_selection(0, 0);
        surface.handle_message(
            HostMessage::Exec {
                args: EditorCommand::Heading { level: 2 },
            },
            0.0,
        );
        assert_eq!(surface.engine().markdown(), "## title");
        assert!(surface.has_pending_change());
    }

    #[test]
    fn outside_edit_with_multibyte_text_then_exec() {
        let mut surface = surface();
        surface.set_content(update("/n/a.md", "abc", ""));
        surface.engine_mut().set_selection(2, 2);

        assert!(surface.set_content(update("/n/a.md", "aé", "abc")));
        surface.handle_message(HostMessage::Exec { args: EditorCommand::Bold }, 0.0);

        assert_eq!(surface.engine().markdown(), "a****é");
        assert!(surface.has_pending_change());
    }

    #[test]
    fn settings_and_width_override_feed_image_options() {
        let mut surface = surface();
        surface.handle_message(
            HostMessage::Settings {
                settings: EditorSettings {
                    display_2x: true,
                    extra_focus: true,
                    image_max_width_percent: Some(25),
                },
            },
            0.0,
        );
        assert_eq!(surface.images().effective_percent(), Some(25));
        assert_eq!(surface.display_class(), "display2X");

        surface.handle_message(HostMessage::ImageMaxWidth { percent: 75 }, 0.0);
        assert_eq!(surface.images().effective_percent(), Some(75));

        surface.engine_mut().blur();
        surface.window_focused();
        assert!(surface.engine().is_focused());
    }

    #[test]
    fn content_push_sets_image_root() {
        let mut surface = surface();
        surface.set_content(update("/n/a.md", "![x](media/x.png)", ""));
        assert_eq!(surface.images().root, "/notes");
    }

    #[test]
    fn remark_settings_are_kept() {
        let mut surface = surface();
        surface.handle_message(
            HostMessage::RemarkSettings {
                settings: Some(serde_json::json!({ "gfm": true })),
            },
            0.0,
        );
        assert_eq!(
            surface.remark_settings(),
            Some(&serde_json::json!({ "gfm": true }))
        );
    }
}
