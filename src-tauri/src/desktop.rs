//! Tauri shell: the panel window, the commands the webview invokes and the
//! window events that drive the panel lifecycle.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use tauri::{AppHandle, Manager, State, WebviewUrl, WebviewWindow, WebviewWindowBuilder, WindowEvent};
use tauri_plugin_dialog::{DialogExt, MessageDialogKind};
use unotes_protocol::{HostMessage, SurfaceMessage};

use crate::config::Config;
use crate::error::{PanelError, Result};
use crate::fs::NativeFs;
use crate::panel::{Note, PANEL_TITLE};
use crate::slot::PanelSlot;
use crate::webview::{Notifier, NullRegistry, Webview, WebviewFactory};

/// DOM event the surface listens on for host messages.
pub const HOST_EVENT: &str = "unotes-message";

pub struct TauriWebview {
    window: WebviewWindow,
}

impl TauriWebview {
    pub fn label(&self) -> &str {
        self.window.label()
    }
}

impl Webview for TauriWebview {
    fn post_message(&mut self, message: &HostMessage) -> Result<()> {
        let json =
            serde_json::to_string(message).map_err(|e| PanelError::Webview(e.to_string()))?;
        let detail =
            serde_json::to_string(&json).map_err(|e| PanelError::Webview(e.to_string()))?;
        self.window
            .eval(&format!(
                "window.dispatchEvent(new CustomEvent('{HOST_EVENT}', {{ detail: {detail} }}))"
            ))
            .map_err(|e| PanelError::Webview(e.to_string()))
    }

    fn is_active(&self) -> bool {
        self.window.is_visible().unwrap_or(false) && self.window.is_focused().unwrap_or(false)
    }

    fn set_title(&mut self, title: &str) {
        if let Err(e) = self.window.set_title(title) {
            log::warn!("failed to set panel title: {e}");
        }
    }

    fn reveal(&mut self) {
        let _ = self.window.show();
        let _ = self.window.set_focus();
    }

    fn dispose(&mut self) {
        if let Err(e) = self.window.close() {
            log::debug!("panel window already gone: {e}");
        }
    }

    fn resource_uri(&self, path: &Path) -> String {
        asset_url(path)
    }
}

/// Same URL shape as `convertFileSrc` in the Tauri JS API.
fn asset_url(path: &Path) -> String {
    let raw = path.to_string_lossy();
    let mut encoded = String::with_capacity(raw.len());
    for byte in raw.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                encoded.push(byte as char)
            }
            other => encoded.push_str(&format!("%{other:02X}")),
        }
    }
    if cfg!(windows) {
        format!("http://asset.localhost/{encoded}")
    } else {
        format!("asset://localhost/{encoded}")
    }
}

pub struct TauriWebviewFactory {
    app: AppHandle,
    next_id: u32,
}

impl WebviewFactory for TauriWebviewFactory {
    type View = TauriWebview;

    fn create(&mut self, title: &str) -> Result<TauriWebview> {
        self.next_id += 1;
        let label = format!("unotes-{}", self.next_id);
        let window = WebviewWindowBuilder::new(&self.app, label, WebviewUrl::App("index.html".into()))
            .title(title)
            .inner_size(900.0, 800.0)
            .build()
            .map_err(|e| PanelError::Webview(e.to_string()))?;
        Ok(TauriWebview { window })
    }
}

/// Shows warnings to the user in a native message box.
pub struct DialogNotifier {
    app: AppHandle,
}

impl Notifier for DialogNotifier {
    fn show_warning(&self, message: &str) {
        log::warn!("{message}");
        self.app
            .dialog()
            .message(message)
            .kind(MessageDialogKind::Warning)
            .title(PANEL_TITLE)
            .show(|_| {});
    }
}

pub struct Session(Mutex<PanelSlot<TauriWebviewFactory>>);

impl Session {
    fn slot(&self) -> std::result::Result<MutexGuard<'_, PanelSlot<TauriWebviewFactory>>, String> {
        self.0.lock().map_err(|e| e.to_string())
    }
}

fn init_notes_root(app: &AppHandle) -> std::result::Result<PathBuf, String> {
    let docs = app.path().document_dir().map_err(|e| e.to_string())?;
    let root = docs.join("UNotes");
    if !root.exists() {
        fs::create_dir_all(&root).map_err(|e| e.to_string())?;
        fs::write(
            root.join("Welcome.md"),
            "# Welcome to UNotes\n\nEdit this note in the panel.\n",
        )
        .map_err(|e| e.to_string())?;
    }
    Ok(root)
}

#[tauri::command]
fn surface_message(state: State<'_, Session>, message: SurfaceMessage) -> std::result::Result<(), String> {
    state.slot()?.handle_message(message);
    Ok(())
}

#[tauri::command]
fn run_command(state: State<'_, Session>, id: &str) -> std::result::Result<bool, String> {
    Ok(state.slot()?.run_command(id))
}

#[tauri::command]
fn open_note(
    state: State<'_, Session>,
    path: &str,
    folder_path: &str,
    label: &str,
) -> std::result::Result<(), String> {
    state
        .slot()?
        .show_note(Note::new(path, folder_path, label))
        .map_err(|e| e.to_string())
}

/// Change notification for the note on display. Called by whatever watches
/// the notes folder (a file-tree frontend or a companion tool); the shell
/// runs no watcher of its own.
#[tauri::command]
fn file_changed(state: State<'_, Session>, path: &str) -> std::result::Result<bool, String> {
    Ok(state.slot()?.file_changed(Path::new(path)))
}

#[tauri::command]
fn note_renamed(
    state: State<'_, Session>,
    old_path: &str,
    new_path: &str,
    folder_path: &str,
    label: &str,
) -> std::result::Result<(), String> {
    state
        .slot()?
        .switch_if_open(Path::new(old_path), Note::new(new_path, folder_path, label));
    Ok(())
}

#[tauri::command]
fn note_deleted(state: State<'_, Session>, path: &str) -> std::result::Result<(), String> {
    let mut slot = state.slot()?;
    slot.close_if_open(Path::new(path));
    slot.check_current_file();
    Ok(())
}

#[tauri::command]
fn image_max_width(state: State<'_, Session>, percent: u32) -> std::result::Result<(), String> {
    state.slot()?.image_max_width(percent);
    Ok(())
}

#[tauri::command]
fn reload_settings(state: State<'_, Session>) -> std::result::Result<(), String> {
    let mut slot = state.slot()?;
    let root = slot.config().root_path.clone();
    let config = Config::load(&NativeFs, &root).map_err(|e| e.to_string())?;
    slot.config_changed(config);
    Ok(())
}

fn on_window_event(window: &tauri::Window, event: &WindowEvent) {
    let Some(session) = window.try_state::<Session>() else {
        return;
    };
    let Ok(mut slot) = session.slot() else {
        return;
    };
    let is_panel = slot
        .instance()
        .is_some_and(|panel| panel.view().label() == window.label());
    if !is_panel {
        return;
    }
    match event {
        WindowEvent::Focused(true) => {
            slot.view_state_changed(true);
            slot.check_current_file();
        }
        WindowEvent::Focused(false) => slot.view_state_changed(false),
        WindowEvent::ThemeChanged(_) => slot.theme_changed(),
        WindowEvent::Destroyed => slot.close(),
        _ => {}
    }
}

#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    tauri::Builder::default()
        .plugin(tauri_plugin_opener::init())
        .plugin(tauri_plugin_dialog::init())
        .setup(|app| {
            let handle = app.handle().clone();
            let root = init_notes_root(&handle)?;
            let config = Config::load(&NativeFs, &root)?;
            let notifier = DialogNotifier { app: handle.clone() };
            let factory = TauriWebviewFactory {
                app: handle,
                next_id: 0,
            };
            let mut slot = PanelSlot::new(
                factory,
                Arc::new(NativeFs),
                Arc::new(notifier),
                Box::new(NullRegistry),
                config,
            );
            slot.show_note(Note::new(root.join("Welcome.md"), "", "Welcome.md"))?;
            app.manage(Session(Mutex::new(slot)));
            Ok(())
        })
        .on_window_event(on_window_event)
        .invoke_handler(tauri::generate_handler![
            surface_message,
            run_command,
            open_note,
            file_changed,
            note_renamed,
            note_deleted,
            image_max_width,
            reload_settings
        ])
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}
