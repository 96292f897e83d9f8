use std::time::Duration;

use leptos::html::Textarea;
use leptos::prelude::*;
use leptos::task::spawn_local;
use serde::Serialize;
use unotes_protocol::{HostMessage, SurfaceMessage};
use wasm_bindgen::prelude::*;

use crate::debounce::CHANGE_DELAY_MS;
use crate::editor_core::{MarkdownBuffer, Selection};
use crate::engine::{EditorEngine, EditorMode};
use crate::render::{highlight_markdown, FormulaRenderer};
use crate::shortcuts::{command_for_key, Modifiers};
use crate::surface::{EditorSurface, HostPort};

/// DOM event the host dispatches its messages on.
const HOST_EVENT: &str = "unotes-message";

#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(js_namespace = ["window", "__TAURI__", "core"])]
    async fn invoke(cmd: &str, args: JsValue) -> JsValue;

    #[wasm_bindgen(catch, js_namespace = katex, js_name = renderToString)]
    fn katex_render_to_string(source: &str, options: &JsValue) -> Result<String, JsValue>;
}

#[derive(Serialize)]
struct SurfaceMessageArgs<'a> {
    message: &'a SurfaceMessage,
}

#[derive(Serialize)]
struct RunCommandArgs<'a> {
    id: &'a str,
}

/// Sends surface messages to the host through the `surface_message` command.
struct TauriPort;

impl HostPort for TauriPort {
    fn post(&mut self, message: SurfaceMessage) {
        spawn_local(async move {
            match serde_wasm_bindgen::to_value(&SurfaceMessageArgs { message: &message }) {
                Ok(args) => {
                    invoke("surface_message", args).await;
                }
                Err(err) => log::error!("failed to encode message for host: {err}"),
            }
        });
    }
}

struct KatexRenderer;

impl FormulaRenderer for KatexRenderer {
    fn render(&self, source: &str) -> Result<String, String> {
        let options = js_sys::Object::new();
        js_sys::Reflect::set(&options, &"throwOnError".into(), &JsValue::FALSE)
            .map_err(|e| format!("{e:?}"))?;
        katex_render_to_string(source, &options).map_err(|err| {
            err.dyn_ref::<js_sys::Error>()
                .map(|e| String::from(e.message()))
                .unwrap_or_else(|| format!("{err:?}"))
        })
    }
}

/// Textarea offsets count UTF-16 units; the buffer works in bytes.
fn utf16_to_byte(text: &str, offset: u32) -> usize {
    let mut units = 0u32;
    for (idx, ch) in text.char_indices() {
        if units >= offset {
            return idx;
        }
        units += ch.len_utf16() as u32;
    }
    text.len()
}

type Surface = EditorSurface<MarkdownBuffer, TauriPort>;

#[component]
pub fn App() -> impl IntoView {
    let surface = StoredValue::new_local(Surface::new(MarkdownBuffer::default(), TauriPort));
    let textarea = NodeRef::<Textarea>::new();

    let (content, set_content) = signal(String::new());
    let (highlighted, set_highlighted) = signal(String::new());
    let (preview, set_preview) = signal(String::new());
    let (mode, set_mode) = signal(EditorMode::default());
    let (display_class, set_display_class) = signal("display1X");
    let (scroll_top, set_scroll_top) = signal(0);
    let (title, set_title) = signal(String::new());

    // Pull everything the view shows out of the surface.
    let refresh = move || {
        let wants_focus = surface.with_value(|s| {
            let markdown = s.engine().markdown();
            set_highlighted.set(highlight_markdown(&markdown));
            set_preview.set(s.preview_html(&KatexRenderer));
            set_content.set(markdown);
            set_mode.set(s.engine().mode());
            set_display_class.set(s.display_class());
            set_scroll_top.set(s.engine().scroll_top());
            set_title.set(s.content_path().unwrap_or_default().to_string());
            s.engine().is_focused()
        });
        if wants_focus {
            if let Some(el) = textarea.get_untracked() {
                let _ = el.focus();
            }
            surface.update_value(|s| s.engine_mut().blur());
        }
    };

    let schedule_poll = move || {
        set_timeout(
            move || {
                let sent = surface
                    .try_update_value(|s| s.poll(js_sys::Date::now()))
                    .unwrap_or(false);
                if sent {
                    log::debug!("changes sent to host");
                }
            },
            Duration::from_millis(CHANGE_DELAY_MS as u64 + 20),
        );
    };

    let caret_changed = move || {
        if let Some(el) = textarea.get_untracked() {
            let text = el.value();
            let start = el.selection_start().ok().flatten().unwrap_or(0);
            let end = el.selection_end().ok().flatten().unwrap_or(start);
            let (start, end) = (utf16_to_byte(&text, start), utf16_to_byte(&text, end));
            surface.update_value(|s| {
                s.engine_mut().set_selection(start, end);
                s.caret_changed();
            });
        }
    };

    let on_host_message = Closure::<dyn FnMut(leptos::web_sys::CustomEvent)>::new(
        move |e: leptos::web_sys::CustomEvent| {
            let Some(detail) = e.detail().as_string() else {
                return;
            };
            match serde_json::from_str::<HostMessage>(&detail) {
                Ok(message) => {
                    let edits = matches!(message, HostMessage::Exec { .. });
                    surface.update_value(|s| s.handle_message(message, js_sys::Date::now()));
                    if edits {
                        schedule_poll();
                    }
                    refresh();
                }
                Err(err) => log::warn!("unreadable host message: {err}"),
            }
        },
    );
    let _ = window().add_event_listener_with_callback(
        HOST_EVENT,
        on_host_message.as_ref().unchecked_ref(),
    );
    on_host_message.forget();

    let on_focus = Closure::<dyn FnMut()>::new(move || {
        surface.update_value(|s| s.window_focused());
        refresh();
    });
    let _ = window().add_event_listener_with_callback("focus", on_focus.as_ref().unchecked_ref());
    on_focus.forget();

    let on_keydown = Closure::<dyn FnMut(leptos::web_sys::KeyboardEvent)>::new(
        move |e: leptos::web_sys::KeyboardEvent| {
            let mods = Modifiers {
                primary: e.ctrl_key() || e.meta_key(),
                alt: e.alt_key(),
                shift: e.shift_key(),
            };
            let Some(id) = command_for_key(&e.code(), mods) else {
                return;
            };
            e.prevent_default();
            // The caret the host command acts on is the one on screen now.
            caret_changed();
            spawn_local(async move {
                match serde_wasm_bindgen::to_value(&RunCommandArgs { id }) {
                    Ok(args) => {
                        invoke("run_command", args).await;
                    }
                    Err(err) => log::error!("failed to encode command {id}: {err}"),
                }
            });
        },
    );
    let _ = window().add_event_listener_with_callback("keydown", on_keydown.as_ref().unchecked_ref());
    on_keydown.forget();

    Effect::new(move |_| {
        surface.update_value(|s| s.opened());
    });

    let update_content = move |ev| {
        let text = event_target_value(&ev);
        let (start, end) = textarea
            .get_untracked()
            .map(|el| {
                let start = el.selection_start().ok().flatten().unwrap_or(0);
                let end = el.selection_end().ok().flatten().unwrap_or(start);
                (utf16_to_byte(&text, start), utf16_to_byte(&text, end))
            })
            .unwrap_or((text.len(), text.len()));

        set_highlighted.set(highlight_markdown(&text));
        set_content.set(text.clone());
        surface.update_value(|s| {
            s.engine_mut().replace_from_input(text, Selection::new(start, end));
            s.on_change(js_sys::Date::now());
        });
        schedule_poll();
    };

    let on_scroll = move |ev: leptos::web_sys::Event| {
        let target: leptos::web_sys::Element = event_target(&ev);
        let top = target.scroll_top();
        surface.update_value(|s| {
            let _ = s.engine_mut().set_scroll_top(top);
        });
        set_scroll_top.set(top);
    };

    // Pasted data URIs land in the text as typed; the host swaps them for a
    // media file on the next save. The clipboard carries no source path.
    let on_paste = move |ev: leptos::web_sys::Event| {
        let Some(data) = ev
            .dyn_ref::<leptos::web_sys::ClipboardEvent>()
            .and_then(|ev| ev.clipboard_data())
            .and_then(|d| d.get_data("text/plain").ok())
        else {
            return;
        };
        if data.starts_with("data:image/") {
            surface.update_value(|s| s.request_image_conversion(String::new(), data));
        }
    };

    let toggle_mode = move |_: leptos::ev::MouseEvent| {
        surface.update_value(|s| s.toggle_mode());
        refresh();
    };

    let editor_view = move || match mode.get() {
        EditorMode::Markdown => view! {
            <div
                class="editor-container"
                style="flex: 1; position: relative; overflow: hidden;"
                on:paste=on_paste
            >
                <div
                    class="markdown-highlight-layer"
                    style="position: absolute; inset: 0; padding: 2rem 3rem; font-family: var(--font-editor); line-height: 1.6; white-space: pre-wrap; word-wrap: break-word; pointer-events: none; box-sizing: border-box; overflow-y: hidden;"
                    inner_html=move || highlighted.get()
                    prop:scrollTop=move || scroll_top.get()
                ></div>
                <textarea
                    node_ref=textarea
                    class="raw-editor"
                    style="position: absolute; inset: 0; padding: 2rem 3rem; font-family: var(--font-editor); line-height: 1.6; color: transparent; background: transparent; caret-color: var(--text-primary); outline: none; border: none; resize: none; box-sizing: border-box; overflow-y: auto;"
                    prop:value=move || content.get()
                    prop:scrollTop=move || scroll_top.get()
                    on:input=update_content
                    on:scroll=on_scroll
                    on:keyup=move |_| caret_changed()
                    on:click=move |_| caret_changed()
                    spellcheck="false"
                ></textarea>
            </div>
        }
        .into_any(),
        EditorMode::Wysiwyg => view! {
            <article
                class="tui-doc-contents rendered"
                style="flex: 1; padding: 2rem 3rem; overflow-y: auto;"
                inner_html=move || preview.get()
                prop:scrollTop=move || scroll_top.get()
                on:scroll=on_scroll
                on:dblclick=toggle_mode
            ></article>
        }
        .into_any(),
    };

    view! {
        <main
            id="editor"
            class=move || display_class.get()
            style="display: flex; flex-direction: column; height: 100vh; width: 100vw;"
        >
            <header class="topbar" style="display: flex; align-items: center; justify-content: space-between; padding: 0 1.5rem; font-size: 0.9rem;">
                <span>{move || title.get()}</span>
                <button on:click=toggle_mode title="Toggle mode">
                    {move || match mode.get() {
                        EditorMode::Wysiwyg => "Markdown",
                        EditorMode::Markdown => "Preview",
                    }}
                </button>
            </header>
            {editor_view}
        </main>
    }
}

#[cfg(test)]
mod tests {
    use super::utf16_to_byte;

    #[test]
    fn utf16_offsets_map_to_char_boundaries() {
        assert_eq!(utf16_to_byte("abc", 2), 2);
        assert_eq!(utf16_to_byte("é!", 1), 2);
        assert_eq!(utf16_to_byte("😀x", 2), 4);
        assert_eq!(utf16_to_byte("ab", 10), 2);
    }
}
