mod app;
mod debounce;
mod editor_core;
mod engine;
mod render;
mod shortcuts;
mod surface;

use app::*;
use leptos::prelude::*;

fn main() {
    console_error_panic_hook::set_once();
    console_log::init_with_level(log::Level::Debug).ok();
    mount_to_body(|| {
        view! { <App/> }
    })
}
