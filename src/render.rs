//! Preview rendering: markdown to HTML with the local-image and formula
//! hooks applied, plus the regex highlighter behind the raw editor.

use pulldown_cmark::{html, CodeBlockKind, Event, Options, Parser, Tag, TagEnd};
use regex::Regex;
use std::sync::OnceLock;

const WIDTH_PERCENTS: [u32; 4] = [10, 25, 50, 75];

/// Where images resolve from and how wide they may be.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ImageOptions {
    /// Webview-visible folder of the current note, without trailing slash.
    pub root: String,
    pub configured_percent: Option<u32>,
    /// Transient override from the `imageMaxWidth` host command.
    pub override_percent: Option<u32>,
}

impl ImageOptions {
    pub fn effective_percent(&self) -> Option<u32> {
        self.override_percent
            .filter(|p| *p != 0)
            .or(self.configured_percent)
    }
}

/// Typesets a formula. Implemented over KaTeX in the webview.
pub trait FormulaRenderer {
    fn render(&self, source: &str) -> Result<String, String>;
}

pub fn resolve_image_src(src: &str, root: &str) -> String {
    static RE_REMOTE: OnceLock<Regex> = OnceLock::new();
    let re_remote = RE_REMOTE.get_or_init(|| Regex::new(r"^(https?://|data:)").unwrap());

    if re_remote.is_match(src) || src.starts_with('/') {
        return src.to_string();
    }
    format!("{}/{}", root.trim_end_matches('/'), src)
}

pub fn image_width_class(percent: Option<u32>) -> String {
    match percent {
        Some(p) if WIDTH_PERCENTS.contains(&p) => format!("maxwidth{p}"),
        _ => "maxwidth100".to_string(),
    }
}

/// Never fails: a typesetting error is rendered inline in place of the formula.
pub fn render_formula(renderer: &dyn FormulaRenderer, source: &str) -> String {
    match renderer.render(source) {
        Ok(html) => html,
        Err(message) => format!(
            "Error occurred rendering katex: {}",
            escape_html(&message)
        ),
    }
}

enum Pending {
    Image {
        src: String,
        title: String,
        alt: String,
    },
    Formula(String),
}

pub fn render_markdown(
    markdown: &str,
    images: &ImageOptions,
    formulas: &dyn FormulaRenderer,
) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);

    let width_class = image_width_class(images.effective_percent());
    let mut pending: Option<Pending> = None;
    let mut events = Vec::new();

    for event in Parser::new_ext(markdown, options) {
        pending = match (pending.take(), event) {
            (None, Event::Start(Tag::Image { dest_url, title, .. })) => Some(Pending::Image {
                src: resolve_image_src(&dest_url, &images.root),
                title: title.to_string(),
                alt: String::new(),
            }),
            (None, Event::Start(Tag::CodeBlock(CodeBlockKind::Fenced(lang))))
                if lang.trim() == "katex" =>
            {
                Some(Pending::Formula(String::new()))
            }
            (None, event) => {
                events.push(event);
                None
            }
            (
                Some(Pending::Image {
                    src,
                    title,
                    mut alt,
                }),
                Event::Text(text) | Event::Code(text),
            ) => {
                alt.push_str(&text);
                Some(Pending::Image { src, title, alt })
            }
            (Some(Pending::Image { src, title, alt }), Event::End(TagEnd::Image)) => {
                let mut tag = format!(
                    "<img src=\"{}\" alt=\"{}\" class=\"{}\"",
                    escape_html(&src),
                    escape_html(&alt),
                    width_class
                );
                if !title.is_empty() {
                    tag.push_str(&format!(" title=\"{}\"", escape_html(&title)));
                }
                tag.push_str(" />");
                events.push(Event::InlineHtml(tag.into()));
                None
            }
            (Some(Pending::Formula(mut source)), Event::Text(text)) => {
                source.push_str(&text);
                Some(Pending::Formula(source))
            }
            (Some(Pending::Formula(source)), Event::End(TagEnd::CodeBlock)) => {
                let html = format!("<div>{}</div>\n", render_formula(formulas, &source));
                events.push(Event::Html(html.into()));
                None
            }
            (state, _) => state,
        };
    }

    let mut out = String::new();
    html::push_html(&mut out, events.into_iter());
    out
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Span-level highlighting for the overlay behind the raw textarea.
pub fn highlight_markdown(text: &str) -> String {
    static RE_H1: OnceLock<Regex> = OnceLock::new();
    static RE_H2: OnceLock<Regex> = OnceLock::new();
    static RE_H3: OnceLock<Regex> = OnceLock::new();
    static RE_BOLD: OnceLock<Regex> = OnceLock::new();
    static RE_STRIKE: OnceLock<Regex> = OnceLock::new();
    static RE_CODE: OnceLock<Regex> = OnceLock::new();
    static RE_QUOTE: OnceLock<Regex> = OnceLock::new();
    static RE_TASK: OnceLock<Regex> = OnceLock::new();

    let re_h1 = RE_H1.get_or_init(|| Regex::new(r"(?m)^(#[^\S\n]+.*)$").unwrap());
    let re_h2 = RE_H2.get_or_init(|| Regex::new(r"(?m)^(##[^\S\n]+.*)$").unwrap());
    let re_h3 = RE_H3.get_or_init(|| Regex::new(r"(?m)^(#{3,6}[^\S\n]+.*)$").unwrap());
    let re_bold = RE_BOLD.get_or_init(|| Regex::new(r"\*\*(.+?)\*\*").unwrap());
    let re_strike = RE_STRIKE.get_or_init(|| Regex::new(r"~~(.+?)~~").unwrap());
    let re_code = RE_CODE.get_or_init(|| Regex::new(r"`([^`\n]+)`").unwrap());
    let re_quote = RE_QUOTE.get_or_init(|| Regex::new(r"(?m)^(&gt;.*)$").unwrap());
    let re_task = RE_TASK.get_or_init(|| Regex::new(r"(?m)^(\s*- \[[ xX]\])").unwrap());

    let mut html = text
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;");

    html = re_h1.replace_all(&html, "<span class=\"hl-h1\">$1</span>").to_string();
    html = re_h2.replace_all(&html, "<span class=\"hl-h2\">$1</span>").to_string();
    html = re_h3.replace_all(&html, "<span class=\"hl-h3\">$1</span>").to_string();
    html = re_bold.replace_all(&html, "<span class=\"hl-bold\">**$1**</span>").to_string();
    html = re_strike.replace_all(&html, "<span class=\"hl-strike\">~~$1~~</span>").to_string();
    html = re_code.replace_all(&html, "<span class=\"hl-code\">`$1`</span>").to_string();
    html = re_quote.replace_all(&html, "<span class=\"hl-quote\">$1</span>").to_string();
    html = re_task.replace_all(&html, "<span class=\"hl-task\">$1</span>").to_string();

    // Trailing newline keeps the overlay as tall as the textarea.
    html.push_str("\n ");
    html
}
