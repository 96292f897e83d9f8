//! Plain-text markdown buffer used as the editor engine. Formatting commands
//! become a single text edit against the current selection.

use thiserror::Error;
use unotes_protocol::EditorCommand;

use crate::engine::{EditorEngine, EditorMode, EngineError};

const INDENT: &str = "    ";

/// Byte range into the buffer, always ordered and on char boundaries once
/// it has been clamped.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Selection {
    pub start: usize,
    pub end: usize,
}

impl Selection {
    pub fn new(start: usize, end: usize) -> Self {
        Self {
            start: start.min(end),
            end: start.max(end),
        }
    }

    pub fn cursor(pos: usize) -> Self {
        Self::new(pos, pos)
    }

    pub fn is_cursor(self) -> bool {
        self.start == self.end
    }

    pub fn clamp(self, text: &str) -> Self {
        Self::new(floor_boundary(text, self.start), floor_boundary(text, self.end))
    }
}

/// Replace `start..end` with `insert`, then put the selection at
/// `selection_after`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Edit {
    pub start: usize,
    pub end: usize,
    pub insert: String,
    pub selection_after: Selection,
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum CoreError {
    #[error("edit {start}..{end} does not fit the buffer (length {len})")]
    InvalidRange { start: usize, end: usize, len: usize },
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MarkdownBuffer {
    text: String,
    selection: Selection,
    revision: u64,
    scroll_top: i32,
    mode: EditorMode,
    focused: bool,
}

impl MarkdownBuffer {
    pub fn new(text: String) -> Self {
        let selection = Selection::cursor(text.len());
        Self {
            text,
            selection,
            ..Self::default()
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn selection(&self) -> Selection {
        self.selection
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn is_focused(&self) -> bool {
        self.focused
    }

    pub fn blur(&mut self) {
        self.focused = false;
    }

    /// Takes text typed into the textarea. Returns whether the text changed.
    pub fn replace_from_input(&mut self, text: String, selection: Selection) -> bool {
        let changed = self.text != text;
        self.text = text;
        self.selection = selection.clamp(&self.text);
        if changed {
            self.revision += 1;
        }
        changed
    }

    pub fn apply_edit(&mut self, edit: Edit) -> Result<(), CoreError> {
        let fits = edit.start <= edit.end
            && edit.end <= self.text.len()
            && self.text.is_char_boundary(edit.start)
            && self.text.is_char_boundary(edit.end);
        if !fits {
            return Err(CoreError::InvalidRange {
                start: edit.start,
                end: edit.end,
                len: self.text.len(),
            });
        }
        self.text.replace_range(edit.start..edit.end, &edit.insert);
        self.selection = edit.selection_after.clamp(&self.text);
        self.revision += 1;
        Ok(())
    }
}

impl EditorEngine for MarkdownBuffer {
    fn set_markdown(&mut self, markdown: &str) -> Result<(), EngineError> {
        if markdown.contains('\0') {
            return Err(EngineError::Load("content contains NUL bytes".to_string()));
        }
        self.text = markdown.to_string();
        self.selection = self.selection.clamp(&self.text);
        self.revision += 1;
        Ok(())
    }

    fn markdown(&self) -> String {
        self.text.clone()
    }

    fn scroll_top(&self) -> i32 {
        self.scroll_top
    }

    fn set_scroll_top(&mut self, top: i32) -> Result<(), EngineError> {
        self.scroll_top = top.max(0);
        Ok(())
    }

    fn set_selection(&mut self, start: usize, end: usize) {
        self.selection = Selection::new(start, end).clamp(&self.text);
    }

    fn mode(&self) -> EditorMode {
        self.mode
    }

    fn change_mode(&mut self, mode: EditorMode) {
        self.mode = mode;
    }

    fn exec(&mut self, command: EditorCommand) -> Result<(), EngineError> {
        if let Some(edit) = edit_for(&self.text, self.selection, command) {
            self.apply_edit(edit)?;
        }
        Ok(())
    }

    fn focus(&mut self) {
        self.focused = true;
    }
}

/// The edit a command makes, or `None` when it would change nothing.
pub fn edit_for(text: &str, selection: Selection, command: EditorCommand) -> Option<Edit> {
    let selection = selection.clamp(text);
    match command {
        EditorCommand::Heading { level } => set_heading(text, selection, level.min(6)),
        EditorCommand::Bold => Some(wrap(text, selection, "**", "**")),
        EditorCommand::Italic => Some(wrap(text, selection, "*", "*")),
        EditorCommand::Strike => Some(wrap(text, selection, "~~", "~~")),
        EditorCommand::Code => Some(wrap(text, selection, "`", "`")),
        EditorCommand::CodeBlock => Some(wrap(text, selection, "```\n", "\n```")),
        EditorCommand::TaskList => Some(prefix_line(text, selection, "- [ ] ")),
        EditorCommand::BulletList => Some(prefix_line(text, selection, "- ")),
        EditorCommand::OrderedList => Some(prefix_line(text, selection, "1. ")),
        EditorCommand::BlockQuote => Some(prefix_line(text, selection, "> ")),
        EditorCommand::Indent => Some(indent(text, selection)),
        EditorCommand::Outdent => outdent(text, selection),
        EditorCommand::Hr => Some(insert_block(text, selection, "---")),
    }
}

fn wrap(text: &str, selection: Selection, open: &str, close: &str) -> Edit {
    let inner = &text[selection.start..selection.end];
    let caret = if selection.is_cursor() {
        selection.start + open.len()
    } else {
        // Wrapped selections collapse to a caret after the closing token.
        selection.end + open.len() + close.len()
    };
    Edit {
        start: selection.start,
        end: selection.end,
        insert: format!("{open}{inner}{close}"),
        selection_after: Selection::cursor(caret),
    }
}

fn prefix_line(text: &str, selection: Selection, prefix: &str) -> Edit {
    let start = line_start(text, selection.start);
    Edit {
        start,
        end: start,
        insert: prefix.to_string(),
        selection_after: Selection::new(
            selection.start + prefix.len(),
            selection.end + prefix.len(),
        ),
    }
}

/// Swaps whatever `#` prefix the line has for `level` of them; 0 removes it.
fn set_heading(text: &str, selection: Selection, level: u8) -> Option<Edit> {
    let start = line_start(text, selection.start);
    let line = &text[start..line_end(text, selection.start)];

    let hashes = line.bytes().take_while(|b| *b == b'#').count();
    let spaces = line[hashes..].bytes().take_while(|b| *b == b' ').count();
    let existing = if (1..=6).contains(&hashes) && spaces > 0 {
        hashes + spaces
    } else {
        0
    };
    let prefix = match level {
        0 => String::new(),
        n => format!("{} ", "#".repeat(usize::from(n))),
    };
    if line[..existing] == prefix {
        return None;
    }

    let shift = |pos: usize| {
        if pos >= start + existing {
            pos - existing + prefix.len()
        } else {
            start + prefix.len()
        }
    };
    let selection_after = Selection::new(shift(selection.start), shift(selection.end));
    Some(Edit {
        start,
        end: start + existing,
        insert: prefix,
        selection_after,
    })
}

fn insert_block(text: &str, selection: Selection, block: &str) -> Edit {
    let at = line_end(text, selection.end);
    let insert = if text[..at].trim().is_empty() {
        format!("{block}\n")
    } else {
        format!("\n\n{block}\n")
    };
    let caret = at + insert.len();
    Edit {
        start: at,
        end: at,
        insert,
        selection_after: Selection::cursor(caret),
    }
}

fn indent(text: &str, selection: Selection) -> Edit {
    if selection.is_cursor() {
        return Edit {
            start: selection.start,
            end: selection.start,
            insert: INDENT.to_string(),
            selection_after: Selection::cursor(selection.start + INDENT.len()),
        };
    }
    let start = line_start(text, selection.start);
    let end = line_end(text, selection.end);
    let insert = text[start..end]
        .split('\n')
        .map(|line| format!("{INDENT}{line}"))
        .collect::<Vec<_>>()
        .join("\n");
    let selection_after = Selection::new(start, start + insert.len());
    Edit {
        start,
        end,
        insert,
        selection_after,
    }
}

fn outdent(text: &str, selection: Selection) -> Option<Edit> {
    let start = line_start(text, selection.start);
    let end = line_end(text, selection.end);
    let block = &text[start..end];
    let insert = block
        .split('\n')
        .map(|line| &line[leading_indent(line)..])
        .collect::<Vec<_>>()
        .join("\n");
    if insert == block {
        return None;
    }

    let selection_after = if selection.is_cursor() {
        let removed = leading_indent(block);
        Selection::cursor(selection.start.saturating_sub(removed).max(start))
    } else {
        Selection::new(start, start + insert.len())
    };
    Some(Edit {
        start,
        end,
        insert,
        selection_after,
    })
}

/// Width of one indent step at the start of `line`: a tab or up to four spaces.
fn leading_indent(line: &str) -> usize {
    if line.starts_with('\t') {
        1
    } else {
        line.bytes().take(INDENT.len()).take_while(|b| *b == b' ').count()
    }
}

fn floor_boundary(text: &str, pos: usize) -> usize {
    let mut pos = pos.min(text.len());
    while !text.is_char_boundary(pos) {
        pos -= 1;
    }
    pos
}

fn line_start(text: &str, pos: usize) -> usize {
    let pos = floor_boundary(text, pos);
    text[..pos].rfind('\n').map_or(0, |i| i + 1)
}

fn line_end(text: &str, pos: usize) -> usize {
    let pos = floor_boundary(text, pos);
    text[pos..].find('\n').map_or(text.len(), |i| pos + i)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buffer(text: &str, start: usize, end: usize) -> MarkdownBuffer {
        let mut buffer = MarkdownBuffer::new(text.to_string());
        buffer.set_selection(start, end);
        buffer
    }

    #[test]
    fn bold_wraps_selection() {
        let mut buffer = buffer("unotes", 0, 6);
        buffer.exec(EditorCommand::Bold).unwrap();
        assert_eq!(buffer.text(), "**unotes**");
        assert_eq!(buffer.selection(), Selection::cursor(10));
    }

    #[test]
    fn code_block_at_caret_leaves_caret_inside() {
        let mut buffer = buffer("x", 1, 1);
        buffer.exec(EditorCommand::CodeBlock).unwrap();
        assert_eq!(buffer.text(), "x```\n\n```");
        assert_eq!(buffer.selection(), Selection::cursor(5));
    }

    #[test]
    fn heading_replaces_existing_level() {
        let mut buffer = buffer("## Title\nbody", 5, 5);
        buffer.exec(EditorCommand::Heading { level: 4 }).unwrap();
        assert_eq!(buffer.text(), "#### Title\nbody");
        assert_eq!(buffer.selection(), Selection::cursor(7));

        buffer.exec(EditorCommand::Heading { level: 0 }).unwrap();
        assert_eq!(buffer.text(), "Title\nbody");
        assert_eq!(buffer.selection(), Selection::cursor(2));
    }

    #[test]
    fn repeating_a_heading_changes_nothing() {
        let mut buffer = buffer("a\nline", 4, 4);
        buffer.exec(EditorCommand::Heading { level: 1 }).unwrap();
        assert_eq!(buffer.text(), "a\n# line");
        let revision = buffer.revision();

        buffer.exec(EditorCommand::Heading { level: 1 }).unwrap();
        assert_eq!(buffer.revision(), revision);
    }

    #[test]
    fn list_commands_prefix_current_line() {
        let mut buffer = buffer("one\ntwo", 5, 5);
        buffer.exec(EditorCommand::TaskList).unwrap();
        assert_eq!(buffer.text(), "one\n- [ ] two");
        assert_eq!(buffer.selection(), Selection::cursor(11));
    }

    #[test]
    fn hr_goes_on_its_own_line() {
        let mut buffer = buffer("abc\nnext", 1, 1);
        buffer.exec(EditorCommand::Hr).unwrap();
        assert_eq!(buffer.text(), "abc\n\n---\n\nnext");
        assert_eq!(buffer.selection(), Selection::cursor(9));
    }

    #[test]
    fn indents_and_outdents_block() {
        let mut buffer = buffer("a\nb", 0, 3);
        buffer.exec(EditorCommand::Indent).unwrap();
        assert_eq!(buffer.text(), "    a\n    b");

        buffer.set_selection(0, buffer.text().len());
        buffer.exec(EditorCommand::Outdent).unwrap();
        assert_eq!(buffer.text(), "a\nb");
    }

    #[test]
    fn outdent_at_caret_keeps_caret_on_the_text() {
        let mut buffer = buffer("\titem", 3, 3);
        buffer.exec(EditorCommand::Outdent).unwrap();
        assert_eq!(buffer.text(), "item");
        assert_eq!(buffer.selection(), Selection::cursor(2));

        let revision = buffer.revision();
        buffer.exec(EditorCommand::Outdent).unwrap();
        assert_eq!(buffer.revision(), revision);
    }

    #[test]
    fn replaced_content_keeps_selection_on_char_boundaries() {
        let mut buffer = buffer("abc", 2, 2);
        buffer.set_markdown("aé").unwrap();
        assert_eq!(buffer.selection(), Selection::cursor(1));

        buffer.exec(EditorCommand::Bold).unwrap();
        assert_eq!(buffer.text(), "a****é");

        buffer.set_markdown("日本").unwrap();
        buffer.set_selection(4, 5);
        buffer.exec(EditorCommand::Heading { level: 2 }).unwrap();
        assert_eq!(buffer.text(), "## 日本");
        assert_eq!(buffer.selection(), Selection::cursor(6));

        buffer.exec(EditorCommand::Italic).unwrap();
        assert_eq!(buffer.text(), "## 日**本");
    }

    #[test]
    fn edits_off_a_char_boundary_are_rejected() {
        let mut buffer = MarkdownBuffer::new("é".to_string());
        let err = buffer
            .apply_edit(Edit {
                start: 1,
                end: 1,
                insert: "x".into(),
                selection_after: Selection::cursor(0),
            })
            .unwrap_err();
        assert_eq!(err, CoreError::InvalidRange { start: 1, end: 1, len: 2 });
        assert_eq!(buffer.text(), "é");
    }

    #[test]
    fn set_markdown_rejects_nul() {
        let mut buffer = buffer("long text here", 14, 14);
        buffer.set_markdown("short").unwrap();
        assert_eq!(buffer.selection(), Selection::cursor(5));
        assert!(buffer.set_markdown("bad\0").is_err());
        assert_eq!(buffer.markdown(), "short");
    }
}
