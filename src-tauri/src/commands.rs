//! Host-side formatting commands and what each one sends to the editor.

use unotes_protocol::EditorCommand;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PanelCommand {
    Exec(EditorCommand),
    ToggleMode,
    InsertTemplate,
    Focus,
}

pub const COMMANDS: &[(&str, PanelCommand)] = &[
    ("unotes.heading.1", PanelCommand::Exec(EditorCommand::Heading { level: 1 })),
    ("unotes.heading.2", PanelCommand::Exec(EditorCommand::Heading { level: 2 })),
    ("unotes.heading.3", PanelCommand::Exec(EditorCommand::Heading { level: 3 })),
    ("unotes.heading.4", PanelCommand::Exec(EditorCommand::Heading { level: 4 })),
    ("unotes.heading.5", PanelCommand::Exec(EditorCommand::Heading { level: 5 })),
    ("unotes.heading.6", PanelCommand::Exec(EditorCommand::Heading { level: 6 })),
    ("unotes.normal", PanelCommand::Exec(EditorCommand::Heading { level: 0 })),
    ("unotes.bold", PanelCommand::Exec(EditorCommand::Bold)),
    ("unotes.italic", PanelCommand::Exec(EditorCommand::Italic)),
    ("unotes.strike", PanelCommand::Exec(EditorCommand::Strike)),
    ("unotes.task", PanelCommand::Exec(EditorCommand::TaskList)),
    ("unotes.ul", PanelCommand::Exec(EditorCommand::BulletList)),
    ("unotes.ol", PanelCommand::Exec(EditorCommand::OrderedList)),
    ("unotes.blockquote", PanelCommand::Exec(EditorCommand::BlockQuote)),
    ("unotes.code", PanelCommand::Exec(EditorCommand::Code)),
    ("unotes.codeblock", PanelCommand::Exec(EditorCommand::CodeBlock)),
    ("unotes.indent", PanelCommand::Exec(EditorCommand::Indent)),
    ("unotes.outdent", PanelCommand::Exec(EditorCommand::Outdent)),
    ("unotes.hr", PanelCommand::Exec(EditorCommand::Hr)),
    ("unotes.toggleMode", PanelCommand::ToggleMode),
    ("unotes.insertTemplate", PanelCommand::InsertTemplate),
    ("unotes.focus", PanelCommand::Focus),
];

pub fn lookup(id: &str) -> Option<PanelCommand> {
    COMMANDS
        .iter()
        .find(|(command_id, _)| *command_id == id)
        .map(|(_, command)| *command)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn command_ids_are_unique() {
        let ids: HashSet<_> = COMMANDS.iter().map(|(id, _)| *id).collect();
        assert_eq!(ids.len(), COMMANDS.len());
    }

    #[test]
    fn normal_is_heading_level_zero() {
        assert_eq!(
            lookup("unotes.normal"),
            Some(PanelCommand::Exec(EditorCommand::Heading { level: 0 }))
        );
        assert_eq!(lookup("unotes.nope"), None);
    }
}
