//! Keyboard bindings for the host's formatting commands. The surface only
//! maps a key press to a command id; the host decides what it does.

/// Modifier state of a key press. `primary` is Ctrl, or Cmd on macOS.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub primary: bool,
    pub alt: bool,
    pub shift: bool,
}

/// Physical key (`KeyboardEvent.code`) to the character it carries on a US
/// layout. Alt changes `key` on macOS, so bindings go by `code`.
fn key_name(code: &str) -> Option<String> {
    if let Some(letter) = code.strip_prefix("Key") {
        return Some(letter.to_ascii_lowercase());
    }
    if let Some(digit) = code.strip_prefix("Digit") {
        return Some(digit.to_string());
    }
    let name = match code {
        "Backquote" => "`",
        "BracketLeft" => "[",
        "BracketRight" => "]",
        _ => return None,
    };
    Some(name.to_string())
}

pub fn command_for_key(code: &str, mods: Modifiers) -> Option<&'static str> {
    if !mods.primary {
        return None;
    }
    let key = key_name(code)?;
    let id = match (mods.alt, mods.shift, key.as_str()) {
        (false, false, "b") => "unotes.bold",
        (false, false, "i") => "unotes.italic",
        (false, false, "`") => "unotes.code",
        (false, false, "]") => "unotes.indent",
        (false, false, "[") => "unotes.outdent",
        (false, true, "x") => "unotes.strike",
        (true, false, "0") => "unotes.normal",
        (true, false, "1") => "unotes.heading.1",
        (true, false, "2") => "unotes.heading.2",
        (true, false, "3") => "unotes.heading.3",
        (true, false, "4") => "unotes.heading.4",
        (true, false, "5") => "unotes.heading.5",
        (true, false, "6") => "unotes.heading.6",
        (true, false, "t") => "unotes.task",
        (true, false, "u") => "unotes.ul",
        (true, false, "o") => "unotes.ol",
        (true, false, "q") => "unotes.blockquote",
        (true, false, "c") => "unotes.codeblock",
        (true, false, "h") => "unotes.hr",
        (true, false, "m") => "unotes.toggleMode",
        (true, false, "i") => "unotes.insertTemplate",
        _ => return None,
    };
    Some(id)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CTRL: Modifiers = Modifiers {
        primary: true,
        alt: false,
        shift: false,
    };
    const CTRL_ALT: Modifiers = Modifiers {
        primary: true,
        alt: true,
        shift: false,
    };

    #[test]
    fn maps_formatting_keys() {
        assert_eq!(command_for_key("KeyB", CTRL), Some("unotes.bold"));
        assert_eq!(command_for_key("BracketRight", CTRL), Some("unotes.indent"));
        assert_eq!(command_for_key("Digit3", CTRL_ALT), Some("unotes.heading.3"));
        assert_eq!(command_for_key("Digit0", CTRL_ALT), Some("unotes.normal"));
        assert_eq!(command_for_key("KeyM", CTRL_ALT), Some("unotes.toggleMode"));
        assert_eq!(
            command_for_key("KeyX", Modifiers { shift: true, ..CTRL }),
            Some("unotes.strike")
        );
    }

    #[test]
    fn plain_typing_is_not_a_command() {
        assert_eq!(command_for_key("KeyB", Modifiers::default()), None);
        assert_eq!(command_for_key("KeyZ", CTRL), None);
        assert_eq!(command_for_key("KeyX", CTRL), None);
        assert_eq!(command_for_key("F5", CTRL), None);
    }
}
