use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use skyview_core::keymap::{KeyBinding, KeyName};

/// Translate a terminal key event; keys with no binding name yield `None`.
pub fn binding_from_event(event: &KeyEvent) -> Option<KeyBinding> {
    let key = match event.code {
        KeyCode::Char(c) => KeyName::Char(c),
        KeyCode::Enter => KeyName::Enter,
        KeyCode::Esc => KeyName::Esc,
        KeyCode::Tab => KeyName::Tab,
        KeyCode::BackTab => KeyName::BackTab,
        KeyCode::Backspace => KeyName::Backspace,
        KeyCode::Delete => KeyName::Delete,
        KeyCode::Up => KeyName::Up,
        KeyCode::Down => KeyName::Down,
        KeyCode::Left => KeyName::Left,
        KeyCode::Right => KeyName::Right,
        KeyCode::PageUp => KeyName::PageUp,
        KeyCode::PageDown => KeyName::PageDown,
        KeyCode::Home => KeyName::Home,
        KeyCode::End => KeyName::End,
        KeyCode::F(n) => KeyName::F(n),
        _ => return None,
    };
    let binding = KeyBinding {
        key,
        ctrl: event.modifiers.contains(KeyModifiers::CONTROL),
        alt: event.modifiers.contains(KeyModifiers::ALT),
        // Terminals report BackTab with SHIFT set.
        shift: event.modifiers.contains(KeyModifiers::SHIFT) && key != KeyName::BackTab,
    };
    Some(binding.normalized())
}

/// The character a key types into a text field, if any.
pub fn typed_char(key: &KeyBinding) -> Option<char> {
    match key.key {
        KeyName::Char(c) if !key.ctrl && !key.alt => Some(c),
        KeyName::Space if !key.ctrl && !key.alt => Some(' '),
        _ => None,
    }
}
