//! Single-line text input used by prompts and form fields.

use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;

use skyview_core::keymap::{KeyBinding, KeyName};

use crate::ui::keys::typed_char;
use crate::ui::theme::styles;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LineInput {
    text: String,
    /// Cursor position in characters
    cursor: usize,
}

impl LineInput {
    pub fn new(text: &str) -> Self {
        Self {
            text: text.to_string(),
            cursor: text.chars().count(),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn set_text(&mut self, text: &str) {
        *self = Self::new(text);
    }

    pub fn clear(&mut self) {
        self.text.clear();
        self.cursor = 0;
    }

    fn byte_index(&self, chars: usize) -> usize {
        self.text
            .char_indices()
            .nth(chars)
            .map(|(i, _)| i)
            .unwrap_or(self.text.len())
    }

    /// Apply an editing key. Returns true if the text changed.
    pub fn handle_key(&mut self, key: &KeyBinding) -> bool {
        if let Some(c) = typed_char(key) {
            let at = self.byte_index(self.cursor);
            self.text.insert(at, c);
            self.cursor += 1;
            return true;
        }
        let len = self.text.chars().count();
        match key.key {
            KeyName::Backspace if self.cursor > 0 => {
                self.cursor -= 1;
                let at = self.byte_index(self.cursor);
                self.text.remove(at);
                true
            }
            KeyName::Delete if self.cursor < len => {
                let at = self.byte_index(self.cursor);
                self.text.remove(at);
                true
            }
            KeyName::Left => {
                self.cursor = self.cursor.saturating_sub(1);
                false
            }
            KeyName::Right => {
                self.cursor = (self.cursor + 1).min(len);
                false
            }
            KeyName::Home => {
                self.cursor = 0;
                false
            }
            KeyName::End => {
                self.cursor = len;
                false
            }
            _ => false,
        }
    }

    /// Render as `prefix text` with a block cursor when focused.
    pub fn render(&self, frame: &mut Frame, area: Rect, prefix: &str, focused: bool) {
        let at = self.byte_index(self.cursor);
        let (before, after) = self.text.split_at(at);
        let mut after_chars = after.chars();
        let under = after_chars.next().map(String::from).unwrap_or_else(|| " ".into());
        let rest: String = after_chars.collect();

        let mut spans = vec![
            Span::styled(prefix.to_string(), styles::key_hint()),
            Span::styled(before.to_string(), styles::text()),
        ];
        if focused {
            spans.push(Span::styled(under, styles::selection()));
            spans.push(Span::styled(rest, styles::text()));
        } else {
            spans.push(Span::styled(after.to_string(), styles::text()));
        }
        frame.render_widget(Paragraph::new(Line::from(spans)), area);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn type_str(input: &mut LineInput, s: &str) {
        for c in s.chars() {
            input.handle_key(&KeyBinding::ch(c));
        }
    }

    #[test]
    fn test_editing() {
        let mut input = LineInput::default();
        type_str(&mut input, "héllo");
        assert_eq!(input.text(), "héllo");

        input.handle_key(&KeyBinding::plain(KeyName::Left));
        input.handle_key(&KeyBinding::plain(KeyName::Backspace));
        assert_eq!(input.text(), "hélo");

        input.handle_key(&KeyBinding::plain(KeyName::Home));
        input.handle_key(&KeyBinding::plain(KeyName::Delete));
        assert_eq!(input.text(), "élo");

        assert!(!input.handle_key(&KeyBinding::ctrl('a')));
        input.clear();
        assert_eq!(input.text(), "");
    }
}
