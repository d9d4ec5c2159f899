//! Modal forms made of text and choice fields.

use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph};

use skyview_core::keymap::{Action, KeyBinding, KeyMap, KeyName};

use crate::ui::input::LineInput;
use crate::ui::overlay::centered_rect;
use crate::ui::theme::styles;

const LABEL_WIDTH: usize = 18;

#[derive(Clone, Debug, PartialEq, Eq)]
enum FieldKind {
    Text(LineInput),
    Choice { options: Vec<String>, index: usize },
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct Field {
    label: String,
    kind: FieldKind,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FormEvent {
    Submitted,
    Cancelled,
    Consumed,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Form {
    title: String,
    fields: Vec<Field>,
    focus: usize,
}

impl Form {
    pub fn new(title: &str) -> Self {
        Self {
            title: title.to_string(),
            fields: Vec::new(),
            focus: 0,
        }
    }

    pub fn text(mut self, label: &str, initial: &str) -> Self {
        self.fields.push(Field {
            label: label.to_string(),
            kind: FieldKind::Text(LineInput::new(initial)),
        });
        self
    }

    pub fn choice<S: AsRef<str>>(mut self, label: &str, options: &[S], selected: usize) -> Self {
        let options: Vec<String> = options.iter().map(|o| o.as_ref().to_string()).collect();
        let index = selected.min(options.len().saturating_sub(1));
        self.fields.push(Field {
            label: label.to_string(),
            kind: FieldKind::Choice { options, index },
        });
        self
    }

    pub fn focused_label(&self) -> Option<&str> {
        self.fields.get(self.focus).map(|f| f.label.as_str())
    }

    /// Current value of the field labelled `label`; unknown labels read as
    /// empty.
    pub fn value(&self, label: &str) -> &str {
        match self.fields.iter().find(|f| f.label == label).map(|f| &f.kind) {
            Some(FieldKind::Text(input)) => input.text(),
            Some(FieldKind::Choice { options, index }) => {
                options.get(*index).map(String::as_str).unwrap_or("")
            }
            None => "",
        }
    }

    pub fn set_value(&mut self, label: &str, value: &str) {
        let Some(field) = self.fields.iter_mut().find(|f| f.label == label) else {
            return;
        };
        match &mut field.kind {
            FieldKind::Text(input) => input.set_text(value),
            FieldKind::Choice { options, index } => {
                if let Some(i) = options.iter().position(|o| o == value) {
                    *index = i;
                }
            }
        }
    }

    fn cycle(&mut self, delta: isize) {
        if let Some(FieldKind::Choice { options, index }) =
            self.fields.get_mut(self.focus).map(|f| &mut f.kind)
        {
            let len = options.len() as isize;
            if len > 0 {
                *index = (*index as isize + delta).rem_euclid(len) as usize;
            }
        }
    }

    pub fn handle_key(&mut self, key: &KeyBinding, keymap: &KeyMap) -> FormEvent {
        let count = self.fields.len().max(1);
        if keymap.is(Action::NextField, key) || key.key == KeyName::Down {
            self.focus = (self.focus + 1) % count;
        } else if keymap.is(Action::PrevField, key) || key.key == KeyName::Up {
            self.focus = (self.focus + count - 1) % count;
        } else if key.key == KeyName::Enter {
            return FormEvent::Submitted;
        } else if key.key == KeyName::Esc {
            return FormEvent::Cancelled;
        } else {
            let is_choice = matches!(
                self.fields.get(self.focus).map(|f| &f.kind),
                Some(FieldKind::Choice { .. })
            );
            if is_choice {
                match key.key {
                    KeyName::Right | KeyName::Space | KeyName::Char('l') => self.cycle(1),
                    KeyName::Left | KeyName::Char('h') => self.cycle(-1),
                    _ => {}
                }
            } else if let Some(FieldKind::Text(input)) =
                self.fields.get_mut(self.focus).map(|f| &mut f.kind)
            {
                input.handle_key(key);
            }
        }
        FormEvent::Consumed
    }

    pub fn render(&self, frame: &mut Frame, area: Rect) {
        let rect = centered_rect(area, 64, self.fields.len() as u16 + 4);
        frame.render_widget(Clear, rect);
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(styles::border(true))
            .title(Line::styled(format!(" {} ", self.title), styles::title()))
            .title_bottom(Line::styled(
                " tab next · enter submit · esc cancel ",
                styles::text_muted(),
            ));
        let inner = block.inner(rect);
        frame.render_widget(block, rect);

        for (i, field) in self.fields.iter().enumerate() {
            let y = inner.y + i as u16;
            if y >= inner.y + inner.height {
                break;
            }
            let focused = i == self.focus;
            let label = format!("{:<width$}", field.label, width = LABEL_WIDTH);
            let label_style = if focused {
                styles::accent()
            } else {
                styles::text_dim()
            };
            let label_area = Rect {
                x: inner.x,
                y,
                width: (LABEL_WIDTH as u16 + 1).min(inner.width),
                height: 1,
            };
            frame.render_widget(
                Paragraph::new(Span::styled(label, label_style)),
                label_area,
            );
            let value_area = Rect {
                x: inner.x + label_area.width,
                y,
                width: inner.width.saturating_sub(label_area.width),
                height: 1,
            };
            match &field.kind {
                FieldKind::Text(input) => input.render(frame, value_area, "", focused),
                FieldKind::Choice { options, index } => {
                    let value = options.get(*index).map(String::as_str).unwrap_or("");
                    let style = if focused {
                        styles::selection()
                    } else {
                        styles::text()
                    };
                    frame.render_widget(
                        Paragraph::new(Line::from(vec![
                            Span::styled("◂ ", styles::text_muted()),
                            Span::styled(value.to_string(), style),
                            Span::styled(" ▸", styles::text_muted()),
                        ])),
                        value_area,
                    );
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fields_and_cycling() {
        let keymap = KeyMap::default();
        let mut form = Form::new("Scan")
            .text("Attribute", "")
            .choice("Type", &["String", "Number"], 0)
            .text("Value", "x");

        for c in "age".chars() {
            form.handle_key(&KeyBinding::ch(c), &keymap);
        }
        assert_eq!(form.value("Attribute"), "age");

        form.handle_key(&KeyBinding::plain(KeyName::Tab), &keymap);
        assert_eq!(form.focused_label(), Some("Type"));
        form.handle_key(&KeyBinding::plain(KeyName::Right), &keymap);
        assert_eq!(form.value("Type"), "Number");
        form.handle_key(&KeyBinding::plain(KeyName::Right), &keymap);
        assert_eq!(form.value("Type"), "String");

        form.handle_key(&KeyBinding::plain(KeyName::BackTab), &keymap);
        form.handle_key(&KeyBinding::plain(KeyName::BackTab), &keymap);
        assert_eq!(form.focused_label(), Some("Value"));

        form.set_value("Type", "Number");
        assert_eq!(form.value("Type"), "Number");
        assert_eq!(form.value("Missing"), "");
        assert_eq!(
            form.handle_key(&KeyBinding::plain(KeyName::Enter), &keymap),
            FormEvent::Submitted
        );
        assert_eq!(
            form.handle_key(&KeyBinding::plain(KeyName::Esc), &keymap),
            FormEvent::Cancelled
        );
    }
}
