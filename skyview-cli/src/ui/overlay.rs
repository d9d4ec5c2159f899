//! Floating layers: the message prompt, fuzzy list pickers and the help
//! sheet.

use ratatui::Frame;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap};

use skyview_core::fuzzy::FuzzySearch;
use skyview_core::keymap::{Action, KeyBinding, KeyMap, KeyName};

use crate::ui::component::MessageKind;
use crate::ui::input::LineInput;
use crate::ui::theme::styles;

/// A `width` x `height` rect centred in `area`, shrunk to fit.
pub fn centered_rect(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width.saturating_sub(2)).max(1);
    let height = height.min(area.height.saturating_sub(2)).max(1);
    Rect {
        x: area.x + area.width.saturating_sub(width) / 2,
        y: area.y + area.height.saturating_sub(height) / 2,
        width,
        height,
    }
}

// ============================================================================
// Message prompt
// ============================================================================

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MessagePrompt {
    pub kind: MessageKind,
    pub text: String,
}

impl MessagePrompt {
    pub fn new(kind: MessageKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }

    /// True when the prompt was dismissed.
    pub fn handle_key(&self, key: &KeyBinding) -> bool {
        matches!(key.key, KeyName::Enter | KeyName::Esc | KeyName::Space)
    }

    pub fn render(&self, frame: &mut Frame, area: Rect) {
        let (title, style) = match self.kind {
            MessageKind::Error => (" Error ", styles::error()),
            MessageKind::Info => (" Info ", styles::info()),
        };
        let width = (area.width * 60 / 100).clamp(30, 80);
        let text_lines = (self.text.chars().count() as u16 / width.saturating_sub(4).max(1)) + 1;
        let rect = centered_rect(area, width, text_lines + 5);
        frame.render_widget(Clear, rect);

        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(style)
            .title(Line::styled(title, style));
        let inner = block.inner(rect);
        frame.render_widget(block, rect);

        let [body, button] =
            Layout::vertical([Constraint::Min(1), Constraint::Length(1)]).areas(inner);
        frame.render_widget(
            Paragraph::new(self.text.as_str())
                .style(styles::text())
                .wrap(Wrap { trim: false }),
            body,
        );
        frame.render_widget(
            Paragraph::new(Line::from(Span::styled("[ OK ]", styles::selection())).centered()),
            button,
        );
    }
}

// ============================================================================
// List picker
// ============================================================================

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PickerEvent<T> {
    Chosen(T),
    Closed,
    Consumed,
}

/// A fuzzy-filtered list. Typing narrows it; Enter chooses, Esc closes.
pub struct ListPicker<T> {
    title: String,
    entries: Vec<(String, T)>,
    input: LineInput,
    visible: Vec<usize>,
    state: ListState,
    fuzzy: FuzzySearch,
}

impl<T: Clone> ListPicker<T> {
    pub fn new(title: &str, entries: Vec<(String, T)>) -> Self {
        let mut picker = Self {
            title: title.to_string(),
            entries,
            input: LineInput::default(),
            visible: Vec::new(),
            state: ListState::default(),
            fuzzy: FuzzySearch::new(),
        };
        picker.refilter();
        picker
    }

    pub fn set_entries(&mut self, entries: Vec<(String, T)>) {
        self.entries = entries;
        self.refilter();
    }

    /// Clear the filter and select the first entry.
    pub fn reset(&mut self) {
        self.input.clear();
        self.refilter();
    }

    /// Move the selection onto the entry labelled `label`.
    pub fn select_label(&mut self, label: &str) {
        if let Some(pos) = self
            .visible
            .iter()
            .position(|&i| self.entries[i].0 == label)
        {
            self.state.select(Some(pos));
        }
    }

    pub fn query(&self) -> &str {
        self.input.text()
    }

    pub fn visible_labels(&self) -> Vec<&str> {
        self.visible
            .iter()
            .map(|&i| self.entries[i].0.as_str())
            .collect()
    }

    pub fn selected(&self) -> Option<&T> {
        let pos = self.state.selected()?;
        let index = *self.visible.get(pos)?;
        self.entries.get(index).map(|(_, value)| value)
    }

    fn refilter(&mut self) {
        let labels: Vec<&str> = self.entries.iter().map(|(l, _)| l.as_str()).collect();
        self.visible = self
            .fuzzy
            .rank(&labels, self.input.text())
            .into_iter()
            .map(|m| m.index)
            .collect();
        self.state
            .select((!self.visible.is_empty()).then_some(0));
    }

    fn step(&mut self, delta: isize) {
        if self.visible.is_empty() {
            return;
        }
        let last = self.visible.len() as isize - 1;
        let current = self.state.selected().unwrap_or(0) as isize;
        self.state.select(Some((current + delta).clamp(0, last) as usize));
    }

    pub fn handle_key(&mut self, key: &KeyBinding) -> PickerEvent<T> {
        match key.key {
            KeyName::Esc => return PickerEvent::Closed,
            KeyName::Enter => {
                return match self.selected() {
                    Some(value) => PickerEvent::Chosen(value.clone()),
                    None => PickerEvent::Consumed,
                };
            }
            KeyName::Down | KeyName::Tab => self.step(1),
            KeyName::Up | KeyName::BackTab => self.step(-1),
            KeyName::Char('j' | 'n') if key.ctrl => self.step(1),
            KeyName::Char('k' | 'p') if key.ctrl => self.step(-1),
            _ => {
                if self.input.handle_key(key) {
                    self.refilter();
                }
            }
        }
        PickerEvent::Consumed
    }

    /// Render into `rect` as a bordered list with a `> ` filter line.
    pub fn render_in(&mut self, frame: &mut Frame, rect: Rect, focused: bool) {
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(styles::border(focused))
            .title(Line::styled(format!(" {} ", self.title), styles::title()));
        let inner = block.inner(rect);
        frame.render_widget(block, rect);

        let [input_area, list_area] =
            Layout::vertical([Constraint::Length(1), Constraint::Min(1)]).areas(inner);
        self.input.render(frame, input_area, "> ", focused);

        let items: Vec<ListItem> = if self.visible.is_empty() {
            vec![ListItem::new(Line::styled("  No matches", styles::text_muted()))]
        } else {
            self.visible
                .iter()
                .map(|&i| ListItem::new(Line::styled(self.entries[i].0.clone(), styles::text())))
                .collect()
        };
        let list = List::new(items)
            .highlight_symbol("▸ ")
            .highlight_style(styles::selection());
        frame.render_stateful_widget(list, list_area, &mut self.state);
    }

    /// Render as a centred modal over `area`.
    pub fn render_floating(&mut self, frame: &mut Frame, area: Rect) {
        let width = (area.width * 60 / 100).clamp(30, 60);
        let height = (self.entries.len() as u16 + 4).clamp(6, 20);
        let rect = centered_rect(area, width, height);
        frame.render_widget(Clear, rect);
        self.render_in(frame, rect, true);
    }
}

// ============================================================================
// Help
// ============================================================================

pub struct HelpOverlay {
    scroll: u16,
}

impl HelpOverlay {
    pub fn new() -> Self {
        Self { scroll: 0 }
    }

    /// Scroll with j/k; true when the overlay should close.
    pub fn handle_key(&mut self, key: &KeyBinding, keymap: &KeyMap) -> bool {
        if keymap.is(Action::Help, key) || key.key == KeyName::Esc {
            self.scroll = 0;
            return true;
        }
        if keymap.is(Action::Down, key) || key.key == KeyName::Down {
            self.scroll = self.scroll.saturating_add(1);
        } else if keymap.is(Action::Up, key) || key.key == KeyName::Up {
            self.scroll = self.scroll.saturating_sub(1);
        }
        false
    }

    pub fn lines(keymap: &KeyMap) -> Vec<Line<'static>> {
        keymap
            .iter()
            .map(|(action, binding)| {
                Line::from(vec![
                    Span::styled(format!("  {:<12}", binding.to_string()), styles::key_hint()),
                    Span::styled(action.help(), styles::text()),
                ])
            })
            .collect()
    }

    pub fn render(&self, frame: &mut Frame, area: Rect, keymap: &KeyMap) {
        let rect = centered_rect(area, 56, 30);
        frame.render_widget(Clear, rect);
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(styles::border(true))
            .title(Line::styled(" Help - ? or Esc to close ", styles::title()));
        frame.render_widget(
            Paragraph::new(Self::lines(keymap))
                .block(block)
                .scroll((self.scroll, 0)),
            rect,
        );
    }
}

impl Default for HelpOverlay {
    fn default() -> Self {
        Self::new()
    }
}
