//! Multi-line text pane with vi-style motions.
//!
//! Read-only areas show JSON details and query results; editable areas
//! (payload and query editors) add an insert mode entered with `i` and left
//! with Esc. One insert session is one undo step.

use ratatui::Frame;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::Style;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};

use skyview_core::format::try_format_json;
use skyview_core::keymap::{Action, KeyBinding, KeyName};

use crate::ui::component::{EventCx, KeyOutcome};
use crate::ui::input::LineInput;
use crate::ui::keys::typed_char;
use crate::ui::theme::styles;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    Normal,
    Insert,
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct Snapshot {
    lines: Vec<String>,
    row: usize,
    col: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum CharClass {
    Space,
    Word,
    Punct,
}

fn class_of(c: char) -> CharClass {
    if c.is_whitespace() {
        CharClass::Space
    } else if c.is_alphanumeric() || c == '_' {
        CharClass::Word
    } else {
        CharClass::Punct
    }
}

fn byte_at(line: &str, col: usize) -> usize {
    line.char_indices()
        .nth(col)
        .map(|(i, _)| i)
        .unwrap_or(line.len())
}

pub struct TextArea {
    title: String,
    lines: Vec<String>,
    row: usize,
    /// Cursor column in characters
    col: usize,
    editable: bool,
    mode: Mode,
    undo: Vec<Snapshot>,
    redo: Vec<Snapshot>,
    prompt: Option<LineInput>,
    needle: String,
    matches: Vec<(usize, usize)>,
    scroll: usize,
    hscroll: usize,
    viewport: usize,
}

impl TextArea {
    pub fn read_only(title: &str) -> Self {
        Self {
            title: title.to_string(),
            lines: vec![String::new()],
            row: 0,
            col: 0,
            editable: false,
            mode: Mode::Normal,
            undo: Vec::new(),
            redo: Vec::new(),
            prompt: None,
            needle: String::new(),
            matches: Vec::new(),
            scroll: 0,
            hscroll: 0,
            viewport: 10,
        }
    }

    pub fn editable(title: &str) -> Self {
        Self {
            editable: true,
            ..Self::read_only(title)
        }
    }

    pub fn set_title(&mut self, title: &str) {
        self.title = title.to_string();
    }

    /// Replace the content; history, search and cursor are reset.
    pub fn set_text(&mut self, text: &str) {
        self.lines = text.split('\n').map(str::to_string).collect();
        self.row = 0;
        self.col = 0;
        self.scroll = 0;
        self.hscroll = 0;
        self.mode = Mode::Normal;
        self.undo.clear();
        self.redo.clear();
        self.needle.clear();
        self.matches.clear();
    }

    /// Show `text` pretty-printed when it is a JSON object, as-is otherwise.
    pub fn set_json(&mut self, text: &str) {
        let (formatted, _) = try_format_json(text);
        self.set_text(&formatted);
    }

    pub fn clear(&mut self) {
        self.set_text("");
    }

    pub fn text(&self) -> String {
        self.lines.join("\n")
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn cursor(&self) -> (usize, usize) {
        (self.row, self.col)
    }

    pub fn matches(&self) -> &[(usize, usize)] {
        &self.matches
    }

    fn line_len(&self, row: usize) -> usize {
        self.lines.get(row).map(|l| l.chars().count()).unwrap_or(0)
    }

    fn clamp_col(&mut self) {
        let len = self.line_len(self.row);
        let max = if self.mode == Mode::Insert {
            len
        } else {
            len.saturating_sub(1)
        };
        self.col = self.col.min(max);
    }

    fn move_rows(&mut self, delta: isize) {
        let last = self.lines.len().saturating_sub(1) as isize;
        self.row = (self.row as isize + delta).clamp(0, last) as usize;
        self.clamp_col();
    }

    fn char_at(&self, row: usize, col: usize) -> Option<char> {
        self.lines.get(row).and_then(|l| l.chars().nth(col))
    }

    fn word_right(&mut self) {
        let len = self.line_len(self.row);
        if let Some(start) = self.char_at(self.row, self.col) {
            let class = class_of(start);
            let mut col = self.col;
            while col < len && self.char_at(self.row, col).map(class_of) == Some(class) {
                col += 1;
            }
            while col < len && self.char_at(self.row, col).map(class_of) == Some(CharClass::Space)
            {
                col += 1;
            }
            if col < len {
                self.col = col;
                return;
            }
        }
        if self.row + 1 < self.lines.len() {
            self.row += 1;
            let line = &self.lines[self.row];
            self.col = line.chars().take_while(|c| c.is_whitespace()).count();
            self.clamp_col();
        }
    }

    fn word_left(&mut self) {
        if self.col == 0 {
            if self.row > 0 {
                self.row -= 1;
                self.col = self.line_len(self.row);
                self.clamp_col();
            }
            return;
        }
        let mut col = self.col;
        while col > 0 && self.char_at(self.row, col - 1).map(class_of) == Some(CharClass::Space) {
            col -= 1;
        }
        if let Some(class) = col.checked_sub(1).and_then(|c| self.char_at(self.row, c)).map(class_of)
        {
            while col > 0 && self.char_at(self.row, col - 1).map(class_of) == Some(class) {
                col -= 1;
            }
        }
        self.col = col;
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot {
            lines: self.lines.clone(),
            row: self.row,
            col: self.col,
        }
    }

    fn restore(&mut self, snapshot: Snapshot) {
        self.lines = snapshot.lines;
        self.row = snapshot.row.min(self.lines.len().saturating_sub(1));
        self.col = snapshot.col;
        self.clamp_col();
        self.refresh_matches();
    }

    fn enter_insert(&mut self) {
        self.undo.push(self.snapshot());
        self.redo.clear();
        self.mode = Mode::Insert;
    }

    fn leave_insert(&mut self) {
        self.mode = Mode::Normal;
        if self.undo.last().is_some_and(|s| s.lines == self.lines) {
            self.undo.pop();
        }
        self.clamp_col();
        self.refresh_matches();
    }

    fn insert_char(&mut self, c: char) {
        let line = &mut self.lines[self.row];
        let at = byte_at(line, self.col);
        line.insert(at, c);
        self.col += 1;
    }

    fn split_line(&mut self) {
        let line = &mut self.lines[self.row];
        let at = byte_at(line, self.col);
        let rest = line.split_off(at);
        self.lines.insert(self.row + 1, rest);
        self.row += 1;
        self.col = 0;
    }

    fn backspace(&mut self) {
        if self.col > 0 {
            self.col -= 1;
            let line = &mut self.lines[self.row];
            let at = byte_at(line, self.col);
            line.remove(at);
        } else if self.row > 0 {
            let line = self.lines.remove(self.row);
            self.row -= 1;
            self.col = self.line_len(self.row);
            self.lines[self.row].push_str(&line);
        }
    }

    fn delete(&mut self) {
        let len = self.line_len(self.row);
        if self.col < len {
            let line = &mut self.lines[self.row];
            let at = byte_at(line, self.col);
            line.remove(at);
        } else if self.row + 1 < self.lines.len() {
            let next = self.lines.remove(self.row + 1);
            self.lines[self.row].push_str(&next);
        }
    }

    fn handle_insert_key(&mut self, key: &KeyBinding) -> KeyOutcome {
        if let Some(c) = typed_char(key) {
            self.insert_char(c);
            return KeyOutcome::Consumed;
        }
        if key.ctrl || key.alt {
            return KeyOutcome::Ignored;
        }
        match key.key {
            KeyName::Esc => self.leave_insert(),
            KeyName::Enter => self.split_line(),
            KeyName::Tab => {
                self.insert_char(' ');
                self.insert_char(' ');
            }
            KeyName::Backspace => self.backspace(),
            KeyName::Delete => self.delete(),
            KeyName::Left => self.col = self.col.saturating_sub(1),
            KeyName::Right => self.col = (self.col + 1).min(self.line_len(self.row)),
            KeyName::Up => self.move_rows(-1),
            KeyName::Down => self.move_rows(1),
            KeyName::Home => self.col = 0,
            KeyName::End => self.col = self.line_len(self.row),
            _ => return KeyOutcome::Ignored,
        }
        KeyOutcome::Consumed
    }

    fn refresh_matches(&mut self) {
        self.matches.clear();
        if self.needle.is_empty() {
            return;
        }
        for (row, line) in self.lines.iter().enumerate() {
            for (at, _) in line.match_indices(self.needle.as_str()) {
                self.matches.push((row, line[..at].chars().count()));
            }
        }
    }

    /// Jump to the next (or previous) match relative to the cursor, wrapping.
    fn jump_match(&mut self, forward: bool) -> bool {
        let here = (self.row, self.col);
        let target = if forward {
            self.matches
                .iter()
                .find(|m| **m > here)
                .or_else(|| self.matches.first())
        } else {
            self.matches
                .iter()
                .rev()
                .find(|m| **m < here)
                .or_else(|| self.matches.last())
        };
        match target.copied() {
            Some((row, col)) => {
                self.row = row;
                self.col = col;
                true
            }
            None => false,
        }
    }

    fn handle_prompt_key(&mut self, key: &KeyBinding) -> KeyOutcome {
        let Some(prompt) = self.prompt.as_mut() else {
            return KeyOutcome::Ignored;
        };
        match key.key {
            KeyName::Esc => self.prompt = None,
            KeyName::Enter => {
                self.needle = prompt.text().to_string();
                self.prompt = None;
                self.refresh_matches();
                if !self.matches.contains(&(self.row, self.col)) {
                    self.jump_match(true);
                }
            }
            _ => {
                prompt.handle_key(key);
            }
        }
        KeyOutcome::Consumed
    }

    pub fn handle_key(&mut self, key: &KeyBinding, cx: &mut EventCx) -> KeyOutcome {
        if self.prompt.is_some() {
            return self.handle_prompt_key(key);
        }
        if self.mode == Mode::Insert {
            return self.handle_insert_key(key);
        }

        let half = (self.viewport / 2).max(1) as isize;
        if cx.is(Action::Down, key) || key == &KeyBinding::plain(KeyName::Down) {
            self.move_rows(1);
        } else if cx.is(Action::Up, key) || key == &KeyBinding::plain(KeyName::Up) {
            self.move_rows(-1);
        } else if cx.is(Action::Left, key) || key == &KeyBinding::plain(KeyName::Left) {
            self.col = self.col.saturating_sub(1);
        } else if cx.is(Action::Right, key) || key == &KeyBinding::plain(KeyName::Right) {
            self.col += 1;
            self.clamp_col();
        } else if cx.is(Action::LineStart, key) || key == &KeyBinding::plain(KeyName::Home) {
            self.col = 0;
        } else if cx.is(Action::LineEnd, key) || key == &KeyBinding::plain(KeyName::End) {
            self.col = usize::MAX;
            self.clamp_col();
        } else if cx.is(Action::Top, key) {
            self.row = 0;
            self.clamp_col();
        } else if cx.is(Action::Bottom, key) {
            self.row = self.lines.len().saturating_sub(1);
            self.clamp_col();
        } else if cx.is(Action::WordRight, key) {
            self.word_right();
        } else if cx.is(Action::WordLeft, key) {
            self.word_left();
        } else if cx.is(Action::PageDown, key) || key.key == KeyName::PageDown {
            self.move_rows(half);
        } else if cx.is(Action::PageUp, key) || key.key == KeyName::PageUp {
            self.move_rows(-half);
        } else if cx.is(Action::Copy, key) {
            if let Some(line) = self.lines.get(self.row) {
                cx.ctx.clipboard.set_text(line.clone());
            }
        } else if cx.is(Action::Find, key) {
            self.prompt = Some(LineInput::new(&self.needle));
        } else if cx.is(Action::NextMatch, key) && !self.matches.is_empty() {
            self.jump_match(true);
        } else if cx.is(Action::PrevMatch, key) && !self.matches.is_empty() {
            self.jump_match(false);
        } else if key.key == KeyName::Esc && !self.needle.is_empty() {
            self.needle.clear();
            self.matches.clear();
        } else if self.editable && cx.is(Action::InsertMode, key) {
            self.enter_insert();
        } else if self.editable && cx.is(Action::Undo, key) {
            if let Some(previous) = self.undo.pop() {
                self.redo.push(self.snapshot());
                self.restore(previous);
            }
        } else if self.editable && cx.is(Action::Redo, key) {
            if let Some(next) = self.redo.pop() {
                self.undo.push(self.snapshot());
                self.restore(next);
            }
        } else {
            return KeyOutcome::Ignored;
        }
        KeyOutcome::Consumed
    }

    fn styled_line(&self, row: usize, width: usize, focused: bool) -> Line<'static> {
        let line = &self.lines[row];
        let needle_len = self.needle.chars().count();
        let in_match = |col: usize| {
            needle_len > 0
                && self
                    .matches
                    .iter()
                    .any(|&(r, c)| r == row && col >= c && col < c + needle_len)
        };

        let mut spans: Vec<Span<'static>> = Vec::new();
        let mut run = String::new();
        let mut run_style: Option<Style> = None;
        let chars: Vec<char> = line.chars().collect();
        let end = (self.hscroll + width).min(chars.len() + 1);
        for col in self.hscroll..end {
            let c = chars.get(col).copied().unwrap_or(' ');
            if col == chars.len() && !(focused && row == self.row && col == self.col) {
                break;
            }
            let style = if focused && row == self.row && col == self.col {
                styles::selection()
            } else if in_match(col) {
                styles::highlight()
            } else {
                styles::text()
            };
            if run_style.is_some_and(|s| s != style) {
                spans.push(Span::styled(std::mem::take(&mut run), run_style.unwrap_or_default()));
            }
            run_style = Some(style);
            run.push(c);
        }
        if !run.is_empty() {
            spans.push(Span::styled(run, run_style.unwrap_or_default()));
        }
        Line::from(spans)
    }

    pub fn render(&mut self, frame: &mut Frame, area: Rect, focused: bool) {
        let (text_area, prompt_area) = match self.prompt {
            Some(_) => {
                let [t, p] =
                    Layout::vertical([Constraint::Min(3), Constraint::Length(1)]).areas(area);
                (t, Some(p))
            }
            None => (area, None),
        };

        let mut title = format!(" {} ", self.title);
        if self.mode == Mode::Insert {
            title.push_str("-- INSERT -- ");
        }
        if !self.matches.is_empty() {
            title.push_str(&format!("[{} matches] ", self.matches.len()));
        }
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(styles::border(focused))
            .title(Line::styled(title, styles::title()));
        let inner = block.inner(text_area);

        self.viewport = inner.height.max(1) as usize;
        if self.row < self.scroll {
            self.scroll = self.row;
        } else if self.row >= self.scroll + self.viewport {
            self.scroll = self.row + 1 - self.viewport;
        }
        let width = inner.width.max(1) as usize;
        if self.col < self.hscroll {
            self.hscroll = self.col;
        } else if self.col >= self.hscroll + width {
            self.hscroll = self.col + 1 - width;
        }

        let lines: Vec<Line> = (self.scroll..self.lines.len())
            .take(self.viewport)
            .map(|row| self.styled_line(row, width, focused))
            .collect();
        frame.render_widget(Paragraph::new(lines).block(block), text_area);

        if let (Some(prompt), Some(area)) = (self.prompt.as_ref(), prompt_area) {
            prompt.render(frame, area, "/", true);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::test_support;
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;

    fn press(area: &mut TextArea, cx: &mut EventCx, keys: &str) {
        for c in keys.chars() {
            area.handle_key(&KeyBinding::ch(c), cx);
        }
    }

    #[test]
    fn test_json_pretty_print() {
        let mut area = TextArea::read_only("Details");
        area.set_json(r#"{"userId": 1,"id": 1,"title": "delectus aut autem","completed": false}"#);
        assert_eq!(
            area.text(),
            "{\n  \"completed\": false,\n  \"id\": 1,\n  \"title\": \"delectus aut autem\",\n  \"userId\": 1\n}"
        );
        area.set_json("Hello");
        assert_eq!(area.text(), "Hello");
        area.set_json("");
        assert_eq!(area.text(), "");
    }

    #[test]
    fn test_vi_motions() {
        let mut cx = EventCx::new(test_support::context());
        let mut area = TextArea::read_only("Details");
        area.set_text("alpha beta.gamma\n  second line\nthird");

        press(&mut area, &mut cx, "w");
        assert_eq!(area.cursor(), (0, 6));
        press(&mut area, &mut cx, "w");
        assert_eq!(area.cursor(), (0, 10));
        press(&mut area, &mut cx, "b");
        assert_eq!(area.cursor(), (0, 6));
        press(&mut area, &mut cx, "$");
        assert_eq!(area.cursor(), (0, 15));
        press(&mut area, &mut cx, "j");
        assert_eq!(area.cursor(), (1, 12));
        press(&mut area, &mut cx, "^");
        assert_eq!(area.cursor(), (1, 0));
        press(&mut area, &mut cx, "G");
        assert_eq!(area.cursor(), (2, 0));
        press(&mut area, &mut cx, "g");
        assert_eq!(area.cursor(), (0, 0));

        press(&mut area, &mut cx, "jy");
        assert_eq!(cx.ctx.clipboard.text().as_deref(), Some("  second line"));
    }

    #[test]
    fn test_insert_undo_redo() {
        let mut cx = EventCx::new(test_support::context());
        let mut area = TextArea::editable("Payload");
        area.set_text("{}");

        press(&mut area, &mut cx, "li");
        assert_eq!(area.mode(), Mode::Insert);
        press(&mut area, &mut cx, "\"a\": 1");
        area.handle_key(&KeyBinding::plain(KeyName::Esc), &mut cx);
        assert_eq!(area.mode(), Mode::Normal);
        assert_eq!(area.text(), "{\"a\": 1}");

        press(&mut area, &mut cx, "u");
        assert_eq!(area.text(), "{}");
        area.handle_key(&KeyBinding::ctrl('r'), &mut cx);
        assert_eq!(area.text(), "{\"a\": 1}");

        // An insert session with no change leaves no undo step.
        press(&mut area, &mut cx, "i");
        area.handle_key(&KeyBinding::plain(KeyName::Esc), &mut cx);
        press(&mut area, &mut cx, "u");
        assert_eq!(area.text(), "{}");
    }

    #[test]
    fn test_insert_newline_and_backspace_join() {
        let mut cx = EventCx::new(test_support::context());
        let mut area = TextArea::editable("Query");
        area.set_text("ab");
        press(&mut area, &mut cx, "li");
        area.handle_key(&KeyBinding::plain(KeyName::Enter), &mut cx);
        assert_eq!(area.text(), "a\nb");
        area.handle_key(&KeyBinding::plain(KeyName::Backspace), &mut cx);
        assert_eq!(area.text(), "ab");
        assert!(!area.handle_key(&KeyBinding::ctrl('e'), &mut cx).consumed());
    }

    #[test]
    fn test_read_only_ignores_insert() {
        let mut cx = EventCx::new(test_support::context());
        let mut area = TextArea::read_only("Details");
        area.set_text("x");
        assert_eq!(
            area.handle_key(&KeyBinding::ch('i'), &mut cx),
            KeyOutcome::Ignored
        );
        assert_eq!(area.mode(), Mode::Normal);
    }

    #[test]
    fn test_search_navigation() {
        let mut cx = EventCx::new(test_support::context());
        let mut area = TextArea::read_only("Details");
        area.set_text("error one\nok\nerror two");

        press(&mut area, &mut cx, "/error");
        area.handle_key(&KeyBinding::plain(KeyName::Enter), &mut cx);
        assert_eq!(area.matches(), &[(0, 0), (2, 0)]);
        assert_eq!(area.cursor(), (0, 0));
        press(&mut area, &mut cx, "n");
        assert_eq!(area.cursor(), (2, 0));
        press(&mut area, &mut cx, "n");
        assert_eq!(area.cursor(), (0, 0));
        press(&mut area, &mut cx, "N");
        assert_eq!(area.cursor(), (2, 0));

        area.handle_key(&KeyBinding::plain(KeyName::Esc), &mut cx);
        assert!(area.matches().is_empty());
    }

    #[test]
    fn test_render_shows_mode() {
        let mut cx = EventCx::new(test_support::context());
        let mut area = TextArea::editable("Payload");
        area.set_text("{}");
        press(&mut area, &mut cx, "i");
        let mut terminal = Terminal::new(TestBackend::new(40, 5)).unwrap();
        terminal
            .draw(|frame| area.render(frame, frame.area(), true))
            .unwrap();
        let text: String = terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|c| c.symbol())
            .collect();
        assert!(text.contains("INSERT"));
        assert!(text.contains("{}"));
    }
}
