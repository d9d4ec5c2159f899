//! Selectable table view over a [`TableModel`].
//!
//! Owns the ratatui scroll state and the `/` find prompt. Matching cells are
//! recoloured with the tertiary palette colour; `n`/`N` walk the matches
//! while any are highlighted.

use ratatui::Frame;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::Modifier;
use ratatui::text::Line;
use ratatui::widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState};
use tracing::error;

use skyview_core::error::UiError;
use skyview_core::keymap::{Action, KeyBinding, KeyName};
use skyview_core::table::TableModel;

use crate::ui::component::EventCx;
use crate::ui::input::LineInput;
use crate::ui::rows::TableRow;
use crate::ui::theme::styles;

const MAX_COLUMN_WIDTH: usize = 60;
const WIDTH_SAMPLE_ROWS: usize = 200;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TableEvent {
    /// Enter on a row
    Selected(usize),
    SelectionChanged(usize),
    Consumed,
    Ignored,
}

impl TableEvent {
    pub fn handled(self) -> bool {
        self != TableEvent::Ignored
    }
}

pub struct SelectableTable<T> {
    model: TableModel<T>,
    state: TableState,
    find: Option<LineInput>,
    needle: String,
    viewport: usize,
}

impl<T> SelectableTable<T> {
    pub fn new(headings: Vec<String>) -> Self {
        Self {
            model: TableModel::new(headings),
            state: TableState::default(),
            find: None,
            needle: String::new(),
            viewport: 10,
        }
    }

    pub fn with_headings(headings: &[&str]) -> Self {
        Self::new(headings.iter().map(|h| h.to_string()).collect())
    }

    pub fn model(&self) -> &TableModel<T> {
        &self.model
    }

    pub fn set_headings(&mut self, headings: Vec<String>) {
        if self.model.headings() != headings.as_slice() {
            self.model.set_headings(headings);
        }
    }

    pub fn set_data(
        &mut self,
        rows: Vec<Vec<String>>,
        payloads: Vec<T>,
        payload_col: usize,
    ) -> Result<(), UiError> {
        self.model
            .set_data(rows, payloads, payload_col)
            .inspect_err(|e| error!(error = %e, "table population rejected"))?;
        self.reapply_search();
        Ok(())
    }

    pub fn extend_data(&mut self, rows: Vec<Vec<String>>, payloads: Vec<T>) -> Result<(), UiError> {
        self.model
            .extend_data(rows, payloads)
            .inspect_err(|e| error!(error = %e, "table extension rejected"))?;
        self.reapply_search();
        Ok(())
    }

    pub fn clear(&mut self) {
        self.model.clear();
        self.state.select(None);
    }

    pub fn select(&mut self, row: usize, col: usize) -> bool {
        self.model.select(row, col)
    }

    pub fn selected(&self) -> Option<usize> {
        self.model.selected()
    }

    pub fn selected_payload(&self) -> Option<&T> {
        self.model.selected_payload()
    }

    pub fn search_text(&mut self, cols: &[usize], needle: &str) -> usize {
        self.needle = needle.to_string();
        self.model.search_text(cols, needle).len()
    }

    pub fn clear_search_highlights(&mut self) {
        self.needle.clear();
        self.model.clear_search_highlights();
    }

    pub fn is_finding(&self) -> bool {
        self.find.is_some()
    }

    fn reapply_search(&mut self) {
        if !self.needle.is_empty() {
            self.model.search_text(&[], &self.needle.clone());
        }
    }

    fn changed(&self, moved: bool) -> TableEvent {
        match (moved, self.model.selected()) {
            (true, Some(row)) => TableEvent::SelectionChanged(row),
            _ => TableEvent::Consumed,
        }
    }

    fn handle_find_key(&mut self, key: &KeyBinding) -> TableEvent {
        match key.key {
            KeyName::Esc => {
                self.find = None;
                self.clear_search_highlights();
                TableEvent::Consumed
            }
            KeyName::Enter => {
                self.find = None;
                let moved = self.model.next_match().is_some();
                self.changed(moved)
            }
            _ => {
                if let Some(input) = self.find.as_mut() {
                    if input.handle_key(key) {
                        let needle = input.text().to_string();
                        self.search_text(&[], &needle);
                    }
                }
                TableEvent::Consumed
            }
        }
    }

    pub fn handle_key(&mut self, key: &KeyBinding, cx: &EventCx) -> TableEvent {
        if self.find.is_some() {
            return self.handle_find_key(key);
        }
        let page = self.viewport.max(1) as isize;

        if cx.is(Action::Find, key) {
            self.find = Some(LineInput::new(&self.needle));
            TableEvent::Consumed
        } else if cx.is(Action::Confirm, key) {
            match self.model.selected() {
                Some(row) => TableEvent::Selected(row),
                None => TableEvent::Consumed,
            }
        } else if cx.is(Action::Down, key) || key.key == KeyName::Down {
            let moved = self.model.move_selection(1);
            self.changed(moved)
        } else if cx.is(Action::Up, key) || key.key == KeyName::Up {
            let moved = self.model.move_selection(-1);
            self.changed(moved)
        } else if cx.is(Action::Top, key) || key.key == KeyName::Home {
            let moved = self.model.select_first();
            self.changed(moved)
        } else if cx.is(Action::Bottom, key) || key.key == KeyName::End {
            let moved = self.model.select_last();
            self.changed(moved)
        } else if cx.is(Action::PageDown, key) || key.key == KeyName::PageDown {
            let moved = self.model.move_selection(page);
            self.changed(moved)
        } else if cx.is(Action::PageUp, key) || key.key == KeyName::PageUp {
            let moved = self.model.move_selection(-page);
            self.changed(moved)
        } else if cx.is(Action::Left, key) || key.key == KeyName::Left {
            self.model.move_column(-1);
            TableEvent::Consumed
        } else if cx.is(Action::Right, key) || key.key == KeyName::Right {
            self.model.move_column(1);
            TableEvent::Consumed
        } else if self.model.has_highlights() && cx.is(Action::NextMatch, key) {
            let moved = self.model.next_match().is_some();
            self.changed(moved)
        } else if self.model.has_highlights() && cx.is(Action::PrevMatch, key) {
            let moved = self.model.prev_match().is_some();
            self.changed(moved)
        } else if self.model.has_highlights() && cx.is(Action::Back, key) {
            self.clear_search_highlights();
            TableEvent::Consumed
        } else if cx.is(Action::ClearTable, key) {
            self.clear();
            TableEvent::Consumed
        } else {
            TableEvent::Ignored
        }
    }

    fn column_widths(&self) -> Vec<Constraint> {
        let headings = self.model.headings();
        let mut widths: Vec<usize> = headings.iter().map(|h| h.chars().count()).collect();
        for row in self.model.rows().iter().take(WIDTH_SAMPLE_ROWS) {
            for (w, cell) in widths.iter_mut().zip(row) {
                *w = (*w).max(cell.chars().count());
            }
        }
        let last = widths.len().saturating_sub(1);
        widths
            .into_iter()
            .enumerate()
            .map(|(i, w)| {
                let w = w.min(MAX_COLUMN_WIDTH) as u16;
                if i == last {
                    Constraint::Min(w)
                } else {
                    Constraint::Length(w)
                }
            })
            .collect()
    }

    pub fn render(&mut self, frame: &mut Frame, area: Rect, title: &str, focused: bool) {
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(styles::border(focused))
            .title(Line::styled(format!(" {title} "), styles::title()));
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let (table_area, find_area) = if self.find.is_some() {
            let [t, f] = Layout::vertical([Constraint::Min(1), Constraint::Length(1)]).areas(inner);
            (t, Some(f))
        } else {
            (inner, None)
        };
        self.viewport = table_area.height.saturating_sub(1) as usize;

        let headings = self.model.headings();
        let state_cols: Vec<usize> = headings
            .iter()
            .enumerate()
            .filter(|(_, h)| h.eq_ignore_ascii_case("status") || h.eq_ignore_ascii_case("state"))
            .map(|(i, _)| i)
            .collect();
        let selected = self.model.selected();
        let selected_col = self.model.selected_col();

        let header = Row::new(headings.iter().map(|h| Cell::from(h.as_str()))).style(styles::header());
        let rows = self.model.rows().iter().enumerate().map(|(r, cells)| {
            Row::new(cells.iter().enumerate().map(|(c, text)| {
                let mut style = if state_cols.contains(&c) {
                    styles::state(text)
                } else {
                    styles::text()
                };
                if self.model.is_highlighted(r, c) {
                    style = style.patch(styles::highlight());
                }
                if focused && selected == Some(r) && c == selected_col {
                    style = style.add_modifier(Modifier::UNDERLINED);
                }
                Cell::from(text.as_str()).style(style)
            }))
        });

        let table = Table::new(rows, self.column_widths())
            .header(header)
            .column_spacing(2)
            .highlight_symbol("▶ ")
            .row_highlight_style(styles::selection());

        self.state.select(selected);
        frame.render_stateful_widget(table, table_area, &mut self.state);

        if self.model.is_empty() && table_area.height > 1 {
            let empty = Rect::new(table_area.x, table_area.y + 1, table_area.width, 1);
            frame.render_widget(
                Paragraph::new(Line::styled("  (no data)", styles::text_muted())),
                empty,
            );
        }

        if let (Some(input), Some(area)) = (self.find.as_ref(), find_area) {
            input.render(frame, area, "/", true);
        }
    }
}

impl<T: TableRow> SelectableTable<T> {
    /// Replace the table contents with `items`, `lead` headings first.
    pub fn populate(&mut self, items: &[T], lead: &[String]) -> Result<(), UiError> {
        let headings = crate::ui::rows::lead_headings(lead, T::headings(items));
        if headings.is_empty() {
            self.set_headings(Vec::new());
            self.clear();
            return Ok(());
        }
        self.set_headings(headings.clone());
        let rows = items.iter().map(|i| i.cells(&headings)).collect();
        let payload_col = T::payload_column().min(headings.len().saturating_sub(1));
        self.set_data(rows, items.to_vec(), payload_col)
    }

    /// Copy the selected payload to the clipboard.
    pub fn copy_selected(&self, cx: &mut EventCx) -> bool {
        match self.model.selected_payload() {
            Some(payload) => {
                cx.ctx.clipboard.set_text(payload.payload_text());
                true
            }
            None => false,
        }
    }
}
