//! Columnar table model with a private payload per row.
//!
//! Display rows are clamped for rendering; the full value lives in the
//! payload so detail views can show it untruncated. Every population is
//! validated before anything is replaced.

use crate::error::{
    PRIVATE_COLUMN_OUT_OF_BOUNDS, PRIVATE_DATA_ROWS_MISMATCH, TABLE_DIMENSIONS_MISMATCH, UiError,
};
use crate::format::clamp_cell;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CellPos {
    pub row: usize,
    pub col: usize,
}

#[derive(Clone, Debug)]
pub struct TableModel<T> {
    headings: Vec<String>,
    rows: Vec<Vec<String>>,
    payloads: Vec<T>,
    payload_col: usize,
    highlights: Vec<CellPos>,
    selected: Option<usize>,
    selected_col: usize,
}

impl<T> Default for TableModel<T> {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl<T> TableModel<T> {
    pub fn new(headings: Vec<String>) -> Self {
        Self {
            headings,
            rows: Vec::new(),
            payloads: Vec::new(),
            payload_col: 0,
            highlights: Vec::new(),
            selected: None,
            selected_col: 0,
        }
    }

    pub fn with_headings(headings: &[&str]) -> Self {
        Self::new(headings.iter().map(|h| h.to_string()).collect())
    }

    /// Replace the headings; existing data no longer fits and is dropped.
    pub fn set_headings(&mut self, headings: Vec<String>) {
        self.headings = headings;
        self.clear();
    }

    fn validate(&self, rows: &[Vec<String>], payloads: &[T], payload_col: usize) -> Result<(), UiError> {
        if rows.iter().any(|r| r.len() != self.headings.len()) {
            return Err(UiError::dimensions(TABLE_DIMENSIONS_MISMATCH));
        }
        if rows.len() != payloads.len() {
            return Err(UiError::dimensions(PRIVATE_DATA_ROWS_MISMATCH));
        }
        if payload_col >= self.headings.len() {
            return Err(UiError::dimensions(PRIVATE_COLUMN_OUT_OF_BOUNDS));
        }
        Ok(())
    }

    /// Atomically replace the data.
    pub fn set_data(
        &mut self,
        rows: Vec<Vec<String>>,
        payloads: Vec<T>,
        payload_col: usize,
    ) -> Result<(), UiError> {
        self.validate(&rows, &payloads, payload_col)?;
        self.rows = clamp_rows(rows);
        self.payloads = payloads;
        self.payload_col = payload_col;
        self.highlights.clear();
        self.selected = (!self.rows.is_empty()).then_some(0);
        self.selected_col = self.selected_col.min(self.headings.len().saturating_sub(1));
        Ok(())
    }

    /// Append rows after the current ones, keeping the selection.
    pub fn extend_data(&mut self, rows: Vec<Vec<String>>, payloads: Vec<T>) -> Result<(), UiError> {
        self.validate(&rows, &payloads, self.payload_col)?;
        self.rows.extend(clamp_rows(rows));
        self.payloads.extend(payloads);
        if self.selected.is_none() && !self.rows.is_empty() {
            self.selected = Some(0);
        }
        Ok(())
    }

    pub fn clear(&mut self) {
        self.rows.clear();
        self.payloads.clear();
        self.highlights.clear();
        self.selected = None;
    }

    pub fn headings(&self) -> &[String] {
        &self.headings
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn payloads(&self) -> &[T] {
        &self.payloads
    }

    pub fn payload_col(&self) -> usize {
        self.payload_col
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    // ------------------------------------------------------------------------
    // Selection
    // ------------------------------------------------------------------------

    /// Select a cell, clamped into range. Returns true if the row changed.
    pub fn select(&mut self, row: usize, col: usize) -> bool {
        if self.rows.is_empty() {
            self.selected = None;
            return false;
        }
        let row = row.min(self.rows.len() - 1);
        self.selected_col = col.min(self.headings.len().saturating_sub(1));
        let changed = self.selected != Some(row);
        self.selected = Some(row);
        changed
    }

    pub fn move_selection(&mut self, delta: isize) -> bool {
        let current = self.selected.unwrap_or(0) as isize;
        let target = (current + delta).max(0) as usize;
        self.select(target, self.selected_col)
    }

    pub fn move_column(&mut self, delta: isize) {
        let max = self.headings.len().saturating_sub(1) as isize;
        self.selected_col = (self.selected_col as isize + delta).clamp(0, max) as usize;
    }

    pub fn select_first(&mut self) -> bool {
        self.select(0, self.selected_col)
    }

    pub fn select_last(&mut self) -> bool {
        self.select(self.rows.len().saturating_sub(1), self.selected_col)
    }

    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    pub fn selected_col(&self) -> usize {
        self.selected_col
    }

    pub fn selected_row(&self) -> Option<&[String]> {
        self.selected.and_then(|i| self.rows.get(i)).map(Vec::as_slice)
    }

    pub fn selected_payload(&self) -> Option<&T> {
        self.selected.and_then(|i| self.payloads.get(i))
    }

    // ------------------------------------------------------------------------
    // Search
    // ------------------------------------------------------------------------

    /// Case-insensitive substring search over `cols` (all columns when
    /// empty). Matching cells become the highlight set; returns them.
    pub fn search_text(&mut self, cols: &[usize], needle: &str) -> Vec<CellPos> {
        self.highlights.clear();
        let needle = needle.trim().to_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }
        for (row, cells) in self.rows.iter().enumerate() {
            for (col, cell) in cells.iter().enumerate() {
                if (cols.is_empty() || cols.contains(&col)) && cell.to_lowercase().contains(&needle)
                {
                    self.highlights.push(CellPos { row, col });
                }
            }
        }
        self.highlights.clone()
    }

    pub fn highlights(&self) -> &[CellPos] {
        &self.highlights
    }

    pub fn is_highlighted(&self, row: usize, col: usize) -> bool {
        self.highlights.contains(&CellPos { row, col })
    }

    pub fn has_highlights(&self) -> bool {
        !self.highlights.is_empty()
    }

    pub fn clear_search_highlights(&mut self) {
        self.highlights.clear();
    }

    /// Move to the next highlighted cell after the current one, wrapping.
    pub fn next_match(&mut self) -> Option<CellPos> {
        let current = self.current_pos();
        let pos = self
            .highlights
            .iter()
            .copied()
            .find(|p| current.is_none_or(|c| *p > c))
            .or_else(|| self.highlights.first().copied())?;
        self.select(pos.row, pos.col);
        Some(pos)
    }

    pub fn prev_match(&mut self) -> Option<CellPos> {
        let current = self.current_pos();
        let pos = self
            .highlights
            .iter()
            .rev()
            .copied()
            .find(|p| current.is_none_or(|c| *p < c))
            .or_else(|| self.highlights.last().copied())?;
        self.select(pos.row, pos.col);
        Some(pos)
    }

    fn current_pos(&self) -> Option<CellPos> {
        self.selected.map(|row| CellPos {
            row,
            col: self.selected_col,
        })
    }
}

fn clamp_rows(rows: Vec<Vec<String>>) -> Vec<Vec<String>> {
    rows.into_iter()
        .map(|r| r.iter().map(|c| clamp_cell(c)).collect())
        .collect()
}
