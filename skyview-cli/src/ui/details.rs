//! Two-column label/value grid for single-entity views.

use std::time::Instant;

use ratatui::Frame;
use ratatui::layout::{Constraint, Rect};
use ratatui::text::Line;
use ratatui::widgets::{Block, Borders, Cell, Row, Table, TableState};
use tracing::error;

use skyview_core::error::GatewayResult;
use skyview_core::keymap::{Action, KeyBinding, KeyName};

use crate::loader::{LoadOutcome, UiDataLoader};
use crate::ui::component::{EventCx, KeyOutcome};
use crate::ui::theme::styles;

pub type Pairs = Vec<(String, String)>;

pub struct DetailsTable {
    title: String,
    pairs: Pairs,
    state: TableState,
    loader: UiDataLoader<GatewayResult<Pairs>>,
}

impl DetailsTable {
    pub fn new(title: &str, cx: &EventCx) -> Self {
        Self {
            title: title.to_string(),
            pairs: Vec::new(),
            state: TableState::default(),
            loader: UiDataLoader::new("details", &cx.ctx.config.loader),
        }
    }

    pub fn set_pairs(&mut self, pairs: Pairs) {
        self.state.select((!pairs.is_empty()).then_some(0));
        self.pairs = pairs;
    }

    pub fn clear(&mut self) {
        self.set_pairs(Vec::new());
    }

    pub fn pairs(&self) -> &[(String, String)] {
        &self.pairs
    }

    pub fn value(&self, label: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(l, _)| l == label)
            .map(|(_, v)| v.as_str())
    }

    /// Fill the grid from a background call.
    pub fn load<F>(&mut self, work: F, cx: &EventCx)
    where
        F: Future<Output = GatewayResult<Pairs>> + Send + 'static,
    {
        self.loader
            .load_async(work, cx.ctx.cancellation(), cx.ctx.redraw.clone());
    }

    pub fn tick(&mut self, cx: &mut EventCx, now: Instant) {
        if self.loader.spin(now) {
            cx.mark_dirty();
        }
        match self.loader.poll() {
            Some(LoadOutcome::Done(Ok(pairs))) => self.set_pairs(pairs),
            Some(LoadOutcome::Done(Err(e))) => {
                error!(view = %self.title, error = %e, "details load failed");
                cx.error(e.to_string());
            }
            Some(LoadOutcome::Failed(reason)) => cx.error(reason),
            Some(LoadOutcome::TimedOut | LoadOutcome::Cancelled) | None => return,
        }
        cx.mark_dirty();
    }

    pub fn handle_key(&mut self, key: &KeyBinding, cx: &mut EventCx) -> KeyOutcome {
        let last = self.pairs.len().saturating_sub(1);
        let current = self.state.selected().unwrap_or(0);
        let target = if cx.is(Action::Down, key) || key.key == KeyName::Down {
            (current + 1).min(last)
        } else if cx.is(Action::Up, key) || key.key == KeyName::Up {
            current.saturating_sub(1)
        } else if cx.is(Action::Top, key) {
            0
        } else if cx.is(Action::Bottom, key) {
            last
        } else if cx.is(Action::Copy, key) {
            if let Some((_, value)) = self.pairs.get(current) {
                cx.ctx.clipboard.set_text(value.clone());
            }
            return KeyOutcome::Consumed;
        } else {
            return KeyOutcome::Ignored;
        };
        if !self.pairs.is_empty() {
            self.state.select(Some(target));
        }
        KeyOutcome::Consumed
    }

    pub fn render(&mut self, frame: &mut Frame, area: Rect, focused: bool) {
        let title = self.loader.title(&self.title);
        let label_width = self
            .pairs
            .iter()
            .map(|(l, _)| l.chars().count())
            .max()
            .unwrap_or(0)
            .min(32) as u16;
        let rows = self.pairs.iter().map(|(label, value)| {
            Row::new([
                Cell::from(label.as_str()).style(styles::text_dim()),
                Cell::from(value.as_str()).style(styles::state(value)),
            ])
        });
        let table = Table::new(rows, [Constraint::Length(label_width), Constraint::Min(10)])
            .column_spacing(2)
            .row_highlight_style(if focused {
                styles::selection()
            } else {
                styles::text()
            })
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(styles::border(focused))
                    .title(Line::styled(format!(" {title} "), styles::title())),
            );
        frame.render_stateful_widget(table, area, &mut self.state);
        self.loader.render_throbber(frame, area);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::test_support;
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;
    use std::time::Duration;

    #[test]
    fn test_navigation_and_copy() {
        let mut cx = EventCx::new(test_support::context());
        let mut details = DetailsTable::new("Stack", &cx);
        details.set_pairs(vec![
            ("Name".into(), "web".into()),
            ("Status".into(), "CREATE_COMPLETE".into()),
        ]);
        assert_eq!(details.value("Status"), Some("CREATE_COMPLETE"));

        details.handle_key(&KeyBinding::ch('j'), &mut cx);
        details.handle_key(&KeyBinding::ch('j'), &mut cx);
        details.handle_key(&KeyBinding::ch('y'), &mut cx);
        assert_eq!(cx.ctx.clipboard.text().as_deref(), Some("CREATE_COMPLETE"));
        assert_eq!(
            details.handle_key(&KeyBinding::ch('x'), &mut cx),
            KeyOutcome::Ignored
        );
    }

    #[tokio::test]
    async fn test_background_load() {
        let mut cx = EventCx::new(test_support::context());
        let mut details = DetailsTable::new("Summary", &cx);
        details.load(async { Ok(vec![("Name".to_string(), "run-1".to_string())]) }, &cx);
        for _ in 0..100 {
            details.tick(&mut cx, Instant::now());
            if !details.pairs().is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
        assert_eq!(details.value("Name"), Some("run-1"));
    }

    #[test]
    fn test_render() {
        let cx = EventCx::new(test_support::context());
        let mut details = DetailsTable::new("Alarm", &cx);
        details.set_pairs(vec![("State".into(), "ALARM".into())]);
        let mut terminal = Terminal::new(TestBackend::new(30, 5)).unwrap();
        terminal
            .draw(|frame| details.render(frame, frame.area(), false))
            .unwrap();
        let text: String = terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|c| c.symbol())
            .collect();
        assert!(text.contains("Alarm"));
        assert!(text.contains("ALARM"));
    }
}
