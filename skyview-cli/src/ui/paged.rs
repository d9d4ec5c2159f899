//! A selectable table fed by a [`PaginatorSource`] through a
//! [`UiDataLoader`].
//!
//! `r` resets and reloads, `n` appends the next page. `/` opens a filter
//! prompt: locally it fuzzy-filters the loaded rows on every keystroke and
//! highlights matching cells; tables with a remote search re-query with the
//! prompt text on Enter instead.

use std::time::Instant;

use ratatui::Frame;
use ratatui::layout::{Constraint, Layout, Rect};
use tracing::{debug, error};

use skyview_core::error::{GatewayResult, UiError};
use skyview_core::fuzzy::FuzzySearch;
use skyview_core::keymap::{Action, KeyBinding, KeyName};
use skyview_core::paginator::PaginatorSource;

use crate::loader::{LoadOutcome, UiDataLoader};
use crate::ui::component::EventCx;
use crate::ui::input::LineInput;
use crate::ui::rows::{TableRow, lead_headings};
use crate::ui::table::{SelectableTable, TableEvent};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum LoadKind {
    Reset,
    More,
}

type RemoteSearch<P> = fn(&P, &str) -> P;

pub struct PagedTable<P, T> {
    title: String,
    table: SelectableTable<T>,
    source: PaginatorSource<P, T>,
    loader: UiDataLoader<(LoadKind, GatewayResult<Vec<T>>)>,
    lead: Vec<String>,
    filter: String,
    prompt: Option<LineInput>,
    remote: Option<RemoteSearch<P>>,
    fuzzy: FuzzySearch,
}

impl<P, T> PagedTable<P, T>
where
    P: Clone + Send + 'static,
    T: TableRow,
{
    pub fn new(title: &str, source: PaginatorSource<P, T>, cx: &EventCx) -> Self {
        Self {
            title: title.to_string(),
            table: SelectableTable::new(T::headings(&[])),
            loader: UiDataLoader::new(source.name(), &cx.ctx.config.loader),
            source,
            lead: Vec::new(),
            filter: String::new(),
            prompt: None,
            remote: None,
            fuzzy: FuzzySearch::new(),
        }
    }

    /// Enter in the `/` prompt re-queries with `search(params, text)`.
    pub fn with_remote_search(mut self, search: RemoteSearch<P>) -> Self {
        self.remote = Some(search);
        self
    }

    pub fn set_title(&mut self, title: &str) {
        self.title = title.to_string();
    }

    /// Headings that always come first (key attributes).
    pub fn set_lead_headings(&mut self, lead: Vec<String>) {
        self.lead = lead;
    }

    /// Configure the table with new parameters; the buffer is dropped.
    pub fn set_key(&mut self, params: P) {
        self.source.reset(params);
        self.filter.clear();
        self.table.clear_search_highlights();
        self.table.clear();
    }

    pub fn params(&self) -> P {
        self.source.params()
    }

    pub fn source(&self) -> &PaginatorSource<P, T> {
        &self.source
    }

    pub fn selected(&self) -> Option<&T> {
        self.table.selected_payload()
    }

    pub fn table(&self) -> &SelectableTable<T> {
        &self.table
    }

    pub fn is_loading(&self) -> bool {
        self.loader.is_loading()
    }

    pub fn is_filtering(&self) -> bool {
        self.prompt.is_some()
    }

    /// Start a load: from the first page when `reset`, else the next one.
    /// A source left over from an earlier profile always starts over.
    pub fn refresh(&mut self, reset: bool, cx: &EventCx) {
        let kind = if reset {
            self.source.rewind();
            LoadKind::Reset
        } else if self.source.is_stale() {
            debug!(source = self.source.name(), "profile changed, reloading from first page");
            LoadKind::Reset
        } else {
            LoadKind::More
        };
        let source = self.source.clone();
        self.loader.load_async(
            async move { (kind, source.next().await) },
            cx.ctx.cancellation(),
            cx.ctx.redraw.clone(),
        );
    }

    pub fn load_more(&mut self, cx: &EventCx) -> bool {
        if !self.source.has_more() || self.loader.is_loading() {
            debug!(source = self.source.name(), "nothing more to load");
            return false;
        }
        self.refresh(false, cx);
        true
    }

    /// Collect finished loads and animate the spinner.
    pub fn tick(&mut self, cx: &mut EventCx, now: Instant) -> bool {
        if self.loader.spin(now) {
            cx.mark_dirty();
        }
        let Some(outcome) = self.loader.poll() else {
            return false;
        };
        cx.mark_dirty();
        match outcome {
            LoadOutcome::Done((kind, Ok(items))) => {
                self.apply(kind, items, cx);
                true
            }
            LoadOutcome::Done((_, Err(e))) => {
                error!(source = self.source.name(), error = %e, "load failed");
                cx.error(e.to_string());
                false
            }
            LoadOutcome::Failed(reason) => {
                cx.error(reason);
                false
            }
            LoadOutcome::TimedOut | LoadOutcome::Cancelled => false,
        }
    }

    fn apply(&mut self, kind: LoadKind, items: Vec<T>, cx: &mut EventCx) {
        let headings = lead_headings(&self.lead, T::headings(&self.source.items()));
        let extendable = kind == LoadKind::More
            && self.filter.is_empty()
            && self.table.model().headings() == headings.as_slice();
        let result = if extendable {
            let rows = items.iter().map(|i| i.cells(&headings)).collect();
            self.table.extend_data(rows, items)
        } else {
            self.rebuild(kind == LoadKind::More)
        };
        if let Err(e) = result {
            cx.error(e.to_string());
        }
    }

    /// Re-project the buffer through the local filter.
    fn rebuild(&mut self, keep_selection: bool) -> Result<(), UiError> {
        let previous = self.table.selected();
        let all = self.source.items();
        let visible: Vec<T> = if self.filter.trim().is_empty() {
            all
        } else {
            let keys: Vec<String> = all.iter().map(T::search_key).collect();
            self.fuzzy
                .rank(&keys, &self.filter)
                .into_iter()
                .map(|m| all[m.index].clone())
                .collect()
        };
        self.table.populate(&visible, &self.lead)?;
        if self.filter.trim().is_empty() {
            self.table.clear_search_highlights();
        } else {
            let filter = self.filter.clone();
            self.table.search_text(&[], &filter);
        }
        if let (true, Some(row)) = (keep_selection, previous) {
            self.table.select(row, self.table.model().selected_col());
        }
        Ok(())
    }

    fn handle_prompt_key(&mut self, key: &KeyBinding, cx: &mut EventCx) -> TableEvent {
        let Some(prompt) = self.prompt.as_mut() else {
            return TableEvent::Ignored;
        };
        match key.key {
            KeyName::Esc => {
                self.prompt = None;
                self.filter.clear();
                if let Err(e) = self.rebuild(false) {
                    cx.error(e.to_string());
                }
            }
            KeyName::Enter => {
                let text = prompt.text().trim().to_string();
                self.prompt = None;
                if let Some(search) = self.remote {
                    let params = search(&self.source.params(), &text);
                    self.set_key(params);
                    self.refresh(true, cx);
                }
            }
            _ => {
                if prompt.handle_key(key) && self.remote.is_none() {
                    self.filter = prompt.text().to_string();
                    if let Err(e) = self.rebuild(false) {
                        cx.error(e.to_string());
                    }
                }
            }
        }
        TableEvent::Consumed
    }

    pub fn handle_key(&mut self, key: &KeyBinding, cx: &mut EventCx) -> TableEvent {
        if self.prompt.is_some() {
            return self.handle_prompt_key(key, cx);
        }
        if cx.is(Action::Find, key) {
            self.prompt = Some(LineInput::new(&self.filter));
            return TableEvent::Consumed;
        }
        let event = self.table.handle_key(key, cx);
        if event.handled() {
            return event;
        }
        if cx.is(Action::Reload, key) {
            self.refresh(true, cx);
            TableEvent::Consumed
        } else if cx.is(Action::LoadMore, key) {
            self.load_more(cx);
            TableEvent::Consumed
        } else if cx.is(Action::Copy, key) {
            self.table.copy_selected(cx);
            TableEvent::Consumed
        } else {
            TableEvent::Ignored
        }
    }

    /// Title with row count, a `+` while more pages exist, and the loader
    /// state.
    pub fn title(&self) -> String {
        let more = if self.source.has_more() && self.source.pages() > 0 {
            "+"
        } else {
            ""
        };
        let base = format!("{} ({}{more})", self.title, self.table.model().len());
        self.loader.title(&base)
    }

    pub fn status(&self) -> String {
        format!(
            "{} loaded, {} page(s){}",
            self.source.len(),
            self.source.pages(),
            if self.source.has_more() { ", more" } else { "" }
        )
    }

    pub fn render(&mut self, frame: &mut Frame, area: Rect, focused: bool) {
        let title = self.title();
        let (table_area, prompt_area) = match self.prompt {
            Some(_) => {
                let [t, p] =
                    Layout::vertical([Constraint::Min(3), Constraint::Length(1)]).areas(area);
                (t, Some(p))
            }
            None => (area, None),
        };
        self.table.render(frame, table_area, &title, focused);
        self.loader.render_throbber(frame, table_area);
        if let (Some(prompt), Some(area)) = (self.prompt.as_ref(), prompt_area) {
            let label = if self.remote.is_some() { "search: " } else { "/" };
            prompt.render(frame, area, label, true);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::test_support;
    use futures::FutureExt;
    use skyview_core::gateway::Page;
    use skyview_core::resource::Bucket;
    use std::time::Duration;

    fn bucket(name: &str) -> Bucket {
        Bucket {
            name: name.into(),
            region: "us-east-1".into(),
            created: None,
        }
    }

    fn source(prefix: &str) -> PaginatorSource<String, Bucket> {
        let all: Vec<Bucket> = ["alpha-logs", "beta-assets", "gamma-logs", "delta"]
            .iter()
            .map(|n| bucket(n))
            .collect();
        PaginatorSource::new("buckets", prefix.to_string(), move |prefix: String, cursor| {
            let matching: Vec<Bucket> =
                all.iter().filter(|b| b.name.starts_with(&prefix)).cloned().collect();
            async move { Ok(Page::from_slice(&matching, 2, cursor.as_deref())) }.boxed()
        })
    }

    async fn settle(table: &mut PagedTable<String, Bucket>, cx: &mut EventCx) {
        for _ in 0..200 {
            if table.tick(cx, Instant::now()) || (!table.is_loading()) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
    }

    #[tokio::test]
    async fn test_reset_then_load_more() {
        let mut cx = EventCx::new(test_support::context());
        let mut table = PagedTable::new("Buckets", source(""), &cx);
        table.refresh(true, &cx);
        settle(&mut table, &mut cx).await;
        assert_eq!(table.table().model().len(), 2);
        assert_eq!(table.title(), "Buckets (2+)");

        table.handle_key(&KeyBinding::ch('n'), &mut cx);
        settle(&mut table, &mut cx).await;
        assert_eq!(table.table().model().len(), 4);
        assert_eq!(table.title(), "Buckets (4)");
        assert!(!table.load_more(&cx));
    }

    #[tokio::test]
    async fn test_local_fuzzy_filter() {
        let mut cx = EventCx::new(test_support::context());
        let mut table = PagedTable::new("Buckets", source(""), &cx);
        table.refresh(true, &cx);
        settle(&mut table, &mut cx).await;
        table.load_more(&cx);
        settle(&mut table, &mut cx).await;

        table.handle_key(&KeyBinding::ch('/'), &mut cx);
        for c in "logs".chars() {
            table.handle_key(&KeyBinding::ch(c), &mut cx);
        }
        let names: Vec<&str> = table
            .table()
            .model()
            .payloads()
            .iter()
            .map(|b| b.name.as_str())
            .collect();
        assert_eq!(names, vec!["alpha-logs", "gamma-logs"]);
        assert!(table.table().model().has_highlights());

        table.handle_key(&KeyBinding::plain(KeyName::Esc), &mut cx);
        assert_eq!(table.table().model().len(), 4);
    }

    #[tokio::test]
    async fn test_remote_search_requeries() {
        let mut cx = EventCx::new(test_support::context());
        let mut table = PagedTable::new("Buckets", source(""), &cx)
            .with_remote_search(|_, text| text.to_string());
        table.handle_key(&KeyBinding::ch('/'), &mut cx);
        for c in "gam".chars() {
            table.handle_key(&KeyBinding::ch(c), &mut cx);
        }
        table.handle_key(&KeyBinding::plain(KeyName::Enter), &mut cx);
        settle(&mut table, &mut cx).await;
        assert_eq!(table.params(), "gam");
        assert_eq!(table.table().model().len(), 1);
        assert_eq!(table.selected().map(|b| b.name.as_str()), Some("gamma-logs"));
    }

    #[tokio::test]
    async fn test_cancelled_load_keeps_table_empty() {
        let ctx = test_support::context();
        let mut cx = EventCx::new(ctx.clone());
        let slow = PaginatorSource::new("slow", String::new(), |_: String, _| {
            async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(Page::last(vec![bucket("late")]))
            }
            .boxed()
        });
        let mut table = PagedTable::new("Buckets", slow, &cx);
        table.refresh(true, &cx);
        ctx.switch_profile(Some("staging".into())).unwrap();
        settle(&mut table, &mut cx).await;
        assert!(table.table().model().is_empty());
        assert!(table.title().ends_with("[Cancelled]"));
    }

    #[tokio::test]
    async fn test_load_more_after_profile_switch_starts_over() {
        let ctx = test_support::context();
        let mut cx = EventCx::new(ctx.clone());
        let all = vec![bucket("a"), bucket("b"), bucket("c")];
        let tracked = PaginatorSource::tracked(
            "buckets",
            String::new(),
            ctx.generation(),
            move |_: String, cursor| {
                let all = all.clone();
                async move { Ok(Page::from_slice(&all, 2, cursor.as_deref())) }.boxed()
            },
        );
        let mut table = PagedTable::new("Buckets", tracked, &cx);
        table.refresh(true, &cx);
        settle(&mut table, &mut cx).await;
        assert_eq!(table.table().model().len(), 2);

        ctx.switch_profile(Some("staging".into())).unwrap();
        assert!(table.load_more(&cx));
        settle(&mut table, &mut cx).await;
        let names: Vec<&str> = table
            .table()
            .model()
            .payloads()
            .iter()
            .map(|b| b.name.as_str())
            .collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(table.source().len(), 2);
    }
}
