//! CloudWatch Logs: groups and streams, events, and Insights.

use std::collections::BTreeSet;
use std::time::Instant;

use chrono::Duration;
use ratatui::Frame;
use ratatui::layout::{Constraint, Layout, Rect};
use tracing::{debug, info};

use skyview_core::config::LoaderConfig;
use skyview_core::drill::{DrillKey, PageKind, PaneKind, Selection};
use skyview_core::error::UiError;
use skyview_core::gateway::LogEventsFilter;
use skyview_core::keymap::{Action, KeyBinding};
use skyview_core::query::{QueryError, QueryParams, QueryRunner};
use skyview_core::resource::{InsightsRow, LogEvent, LogGroup, LogStream};

use crate::loader::{LoadOutcome, UiDataLoader};
use crate::services::{ListWithDetails, nothing, outcome, paged_source};
use crate::ui::component::{EventCx, KeyOutcome};
use crate::ui::form::{Form, FormEvent};
use crate::ui::page::{PageBody, split_areas};
use crate::ui::paged::PagedTable;
use crate::ui::table::{SelectableTable, TableEvent};
use crate::ui::textarea::{Mode, TextArea};

pub fn pages(cx: &EventCx) -> Vec<Box<dyn PageBody>> {
    vec![
        Box::new(LogGroupsPage::new(cx)),
        Box::new(LogEventsPage::new(cx)),
        Box::new(InsightsPage::new(cx)),
    ]
}

fn groups_table(cx: &EventCx) -> PagedTable<String, LogGroup> {
    let source = paged_source(
        cx,
        "log_groups",
        String::new(),
        |bundle, prefix: String, limit, cursor| async move {
            bundle.logs.list_log_groups(&prefix, limit, cursor).await
        },
    );
    PagedTable::new("Log Groups", source, cx).with_remote_search(|_, text| text.to_string())
}

// ============================================================================
// Log groups
// ============================================================================

struct LogGroupsPage {
    groups: PagedTable<String, LogGroup>,
    streams: PagedTable<String, LogStream>,
}

impl LogGroupsPage {
    fn new(cx: &EventCx) -> Self {
        let source = paged_source(
            cx,
            "log_streams",
            String::new(),
            |bundle, group: String, limit, cursor| async move {
                if group.is_empty() {
                    return nothing();
                }
                bundle.logs.list_log_streams(&group, limit, cursor).await
            },
        );
        Self {
            groups: groups_table(cx),
            streams: PagedTable::new("Log Streams", source, cx),
        }
    }
}

impl PageBody for LogGroupsPage {
    fn kind(&self) -> PageKind {
        PageKind::LogGroups
    }

    fn panes(&self) -> Vec<PaneKind> {
        vec![PaneKind::LogGroups, PaneKind::LogStreams]
    }

    fn handle_key(&mut self, pane: PaneKind, key: &KeyBinding, cx: &mut EventCx) -> KeyOutcome {
        match pane {
            PaneKind::LogGroups => {
                let event = self.groups.handle_key(key, cx);
                if let (TableEvent::Selected(_), Some(group)) = (event, self.groups.selected()) {
                    cx.drill(Selection::LogGroup(group.clone()));
                }
                outcome(event)
            }
            PaneKind::LogStreams => {
                let event = self.streams.handle_key(key, cx);
                if let (TableEvent::Selected(_), Some(stream)) = (event, self.streams.selected()) {
                    cx.drill(Selection::LogStream(stream.clone()));
                }
                outcome(event)
            }
            _ => KeyOutcome::Ignored,
        }
    }

    fn tick(&mut self, cx: &mut EventCx, now: Instant) {
        self.groups.tick(cx, now);
        self.streams.tick(cx, now);
    }

    fn render(&mut self, frame: &mut Frame, area: Rect, focus: PaneKind, split: u16) {
        let [left, right] = split_areas(area, split, false);
        self.groups.render(frame, left, focus == PaneKind::LogGroups);
        self.streams.render(frame, right, focus == PaneKind::LogStreams);
    }

    fn configure(&mut self, pane: PaneKind, key: &DrillKey, _: &EventCx) -> bool {
        match (pane, key) {
            (PaneKind::LogStreams, DrillKey::LogGroup { group }) => {
                self.streams.set_title(&format!("Log Streams: {group}"));
                self.streams.set_key(group.clone());
                true
            }
            _ => false,
        }
    }

    fn refresh(&mut self, pane: PaneKind, reset: bool, cx: &EventCx) {
        match pane {
            PaneKind::LogGroups => self.groups.refresh(reset, cx),
            PaneKind::LogStreams => self.streams.refresh(reset, cx),
            _ => {}
        }
    }

    fn activate(&mut self, cx: &EventCx) {
        self.groups.refresh(true, cx);
    }

    fn status(&self, pane: PaneKind) -> String {
        match pane {
            PaneKind::LogStreams => self.streams.status(),
            _ => self.groups.status(),
        }
    }

    fn is_capturing(&self) -> bool {
        self.groups.is_filtering() || self.streams.is_filtering()
    }
}

// ============================================================================
// Log events
// ============================================================================

struct LogEventsPage {
    view: ListWithDetails<LogEventsFilter, LogEvent>,
}

impl LogEventsPage {
    fn new(cx: &EventCx) -> Self {
        let source = paged_source(
            cx,
            "log_events",
            LogEventsFilter::default(),
            |bundle, filter: LogEventsFilter, limit, cursor| async move {
                if filter.group.is_empty() {
                    return nothing();
                }
                bundle.logs.filter_log_events(&filter, limit, cursor).await
            },
        );
        let events = PagedTable::new("Log Events", source, cx).with_remote_search(|filter, text| {
            LogEventsFilter {
                pattern: text.to_string(),
                ..filter.clone()
            }
        });
        Self {
            view: ListWithDetails::new(events, PaneKind::LogEvents, PaneKind::EventDetails)
                .describe_with(|event| event.message.clone()),
        }
    }
}

impl PageBody for LogEventsPage {
    fn kind(&self) -> PageKind {
        PageKind::LogEvents
    }

    fn panes(&self) -> Vec<PaneKind> {
        self.view.panes()
    }

    fn handle_key(&mut self, pane: PaneKind, key: &KeyBinding, cx: &mut EventCx) -> KeyOutcome {
        self.view.handle_key(pane, key, cx)
    }

    fn tick(&mut self, cx: &mut EventCx, now: Instant) {
        self.view.tick(cx, now);
    }

    fn render(&mut self, frame: &mut Frame, area: Rect, focus: PaneKind, split: u16) {
        self.view.render(frame, area, focus, split);
    }

    fn configure(&mut self, pane: PaneKind, key: &DrillKey, _: &EventCx) -> bool {
        match (pane, key) {
            (PaneKind::LogEvents, DrillKey::LogStream { group, stream }) => {
                self.view.list.set_title(&format!("Log Events: {stream}"));
                self.view.list.set_key(LogEventsFilter {
                    group: group.clone(),
                    stream: Some(stream.clone()),
                    pattern: String::new(),
                });
                true
            }
            _ => false,
        }
    }

    fn refresh(&mut self, pane: PaneKind, reset: bool, cx: &EventCx) {
        if pane == PaneKind::LogEvents {
            self.view.list.refresh(reset, cx);
        }
    }

    fn status(&self, _: PaneKind) -> String {
        let filter = self.view.list.params();
        match filter.pattern.as_str() {
            "" => self.view.status(),
            pattern => format!("{} · pattern \"{pattern}\"", self.view.status()),
        }
    }

    fn is_capturing(&self) -> bool {
        self.view.list.is_filtering()
    }
}

// ============================================================================
// Insights
// ============================================================================

const DEFAULT_QUERY: &str =
    "fields @timestamp, @message, @logStream, @log\n| sort @timestamp desc\n| limit 100";
const DEFAULT_LIMIT: usize = 100;
const DEFAULT_WINDOW: usize = 2;

const WINDOWS: [(&str, i64); 8] = [
    ("5m", 5),
    ("15m", 15),
    ("1h", 60),
    ("3h", 180),
    ("12h", 720),
    ("1d", 1_440),
    ("3d", 4_320),
    ("1w", 10_080),
];

struct InsightsPage {
    groups: PagedTable<String, LogGroup>,
    selected: BTreeSet<String>,
    query: TextArea,
    results: SelectableTable<InsightsRow>,
    loader: UiDataLoader<Result<Vec<InsightsRow>, QueryError>>,
    runner: Option<QueryRunner>,
    window: usize,
    limit: usize,
    form: Option<Form>,
}

impl InsightsPage {
    fn new(cx: &EventCx) -> Self {
        let insights = &cx.ctx.config.insights;
        let polling_ms = insights.poll_interval_ms * u64::from(insights.max_polls);
        let loader = LoaderConfig {
            timeout_ms: cx.ctx.config.loader.timeout_ms.max(polling_ms + 5_000),
            ..cx.ctx.config.loader.clone()
        };
        let mut query = TextArea::editable("Query");
        query.set_text(DEFAULT_QUERY);
        Self {
            groups: groups_table(cx),
            selected: BTreeSet::new(),
            query,
            results: SelectableTable::new(Vec::new()),
            loader: UiDataLoader::new("insights", &loader),
            runner: None,
            window: DEFAULT_WINDOW,
            limit: DEFAULT_LIMIT,
            form: None,
        }
    }

    fn toggle_selected(&mut self) {
        let Some(name) = self.groups.selected().map(|g| g.name.clone()) else {
            return;
        };
        if !self.selected.remove(&name) {
            self.selected.insert(name);
        }
        self.groups
            .set_title(&format!("Log Groups [{} selected]", self.selected.len()));
    }

    fn open_form(&mut self) {
        let labels: Vec<&str> = WINDOWS.iter().map(|(label, _)| *label).collect();
        self.form = Some(
            Form::new("Time range")
                .choice("Last", &labels, self.window)
                .text("Limit", &self.limit.to_string()),
        );
    }

    fn submit_form(&mut self, cx: &mut EventCx) {
        let Some(form) = &self.form else {
            return;
        };
        let limit = match form.value("Limit").trim().parse::<usize>() {
            Ok(limit) if limit > 0 => limit,
            _ => {
                cx.error(UiError::option("Limit must be a positive number").to_string());
                return;
            }
        };
        self.window = WINDOWS
            .iter()
            .position(|(label, _)| *label == form.value("Last"))
            .unwrap_or(DEFAULT_WINDOW);
        self.limit = limit;
        self.form = None;
    }

    fn stop_in_background(&mut self) {
        if let Some(runner) = self.runner.take() {
            if tokio::runtime::Handle::try_current().is_ok() {
                tokio::spawn(async move { runner.stop().await });
            }
        }
    }

    fn run(&mut self, cx: &mut EventCx) {
        self.stop_in_background();
        let groups: Vec<String> = self.selected.iter().cloned().collect();
        let (_, minutes) = WINDOWS[self.window];
        let params = QueryParams::last(&self.query.text(), Duration::minutes(minutes), self.limit);
        let runner = QueryRunner::new(
            cx.ctx.bundle().insights.clone(),
            cx.ctx.config.insights.poll_policy(),
        );
        info!(groups = groups.len(), window = WINDOWS[self.window].0, "running insights query");
        self.runner = Some(runner.clone());
        self.loader.load_async(
            async move { runner.execute(params, groups).await },
            cx.ctx.cancellation(),
            cx.ctx.redraw.clone(),
        );
    }

    fn query_status(&self) -> String {
        self.runner
            .as_ref()
            .map(|r| r.status().to_string())
            .unwrap_or_else(|| "IDLE".to_string())
    }
}

impl PageBody for InsightsPage {
    fn kind(&self) -> PageKind {
        PageKind::Insights
    }

    fn panes(&self) -> Vec<PaneKind> {
        vec![
            PaneKind::InsightsGroups,
            PaneKind::InsightsQuery,
            PaneKind::InsightsResults,
        ]
    }

    fn handle_key(&mut self, pane: PaneKind, key: &KeyBinding, cx: &mut EventCx) -> KeyOutcome {
        if let Some(form) = self.form.as_mut() {
            match form.handle_key(key, cx.keymap()) {
                FormEvent::Submitted => self.submit_form(cx),
                FormEvent::Cancelled => self.form = None,
                FormEvent::Consumed => {}
            }
            return KeyOutcome::Consumed;
        }

        let result = match pane {
            PaneKind::InsightsGroups => {
                if !self.groups.is_filtering() && cx.is(Action::ToggleSelect, key) {
                    self.toggle_selected();
                    KeyOutcome::Consumed
                } else {
                    let event = self.groups.handle_key(key, cx);
                    if let TableEvent::Selected(_) = event {
                        self.toggle_selected();
                    }
                    outcome(event)
                }
            }
            PaneKind::InsightsQuery => self.query.handle_key(key, cx),
            PaneKind::InsightsResults => {
                let event = self.results.handle_key(key, cx);
                if let (TableEvent::Selected(_), Some(row)) = (event, self.results.selected_payload())
                {
                    cx.drill(Selection::InsightsRow(row.clone()));
                }
                if !event.handled() && cx.is(Action::Copy, key) {
                    self.results.copy_selected(cx);
                    KeyOutcome::Consumed
                } else {
                    outcome(event)
                }
            }
            _ => KeyOutcome::Ignored,
        };
        if result.consumed() {
            return result;
        }
        if cx.is(Action::RunQuery, key) {
            self.run(cx);
            KeyOutcome::Consumed
        } else if cx.is(Action::TimeRange, key) {
            self.open_form();
            KeyOutcome::Consumed
        } else {
            KeyOutcome::Ignored
        }
    }

    fn tick(&mut self, cx: &mut EventCx, now: Instant) {
        self.groups.tick(cx, now);
        if self.loader.spin(now) {
            cx.mark_dirty();
        }
        match self.loader.poll() {
            Some(LoadOutcome::Done(Ok(rows))) => {
                debug!(rows = rows.len(), "insights results");
                if let Err(e) = self.results.populate(&rows, &[]) {
                    cx.error(e.to_string());
                }
            }
            Some(LoadOutcome::Done(Err(e))) => cx.error(e.to_string()),
            Some(LoadOutcome::Failed(reason)) => cx.error(reason),
            Some(LoadOutcome::TimedOut | LoadOutcome::Cancelled) => self.stop_in_background(),
            None => return,
        }
        cx.mark_dirty();
    }

    fn render(&mut self, frame: &mut Frame, area: Rect, focus: PaneKind, split: u16) {
        let [left, right] = split_areas(area, split, false);
        let [query_area, results_area] =
            Layout::vertical([Constraint::Percentage(35), Constraint::Min(3)]).areas(right);
        self.groups
            .render(frame, left, focus == PaneKind::InsightsGroups);
        self.query
            .render(frame, query_area, focus == PaneKind::InsightsQuery);
        let title = self.loader.title(&format!(
            "Results ({}) · last {} · {}",
            self.results.model().len(),
            WINDOWS[self.window].0,
            self.query_status()
        ));
        self.results
            .render(frame, results_area, &title, focus == PaneKind::InsightsResults);
        self.loader.render_throbber(frame, results_area);
        if let Some(form) = &self.form {
            form.render(frame, area);
        }
    }

    fn configure(&mut self, _: PaneKind, _: &DrillKey, _: &EventCx) -> bool {
        false
    }

    fn refresh(&mut self, pane: PaneKind, reset: bool, cx: &EventCx) {
        if pane == PaneKind::InsightsGroups {
            self.groups.refresh(reset, cx);
        }
    }

    fn activate(&mut self, cx: &EventCx) {
        self.groups.refresh(true, cx);
    }

    fn status(&self, _: PaneKind) -> String {
        format!(
            "{} group(s) · last {} · limit {} · {}",
            self.selected.len(),
            WINDOWS[self.window].0,
            self.limit,
            self.query_status()
        )
    }

    fn is_capturing(&self) -> bool {
        self.form.is_some() || self.groups.is_filtering() || self.query.mode() == Mode::Insert
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::testing::{cx, settle};
    use skyview_core::keymap::KeyName;

    #[tokio::test]
    async fn test_stream_drill_target() {
        let mut cx = cx();
        let mut page = LogGroupsPage::new(&cx);
        let key = DrillKey::LogGroup {
            group: "/ecs/web".into(),
        };
        assert!(page.configure(PaneKind::LogStreams, &key, &cx));
        assert!(!page.configure(PaneKind::LogGroups, &key, &cx));
        page.refresh(PaneKind::LogStreams, true, &cx);
        settle(&mut page, &mut cx, |p| p.streams.selected().is_some()).await;

        page.handle_key(PaneKind::LogStreams, &KeyBinding::plain(KeyName::Enter), &mut cx);
        let effects = cx.take_effects();
        assert!(matches!(
            effects.as_slice(),
            [crate::ui::component::Effect::Drill(Selection::LogStream(s))] if s.group == "/ecs/web"
        ));
    }

    #[tokio::test]
    async fn test_events_remote_pattern() {
        let mut cx = cx();
        let mut page = LogEventsPage::new(&cx);
        let mut streams = cx
            .ctx
            .bundle()
            .logs
            .list_log_streams("/ecs/web", 1, None)
            .await
            .unwrap();
        let stream = streams.items.remove(0);
        let key = DrillKey::LogStream {
            group: stream.group,
            stream: stream.name,
        };
        assert!(page.configure(PaneKind::LogEvents, &key, &cx));
        page.refresh(PaneKind::LogEvents, true, &cx);
        settle(&mut page, &mut cx, |p| p.view.list.table().model().len() == 30).await;

        for key in [KeyBinding::ch('/'), KeyBinding::ch('w'), KeyBinding::ch('a')] {
            page.handle_key(PaneKind::LogEvents, &key, &mut cx);
        }
        page.handle_key(PaneKind::LogEvents, &KeyBinding::ch('r'), &mut cx);
        page.handle_key(PaneKind::LogEvents, &KeyBinding::ch('n'), &mut cx);
        page.handle_key(PaneKind::LogEvents, &KeyBinding::plain(KeyName::Enter), &mut cx);
        assert_eq!(page.view.list.params().pattern, "warn");
        settle(&mut page, &mut cx, |p| {
            !p.view.list.is_loading() && p.view.list.table().model().len() < 30
        })
        .await;
        assert!(page.status(PaneKind::LogEvents).contains("pattern \"warn\""));
    }

    #[tokio::test]
    async fn test_insights_requires_a_group() {
        let mut cx = cx();
        let mut page = InsightsPage::new(&cx);
        page.handle_key(PaneKind::InsightsQuery, &KeyBinding::ctrl('e'), &mut cx);
        settle(&mut page, &mut cx, |p| !p.loader.is_loading()).await;
        assert_eq!(
            cx.take_messages()[0].1,
            "MISSING_REQUIRED_INPUT: Log group not selected"
        );
    }

    #[tokio::test]
    async fn test_insights_query_and_drill() {
        let mut cx = cx();
        let mut page = InsightsPage::new(&cx);
        page.activate(&cx);
        settle(&mut page, &mut cx, |p| p.groups.selected().is_some()).await;
        page.handle_key(PaneKind::InsightsGroups, &KeyBinding::plain(KeyName::Space), &mut cx);
        assert_eq!(page.selected.len(), 1);

        page.handle_key(PaneKind::InsightsQuery, &KeyBinding::ctrl('e'), &mut cx);
        settle(&mut page, &mut cx, |p| !p.results.model().is_empty()).await;
        assert!(page.status(PaneKind::InsightsResults).ends_with("COMPLETE"));
        assert_eq!(
            page.results.model().headings(),
            &["@timestamp", "@message", "@logStream", "@log"]
        );

        page.handle_key(PaneKind::InsightsResults, &KeyBinding::plain(KeyName::Enter), &mut cx);
        let effects = cx.take_effects();
        assert!(matches!(
            effects.as_slice(),
            [crate::ui::component::Effect::Drill(Selection::InsightsRow(_))]
        ));
    }

    #[tokio::test]
    async fn test_insights_query_without_matches() {
        let mut cx = cx();
        let mut page = InsightsPage::new(&cx);
        page.activate(&cx);
        settle(&mut page, &mut cx, |p| p.groups.selected().is_some()).await;
        page.handle_key(PaneKind::InsightsGroups, &KeyBinding::plain(KeyName::Space), &mut cx);
        page.query
            .set_text("fields @timestamp, @message | filter @message like /no-such-text/");

        page.handle_key(PaneKind::InsightsQuery, &KeyBinding::ctrl('e'), &mut cx);
        assert!(page.loader.is_loading());
        settle(&mut page, &mut cx, |p| !p.loader.is_loading()).await;
        assert!(page.results.model().is_empty());
        assert!(page.results.model().headings().is_empty());
        assert!(
            cx.take_messages()
                .iter()
                .all(|(_, text)| !text.contains("INVALID_DATA_DIMENTIONS"))
        );
    }

    #[tokio::test]
    async fn test_time_range_form() {
        let mut cx = cx();
        let mut page = InsightsPage::new(&cx);
        page.handle_key(PaneKind::InsightsGroups, &KeyBinding::ch('t'), &mut cx);
        assert!(page.is_capturing());
        page.handle_key(PaneKind::InsightsGroups, &KeyBinding::plain(KeyName::Right), &mut cx);
        page.handle_key(PaneKind::InsightsGroups, &KeyBinding::plain(KeyName::Tab), &mut cx);
        for _ in 0..3 {
            page.handle_key(
                PaneKind::InsightsGroups,
                &KeyBinding::plain(KeyName::Backspace),
                &mut cx,
            );
        }
        page.handle_key(PaneKind::InsightsGroups, &KeyBinding::ch('0'), &mut cx);
        page.handle_key(PaneKind::InsightsGroups, &KeyBinding::plain(KeyName::Enter), &mut cx);
        assert!(cx.take_messages()[0].1.contains("Limit must be a positive number"));
        assert!(page.form.is_some());

        page.handle_key(PaneKind::InsightsGroups, &KeyBinding::plain(KeyName::Backspace), &mut cx);
        page.handle_key(PaneKind::InsightsGroups, &KeyBinding::ch('5'), &mut cx);
        page.handle_key(PaneKind::InsightsGroups, &KeyBinding::plain(KeyName::Enter), &mut cx);
        assert!(page.form.is_none());
        assert_eq!(page.limit, 5);
        assert_eq!(WINDOWS[page.window].0, "3h");
    }
}
