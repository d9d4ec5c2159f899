//! CloudWatch alarms and metrics.

use std::time::Instant;

use ratatui::Frame;
use ratatui::layout::Rect;

use skyview_core::drill::{DrillKey, PageKind, PaneKind};
use skyview_core::keymap::KeyBinding;
use skyview_core::resource::{Alarm, MetricSummary};

use crate::services::{ListWithDetails, outcome, paged_source};
use crate::ui::component::{EventCx, KeyOutcome};
use crate::ui::page::PageBody;
use crate::ui::paged::PagedTable;

pub fn pages(cx: &EventCx) -> Vec<Box<dyn PageBody>> {
    vec![Box::new(AlarmsPage::new(cx)), Box::new(MetricsPage::new(cx))]
}

struct AlarmsPage {
    view: ListWithDetails<(), Alarm>,
}

impl AlarmsPage {
    fn new(cx: &EventCx) -> Self {
        let source = paged_source(cx, "alarms", (), |bundle, (), limit, cursor| async move {
            bundle.cloudwatch.list_alarms(limit, cursor).await
        });
        Self {
            view: ListWithDetails::new(
                PagedTable::new("Alarms", source, cx),
                PaneKind::Alarms,
                PaneKind::AlarmDetails,
            ),
        }
    }
}

impl PageBody for AlarmsPage {
    fn kind(&self) -> PageKind {
        PageKind::Alarms
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

    fn configure(&mut self, _: PaneKind, _: &DrillKey, _: &EventCx) -> bool {
        false
    }

    fn refresh(&mut self, pane: PaneKind, reset: bool, cx: &EventCx) {
        if pane == PaneKind::Alarms {
            self.view.list.refresh(reset, cx);
        }
    }

    fn activate(&mut self, cx: &EventCx) {
        self.view.list.refresh(true, cx);
    }

    fn status(&self, _: PaneKind) -> String {
        self.view.status()
    }

    fn is_capturing(&self) -> bool {
        self.view.list.is_filtering()
    }
}

/// Metrics by namespace; `/` searches a namespace, an empty one lists all.
struct MetricsPage {
    metrics: PagedTable<String, MetricSummary>,
}

impl MetricsPage {
    fn new(cx: &EventCx) -> Self {
        let source = paged_source(
            cx,
            "metrics",
            String::new(),
            |bundle, namespace: String, limit, cursor| async move {
                bundle.cloudwatch.list_metrics(&namespace, limit, cursor).await
            },
        );
        Self {
            metrics: PagedTable::new("Metrics", source, cx)
                .with_remote_search(|_, text| text.to_string()),
        }
    }
}

impl PageBody for MetricsPage {
    fn kind(&self) -> PageKind {
        PageKind::Metrics
    }

    fn panes(&self) -> Vec<PaneKind> {
        vec![PaneKind::Metrics]
    }

    fn handle_key(&mut self, pane: PaneKind, key: &KeyBinding, cx: &mut EventCx) -> KeyOutcome {
        if pane != PaneKind::Metrics {
            return KeyOutcome::Ignored;
        }
        outcome(self.metrics.handle_key(key, cx))
    }

    fn tick(&mut self, cx: &mut EventCx, now: Instant) {
        self.metrics.tick(cx, now);
    }

    fn render(&mut self, frame: &mut Frame, area: Rect, focus: PaneKind, _: u16) {
        self.metrics.render(frame, area, focus == PaneKind::Metrics);
    }

    fn configure(&mut self, _: PaneKind, _: &DrillKey, _: &EventCx) -> bool {
        false
    }

    fn refresh(&mut self, _: PaneKind, reset: bool, cx: &EventCx) {
        self.metrics.refresh(reset, cx);
    }

    fn activate(&mut self, cx: &EventCx) {
        self.metrics.refresh(true, cx);
    }

    fn status(&self, _: PaneKind) -> String {
        match self.metrics.params().as_str() {
            "" => self.metrics.status(),
            namespace => format!("{namespace} · {}", self.metrics.status()),
        }
    }

    fn is_capturing(&self) -> bool {
        self.metrics.is_filtering()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::testing::{cx, settle};
    use skyview_core::keymap::KeyName;

    #[tokio::test]
    async fn test_alarm_details_show_reason() {
        let mut cx = cx();
        let mut page = AlarmsPage::new(&cx);
        page.activate(&cx);
        settle(&mut page, &mut cx, |p| p.view.list.selected().is_some()).await;
        assert!(page.view.details.text().contains("Threshold Crossed"));
        assert!(!page.configure(
            PaneKind::Alarms,
            &DrillKey::Table { name: "t".into() },
            &cx
        ));
    }

    #[tokio::test]
    async fn test_metrics_namespace_search() {
        let mut cx = cx();
        let mut page = MetricsPage::new(&cx);
        page.handle_key(PaneKind::Metrics, &KeyBinding::ch('/'), &mut cx);
        for c in "AWS/DynamoDB".chars() {
            page.handle_key(PaneKind::Metrics, &KeyBinding::ch(c), &mut cx);
        }
        page.handle_key(PaneKind::Metrics, &KeyBinding::plain(KeyName::Enter), &mut cx);
        settle(&mut page, &mut cx, |p| !p.metrics.table().model().is_empty()).await;

        assert_eq!(page.metrics.table().model().len(), 8);
        assert!(
            page.metrics
                .table()
                .model()
                .payloads()
                .iter()
                .all(|m| m.namespace == "AWS/DynamoDB")
        );
        assert!(page.status(PaneKind::Metrics).starts_with("AWS/DynamoDB · 8 loaded"));
    }
}
