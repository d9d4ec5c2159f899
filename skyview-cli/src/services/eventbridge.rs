//! EventBridge buses and their rules.

use std::time::Instant;

use ratatui::Frame;
use ratatui::layout::Rect;

use skyview_core::drill::{DrillKey, PageKind, PaneKind, Selection};
use skyview_core::keymap::KeyBinding;
use skyview_core::resource::{EventBus, EventRule};

use crate::services::{ListWithDetails, nothing, outcome, paged_source};
use crate::ui::component::{EventCx, KeyOutcome};
use crate::ui::page::{PageBody, split_areas};
use crate::ui::paged::PagedTable;
use crate::ui::table::TableEvent;

pub fn pages(cx: &EventCx) -> Vec<Box<dyn PageBody>> {
    vec![Box::new(EventBusesPage::new(cx))]
}

/// Rules show their event pattern, or the whole rule for schedules.
fn describe_rule(rule: &EventRule) -> String {
    match &rule.pattern {
        Some(pattern) => pattern.clone(),
        None => serde_json::to_string(rule).unwrap_or_default(),
    }
}

struct EventBusesPage {
    buses: PagedTable<(), EventBus>,
    rules: ListWithDetails<String, EventRule>,
}

impl EventBusesPage {
    fn new(cx: &EventCx) -> Self {
        let buses = paged_source(cx, "event_buses", (), |bundle, (), limit, cursor| async move {
            bundle.events.list_event_buses(limit, cursor).await
        });
        let rules = paged_source(
            cx,
            "rules",
            String::new(),
            |bundle, bus: String, limit, cursor| async move {
                if bus.is_empty() {
                    return nothing();
                }
                bundle.events.list_rules(&bus, limit, cursor).await
            },
        );
        Self {
            buses: PagedTable::new("Event Buses", buses, cx),
            rules: ListWithDetails::new(
                PagedTable::new("Rules", rules, cx),
                PaneKind::Rules,
                PaneKind::RuleDetails,
            )
            .describe_with(describe_rule),
        }
    }
}

impl PageBody for EventBusesPage {
    fn kind(&self) -> PageKind {
        PageKind::EventBuses
    }

    fn panes(&self) -> Vec<PaneKind> {
        vec![PaneKind::EventBuses, PaneKind::Rules, PaneKind::RuleDetails]
    }

    fn handle_key(&mut self, pane: PaneKind, key: &KeyBinding, cx: &mut EventCx) -> KeyOutcome {
        if self.rules.owns(pane) {
            return self.rules.handle_key(pane, key, cx);
        }
        if pane != PaneKind::EventBuses {
            return KeyOutcome::Ignored;
        }
        let event = self.buses.handle_key(key, cx);
        if let (TableEvent::Selected(_), Some(bus)) = (event, self.buses.selected()) {
            cx.drill(Selection::EventBus(bus.clone()));
        }
        outcome(event)
    }

    fn tick(&mut self, cx: &mut EventCx, now: Instant) {
        self.buses.tick(cx, now);
        self.rules.tick(cx, now);
    }

    fn render(&mut self, frame: &mut Frame, area: Rect, focus: PaneKind, split: u16) {
        let [top, bottom] = split_areas(area, 30, true);
        self.buses.render(frame, top, focus == PaneKind::EventBuses);
        self.rules.render(frame, bottom, focus, split);
    }

    fn configure(&mut self, pane: PaneKind, key: &DrillKey, _: &EventCx) -> bool {
        match (pane, key) {
            (PaneKind::Rules, DrillKey::EventBus { name }) => {
                self.rules.list.set_title(&format!("Rules: {name}"));
                self.rules.list.set_key(name.clone());
                true
            }
            _ => false,
        }
    }

    fn refresh(&mut self, pane: PaneKind, reset: bool, cx: &EventCx) {
        match pane {
            PaneKind::EventBuses => self.buses.refresh(reset, cx),
            PaneKind::Rules => self.rules.list.refresh(reset, cx),
            _ => {}
        }
    }

    fn activate(&mut self, cx: &EventCx) {
        self.buses.refresh(true, cx);
    }

    fn status(&self, pane: PaneKind) -> String {
        if self.rules.owns(pane) {
            self.rules.status()
        } else {
            self.buses.status()
        }
    }

    fn is_capturing(&self) -> bool {
        self.buses.is_filtering() || self.rules.list.is_filtering()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::testing::{cx, settle};
    use crate::ui::component::Effect;
    use skyview_core::keymap::KeyName;

    #[tokio::test]
    async fn test_bus_drill_and_rule_details() {
        let mut cx = cx();
        let mut page = EventBusesPage::new(&cx);
        page.activate(&cx);
        settle(&mut page, &mut cx, |p| p.buses.selected().is_some()).await;
        page.handle_key(PaneKind::EventBuses, &KeyBinding::ch('j'), &mut cx);
        page.handle_key(PaneKind::EventBuses, &KeyBinding::plain(KeyName::Enter), &mut cx);
        let effects = cx.take_effects();
        assert!(matches!(
            effects.as_slice(),
            [Effect::Drill(Selection::EventBus(b))] if b.name == "orders"
        ));

        let key = DrillKey::EventBus {
            name: "orders".into(),
        };
        assert!(page.configure(PaneKind::Rules, &key, &cx));
        page.refresh(PaneKind::Rules, true, &cx);
        settle(&mut page, &mut cx, |p| p.rules.list.table().model().len() == 5).await;
        // orders-rule-0 is a schedule, orders-rule-1 carries a pattern.
        assert!(page.rules.details.text().contains("rate(5 minutes)"));
        page.handle_key(PaneKind::Rules, &KeyBinding::ch('j'), &mut cx);
        assert!(page.rules.details.text().contains("app.orders"));
    }
}
