//! CloudFormation: stacks with details, events and resources side by side.

use std::time::Instant;

use ratatui::Frame;
use ratatui::layout::{Constraint, Layout, Rect};

use skyview_core::drill::{DrillKey, PageKind, PaneKind, Selection};
use skyview_core::gateway::Page;
use skyview_core::keymap::KeyBinding;
use skyview_core::resource::{Stack, StackEvent, StackResource};

use crate::services::{nothing, outcome, paged_source};
use crate::ui::component::{EventCx, KeyOutcome};
use crate::ui::details::DetailsTable;
use crate::ui::page::{PageBody, split_areas};
use crate::ui::paged::PagedTable;
use crate::ui::table::TableEvent;

pub fn pages(cx: &EventCx) -> Vec<Box<dyn PageBody>> {
    vec![Box::new(StacksPage::new(cx))]
}

struct StacksPage {
    stacks: PagedTable<(), Stack>,
    details: DetailsTable,
    events: PagedTable<String, StackEvent>,
    resources: PagedTable<String, StackResource>,
    stack: Option<String>,
}

impl StacksPage {
    fn new(cx: &EventCx) -> Self {
        let stacks = paged_source(cx, "stacks", (), |bundle, (), limit, cursor| async move {
            bundle.stacks.list_stacks(limit, cursor).await
        });
        let events = paged_source(
            cx,
            "stack_events",
            String::new(),
            |bundle, stack: String, limit, cursor| async move {
                if stack.is_empty() {
                    return nothing();
                }
                bundle.stacks.list_stack_events(&stack, limit, cursor).await
            },
        );
        // The resource listing is not paginated.
        let resources = paged_source(
            cx,
            "stack_resources",
            String::new(),
            |bundle, stack: String, _, _| async move {
                if stack.is_empty() {
                    return nothing();
                }
                bundle.stacks.list_stack_resources(&stack).await.map(Page::last)
            },
        );
        Self {
            stacks: PagedTable::new("Stacks", stacks, cx),
            details: DetailsTable::new(PaneKind::StackDetails.title(), cx),
            events: PagedTable::new("Stack Events", events, cx),
            resources: PagedTable::new("Resources", resources, cx),
            stack: None,
        }
    }

    fn load_details(&mut self, cx: &EventCx) {
        let Some(name) = self.stack.clone() else {
            self.details.clear();
            return;
        };
        let bundle = cx.ctx.bundle();
        self.details.load(
            async move {
                bundle
                    .stacks
                    .describe_stack(&name)
                    .await
                    .map(|stack| stack.detail_pairs())
            },
            cx,
        );
    }
}

impl PageBody for StacksPage {
    fn kind(&self) -> PageKind {
        PageKind::Stacks
    }

    fn panes(&self) -> Vec<PaneKind> {
        vec![
            PaneKind::Stacks,
            PaneKind::StackDetails,
            PaneKind::StackEvents,
            PaneKind::StackResources,
        ]
    }

    fn handle_key(&mut self, pane: PaneKind, key: &KeyBinding, cx: &mut EventCx) -> KeyOutcome {
        match pane {
            PaneKind::Stacks => {
                let event = self.stacks.handle_key(key, cx);
                if let (TableEvent::Selected(_), Some(stack)) = (event, self.stacks.selected()) {
                    cx.drill(Selection::Stack(stack.clone()));
                }
                outcome(event)
            }
            PaneKind::StackDetails => self.details.handle_key(key, cx),
            PaneKind::StackEvents => outcome(self.events.handle_key(key, cx)),
            PaneKind::StackResources => outcome(self.resources.handle_key(key, cx)),
            _ => KeyOutcome::Ignored,
        }
    }

    fn tick(&mut self, cx: &mut EventCx, now: Instant) {
        self.stacks.tick(cx, now);
        self.details.tick(cx, now);
        self.events.tick(cx, now);
        self.resources.tick(cx, now);
    }

    fn render(&mut self, frame: &mut Frame, area: Rect, focus: PaneKind, split: u16) {
        let [left, right] = split_areas(area, split, false);
        let [details, events, resources] = Layout::vertical([
            Constraint::Percentage(30),
            Constraint::Percentage(40),
            Constraint::Percentage(30),
        ])
        .areas(right);
        self.stacks.render(frame, left, focus == PaneKind::Stacks);
        self.details
            .render(frame, details, focus == PaneKind::StackDetails);
        self.events
            .render(frame, events, focus == PaneKind::StackEvents);
        self.resources
            .render(frame, resources, focus == PaneKind::StackResources);
    }

    fn configure(&mut self, pane: PaneKind, key: &DrillKey, _: &EventCx) -> bool {
        let DrillKey::Stack { name } = key else {
            return false;
        };
        match pane {
            PaneKind::StackDetails => {
                self.stack = Some(name.clone());
                self.details.clear();
            }
            PaneKind::StackEvents => {
                self.events.set_title(&format!("Stack Events: {name}"));
                self.events.set_key(name.clone());
            }
            PaneKind::StackResources => {
                self.resources.set_title(&format!("Resources: {name}"));
                self.resources.set_key(name.clone());
            }
            _ => return false,
        }
        true
    }

    fn refresh(&mut self, pane: PaneKind, reset: bool, cx: &EventCx) {
        match pane {
            PaneKind::Stacks => self.stacks.refresh(reset, cx),
            PaneKind::StackDetails => self.load_details(cx),
            PaneKind::StackEvents => self.events.refresh(reset, cx),
            PaneKind::StackResources => self.resources.refresh(reset, cx),
            _ => {}
        }
    }

    fn activate(&mut self, cx: &EventCx) {
        self.stacks.refresh(true, cx);
    }

    fn status(&self, pane: PaneKind) -> String {
        match pane {
            PaneKind::StackEvents => self.events.status(),
            PaneKind::StackResources => self.resources.status(),
            PaneKind::StackDetails => self.stack.clone().unwrap_or_default(),
            _ => self.stacks.status(),
        }
    }

    fn is_capturing(&self) -> bool {
        self.stacks.is_filtering() || self.events.is_filtering() || self.resources.is_filtering()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::testing::{cx, settle};
    use skyview_core::drill::{DrillController, DrillStep};
    use skyview_core::keymap::KeyName;

    #[tokio::test]
    async fn test_stack_drill_fills_three_panes() {
        let mut cx = cx();
        let mut page = StacksPage::new(&cx);
        page.activate(&cx);
        settle(&mut page, &mut cx, |p| p.stacks.selected().is_some()).await;
        page.handle_key(PaneKind::Stacks, &KeyBinding::plain(KeyName::Enter), &mut cx);
        let stack = page.stacks.selected().cloned().unwrap();

        for step in DrillController::plan(&Selection::Stack(stack.clone())).unwrap() {
            match step {
                DrillStep::Configure { target, key } => {
                    assert!(page.configure(target.pane, &key, &cx));
                }
                DrillStep::Refresh { target, reset } => page.refresh(target.pane, reset, &cx),
                _ => {}
            }
        }
        settle(&mut page, &mut cx, |p| {
            p.details.value("Name").is_some()
                && !p.events.table().model().is_empty()
                && !p.resources.table().model().is_empty()
        })
        .await;
        assert_eq!(page.details.value("Status"), Some(stack.status.as_str()));
        assert!(
            page.events
                .table()
                .model()
                .payloads()
                .iter()
                .all(|e| e.stack == stack.name)
        );
        assert_eq!(page.status(PaneKind::StackDetails), stack.name);
        assert!(!page.resources.source().has_more());
    }
}
