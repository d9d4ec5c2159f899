//! Step Functions: state machines, their executions, and one execution's
//! input and output.

use std::time::Instant;

use ratatui::Frame;
use ratatui::layout::{Constraint, Layout, Rect};
use tracing::error;

use skyview_core::drill::{DrillKey, PageKind, PaneKind, Selection};
use skyview_core::error::GatewayResult;
use skyview_core::format::try_format_json;
use skyview_core::keymap::KeyBinding;
use skyview_core::resource::{Execution, ExecutionDetail, StateMachine};

use crate::loader::{LoadOutcome, UiDataLoader};
use crate::services::{nothing, outcome, paged_source};
use crate::ui::component::{EventCx, KeyOutcome};
use crate::ui::details::DetailsTable;
use crate::ui::page::{PageBody, split_areas};
use crate::ui::paged::PagedTable;
use crate::ui::table::TableEvent;
use crate::ui::textarea::TextArea;

pub fn pages(cx: &EventCx) -> Vec<Box<dyn PageBody>> {
    vec![
        Box::new(StateMachinesPage::new(cx)),
        Box::new(ExecutionsPage::new(cx)),
    ]
}

struct StateMachinesPage {
    machines: PagedTable<(), StateMachine>,
}

impl StateMachinesPage {
    fn new(cx: &EventCx) -> Self {
        let source = paged_source(cx, "state_machines", (), |bundle, (), limit, cursor| async move {
            bundle.state_machines.list_state_machines(limit, cursor).await
        });
        Self {
            machines: PagedTable::new("State Machines", source, cx),
        }
    }
}

impl PageBody for StateMachinesPage {
    fn kind(&self) -> PageKind {
        PageKind::StateMachines
    }

    fn panes(&self) -> Vec<PaneKind> {
        vec![PaneKind::StateMachines]
    }

    fn handle_key(&mut self, pane: PaneKind, key: &KeyBinding, cx: &mut EventCx) -> KeyOutcome {
        if pane != PaneKind::StateMachines {
            return KeyOutcome::Ignored;
        }
        let event = self.machines.handle_key(key, cx);
        if let (TableEvent::Selected(_), Some(machine)) = (event, self.machines.selected()) {
            cx.drill(Selection::StateMachine(machine.clone()));
        }
        outcome(event)
    }

    fn tick(&mut self, cx: &mut EventCx, now: Instant) {
        self.machines.tick(cx, now);
    }

    fn render(&mut self, frame: &mut Frame, area: Rect, focus: PaneKind, _: u16) {
        self.machines
            .render(frame, area, focus == PaneKind::StateMachines);
    }

    fn configure(&mut self, _: PaneKind, _: &DrillKey, _: &EventCx) -> bool {
        false
    }

    fn refresh(&mut self, _: PaneKind, reset: bool, cx: &EventCx) {
        self.machines.refresh(reset, cx);
    }

    fn activate(&mut self, cx: &EventCx) {
        self.machines.refresh(true, cx);
    }

    fn status(&self, _: PaneKind) -> String {
        self.machines.status()
    }

    fn is_capturing(&self) -> bool {
        self.machines.is_filtering()
    }
}

/// Input, output and failure of an execution as one document.
fn execution_text(detail: &ExecutionDetail) -> String {
    let mut text = format!("Input:\n{}\n", try_format_json(&detail.input).0);
    if let Some(output) = &detail.output {
        text.push_str(&format!("\nOutput:\n{}\n", try_format_json(output).0));
    }
    if let Some(error) = &detail.error {
        text.push_str(&format!("\nError: {error}\n"));
    }
    if let Some(cause) = &detail.cause {
        text.push_str(&format!("Cause: {cause}\n"));
    }
    text
}

struct ExecutionsPage {
    executions: PagedTable<String, Execution>,
    summary: DetailsTable,
    details: TextArea,
    execution: Option<String>,
    loader: UiDataLoader<GatewayResult<ExecutionDetail>>,
}

impl ExecutionsPage {
    fn new(cx: &EventCx) -> Self {
        let source = paged_source(
            cx,
            "executions",
            String::new(),
            |bundle, machine: String, limit, cursor| async move {
                if machine.is_empty() {
                    return nothing();
                }
                bundle
                    .state_machines
                    .list_executions(&machine, limit, cursor)
                    .await
            },
        );
        Self {
            executions: PagedTable::new("Executions", source, cx),
            summary: DetailsTable::new(PaneKind::ExecutionSummary.title(), cx),
            details: TextArea::read_only(PaneKind::ExecutionDetails.title()),
            execution: None,
            loader: UiDataLoader::new("execution", &cx.ctx.config.loader),
        }
    }

    /// One describe call serves both detail panes.
    fn load_execution(&mut self, cx: &EventCx) {
        if self.loader.is_loading() {
            return;
        }
        let Some(arn) = self.execution.clone() else {
            return;
        };
        let gateway = cx.ctx.bundle().state_machines.clone();
        self.loader.load_async(
            async move { gateway.describe_execution(&arn).await },
            cx.ctx.cancellation(),
            cx.ctx.redraw.clone(),
        );
    }
}

impl PageBody for ExecutionsPage {
    fn kind(&self) -> PageKind {
        PageKind::Executions
    }

    fn panes(&self) -> Vec<PaneKind> {
        vec![
            PaneKind::Executions,
            PaneKind::ExecutionSummary,
            PaneKind::ExecutionDetails,
        ]
    }

    fn handle_key(&mut self, pane: PaneKind, key: &KeyBinding, cx: &mut EventCx) -> KeyOutcome {
        match pane {
            PaneKind::Executions => {
                let event = self.executions.handle_key(key, cx);
                if let (TableEvent::Selected(_), Some(execution)) =
                    (event, self.executions.selected())
                {
                    cx.drill(Selection::Execution(execution.clone()));
                }
                outcome(event)
            }
            PaneKind::ExecutionSummary => self.summary.handle_key(key, cx),
            PaneKind::ExecutionDetails => self.details.handle_key(key, cx),
            _ => KeyOutcome::Ignored,
        }
    }

    fn tick(&mut self, cx: &mut EventCx, now: Instant) {
        self.executions.tick(cx, now);
        self.summary.tick(cx, now);
        if self.loader.spin(now) {
            cx.mark_dirty();
        }
        match self.loader.poll() {
            Some(LoadOutcome::Done(Ok(detail))) => {
                self.summary.set_pairs(detail.summary_pairs());
                self.details.set_text(&execution_text(&detail));
            }
            Some(LoadOutcome::Done(Err(e))) => {
                error!(error = %e, "describe execution failed");
                cx.error(e.to_string());
            }
            Some(LoadOutcome::Failed(reason)) => cx.error(reason),
            Some(LoadOutcome::TimedOut | LoadOutcome::Cancelled) | None => return,
        }
        cx.mark_dirty();
    }

    fn render(&mut self, frame: &mut Frame, area: Rect, focus: PaneKind, split: u16) {
        let [top, bottom] = split_areas(area, split, true);
        let [summary, details] =
            Layout::horizontal([Constraint::Percentage(40), Constraint::Percentage(60)])
                .areas(bottom);
        self.executions
            .render(frame, top, focus == PaneKind::Executions);
        self.summary
            .render(frame, summary, focus == PaneKind::ExecutionSummary);
        self.details
            .render(frame, details, focus == PaneKind::ExecutionDetails);
        self.loader.render_throbber(frame, details);
    }

    fn configure(&mut self, pane: PaneKind, key: &DrillKey, _: &EventCx) -> bool {
        match (pane, key) {
            (PaneKind::Executions, DrillKey::StateMachine { arn }) => {
                let name = arn.rsplit(':').next().unwrap_or(arn);
                self.executions.set_title(&format!("Executions: {name}"));
                self.executions.set_key(arn.clone());
                true
            }
            (PaneKind::ExecutionSummary | PaneKind::ExecutionDetails, DrillKey::Execution { arn }) => {
                if self.execution.as_deref() != Some(arn) {
                    self.summary.clear();
                    self.details.clear();
                }
                self.execution = Some(arn.clone());
                true
            }
            _ => false,
        }
    }

    fn refresh(&mut self, pane: PaneKind, reset: bool, cx: &EventCx) {
        match pane {
            PaneKind::Executions => self.executions.refresh(reset, cx),
            PaneKind::ExecutionSummary | PaneKind::ExecutionDetails => self.load_execution(cx),
            _ => {}
        }
    }

    fn status(&self, pane: PaneKind) -> String {
        match pane {
            PaneKind::Executions => self.executions.status(),
            _ => self
                .summary
                .value("Status")
                .map(str::to_string)
                .unwrap_or_default(),
        }
    }

    fn is_capturing(&self) -> bool {
        self.executions.is_filtering()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::testing::{cx, settle};
    use crate::ui::component::Effect;
    use skyview_core::drill::{DrillController, DrillStep};
    use skyview_core::keymap::KeyName;

    fn apply(page: &mut ExecutionsPage, steps: Vec<DrillStep>, cx: &EventCx) {
        for step in steps {
            match step {
                DrillStep::Configure { target, key } => {
                    assert!(page.configure(target.pane, &key, cx));
                }
                DrillStep::Refresh { target, reset } => page.refresh(target.pane, reset, cx),
                _ => {}
            }
        }
    }

    #[tokio::test]
    async fn test_machine_to_execution_detail() {
        let mut cx = cx();
        let mut machines = StateMachinesPage::new(&cx);
        machines.activate(&cx);
        settle(&mut machines, &mut cx, |p| p.machines.selected().is_some()).await;
        machines.handle_key(PaneKind::StateMachines, &KeyBinding::plain(KeyName::Enter), &mut cx);
        let Some(Effect::Drill(selection)) = cx.take_effects().pop() else {
            panic!("expected a drill");
        };

        let mut page = ExecutionsPage::new(&cx);
        apply(&mut page, DrillController::plan(&selection).unwrap(), &cx);
        settle(&mut page, &mut cx, |p| p.executions.table().model().len() == 20).await;

        page.handle_key(PaneKind::Executions, &KeyBinding::plain(KeyName::Enter), &mut cx);
        let Some(Effect::Drill(selection)) = cx.take_effects().pop() else {
            panic!("expected a drill");
        };
        let execution = page.executions.selected().cloned().unwrap();
        apply(&mut page, DrillController::plan(&selection).unwrap(), &cx);
        settle(&mut page, &mut cx, |p| !p.details.text().is_empty()).await;

        assert_eq!(page.summary.value("Arn"), Some(execution.arn.as_str()));
        assert_eq!(page.status(PaneKind::ExecutionSummary), execution.status);
        assert!(page.details.text().starts_with("Input:\n"));
    }
}
