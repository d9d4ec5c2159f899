//! Lambda: the function list and the Invoke page.

use std::time::Instant;

use ratatui::Frame;
use ratatui::layout::Rect;
use tracing::{error, info};

use skyview_core::drill::{DrillController, DrillKey, PageKind, PaneKind, Selection};
use skyview_core::error::{GatewayResult, UiError};
use skyview_core::format::try_format_json;
use skyview_core::keymap::{Action, KeyBinding};
use skyview_core::resource::{FunctionSummary, InvokeOutput};

use crate::loader::{LoadOutcome, UiDataLoader};
use crate::services::{ListWithDetails, paged_source};
use crate::ui::component::{EventCx, KeyOutcome};
use crate::ui::page::{PageBody, split_areas};
use crate::ui::paged::PagedTable;
use crate::ui::textarea::{Mode, TextArea};

const EMPTY_PAYLOAD: &str = "{}";

pub fn pages(cx: &EventCx) -> Vec<Box<dyn PageBody>> {
    vec![
        Box::new(FunctionsPage::new(cx)),
        Box::new(InvokePage::new(cx)),
    ]
}

struct FunctionsPage {
    view: ListWithDetails<(), FunctionSummary>,
}

impl FunctionsPage {
    fn new(cx: &EventCx) -> Self {
        let source = paged_source(cx, "functions", (), |bundle, (), limit, cursor| async move {
            bundle.functions.list_functions(limit, cursor).await
        });
        Self {
            view: ListWithDetails::new(
                PagedTable::new("Functions", source, cx),
                PaneKind::Functions,
                PaneKind::FunctionDetails,
            )
            .drill_with(|f| Selection::Function(f.clone())),
        }
    }
}

impl PageBody for FunctionsPage {
    fn kind(&self) -> PageKind {
        PageKind::Functions
    }

    fn panes(&self) -> Vec<PaneKind> {
        self.view.panes()
    }

    fn handle_key(&mut self, pane: PaneKind, key: &KeyBinding, cx: &mut EventCx) -> KeyOutcome {
        if pane == PaneKind::Functions && !self.view.list.is_filtering() && cx.is(Action::Invoke, key) {
            if let Some(function) = self.view.list.selected() {
                cx.steps(DrillController::invoke_plan(function));
            }
            return KeyOutcome::Consumed;
        }
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
        if pane == PaneKind::Functions {
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

/// Readable summary of an invocation result.
fn describe_invocation(output: &InvokeOutput) -> String {
    let mut text = format!("Status: {}\n", output.status_code);
    if let Some(function_error) = &output.function_error {
        text.push_str(&format!("Function error: {function_error}\n"));
    }
    text.push('\n');
    text.push_str(&try_format_json(&output.payload).0);
    if let Some(tail) = &output.log_tail {
        text.push_str("\n\n--- log tail ---\n");
        text.push_str(tail);
    }
    text
}

struct InvokePage {
    function: Option<String>,
    payload: TextArea,
    result: TextArea,
    loader: UiDataLoader<GatewayResult<InvokeOutput>>,
}

impl InvokePage {
    fn new(cx: &EventCx) -> Self {
        let mut payload = TextArea::editable("Payload");
        payload.set_text(EMPTY_PAYLOAD);
        Self {
            function: None,
            payload,
            result: TextArea::read_only("Result"),
            loader: UiDataLoader::new("invoke", &cx.ctx.config.loader),
        }
    }

    fn invoke(&mut self, cx: &mut EventCx) {
        let Some(name) = self.function.clone() else {
            cx.error(UiError::missing("Function not selected").to_string());
            return;
        };
        let payload = self.payload.text();
        info!(function = %name, bytes = payload.len(), "invoking function");
        let gateway = cx.ctx.bundle().functions.clone();
        self.loader.load_async(
            async move { gateway.invoke(&name, &payload).await },
            cx.ctx.cancellation(),
            cx.ctx.redraw.clone(),
        );
    }
}

impl PageBody for InvokePage {
    fn kind(&self) -> PageKind {
        PageKind::Invoke
    }

    fn panes(&self) -> Vec<PaneKind> {
        vec![PaneKind::InvokePayload, PaneKind::InvokeResult]
    }

    fn handle_key(&mut self, pane: PaneKind, key: &KeyBinding, cx: &mut EventCx) -> KeyOutcome {
        let outcome = match pane {
            PaneKind::InvokePayload => self.payload.handle_key(key, cx),
            PaneKind::InvokeResult => self.result.handle_key(key, cx),
            _ => KeyOutcome::Ignored,
        };
        if !outcome.consumed() && cx.is(Action::RunQuery, key) {
            self.invoke(cx);
            return KeyOutcome::Consumed;
        }
        outcome
    }

    fn tick(&mut self, cx: &mut EventCx, now: Instant) {
        if self.loader.spin(now) {
            cx.mark_dirty();
        }
        match self.loader.poll() {
            Some(LoadOutcome::Done(Ok(output))) => {
                self.result.set_text(&describe_invocation(&output));
                if output.function_error.is_some() {
                    cx.error(format!(
                        "{} returned a function error",
                        self.function.as_deref().unwrap_or_default()
                    ));
                }
            }
            Some(LoadOutcome::Done(Err(e))) => {
                error!(error = %e, "invoke failed");
                cx.error(e.to_string());
            }
            Some(LoadOutcome::Failed(reason)) => cx.error(reason),
            Some(LoadOutcome::TimedOut | LoadOutcome::Cancelled) | None => return,
        }
        cx.mark_dirty();
    }

    fn render(&mut self, frame: &mut Frame, area: Rect, focus: PaneKind, split: u16) {
        let [payload_area, result_area] = split_areas(area, split, true);
        self.payload
            .render(frame, payload_area, focus == PaneKind::InvokePayload);
        self.result
            .render(frame, result_area, focus == PaneKind::InvokeResult);
        self.loader.render_throbber(frame, result_area);
    }

    fn configure(&mut self, pane: PaneKind, key: &DrillKey, _: &EventCx) -> bool {
        match (pane, key) {
            (PaneKind::InvokePayload, DrillKey::Function { name }) => {
                self.payload.set_title(&format!("Payload: {name}"));
                if self.function.as_deref() != Some(name) {
                    self.result.clear();
                }
                self.function = Some(name.clone());
                true
            }
            _ => false,
        }
    }

    fn refresh(&mut self, _: PaneKind, _: bool, _: &EventCx) {}

    fn status(&self, _: PaneKind) -> String {
        match &self.function {
            Some(name) => format!("{name} · ctrl-e invokes"),
            None => "no function selected".to_string(),
        }
    }

    fn is_capturing(&self) -> bool {
        self.payload.mode() == Mode::Insert
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::testing::{cx, settle};
    use crate::ui::component::Effect;
    use skyview_core::drill::DrillStep;
    use skyview_core::keymap::KeyName;

    #[tokio::test]
    async fn test_invoke_key_opens_invoke_page() {
        let mut cx = cx();
        let mut page = FunctionsPage::new(&cx);
        page.activate(&cx);
        settle(&mut page, &mut cx, |p| p.view.list.selected().is_some()).await;

        page.handle_key(PaneKind::Functions, &KeyBinding::ch('i'), &mut cx);
        let effects = cx.take_effects();
        let [Effect::Steps(steps)] = effects.as_slice() else {
            panic!("expected steps, got {effects:?}");
        };
        assert!(steps.contains(&DrillStep::SwitchPage(PageKind::Invoke)));
    }

    #[tokio::test]
    async fn test_invoke_round_trip() {
        let mut cx = cx();
        let mut page = InvokePage::new(&cx);

        page.handle_key(PaneKind::InvokePayload, &KeyBinding::ctrl('e'), &mut cx);
        assert_eq!(
            cx.take_messages()[0].1,
            "MISSING_REQUIRED_INPUT: Function not selected"
        );

        let key = DrillKey::Function {
            name: "orders-api".into(),
        };
        assert!(page.configure(PaneKind::InvokePayload, &key, &cx));
        assert!(!page.configure(PaneKind::InvokeResult, &key, &cx));

        page.handle_key(PaneKind::InvokePayload, &KeyBinding::ch('i'), &mut cx);
        assert!(page.is_capturing());
        page.handle_key(PaneKind::InvokePayload, &KeyBinding::ch('x'), &mut cx);
        page.handle_key(PaneKind::InvokePayload, &KeyBinding::plain(KeyName::Esc), &mut cx);
        assert!(!page.is_capturing());

        page.handle_key(PaneKind::InvokePayload, &KeyBinding::ctrl('e'), &mut cx);
        settle(&mut page, &mut cx, |p| !p.result.text().is_empty()).await;
        let text = page.result.text();
        assert!(text.contains("Function error: Unhandled"));
        assert!(text.contains("SyntaxError"));
        assert!(cx.take_messages()[0].1.contains("orders-api returned a function error"));
    }
}
