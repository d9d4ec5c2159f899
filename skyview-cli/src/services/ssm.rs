//! Systems Manager parameters.
//!
//! Listing never returns values; the selected parameter is fetched on its
//! own when the selection settles.

use std::time::Instant;

use ratatui::Frame;
use ratatui::layout::Rect;
use tracing::debug;

use skyview_core::drill::{DrillKey, PageKind, PaneKind};
use skyview_core::format::format_time;
use skyview_core::keymap::KeyBinding;
use skyview_core::resource::Parameter;

use crate::services::{outcome, paged_source};
use crate::ui::component::{EventCx, KeyOutcome};
use crate::ui::details::{DetailsTable, Pairs};
use crate::ui::page::{PageBody, split_areas};
use crate::ui::paged::PagedTable;

pub fn pages(cx: &EventCx) -> Vec<Box<dyn PageBody>> {
    vec![Box::new(ParametersPage::new(cx))]
}

fn parameter_pairs(parameter: Parameter) -> Pairs {
    vec![
        ("Name".to_string(), parameter.name),
        ("Type".to_string(), parameter.kind),
        ("Version".to_string(), parameter.version.to_string()),
        (
            "Last modified".to_string(),
            parameter
                .last_modified
                .as_ref()
                .map(format_time)
                .unwrap_or_default(),
        ),
        ("Value".to_string(), parameter.value.unwrap_or_default()),
    ]
}

struct ParametersPage {
    parameters: PagedTable<String, Parameter>,
    details: DetailsTable,
    shown: Option<String>,
}

impl ParametersPage {
    fn new(cx: &EventCx) -> Self {
        let source = paged_source(
            cx,
            "parameters",
            String::new(),
            |bundle, prefix: String, limit, cursor| async move {
                bundle.parameters.list_parameters(&prefix, limit, cursor).await
            },
        );
        Self {
            parameters: PagedTable::new("Parameters", source, cx)
                .with_remote_search(|_, text| text.to_string()),
            details: DetailsTable::new(PaneKind::ParameterDetails.title(), cx),
            shown: None,
        }
    }

    fn load_selected(&mut self, cx: &EventCx) {
        let name = self.parameters.selected().map(|p| p.name.clone());
        if name == self.shown {
            return;
        }
        self.shown = name.clone();
        let Some(name) = name else {
            self.details.clear();
            return;
        };
        debug!(parameter = %name, "loading parameter value");
        let bundle = cx.ctx.bundle();
        self.details.load(
            async move {
                bundle
                    .parameters
                    .get_parameter(&name)
                    .await
                    .map(parameter_pairs)
            },
            cx,
        );
    }
}

impl PageBody for ParametersPage {
    fn kind(&self) -> PageKind {
        PageKind::Parameters
    }

    fn panes(&self) -> Vec<PaneKind> {
        vec![PaneKind::Parameters, PaneKind::ParameterDetails]
    }

    fn handle_key(&mut self, pane: PaneKind, key: &KeyBinding, cx: &mut EventCx) -> KeyOutcome {
        match pane {
            PaneKind::Parameters => {
                let event = self.parameters.handle_key(key, cx);
                self.load_selected(cx);
                outcome(event)
            }
            PaneKind::ParameterDetails => self.details.handle_key(key, cx),
            _ => KeyOutcome::Ignored,
        }
    }

    fn tick(&mut self, cx: &mut EventCx, now: Instant) {
        if self.parameters.tick(cx, now) {
            self.load_selected(cx);
        }
        self.details.tick(cx, now);
    }

    fn render(&mut self, frame: &mut Frame, area: Rect, focus: PaneKind, split: u16) {
        let [left, right] = split_areas(area, split, false);
        self.parameters
            .render(frame, left, focus == PaneKind::Parameters);
        self.details
            .render(frame, right, focus == PaneKind::ParameterDetails);
    }

    fn configure(&mut self, _: PaneKind, _: &DrillKey, _: &EventCx) -> bool {
        false
    }

    fn refresh(&mut self, pane: PaneKind, reset: bool, cx: &EventCx) {
        if pane == PaneKind::Parameters {
            self.parameters.refresh(reset, cx);
        }
    }

    fn activate(&mut self, cx: &EventCx) {
        self.parameters.refresh(true, cx);
    }

    fn status(&self, _: PaneKind) -> String {
        match self.parameters.params().as_str() {
            "" => self.parameters.status(),
            prefix => format!("{prefix}* · {}", self.parameters.status()),
        }
    }

    fn is_capturing(&self) -> bool {
        self.parameters.is_filtering()
    }
}
