//! Page wiring for each service.
//!
//! Every service module exposes `pages(cx)`, the bodies of its tabs in
//! order. Sources resolve the gateway bundle when a page is fetched, so a
//! profile switch takes effect on the next load without rebuilding views.

mod cloudformation;
mod cloudwatch;
mod dynamodb;
mod eventbridge;
mod lambda;
mod logs;
mod s3;
mod ssm;
mod stepfunctions;
mod vpc;

use std::sync::Arc;
use std::time::Instant;

use futures::FutureExt;
use ratatui::Frame;
use ratatui::layout::Rect;

use skyview_core::drill::{PaneKind, Selection, ServiceKind};
use skyview_core::error::GatewayResult;
use skyview_core::gateway::{Cursor, GatewayBundle, Page};
use skyview_core::keymap::KeyBinding;
use skyview_core::paginator::PaginatorSource;

use crate::ui::component::{EventCx, KeyOutcome};
use crate::ui::page::{PageBody, ServicePageView, split_areas};
use crate::ui::paged::PagedTable;
use crate::ui::root::ServiceRoot;
use crate::ui::rows::TableRow;
use crate::ui::table::TableEvent;
use crate::ui::textarea::TextArea;

pub fn root(service: ServiceKind, cx: &EventCx) -> ServiceRoot {
    let bodies: Vec<Box<dyn PageBody>> = match service {
        ServiceKind::Lambda => lambda::pages(cx),
        ServiceKind::Logs => logs::pages(cx),
        ServiceKind::CloudWatch => cloudwatch::pages(cx),
        ServiceKind::CloudFormation => cloudformation::pages(cx),
        ServiceKind::DynamoDb => dynamodb::pages(cx),
        ServiceKind::S3 => s3::pages(cx),
        ServiceKind::StepFunctions => stepfunctions::pages(cx),
        ServiceKind::Ssm => ssm::pages(cx),
        ServiceKind::Vpc => vpc::pages(cx),
        ServiceKind::EventBridge => eventbridge::pages(cx),
    };
    ServiceRoot::new(service, bodies.into_iter().map(ServicePageView::new).collect())
}

/// A generation-tracked source named after its pagination config key.
pub(crate) fn paged_source<P, T, F, Fut>(
    cx: &EventCx,
    name: &'static str,
    params: P,
    fetch: F,
) -> PaginatorSource<P, T>
where
    P: Clone + Send + 'static,
    T: Clone + Send + 'static,
    F: Fn(Arc<GatewayBundle>, P, usize, Option<Cursor>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = GatewayResult<Page<T>>> + Send + 'static,
{
    let ctx = Arc::clone(&cx.ctx);
    let limit = ctx.page_limit(name);
    PaginatorSource::tracked(name, params, ctx.generation(), move |params, cursor| {
        fetch(ctx.bundle(), params, limit, cursor).boxed()
    })
}

/// An empty last page, for drill targets that have not been configured.
pub(crate) fn nothing<T>() -> GatewayResult<Page<T>> {
    Ok(Page::last(Vec::new()))
}

pub(crate) fn outcome(event: TableEvent) -> KeyOutcome {
    if event.handled() {
        KeyOutcome::Consumed
    } else {
        KeyOutcome::Ignored
    }
}

/// A paged list beside a read-only pane describing its selected row.
pub(crate) struct ListWithDetails<P, T> {
    pub list: PagedTable<P, T>,
    pub details: TextArea,
    list_pane: PaneKind,
    details_pane: PaneKind,
    drill: Option<fn(&T) -> Selection>,
    describe: fn(&T) -> String,
    shown: Option<String>,
}

impl<P, T> ListWithDetails<P, T>
where
    P: Clone + Send + 'static,
    T: TableRow,
{
    pub fn new(list: PagedTable<P, T>, list_pane: PaneKind, details_pane: PaneKind) -> Self {
        Self {
            list,
            details: TextArea::read_only(details_pane.title()),
            list_pane,
            details_pane,
            drill: None,
            describe: T::payload_text,
            shown: None,
        }
    }

    /// Enter on a row records this selection.
    pub fn drill_with(mut self, drill: fn(&T) -> Selection) -> Self {
        self.drill = Some(drill);
        self
    }

    pub fn describe_with(mut self, describe: fn(&T) -> String) -> Self {
        self.describe = describe;
        self
    }

    pub fn panes(&self) -> Vec<PaneKind> {
        vec![self.list_pane, self.details_pane]
    }

    pub fn owns(&self, pane: PaneKind) -> bool {
        pane == self.list_pane || pane == self.details_pane
    }

    fn sync(&mut self) {
        let text = self.list.selected().map(self.describe);
        if text != self.shown {
            match &text {
                Some(text) => self.details.set_json(text),
                None => self.details.clear(),
            }
            self.shown = text;
        }
    }

    pub fn handle_key(&mut self, pane: PaneKind, key: &KeyBinding, cx: &mut EventCx) -> KeyOutcome {
        if pane == self.details_pane {
            return self.details.handle_key(key, cx);
        }
        if pane != self.list_pane {
            return KeyOutcome::Ignored;
        }
        let event = self.list.handle_key(key, cx);
        if let (TableEvent::Selected(_), Some(drill)) = (event, self.drill) {
            if let Some(item) = self.list.selected() {
                cx.drill(drill(item));
            }
        }
        self.sync();
        outcome(event)
    }

    pub fn tick(&mut self, cx: &mut EventCx, now: Instant) {
        if self.list.tick(cx, now) {
            self.sync();
        }
    }

    pub fn render(&mut self, frame: &mut Frame, area: Rect, focus: PaneKind, split: u16) {
        let [list_area, details_area] = split_areas(area, split, false);
        self.list.render(frame, list_area, focus == self.list_pane);
        self.details
            .render(frame, details_area, focus == self.details_pane);
    }

    pub fn status(&self) -> String {
        self.list.status()
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::time::Duration;

    use super::*;
    use crate::context::test_support;

    pub fn cx() -> EventCx {
        EventCx::new(test_support::context())
    }

    /// Tick `body` until `done` holds or two seconds pass.
    pub async fn settle<B, F>(body: &mut B, cx: &mut EventCx, done: F)
    where
        B: PageBody + ?Sized,
        F: Fn(&B) -> bool,
    {
        for _ in 0..400 {
            body.tick(cx, Instant::now());
            if done(body) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("page did not settle");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skyview_core::keymap::KeyName;

    #[tokio::test]
    async fn test_every_service_builds_its_pages() {
        let cx = testing::cx();
        for service in ServiceKind::ALL {
            let root = root(service, &cx);
            assert_eq!(root.service(), service);
            assert_eq!(root.current_page(), service.pages().first().copied());
        }
    }

    #[tokio::test]
    async fn test_list_details_follow_selection() {
        let mut cx = testing::cx();
        let source = paged_source(&cx, "vpcs", (), |bundle, (), limit, cursor| async move {
            bundle.vpcs.list_vpcs(limit, cursor).await
        });
        let mut view = ListWithDetails::new(
            PagedTable::new("VPCs", source, &cx),
            PaneKind::Vpcs,
            PaneKind::Subnets,
        )
        .drill_with(|v| Selection::Vpc(v.clone()));

        view.list.refresh(true, &cx);
        for _ in 0..400 {
            view.tick(&mut cx, Instant::now());
            if view.list.selected().is_some() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
        let first = view.details.text();
        assert!(first.contains("\"cidr\": \"10.0.0.0/16\""));

        view.handle_key(PaneKind::Vpcs, &KeyBinding::ch('j'), &mut cx);
        assert!(view.details.text().contains("10.1.0.0/16"));

        view.handle_key(PaneKind::Vpcs, &KeyBinding::plain(KeyName::Enter), &mut cx);
        let effects = cx.take_effects();
        assert!(matches!(
            effects.as_slice(),
            [crate::ui::component::Effect::Drill(Selection::Vpc(v))] if v.cidr == "10.1.0.0/16"
        ));
    }
}
