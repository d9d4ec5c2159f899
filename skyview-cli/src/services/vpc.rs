//! VPCs and their subnets.

use std::time::Instant;

use ratatui::Frame;
use ratatui::layout::Rect;

use skyview_core::drill::{DrillKey, PageKind, PaneKind, Selection};
use skyview_core::keymap::KeyBinding;
use skyview_core::resource::{Subnet, Vpc};

use crate::services::{nothing, outcome, paged_source};
use crate::ui::component::{EventCx, KeyOutcome};
use crate::ui::page::{PageBody, split_areas};
use crate::ui::paged::PagedTable;
use crate::ui::table::TableEvent;

pub fn pages(cx: &EventCx) -> Vec<Box<dyn PageBody>> {
    vec![Box::new(VpcsPage::new(cx))]
}

struct VpcsPage {
    vpcs: PagedTable<(), Vpc>,
    subnets: PagedTable<String, Subnet>,
}

impl VpcsPage {
    fn new(cx: &EventCx) -> Self {
        let vpcs = paged_source(cx, "vpcs", (), |bundle, (), limit, cursor| async move {
            bundle.vpcs.list_vpcs(limit, cursor).await
        });
        let subnets = paged_source(
            cx,
            "subnets",
            String::new(),
            |bundle, vpc: String, limit, cursor| async move {
                if vpc.is_empty() {
                    return nothing();
                }
                bundle.vpcs.list_subnets(&vpc, limit, cursor).await
            },
        );
        Self {
            vpcs: PagedTable::new("VPCs", vpcs, cx),
            subnets: PagedTable::new("Subnets", subnets, cx),
        }
    }
}

impl PageBody for VpcsPage {
    fn kind(&self) -> PageKind {
        PageKind::Vpcs
    }

    fn panes(&self) -> Vec<PaneKind> {
        vec![PaneKind::Vpcs, PaneKind::Subnets]
    }

    fn handle_key(&mut self, pane: PaneKind, key: &KeyBinding, cx: &mut EventCx) -> KeyOutcome {
        match pane {
            PaneKind::Vpcs => {
                let event = self.vpcs.handle_key(key, cx);
                if let (TableEvent::Selected(_), Some(vpc)) = (event, self.vpcs.selected()) {
                    cx.drill(Selection::Vpc(vpc.clone()));
                }
                outcome(event)
            }
            PaneKind::Subnets => outcome(self.subnets.handle_key(key, cx)),
            _ => KeyOutcome::Ignored,
        }
    }

    fn tick(&mut self, cx: &mut EventCx, now: Instant) {
        self.vpcs.tick(cx, now);
        self.subnets.tick(cx, now);
    }

    fn render(&mut self, frame: &mut Frame, area: Rect, focus: PaneKind, split: u16) {
        let [top, bottom] = split_areas(area, split, true);
        self.vpcs.render(frame, top, focus == PaneKind::Vpcs);
        self.subnets.render(frame, bottom, focus == PaneKind::Subnets);
    }

    fn configure(&mut self, pane: PaneKind, key: &DrillKey, _: &EventCx) -> bool {
        match (pane, key) {
            (PaneKind::Subnets, DrillKey::Vpc { id }) => {
                self.subnets.set_title(&format!("Subnets: {id}"));
                self.subnets.set_key(id.clone());
                true
            }
            _ => false,
        }
    }

    fn refresh(&mut self, pane: PaneKind, reset: bool, cx: &EventCx) {
        match pane {
            PaneKind::Vpcs => self.vpcs.refresh(reset, cx),
            PaneKind::Subnets => self.subnets.refresh(reset, cx),
            _ => {}
        }
    }

    fn activate(&mut self, cx: &EventCx) {
        self.vpcs.refresh(true, cx);
    }

    fn status(&self, pane: PaneKind) -> String {
        match pane {
            PaneKind::Subnets => self.subnets.status(),
            _ => self.vpcs.status(),
        }
    }

    fn is_capturing(&self) -> bool {
        self.vpcs.is_filtering() || self.subnets.is_filtering()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::testing::{cx, settle};

    #[tokio::test]
    async fn test_subnets_follow_configured_vpc() {
        let mut cx = cx();
        let mut page = VpcsPage::new(&cx);
        page.refresh(PaneKind::Subnets, true, &cx);
        settle(&mut page, &mut cx, |p| !p.subnets.is_loading()).await;
        assert!(page.subnets.table().model().is_empty());

        page.activate(&cx);
        settle(&mut page, &mut cx, |p| p.vpcs.selected().is_some()).await;
        let id = page.vpcs.selected().map(|v| v.id.clone()).unwrap();
        assert!(page.configure(PaneKind::Subnets, &DrillKey::Vpc { id: id.clone() }, &cx));
        page.refresh(PaneKind::Subnets, true, &cx);
        settle(&mut page, &mut cx, |p| p.subnets.table().model().len() == 4).await;
        assert!(
            page.subnets
                .table()
                .model()
                .payloads()
                .iter()
                .all(|s| s.vpc_id == id)
        );
    }
}
