//! A service: its ordered pages, the floating page list and the status bar.

use std::time::{Duration, Instant};

use ratatui::Frame;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;

use skyview_core::drill::{DrillKey, PageKind, PaneKind, ServiceKind};
use skyview_core::format::format_countdown;
use skyview_core::keymap::{Action, KeyBinding};
use skyview_core::overlay::{OverlayStack, OverlayTransition};
use skyview_core::profile::profile_label;

use crate::context::AppContext;
use crate::ui::component::{EventCx, KeyOutcome};
use crate::ui::overlay::{ListPicker, PickerEvent};
use crate::ui::page::ServicePageView;
use crate::ui::theme::styles;

pub const SESSION_REFRESH: Duration = Duration::from_secs(5);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum RootOverlay {
    PageList,
}

/// `session: MMm SSs`, or `session: expired` once the countdown ran out.
pub fn session_label(ctx: &AppContext, now: Instant) -> String {
    match ctx.session_remaining(now) {
        Some(left) => format!("session: {}", format_countdown(left)),
        None => "session: expired".to_string(),
    }
}

pub struct ServiceRoot {
    service: ServiceKind,
    pages: Vec<ServicePageView>,
    current: usize,
    overlays: OverlayStack<RootOverlay, usize>,
    page_list: ListPicker<usize>,
    session: String,
    session_checked: Option<Instant>,
}

impl ServiceRoot {
    pub fn new(service: ServiceKind, pages: Vec<ServicePageView>) -> Self {
        let entries = pages
            .iter()
            .enumerate()
            .map(|(i, p)| (p.kind().title().to_string(), i))
            .collect();
        let mut overlays = OverlayStack::new();
        overlays.register(RootOverlay::PageList);
        Self {
            service,
            pages,
            current: 0,
            overlays,
            page_list: ListPicker::new("Pages", entries),
            session: String::new(),
            session_checked: None,
        }
    }

    pub fn service(&self) -> ServiceKind {
        self.service
    }

    pub fn current_page(&self) -> Option<PageKind> {
        self.pages.get(self.current).map(ServicePageView::kind)
    }

    pub fn page_mut(&mut self, kind: PageKind) -> Option<&mut ServicePageView> {
        self.pages.iter_mut().find(|p| p.kind() == kind)
    }

    pub fn is_page_list_open(&self) -> bool {
        self.overlays.is_visible(RootOverlay::PageList)
    }

    /// Called when the shell shows this service.
    pub fn enter(&mut self, cx: &mut EventCx) {
        if let Some(page) = self.pages.get_mut(self.current) {
            page.activate(cx);
        }
    }

    pub fn switch_page(&mut self, index: usize, cx: &mut EventCx) {
        if index < self.pages.len() {
            self.current = index;
            self.pages[index].activate(cx);
        }
    }

    pub fn switch_to(&mut self, kind: PageKind, cx: &mut EventCx) -> bool {
        match self.pages.iter().position(|p| p.kind() == kind) {
            Some(index) => {
                self.switch_page(index, cx);
                true
            }
            None => false,
        }
    }

    /// Route a drill step to whichever page owns `pane`.
    pub fn configure(&mut self, page: PageKind, pane: PaneKind, key: &DrillKey, cx: &EventCx) -> bool {
        self.page_mut(page)
            .is_some_and(|p| p.configure(pane, key, cx))
    }

    pub fn refresh(&mut self, page: PageKind, pane: PaneKind, reset: bool, cx: &EventCx) {
        if let Some(p) = self.page_mut(page) {
            p.refresh(pane, reset, cx);
        }
    }

    pub fn focus(&mut self, page: PageKind, pane: PaneKind) -> bool {
        self.page_mut(page).is_some_and(|p| p.focus_pane(pane))
    }

    fn cycle(&mut self, delta: isize, cx: &mut EventCx) {
        let len = self.pages.len() as isize;
        if len > 0 {
            let next = (self.current as isize + delta).rem_euclid(len) as usize;
            self.switch_page(next, cx);
        }
    }

    pub fn handle_key(&mut self, key: &KeyBinding, cx: &mut EventCx) -> KeyOutcome {
        if cx.is(Action::PageList, key) {
            self.page_list.reset();
            if let Some(title) = self.current_page().map(|k| k.title()) {
                self.page_list.select_label(title);
            }
            if let OverlayTransition::Hidden { restore } =
                self.overlays.toggle(RootOverlay::PageList, self.current)
            {
                self.current = restore;
            }
            return KeyOutcome::Consumed;
        }
        if self.is_page_list_open() {
            match self.page_list.handle_key(key) {
                PickerEvent::Chosen(index) => {
                    self.overlays.hide(RootOverlay::PageList);
                    self.switch_page(index, cx);
                }
                PickerEvent::Closed => {
                    if let Some(restore) = self.overlays.hide(RootOverlay::PageList) {
                        self.current = restore;
                    }
                }
                PickerEvent::Consumed => {}
            }
            return KeyOutcome::Consumed;
        }
        if cx.is(Action::NextPage, key) {
            self.cycle(1, cx);
            return KeyOutcome::Consumed;
        }
        if cx.is(Action::PrevPage, key) {
            self.cycle(-1, cx);
            return KeyOutcome::Consumed;
        }
        match self.pages.get_mut(self.current) {
            Some(page) => page.handle_key(key, cx),
            None => KeyOutcome::Ignored,
        }
    }

    /// Tick every page so loads started on a hidden page still land.
    pub fn tick(&mut self, cx: &mut EventCx, now: Instant) {
        for page in &mut self.pages {
            page.tick(cx, now);
        }
        let due = self
            .session_checked
            .is_none_or(|checked| now.saturating_duration_since(checked) >= SESSION_REFRESH);
        if due {
            let label = session_label(&cx.ctx, now);
            if label != self.session {
                self.session = label;
                cx.mark_dirty();
            }
            self.session_checked = Some(now);
        }
    }

    /// Force the session label to refresh on the next tick.
    pub fn invalidate_session(&mut self) {
        self.session_checked = None;
    }

    /// After a profile switch every page reloads the next time it is shown.
    pub fn reset_pages(&mut self) {
        self.invalidate_session();
        for page in &mut self.pages {
            page.deactivate();
        }
    }

    pub fn is_capturing(&self) -> bool {
        self.is_page_list_open()
            || self
                .pages
                .get(self.current)
                .is_some_and(ServicePageView::is_capturing)
    }

    pub fn status_line(&self, ctx: &AppContext) -> Line<'static> {
        let page = self
            .current_page()
            .map(|k| k.title())
            .unwrap_or_default();
        let status = self
            .pages
            .get(self.current)
            .map(ServicePageView::status)
            .unwrap_or_default();
        let sep = || Span::styled(" │ ", styles::text_muted());
        Line::from(vec![
            Span::styled(format!(" {} ", self.service.label()), styles::accent()),
            Span::styled(format!("{page} "), styles::text()),
            Span::styled(
                format!("{}/{}", self.current + 1, self.pages.len()),
                styles::text_dim(),
            ),
            sep(),
            Span::styled(
                format!("profile: {}", profile_label(ctx.active_profile().as_deref())),
                styles::info(),
            ),
            sep(),
            Span::styled(ctx.region().to_string(), styles::text_dim()),
            sep(),
            Span::styled(status, styles::text_dim()),
            sep(),
            Span::styled(self.session.clone(), styles::warn()),
        ])
    }

    pub fn render(&mut self, frame: &mut Frame, area: Rect, ctx: &AppContext) {
        let [tabs_area, body, status_area] = Layout::vertical([
            Constraint::Length(1),
            Constraint::Min(3),
            Constraint::Length(1),
        ])
        .areas(area);

        let mut tabs = vec![Span::raw(" ")];
        for (i, page) in self.pages.iter().enumerate() {
            tabs.push(Span::styled(
                format!(" {} ", page.kind().title()),
                styles::tab(i == self.current),
            ));
            tabs.push(Span::raw(" "));
        }
        frame.render_widget(Paragraph::new(Line::from(tabs)), tabs_area);

        if let Some(page) = self.pages.get_mut(self.current) {
            page.render(frame, body);
        }
        frame.render_widget(Paragraph::new(self.status_line(ctx)), status_area);

        if self.is_page_list_open() {
            self.page_list.render_floating(frame, body);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::test_support;
    use crate::ui::page::test_body::RecordingBody;
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;
    use skyview_core::keymap::KeyName;

    fn root() -> ServiceRoot {
        let pages = [
            (PageKind::LogGroups, vec![PaneKind::LogGroups, PaneKind::LogStreams]),
            (PageKind::LogEvents, vec![PaneKind::LogEvents, PaneKind::EventDetails]),
            (PageKind::Insights, vec![PaneKind::InsightsQuery]),
        ]
        .into_iter()
        .map(|(kind, panes)| ServicePageView::new(Box::new(RecordingBody::new(kind, &panes))))
        .collect();
        ServiceRoot::new(ServiceKind::Logs, pages)
    }

    #[test]
    fn test_page_cycling_wraps() {
        let mut cx = EventCx::new(test_support::context());
        let mut root = root();
        root.handle_key(&KeyBinding::alt('['), &mut cx);
        assert_eq!(root.current_page(), Some(PageKind::Insights));
        root.handle_key(&KeyBinding::alt(']'), &mut cx);
        assert_eq!(root.current_page(), Some(PageKind::LogGroups));
    }

    #[test]
    fn test_page_list_choose_and_escape() {
        let mut cx = EventCx::new(test_support::context());
        let mut root = root();

        root.handle_key(&KeyBinding::ctrl('p'), &mut cx);
        assert!(root.is_page_list_open());
        for c in "events".chars() {
            root.handle_key(&KeyBinding::ch(c), &mut cx);
        }
        root.handle_key(&KeyBinding::plain(KeyName::Enter), &mut cx);
        assert!(!root.is_page_list_open());
        assert_eq!(root.current_page(), Some(PageKind::LogEvents));

        root.handle_key(&KeyBinding::ctrl('p'), &mut cx);
        root.handle_key(&KeyBinding::plain(KeyName::Down), &mut cx);
        root.handle_key(&KeyBinding::plain(KeyName::Esc), &mut cx);
        assert!(!root.is_page_list_open());
        assert_eq!(root.current_page(), Some(PageKind::LogEvents));

        // Toggle twice restores the page that was current.
        root.handle_key(&KeyBinding::ctrl('p'), &mut cx);
        root.handle_key(&KeyBinding::ctrl('p'), &mut cx);
        assert!(!root.is_page_list_open());
        assert_eq!(root.current_page(), Some(PageKind::LogEvents));
    }

    #[test]
    fn test_drill_routing() {
        let cx = EventCx::new(test_support::context());
        let mut root = root();
        let key = DrillKey::LogGroup {
            group: "/aws/lambda/orders".into(),
        };
        assert!(root.configure(PageKind::LogGroups, PaneKind::LogStreams, &key, &cx));
        assert!(!root.configure(PageKind::LogGroups, PaneKind::Stacks, &key, &cx));
        assert!(!root.configure(PageKind::Stacks, PaneKind::Stacks, &key, &cx));
        assert!(root.focus(PageKind::LogGroups, PaneKind::LogStreams));
    }

    #[test]
    fn test_status_bar() {
        let ctx = test_support::context();
        let mut cx = EventCx::new(ctx.clone());
        let mut root = root();
        root.handle_key(&KeyBinding::alt(']'), &mut cx);
        root.tick(&mut cx, Instant::now());

        let mut terminal = Terminal::new(TestBackend::new(140, 10)).unwrap();
        terminal
            .draw(|frame| root.render(frame, frame.area(), &ctx))
            .unwrap();
        let text: String = terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|c| c.symbol())
            .collect();
        assert!(text.contains("CloudWatch Logs"));
        assert!(text.contains("Log Events"));
        assert!(text.contains("2/3"));
        assert!(text.contains("profile: unset"));
        assert!(text.contains("session: 59m") || text.contains("session: 60m"));
    }

    #[test]
    fn test_session_expired_label() {
        let ctx = test_support::context();
        let later = Instant::now() + Duration::from_secs(61 * 60);
        assert_eq!(session_label(&ctx, later), "session: expired");
    }
}
