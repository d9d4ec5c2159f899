//! One page of a service: a set of panes, a focus ring over them and a
//! modal message prompt.
//!
//! Each service implements [`PageBody`] for its pages. The surrounding
//! [`ServicePageView`] owns everything the pages share: pane focus with
//! Ctrl-J/K/H/L, the resizable split, and surfacing of messages recorded
//! on the [`EventCx`].

use std::time::Instant;

use ratatui::Frame;
use ratatui::layout::{Constraint, Layout, Rect};
use tracing::debug;

use skyview_core::drill::{DrillKey, PageKind, PaneKind};
use skyview_core::keymap::{Action, KeyBinding};
use skyview_core::navigation::NavigationRing;

use crate::ui::component::{EventCx, KeyOutcome, MessageKind};
use crate::ui::overlay::MessagePrompt;

pub const DEFAULT_SPLIT: u16 = 50;
const SPLIT_STEP: u16 = 5;
const SPLIT_MIN: u16 = 20;
const SPLIT_MAX: u16 = 80;

pub trait PageBody: Send {
    fn kind(&self) -> PageKind;

    /// Focusable panes in ring order; the first one is focused initially.
    fn panes(&self) -> Vec<PaneKind>;

    fn handle_key(&mut self, pane: PaneKind, key: &KeyBinding, cx: &mut EventCx) -> KeyOutcome;

    fn tick(&mut self, cx: &mut EventCx, now: Instant);

    /// `split` is the share of the first region, in percent.
    fn render(&mut self, frame: &mut Frame, area: Rect, focus: PaneKind, split: u16);

    /// Install a drill key on `pane`. False when the pane is not ours.
    fn configure(&mut self, pane: PaneKind, key: &DrillKey, cx: &EventCx) -> bool;

    fn refresh(&mut self, pane: PaneKind, reset: bool, cx: &EventCx);

    /// First time the page becomes visible.
    fn activate(&mut self, _cx: &EventCx) {}

    fn status(&self, pane: PaneKind) -> String;

    /// A form or editor inside the page wants every key.
    fn is_capturing(&self) -> bool {
        false
    }
}

/// Split `area` in two at `split` percent.
pub fn split_areas(area: Rect, split: u16, vertical: bool) -> [Rect; 2] {
    let constraints = [
        Constraint::Percentage(split),
        Constraint::Percentage(100 - split),
    ];
    if vertical {
        Layout::vertical(constraints).areas(area)
    } else {
        Layout::horizontal(constraints).areas(area)
    }
}

pub struct ServicePageView {
    body: Box<dyn PageBody>,
    ring: NavigationRing<PaneKind>,
    split: u16,
    prompt: Option<MessagePrompt>,
    activated: bool,
}

impl ServicePageView {
    pub fn new(body: Box<dyn PageBody>) -> Self {
        let ring = NavigationRing::new(body.panes());
        Self {
            body,
            ring,
            split: DEFAULT_SPLIT,
            prompt: None,
            activated: false,
        }
    }

    pub fn kind(&self) -> PageKind {
        self.body.kind()
    }

    pub fn focused_pane(&self) -> Option<PaneKind> {
        self.ring.last_focused().copied()
    }

    pub fn owns(&self, pane: PaneKind) -> bool {
        self.ring.views().contains(&pane)
    }

    pub fn focus_pane(&mut self, pane: PaneKind) -> bool {
        self.ring.focus(&pane)
    }

    pub fn split(&self) -> u16 {
        self.split
    }

    pub fn message(&self) -> Option<&MessagePrompt> {
        self.prompt.as_ref()
    }

    pub fn display_message(&mut self, kind: MessageKind, text: impl Into<String>) {
        self.prompt = Some(MessagePrompt::new(kind, text));
    }

    /// Load the page's top-level data the first time it is shown.
    pub fn activate(&mut self, cx: &mut EventCx) {
        if !self.activated {
            self.activated = true;
            debug!(page = self.kind().title(), "page activated");
            self.body.activate(cx);
            self.surface_messages(cx);
        }
    }

    /// Forget the first activation so the next one reloads.
    pub fn deactivate(&mut self) {
        self.activated = false;
    }

    /// Typed keys belong to the page (a filter or text field is open).
    pub fn is_capturing(&self) -> bool {
        self.prompt.is_none() && self.body.is_capturing()
    }

    pub fn configure(&mut self, pane: PaneKind, key: &DrillKey, cx: &EventCx) -> bool {
        self.body.configure(pane, key, cx)
    }

    pub fn refresh(&mut self, pane: PaneKind, reset: bool, cx: &EventCx) {
        self.body.refresh(pane, reset, cx);
    }

    fn surface_messages(&mut self, cx: &mut EventCx) {
        if let Some((kind, text)) = cx.take_messages().pop() {
            self.display_message(kind, text);
            cx.mark_dirty();
        }
    }

    pub fn handle_key(&mut self, key: &KeyBinding, cx: &mut EventCx) -> KeyOutcome {
        if let Some(prompt) = &self.prompt {
            if prompt.handle_key(key) {
                self.prompt = None;
            }
            return KeyOutcome::Consumed;
        }
        let Some(pane) = self.focused_pane() else {
            return KeyOutcome::Ignored;
        };

        let outcome = if self.body.is_capturing() {
            self.body.handle_key(pane, key, cx)
        } else if cx.is(Action::FocusDown, key) || cx.is(Action::FocusRight, key) {
            self.ring.forward();
            KeyOutcome::Consumed
        } else if cx.is(Action::FocusUp, key) || cx.is(Action::FocusLeft, key) {
            self.ring.back();
            KeyOutcome::Consumed
        } else if cx.is(Action::GrowSplit, key) {
            self.split = (self.split + SPLIT_STEP).min(SPLIT_MAX);
            KeyOutcome::Consumed
        } else if cx.is(Action::ShrinkSplit, key) {
            self.split = self.split.saturating_sub(SPLIT_STEP).max(SPLIT_MIN);
            KeyOutcome::Consumed
        } else if cx.is(Action::ResetSplit, key) {
            self.split = DEFAULT_SPLIT;
            KeyOutcome::Consumed
        } else {
            self.body.handle_key(pane, key, cx)
        };
        self.surface_messages(cx);
        outcome
    }

    pub fn tick(&mut self, cx: &mut EventCx, now: Instant) {
        self.body.tick(cx, now);
        self.surface_messages(cx);
    }

    pub fn status(&self) -> String {
        self.focused_pane()
            .map(|pane| self.body.status(pane))
            .unwrap_or_default()
    }

    pub fn render(&mut self, frame: &mut Frame, area: Rect) {
        if let Some(pane) = self.focused_pane() {
            self.body.render(frame, area, pane, self.split);
        }
        if let Some(prompt) = &self.prompt {
            prompt.render(frame, area);
        }
    }
}


#[cfg(test)]
mod tests {
    use super::test_body::RecordingBody;
    use super::*;
    use crate::context::test_support;
    use skyview_core::keymap::KeyName;

    fn view() -> ServicePageView {
        ServicePageView::new(Box::new(RecordingBody::new(
            PageKind::Vpcs,
            &[PaneKind::Vpcs, PaneKind::Subnets],
        )))
    }

    #[test]
    fn test_focus_ring_wraps() {
        let mut cx = EventCx::new(test_support::context());
        let mut page = view();
        assert_eq!(page.focused_pane(), Some(PaneKind::Vpcs));
        page.handle_key(&KeyBinding::ctrl('j'), &mut cx);
        assert_eq!(page.focused_pane(), Some(PaneKind::Subnets));
        page.handle_key(&KeyBinding::ctrl('l'), &mut cx);
        assert_eq!(page.focused_pane(), Some(PaneKind::Vpcs));
        page.handle_key(&KeyBinding::ctrl('k'), &mut cx);
        assert_eq!(page.focused_pane(), Some(PaneKind::Subnets));
        assert_eq!(page.status(), "Subnets status");
    }

    #[test]
    fn test_split_resize_is_clamped() {
        let mut cx = EventCx::new(test_support::context());
        let mut page = view();
        for _ in 0..20 {
            page.handle_key(&KeyBinding::alt('j'), &mut cx);
        }
        assert_eq!(page.split(), SPLIT_MAX);
        for _ in 0..20 {
            page.handle_key(&KeyBinding::alt('k'), &mut cx);
        }
        assert_eq!(page.split(), SPLIT_MIN);
        page.handle_key(&KeyBinding::alt('0'), &mut cx);
        assert_eq!(page.split(), DEFAULT_SPLIT);
    }

    #[test]
    fn test_error_from_tick_becomes_modal() {
        let mut cx = EventCx::new(test_support::context());
        let mut body = RecordingBody::new(PageKind::Vpcs, &[PaneKind::Vpcs]);
        body.fail_on_tick = Some("vpc: Throttling: slow down".into());
        let mut page = ServicePageView::new(Box::new(body));

        page.tick(&mut cx, Instant::now());
        let prompt = page.message().cloned().unwrap();
        assert_eq!(prompt.kind, MessageKind::Error);
        assert_eq!(prompt.text, "vpc: Throttling: slow down");

        // The modal swallows keys until dismissed.
        assert!(page.handle_key(&KeyBinding::ctrl('j'), &mut cx).consumed());
        page.handle_key(&KeyBinding::plain(KeyName::Enter), &mut cx);
        assert!(page.message().is_none());
        assert_eq!(page.focused_pane(), Some(PaneKind::Vpcs));
    }

    #[test]
    fn test_activate_once() {
        let mut cx = EventCx::new(test_support::context());
        let mut page = view();
        page.activate(&mut cx);
        page.activate(&mut cx);
        assert!(page.owns(PaneKind::Subnets));
        assert!(!page.owns(PaneKind::Stacks));
        assert!(page.focus_pane(PaneKind::Subnets));
        assert!(!page.focus_pane(PaneKind::Stacks));
    }
}
