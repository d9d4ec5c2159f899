//! The shell: service catalogue, quick switcher, profile picker and help,
//! plus execution of drill plans across services.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use ratatui::Frame;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use tracing::{debug, error, info, warn};

use skyview_core::drill::{DrillController, DrillStep, ServiceKind};
use skyview_core::keymap::{Action, KeyBinding};
use skyview_core::overlay::{OverlayStack, OverlayTransition};
use skyview_core::profile::profile_label;

use crate::context::AppContext;
use crate::services;
use crate::ui::component::{Effect, EventCx, MessageKind};
use crate::ui::overlay::{HelpOverlay, ListPicker, MessagePrompt, PickerEvent, centered_rect};
use crate::ui::root::{ServiceRoot, session_label};
use crate::ui::styles;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ShellOverlay {
    Help,
    QuickSwitcher,
    ProfilePicker,
}

fn service_entries() -> Vec<(String, ServiceKind)> {
    ServiceKind::ALL
        .iter()
        .map(|s| (s.label().to_string(), *s))
        .collect()
}

/// The root for `service`, built the first time it is needed.
fn root_for<'a>(
    roots: &'a mut HashMap<ServiceKind, ServiceRoot>,
    service: ServiceKind,
    cx: &EventCx,
) -> &'a mut ServiceRoot {
    roots.entry(service).or_insert_with(|| {
        debug!(service = service.label(), "building service root");
        services::root(service, cx)
    })
}

pub struct AppShell {
    cx: EventCx,
    roots: HashMap<ServiceKind, ServiceRoot>,
    /// `None` while the catalogue is showing
    active: Option<ServiceKind>,
    catalogue: ListPicker<ServiceKind>,
    switcher: ListPicker<ServiceKind>,
    profiles: ListPicker<String>,
    overlays: OverlayStack<ShellOverlay, Option<ServiceKind>>,
    help: HelpOverlay,
    message: Option<MessagePrompt>,
    should_quit: bool,
}

impl AppShell {
    pub fn new(ctx: Arc<AppContext>) -> Self {
        let profiles = ctx
            .profiles
            .iter()
            .map(|p| (p.clone(), p.clone()))
            .collect();
        let mut overlays = OverlayStack::new();
        overlays.register(ShellOverlay::Help);
        overlays.register(ShellOverlay::QuickSwitcher);
        overlays.register(ShellOverlay::ProfilePicker);
        Self {
            cx: EventCx::new(ctx),
            roots: HashMap::new(),
            active: None,
            catalogue: ListPicker::new("Services", service_entries()),
            switcher: ListPicker::new("Switch service", service_entries()),
            profiles: ListPicker::new("Profiles", profiles),
            overlays,
            help: HelpOverlay::new(),
            message: None,
            should_quit: false,
        }
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    #[cfg(test)]
    pub fn active_service(&self) -> Option<ServiceKind> {
        self.active
    }

    #[cfg(test)]
    pub fn root(&self, service: ServiceKind) -> Option<&ServiceRoot> {
        self.roots.get(&service)
    }

    #[cfg(test)]
    pub fn message(&self) -> Option<&MessagePrompt> {
        self.message.as_ref()
    }

    fn show_message(&mut self, kind: MessageKind, text: String) {
        self.message = Some(MessagePrompt::new(kind, text));
        self.cx.mark_dirty();
    }

    /// Show `service`, restoring whatever page and pane it had.
    pub fn enter(&mut self, service: ServiceKind) {
        info!(service = service.label(), "entering service");
        self.active = Some(service);
        root_for(&mut self.roots, service, &self.cx).enter(&mut self.cx);
        self.apply_effects();
    }

    pub fn back_to_catalogue(&mut self) {
        if let Some(service) = self.active.take() {
            self.catalogue.reset();
            self.catalogue.select_label(service.label());
        }
    }

    fn toggle(&mut self, overlay: ShellOverlay) {
        match overlay {
            ShellOverlay::QuickSwitcher => {
                self.switcher.reset();
                if let Some(service) = self.active {
                    self.switcher.select_label(service.label());
                }
            }
            ShellOverlay::ProfilePicker => {
                self.profiles.reset();
                if let Some(profile) = self.cx.ctx.active_profile() {
                    self.profiles.select_label(&profile);
                }
            }
            ShellOverlay::Help => {}
        }
        if let OverlayTransition::Hidden { restore } = self.overlays.toggle(overlay, self.active) {
            self.active = restore;
        }
    }

    /// Hide `overlay` and return to the service that was active when it
    /// opened.
    fn close(&mut self, overlay: ShellOverlay) {
        if let Some(restore) = self.overlays.hide(overlay) {
            self.active = restore;
        }
    }

    /// Rebuild the gateway bundle. Every page reloads when next shown; the
    /// visible one reloads now.
    pub fn switch_profile(&mut self, profile: String) {
        match self.cx.ctx.switch_profile(Some(profile.clone())) {
            Ok(()) => {
                for root in self.roots.values_mut() {
                    root.reset_pages();
                }
                if let Some(root) = self.active.and_then(|s| self.roots.get_mut(&s)) {
                    root.enter(&mut self.cx);
                }
                self.apply_effects();
            }
            Err(e) => {
                error!(profile = %profile, error = %e, "profile switch failed");
                self.show_message(
                    MessageKind::Error,
                    format!("Failed to switch to profile {profile}: {e}"),
                );
            }
        }
    }

    pub fn handle_key(&mut self, key: &KeyBinding) {
        if self.cx.is(Action::Quit, key) {
            self.should_quit = true;
            return;
        }
        self.cx.mark_dirty();

        if let Some(prompt) = &self.message {
            if prompt.handle_key(key) {
                self.message = None;
            }
            return;
        }

        match self.overlays.top() {
            Some(ShellOverlay::Help) => {
                if self.help.handle_key(key, &self.cx.ctx.keymap) {
                    self.close(ShellOverlay::Help);
                }
                return;
            }
            Some(overlay @ ShellOverlay::QuickSwitcher) => {
                if self.cx.is(Action::QuickSwitcher, key) {
                    self.close(overlay);
                    return;
                }
                match self.switcher.handle_key(key) {
                    PickerEvent::Chosen(service) => {
                        self.close(overlay);
                        self.enter(service);
                    }
                    PickerEvent::Closed => {
                        self.close(overlay);
                    }
                    PickerEvent::Consumed => {}
                }
                return;
            }
            Some(overlay @ ShellOverlay::ProfilePicker) => {
                if self.cx.is(Action::ProfilePicker, key) {
                    self.close(overlay);
                    return;
                }
                match self.profiles.handle_key(key) {
                    PickerEvent::Chosen(profile) => {
                        self.close(overlay);
                        self.switch_profile(profile);
                    }
                    PickerEvent::Closed => {
                        self.close(overlay);
                    }
                    PickerEvent::Consumed => {}
                }
                return;
            }
            None => {}
        }

        if self.cx.is(Action::QuickSwitcher, key) {
            self.toggle(ShellOverlay::QuickSwitcher);
            return;
        }
        if self.cx.is(Action::ProfilePicker, key) {
            self.toggle(ShellOverlay::ProfilePicker);
            return;
        }

        let Some(service) = self.active else {
            if self.cx.is(Action::Help, key) {
                self.toggle(ShellOverlay::Help);
                return;
            }
            if let PickerEvent::Chosen(service) = self.catalogue.handle_key(key) {
                self.enter(service);
            }
            return;
        };

        let root = root_for(&mut self.roots, service, &self.cx);
        if !root.is_capturing() && self.cx.is(Action::Help, key) {
            self.toggle(ShellOverlay::Help);
            return;
        }
        let outcome = root.handle_key(key, &mut self.cx);
        if !outcome.consumed() && self.cx.is(Action::Back, key) {
            self.back_to_catalogue();
        }
        self.apply_effects();
    }

    /// Tick every root so background loads land even on hidden services.
    /// True when something visible changed.
    pub fn tick(&mut self, now: Instant) -> bool {
        for root in self.roots.values_mut() {
            root.tick(&mut self.cx, now);
        }
        self.apply_effects();
        let redraw = self.cx.ctx.redraw.take();
        self.cx.take_dirty() || redraw
    }

    fn apply_effects(&mut self) {
        loop {
            let effects = self.cx.take_effects();
            if effects.is_empty() {
                return;
            }
            for effect in effects {
                match effect {
                    Effect::Drill(selection) => match DrillController::plan(&selection) {
                        Ok(steps) => {
                            info!(?selection, steps = steps.len(), "drill-through");
                            self.run_steps(steps);
                        }
                        Err(e) => {
                            warn!(error = %e, "drill-through rejected");
                            self.show_message(MessageKind::Error, e.to_string());
                        }
                    },
                    Effect::Steps(steps) => self.run_steps(steps),
                    Effect::Message(kind, text) => self.show_message(kind, text),
                    Effect::Quit => self.should_quit = true,
                }
            }
        }
    }

    /// Execute a plan against whichever roots own the addressed pages.
    fn run_steps(&mut self, steps: Vec<DrillStep>) {
        for step in steps {
            match step {
                DrillStep::Configure { target, key } => {
                    let root = root_for(&mut self.roots, target.page.service(), &self.cx);
                    if !root.configure(target.page, target.pane, &key, &self.cx) {
                        warn!(page = target.page.title(), pane = ?target.pane, "drill target not configured");
                    }
                }
                DrillStep::Refresh { target, reset } => {
                    root_for(&mut self.roots, target.page.service(), &self.cx).refresh(
                        target.page,
                        target.pane,
                        reset,
                        &self.cx,
                    );
                }
                DrillStep::SwitchPage(page) => {
                    let service = page.service();
                    self.active = Some(service);
                    let root = root_for(&mut self.roots, service, &self.cx);
                    root.switch_to(page, &mut self.cx);
                }
                DrillStep::FocusPane(target) => {
                    root_for(&mut self.roots, target.page.service(), &self.cx)
                        .focus(target.page, target.pane);
                }
            }
        }
        self.cx.mark_dirty();
    }

    fn header(&self, now: Instant) -> Line<'static> {
        let ctx = &self.cx.ctx;
        let sep = || Span::styled(" │ ", styles::text_muted());
        Line::from(vec![
            Span::styled(" skyview ", styles::accent()),
            sep(),
            Span::styled(
                format!("profile: {}", profile_label(ctx.active_profile().as_deref())),
                styles::info(),
            ),
            sep(),
            Span::styled(ctx.region().to_string(), styles::text_dim()),
            sep(),
            Span::styled(session_label(ctx, now), styles::warn()),
        ])
    }

    fn hints(&self) -> Line<'static> {
        let keymap = &self.cx.ctx.keymap;
        let mut spans = Vec::new();
        for (action, label) in [
            (Action::Confirm, "open"),
            (Action::QuickSwitcher, "switch"),
            (Action::ProfilePicker, "profile"),
            (Action::Help, "help"),
            (Action::Quit, "quit"),
        ] {
            spans.push(Span::styled(
                format!(" {} ", keymap.binding(action)),
                styles::key_hint(),
            ));
            spans.push(Span::styled(format!("{label} "), styles::text_dim()));
        }
        Line::from(spans)
    }

    fn render_catalogue(&mut self, frame: &mut Frame, area: Rect) {
        let [header, body, footer] = Layout::vertical([
            Constraint::Length(1),
            Constraint::Min(3),
            Constraint::Length(1),
        ])
        .areas(area);
        frame.render_widget(Paragraph::new(self.header(Instant::now())), header);
        let height = ServiceKind::ALL.len() as u16 + 4;
        self.catalogue
            .render_in(frame, centered_rect(body, 48, height), true);
        frame.render_widget(Paragraph::new(self.hints()), footer);
    }

    pub fn render(&mut self, frame: &mut Frame) {
        let area = frame.area();
        match self.active.and_then(|s| self.roots.get_mut(&s)) {
            Some(root) => root.render(frame, area, &self.cx.ctx),
            None => self.render_catalogue(frame, area),
        }

        for overlay in self.overlays.visible().collect::<Vec<_>>() {
            match overlay {
                ShellOverlay::QuickSwitcher => self.switcher.render_floating(frame, area),
                ShellOverlay::ProfilePicker => self.profiles.render_floating(frame, area),
                ShellOverlay::Help => self.help.render(frame, area, &self.cx.ctx.keymap),
            }
        }
        if let Some(prompt) = &self.message {
            prompt.render(frame, area);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::test_support;
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;
    use skyview_core::drill::{PageKind, PaneKind};
    use skyview_core::keymap::KeyName;
    use std::time::Duration;

    fn shell() -> AppShell {
        AppShell::new(test_support::context())
    }

    fn press(shell: &mut AppShell, key: KeyBinding) {
        shell.handle_key(&key);
    }

    fn type_text(shell: &mut AppShell, text: &str) {
        for c in text.chars() {
            press(shell, KeyBinding::ch(c));
        }
    }

    async fn settle(shell: &mut AppShell, done: impl Fn(&AppShell) -> bool) {
        for _ in 0..200 {
            shell.tick(Instant::now());
            if done(shell) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("shell did not settle");
    }

    fn screen(shell: &mut AppShell) -> String {
        let mut terminal = Terminal::new(TestBackend::new(120, 30)).unwrap();
        terminal.draw(|frame| shell.render(frame)).unwrap();
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|c| c.symbol())
            .collect()
    }

    #[test]
    fn test_catalogue_lists_every_service() {
        let mut shell = shell();
        let text = screen(&mut shell);
        for service in ServiceKind::ALL {
            assert!(text.contains(service.label()), "{}", service.label());
        }
        assert!(text.contains("profile: unset"));
    }

    #[tokio::test]
    async fn test_catalogue_search_enters_service() {
        let mut shell = shell();
        type_text(&mut shell, "dynamo");
        press(&mut shell, KeyBinding::plain(KeyName::Enter));
        assert_eq!(shell.active_service(), Some(ServiceKind::DynamoDb));
        assert_eq!(
            shell.root(ServiceKind::DynamoDb).and_then(ServiceRoot::current_page),
            Some(PageKind::Tables)
        );

        press(&mut shell, KeyBinding::plain(KeyName::Esc));
        assert_eq!(shell.active_service(), None);
        // The root is kept for the next visit.
        assert!(shell.root(ServiceKind::DynamoDb).is_some());
    }

    #[tokio::test]
    async fn test_function_drill_crosses_services() {
        let mut shell = shell();
        shell.enter(ServiceKind::Lambda);
        settle(&mut shell, |s| {
            s.root(ServiceKind::Lambda)
                .is_some_and(|r| !r.status_line(&s.cx.ctx).to_string().contains(" 0 loaded"))
        })
        .await;
        press(&mut shell, KeyBinding::plain(KeyName::Enter));

        assert_eq!(shell.active_service(), Some(ServiceKind::Logs));
        let logs = shell.roots.get_mut(&ServiceKind::Logs).unwrap();
        assert_eq!(logs.current_page(), Some(PageKind::LogGroups));
        let page = logs.page_mut(PageKind::LogGroups).unwrap();
        assert_eq!(page.focused_pane(), Some(PaneKind::LogStreams));
    }

    #[tokio::test]
    async fn test_quick_switcher() {
        let mut shell = shell();
        shell.enter(ServiceKind::S3);
        let switcher = KeyBinding {
            ctrl: true,
            ..KeyBinding::plain(KeyName::Space)
        };
        press(&mut shell, switcher);
        type_text(&mut shell, "dyn");
        press(&mut shell, KeyBinding::plain(KeyName::Esc));
        assert!(!screen(&mut shell).contains("Switch service"));
        assert_eq!(shell.active_service(), Some(ServiceKind::S3));

        press(&mut shell, switcher);
        assert!(screen(&mut shell).contains("Switch service"));
        type_text(&mut shell, "step");
        press(&mut shell, KeyBinding::plain(KeyName::Enter));
        assert_eq!(shell.active_service(), Some(ServiceKind::StepFunctions));

        press(&mut shell, switcher);
        press(&mut shell, switcher);
        assert!(!screen(&mut shell).contains("Switch service"));
        assert_eq!(shell.active_service(), Some(ServiceKind::StepFunctions));
    }

    #[tokio::test]
    async fn test_profile_picker_switches_bundle() {
        let mut shell = shell();
        shell.enter(ServiceKind::Ssm);
        let before = shell.cx.ctx.generation().current();

        press(&mut shell, KeyBinding::ctrl('a'));
        type_text(&mut shell, "staging");
        press(&mut shell, KeyBinding::plain(KeyName::Enter));

        assert_eq!(shell.cx.ctx.active_profile().as_deref(), Some("staging"));
        assert_eq!(shell.cx.ctx.generation().current(), before + 1);
        assert!(shell.message().is_none());
        assert!(screen(&mut shell).contains("profile: staging"));
    }

    #[test]
    fn test_failed_profile_switch_keeps_bundle() {
        let mut shell = shell();
        shell.switch_profile("invalid-creds".into());
        let message = shell.message().unwrap();
        assert_eq!(message.kind, MessageKind::Error);
        assert!(message.text.contains("InvalidClientTokenId"));
        assert_eq!(shell.cx.ctx.active_profile(), None);

        press(&mut shell, KeyBinding::plain(KeyName::Enter));
        assert!(shell.message().is_none());
    }

    #[test]
    fn test_help_and_quit() {
        let mut shell = shell();
        press(&mut shell, KeyBinding::ch('?'));
        assert!(screen(&mut shell).contains("Help"));
        press(&mut shell, KeyBinding::plain(KeyName::Esc));
        assert!(!screen(&mut shell).contains("Help -"));
        assert!(!shell.should_quit());

        press(&mut shell, KeyBinding::ctrl('c'));
        assert!(shell.should_quit());
    }
}
