//! Event plumbing shared by every view.
//!
//! Views never call each other. Key handlers and ticks receive an
//! [`EventCx`] and record effects on it (show a message, drill into a
//! selection, quit); the owner of the view drains them afterwards.

use std::sync::Arc;

use skyview_core::drill::{DrillStep, Selection};
use skyview_core::keymap::{Action, KeyBinding, KeyMap};

use crate::context::AppContext;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MessageKind {
    Error,
    Info,
}

#[derive(Clone, Debug)]
pub enum Effect {
    Drill(Selection),
    /// A ready-made plan, for navigation that is not a row drill.
    Steps(Vec<DrillStep>),
    Message(MessageKind, String),
    Quit,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyOutcome {
    Consumed,
    Ignored,
}

impl KeyOutcome {
    pub fn consumed(self) -> bool {
        self == KeyOutcome::Consumed
    }
}

pub struct EventCx {
    pub ctx: Arc<AppContext>,
    effects: Vec<Effect>,
    dirty: bool,
}

impl EventCx {
    pub fn new(ctx: Arc<AppContext>) -> Self {
        Self {
            ctx,
            effects: Vec::new(),
            dirty: false,
        }
    }

    pub fn keymap(&self) -> &KeyMap {
        &self.ctx.keymap
    }

    pub fn is(&self, action: Action, key: &KeyBinding) -> bool {
        self.ctx.keymap.is(action, key)
    }

    pub fn drill(&mut self, selection: Selection) {
        self.effects.push(Effect::Drill(selection));
    }

    pub fn steps(&mut self, steps: Vec<DrillStep>) {
        self.effects.push(Effect::Steps(steps));
    }

    pub fn error(&mut self, text: impl Into<String>) {
        self.effects.push(Effect::Message(MessageKind::Error, text.into()));
    }

    pub fn info(&mut self, text: impl Into<String>) {
        self.effects.push(Effect::Message(MessageKind::Info, text.into()));
    }

    pub fn quit(&mut self) {
        self.effects.push(Effect::Quit);
    }

    /// Something visible changed during this tick.
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    /// Remove and return pending messages, leaving other effects queued.
    pub fn take_messages(&mut self) -> Vec<(MessageKind, String)> {
        let mut messages = Vec::new();
        self.effects.retain(|effect| match effect {
            Effect::Message(kind, text) => {
                messages.push((*kind, text.clone()));
                false
            }
            _ => true,
        });
        messages
    }

    pub fn take_effects(&mut self) -> Vec<Effect> {
        std::mem::take(&mut self.effects)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::test_support;

    #[test]
    fn test_take_messages_keeps_other_effects() {
        let mut cx = EventCx::new(test_support::context());
        cx.error("boom");
        cx.quit();
        cx.info("hello");

        let messages = cx.take_messages();
        assert_eq!(
            messages,
            vec![
                (MessageKind::Error, "boom".to_string()),
                (MessageKind::Info, "hello".to_string())
            ]
        );
        let rest = cx.take_effects();
        assert_eq!(rest.len(), 1);
        assert!(matches!(rest[0], Effect::Quit));
    }
}
