//! Named floating layers stacked over a base page.
//!
//! Each visible overlay remembers the focus that was current when it was
//! shown. Hiding it hands that focus back. Only the top overlay holds focus.

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OverlayTransition<F> {
    Shown,
    /// Focus to restore on the layer below.
    Hidden { restore: F },
    /// Name was never registered; nothing changed.
    Unknown,
}

#[derive(Clone, Debug)]
pub struct OverlayStack<N, F> {
    registered: Vec<N>,
    visible: Vec<(N, F)>,
}

impl<N, F> Default for OverlayStack<N, F> {
    fn default() -> Self {
        Self {
            registered: Vec::new(),
            visible: Vec::new(),
        }
    }
}

impl<N: Copy + PartialEq, F: Clone> OverlayStack<N, F> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: N) {
        if !self.registered.contains(&name) {
            self.registered.push(name);
        }
    }

    pub fn is_registered(&self, name: N) -> bool {
        self.registered.contains(&name)
    }

    pub fn is_visible(&self, name: N) -> bool {
        self.visible.iter().any(|(n, _)| *n == name)
    }

    pub fn top(&self) -> Option<N> {
        self.visible.last().map(|(n, _)| *n)
    }

    pub fn is_empty(&self) -> bool {
        self.visible.is_empty()
    }

    /// Visible overlays, bottom first.
    pub fn visible(&self) -> impl Iterator<Item = N> + '_ {
        self.visible.iter().map(|(n, _)| *n)
    }

    /// Show `name` on top, remembering `focus`. Showing a visible overlay
    /// is a no-op.
    pub fn show(&mut self, name: N, focus: F) -> OverlayTransition<F> {
        if !self.is_registered(name) {
            return OverlayTransition::Unknown;
        }
        if !self.is_visible(name) {
            self.visible.push((name, focus));
        }
        OverlayTransition::Shown
    }

    /// Hide `name` and return the focus it remembered. Hiding an overlay
    /// below the top returns `None`: focus stays on the top layer.
    pub fn hide(&mut self, name: N) -> Option<F> {
        let i = self.visible.iter().position(|(n, _)| *n == name)?;
        let (_, restore) = self.visible.remove(i);
        // The layer above pointed at this overlay; hand it our focus instead.
        match self.visible.get_mut(i) {
            Some((_, above)) => {
                *above = restore;
                None
            }
            None => Some(restore),
        }
    }

    pub fn toggle(&mut self, name: N, focus: F) -> OverlayTransition<F> {
        if self.is_visible(name) {
            match self.hide(name) {
                Some(restore) => OverlayTransition::Hidden { restore },
                None => OverlayTransition::Hidden { restore: focus },
            }
        } else {
            self.show(name, focus)
        }
    }

    /// Escape: hide the topmost overlay.
    pub fn hide_top(&mut self) -> Option<(N, F)> {
        self.visible.pop()
    }

    pub fn hide_all(&mut self) -> Option<F> {
        let first = self.visible.first().map(|(_, f)| f.clone());
        self.visible.clear();
        first
    }
}
