//! Ordered focus ring over a set of focusable views.

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NavigationRing<V> {
    views: Vec<V>,
    index: usize,
}

impl<V> Default for NavigationRing<V> {
    fn default() -> Self {
        Self {
            views: Vec::new(),
            index: 0,
        }
    }
}

impl<V> NavigationRing<V> {
    pub fn new(views: Vec<V>) -> Self {
        Self { views, index: 0 }
    }

    /// Replace the ring; `initial` is clamped into range.
    pub fn update_ordered_views(&mut self, views: Vec<V>, initial: usize) {
        self.index = initial.min(views.len().saturating_sub(1));
        self.views = views;
    }

    pub fn forward(&mut self) -> Option<&V> {
        if self.views.is_empty() {
            return None;
        }
        self.index = (self.index + 1) % self.views.len();
        self.views.get(self.index)
    }

    pub fn back(&mut self) -> Option<&V> {
        if self.views.is_empty() {
            return None;
        }
        self.index = (self.index + self.views.len() - 1) % self.views.len();
        self.views.get(self.index)
    }

    /// The view at the current index.
    pub fn last_focused(&self) -> Option<&V> {
        self.views.get(self.index)
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn views(&self) -> &[V] {
        &self.views
    }

    pub fn len(&self) -> usize {
        self.views.len()
    }

    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }
}

impl<V: PartialEq> NavigationRing<V> {
    /// Move the index onto `view` if it is part of the ring.
    pub fn focus(&mut self, view: &V) -> bool {
        match self.views.iter().position(|v| v == view) {
            Some(i) => {
                self.index = i;
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wraps_both_ways() {
        let mut ring = NavigationRing::new(vec!["a", "b", "c"]);
        assert_eq!(ring.back(), Some(&"c"));
        assert_eq!(ring.forward(), Some(&"a"));
        ring.forward();
        ring.forward();
        assert_eq!(ring.index(), 2);
        assert_eq!(ring.forward(), Some(&"a"));
    }

    #[test]
    fn test_update_clamps_index() {
        let mut ring = NavigationRing::new(vec![1, 2]);
        ring.update_ordered_views(vec![5, 6, 7], 9);
        assert_eq!(ring.last_focused(), Some(&7));
        ring.update_ordered_views(Vec::new(), 3);
        assert_eq!(ring.index(), 0);
        assert_eq!(ring.forward(), None);
        assert_eq!(ring.last_focused(), None);
    }

    #[test]
    fn test_focus_by_value() {
        let mut ring = NavigationRing::new(vec!["table", "details"]);
        assert!(ring.focus(&"details"));
        assert_eq!(ring.index(), 1);
        assert!(!ring.focus(&"missing"));
        assert_eq!(ring.index(), 1);
    }
}
