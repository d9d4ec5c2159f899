use std::sync::{Mutex, PoisonError};

/// Destination for `y` copies. The system clipboard lives outside the
/// process; the dashboard only needs somewhere to put text.
pub trait Clipboard: Send + Sync {
    fn set_text(&self, text: String);
    #[cfg(test)]
    fn text(&self) -> Option<String>;
}

#[derive(Debug, Default)]
pub struct MemoryClipboard {
    contents: Mutex<Option<String>>,
}

impl MemoryClipboard {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Clipboard for MemoryClipboard {
    fn set_text(&self, text: String) {
        *self.contents.lock().unwrap_or_else(PoisonError::into_inner) = Some(text);
    }

    #[cfg(test)]
    fn text(&self) -> Option<String> {
        self.contents
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
