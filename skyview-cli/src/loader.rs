//! Background loads for a single view.
//!
//! `load_async` spawns the work on the runtime under a timeout and the
//! context's cancellation token; the result travels back over a oneshot
//! channel. The UI thread calls `poll` once per tick, which drives the
//! spinner in the view title and hands over the outcome when it arrives.
//! Starting a new load aborts the previous one, so the latest load always
//! wins.

use std::panic::AssertUnwindSafe;
use std::time::{Duration, Instant};

use futures::FutureExt;
use ratatui::Frame;
use ratatui::layout::Rect;
use throbber_widgets_tui::symbols::throbber::BRAILLE_ONE;
use throbber_widgets_tui::{Throbber, ThrobberState};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use uuid::Uuid;

use skyview_core::config::LoaderConfig;

use crate::context::RedrawSignal;
use crate::ui::theme::styles;

pub const TIMED_OUT_SUFFIX: &str = " [Timed out]";
pub const CANCELLED_SUFFIX: &str = " [Cancelled]";
pub const FAILED_MESSAGE: &str = "operation failed";

#[derive(Debug)]
pub enum LoadOutcome<T> {
    Done(T),
    TimedOut,
    Cancelled,
    /// The worker panicked or was torn down before reporting.
    Failed(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoadStatus {
    Idle,
    Loading,
    TimedOut,
    Cancelled,
}

struct Pending<T> {
    rx: oneshot::Receiver<LoadOutcome<T>>,
    handle: JoinHandle<()>,
    request_id: Uuid,
    started: Instant,
}

pub struct UiDataLoader<T> {
    name: &'static str,
    timeout: Duration,
    spinner_interval: Duration,
    pending: Option<Pending<T>>,
    status: LoadStatus,
    frame: usize,
    last_spin: Instant,
    throbber: ThrobberState,
}

impl<T> Drop for UiDataLoader<T> {
    fn drop(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.handle.abort();
        }
    }
}

impl<T: Send + 'static> UiDataLoader<T> {
    pub fn new(name: &'static str, config: &LoaderConfig) -> Self {
        Self {
            name,
            timeout: config.timeout(),
            spinner_interval: config.spinner_interval(),
            pending: None,
            status: LoadStatus::Idle,
            frame: 0,
            last_spin: Instant::now(),
            throbber: ThrobberState::default(),
        }
    }

    /// Run `work` in the background, replacing any load in progress.
    pub fn load_async<F>(&mut self, work: F, cancel: CancellationToken, redraw: RedrawSignal)
    where
        F: Future<Output = T> + Send + 'static,
    {
        if let Some(previous) = self.pending.take() {
            debug!(loader = self.name, request_id = %previous.request_id, "superseded");
            previous.handle.abort();
        }

        let (tx, rx) = oneshot::channel();
        let timeout = self.timeout;
        let request_id = Uuid::new_v4();
        let name = self.name;
        debug!(loader = name, request_id = %request_id, "load started");

        let handle = tokio::spawn(async move {
            let outcome = tokio::select! {
                _ = cancel.cancelled() => LoadOutcome::Cancelled,
                result = tokio::time::timeout(timeout, AssertUnwindSafe(work).catch_unwind()) => {
                    match result {
                        Ok(Ok(value)) => LoadOutcome::Done(value),
                        Ok(Err(_)) => LoadOutcome::Failed(FAILED_MESSAGE.to_string()),
                        Err(_) => LoadOutcome::TimedOut,
                    }
                }
            };
            let _ = tx.send(outcome);
            redraw.request();
        });

        self.pending = Some(Pending {
            rx,
            handle,
            request_id,
            started: Instant::now(),
        });
        self.status = LoadStatus::Loading;
        self.frame = 0;
    }

    /// Collect a finished load, if any. Call once per UI tick.
    pub fn poll(&mut self) -> Option<LoadOutcome<T>> {
        let pending = self.pending.as_mut()?;
        let outcome = match pending.rx.try_recv() {
            Ok(outcome) => outcome,
            Err(oneshot::error::TryRecvError::Empty) => return None,
            Err(oneshot::error::TryRecvError::Closed) => {
                LoadOutcome::Failed(FAILED_MESSAGE.to_string())
            }
        };
        let elapsed = pending.started.elapsed();
        let request_id = pending.request_id;
        self.pending = None;

        self.status = match &outcome {
            LoadOutcome::Done(_) | LoadOutcome::Failed(_) => LoadStatus::Idle,
            LoadOutcome::TimedOut => LoadStatus::TimedOut,
            LoadOutcome::Cancelled => LoadStatus::Cancelled,
        };
        match &outcome {
            LoadOutcome::Done(_) => {
                debug!(loader = self.name, request_id = %request_id, ?elapsed, "load finished")
            }
            LoadOutcome::TimedOut => {
                warn!(loader = self.name, request_id = %request_id, ?elapsed, "load timed out")
            }
            LoadOutcome::Cancelled => {
                debug!(loader = self.name, request_id = %request_id, "load cancelled")
            }
            LoadOutcome::Failed(reason) => {
                warn!(loader = self.name, request_id = %request_id, reason = %reason, "load failed")
            }
        }
        Some(outcome)
    }

    /// Advance the spinner. Returns true when the frame changed.
    pub fn spin(&mut self, now: Instant) -> bool {
        if self.status != LoadStatus::Loading
            || now.saturating_duration_since(self.last_spin) < self.spinner_interval
        {
            return false;
        }
        self.last_spin = now;
        self.frame = self.frame.wrapping_add(1);
        self.throbber.calc_next();
        true
    }

    pub fn is_loading(&self) -> bool {
        self.status == LoadStatus::Loading
    }

    /// `base` decorated with the spinner or the last terminal state.
    pub fn title(&self, base: &str) -> String {
        match self.status {
            LoadStatus::Idle => base.to_string(),
            LoadStatus::Loading => {
                let symbols = BRAILLE_ONE.symbols;
                format!("{base} {}", symbols[self.frame % symbols.len()])
            }
            LoadStatus::TimedOut => format!("{base}{TIMED_OUT_SUFFIX}"),
            LoadStatus::Cancelled => format!("{base}{CANCELLED_SUFFIX}"),
        }
    }

    /// Small throbber in the top-right corner of `area` while loading.
    pub fn render_throbber(&mut self, frame: &mut Frame, area: Rect) {
        if !self.is_loading() || area.width < 6 {
            return;
        }
        let rect = Rect::new(area.x + area.width.saturating_sub(4), area.y, 3, 1);
        let throbber = Throbber::default()
            .throbber_set(BRAILLE_ONE)
            .style(styles::text_muted())
            .throbber_style(styles::warn());
        frame.render_stateful_widget(throbber, rect, &mut self.throbber);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(timeout_ms: u64) -> LoaderConfig {
        LoaderConfig {
            timeout_ms,
            spinner_ms: 10,
        }
    }

    async fn wait<T: Send + 'static>(loader: &mut UiDataLoader<T>) -> LoadOutcome<T> {
        for _ in 0..200 {
            if let Some(outcome) = loader.poll() {
                return outcome;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("load never finished");
    }

    #[tokio::test]
    async fn test_done_restores_title() {
        let mut loader = UiDataLoader::new("test", &config(1000));
        let redraw = RedrawSignal::default();
        loader.load_async(async { 7 }, CancellationToken::new(), redraw.clone());
        assert!(loader.title("Functions").starts_with("Functions "));

        assert!(matches!(wait(&mut loader).await, LoadOutcome::Done(7)));
        assert_eq!(loader.title("Functions"), "Functions");
        assert!(redraw.take());
    }

    #[tokio::test]
    async fn test_timeout_annotates_title() {
        let mut loader = UiDataLoader::new("test", &config(20));
        loader.load_async(
            async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                1
            },
            CancellationToken::new(),
            RedrawSignal::default(),
        );
        assert!(matches!(wait(&mut loader).await, LoadOutcome::TimedOut));
        assert_eq!(loader.title("Items"), "Items [Timed out]");
    }

    #[tokio::test]
    async fn test_cancel_drops_result() {
        let mut loader = UiDataLoader::new("test", &config(1000));
        let token = CancellationToken::new();
        loader.load_async(
            async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                1
            },
            token.clone(),
            RedrawSignal::default(),
        );
        token.cancel();
        assert!(matches!(wait(&mut loader).await, LoadOutcome::Cancelled));
        assert_eq!(loader.title("Items"), "Items [Cancelled]");
    }

    #[tokio::test]
    async fn test_panic_is_contained() {
        let mut loader: UiDataLoader<u32> = UiDataLoader::new("test", &config(1000));
        loader.load_async(
            async {
                let missing: Option<u32> = None;
                missing.expect("boom")
            },
            CancellationToken::new(),
            RedrawSignal::default(),
        );
        assert!(matches!(wait(&mut loader).await, LoadOutcome::Failed(_)));
        assert!(!loader.is_loading());
    }

    #[tokio::test]
    async fn test_newer_load_wins() {
        let mut loader = UiDataLoader::new("test", &config(1000));
        loader.load_async(
            async {
                tokio::time::sleep(Duration::from_millis(50)).await;
                "old"
            },
            CancellationToken::new(),
            RedrawSignal::default(),
        );
        loader.load_async(async { "new" }, CancellationToken::new(), RedrawSignal::default());
        assert!(matches!(wait(&mut loader).await, LoadOutcome::Done("new")));
        tokio::time::sleep(Duration::from_millis(80)).await;
        assert!(loader.poll().is_none());
    }

    #[tokio::test]
    async fn test_spinner_advances_only_while_loading() {
        let mut loader = UiDataLoader::new("test", &config(1000));
        let start = Instant::now();
        assert!(!loader.spin(start + Duration::from_secs(1)));
        loader.load_async(
            async {
                tokio::time::sleep(Duration::from_secs(1)).await;
            },
            CancellationToken::new(),
            RedrawSignal::default(),
        );
        let before = loader.title("T");
        assert!(loader.spin(Instant::now() + Duration::from_millis(20)));
        assert_ne!(loader.title("T"), before);
    }
}
