//! Stateful cursor and cache over one remote list operation.
//!
//! A `PaginatorSource` remembers the parameters that produced its buffer, the
//! last cursor and whether more pages exist. `reset` installs new parameters
//! and re-arms the source; `next` advances by one page.
//!
//! At most one fetch is in flight per source and parameter set. A second
//! `next` issued while one is pending is coalesced and returns no items.
//! Results that arrive after a `reset` (or after a profile switch bumped the
//! shared [`Generation`]) are dropped.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::future::BoxFuture;
use tracing::debug;

use crate::error::GatewayResult;
use crate::gateway::{Cursor, Page};

/// Process-wide counter bumped whenever the gateway bundle is replaced.
#[derive(Clone, Debug, Default)]
pub struct Generation(Arc<AtomicU64>);

impl Generation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> u64 {
        self.0.load(Ordering::Acquire)
    }

    /// Returns the new generation.
    pub fn bump(&self) -> u64 {
        self.0.fetch_add(1, Ordering::AcqRel) + 1
    }
}

pub type FetchFn<P, T> =
    Arc<dyn Fn(P, Option<Cursor>) -> BoxFuture<'static, GatewayResult<Page<T>>> + Send + Sync>;

struct PageState<P, T> {
    params: P,
    cursor: Option<Cursor>,
    items: Vec<T>,
    has_more: bool,
    pages: usize,
    /// Bumped by every reset; fetches started under an older epoch are stale.
    epoch: u64,
    in_flight: Option<u64>,
    seen_generation: u64,
}

impl<P, T> PageState<P, T> {
    fn rearm(&mut self) {
        self.cursor = None;
        self.items.clear();
        self.has_more = true;
        self.pages = 0;
        self.epoch += 1;
    }
}

struct Inner<P, T> {
    name: &'static str,
    fetch: FetchFn<P, T>,
    state: Mutex<PageState<P, T>>,
    generation: Option<Generation>,
}

pub struct PaginatorSource<P, T> {
    inner: Arc<Inner<P, T>>,
}

impl<P, T> Clone for PaginatorSource<P, T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<P, T> PaginatorSource<P, T> {
    fn lock(&self) -> MutexGuard<'_, PageState<P, T>> {
        self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn generation_moved(&self, state: &PageState<P, T>) -> bool {
        self.inner
            .generation
            .as_ref()
            .is_some_and(|g| g.current() != state.seen_generation)
    }

    fn sync_generation(&self, state: &mut PageState<P, T>) {
        if self.generation_moved(state) {
            let current = self.inner.generation.as_ref().map(Generation::current).unwrap_or(0);
            debug!(source = self.inner.name, generation = current, "paginator invalidated");
            state.seen_generation = current;
            state.rearm();
        }
    }

    /// True when the buffer predates the current generation. The next fetch
    /// starts over from the first page.
    pub fn is_stale(&self) -> bool {
        let state = self.lock();
        self.generation_moved(&state)
    }
}

struct InFlight<'a, P, T> {
    source: &'a PaginatorSource<P, T>,
    epoch: u64,
}

impl<P, T> Drop for InFlight<'_, P, T> {
    fn drop(&mut self) {
        let mut state = self.source.lock();
        if state.in_flight == Some(self.epoch) {
            state.in_flight = None;
        }
    }
}

impl<P, T> PaginatorSource<P, T>
where
    P: Clone + Send + 'static,
    T: Clone + Send + 'static,
{
    pub fn new<F>(name: &'static str, params: P, fetch: F) -> Self
    where
        F: Fn(P, Option<Cursor>) -> BoxFuture<'static, GatewayResult<Page<T>>>
            + Send
            + Sync
            + 'static,
    {
        Self::build(name, params, None, Arc::new(fetch))
    }

    /// A source tied to a generation counter. A bump empties the buffer
    /// before the next fetch.
    pub fn tracked<F>(name: &'static str, params: P, generation: Generation, fetch: F) -> Self
    where
        F: Fn(P, Option<Cursor>) -> BoxFuture<'static, GatewayResult<Page<T>>>
            + Send
            + Sync
            + 'static,
    {
        Self::build(name, params, Some(generation), Arc::new(fetch))
    }

    fn build(
        name: &'static str,
        params: P,
        generation: Option<Generation>,
        fetch: FetchFn<P, T>,
    ) -> Self {
        let seen_generation = generation.as_ref().map(Generation::current).unwrap_or(0);
        Self {
            inner: Arc::new(Inner {
                name,
                fetch,
                state: Mutex::new(PageState {
                    params,
                    cursor: None,
                    items: Vec::new(),
                    has_more: true,
                    pages: 0,
                    epoch: 0,
                    in_flight: None,
                    seen_generation,
                }),
                generation,
            }),
        }
    }

    pub fn name(&self) -> &'static str {
        self.inner.name
    }

    /// Install new parameters, drop the buffer and cursor, arm "has more".
    pub fn reset(&self, params: P) {
        let mut state = self.lock();
        state.params = params;
        state.rearm();
    }

    /// Re-arm with the current parameters.
    pub fn rewind(&self) {
        self.lock().rearm();
    }

    /// Fetch the next page. Returns the new items only.
    pub async fn next(&self) -> GatewayResult<Vec<T>> {
        let (params, cursor, epoch) = {
            let mut state = self.lock();
            self.sync_generation(&mut state);
            if !state.has_more || state.in_flight == Some(state.epoch) {
                return Ok(Vec::new());
            }
            state.in_flight = Some(state.epoch);
            (state.params.clone(), state.cursor.clone(), state.epoch)
        };
        let _guard = InFlight {
            source: self,
            epoch,
        };

        debug!(source = self.inner.name, cursor = ?cursor, "fetching page");
        let page = (self.inner.fetch)(params, cursor).await?;

        let mut state = self.lock();
        self.sync_generation(&mut state);
        if state.epoch != epoch {
            debug!(source = self.inner.name, "discarding stale page");
            return Ok(Vec::new());
        }
        state.has_more = page.next_cursor.is_some();
        state.cursor = page.next_cursor;
        state.pages += 1;
        state.items.extend(page.items.iter().cloned());
        Ok(page.items)
    }

    /// Reset (optionally with new parameters) and fetch the first page.
    pub async fn first(&self, params: Option<P>) -> GatewayResult<Vec<T>> {
        match params {
            Some(params) => self.reset(params),
            None => self.rewind(),
        }
        self.next().await
    }

    pub fn items(&self) -> Vec<T> {
        self.lock().items.clone()
    }

    pub fn params(&self) -> P {
        self.lock().params.clone()
    }

    pub fn has_more(&self) -> bool {
        let state = self.lock();
        state.has_more || self.generation_moved(&state)
    }

    pub fn is_loading(&self) -> bool {
        let state = self.lock();
        state.in_flight == Some(state.epoch)
    }

    pub fn pages(&self) -> usize {
        self.lock().pages
    }

    pub fn len(&self) -> usize {
        self.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GatewayError;
    use std::sync::atomic::AtomicUsize;
    use tokio::sync::Notify;

    fn fetch_numbers(
        total: u32,
        limit: usize,
    ) -> impl Fn(u32, Option<Cursor>) -> BoxFuture<'static, GatewayResult<Page<u32>>> + Send + Sync
    {
        let all: Vec<u32> = (0..total).collect();
        move |offset: u32, cursor: Option<Cursor>| -> BoxFuture<'static, GatewayResult<Page<u32>>> {
            let shifted: Vec<u32> = all.iter().map(|n| n + offset).collect();
            Box::pin(async move { Ok(Page::from_slice(&shifted, limit, cursor.as_deref())) })
        }
    }

    fn numbers(total: u32, limit: usize) -> PaginatorSource<u32, u32> {
        PaginatorSource::new("numbers", 0, fetch_numbers(total, limit))
    }

    #[tokio::test]
    async fn test_next_until_exhausted() {
        let source = numbers(5, 2);
        assert_eq!(source.next().await.unwrap(), vec![0, 1]);
        assert_eq!(source.next().await.unwrap(), vec![2, 3]);
        assert!(source.has_more());
        assert_eq!(source.next().await.unwrap(), vec![4]);
        assert!(!source.has_more());
        assert!(source.next().await.unwrap().is_empty());
        assert_eq!(source.items(), vec![0, 1, 2, 3, 4]);
        assert_eq!(source.pages(), 3);
    }

    #[tokio::test]
    async fn test_reset_replaces_params_and_buffer() {
        let source = numbers(3, 2);
        source.next().await.unwrap();
        source.reset(10);
        assert!(source.items().is_empty());
        assert!(source.has_more());
        assert_eq!(source.next().await.unwrap(), vec![10, 11]);
        assert_eq!(source.params(), 10);
    }

    #[tokio::test]
    async fn test_error_keeps_state() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let source: PaginatorSource<(), u32> = PaginatorSource::new("flaky", (), move |_, cursor| {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            Box::pin(async move {
                if n == 1 {
                    Err(GatewayError::Throttled("slow down".into()))
                } else {
                    Ok(Page::from_slice(&[1u32, 2, 3], 1, cursor.as_deref()))
                }
            })
        });
        assert_eq!(source.next().await.unwrap(), vec![1]);
        assert!(matches!(source.next().await, Err(GatewayError::Throttled(_))));
        assert_eq!(source.items(), vec![1]);
        assert!(!source.is_loading());
        assert_eq!(source.next().await.unwrap(), vec![2]);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_concurrent_next_is_coalesced() {
        let gate = Arc::new(Notify::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let (g, c) = (Arc::clone(&gate), Arc::clone(&calls));
        let source: PaginatorSource<(), u32> = PaginatorSource::new("gated", (), move |_, _| {
            c.fetch_add(1, Ordering::SeqCst);
            let g = Arc::clone(&g);
            Box::pin(async move {
                g.notified().await;
                Ok(Page::last(vec![7]))
            })
        });

        let first = {
            let source = source.clone();
            tokio::spawn(async move { source.next().await })
        };
        while !source.is_loading() {
            tokio::task::yield_now().await;
        }
        assert!(source.next().await.unwrap().is_empty());
        gate.notify_one();
        assert_eq!(first.await.unwrap().unwrap(), vec![7]);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(source.items(), vec![7]);
    }

    #[tokio::test]
    async fn test_stale_page_after_reset_is_dropped() {
        let gate = Arc::new(Notify::new());
        let g = Arc::clone(&gate);
        let source: PaginatorSource<u32, u32> = PaginatorSource::new("stale", 1, move |p, _| {
            let g = Arc::clone(&g);
            Box::pin(async move {
                if p == 1 {
                    g.notified().await;
                }
                Ok(Page::last(vec![p]))
            })
        });

        let slow = {
            let source = source.clone();
            tokio::spawn(async move { source.next().await })
        };
        while !source.is_loading() {
            tokio::task::yield_now().await;
        }
        source.reset(2);
        assert_eq!(source.next().await.unwrap(), vec![2]);
        gate.notify_one();
        assert!(slow.await.unwrap().unwrap().is_empty());
        assert_eq!(source.items(), vec![2]);
    }

    #[tokio::test]
    async fn test_generation_bump_invalidates() {
        let generation = Generation::new();
        let source =
            PaginatorSource::tracked("numbers", 0, generation.clone(), fetch_numbers(4, 2));
        source.next().await.unwrap();
        source.next().await.unwrap();
        assert!(!source.has_more());

        generation.bump();
        assert!(source.is_stale());
        assert!(source.has_more());
        assert_eq!(source.next().await.unwrap(), vec![0, 1]);
        assert!(!source.is_stale());
        assert_eq!(source.items(), vec![0, 1]);
    }

    #[test]
    fn test_untracked_source_is_never_stale() {
        let source = numbers(2, 2);
        assert!(!source.is_stale());
    }
}
