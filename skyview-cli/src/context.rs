//! Process-wide application context.
//!
//! Created once at startup and handed to every view. The gateway bundle,
//! generation counter, cancellation token and session clock change only on
//! a profile switch.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;
use tracing::info;

use skyview_core::config::SkyviewConfig;
use skyview_core::error::GatewayResult;
use skyview_core::gateway::{GatewayBundle, GatewayFactory};
use skyview_core::keymap::KeyMap;
use skyview_core::paginator::Generation;
use skyview_core::profile::profile_label;

use crate::clipboard::Clipboard;

/// Set by background work when it has something to show; the event loop
/// takes it once per frame so several completions collapse into one draw.
#[derive(Clone, Debug, Default)]
pub struct RedrawSignal(Arc<AtomicBool>);

impl RedrawSignal {
    pub fn request(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn take(&self) -> bool {
        self.0.swap(false, Ordering::AcqRel)
    }
}

pub struct AppContext {
    pub config: SkyviewConfig,
    pub keymap: KeyMap,
    pub clipboard: Arc<dyn Clipboard>,
    pub redraw: RedrawSignal,
    /// Profiles offered by the picker, `default` first
    pub profiles: Vec<String>,
    factory: Arc<dyn GatewayFactory>,
    region: String,
    bundle: RwLock<Arc<GatewayBundle>>,
    generation: Generation,
    cancel: Mutex<CancellationToken>,
    session_started: Mutex<Instant>,
}

impl AppContext {
    pub fn new(
        config: SkyviewConfig,
        keymap: KeyMap,
        factory: Arc<dyn GatewayFactory>,
        profile: Option<String>,
        region: String,
        profiles: Vec<String>,
        clipboard: Arc<dyn Clipboard>,
    ) -> GatewayResult<Self> {
        let bundle = factory.build(profile.as_deref(), &region)?;
        info!(
            gateway = factory.name(),
            profile = profile_label(profile.as_deref()),
            region = %region,
            "gateway bundle ready"
        );
        Ok(Self {
            config,
            keymap,
            clipboard,
            redraw: RedrawSignal::default(),
            profiles,
            factory,
            region,
            bundle: RwLock::new(Arc::new(bundle)),
            generation: Generation::new(),
            cancel: Mutex::new(CancellationToken::new()),
            session_started: Mutex::new(Instant::now()),
        })
    }

    pub fn bundle(&self) -> Arc<GatewayBundle> {
        Arc::clone(&self.bundle.read().unwrap_or_else(PoisonError::into_inner))
    }

    pub fn generation(&self) -> Generation {
        self.generation.clone()
    }

    /// Token cancelled by the next profile switch.
    pub fn cancellation(&self) -> CancellationToken {
        self.cancel
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn active_profile(&self) -> Option<String> {
        self.bundle().profile.clone()
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    /// Rebuild the bundle for `profile`. On failure nothing changes.
    pub fn switch_profile(&self, profile: Option<String>) -> GatewayResult<()> {
        let bundle = self.factory.build(profile.as_deref(), &self.region)?;
        *self.bundle.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(bundle);
        let generation = self.generation.bump();

        let old = std::mem::replace(
            &mut *self.cancel.lock().unwrap_or_else(PoisonError::into_inner),
            CancellationToken::new(),
        );
        old.cancel();

        *self
            .session_started
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Instant::now();
        info!(
            profile = profile_label(profile.as_deref()),
            generation, "profile switched"
        );
        self.redraw.request();
        Ok(())
    }

    /// Time left in the credential session; `None` once expired.
    pub fn session_remaining(&self, now: Instant) -> Option<Duration> {
        let started = *self
            .session_started
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        self.config
            .session_duration()
            .checked_sub(now.saturating_duration_since(started))
            .filter(|left| !left.is_zero())
    }

    pub fn page_limit(&self, resource: &str) -> usize {
        self.config.pagination.limit(resource)
    }
}
