// ── Tray settings cache ──
//
// Process-wide owner of the tray -> spool assignment map. Readers get the
// cached snapshot; only a successful commit marks it stale, and the next
// read refetches from the bridge.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use spoolsync_api::BridgeClient;
use tokio::sync::{Mutex, watch};
use tracing::debug;

use crate::error::CoreError;
use crate::model::TraySettings;

/// Cheaply cloneable handle to the shared settings snapshot.
#[derive(Clone)]
pub struct SettingsCache {
    inner: Arc<SettingsInner>,
}

struct SettingsInner {
    client: BridgeClient,
    current: watch::Sender<Option<Arc<TraySettings>>>,
    /// Bumped by every invalidation.
    generation: AtomicU64,
    /// Generation the current snapshot was fetched under.
    fetched: AtomicU64,
    /// Serializes fetches so concurrent readers share one request.
    fetch_lock: Mutex<()>,
    last_refresh: watch::Sender<Option<DateTime<Utc>>>,
}

impl SettingsCache {
    pub fn new(client: BridgeClient) -> Self {
        let (current, _) = watch::channel(None);
        let (last_refresh, _) = watch::channel(None);
        Self {
            inner: Arc::new(SettingsInner {
                client,
                current,
                generation: AtomicU64::new(1),
                fetched: AtomicU64::new(0),
                fetch_lock: Mutex::new(()),
                last_refresh,
            }),
        }
    }

    /// The cached settings, fetching them first if absent or stale.
    pub async fn get(&self) -> Result<Arc<TraySettings>, CoreError> {
        if let Some(fresh) = self.fresh() {
            return Ok(fresh);
        }
        let _guard = self.inner.fetch_lock.lock().await;
        // Another caller may have refreshed while we waited.
        if let Some(fresh) = self.fresh() {
            return Ok(fresh);
        }
        self.fetch().await
    }

    /// Refetch unconditionally.
    pub async fn refresh(&self) -> Result<Arc<TraySettings>, CoreError> {
        let _guard = self.inner.fetch_lock.lock().await;
        self.fetch().await
    }

    /// Mark the snapshot stale. Subscribers keep the old value until the
    /// next read refetches.
    pub(crate) fn invalidate(&self) {
        debug!("tray settings invalidated");
        self.inner.generation.fetch_add(1, Ordering::AcqRel);
    }

    /// Last fetched snapshot, stale or not.
    pub fn snapshot(&self) -> Option<Arc<TraySettings>> {
        self.inner.current.borrow().clone()
    }

    pub fn is_stale(&self) -> bool {
        self.inner.fetched.load(Ordering::Acquire) != self.inner.generation.load(Ordering::Acquire)
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Arc<TraySettings>>> {
        self.inner.current.subscribe()
    }

    pub fn last_refresh(&self) -> Option<DateTime<Utc>> {
        *self.inner.last_refresh.borrow()
    }

    fn fresh(&self) -> Option<Arc<TraySettings>> {
        if self.is_stale() {
            return None;
        }
        self.snapshot()
    }

    /// A snapshot only counts as fresh if no invalidation landed while the
    /// request was in flight.
    async fn fetch(&self) -> Result<Arc<TraySettings>, CoreError> {
        let generation = self.inner.generation.load(Ordering::Acquire);
        let raw = self.inner.client.get_settings().await?;
        let settings = Arc::new(TraySettings::from(raw));
        debug!(
            tray_count = settings.tray_count,
            assigned = settings.assignments.len(),
            "tray settings refreshed"
        );

        self.inner.current.send_replace(Some(Arc::clone(&settings)));
        self.inner.fetched.store(generation, Ordering::Release);
        self.inner.last_refresh.send_replace(Some(Utc::now()));
        Ok(settings)
    }
}
