// ── SpoolSync facade ──
//
// Entry point for consumers. Owns the bridge client, the shared settings
// cache and the modal presenter, and opens reconciliation sessions
// against them. Each session gets a fresh inventory lookup.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use spoolsync_api::BridgeClient;
use tracing::{debug, warn};

use crate::commit::CommitController;
use crate::config::SyncConfig;
use crate::correlate::correlate;
use crate::error::CoreError;
use crate::lookup::InventoryLookup;
use crate::model::{
    AmsPosition, BridgeHealth, PrinterInfo, RfidTag, SpoolId, SpoolRecord, SpoolSelection,
    TraySettings, TraySlot,
};
use crate::presenter::Presenter;
use crate::session::{ReconciliationSession, SessionParams};
use crate::store::SettingsCache;

/// One row of the tray overview.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrayOverview {
    pub tray: TraySlot,
    pub position: Option<AmsPosition>,
    pub spool: Option<SpoolId>,
    pub record: Option<SpoolRecord>,
    pub locked: bool,
    pub active: bool,
    pub tag: Option<RfidTag>,
}

/// Cheaply cloneable handle to one bridge.
#[derive(Clone)]
pub struct SpoolSync {
    inner: Arc<SpoolSyncInner>,
}

struct SpoolSyncInner {
    config: SyncConfig,
    client: BridgeClient,
    settings: SettingsCache,
    commits: CommitController,
    presenter: Presenter,
}

impl SpoolSync {
    /// Build the HTTP client from `config`. No request is made yet.
    pub fn new(config: SyncConfig) -> Result<Self, CoreError> {
        let client = BridgeClient::new(config.bridge_url.as_str(), &config.transport())?;
        Ok(Self::with_client(config, client))
    }

    pub fn with_client(config: SyncConfig, client: BridgeClient) -> Self {
        let settings = SettingsCache::new(client.clone());
        let commits = CommitController::new(client.clone(), settings.clone());
        Self {
            inner: Arc::new(SpoolSyncInner {
                config,
                client,
                settings,
                commits,
                presenter: Presenter::new(),
            }),
        }
    }

    pub fn config(&self) -> &SyncConfig {
        &self.inner.config
    }

    pub fn settings_cache(&self) -> &SettingsCache {
        &self.inner.settings
    }

    pub fn presenter(&self) -> &Presenter {
        &self.inner.presenter
    }

    // ── Reads ────────────────────────────────────────────────────────

    pub async fn settings(&self) -> Result<Arc<TraySettings>, CoreError> {
        self.inner.settings.get().await
    }

    pub async fn refresh_settings(&self) -> Result<Arc<TraySettings>, CoreError> {
        self.inner.settings.refresh().await
    }

    pub async fn spools(&self) -> Result<BTreeMap<SpoolId, SpoolRecord>, CoreError> {
        let spools = self.inner.client.list_spools().await?;
        Ok(spools
            .into_iter()
            .map(|(id, record)| (SpoolId::new(id), record))
            .collect())
    }

    /// Inventory record for `id`, fetched fresh. Failures read as absent.
    pub async fn spool(&self, id: SpoolId) -> Option<Arc<SpoolRecord>> {
        match self.inner.client.get_spool(id.get()).await {
            Ok(record) => record.map(Arc::new),
            Err(e) => {
                warn!(spool = %id, error = %e, "inventory lookup failed");
                None
            }
        }
    }

    pub async fn printer_info(&self) -> Result<PrinterInfo, CoreError> {
        Ok(self.inner.client.printer_info().await?.into())
    }

    pub async fn health(&self) -> Result<BridgeHealth, CoreError> {
        Ok(self.inner.client.health().await?)
    }

    pub async fn spool_for_tag(&self, tag: &RfidTag) -> Result<Option<SpoolRecord>, CoreError> {
        Ok(self.inner.client.spool_by_tray_uuid(tag.as_str()).await?)
    }

    /// Printer info, or `None` with a warning when telemetry is unreachable.
    async fn telemetry_or_warn(&self) -> Option<PrinterInfo> {
        match self.printer_info().await {
            Ok(info) => Some(info),
            Err(e) => {
                warn!(error = %e, "printer telemetry unavailable; continuing without RFID tags");
                None
            }
        }
    }

    /// One row per provisioned tray plus the external holder.
    pub async fn tray_overview(&self) -> Result<Vec<TrayOverview>, CoreError> {
        let settings = self.settings().await?;
        let printer = self.telemetry_or_warn().await;
        let telemetry = printer.as_ref().and_then(|p| p.telemetry.as_ref());

        let mut rows = Vec::new();
        for tray in settings.provisioned_slots() {
            let spool = settings.assignment(tray);
            let record = match spool {
                Some(id) => self.spool(id).await.map(|r| (*r).clone()),
                None => None,
            };
            rows.push(TrayOverview {
                tray,
                position: tray.ams_position(),
                spool,
                record,
                locked: settings.is_locked(tray),
                active: settings.active_tray == Some(tray),
                tag: correlate(tray, telemetry),
            });
        }
        Ok(rows)
    }

    // ── Sessions ─────────────────────────────────────────────────────

    /// Open and present a reconciliation session for `tray`.
    pub async fn open_session(&self, tray: TraySlot) -> Result<ReconciliationSession, CoreError> {
        let settings = self.settings().await?;
        let tray = tray.validate(settings.tray_count)?;

        let initial = settings
            .assignment(tray)
            .map_or(SpoolSelection::Unset, SpoolSelection::Spool);
        let tag = self
            .telemetry_or_warn()
            .await
            .and_then(|info| correlate(tray, info.telemetry.as_ref()));
        debug!(%tray, %initial, tag = ?tag, "opening session");

        let session = ReconciliationSession::open(SessionParams {
            tray,
            initial,
            locked: settings.is_locked(tray),
            tag,
            debounce: self.inner.config.debounce,
            capture_devices: self.inner.config.capture_devices,
            client: self.inner.client.clone(),
            inventory: Arc::new(InventoryLookup::new(self.inner.client.clone())),
            commits: self.inner.commits.clone(),
        });
        self.inner.presenter.present(session.clone());
        Ok(session)
    }
}
