// ── Reconciliation session ──
//
// One open "change tray" interaction. The session owns the candidate
// selection, its debounced settled value, the inventory lookup for that
// value, scan mode and the last user-facing error. All state lives in a
// `watch` channel so callers can render from snapshots or await changes.
//
// Every background task (debounce timers, the settle listener, lookups)
// is scoped to the session's cancellation token and holds only a weak
// reference, so nothing outlives `close()`.

use std::sync::{Arc, Weak};
use std::time::Duration;

use serde::Serialize;
use spoolsync_api::BridgeClient;
use tokio::sync::{mpsc, watch};
use tokio_stream::wrappers::WatchStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::commit::{self, CommitController, CommitKind, CommitPhase, CommitPreconditions, CommitRequest};
use crate::correlate::correlate;
use crate::debounce::Debouncer;
use crate::error::CoreError;
use crate::lookup::InventoryLookup;
use crate::model::{LookupState, PrinterTelemetry, RfidTag, SpoolId, SpoolSelection, TraySlot};
use crate::resolver;

// ── State ────────────────────────────────────────────────────────────

/// Where the candidate comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ScanMode {
    #[default]
    Manual,
    /// Waiting for one decoded scan.
    Scanning,
}

/// Error text surfaced to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SessionError {
    #[error("Invalid QR code")]
    InvalidCode { code: String },
    #[error("{message}")]
    CommitRejected { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CloseReason {
    /// An assignment commit succeeded.
    Committed,
    Cancelled,
    /// The presenter dismissed the interaction.
    Dismissed,
    /// Another session was presented in its place.
    Replaced,
}

/// Observable session snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionState {
    pub tray: TraySlot,
    /// Latest raw selection (typed or scanned).
    pub candidate: SpoolSelection,
    /// Selection after the debounce window; lookups and commits use this.
    pub settled: SpoolSelection,
    #[serde(skip)]
    pub lookup: LookupState,
    pub scan_mode: ScanMode,
    pub scan_available: bool,
    pub last_error: Option<SessionError>,
    pub commit: CommitPhase,
    pub tag: Option<RfidTag>,
    pub locked: bool,
    pub closed: Option<CloseReason>,
}

/// Which actions the current state permits. Callers disable the rest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct SessionActions {
    pub commit: bool,
    pub clear: bool,
    pub bind: bool,
    pub scan: bool,
}

impl SessionState {
    fn new(tray: TraySlot, initial: SpoolSelection, locked: bool, tag: Option<RfidTag>, scan_available: bool) -> Self {
        Self {
            tray,
            candidate: initial,
            settled: initial,
            lookup: LookupState::Idle,
            scan_mode: ScanMode::Manual,
            scan_available,
            last_error: None,
            commit: CommitPhase::Idle,
            tag,
            locked,
            closed: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.closed.is_none()
    }

    /// The candidate has not reached the end of its debounce window.
    pub fn is_settling(&self) -> bool {
        self.candidate != self.settled
    }

    /// Settled and looked up: nothing is pending.
    pub fn is_quiescent(&self) -> bool {
        !self.is_settling() && !self.lookup.is_loading()
    }

    /// The commit an explicit "update" would submit.
    pub fn pending_commit(&self) -> Option<CommitKind> {
        match self.settled {
            SpoolSelection::Spool(id) => Some(CommitKind::SetSpool(id)),
            SpoolSelection::NoSpool => Some(CommitKind::ClearSpool),
            SpoolSelection::Unset => None,
        }
    }

    fn bind_commit(&self) -> Option<CommitKind> {
        Some(CommitKind::BindTag {
            spool: self.settled.spool_id()?,
            tag: self.tag.clone()?,
        })
    }

    fn preconditions(&self) -> CommitPreconditions<'_> {
        let spool_found = match (&self.lookup, self.settled) {
            (LookupState::Found { record }, SpoolSelection::Spool(id)) => record.id == id.get(),
            _ => false,
        };
        CommitPreconditions {
            phase: &self.commit,
            locked: self.locked,
            candidate: self.candidate,
            settling: self.is_settling(),
            spool_found,
        }
    }

    fn allows(&self, kind: Option<&CommitKind>) -> bool {
        self.is_open() && kind.is_some_and(|kind| commit::check(kind, &self.preconditions()).is_ok())
    }

    pub fn actions(&self) -> SessionActions {
        SessionActions {
            commit: self.allows(self.pending_commit().as_ref()),
            clear: self.allows(Some(&CommitKind::ClearSpool)),
            bind: self.allows(self.bind_commit().as_ref()),
            scan: self.is_open() && self.scan_available,
        }
    }

    /// Clear the error and any finished commit outcome after user input.
    fn touch(&mut self) {
        self.last_error = None;
        self.commit.reset_on_edit();
    }
}

// ── Session ──────────────────────────────────────────────────────────

/// Everything a session needs from its owner.
pub(crate) struct SessionParams {
    pub tray: TraySlot,
    pub initial: SpoolSelection,
    pub locked: bool,
    pub tag: Option<RfidTag>,
    pub debounce: Duration,
    pub capture_devices: usize,
    pub client: BridgeClient,
    pub inventory: Arc<InventoryLookup>,
    pub commits: CommitController,
}

/// Handle to one open interaction. Cheap to clone.
#[derive(Clone)]
pub struct ReconciliationSession {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    tray: TraySlot,
    state: watch::Sender<SessionState>,
    debouncer: Debouncer<SpoolSelection>,
    client: BridgeClient,
    inventory: Arc<InventoryLookup>,
    commits: CommitController,
    cancel: CancellationToken,
}

impl ReconciliationSession {
    /// Open a session and start looking up the initial selection. Must be
    /// called inside a tokio runtime.
    pub(crate) fn open(params: SessionParams) -> Self {
        let cancel = CancellationToken::new();
        let (debouncer, settled_rx) = Debouncer::new(params.debounce, cancel.clone());
        let (state, _) = watch::channel(SessionState::new(
            params.tray,
            params.initial,
            params.locked,
            params.tag,
            params.capture_devices > 0,
        ));

        let inner = Arc::new(SessionInner {
            tray: params.tray,
            state,
            debouncer,
            client: params.client,
            inventory: params.inventory,
            commits: params.commits,
            cancel,
        });

        spawn_settle_listener(Arc::downgrade(&inner), inner.cancel.clone(), settled_rx);
        inner.settle(params.initial);

        info!(tray = %params.tray, initial = %params.initial, locked = params.locked, "session opened");
        Self { inner }
    }

    pub fn tray(&self) -> TraySlot {
        self.inner.tray
    }

    pub fn snapshot(&self) -> SessionState {
        self.inner.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.inner.state.subscribe()
    }

    /// State changes as a stream, starting with the current snapshot.
    pub fn stream(&self) -> WatchStream<SessionState> {
        WatchStream::new(self.subscribe())
    }

    pub fn actions(&self) -> SessionActions {
        self.inner.state.borrow().actions()
    }

    pub fn is_open(&self) -> bool {
        self.inner.state.borrow().is_open()
    }

    /// Wait until the candidate has settled and its lookup finished, or
    /// the session closed.
    pub async fn settled(&self) -> SessionState {
        let mut rx = self.subscribe();
        match rx.wait_for(|s| !s.is_open() || s.is_quiescent()).await {
            Ok(state) => state.clone(),
            Err(_) => self.snapshot(),
        }
    }

    // ── Input ────────────────────────────────────────────────────────

    /// Replace the candidate with a manual edit. Clears the last error
    /// and restarts the debounce window.
    pub fn edit(&self, selection: SpoolSelection) -> Result<(), CoreError> {
        self.ensure_open()?;
        self.inner.state.send_modify(|s| {
            s.candidate = selection;
            s.touch();
        });
        self.inner.debouncer.push(selection);
        Ok(())
    }

    /// Parse and apply manual text input (`""` and `-1` clear the tray).
    pub fn edit_text(&self, text: &str) -> Result<(), CoreError> {
        self.edit(SpoolSelection::parse_input(text)?)
    }

    /// Flip between manual entry and scanning. Entering scan mode needs a
    /// capture device.
    pub fn toggle_scan(&self) -> Result<ScanMode, CoreError> {
        self.ensure_open()?;
        let mut outcome = Ok(ScanMode::Manual);
        self.inner.state.send_if_modified(|s| {
            let next = match s.scan_mode {
                ScanMode::Manual if !s.scan_available => {
                    outcome = Err(CoreError::precondition("no capture device available"));
                    return false;
                }
                ScanMode::Manual => ScanMode::Scanning,
                ScanMode::Scanning => ScanMode::Manual,
            };
            s.scan_mode = next;
            s.touch();
            outcome = Ok(next);
            true
        });
        outcome
    }

    /// Feed one decode event. Only the first code is consulted and an
    /// empty event is ignored. Either outcome returns to manual mode.
    pub fn scan<S: AsRef<str>>(&self, codes: &[S]) -> Result<Option<SpoolId>, CoreError> {
        self.ensure_open()?;
        if self.inner.state.borrow().scan_mode != ScanMode::Scanning {
            return Err(CoreError::precondition("scan mode is not active"));
        }
        let Some(raw) = codes.first().map(AsRef::as_ref) else {
            return Ok(None);
        };

        match resolver::resolve(raw) {
            Ok(id) => {
                let selection = SpoolSelection::Spool(id);
                self.inner.state.send_modify(|s| {
                    s.candidate = selection;
                    s.scan_mode = ScanMode::Manual;
                    s.touch();
                });
                self.inner.debouncer.push(selection);
                debug!(tray = %self.inner.tray, spool = %id, "scan resolved");
                Ok(Some(id))
            }
            Err(err) => {
                self.inner.state.send_modify(|s| {
                    s.scan_mode = ScanMode::Manual;
                    s.last_error = Some(SessionError::InvalidCode {
                        code: raw.to_owned(),
                    });
                });
                debug!(tray = %self.inner.tray, code = raw, "scan rejected");
                Err(err)
            }
        }
    }

    /// Re-correlate the tray tag against fresh telemetry.
    pub fn observe_telemetry(&self, telemetry: Option<&PrinterTelemetry>) -> Option<RfidTag> {
        let tag = correlate(self.inner.tray, telemetry);
        self.inner.state.send_if_modified(|s| {
            if !s.is_open() || s.tag == tag {
                return false;
            }
            s.tag.clone_from(&tag);
            true
        });
        tag
    }

    /// Poll the printer and re-correlate. Unreachable telemetry keeps the
    /// previous tag.
    pub async fn refresh_tag(&self) -> Option<RfidTag> {
        match self.inner.client.printer_info().await {
            Ok(info) => self.observe_telemetry(info.status.as_ref()),
            Err(e) => {
                warn!(tray = %self.inner.tray, error = %e, "printer telemetry unavailable");
                self.snapshot().tag
            }
        }
    }

    // ── Commits ──────────────────────────────────────────────────────

    /// Commit the settled selection: a spool assigns it, "no spool"
    /// clears the tray. Success closes the session.
    pub async fn commit(&self) -> Result<(), CoreError> {
        let kind = self
            .inner
            .state
            .borrow()
            .pending_commit()
            .ok_or_else(|| CoreError::precondition("no spool selected"))?;
        self.submit(kind).await
    }

    /// Clear the tray. Success closes the session.
    pub async fn clear_spool(&self) -> Result<(), CoreError> {
        self.submit(CommitKind::ClearSpool).await
    }

    /// Bind the tray's RFID tag to the settled spool. The session stays
    /// open afterwards.
    pub async fn bind_tag(&self) -> Result<(), CoreError> {
        let kind = {
            let state = self.inner.state.borrow();
            if state.tag.is_none() {
                return Err(CoreError::precondition("no RFID tag on this tray"));
            }
            state
                .bind_commit()
                .ok_or_else(|| CoreError::precondition("no spool selected"))?
        };
        self.submit(kind).await
    }

    async fn submit(&self, kind: CommitKind) -> Result<(), CoreError> {
        // Check and enter `Submitting` in one step so a second submit
        // can never slip past the first.
        let mut verdict = Ok(());
        self.inner.state.send_if_modified(|s| {
            if !s.is_open() {
                verdict = Err(CoreError::SessionClosed);
                return false;
            }
            verdict = commit::check(&kind, &s.preconditions());
            if verdict.is_err() {
                return false;
            }
            s.commit = CommitPhase::Submitting;
            true
        });
        verdict?;

        let request = CommitRequest {
            tray: self.inner.tray,
            kind,
        };
        let result = self.inner.commits.execute(&request).await;

        match result {
            Ok(()) => {
                if let CommitKind::BindTag { spool, .. } = &request.kind {
                    self.inner.inventory.invalidate(*spool);
                }
                self.inner.state.send_if_modified(|s| {
                    if !s.is_open() {
                        return false;
                    }
                    s.commit = CommitPhase::Succeeded;
                    true
                });
                if request.kind.closes_session() {
                    self.close_with(CloseReason::Committed);
                }
                Ok(())
            }
            Err(err) => {
                let message = err.to_string();
                warn!(tray = %self.inner.tray, error = %message, "commit failed");
                self.inner.state.send_if_modified(|s| {
                    if !s.is_open() {
                        return false;
                    }
                    s.commit = CommitPhase::Failed {
                        message: message.clone(),
                    };
                    s.last_error = Some(SessionError::CommitRejected { message });
                    true
                });
                Err(err)
            }
        }
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Cancel the interaction. Idempotent.
    pub fn close(&self) {
        self.close_with(CloseReason::Cancelled);
    }

    pub(crate) fn close_with(&self, reason: CloseReason) {
        let closed_now = self.inner.state.send_if_modified(|s| {
            if !s.is_open() {
                return false;
            }
            s.closed = Some(reason);
            s.last_error = None;
            s.scan_mode = ScanMode::Manual;
            true
        });
        if closed_now {
            self.inner.debouncer.cancel();
            self.inner.cancel.cancel();
            info!(tray = %self.inner.tray, %reason, "session closed");
        }
    }

    fn ensure_open(&self) -> Result<(), CoreError> {
        if self.is_open() {
            Ok(())
        } else {
            Err(CoreError::SessionClosed)
        }
    }
}

impl std::fmt::Debug for ReconciliationSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReconciliationSession")
            .field("tray", &self.inner.tray)
            .field("state", &*self.inner.state.borrow())
            .finish_non_exhaustive()
    }
}

impl SessionInner {
    /// Adopt a settled selection and start its lookup.
    fn settle(self: &Arc<Self>, selection: SpoolSelection) {
        let mut fetch = None;
        self.state.send_if_modified(|s| {
            if !s.is_open() {
                return false;
            }
            let unchanged = s.settled == selection && !matches!(s.lookup, LookupState::Idle);
            s.settled = selection;
            if unchanged {
                return false;
            }
            s.lookup = match selection.spool_id() {
                None => LookupState::Idle,
                Some(id) => match self.inventory.cached(id) {
                    Some(Some(record)) => LookupState::Found { record },
                    Some(None) => LookupState::NotFound { id },
                    None => {
                        fetch = Some(id);
                        LookupState::Loading { id }
                    }
                },
            };
            true
        });

        if let Some(id) = fetch {
            spawn_lookup(Arc::downgrade(self), self.cancel.clone(), Arc::clone(&self.inventory), id);
        }
    }
}

impl Drop for SessionInner {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

// ── Background tasks ─────────────────────────────────────────────────

fn spawn_settle_listener(
    session: Weak<SessionInner>,
    cancel: CancellationToken,
    mut settled_rx: mpsc::UnboundedReceiver<SpoolSelection>,
) {
    tokio::spawn(async move {
        loop {
            let selection = tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                next = settled_rx.recv() => match next {
                    Some(selection) => selection,
                    None => break,
                },
            };
            let Some(inner) = session.upgrade() else {
                break;
            };
            debug!(tray = %inner.tray, %selection, "selection settled");
            inner.settle(selection);
        }
    });
}

fn spawn_lookup(
    session: Weak<SessionInner>,
    cancel: CancellationToken,
    inventory: Arc<InventoryLookup>,
    id: SpoolId,
) {
    tokio::spawn(async move {
        let record = tokio::select! {
            biased;
            () = cancel.cancelled() => return,
            record = inventory.lookup(SpoolSelection::Spool(id)) => record,
        };
        let Some(inner) = session.upgrade() else {
            return;
        };
        inner.state.send_if_modified(|s| {
            // Results are keyed by id: only the current settled id counts.
            if !s.is_open() || s.settled != SpoolSelection::Spool(id) {
                debug!(spool = %id, "discarding stale lookup");
                return false;
            }
            s.lookup = match record {
                Some(record) => LookupState::Found { record },
                None => LookupState::NotFound { id },
            };
            true
        });
    });
}
