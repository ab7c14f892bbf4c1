// ── Assignment commits ──
//
// A commit durably changes a tray assignment or a spool's RFID binding.
// `check` gates every submission synchronously so a disallowed commit is
// rejected before any request is issued; `CommitController` performs the
// request and invalidates the shared settings cache on success.

use serde::Serialize;
use spoolsync_api::BridgeClient;
use tracing::info;

use crate::error::CoreError;
use crate::model::{RfidTag, SpoolId, SpoolSelection, TraySlot};
use crate::store::SettingsCache;

/// Commit lifecycle within one session.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, strum::Display)]
#[serde(tag = "phase", rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CommitPhase {
    #[default]
    Idle,
    Submitting,
    Succeeded,
    Failed { message: String },
}

impl CommitPhase {
    /// Whether a new submission may start from this phase. A failure
    /// blocks until the selection is edited.
    pub fn accepts_submit(&self) -> bool {
        matches!(self, Self::Idle | Self::Succeeded)
    }

    /// Editing the selection or toggling scan mode clears a finished
    /// outcome. An in-flight submission is left alone.
    pub(crate) fn reset_on_edit(&mut self) -> bool {
        match self {
            Self::Failed { .. } | Self::Succeeded => {
                *self = Self::Idle;
                true
            }
            Self::Idle | Self::Submitting => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitKind {
    SetSpool(SpoolId),
    ClearSpool,
    BindTag { spool: SpoolId, tag: RfidTag },
}

impl CommitKind {
    /// Assignment commits end the interaction; a tag binding does not.
    pub fn closes_session(&self) -> bool {
        !matches!(self, Self::BindTag { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitRequest {
    pub tray: TraySlot,
    pub kind: CommitKind,
}

/// Session facts a commit is checked against.
#[derive(Debug, Clone, Copy)]
pub struct CommitPreconditions<'a> {
    pub phase: &'a CommitPhase,
    pub locked: bool,
    pub candidate: SpoolSelection,
    /// The candidate has not yet settled through the debounce window.
    /// Only commits that use the settled spool care.
    pub settling: bool,
    /// The settled spool resolved to an inventory record.
    pub spool_found: bool,
}

/// Reject a commit the current state does not allow.
pub fn check(kind: &CommitKind, pre: &CommitPreconditions<'_>) -> Result<(), CoreError> {
    if matches!(pre.phase, CommitPhase::Submitting) {
        return Err(CoreError::precondition("a commit is already in progress"));
    }
    if matches!(pre.phase, CommitPhase::Failed { .. }) {
        return Err(CoreError::precondition(
            "the last commit failed; edit the selection first",
        ));
    }
    if pre.locked {
        return Err(CoreError::precondition("tray is locked"));
    }
    match kind {
        CommitKind::ClearSpool if pre.candidate.is_unset() => {
            Err(CoreError::precondition("nothing to clear"))
        }
        CommitKind::SetSpool(_) | CommitKind::BindTag { .. } if pre.settling => {
            Err(CoreError::precondition("selection has not settled yet"))
        }
        CommitKind::SetSpool(_) | CommitKind::BindTag { .. } if !pre.spool_found => {
            Err(CoreError::precondition("spool was not found in the inventory"))
        }
        _ => Ok(()),
    }
}

// ── Controller ───────────────────────────────────────────────────────

/// Issues commit requests and invalidates what they change.
#[derive(Clone)]
pub struct CommitController {
    client: BridgeClient,
    settings: SettingsCache,
}

impl CommitController {
    pub fn new(client: BridgeClient, settings: SettingsCache) -> Self {
        Self { client, settings }
    }

    /// Submit `request`. Service rejections come back as
    /// [`CoreError::CommitRejected`] with the bridge's message.
    pub async fn execute(&self, request: &CommitRequest) -> Result<(), CoreError> {
        let tray = request.tray;
        match &request.kind {
            CommitKind::SetSpool(spool) => {
                self.client
                    .assign_tray(tray.index(), Some(spool.get()))
                    .await
                    .map_err(CoreError::from_commit)?;
                info!(%tray, %spool, "tray assigned");
            }
            CommitKind::ClearSpool => {
                self.client
                    .assign_tray(tray.index(), None)
                    .await
                    .map_err(CoreError::from_commit)?;
                info!(%tray, "tray cleared");
            }
            CommitKind::BindTag { spool, tag } => {
                self.client
                    .set_tray_uuid(spool.get(), tag.as_str())
                    .await
                    .map_err(CoreError::from_commit)?;
                info!(%tray, %spool, %tag, "tag bound to spool");
            }
        }
        self.settings.invalidate();
        Ok(())
    }
}
