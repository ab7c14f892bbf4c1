//! Shared helpers for command handlers.

use spoolsync_core::{
    LookupState, ReconciliationSession, SessionState, SpoolId, SpoolRecord, SpoolSync, TraySlot,
};

use crate::error::CliError;

// ── Display helpers ─────────────────────────────────────────────────

/// "Vendor Material Name", skipping whatever the inventory left out.
pub fn spool_label(record: &SpoolRecord) -> String {
    let filament = &record.filament;
    let parts: Vec<&str> = [
        filament.vendor.as_ref().map(|v| v.name.as_str()),
        filament.material.as_deref(),
        filament.name.as_deref(),
    ]
    .into_iter()
    .flatten()
    .filter(|s| !s.is_empty())
    .collect();

    if parts.is_empty() {
        format!("Spool {}", record.id)
    } else {
        parts.join(" ")
    }
}

/// Remaining length and share, e.g. "120.5 m (75%)".
pub fn remaining_label(record: &SpoolRecord) -> String {
    let percent = (record.remaining_fraction() * 100.0).round();
    match record.remaining_meters() {
        Some(m) => format!("{m:.1} m ({percent}%)"),
        None => format!("{percent}%"),
    }
}

pub fn or_dash(value: Option<String>) -> String {
    value.unwrap_or_else(|| "-".into())
}

// ── Session helpers ─────────────────────────────────────────────────

/// Open a session on `tray`, run `interaction` against it and close it
/// when the interaction fails. A successful set or clear closes the
/// session on its own.
pub async fn with_session<F, Fut, T>(
    sync: &SpoolSync,
    tray: TraySlot,
    interaction: F,
) -> Result<T, CliError>
where
    F: FnOnce(ReconciliationSession) -> Fut,
    Fut: Future<Output = Result<T, CliError>>,
{
    let session = sync.open_session(tray).await?;
    let result = interaction(session.clone()).await;
    if result.is_err() || session.is_open() {
        session.close();
    }
    result
}

/// Wait for the settled lookup and require that it found `spool`.
pub async fn settled_spool(session: &ReconciliationSession) -> Result<SessionState, CliError> {
    let state = session.settled().await;
    match &state.lookup {
        LookupState::Found { .. } => Ok(state),
        LookupState::NotFound { id } => Err(spool_not_found(*id)),
        LookupState::Idle | LookupState::Loading { .. } => Err(CliError::Precondition {
            action: "commit".into(),
            reason: "no spool selected".into(),
        }),
    }
}

pub fn spool_not_found(id: SpoolId) -> CliError {
    CliError::NotFound {
        resource_type: "spool".into(),
        identifier: id.to_string(),
        list_command: "spools list".into(),
    }
}
