// ── Core error types ──
//
// Domain errors from spoolsync-core. Consumers never see raw HTTP status
// handling or JSON parse failures; the `From<spoolsync_api::Error>` impl
// translates transport-layer errors into domain variants.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Reconciliation errors ────────────────────────────────────────
    /// Scanned text is neither a spool URL nor a `scheme:s-<id>` reference.
    #[error("Invalid QR code: {code:?}")]
    InvalidCode { code: String },

    /// The bridge refused a commit. `message` is shown to the user verbatim.
    #[error("{message}")]
    CommitRejected {
        message: String,
        status: Option<u16>,
    },

    /// The action is not available in the session's current state.
    #[error("Action not allowed: {reason}")]
    PreconditionViolated { reason: String },

    #[error("Reconciliation session is closed")]
    SessionClosed,

    // ── Input errors ─────────────────────────────────────────────────
    #[error("Tray {index} is not provisioned (tray count is {tray_count})")]
    InvalidTray { index: u8, tray_count: u32 },

    #[error("Invalid tray: {input:?}")]
    InvalidTrayInput { input: String },

    #[error("Invalid spool id: {input:?}")]
    InvalidSpoolId { input: String },

    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot reach bridge at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Bridge request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    // ── API errors (wrapped, not exposed raw) ────────────────────────
    #[error("API error: {message}")]
    Api {
        message: String,
        /// HTTP status code (if applicable).
        status: Option<u16>,
    },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    pub(crate) fn precondition(reason: impl Into<String>) -> Self {
        Self::PreconditionViolated {
            reason: reason.into(),
        }
    }

    /// Translate an API error raised by a commit request. Service
    /// rejections become [`CoreError::CommitRejected`]; everything else
    /// keeps its transport meaning.
    pub(crate) fn from_commit(err: spoolsync_api::Error) -> Self {
        match err {
            spoolsync_api::Error::Rejected { status, message } => Self::CommitRejected {
                message,
                status: Some(status),
            },
            other => other.into(),
        }
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<spoolsync_api::Error> for CoreError {
    fn from(err: spoolsync_api::Error) -> Self {
        match err {
            spoolsync_api::Error::Transport(ref e) => {
                if e.is_timeout() {
                    CoreError::Timeout { timeout_secs: 0 }
                } else if e.is_connect() {
                    CoreError::ConnectionFailed {
                        url: e.url().map_or_else(|| "<unknown>".into(), ToString::to_string),
                        reason: e.to_string(),
                    }
                } else {
                    CoreError::Api {
                        message: e.to_string(),
                        status: e.status().map(|s| s.as_u16()),
                    }
                }
            }
            spoolsync_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            spoolsync_api::Error::InvalidBaseUrl(url) => CoreError::Config {
                message: format!("Invalid bridge URL: {url}"),
            },
            spoolsync_api::Error::Timeout { timeout_secs } => CoreError::Timeout { timeout_secs },
            spoolsync_api::Error::Tls(msg) => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("TLS error: {msg}"),
            },
            spoolsync_api::Error::Rejected { status, message } => CoreError::Api {
                message,
                status: Some(status),
            },
            spoolsync_api::Error::Deserialization { message, body: _ } => {
                CoreError::Internal(format!("Deserialization error: {message}"))
            }
        }
    }
}
