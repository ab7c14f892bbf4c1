//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` variants into user-facing errors
//! with actionable help text and stable exit codes.

use miette::Diagnostic;
use thiserror::Error;

use spoolsync_config::ConfigError;
use spoolsync_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    #[allow(dead_code)]
    pub const SUCCESS: i32 = 0;
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const NOT_FOUND: i32 = 4;
    pub const PRECONDITION: i32 = 5;
    pub const REJECTED: i32 = 6;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not connect to bridge at {url}")]
    #[diagnostic(
        code(spoolsync::connection_failed),
        help(
            "Check that the bridge service is running and reachable.\n\
             Reason: {reason}"
        )
    )]
    ConnectionFailed { url: String, reason: String },

    #[error("Request timed out after {seconds}s")]
    #[diagnostic(
        code(spoolsync::timeout),
        help("Increase timeout with --timeout or check bridge responsiveness.")
    )]
    Timeout { seconds: u64 },

    // ── Resources ────────────────────────────────────────────────────
    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(
        code(spoolsync::not_found),
        help("Run: spoolsync {list_command} to see what is available")
    )]
    NotFound {
        resource_type: String,
        identifier: String,
        list_command: String,
    },

    // ── Reconciliation ───────────────────────────────────────────────
    #[error("Invalid QR code: {code:?}")]
    #[diagnostic(
        code(spoolsync::invalid_code),
        help("Expected a spool URL ending in /<id> or a reference like web+spoolman:s-<id>.")
    )]
    InvalidCode { code: String },

    #[error("Cannot {action}: {reason}")]
    #[diagnostic(code(spoolsync::precondition))]
    Precondition { action: String, reason: String },

    #[error("Bridge rejected the change: {message}")]
    #[diagnostic(code(spoolsync::rejected))]
    Rejected { message: String },

    // ── API ──────────────────────────────────────────────────────────
    #[error("API error: {message}")]
    #[diagnostic(code(spoolsync::api_error))]
    ApiError {
        message: String,
        status: Option<u16>,
    },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(spoolsync::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(spoolsync::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: spoolsync config init"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error("No bridge configured")]
    #[diagnostic(
        code(spoolsync::no_config),
        help(
            "Create a profile with: spoolsync config init\n\
             Or pass --bridge / set SPOOLSYNC_BRIDGE.\n\
             Expected config at: {path}"
        )
    )]
    NoConfig { path: String },

    #[error(transparent)]
    #[diagnostic(code(spoolsync::config))]
    Config(ConfigError),

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    #[diagnostic(code(spoolsync::internal))]
    Internal(String),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::NotFound { .. } | Self::ProfileNotFound { .. } => exit_code::NOT_FOUND,
            Self::Precondition { .. } => exit_code::PRECONDITION,
            Self::Rejected { .. } => exit_code::REJECTED,
            Self::Validation { .. } | Self::InvalidCode { .. } | Self::NoConfig { .. } => {
                exit_code::USAGE
            }
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::InvalidCode { code } => CliError::InvalidCode { code },

            CoreError::CommitRejected { message, .. } => CliError::Rejected { message },

            CoreError::PreconditionViolated { reason } => CliError::Precondition {
                action: "complete the change".into(),
                reason,
            },

            CoreError::SessionClosed => CliError::Precondition {
                action: "complete the change".into(),
                reason: "the interaction was closed".into(),
            },

            CoreError::InvalidTray { index, tray_count } => CliError::NotFound {
                resource_type: "tray".into(),
                identifier: format!("{index} (tray count is {tray_count})"),
                list_command: "trays list".into(),
            },

            CoreError::InvalidTrayInput { input } => CliError::Validation {
                field: "tray".into(),
                reason: format!("expected an index or \"ext\", got {input:?}"),
            },

            CoreError::InvalidSpoolId { input } => CliError::Validation {
                field: "spool".into(),
                reason: format!("expected a numeric id, got {input:?}"),
            },

            CoreError::ConnectionFailed { url, reason } => {
                CliError::ConnectionFailed { url, reason }
            }

            CoreError::Timeout { timeout_secs } => CliError::Timeout {
                seconds: timeout_secs,
            },

            CoreError::Api { message, status } => CliError::ApiError { message, status },

            CoreError::Config { message } => CliError::Validation {
                field: "bridge".into(),
                reason: message,
            },

            CoreError::Internal(message) => CliError::Internal(message),
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            ConfigError::Io(e) => CliError::Io(e),
            other => CliError::Config(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn core_errors_map_to_exit_codes() {
        let cases = [
            (
                CoreError::CommitRejected {
                    message: "spool archived".into(),
                    status: Some(400),
                },
                exit_code::REJECTED,
            ),
            (
                CoreError::PreconditionViolated {
                    reason: "tray is locked".into(),
                },
                exit_code::PRECONDITION,
            ),
            (
                CoreError::InvalidTray {
                    index: 9,
                    tray_count: 4,
                },
                exit_code::NOT_FOUND,
            ),
            (
                CoreError::InvalidCode { code: "x".into() },
                exit_code::USAGE,
            ),
            (CoreError::Timeout { timeout_secs: 3 }, exit_code::TIMEOUT),
            (
                CoreError::ConnectionFailed {
                    url: "http://bridge".into(),
                    reason: "refused".into(),
                },
                exit_code::CONNECTION,
            ),
            (CoreError::Internal("boom".into()), exit_code::GENERAL),
        ];
        for (core, code) in cases {
            let cli = CliError::from(core);
            assert_eq!(cli.exit_code(), code, "{cli:?}");
        }
    }

    #[test]
    fn rejection_keeps_bridge_message() {
        let cli = CliError::from(CoreError::CommitRejected {
            message: "Tray already assigned to another spool".into(),
            status: Some(400),
        });
        assert!(cli.to_string().ends_with("Tray already assigned to another spool"));
    }
}
