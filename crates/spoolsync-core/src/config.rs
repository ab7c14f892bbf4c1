// ── Runtime connection configuration ──
//
// These types describe *how* to reach the bridge and how a reconciliation
// session behaves. They never touch disk: the CLI builds a `SyncConfig`
// from its profile and hands it in.

use std::path::PathBuf;
use std::time::Duration;

use spoolsync_api::{TlsMode, TransportConfig};
use url::Url;

/// Quiet period before an edited identifier counts as settled.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict).
    #[default]
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(PathBuf),
    /// Skip verification (self-signed certs on a LAN bridge).
    DangerAcceptInvalid,
}

/// Configuration for one bridge connection.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Bridge API root (e.g., `http://bridge.local:8000/api/`).
    pub bridge_url: Url,
    pub tls: TlsVerification,
    /// Request timeout.
    pub timeout: Duration,
    /// Debounce window for identifier edits.
    pub debounce: Duration,
    /// Number of capture-capable (camera/scanner) devices available to
    /// sessions. Scan mode is unavailable at zero.
    pub capture_devices: usize,
}

impl SyncConfig {
    pub fn new(bridge_url: Url) -> Self {
        Self {
            bridge_url,
            tls: TlsVerification::default(),
            timeout: Duration::from_secs(30),
            debounce: DEFAULT_DEBOUNCE,
            capture_devices: 0,
        }
    }

    pub(crate) fn transport(&self) -> TransportConfig {
        let tls = match &self.tls {
            TlsVerification::SystemDefaults => TlsMode::System,
            TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
            TlsVerification::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
        };
        TransportConfig {
            tls,
            timeout: self.timeout,
        }
    }
}
