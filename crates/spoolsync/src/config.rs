//! CLI configuration: thin wrapper around `spoolsync_config` shared types.
//!
//! Adds the resolution step that respects `GlobalOpts` flag overrides
//! (`--bridge`, `--timeout`, `--insecure`, `--debounce-ms`).

use std::time::Duration;

use spoolsync_core::{SyncConfig, TlsVerification};

use crate::cli::GlobalOpts;
use crate::error::CliError;

// ── Re-exports from shared crate ────────────────────────────────────

pub use spoolsync_config::{
    Config, Defaults, Profile, config_path, load_config, load_config_or_default, save_config,
};

/// The CLI always treats scanned text passed on the command line as a
/// capture source.
const CLI_CAPTURE_DEVICES: usize = 1;

// ── CLI-specific helpers ────────────────────────────────────────────

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    global
        .profile
        .clone()
        .or_else(|| config.default_profile.clone())
        .unwrap_or_else(|| "default".into())
}

/// Comma-separated profile names for help text.
pub fn available_profiles(config: &Config) -> String {
    let mut names: Vec<_> = config.profiles.keys().cloned().collect();
    names.sort();
    if names.is_empty() {
        "(none)".into()
    } else {
        names.join(", ")
    }
}

/// Build the `SyncConfig` for this invocation: the active profile (if
/// any) with flag overrides on top. Without a profile, `--bridge` alone
/// is enough.
pub fn build_sync_config(global: &GlobalOpts) -> Result<SyncConfig, CliError> {
    let cfg = load_config()?;
    let profile_name = active_profile_name(global, &cfg);

    match cfg.profiles.get(&profile_name) {
        Some(profile) => resolve_profile(profile, &cfg.defaults, global),
        None if global.profile.is_some() => Err(CliError::ProfileNotFound {
            name: profile_name,
            available: available_profiles(&cfg),
        }),
        None => {
            let bridge = global.bridge.as_deref().ok_or_else(|| CliError::NoConfig {
                path: config_path().display().to_string(),
            })?;
            resolve_profile(&Profile::new(bridge), &cfg.defaults, global)
        }
    }
}

/// Translate a `Profile` + global flags into a `SyncConfig`.
///
/// CLI flag overrides take priority over profile values.
pub fn resolve_profile(
    profile: &Profile,
    defaults: &Defaults,
    global: &GlobalOpts,
) -> Result<SyncConfig, CliError> {
    // 1. Bridge URL (flag > env > profile)
    let url_str = global.bridge.as_deref().unwrap_or(&profile.bridge);
    let url: url::Url = url_str.parse().map_err(|_| CliError::Validation {
        field: "bridge".into(),
        reason: format!("invalid URL: {url_str}"),
    })?;

    // 2. TLS verification
    let tls = if global.insecure || profile.insecure.unwrap_or(defaults.insecure) {
        TlsVerification::DangerAcceptInvalid
    } else if let Some(ref ca_path) = profile.ca_cert {
        TlsVerification::CustomCa(ca_path.clone())
    } else {
        TlsVerification::SystemDefaults
    };

    // 3. Timing
    let timeout = global
        .timeout
        .or(profile.timeout)
        .unwrap_or(defaults.timeout);

    let mut config = SyncConfig::new(url);
    config.tls = tls;
    config.timeout = Duration::from_secs(timeout);
    if let Some(ms) = global.debounce_ms.or(profile.debounce_ms) {
        config.debounce = Duration::from_millis(ms);
    }
    config.capture_devices = CLI_CAPTURE_DEVICES;
    Ok(config)
}
