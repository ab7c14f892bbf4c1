//! Spool-assignment reconciliation between AMS trays and a Spoolman
//! inventory, built on `spoolsync-api`.
//!
//! - **[`SpoolSync`]**: cheaply cloneable facade that owns the bridge
//!   client and the shared caches. Read helpers cover settings, the
//!   inventory, printer telemetry and a per-tray overview;
//!   [`open_session()`](SpoolSync::open_session) starts an interaction.
//!
//! - **[`ReconciliationSession`]**: one "change tray" interaction. Manual
//!   edits and decoded scans feed a debounced candidate; the settled value
//!   is looked up in the inventory and can be committed, cleared, or bound
//!   to the tray's RFID tag. State is observable through a `watch` channel.
//!
//! - **[`SettingsCache`]**: the process-wide tray assignment map. Only a
//!   successful commit invalidates it.
//!
//! - **[`resolve`]** and **[`correlate`]**: the pure building blocks for
//!   scan text and RFID tags.

pub mod commit;
pub mod config;
pub mod controller;
pub mod convert;
pub mod correlate;
pub mod debounce;
pub mod error;
pub mod lookup;
pub mod model;
pub mod presenter;
pub mod resolver;
pub mod session;
pub mod store;

// ── Primary re-exports ──────────────────────────────────────────────
pub use commit::{CommitController, CommitKind, CommitPhase, CommitRequest};
pub use config::{DEFAULT_DEBOUNCE, SyncConfig, TlsVerification};
pub use controller::{SpoolSync, TrayOverview};
pub use correlate::correlate;
pub use error::CoreError;
pub use lookup::InventoryLookup;
pub use presenter::Presenter;
pub use resolver::resolve;
pub use session::{
    CloseReason, ReconciliationSession, ScanMode, SessionActions, SessionError, SessionState,
};
pub use store::SettingsCache;

pub use model::{
    AmsPosition, BridgeHealth, Filament, LookupState, PrinterInfo, PrinterTelemetry, RfidTag,
    SpoolId, SpoolRecord, SpoolSelection, TraySettings, TraySlot, Vendor,
};
