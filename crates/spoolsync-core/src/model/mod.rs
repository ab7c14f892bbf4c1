// ── Domain model ──
//
// Canonical types shared by every reconciliation component. Wire-level
// records (spools, telemetry) are re-exported from `spoolsync-api`; the
// identifiers and tray addressing live here so sentinels never leak past
// the API boundary.

pub mod printer;
pub mod spool;
pub mod tray;

pub use printer::PrinterInfo;
pub use spool::{LookupState, SpoolId, SpoolSelection};
pub use tray::{AmsPosition, LockedTraySet, RfidTag, TrayAssignmentMap, TraySettings, TraySlot};

pub use spoolsync_api::models::{
    AmsUnitTelemetry, BridgeHealth, Filament, MultiColorDirection, PrintStatus, PrinterTelemetry,
    SpoolRecord, TrayTelemetry, Vendor,
};
