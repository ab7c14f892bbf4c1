// ── API -> domain conversion ──
//
// Wire sentinels (`null`, `-1`, string tray keys, epoch zero) stop here.

use chrono::{DateTime, Utc};
use spoolsync_api::models::{PrinterInfoResponse, SettingsResponse};

use crate::model::{PrinterInfo, SpoolSelection, TraySettings, TraySlot};

impl From<SettingsResponse> for TraySettings {
    fn from(raw: SettingsResponse) -> Self {
        let tray_count = raw.tray_count.unwrap_or(Self::DEFAULT_TRAY_COUNT);
        let mut settings = TraySettings {
            tray_count,
            active_tray: raw.active_tray.and_then(TraySlot::from_wire),
            locked: raw
                .locked_trays
                .into_iter()
                .filter_map(TraySlot::from_wire)
                .collect(),
            ..TraySettings::default()
        };

        for (key, value) in raw.trays {
            let Some(tray) = key.trim().parse::<i64>().ok().and_then(TraySlot::from_wire) else {
                continue;
            };
            if !settings.is_provisioned(tray) {
                continue;
            }
            if let SpoolSelection::Spool(id) = SpoolSelection::from_wire(value) {
                settings.assignments.insert(tray, id);
            }
        }

        settings
    }
}

impl From<PrinterInfoResponse> for PrinterInfo {
    fn from(raw: PrinterInfoResponse) -> Self {
        let last_update = if raw.last_update > 0 {
            DateTime::<Utc>::from_timestamp(raw.last_update, 0)
        } else {
            None
        };
        PrinterInfo {
            connected: raw.connected,
            telemetry: raw.status,
            last_update,
        }
    }
}
