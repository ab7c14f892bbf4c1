// ── Tray identity correlation ──
//
// Maps a logical tray to its AMS unit/slot and reads the RFID tag the
// printer reports for it. Read-only over a telemetry snapshot.

use crate::model::{PrinterTelemetry, RfidTag, TraySlot};

/// RFID tag of `tray`, if the telemetry has one. Missing units, missing
/// slots, a missing payload and the all-zero tag all yield `None`.
pub fn correlate(tray: TraySlot, telemetry: Option<&PrinterTelemetry>) -> Option<RfidTag> {
    let position = tray.ams_position()?;
    let units = &telemetry?.print.as_ref()?.ams.as_ref()?.ams;
    let unit = units.get(usize::from(position.unit))?;

    let slot_id = position.slot.to_string();
    unit.tray
        .iter()
        .find(|entry| entry.id == slot_id)
        .and_then(|entry| entry.tray_uuid.as_deref())
        .and_then(RfidTag::parse)
}
