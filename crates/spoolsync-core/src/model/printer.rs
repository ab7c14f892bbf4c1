use chrono::{DateTime, Utc};
use serde::Serialize;

use super::PrinterTelemetry;

/// Printer connection state and the latest merged telemetry.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct PrinterInfo {
    pub connected: bool,
    pub telemetry: Option<PrinterTelemetry>,
    /// `None` until the printer has pushed at least one status report.
    pub last_update: Option<DateTime<Utc>>,
}

impl PrinterInfo {
    pub fn gcode_state(&self) -> Option<&str> {
        self.telemetry
            .as_ref()?
            .print
            .as_ref()?
            .gcode_state
            .as_deref()
    }
}
