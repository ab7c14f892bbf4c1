// Wire types for the bridge service.
//
// Every struct is lenient: missing fields default and unknown fields are
// ignored. The bridge proxies Spoolman records and raw printer MQTT state,
// neither of which has a stable schema.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Deserializer, Serialize};

// ── Inventory ───────────────────────────────────────────────────────

/// A spool record as proxied from Spoolman.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpoolRecord {
    pub id: u32,
    #[serde(default)]
    pub archived: bool,
    /// Remaining filament length in millimetres.
    #[serde(default)]
    pub remaining_length: Option<f64>,
    /// Remaining filament weight in grams.
    #[serde(default)]
    pub remaining_weight: Option<f64>,
    #[serde(default)]
    pub used_length: Option<f64>,
    #[serde(default)]
    pub used_weight: Option<f64>,
    #[serde(default)]
    pub initial_weight: Option<f64>,
    #[serde(default)]
    pub spool_weight: Option<f64>,
    #[serde(default)]
    pub registered: Option<String>,
    #[serde(default)]
    pub extra: HashMap<String, String>,
    #[serde(default)]
    pub filament: Filament,
}

impl SpoolRecord {
    /// Remaining length in metres, if the inventory tracks it.
    pub fn remaining_meters(&self) -> Option<f64> {
        self.remaining_length.map(|mm| mm / 1000.0)
    }

    /// Share of filament left, by length. A spool with no usage data
    /// counts as full.
    pub fn remaining_fraction(&self) -> f64 {
        match (self.remaining_length, self.used_length) {
            (Some(remaining), Some(used)) if remaining > 0.0 && used > 0.0 => {
                remaining / (remaining + used)
            }
            _ => 1.0,
        }
    }

    /// Display colour: `#RRGGBB` for single-colour filaments, or the
    /// component colours joined with `/` plus the blend direction.
    pub fn color_swatch(&self) -> Option<String> {
        let filament = &self.filament;
        if let Some(multi) = filament.multi_color_hexes.as_deref() {
            let parts: Vec<String> = multi
                .split(',')
                .map(str::trim)
                .filter(|hex| !hex.is_empty())
                .map(hex_code)
                .collect();
            if !parts.is_empty() {
                let joined = parts.join("/");
                return Some(match filament.multi_color_direction {
                    Some(direction) => format!("{joined} ({})", direction.as_str()),
                    None => joined,
                });
            }
        }
        filament
            .color_hex
            .as_deref()
            .map(str::trim)
            .filter(|hex| !hex.is_empty())
            .map(hex_code)
    }
}

fn hex_code(raw: &str) -> String {
    format!("#{}", raw.trim_start_matches('#').to_ascii_uppercase())
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Filament {
    #[serde(default)]
    pub id: u32,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub material: Option<String>,
    /// Single colour, `RRGGBB` without the leading `#`.
    #[serde(default)]
    pub color_hex: Option<String>,
    /// Comma-separated `RRGGBB` values for multi-colour filaments.
    #[serde(default)]
    pub multi_color_hexes: Option<String>,
    #[serde(default)]
    pub multi_color_direction: Option<MultiColorDirection>,
    #[serde(default)]
    pub diameter: Option<f64>,
    #[serde(default)]
    pub density: Option<f64>,
    #[serde(default)]
    pub weight: Option<f64>,
    #[serde(default)]
    pub vendor: Option<Vendor>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MultiColorDirection {
    Longitudinal,
    Coaxial,
}

impl MultiColorDirection {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Longitudinal => "longitudinal",
            Self::Coaxial => "coaxial",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Vendor {
    #[serde(default)]
    pub id: u32,
    #[serde(default)]
    pub name: String,
}

/// `GET /spools` answers either an id-keyed object or a plain array.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum SpoolsResponse {
    Map(BTreeMap<String, SpoolRecord>),
    List(Vec<SpoolRecord>),
}

impl SpoolsResponse {
    /// Normalize to an ordered id -> record map. Map keys are ignored in
    /// favour of each record's own `id`.
    pub(crate) fn into_map(self) -> BTreeMap<u32, SpoolRecord> {
        match self {
            Self::Map(map) => map.into_values().map(|s| (s.id, s)).collect(),
            Self::List(list) => list.into_iter().map(|s| (s.id, s)).collect(),
        }
    }
}

// ── Settings ────────────────────────────────────────────────────────

/// `GET /settings`. An unconfigured bridge answers `{}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SettingsResponse {
    #[serde(default)]
    pub tray_count: Option<u32>,
    /// Tray index (as string) -> spool id. `null` or negative means unset.
    #[serde(default)]
    pub trays: HashMap<String, Option<i64>>,
    #[serde(default)]
    pub active_tray: Option<i64>,
    #[serde(default)]
    pub locked_trays: Vec<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct TrayCountResponse {
    pub trays: u32,
}

/// `GET /` bridge health.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BridgeHealth {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub spoolman_url: Option<String>,
    #[serde(default)]
    pub spoolman_valid: bool,
}

// ── Commit payloads ─────────────────────────────────────────────────

/// `POST /tray/{tray}`. `spool_id: null` clears the tray.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct AssignTrayRequest {
    pub spool_id: Option<u32>,
}

/// `POST /set-uuid/{spool}`.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct SetTrayUuidRequest<'a> {
    pub tray_uuid: &'a str,
}

// ── Printer telemetry ───────────────────────────────────────────────

/// `GET /printer-info`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PrinterInfoResponse {
    #[serde(default)]
    pub connected: bool,
    #[serde(default)]
    pub status: Option<PrinterTelemetry>,
    /// Epoch seconds of the last pushed status; 0 if nothing was received.
    #[serde(default)]
    pub last_update: i64,
}

/// Merged printer state as reported over MQTT.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PrinterTelemetry {
    #[serde(default)]
    pub print: Option<PrintStatus>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PrintStatus {
    #[serde(default)]
    pub ams: Option<AmsBlock>,
    /// The external (virtual) tray.
    #[serde(default)]
    pub vt_tray: Option<TrayTelemetry>,
    #[serde(default)]
    pub gcode_state: Option<String>,
    #[serde(default)]
    pub gcode_file: Option<String>,
    #[serde(default)]
    pub layer_num: Option<u32>,
    #[serde(default)]
    pub total_layer_num: Option<u32>,
    #[serde(default)]
    pub mc_percent: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AmsBlock {
    #[serde(default)]
    pub ams: Vec<AmsUnitTelemetry>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AmsUnitTelemetry {
    #[serde(default, deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default)]
    pub humidity: Option<String>,
    #[serde(default)]
    pub tray: Vec<TrayTelemetry>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrayTelemetry {
    /// Slot id within its AMS unit. Firmware sends it as a string.
    #[serde(default, deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default)]
    pub tray_uuid: Option<String>,
    #[serde(default)]
    pub tray_type: Option<String>,
    #[serde(default)]
    pub tray_color: Option<String>,
}

/// Accept `"1"`, `1` or `null` for id fields; everything ends up textual.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Int(i64),
        Null,
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(s) => s,
        Raw::Int(n) => n.to_string(),
        Raw::Null => String::new(),
    })
}

// ── Error body ──────────────────────────────────────────────────────

#[derive(Deserialize)]
pub(crate) struct ErrorResponse {
    #[serde(default)]
    pub message: Option<String>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn spools_response_accepts_object_and_array() {
        let as_map: SpoolsResponse = serde_json::from_value(json!({
            "3": { "id": 3 },
            "1": { "id": 1 }
        }))
        .unwrap();
        let as_list: SpoolsResponse =
            serde_json::from_value(json!([{ "id": 3 }, { "id": 1 }])).unwrap();

        let a: Vec<u32> = as_map.into_map().into_keys().collect();
        let b: Vec<u32> = as_list.into_map().into_keys().collect();
        assert_eq!(a, vec![1, 3]);
        assert_eq!(a, b);
    }

    #[test]
    fn empty_settings_object_defaults() {
        let s: SettingsResponse = serde_json::from_value(json!({})).unwrap();
        assert_eq!(s, SettingsResponse::default());
    }

    #[test]
    fn tray_ids_accept_numbers() {
        let t: TrayTelemetry =
            serde_json::from_value(json!({ "id": 254, "tray_uuid": "AB" })).unwrap();
        assert_eq!(t.id, "254");
    }

    #[test]
    fn display_helpers() {
        let spool: SpoolRecord = serde_json::from_value(json!({
            "id": 1,
            "remaining_length": 120_500.0,
            "used_length": 120_500.0,
            "filament": { "color_hex": "ff0000", "multi_color_hexes": "" }
        }))
        .unwrap();
        assert_eq!(spool.remaining_meters(), Some(120.5));
        assert!((spool.remaining_fraction() - 0.5).abs() < f64::EPSILON);
        assert_eq!(spool.color_swatch().as_deref(), Some("#FF0000"));

        let multi = SpoolRecord {
            filament: Filament {
                multi_color_hexes: Some("000000, ffffff".into()),
                multi_color_direction: Some(MultiColorDirection::Coaxial),
                ..Filament::default()
            },
            ..SpoolRecord::default()
        };
        assert_eq!(
            multi.color_swatch().as_deref(),
            Some("#000000/#FFFFFF (coaxial)")
        );
        assert!((multi.remaining_fraction() - 1.0).abs() < f64::EPSILON);
        assert_eq!(SpoolRecord::default().color_swatch(), None);
    }

    #[test]
    fn assign_request_serializes_null() {
        let body = serde_json::to_value(AssignTrayRequest { spool_id: None }).unwrap();
        assert_eq!(body, json!({ "spool_id": null }));
    }
}
