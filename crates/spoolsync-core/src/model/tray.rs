use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::SpoolId;
use crate::error::CoreError;

/// Slots per AMS unit.
pub const SLOTS_PER_UNIT: u8 = 4;

/// A logical tray index. `0..tray_count` address AMS slots across all
/// units; [`TraySlot::EXTERNAL`] is the external spool holder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TraySlot(u8);

/// Physical location of a tray inside the AMS chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AmsPosition {
    pub unit: u8,
    pub slot: u8,
}

impl TraySlot {
    pub const EXTERNAL: Self = Self(255);

    pub const fn new(index: u8) -> Self {
        Self(index)
    }

    pub const fn index(self) -> u8 {
        self.0
    }

    pub fn is_external(self) -> bool {
        self == Self::EXTERNAL
    }

    /// `unit = index / 4`, `slot = index % 4`. The external holder has no
    /// AMS position.
    pub fn ams_position(self) -> Option<AmsPosition> {
        if self.is_external() {
            return None;
        }
        Some(AmsPosition {
            unit: self.0 / SLOTS_PER_UNIT,
            slot: self.0 % SLOTS_PER_UNIT,
        })
    }

    /// Accept the external holder or any index below `tray_count`.
    pub fn validate(self, tray_count: u32) -> Result<Self, CoreError> {
        if self.is_external() || u32::from(self.0) < tray_count {
            Ok(self)
        } else {
            Err(CoreError::InvalidTray {
                index: self.0,
                tray_count,
            })
        }
    }

    /// Normalize a wire-level tray index. Out-of-range values are dropped.
    pub(crate) fn from_wire(raw: i64) -> Option<Self> {
        u8::try_from(raw).ok().map(Self)
    }
}

impl fmt::Display for TraySlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_external() {
            f.write_str("ext")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

impl FromStr for TraySlot {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.eq_ignore_ascii_case("ext") || trimmed.eq_ignore_ascii_case("external") {
            return Ok(Self::EXTERNAL);
        }
        trimmed
            .parse::<u8>()
            .map(Self)
            .map_err(|_| CoreError::InvalidTrayInput {
                input: s.to_owned(),
            })
    }
}

impl fmt::Display for AmsPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AMS {} / slot {}", self.unit + 1, self.slot + 1)
    }
}

// ── RFID ─────────────────────────────────────────────────────────────

/// Hardware tag read from a tray. Never empty and never the all-zero
/// "no tag" value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct RfidTag(String);

impl RfidTag {
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() || raw.chars().all(|c| c == '0') {
            None
        } else {
            Some(Self(raw.to_owned()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RfidTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ── Settings ─────────────────────────────────────────────────────────

/// Provisioned tray -> assigned spool. Slots without an assignment are
/// absent from the map.
pub type TrayAssignmentMap = BTreeMap<TraySlot, SpoolId>;

pub type LockedTraySet = BTreeSet<TraySlot>;

/// Normalized settings snapshot.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct TraySettings {
    pub tray_count: u32,
    pub assignments: TrayAssignmentMap,
    pub active_tray: Option<TraySlot>,
    pub locked: LockedTraySet,
}

impl TraySettings {
    /// Tray count assumed when the bridge does not report one.
    pub const DEFAULT_TRAY_COUNT: u32 = 4;

    pub fn assignment(&self, tray: TraySlot) -> Option<SpoolId> {
        self.assignments.get(&tray).copied()
    }

    pub fn is_locked(&self, tray: TraySlot) -> bool {
        self.locked.contains(&tray)
    }

    /// Every addressable tray: `0..tray_count` followed by the external
    /// holder.
    pub fn provisioned_slots(&self) -> Vec<TraySlot> {
        let count = u8::try_from(self.tray_count)
            .unwrap_or(u8::MAX)
            .min(TraySlot::EXTERNAL.0);
        (0..count)
            .map(TraySlot)
            .chain(std::iter::once(TraySlot::EXTERNAL))
            .collect()
    }

    pub fn is_provisioned(&self, tray: TraySlot) -> bool {
        tray.validate(self.tray_count).is_ok()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn ams_position_arithmetic() {
        assert_eq!(
            TraySlot::new(5).ams_position(),
            Some(AmsPosition { unit: 1, slot: 1 })
        );
        assert_eq!(
            TraySlot::new(3).ams_position(),
            Some(AmsPosition { unit: 0, slot: 3 })
        );
        assert_eq!(TraySlot::EXTERNAL.ams_position(), None);
    }

    #[test]
    fn validate_against_tray_count() {
        assert!(TraySlot::new(3).validate(4).is_ok());
        assert!(TraySlot::EXTERNAL.validate(0).is_ok());
        assert!(matches!(
            TraySlot::new(4).validate(4),
            Err(CoreError::InvalidTray { index: 4, tray_count: 4 })
        ));
    }

    #[test]
    fn parse_tray() {
        assert_eq!("ext".parse::<TraySlot>().unwrap(), TraySlot::EXTERNAL);
        assert_eq!("255".parse::<TraySlot>().unwrap(), TraySlot::EXTERNAL);
        assert_eq!(" 2 ".parse::<TraySlot>().unwrap(), TraySlot::new(2));
        assert!("tray".parse::<TraySlot>().is_err());
        assert_eq!(TraySlot::EXTERNAL.to_string(), "ext");
    }

    #[test]
    fn zero_tag_is_absent() {
        assert_eq!(RfidTag::parse("00000000000000000000000000000000"), None);
        assert_eq!(RfidTag::parse(""), None);
        assert_eq!(RfidTag::parse("A1B2").unwrap().as_str(), "A1B2");
    }

    #[test]
    fn provisioned_slots_include_external() {
        let settings = TraySettings {
            tray_count: 2,
            ..TraySettings::default()
        };
        assert_eq!(
            settings.provisioned_slots(),
            vec![TraySlot::new(0), TraySlot::new(1), TraySlot::EXTERNAL]
        );
    }
}
