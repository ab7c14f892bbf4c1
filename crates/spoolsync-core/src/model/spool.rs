use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::SpoolRecord;
use crate::error::CoreError;

/// Inventory identifier of a spool record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SpoolId(u32);

impl SpoolId {
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    pub const fn get(self) -> u32 {
        self.0
    }
}

impl From<u32> for SpoolId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

impl fmt::Display for SpoolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SpoolId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<u32>().map(Self).map_err(|_| CoreError::InvalidSpoolId {
            input: s.to_owned(),
        })
    }
}

/// What a tray should hold, as chosen by the user.
///
/// `Unset` means nothing has been chosen yet; `NoSpool` is an explicit
/// choice to leave the tray empty. The wire sentinels (`null`, `-1`) map
/// onto these variants in [`SpoolSelection::from_wire`] and nowhere else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum SpoolSelection {
    #[default]
    Unset,
    NoSpool,
    Spool(SpoolId),
}

impl SpoolSelection {
    pub fn spool_id(self) -> Option<SpoolId> {
        match self {
            Self::Spool(id) => Some(id),
            Self::Unset | Self::NoSpool => None,
        }
    }

    pub fn is_unset(self) -> bool {
        matches!(self, Self::Unset)
    }

    /// Normalize a legacy wire value: `null` and negative ids (`-1`) are
    /// "no spool"; ids beyond `u32` cannot exist in the inventory and are
    /// treated the same way.
    pub fn from_wire(raw: Option<i64>) -> Self {
        match raw.map(u32::try_from) {
            Some(Ok(id)) => Self::Spool(SpoolId(id)),
            Some(Err(_)) | None => Self::NoSpool,
        }
    }

    /// Parse manual input. Empty text and `-1` clear the tray.
    pub fn parse_input(text: &str) -> Result<Self, CoreError> {
        let text = text.trim();
        if text.is_empty() || text == "-1" {
            return Ok(Self::NoSpool);
        }
        text.parse().map(Self::Spool)
    }
}

impl From<SpoolId> for SpoolSelection {
    fn from(id: SpoolId) -> Self {
        Self::Spool(id)
    }
}

impl fmt::Display for SpoolSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unset => f.write_str("unset"),
            Self::NoSpool => f.write_str("none"),
            Self::Spool(id) => write!(f, "{id}"),
        }
    }
}

/// Inventory lookup status for the settled selection.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum LookupState {
    /// Nothing to look up (selection is unset or "no spool").
    #[default]
    Idle,
    Loading { id: SpoolId },
    Found { record: Arc<SpoolRecord> },
    /// Resolved-absent: the inventory has no such spool, or answered
    /// with a failure. The two are not distinguished.
    NotFound { id: SpoolId },
}

impl LookupState {
    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading { .. })
    }

    pub fn record(&self) -> Option<&Arc<SpoolRecord>> {
        match self {
            Self::Found { record } => Some(record),
            _ => None,
        }
    }
}
