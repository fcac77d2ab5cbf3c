//! Reboot policy mode from the configuration document.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Policy mode controlling how the host reboot is carried out.
///
/// Stored in the configuration document as a raw string. Unknown raw
/// values map to `Other` rather than failing the load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RebootPolicy {
    /// Ask the OS for an orderly reboot.
    Graceful,

    /// Force the reboot once patching has finished.
    ForceAfterPatch,

    /// Any raw value this build does not recognize.
    Other,
}

impl RebootPolicy {
    /// Parses from the raw string stored in the config document.
    ///
    /// Unknown values become `Other`; this never fails.
    pub fn from_raw(raw: &str) -> Self {
        match raw {
            "graceful" => Self::Graceful,
            "force_after_patch" => Self::ForceAfterPatch,
            _ => Self::Other,
        }
    }

    /// Returns the canonical string form written to the config document.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Graceful => "graceful",
            Self::ForceAfterPatch => "force_after_patch",
            Self::Other => "other",
        }
    }
}

impl Default for RebootPolicy {
    fn default() -> Self {
        Self::Graceful
    }
}

impl fmt::Display for RebootPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
