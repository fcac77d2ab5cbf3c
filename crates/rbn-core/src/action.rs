//! Audit action records written by the action journal.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// State-changing actions worth an audit entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    /// The agent came up and the countdown started.
    AgentStarted,

    /// The operator chose one of the configured delay options.
    Delayed,

    /// The countdown expired with delay credit left; the smallest
    /// option was applied automatically.
    AutoDelayed,

    /// The countdown expired with no credit left; the immediate-reboot
    /// flag was raised.
    RebootNow,
}

impl ActionKind {
    /// Canonical string form, as written to the journal files.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AgentStarted => "agent_started",
            Self::Delayed => "delayed",
            Self::AutoDelayed => "auto_delayed",
            Self::RebootNow => "reboot_now",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One immutable audit record.
///
/// Appended once per state-changing action and never edited afterwards.
/// The remaining-seconds field is a snapshot taken at the moment the
/// action was issued, not a live reference to the countdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggedAction {
    /// When the action was issued (UTC, RFC 3339 on the wire).
    pub timestamp: DateTime<Utc>,

    /// What happened.
    pub action: ActionKind,

    /// Countdown seconds remaining at the time of the action.
    pub remaining_seconds: u64,
}

impl LoggedAction {
    /// Creates a record stamped with the current time.
    pub fn now(action: ActionKind, remaining_seconds: u64) -> Self {
        Self {
            timestamp: Utc::now(),
            action,
            remaining_seconds,
        }
    }
}
