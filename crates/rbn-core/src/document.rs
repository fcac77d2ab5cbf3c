//! Schema-flexible configuration document.
//!
//! The document is an ordered map of string keys to loosely-typed JSON
//! values, not a fixed record: recognized fields get typed accessors,
//! and every key this build does not recognize round-trips through
//! load/persist unchanged. Legacy camelCase spellings of the recognized
//! keys are normalized to snake_case on load and never re-introduced.

use chrono::{DateTime, Duration, Local};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

// ============================================================================
// Recognized Keys
// ============================================================================

/// Notice body text shown in the countdown panel.
pub const KEY_CUSTOM_MESSAGE: &str = "custom_message";
/// Reboot policy mode, see [`crate::RebootPolicy`].
pub const KEY_REBOOT_CONFIG: &str = "reboot_config";
/// Remaining number of allowed deferrals.
pub const KEY_DELAY_COUNTER: &str = "delay_counter";
/// Next scheduled reboot instant, `yyyy-MM-dd HH:mm:ss`, empty when unscheduled.
pub const KEY_SCHEDULED_TIME: &str = "scheduled_time";
/// Whether an external scheduler entry currently exists.
pub const KEY_TASK_SCHEDULED: &str = "task_scheduled";
/// Immediate-reboot flag, set only on a forced or expired reboot.
pub const KEY_REBOOT_NOW: &str = "reboot_now";

/// Legacy camelCase spellings accepted on load, mapped to their
/// canonical keys. The legacy key is always removed; when both
/// spellings are present the canonical value wins.
const LEGACY_KEYS: &[(&str, &str)] = &[
    ("customMessage", KEY_CUSTOM_MESSAGE),
    ("rebootConfig", KEY_REBOOT_CONFIG),
    ("delayCounter", KEY_DELAY_COUNTER),
    ("scheduledTime", KEY_SCHEDULED_TIME),
    ("taskScheduled", KEY_TASK_SCHEDULED),
    ("rebootNow", KEY_REBOOT_NOW),
];

/// Notice text used when `custom_message` is absent or blank.
pub const DEFAULT_NOTICE_MESSAGE: &str =
    "This computer must restart to complete required maintenance.";

/// Wall-clock format for `scheduled_time`.
pub const SCHEDULED_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

// ============================================================================
// Config Document
// ============================================================================

/// In-memory mirror of the on-disk JSON configuration object.
///
/// Typed accessors decode recognized keys through the underlying map
/// and fall back to a default on absence or type mismatch; they never
/// panic and never drop the raw value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConfigDocument {
    entries: Map<String, Value>,
}

impl ConfigDocument {
    /// Creates an empty document (the first-run state).
    pub fn empty() -> Self {
        Self::default()
    }

    /// Builds a document from a parsed JSON value.
    ///
    /// Returns `None` unless the value is a JSON object; callers treat
    /// that as "start from an empty document".
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(entries) => Some(Self { entries }),
            _ => None,
        }
    }

    /// Serializes the full document as pretty-printed JSON bytes.
    pub fn to_pretty_bytes(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec_pretty(&self.entries)
    }

    /// Number of keys currently held, recognized or not.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when the document holds no keys at all.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Raw read of any key, recognized or not.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    /// Raw insert of any key, recognized or not.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.entries.insert(key.into(), value);
    }

    // ========================================================================
    // Legacy Key Normalization
    // ========================================================================

    /// Rewrites legacy camelCase keys to their canonical snake_case form.
    ///
    /// The legacy key is removed unconditionally; its value is carried
    /// over only when the canonical key is not already present. Returns
    /// the number of legacy keys that were removed.
    pub fn normalize_legacy_keys(&mut self) -> usize {
        let mut removed = 0;
        for (legacy, canonical) in LEGACY_KEYS {
            // shift_remove keeps the relative order of the other keys.
            if let Some(value) = self.entries.shift_remove(*legacy) {
                removed += 1;
                if !self.entries.contains_key(*canonical) {
                    self.entries.insert((*canonical).to_string(), value);
                } else {
                    debug!(legacy, canonical, "dropping legacy key: canonical key present");
                }
            }
        }
        removed
    }

    // ========================================================================
    // Typed Accessors
    // ========================================================================

    fn str_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        match self.entries.get(key) {
            Some(Value::String(s)) => s,
            _ => default,
        }
    }

    fn u64_or(&self, key: &str, default: u64) -> u64 {
        match self.entries.get(key) {
            Some(Value::Number(n)) => n.as_u64().unwrap_or(default),
            _ => default,
        }
    }

    fn bool_or(&self, key: &str, default: bool) -> bool {
        match self.entries.get(key) {
            Some(Value::Bool(b)) => *b,
            _ => default,
        }
    }

    /// Notice body text; the fixed default when absent or blank.
    pub fn custom_message(&self) -> &str {
        let message = self.str_or(KEY_CUSTOM_MESSAGE, DEFAULT_NOTICE_MESSAGE);
        if message.trim().is_empty() {
            DEFAULT_NOTICE_MESSAGE
        } else {
            message
        }
    }

    /// Reboot policy mode; `Graceful` when absent, `Other` for any
    /// unrecognized raw string.
    pub fn reboot_policy(&self) -> crate::RebootPolicy {
        match self.entries.get(KEY_REBOOT_CONFIG) {
            Some(Value::String(raw)) => crate::RebootPolicy::from_raw(raw),
            _ => crate::RebootPolicy::default(),
        }
    }

    /// Remaining deferral credit; 0 when absent or mistyped.
    pub fn delay_counter(&self) -> u64 {
        self.u64_or(KEY_DELAY_COUNTER, 0)
    }

    /// The scheduled reboot instant, empty string when unscheduled.
    pub fn scheduled_time(&self) -> &str {
        self.str_or(KEY_SCHEDULED_TIME, "")
    }

    /// Whether an external scheduler entry exists.
    pub fn task_scheduled(&self) -> bool {
        self.bool_or(KEY_TASK_SCHEDULED, false)
    }

    /// Whether the immediate-reboot flag is raised.
    pub fn reboot_now(&self) -> bool {
        self.bool_or(KEY_REBOOT_NOW, false)
    }

    // ========================================================================
    // Mutations
    // ========================================================================

    /// Raises the immediate-reboot flag.
    pub fn set_reboot_now(&mut self) {
        self.insert(KEY_REBOOT_NOW, Value::Bool(true));
    }

    /// Clears any scheduled-reboot bookkeeping.
    pub fn clear_scheduled_status(&mut self) {
        self.insert(KEY_SCHEDULED_TIME, Value::String(String::new()));
        self.insert(KEY_TASK_SCHEDULED, Value::Bool(false));
    }

    /// Records a deferral of `seconds` relative to `now`.
    ///
    /// Decrements the delay counter by one if it is currently above
    /// zero; an absent or zero counter stays as it is (no underflow, no
    /// error). Independent of whether the countdown state machine
    /// accepted the matching delay - callers check the state machine
    /// first.
    pub fn apply_delay(&mut self, seconds: u64, now: DateTime<Local>) {
        let counter = self.delay_counter();
        if counter > 0 {
            self.insert(KEY_DELAY_COUNTER, Value::from(counter - 1));
        }

        let scheduled = now + Duration::seconds(seconds as i64);
        self.insert(
            KEY_SCHEDULED_TIME,
            Value::String(scheduled.format(SCHEDULED_TIME_FORMAT).to_string()),
        );
        self.insert(KEY_TASK_SCHEDULED, Value::Bool(false));
        self.insert(KEY_REBOOT_NOW, Value::Bool(false));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn fixed_now() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 3, 10, 14, 30, 0).single().unwrap()
    }

    fn doc_from(value: Value) -> ConfigDocument {
        ConfigDocument::from_value(value).expect("object expected")
    }

    #[test]
    fn test_from_value_rejects_non_objects() {
        assert!(ConfigDocument::from_value(json!([1, 2, 3])).is_none());
        assert!(ConfigDocument::from_value(json!("text")).is_none());
        assert!(ConfigDocument::from_value(json!(null)).is_none());
    }

    #[test]
    fn test_apply_delay_on_empty_document() {
        // Scenario: initial document {}, delay by 1800 seconds.
        let mut doc = ConfigDocument::empty();
        doc.apply_delay(1800, fixed_now());

        // Absent counter stays absent; no underflow, no insertion.
        assert!(doc.get(KEY_DELAY_COUNTER).is_none());
        assert_eq!(doc.delay_counter(), 0);

        assert_eq!(doc.scheduled_time(), "2024-03-10 15:00:00");
        assert!(!doc.task_scheduled());
        assert!(!doc.reboot_now());
    }

    #[test]
    fn test_delay_counter_never_goes_negative() {
        // Scenario: {"delay_counter": 2}, three delays in a row.
        let mut doc = doc_from(json!({ "delay_counter": 2 }));

        doc.apply_delay(1800, fixed_now());
        assert_eq!(doc.delay_counter(), 1);

        doc.apply_delay(1800, fixed_now());
        assert_eq!(doc.delay_counter(), 0);

        doc.apply_delay(1800, fixed_now());
        assert_eq!(doc.delay_counter(), 0);
    }

    #[test]
    fn test_apply_delay_clears_reboot_flags() {
        let mut doc = doc_from(json!({ "reboot_now": true, "task_scheduled": true }));

        doc.apply_delay(1800, fixed_now());

        assert!(!doc.reboot_now());
        assert!(!doc.task_scheduled());
    }

    #[test]
    fn test_set_reboot_now() {
        let mut doc = ConfigDocument::empty();
        assert!(!doc.reboot_now());

        doc.set_reboot_now();
        assert!(doc.reboot_now());
    }

    #[test]
    fn test_clear_scheduled_status() {
        let mut doc = doc_from(json!({
            "scheduled_time": "2024-03-10 16:00:00",
            "task_scheduled": true,
        }));

        doc.clear_scheduled_status();

        assert_eq!(doc.scheduled_time(), "");
        assert!(!doc.task_scheduled());
    }

    #[test]
    fn test_unknown_keys_survive_mutation() {
        let mut doc = doc_from(json!({
            "site_tag": "lab-3",
            "retries": 7,
        }));

        doc.set_reboot_now();
        doc.apply_delay(1800, fixed_now());
        doc.clear_scheduled_status();

        assert_eq!(doc.get("site_tag"), Some(&json!("lab-3")));
        assert_eq!(doc.get("retries"), Some(&json!(7)));
    }

    #[test]
    fn test_legacy_keys_normalized() {
        let mut doc = doc_from(json!({
            "customMessage": "move over",
            "delayCounter": 3,
        }));

        let removed = doc.normalize_legacy_keys();

        assert_eq!(removed, 2);
        assert!(doc.get("customMessage").is_none());
        assert!(doc.get("delayCounter").is_none());
        assert_eq!(doc.custom_message(), "move over");
        assert_eq!(doc.delay_counter(), 3);
    }

    #[test]
    fn test_canonical_key_wins_over_legacy() {
        let mut doc = doc_from(json!({
            "customMessage": "x",
            "custom_message": "y",
        }));

        doc.normalize_legacy_keys();

        assert!(doc.get("customMessage").is_none());
        assert_eq!(doc.custom_message(), "y");
    }

    #[test]
    fn test_custom_message_defaults_when_absent_or_blank() {
        let doc = ConfigDocument::empty();
        assert_eq!(doc.custom_message(), DEFAULT_NOTICE_MESSAGE);

        let doc = doc_from(json!({ "custom_message": "   " }));
        assert_eq!(doc.custom_message(), DEFAULT_NOTICE_MESSAGE);

        let doc = doc_from(json!({ "custom_message": "patch window" }));
        assert_eq!(doc.custom_message(), "patch window");
    }

    #[test]
    fn test_typed_accessors_default_on_type_mismatch() {
        let doc = doc_from(json!({
            "delay_counter": "three",
            "reboot_now": "yes",
            "custom_message": 42,
            "reboot_config": 1,
        }));

        assert_eq!(doc.delay_counter(), 0);
        assert!(!doc.reboot_now());
        assert_eq!(doc.custom_message(), DEFAULT_NOTICE_MESSAGE);
        assert_eq!(doc.reboot_policy(), crate::RebootPolicy::Graceful);
    }

    #[test]
    fn test_negative_counter_value_reads_as_zero() {
        let doc = doc_from(json!({ "delay_counter": -4 }));
        assert_eq!(doc.delay_counter(), 0);
    }

    #[test]
    fn test_reboot_policy_mapping() {
        let doc = doc_from(json!({ "reboot_config": "force_after_patch" }));
        assert_eq!(doc.reboot_policy(), crate::RebootPolicy::ForceAfterPatch);

        let doc = doc_from(json!({ "reboot_config": "whatever" }));
        assert_eq!(doc.reboot_policy(), crate::RebootPolicy::Other);

        let doc = ConfigDocument::empty();
        assert_eq!(doc.reboot_policy(), crate::RebootPolicy::Graceful);
    }

    #[test]
    fn test_serialization_preserves_key_order() {
        let doc = doc_from(json!({
            "zeta": 1,
            "alpha": 2,
            "custom_message": "m",
        }));

        let bytes = doc.to_pretty_bytes().unwrap();
        let text = String::from_utf8(bytes).unwrap();

        let zeta = text.find("zeta").unwrap();
        let alpha = text.find("alpha").unwrap();
        let message = text.find("custom_message").unwrap();
        assert!(zeta < alpha && alpha < message);
    }
}
