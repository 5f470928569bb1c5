use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_plain::{derive_display_from_serialize, derive_fromstr_from_deserialize};

/// The tri-state value of a [`Condition`].
#[derive(Serialize, Deserialize, Debug, Eq, PartialEq, Clone, Copy, JsonSchema)]
pub enum ConditionStatus {
    True,
    False,
    Unknown,
}

impl Default for ConditionStatus {
    fn default() -> Self {
        Self::Unknown
    }
}

derive_display_from_serialize!(ConditionStatus);
derive_fromstr_from_deserialize!(ConditionStatus);

/// One typed aspect of convergence, reported in a resource's `status.conditions`. A conditions
/// list holds at most one entry per `type`.
#[derive(Serialize, Deserialize, Debug, Eq, PartialEq, Clone, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    /// The aspect this condition describes, e.g. `Available`.
    #[serde(rename = "type")]
    pub type_: String,
    pub status: ConditionStatus,
    /// A CamelCase, machine-readable cause for the last update.
    pub reason: String,
    /// A human-readable description of the last update.
    pub message: String,
    /// The last time `status` changed. Edits to `reason` or `message` leave this alone.
    pub last_transition_time: DateTime<Utc>,
}

impl Condition {
    /// Create a condition stamped with the current time.
    pub fn new<S1, S2, S3>(type_: S1, status: ConditionStatus, reason: S2, message: S3) -> Self
    where
        S1: Into<String>,
        S2: Into<String>,
        S3: Into<String>,
    {
        Self {
            type_: type_.into(),
            status,
            reason: reason.into(),
            message: message.into(),
            last_transition_time: Utc::now(),
        }
    }
}

/// Merge `condition` into `conditions`.
///
/// - If no condition of the same type exists, `condition` is appended.
/// - If one exists with a different status, it is replaced in place, taking the transition time
///   carried by `condition`.
/// - If one exists with the same status, only `reason` and `message` are replaced and the existing
///   transition time is kept.
///
/// Returns `true` if the list was changed in any way.
pub fn set_condition(conditions: &mut Vec<Condition>, condition: Condition) -> bool {
    let existing = match conditions.iter_mut().find(|c| c.type_ == condition.type_) {
        None => {
            conditions.push(condition);
            return true;
        }
        Some(existing) => existing,
    };

    if existing.status != condition.status {
        *existing = condition;
        return true;
    }

    let changed = existing.reason != condition.reason || existing.message != condition.message;
    existing.reason = condition.reason;
    existing.message = condition.message;
    changed
}

/// Find the condition of the given type, if present.
pub fn find_condition<'a>(conditions: &'a [Condition], type_: &str) -> Option<&'a Condition> {
    conditions.iter().find(|c| c.type_ == type_)
}
