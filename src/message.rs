//! Messages exchanged between the background worker and open pages.
//!
//! Two shapes travel across contexts:
//!
//! ```text
//! worker → page   { "notificationCount": 3 }
//! page → worker   { "type": "resetNotificationCount" }
//! ```
//!
//! Anything else is kept as [`CrossContextMessage::Other`] so receivers can
//! decide how to treat it. Pages treat an `Other` message as "one more
//! notification".

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// `type` value of a reset request.
const RESET_TYPE: &str = "resetNotificationCount";

/// 2^64, the first float past the `u64` range.
const U64_BOUND: f64 = 18_446_744_073_709_551_616.0;

/// A payload posted between the worker and a page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Value", into = "Value")]
pub enum CrossContextMessage {
    /// Worker → page: the counter's current value.
    NotificationCount(u64),
    /// Page → worker: set the counter back to zero.
    ResetNotificationCount,
    /// Any payload that is neither of the above.
    Other(Value),
}

impl CrossContextMessage {
    /// Whether this is a reset request.
    pub fn is_reset(&self) -> bool {
        matches!(self, Self::ResetNotificationCount)
    }

    /// Explicit count carried by this message, if any.
    pub fn notification_count(&self) -> Option<u64> {
        match self {
            Self::NotificationCount(count) => Some(*count),
            _ => None,
        }
    }
}

impl From<Value> for CrossContextMessage {
    fn from(value: Value) -> Self {
        if let Some(count) = value.get("notificationCount").and_then(count_value) {
            return Self::NotificationCount(count);
        }
        if value.get("type").and_then(Value::as_str) == Some(RESET_TYPE) {
            return Self::ResetNotificationCount;
        }
        Self::Other(value)
    }
}

/// Counter value of a JSON number. Senders may encode integers as floats
/// (`3.0`), which count as long as they are whole and non-negative.
fn count_value(value: &Value) -> Option<u64> {
    if let Some(count) = value.as_u64() {
        return Some(count);
    }
    let float = value.as_f64()?;
    let whole = float >= 0.0 && float < U64_BOUND && float.fract() == 0.0;
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        reason = "only used when `whole` holds"
    )]
    let count = float as u64;
    whole.then_some(count)
}

impl From<CrossContextMessage> for Value {
    fn from(message: CrossContextMessage) -> Self {
        match message {
            CrossContextMessage::NotificationCount(count) => json!({ "notificationCount": count }),
            CrossContextMessage::ResetNotificationCount => json!({ "type": RESET_TYPE }),
            CrossContextMessage::Other(value) => value,
        }
    }
}
