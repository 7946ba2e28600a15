//! Push payload decoding and notification descriptors.
//!
//! The push service delivers `{ "title": string, "option": NotificationOptions }`.
//! A payload that is not JSON or lacks `title` is rejected; a missing or
//! `null` `option` means default options.

use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer, Serialize};

/// Display options for a notification.
///
/// Well-known fields are typed; anything else the sender included is kept in
/// `extra` so it reaches the platform untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationOptions {
    /// Body text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    /// Icon URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    /// Badge image URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub badge: Option<String>,
    /// Tag used to identify and replace notifications.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    /// Arbitrary data attached to the notification.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    /// Remaining sender-supplied options.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Decoded push message.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PushPayload {
    /// Notification title.
    pub title: String,
    /// Notification options.
    #[serde(default, deserialize_with = "null_as_default")]
    pub option: NotificationOptions,
}

fn null_as_default<'de, D>(deserializer: D) -> Result<NotificationOptions, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<NotificationOptions>::deserialize(deserializer).map(Option::unwrap_or_default)
}

impl PushPayload {
    /// Decode a raw push payload.
    pub fn parse(data: &[u8]) -> Result<Self> {
        serde_json::from_slice(data).context("Push payload is not a {title, option} object")
    }

    /// Notification to display for this payload.
    pub fn into_notification(self) -> Notification {
        Notification {
            title: self.title,
            options: self.option,
            timestamp: chrono::Utc::now(),
        }
    }
}

/// A notification shown (or to be shown) by the platform.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    /// Title line.
    pub title: String,
    /// Display options.
    pub options: NotificationOptions,
    /// When the worker created the notification.
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl Notification {
    /// Notification tag, if any.
    pub fn tag(&self) -> Option<&str> {
        self.options.tag.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_payload() {
        let payload = PushPayload::parse(
            br#"{"title":"Hi","option":{"body":"there","tag":"t1","vibrate":[100]}}"#,
        )
        .unwrap();
        assert_eq!(payload.title, "Hi");
        assert_eq!(payload.option.body.as_deref(), Some("there"));
        assert_eq!(payload.option.tag.as_deref(), Some("t1"));
        assert_eq!(
            payload.option.extra.get("vibrate"),
            Some(&serde_json::json!([100]))
        );
    }

    #[test]
    fn test_missing_option_defaults() {
        let payload = PushPayload::parse(br#"{"title":"Hi"}"#).unwrap();
        assert_eq!(payload.option, NotificationOptions::default());
    }

    #[test]
    fn test_null_option_defaults() {
        let payload = PushPayload::parse(br#"{"title":"Hi","option":null}"#).unwrap();
        assert_eq!(payload.option, NotificationOptions::default());
        assert!(PushPayload::parse(br#"{"title":"Hi","option":"loud"}"#).is_err());
    }

    #[test]
    fn test_rejects_missing_title_and_garbage() {
        assert!(PushPayload::parse(br#"{"option":{}}"#).is_err());
        assert!(PushPayload::parse(b"plain text push").is_err());
        assert!(PushPayload::parse(b"").is_err());
    }

    #[test]
    fn test_notification_tag() {
        let notification = PushPayload::parse(br#"{"title":"Hi","option":{"tag":"news"}}"#)
            .unwrap()
            .into_notification();
        assert_eq!(notification.tag(), Some("news"));
        assert_eq!(notification.title, "Hi");
    }
}
