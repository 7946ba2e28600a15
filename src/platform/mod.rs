//! Platform seams for the worker and the page.
//!
//! Everything the two contexts need from their host environment goes through
//! one of these traits: showing notifications, the push manager, the
//! permission prompt, the OS app badge, and worker registration.
//!
//! # Implementations
//!
//! ```text
//! WorkerHost        ← ConsoleHost (prints notifications)
//! PushManager       ← LocalPushManager (issues subscriptions in-process)
//! PermissionPrompt  ← FixedPermission
//! AppBadge          ← ConsoleBadge / NoAppBadge
//! WorkerRegistrar   ← InProcessRegistrar (spawns a BackgroundWorker)
//! ```

pub mod console;
pub mod local;

use anyhow::Result;
use async_trait::async_trait;

use crate::notifications::{PushSubscription, SubscriptionOptions};
use crate::worker::{ClientId, Notification, WorkerHandle};

pub use console::{ConsoleBadge, ConsoleHost, FixedPermission, LocalPushManager, NoAppBadge};
pub use local::InProcessRegistrar;

/// Outcome of a notification permission request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    /// The user allowed notifications.
    Granted,
    /// The user refused notifications.
    Denied,
    /// The user dismissed the prompt without deciding.
    Default,
}

impl Permission {
    /// Returns the string the platform uses for this outcome.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Granted => "granted",
            Self::Denied => "denied",
            Self::Default => "default",
        }
    }
}

impl std::fmt::Display for Permission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Permission {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "granted" => Ok(Self::Granted),
            "denied" => Ok(Self::Denied),
            "default" => Ok(Self::Default),
            other => anyhow::bail!("Unknown permission state: {other}"),
        }
    }
}

/// Services the background worker needs from its host.
#[async_trait]
pub trait WorkerHost: Send + Sync + std::fmt::Debug {
    /// Display a user-visible notification.
    async fn show_notification(&self, notification: &Notification) -> Result<()>;

    /// Dismiss a displayed notification.
    async fn close_notification(&self, notification: &Notification) -> Result<()>;

    /// Open `url` in a new browser tab.
    async fn open_window(&self, url: &str) -> Result<()>;

    /// Bring an already open page to the foreground.
    async fn focus_client(&self, id: ClientId) -> Result<()>;
}

/// The platform's push subscription manager.
#[async_trait]
pub trait PushManager: Send + Sync + std::fmt::Debug {
    /// Whether push messaging is available at all.
    fn is_supported(&self) -> bool {
        true
    }

    /// Current subscription, if any.
    async fn get_subscription(&self) -> Result<Option<PushSubscription>>;

    /// Create a new subscription.
    async fn subscribe(&self, options: &SubscriptionOptions) -> Result<PushSubscription>;

    /// Remove `subscription`. `Ok(false)` means the platform declined.
    async fn unsubscribe(&self, subscription: &PushSubscription) -> Result<bool>;
}

/// Notification permission prompt.
#[async_trait]
pub trait PermissionPrompt: Send + Sync + std::fmt::Debug {
    /// Ask the user for notification permission.
    async fn request_permission(&self) -> Permission;
}

/// OS-level app icon badge.
#[async_trait]
pub trait AppBadge: Send + Sync + std::fmt::Debug {
    /// Whether the platform can badge the app icon.
    fn is_supported(&self) -> bool;

    /// Show `count` on the app icon.
    async fn set(&self, count: u64) -> Result<()>;

    /// Remove the app icon badge.
    async fn clear(&self) -> Result<()>;
}

/// Registers the background worker script for a page.
#[async_trait]
pub trait WorkerRegistrar: Send + Sync + std::fmt::Debug {
    /// Whether the platform supports background workers.
    fn is_supported(&self) -> bool {
        true
    }

    /// Register `script_url` and return a handle to the active worker.
    ///
    /// Registering the same script again returns the existing worker.
    async fn register(&self, script_url: &str) -> Result<WorkerHandle>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permission_strings() {
        for permission in [Permission::Granted, Permission::Denied, Permission::Default] {
            let parsed: Permission = permission.as_str().parse().unwrap();
            assert_eq!(parsed, permission);
        }
        assert!("maybe".parse::<Permission>().is_err());
    }
}
