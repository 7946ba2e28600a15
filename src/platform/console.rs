//! Console platform used by the `pushcount` binary.
//!
//! Notifications and badges are printed to stdout; subscriptions are issued
//! in-process with freshly generated keys.

use anyhow::Result;
use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD as BASE64URL, Engine};
use p256::ecdsa::SigningKey;
use p256::elliptic_curve::rand_core::OsRng;
use rand::RngCore;
use tokio::sync::Mutex;

use super::{AppBadge, Permission, PermissionPrompt, PushManager, WorkerHost};
use crate::notifications::{PushSubscription, PushSubscriptionKeys, SubscriptionOptions};
use crate::worker::{ClientId, Notification};

/// Worker host that prints notifications and window requests.
#[derive(Debug, Default)]
pub struct ConsoleHost;

#[async_trait]
impl WorkerHost for ConsoleHost {
    async fn show_notification(&self, notification: &Notification) -> Result<()> {
        match &notification.options.body {
            Some(body) => println!("🔔 {}: {}", notification.title, body),
            None => println!("🔔 {}", notification.title),
        }
        Ok(())
    }

    async fn close_notification(&self, notification: &Notification) -> Result<()> {
        log::debug!("[Console] Closed notification \"{}\"", notification.title);
        Ok(())
    }

    async fn open_window(&self, url: &str) -> Result<()> {
        println!("Opening {url}");
        Ok(())
    }

    async fn focus_client(&self, id: ClientId) -> Result<()> {
        println!("Focusing page {id}");
        Ok(())
    }
}

/// App badge that prints the badge count.
#[derive(Debug, Default)]
pub struct ConsoleBadge;

#[async_trait]
impl AppBadge for ConsoleBadge {
    fn is_supported(&self) -> bool {
        true
    }

    async fn set(&self, count: u64) -> Result<()> {
        println!("[badge {count}]");
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        println!("[badge cleared]");
        Ok(())
    }
}

/// Platform without app badge support.
#[derive(Debug, Default)]
pub struct NoAppBadge;

#[async_trait]
impl AppBadge for NoAppBadge {
    fn is_supported(&self) -> bool {
        false
    }

    async fn set(&self, _count: u64) -> Result<()> {
        anyhow::bail!("App badges are not supported")
    }

    async fn clear(&self) -> Result<()> {
        anyhow::bail!("App badges are not supported")
    }
}

/// Permission prompt that always answers the same way.
#[derive(Debug, Clone, Copy)]
pub struct FixedPermission(pub Permission);

#[async_trait]
impl PermissionPrompt for FixedPermission {
    async fn request_permission(&self) -> Permission {
        self.0
    }
}

/// In-process push manager.
///
/// Holds at most one subscription, like a browser profile for one origin.
#[derive(Debug)]
pub struct LocalPushManager {
    endpoint_base: String,
    current: Mutex<Option<PushSubscription>>,
}

impl LocalPushManager {
    /// Create a manager issuing endpoints under `endpoint_base`.
    pub fn new(endpoint_base: impl Into<String>) -> Self {
        Self {
            endpoint_base: endpoint_base.into().trim_end_matches('/').to_string(),
            current: Mutex::new(None),
        }
    }
}

impl Default for LocalPushManager {
    fn default() -> Self {
        Self::new("https://push.localhost/send")
    }
}

#[async_trait]
impl PushManager for LocalPushManager {
    async fn get_subscription(&self) -> Result<Option<PushSubscription>> {
        Ok(self.current.lock().await.clone())
    }

    async fn subscribe(&self, options: &SubscriptionOptions) -> Result<PushSubscription> {
        anyhow::ensure!(
            options.user_visible_only,
            "Push subscriptions must be user-visible"
        );
        anyhow::ensure!(
            options.application_server_key.len() == 65,
            "applicationServerKey must be a 65-byte P-256 point"
        );

        let mut current = self.current.lock().await;
        if let Some(existing) = current.as_ref() {
            return Ok(existing.clone());
        }

        let receiver_key = SigningKey::random(&mut OsRng);
        let p256dh = BASE64URL.encode(receiver_key.verifying_key().to_encoded_point(false).as_bytes());
        let mut auth = [0u8; 16];
        rand::rng().fill_bytes(&mut auth);

        let subscription = PushSubscription {
            endpoint: format!("{}/{}", self.endpoint_base, uuid::Uuid::new_v4()),
            expiration_time: None,
            keys: PushSubscriptionKeys {
                p256dh,
                auth: BASE64URL.encode(auth),
            },
        };
        *current = Some(subscription.clone());
        Ok(subscription)
    }

    async fn unsubscribe(&self, subscription: &PushSubscription) -> Result<bool> {
        let mut current = self.current.lock().await;
        match current.as_ref() {
            Some(existing) if existing.endpoint == subscription.endpoint => {
                *current = None;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}
