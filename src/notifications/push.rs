//! Push subscription records and the remote subscription collaborator.
//!
//! The platform issues a [`PushSubscription`] when the page subscribes. The
//! page forwards it to `POST {api_url}/add-subscription` and, on unsubscribe,
//! sends `{ "endpoint": ... }` to `POST {api_url}/remove-subscription`.
//! Both calls are fire-and-forget: they run as detached tasks, their
//! response bodies are never read, and failures only reach the log.

// Rust guideline compliant 2026-02

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;

use crate::constants::{ADD_SUBSCRIPTION_PATH, HTTP_REQUEST_TIMEOUT, REMOVE_SUBSCRIPTION_PATH};

/// Keys the push service uses to encrypt payloads for this browser.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushSubscriptionKeys {
    /// Browser's P-256 ECDH public key (base64url).
    pub p256dh: String,
    /// Shared auth secret (base64url).
    pub auth: String,
}

/// A browser-issued push subscription descriptor.
///
/// Serializes to the same JSON the browser produces for
/// `JSON.stringify(subscription)`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushSubscription {
    /// Push service endpoint URL.
    pub endpoint: String,
    /// Expiration time in milliseconds since the epoch, if the service set one.
    pub expiration_time: Option<u64>,
    /// Payload encryption keys.
    pub keys: PushSubscriptionKeys,
}

/// Options passed to the platform when creating a subscription.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubscriptionOptions {
    /// Every push must result in a visible notification.
    pub user_visible_only: bool,
    /// Raw application server public key (65-byte uncompressed P-256 point).
    pub application_server_key: Vec<u8>,
}

impl SubscriptionOptions {
    /// Options for a user-visible subscription under the given server key.
    pub fn user_visible(application_server_key: Vec<u8>) -> Self {
        Self {
            user_visible_only: true,
            application_server_key,
        }
    }
}

/// Body of a remove-subscription request.
#[derive(Debug, Serialize)]
struct RemoveSubscriptionBody<'a> {
    endpoint: &'a str,
}

/// Client for the remote subscription collaborator.
///
/// Cheap to clone; clones share one `reqwest::Client` connection pool.
#[derive(Clone, Debug)]
pub struct SubscriptionApi {
    client: reqwest::Client,
    api_url: String,
}

impl SubscriptionApi {
    /// Create a client for the collaborator at `api_url`.
    pub fn new(api_url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(HTTP_REQUEST_TIMEOUT)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self::with_client(client, api_url))
    }

    /// Create a client reusing an existing `reqwest::Client`.
    pub fn with_client(client: reqwest::Client, api_url: impl Into<String>) -> Self {
        let api_url = api_url.into().trim_end_matches('/').to_string();
        Self { client, api_url }
    }

    /// Base URL of the collaborator.
    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    /// Forward a new subscription to the collaborator without waiting.
    ///
    /// The returned handle may be dropped; the request still runs.
    pub fn add_subscription(&self, subscription: &PushSubscription) -> JoinHandle<()> {
        let api = self.clone();
        let body = serde_json::to_value(subscription);
        tokio::spawn(async move {
            let result = match body {
                Ok(body) => api.post(ADD_SUBSCRIPTION_PATH, &body).await,
                Err(e) => Err(anyhow::Error::new(e).context("Failed to encode subscription")),
            };
            if let Err(e) = result {
                log::warn!("[SubscriptionApi] add-subscription failed: {e:#}");
            }
        })
    }

    /// Ask the collaborator to forget the subscription at `endpoint`
    /// without waiting.
    pub fn remove_subscription(&self, endpoint: &str) -> JoinHandle<()> {
        let api = self.clone();
        let endpoint = endpoint.to_string();
        tokio::spawn(async move {
            let body = RemoveSubscriptionBody {
                endpoint: &endpoint,
            };
            if let Err(e) = api.post(REMOVE_SUBSCRIPTION_PATH, &body).await {
                log::warn!("[SubscriptionApi] remove-subscription failed: {e:#}");
            }
        })
    }

    async fn post<T: Serialize + ?Sized>(&self, path: &str, body: &T) -> Result<()> {
        let url = format!("{}{}", self.api_url, path);
        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .with_context(|| format!("POST {url} failed"))?;

        let status = response.status();
        if status.is_success() {
            log::debug!("[SubscriptionApi] POST {path} -> {status}");
            Ok(())
        } else {
            anyhow::bail!("POST {path} returned HTTP {status}")
        }
    }
}
