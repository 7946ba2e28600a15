//! Application-wide constants for pushcount.
//!
//! Centralizes the fixed identifiers shared by the background worker and the
//! page controller, plus the defaults used when no configuration exists.
//!
//! # Categories
//!
//! - **Storage**: Database, keyspace and record identifiers
//! - **Worker**: Script location and notification click target
//! - **Remote API**: Subscription collaborator defaults
//! - **Timeouts**: Network timeouts

use std::time::Duration;

// ============================================================================
// Storage
// ============================================================================

/// Name of the local database that holds the notification counter.
pub const DATABASE_NAME: &str = "notificationDB";

/// Keyspace (object store) inside [`DATABASE_NAME`].
pub const COUNTER_KEYSPACE: &str = "notificationStore";

/// Fixed key of the single counter record.
pub const COUNTER_RECORD_ID: u32 = 1;

// ============================================================================
// Worker
// ============================================================================

/// Script URL the page registers as its background worker.
pub const WORKER_SCRIPT_URL: &str = "./service-worker.js";

/// Page opened (or focused) when the user clicks a notification.
pub const DEFAULT_NOTIFICATION_TARGET_URL: &str = "https://web.dev";

// ============================================================================
// Remote API
// ============================================================================

/// Base URL of the remote subscription collaborator.
pub const DEFAULT_API_URL: &str = "https://pwa-server-s9i9.onrender.com";

/// Public application server key (URL-safe base64, uncompressed P-256 point).
pub const DEFAULT_VAPID_PUBLIC_KEY: &str =
    "BJY3LDeIoKdPkDrTq1eTko4iKIiPkoOsFa7rSylpeYg-ctuHMgR2rpg3dQFwvP7CRpLq-rWW1z7z-7rZUrWCsVI";

/// Path appended to the API URL when registering a subscription.
pub const ADD_SUBSCRIPTION_PATH: &str = "/add-subscription";

/// Path appended to the API URL when removing a subscription.
pub const REMOVE_SUBSCRIPTION_PATH: &str = "/remove-subscription";

// ============================================================================
// Timeouts
// ============================================================================

/// HTTP request timeout for calls to the subscription collaborator.
///
/// The calls are fire-and-forget, so this only bounds how long a detached
/// task can linger.
pub const HTTP_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
