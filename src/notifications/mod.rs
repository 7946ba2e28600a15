//! Web push subscription plumbing used by the page controller.
//!
//! # Architecture
//!
//! ```text
//! Page subscribes with the server's VAPID public key
//!     ↓
//! Platform issues a PushSubscription (endpoint + keys)
//!     ↓
//! Page forwards it to the remote collaborator (fire-and-forget POST)
//!     ↓
//! Push service delivers payloads to the background worker
//! ```

// Rust guideline compliant 2026-02

pub mod push;
pub mod vapid;

pub use push::{PushSubscription, PushSubscriptionKeys, SubscriptionApi, SubscriptionOptions};
pub use vapid::VapidPublicKey;
