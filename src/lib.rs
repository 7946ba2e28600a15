//! pushcount - push notification worker with a synchronized unread counter.
//!
//! Two execution contexts cooperate:
//!
//! - **Background worker** - receives push events, shows notifications and
//!   owns the persisted unread counter
//! - **Page controller** - manages the push subscription lifecycle and
//!   mirrors the counter into the visible badge
//!
//! # Architecture
//!
//! ```text
//! push → BackgroundWorker: counter += 1 → broadcast {notificationCount}
//!                                              ↓
//!                                  PageController: badge = n
//!
//! page visible → PageController: badge = 0 → {type: resetNotificationCount}
//!                                              ↓
//!                        BackgroundWorker: counter = 0 → broadcast 0
//! ```
//!
//! # Modules
//!
//! - [`worker`] - Background worker actor and connected-page registry
//! - [`page`] - Page controller state machine and UI model
//! - [`store`] - Persisted counter store
//! - [`notifications`] - Push subscriptions, remote collaborator, VAPID key
//! - [`platform`] - Host environment seams
//! - [`config`] - Configuration loading/saving

pub mod config;
pub mod constants;
pub mod env;
pub mod message;
pub mod notifications;
pub mod page;
pub mod platform;
pub mod store;
pub mod worker;

// Re-export commonly used types
pub use config::Config;
pub use message::CrossContextMessage;
pub use page::{PageController, PagePlatform, PageState, UiState, Visibility};
pub use store::{CounterStore, FileCounterStore, MemoryCounterStore};
pub use worker::{BackgroundWorker, PushOutcome, WorkerHandle};
