//! Foreground page controller.
//!
//! Registers the background worker, keeps the subscribe/unsubscribe buttons
//! consistent with the platform's push subscription, and mirrors the worker's
//! counter into the in-page badge and the OS app badge.
//!
//! # Counter sync
//!
//! ```text
//! worker broadcast {notificationCount: n} → mirror = n → app badge n
//! worker message without a count          → mirror += 1 → app badge
//! page becomes visible                    → mirror = 0, app badge cleared,
//!                                           reset request → worker
//! ```
//!
//! The visible-page clear is optimistic. A push landing between the clear and
//! the worker's reset broadcast is resolved by whichever count message arrives
//! last.

pub mod ui;

use std::sync::Arc;
use tokio::task::JoinHandle;

use crate::constants::WORKER_SCRIPT_URL;
use crate::message::CrossContextMessage;
use crate::notifications::{SubscriptionApi, SubscriptionOptions, VapidPublicKey};
use crate::platform::{AppBadge, Permission, PermissionPrompt, PushManager, WorkerRegistrar};
use crate::worker::{ClientConnection, WorkerHandle};

pub use ui::{PageState, SubscriptionState, UiState, Visibility};

/// Errors surfaced by page operations.
///
/// Every error leaves the UI in its last known-good state.
#[derive(Debug)]
pub enum PageError {
    /// The platform lacks worker or push support.
    Unsupported,
    /// The user declined notification permission.
    PermissionDenied,
    /// Worker registration failed.
    Registration(String),
    /// An operation needed a registered worker.
    NotRegistered,
    /// Creating or looking up the subscription failed.
    Subscribe(String),
    /// Removing the subscription failed or was declined.
    Unsubscribe(String),
}

impl std::fmt::Display for PageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unsupported => write!(f, "Background workers or push messaging unsupported"),
            Self::PermissionDenied => write!(f, "Notification permission denied"),
            Self::Registration(msg) => write!(f, "Worker registration failed: {msg}"),
            Self::NotRegistered => write!(f, "No worker registered"),
            Self::Subscribe(msg) => write!(f, "Subscribe failed: {msg}"),
            Self::Unsubscribe(msg) => write!(f, "Unsubscribe failed: {msg}"),
        }
    }
}

impl std::error::Error for PageError {}

/// Platform services the page depends on.
#[derive(Debug, Clone)]
pub struct PagePlatform {
    /// Worker registration.
    pub registrar: Arc<dyn WorkerRegistrar>,
    /// Push subscription manager.
    pub push: Arc<dyn PushManager>,
    /// Notification permission prompt.
    pub permissions: Arc<dyn PermissionPrompt>,
    /// OS app badge.
    pub badge: Arc<dyn AppBadge>,
    /// Remote subscription collaborator.
    pub api: SubscriptionApi,
}

/// Controller for one open page.
#[derive(Debug)]
pub struct PageController {
    platform: PagePlatform,
    url: String,
    server_key: VapidPublicKey,
    state: PageState,
    ui: UiState,
    worker: Option<WorkerHandle>,
    connection: Option<ClientConnection>,
    background_requests: Vec<JoinHandle<()>>,
}

impl PageController {
    /// Create a controller for a page at `url`. Call [`PageController::load`]
    /// to register the worker.
    pub fn new(platform: PagePlatform, url: impl Into<String>, server_key: VapidPublicKey) -> Self {
        Self {
            platform,
            url: url.into(),
            server_key,
            state: PageState::Unregistered,
            ui: UiState::default(),
            worker: None,
            connection: None,
            background_requests: Vec::new(),
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> PageState {
        self.state
    }

    /// Current UI model.
    pub fn ui(&self) -> &UiState {
        &self.ui
    }

    /// In-memory counter mirror.
    pub fn notification_count(&self) -> u64 {
        self.ui.notification_count
    }

    /// Worker this page is controlled by, once registered.
    pub fn worker(&self) -> Option<&WorkerHandle> {
        self.worker.as_ref()
    }

    /// Register the worker, connect to it and query the subscription.
    ///
    /// On failure the subscribe button stays disabled and the error is logged.
    pub async fn load(&mut self) -> Result<(), PageError> {
        if !self.platform.registrar.is_supported() || !self.platform.push.is_supported() {
            log::error!("[Page] Platform does not support background workers or push messages");
            self.ui.status_message = "Push notifications are not supported".into();
            return Err(PageError::Unsupported);
        }

        self.state = PageState::Registering;
        let worker = match self.platform.registrar.register(WORKER_SCRIPT_URL).await {
            Ok(worker) => worker,
            Err(e) => {
                log::error!("[Page] An error occurred while registering the worker: {e:#}");
                self.state = PageState::Unregistered;
                self.ui.status_message = "Worker registration failed".into();
                return Err(PageError::Registration(format!("{e:#}")));
            }
        };
        log::info!("[Page] Worker was registered");
        self.ui.subscribe_enabled = true;
        self.state = PageState::Registered(SubscriptionState::Unknown);

        match worker.connect(self.url.clone()).await {
            Ok(connection) => self.connection = Some(connection),
            Err(e) => log::error!("[Page] Could not connect to worker: {e:#}"),
        }
        self.worker = Some(worker);

        self.refresh_subscription().await;
        Ok(())
    }

    /// Re-read the platform subscription and update the buttons.
    pub async fn refresh_subscription(&mut self) {
        if !self.state.is_registered() {
            return;
        }
        match self.platform.push.get_subscription().await {
            Ok(Some(_)) => self.mark_subscribed(true),
            Ok(None) => self.mark_subscribed(false),
            Err(e) => log::error!("[Page] Failed to query push subscription: {e:#}"),
        }
    }

    fn mark_subscribed(&mut self, subscribed: bool) {
        self.ui.show_subscribed(subscribed);
        self.state = PageState::Registered(if subscribed {
            SubscriptionState::Subscribed
        } else {
            SubscriptionState::Unsubscribed
        });
    }

    /// Apply one message from the worker.
    pub async fn handle_message(&mut self, message: CrossContextMessage) {
        log::debug!("[Page] Message received from worker: {message:?}");
        let count = match message.notification_count() {
            Some(count) => count,
            None => self.ui.notification_count.saturating_add(1),
        };
        log::info!("[Page] Setting notification count to {count}");
        self.ui.notification_count = count;
        self.set_app_badge(count).await;
    }

    /// Apply every message the worker has already sent. Returns how many.
    pub async fn pump_messages(&mut self) -> usize {
        let mut handled = 0;
        while let Some(message) = self.connection.as_mut().and_then(ClientConnection::try_recv) {
            self.handle_message(message).await;
            handled += 1;
        }
        handled
    }

    /// Wait for the next worker message and apply it.
    ///
    /// Returns `false` if the page is not connected or the worker stopped.
    pub async fn next_message(&mut self) -> bool {
        let Some(connection) = self.connection.as_mut() else {
            return false;
        };
        match connection.recv().await {
            Some(message) => {
                self.handle_message(message).await;
                true
            }
            None => false,
        }
    }

    /// React to a page visibility change.
    pub async fn on_visibility_change(&mut self, visibility: Visibility) {
        if visibility == Visibility::Visible {
            self.reset_notification_count().await;
        }
    }

    async fn reset_notification_count(&mut self) {
        log::info!("[Page] Resetting notification count");
        self.ui.notification_count = 0;
        self.clear_app_badge().await;

        if let (Some(worker), Some(connection)) = (&self.worker, &self.connection) {
            if let Err(e) =
                worker.post_message(connection.id(), CrossContextMessage::ResetNotificationCount)
            {
                log::warn!("[Page] Could not send reset request: {e:#}");
            }
        }
    }

    /// Subscribe to push notifications.
    ///
    /// Subscribing while a subscription already exists creates nothing new
    /// and still leaves the page subscribed.
    pub async fn subscribe(&mut self) -> Result<(), PageError> {
        self.ui.subscribe_enabled = false;

        let permission = self.platform.permissions.request_permission().await;
        match permission {
            Permission::Denied => {
                log::error!("[Page] The user explicitly denied the permission request");
                self.ui.subscribe_enabled = true;
                self.ui.status_message = "Notification permission denied".into();
                return Err(PageError::PermissionDenied);
            }
            Permission::Granted => log::info!("[Page] The user accepted the permission request"),
            Permission::Default => log::debug!("[Page] Permission prompt dismissed"),
        }

        if self.worker.is_none() {
            log::error!("[Page] Cannot subscribe without a registered worker");
            return Err(PageError::NotRegistered);
        }

        match self.platform.push.get_subscription().await {
            Ok(Some(_)) => {
                log::info!("[Page] User is already subscribed");
                self.mark_subscribed(true);
                self.ui.status_message = "Already subscribed".into();
                return Ok(());
            }
            Ok(None) => {}
            Err(e) => {
                log::error!("[Page] Failed to query push subscription: {e:#}");
                self.ui.subscribe_enabled = true;
                return Err(PageError::Subscribe(format!("{e:#}")));
            }
        }

        let options = SubscriptionOptions::user_visible(self.server_key.as_bytes().to_vec());
        let subscription = match self.platform.push.subscribe(&options).await {
            Ok(subscription) => subscription,
            Err(e) => {
                log::error!("[Page] Failed to subscribe: {e:#}");
                self.ui.subscribe_enabled = true;
                self.ui.status_message = "Subscribe failed".into();
                return Err(PageError::Subscribe(format!("{e:#}")));
            }
        };

        let request = self.platform.api.add_subscription(&subscription);
        self.track_background_request(request);
        self.mark_subscribed(true);
        self.ui.status_message = "Subscribed".into();
        log::info!("[Page] Subscribed at {}", subscription.endpoint);
        Ok(())
    }

    /// Unsubscribe from push notifications.
    ///
    /// Without an active subscription this does nothing.
    pub async fn unsubscribe(&mut self) -> Result<(), PageError> {
        if self.worker.is_none() {
            return Err(PageError::NotRegistered);
        }

        let subscription = match self.platform.push.get_subscription().await {
            Ok(Some(subscription)) => subscription,
            Ok(None) => {
                log::info!("[Page] No subscription found");
                return Ok(());
            }
            Err(e) => {
                log::error!("[Page] Failed to query push subscription: {e:#}");
                return Err(PageError::Unsubscribe(format!("{e:#}")));
            }
        };

        let request = self.platform.api.remove_subscription(&subscription.endpoint);
        self.track_background_request(request);

        match self.platform.push.unsubscribe(&subscription).await {
            Ok(true) => {
                log::info!("[Page] Successfully unsubscribed from push notifications");
                self.mark_subscribed(false);
                self.ui.status_message = "Unsubscribed".into();
                self.ui.notification_count = 0;
                self.clear_app_badge().await;
                Ok(())
            }
            Ok(false) => {
                log::error!("[Page] Failed to unsubscribe from push notifications");
                Err(PageError::Unsubscribe("platform declined".into()))
            }
            Err(e) => {
                log::error!("[Page] Failed to unsubscribe from push notifications: {e:#}");
                Err(PageError::Unsubscribe(format!("{e:#}")))
            }
        }
    }

    fn track_background_request(&mut self, request: JoinHandle<()>) {
        self.background_requests.retain(|r| !r.is_finished());
        self.background_requests.push(request);
    }

    /// Wait for outstanding remote subscription calls.
    ///
    /// The UI never waits on these; this is for orderly shutdown.
    pub async fn settle_background_requests(&mut self) {
        for request in self.background_requests.drain(..) {
            if let Err(e) = request.await {
                log::warn!("[Page] Background request aborted: {e}");
            }
        }
    }

    async fn set_app_badge(&self, count: u64) {
        let badge = &self.platform.badge;
        if !badge.is_supported() {
            log::warn!("[Page] App badge is not supported on this platform");
            return;
        }
        if let Err(e) = badge.set(count).await {
            log::error!("[Page] Failed to set app badge: {e:#}");
        }
    }

    async fn clear_app_badge(&self) {
        let badge = &self.platform.badge;
        if !badge.is_supported() {
            log::warn!("[Page] App badge is not supported on this platform");
            return;
        }
        if let Err(e) = badge.clear().await {
            log::error!("[Page] Failed to clear app badge: {e:#}");
        }
    }
}

impl Drop for PageController {
    fn drop(&mut self) {
        if let (Some(worker), Some(connection)) = (&self.worker, &self.connection) {
            let _ = worker.disconnect(connection.id());
        }
    }
}
