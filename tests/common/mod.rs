//! Shared fixtures for integration tests: recording platform doubles and a
//! page wired to an in-process worker.

#![allow(dead_code, reason = "each test binary uses a different subset")]

use anyhow::Result;
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

use pushcount::constants::DEFAULT_VAPID_PUBLIC_KEY;
use pushcount::notifications::{
    PushSubscription, PushSubscriptionKeys, SubscriptionApi, SubscriptionOptions, VapidPublicKey,
};
use pushcount::page::PagePlatform;
use pushcount::platform::{
    AppBadge, FixedPermission, InProcessRegistrar, Permission, PushManager, WorkerHost,
    WorkerRegistrar,
};
use pushcount::worker::{ClientId, Notification, WorkerHandle};
use pushcount::{CounterStore, MemoryCounterStore, PageController};

/// URL of the page under test.
pub const PAGE_URL: &str = "https://app.example/";

/// Worker host that records notifications and window requests.
#[derive(Debug, Default)]
pub struct RecordingHost {
    pub shown: Mutex<Vec<String>>,
    pub opened: Mutex<Vec<String>>,
    pub focused: Mutex<Vec<ClientId>>,
}

#[async_trait]
impl WorkerHost for RecordingHost {
    async fn show_notification(&self, notification: &Notification) -> Result<()> {
        self.shown.lock().unwrap().push(notification.title.clone());
        Ok(())
    }

    async fn close_notification(&self, _notification: &Notification) -> Result<()> {
        Ok(())
    }

    async fn open_window(&self, url: &str) -> Result<()> {
        self.opened.lock().unwrap().push(url.to_string());
        Ok(())
    }

    async fn focus_client(&self, id: ClientId) -> Result<()> {
        self.focused.lock().unwrap().push(id);
        Ok(())
    }
}

/// Push manager that counts platform calls.
#[derive(Debug, Default)]
pub struct RecordingPushManager {
    pub current: Mutex<Option<PushSubscription>>,
    pub subscribe_calls: AtomicUsize,
    pub unsubscribe_calls: AtomicUsize,
    pub decline_unsubscribe: AtomicBool,
    pub last_options: Mutex<Option<SubscriptionOptions>>,
    /// Report push messaging as unavailable.
    pub unsupported: bool,
}

impl RecordingPushManager {
    pub fn with_subscription(subscription: PushSubscription) -> Self {
        let manager = Self::default();
        *manager.current.lock().unwrap() = Some(subscription);
        manager
    }

    pub fn subscribe_calls(&self) -> usize {
        self.subscribe_calls.load(Ordering::SeqCst)
    }

    pub fn unsubscribe_calls(&self) -> usize {
        self.unsubscribe_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PushManager for RecordingPushManager {
    fn is_supported(&self) -> bool {
        !self.unsupported
    }

    async fn get_subscription(&self) -> Result<Option<PushSubscription>> {
        Ok(self.current.lock().unwrap().clone())
    }

    async fn subscribe(&self, options: &SubscriptionOptions) -> Result<PushSubscription> {
        self.subscribe_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_options.lock().unwrap() = Some(options.clone());
        let subscription = sample_subscription("https://push.example/new");
        *self.current.lock().unwrap() = Some(subscription.clone());
        Ok(subscription)
    }

    async fn unsubscribe(&self, _subscription: &PushSubscription) -> Result<bool> {
        self.unsubscribe_calls.fetch_add(1, Ordering::SeqCst);
        if self.decline_unsubscribe.load(Ordering::SeqCst) {
            return Ok(false);
        }
        *self.current.lock().unwrap() = None;
        Ok(true)
    }
}

/// App badge calls in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BadgeCall {
    Set(u64),
    Clear,
}

/// App badge that records calls.
#[derive(Debug)]
pub struct RecordingBadge {
    pub supported: bool,
    pub calls: Mutex<Vec<BadgeCall>>,
}

impl Default for RecordingBadge {
    fn default() -> Self {
        Self {
            supported: true,
            calls: Mutex::new(Vec::new()),
        }
    }
}

impl RecordingBadge {
    pub fn calls(&self) -> Vec<BadgeCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl AppBadge for RecordingBadge {
    fn is_supported(&self) -> bool {
        self.supported
    }

    async fn set(&self, count: u64) -> Result<()> {
        self.calls.lock().unwrap().push(BadgeCall::Set(count));
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        self.calls.lock().unwrap().push(BadgeCall::Clear);
        Ok(())
    }
}

/// Registrar that always fails.
#[derive(Debug, Default)]
pub struct FailingRegistrar;

#[async_trait]
impl WorkerRegistrar for FailingRegistrar {
    async fn register(&self, _script_url: &str) -> Result<WorkerHandle> {
        anyhow::bail!("script evaluation failed")
    }
}

pub fn sample_subscription(endpoint: &str) -> PushSubscription {
    PushSubscription {
        endpoint: endpoint.to_string(),
        expiration_time: None,
        keys: PushSubscriptionKeys {
            p256dh: "BPk3".to_string(),
            auth: "c2VjcmV0".to_string(),
        },
    }
}

pub fn server_key() -> VapidPublicKey {
    VapidPublicKey::from_base64url(DEFAULT_VAPID_PUBLIC_KEY).unwrap()
}

/// Mock remote collaborator accepting every POST.
pub async fn mock_api() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    server
}

/// Poll until the mock server has seen `n` requests (or give up after 2s).
pub async fn wait_for_requests(server: &MockServer, n: usize) -> Vec<wiremock::Request> {
    for _ in 0..200 {
        let received = server.received_requests().await.unwrap_or_default();
        if received.len() >= n {
            return received;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    server.received_requests().await.unwrap_or_default()
}

/// Everything a page test needs to observe.
pub struct Fixture {
    pub store: Arc<MemoryCounterStore>,
    pub host: Arc<RecordingHost>,
    pub push: Arc<RecordingPushManager>,
    pub badge: Arc<RecordingBadge>,
    pub registrar: Arc<InProcessRegistrar>,
    pub api: MockServer,
}

impl Fixture {
    pub async fn new() -> Self {
        Self::with_push(RecordingPushManager::default()).await
    }

    pub async fn with_push(push: RecordingPushManager) -> Self {
        let store = Arc::new(MemoryCounterStore::new());
        let host = Arc::new(RecordingHost::default());
        let registrar = Arc::new(InProcessRegistrar::new(
            Arc::clone(&store) as Arc<dyn CounterStore>,
            Arc::clone(&host) as Arc<dyn WorkerHost>,
            "https://web.dev",
        ));
        Self {
            store,
            host,
            push: Arc::new(push),
            badge: Arc::new(RecordingBadge::default()),
            registrar,
            api: mock_api().await,
        }
    }

    pub fn platform(&self, permission: Permission) -> PagePlatform {
        PagePlatform {
            registrar: Arc::clone(&self.registrar) as Arc<dyn WorkerRegistrar>,
            push: Arc::clone(&self.push) as Arc<dyn PushManager>,
            permissions: Arc::new(FixedPermission(permission)),
            badge: Arc::clone(&self.badge) as Arc<dyn AppBadge>,
            api: SubscriptionApi::new(self.api.uri()).unwrap(),
        }
    }

    /// A loaded page at [`PAGE_URL`].
    pub async fn page(&self, permission: Permission) -> PageController {
        let mut page = PageController::new(self.platform(permission), PAGE_URL, server_key());
        page.load().await.unwrap();
        page
    }

    pub async fn worker(&self) -> WorkerHandle {
        self.registrar.active().await.expect("worker registered")
    }
}
