//! Background worker: push, notification-click and message handling.
//!
//! The worker runs as a single tokio task that owns the counter store and the
//! registry of connected pages. Every event goes through one FIFO queue and is
//! handled to completion before the next one starts, so the counter's
//! read-modify-write never interleaves: N pushes since the last reset always
//! leave the counter at N.
//!
//! # Event flow
//!
//! ```text
//! push           → show notification → counter += 1 → broadcast {notificationCount}
//! click          → close notification → focus or open target page
//! message(reset) → counter = 0 → broadcast {notificationCount: 0}
//! ```
//!
//! Awaiting a [`WorkerHandle`] call keeps the caller waiting until the event's
//! work is finished, and [`WorkerHandle::shutdown`] only returns after every
//! event queued before it has completed.

pub mod clients;
pub mod payload;

use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

use crate::message::CrossContextMessage;
use crate::platform::WorkerHost;
use crate::store::{CounterStore, StorageError};

pub use clients::{ClientId, ClientRegistry};
pub use payload::{Notification, NotificationOptions, PushPayload};

/// Result of handling one push event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    /// The payload could not be decoded; nothing was shown or counted.
    Skipped,
    /// The payload was handled.
    Handled {
        /// Whether the platform accepted the notification.
        notification_shown: bool,
        /// New counter value, or `None` if storage failed.
        count: Option<u64>,
    },
}

/// Events processed by the worker task.
enum WorkerEvent {
    Push {
        data: Vec<u8>,
        done: oneshot::Sender<PushOutcome>,
    },
    NotificationClick {
        notification: Notification,
        done: oneshot::Sender<()>,
    },
    Message {
        source: ClientId,
        message: CrossContextMessage,
    },
    Connect {
        url: String,
        reply: oneshot::Sender<ClientConnection>,
    },
    Disconnect(ClientId),
    ReadCount(oneshot::Sender<Result<u64, StorageError>>),
    Barrier(oneshot::Sender<()>),
    Shutdown(oneshot::Sender<()>),
}

/// A page's connection to the worker.
///
/// Receives every broadcast made while connected. Dropping the connection
/// disconnects the page on the worker's next broadcast.
#[derive(Debug)]
pub struct ClientConnection {
    id: ClientId,
    rx: mpsc::UnboundedReceiver<CrossContextMessage>,
}

impl ClientConnection {
    /// This page's identity.
    pub fn id(&self) -> ClientId {
        self.id
    }

    /// Next message from the worker (non-blocking).
    pub fn try_recv(&mut self) -> Option<CrossContextMessage> {
        self.rx.try_recv().ok()
    }

    /// Wait for the next message. `None` once the worker has stopped.
    pub async fn recv(&mut self) -> Option<CrossContextMessage> {
        self.rx.recv().await
    }
}

/// Handle for sending events to a running worker.
///
/// Cheap to clone. The worker keeps running while any handle exists or until
/// [`WorkerHandle::shutdown`] is called.
#[derive(Debug, Clone)]
pub struct WorkerHandle {
    event_tx: mpsc::UnboundedSender<WorkerEvent>,
}

impl std::fmt::Debug for WorkerEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Push { .. } => "Push",
            Self::NotificationClick { .. } => "NotificationClick",
            Self::Message { .. } => "Message",
            Self::Connect { .. } => "Connect",
            Self::Disconnect(_) => "Disconnect",
            Self::ReadCount(_) => "ReadCount",
            Self::Barrier(_) => "Barrier",
            Self::Shutdown(_) => "Shutdown",
        };
        f.write_str(name)
    }
}

impl WorkerHandle {
    fn send(&self, event: WorkerEvent) -> Result<()> {
        self.event_tx
            .send(event)
            .map_err(|e| anyhow::anyhow!("Worker is not running (dropped {:?})", e.0))
    }

    /// Deliver a push payload and wait until it has been handled.
    pub async fn push(&self, data: impl Into<Vec<u8>>) -> Result<PushOutcome> {
        let (done, rx) = oneshot::channel();
        self.send(WorkerEvent::Push {
            data: data.into(),
            done,
        })?;
        rx.await.context("Worker stopped while handling push")
    }

    /// Deliver a notification click and wait until it has been handled.
    pub async fn notification_click(&self, notification: Notification) -> Result<()> {
        let (done, rx) = oneshot::channel();
        self.send(WorkerEvent::NotificationClick { notification, done })?;
        rx.await.context("Worker stopped while handling click")
    }

    /// Post a message from a page. Returns once the message is queued.
    pub fn post_message(&self, source: ClientId, message: CrossContextMessage) -> Result<()> {
        self.send(WorkerEvent::Message { source, message })
    }

    /// Connect a page showing `url`.
    pub async fn connect(&self, url: impl Into<String>) -> Result<ClientConnection> {
        let (reply, rx) = oneshot::channel();
        self.send(WorkerEvent::Connect {
            url: url.into(),
            reply,
        })?;
        rx.await.context("Worker stopped while connecting page")
    }

    /// Disconnect a page.
    pub fn disconnect(&self, id: ClientId) -> Result<()> {
        self.send(WorkerEvent::Disconnect(id))
    }

    /// Read the persisted counter after all previously queued events.
    pub async fn count(&self) -> Result<u64> {
        let (tx, rx) = oneshot::channel();
        self.send(WorkerEvent::ReadCount(tx))?;
        let count = rx.await.context("Worker stopped while reading counter")??;
        Ok(count)
    }

    /// Wait until every previously queued event has been handled.
    pub async fn sync(&self) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.send(WorkerEvent::Barrier(tx))?;
        rx.await.context("Worker stopped before reaching barrier")
    }

    /// Stop the worker once every previously queued event has completed.
    pub async fn shutdown(&self) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.send(WorkerEvent::Shutdown(tx))?;
        rx.await.context("Worker stopped before acknowledging shutdown")
    }
}

/// The background worker's state.
#[derive(Debug)]
pub struct BackgroundWorker {
    store: Arc<dyn CounterStore>,
    host: Arc<dyn WorkerHost>,
    clients: ClientRegistry,
    target_url: String,
}

impl BackgroundWorker {
    /// Create a worker that opens `target_url` on notification click.
    pub fn new(
        store: Arc<dyn CounterStore>,
        host: Arc<dyn WorkerHost>,
        target_url: impl Into<String>,
    ) -> Self {
        Self {
            store,
            host,
            clients: ClientRegistry::default(),
            target_url: target_url.into(),
        }
    }

    /// Start the worker task and return a handle to it.
    pub fn spawn(self) -> WorkerHandle {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        tokio::spawn(self.run(event_rx));
        WorkerHandle { event_tx }
    }

    async fn run(mut self, mut event_rx: mpsc::UnboundedReceiver<WorkerEvent>) {
        log::info!("[Worker] Started");
        while let Some(event) = event_rx.recv().await {
            match event {
                WorkerEvent::Push { data, done } => {
                    let outcome = self.on_push(&data).await;
                    let _ = done.send(outcome);
                }
                WorkerEvent::NotificationClick { notification, done } => {
                    self.on_notification_click(notification).await;
                    let _ = done.send(());
                }
                WorkerEvent::Message { source, message } => {
                    self.on_message(source, message).await;
                }
                WorkerEvent::Connect { url, reply } => {
                    let id = ClientId::new();
                    let (tx, rx) = mpsc::unbounded_channel();
                    self.clients.insert(id, url.clone(), tx);
                    log::debug!(
                        "[Worker] Page {id} connected ({url}), {} open",
                        self.clients.len()
                    );
                    if reply.send(ClientConnection { id, rx }).is_err() {
                        self.clients.remove(id);
                    }
                }
                WorkerEvent::Disconnect(id) => {
                    if self.clients.remove(id) {
                        log::debug!("[Worker] Page {id} disconnected");
                        if self.clients.is_empty() {
                            log::debug!("[Worker] No pages open");
                        }
                    }
                }
                WorkerEvent::ReadCount(reply) => {
                    let _ = reply.send(self.store.get().await);
                }
                WorkerEvent::Barrier(ack) => {
                    let _ = ack.send(());
                }
                WorkerEvent::Shutdown(ack) => {
                    log::info!("[Worker] Shutting down");
                    let _ = ack.send(());
                    return;
                }
            }
        }
        log::info!("[Worker] All handles dropped, stopping");
    }

    async fn on_push(&mut self, data: &[u8]) -> PushOutcome {
        log::debug!("[Worker] Push received: {}", String::from_utf8_lossy(data));

        let payload = match PushPayload::parse(data) {
            Ok(payload) => payload,
            Err(e) => {
                log::warn!("[Worker] Ignoring push: {e:#}");
                return PushOutcome::Skipped;
            }
        };

        let notification = payload.into_notification();
        let notification_shown = match self.host.show_notification(&notification).await {
            Ok(()) => true,
            Err(e) => {
                log::error!("[Worker] Failed to show notification: {e:#}");
                false
            }
        };

        let count = match self.increment().await {
            Ok(count) => {
                self.broadcast_count(count);
                Some(count)
            }
            Err(e) => {
                log::error!("[Worker] Failed to update notification count: {e}");
                None
            }
        };

        PushOutcome::Handled {
            notification_shown,
            count,
        }
    }

    async fn increment(&self) -> Result<u64, StorageError> {
        log::debug!("[Worker] Updating notification count");
        let count = self.store.get().await?.saturating_add(1);
        self.store.set(count).await?;
        Ok(count)
    }

    async fn on_notification_click(&mut self, notification: Notification) {
        log::info!(
            "[Worker] Notification clicked: {}",
            notification.tag().unwrap_or("<untagged>")
        );

        if let Err(e) = self.host.close_notification(&notification).await {
            log::warn!("[Worker] Failed to close notification: {e:#}");
        }

        if let Some(id) = self.clients.find_by_url(&self.target_url) {
            match self.host.focus_client(id).await {
                Ok(()) => return,
                Err(e) => log::warn!("[Worker] Failed to focus page {id}: {e:#}"),
            }
        }

        if let Err(e) = self.host.open_window(&self.target_url).await {
            log::error!("[Worker] Failed to open {}: {e:#}", self.target_url);
        }
    }

    async fn on_message(&mut self, source: ClientId, message: CrossContextMessage) {
        if !message.is_reset() {
            log::debug!("[Worker] Ignoring message from page {source}: {message:?}");
            return;
        }

        log::info!("[Worker] Resetting notification count (requested by {source})");
        match self.store.set(0).await {
            Ok(()) => self.broadcast_count(0),
            Err(e) => log::error!("[Worker] Failed to reset notification count: {e}"),
        }
    }

    fn broadcast_count(&mut self, count: u64) {
        let delivered = self
            .clients
            .broadcast(&CrossContextMessage::NotificationCount(count));
        log::debug!("[Worker] Count {count} sent to {delivered} page(s)");
    }
}
