//! In-process worker registration.

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Mutex;

use super::{WorkerHost, WorkerRegistrar};
use crate::constants::WORKER_SCRIPT_URL;
use crate::store::CounterStore;
use crate::worker::{BackgroundWorker, WorkerHandle};

/// Registers the background worker as a tokio task in this process.
///
/// The first registration spawns the worker; later registrations of the same
/// script reuse it, so every page shares one counter owner.
#[derive(Debug)]
pub struct InProcessRegistrar {
    store: Arc<dyn CounterStore>,
    host: Arc<dyn WorkerHost>,
    target_url: String,
    active: Mutex<Option<WorkerHandle>>,
}

impl InProcessRegistrar {
    /// Create a registrar whose worker uses `store` and `host`.
    pub fn new(
        store: Arc<dyn CounterStore>,
        host: Arc<dyn WorkerHost>,
        target_url: impl Into<String>,
    ) -> Self {
        Self {
            store,
            host,
            target_url: target_url.into(),
            active: Mutex::new(None),
        }
    }

    /// Handle to the active worker, if one has been registered.
    pub async fn active(&self) -> Option<WorkerHandle> {
        self.active.lock().await.clone()
    }
}

#[async_trait]
impl WorkerRegistrar for InProcessRegistrar {
    async fn register(&self, script_url: &str) -> Result<WorkerHandle> {
        anyhow::ensure!(
            script_url == WORKER_SCRIPT_URL,
            "No worker script at {script_url}"
        );

        let mut active = self.active.lock().await;
        if let Some(handle) = active.as_ref() {
            return Ok(handle.clone());
        }

        let handle = BackgroundWorker::new(
            Arc::clone(&self.store),
            Arc::clone(&self.host),
            self.target_url.clone(),
        )
        .spawn();
        log::info!("[Registrar] Registered {script_url}");
        *active = Some(handle.clone());
        Ok(handle)
    }
}
