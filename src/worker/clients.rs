//! Registry of pages currently connected to the worker.
//!
//! Broadcasts go to every registered page. A page whose receiver is gone is
//! dropped from the registry on the next send; messages are never queued for
//! pages that are not connected.

use std::collections::HashMap;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::message::CrossContextMessage;

/// Identity of a connected page.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq)]
pub struct ClientId(pub Uuid);

impl ClientId {
    /// Fresh random identity.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ClientId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ClientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // First block is enough to tell pages apart in logs
        let s = self.0.to_string();
        write!(f, "{}", &s[..8])
    }
}

#[derive(Debug)]
struct ClientEntry {
    url: String,
    tx: mpsc::UnboundedSender<CrossContextMessage>,
}

/// Connected pages, keyed by [`ClientId`].
#[derive(Debug, Default)]
pub struct ClientRegistry {
    clients: HashMap<ClientId, ClientEntry>,
}

impl ClientRegistry {
    /// Register a page showing `url`.
    pub fn insert(
        &mut self,
        id: ClientId,
        url: String,
        tx: mpsc::UnboundedSender<CrossContextMessage>,
    ) {
        self.clients.insert(id, ClientEntry { url, tx });
    }

    /// Forget a page. Returns whether it was registered.
    pub fn remove(&mut self, id: ClientId) -> bool {
        self.clients.remove(&id).is_some()
    }

    /// Number of connected pages.
    pub fn len(&self) -> usize {
        self.clients.len()
    }

    /// Whether no page is connected.
    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    /// First connected page showing exactly `url`.
    pub fn find_by_url(&self, url: &str) -> Option<ClientId> {
        self.clients
            .iter()
            .find(|(_, entry)| entry.url == url)
            .map(|(id, _)| *id)
    }

    /// Send `message` to every connected page.
    ///
    /// Returns how many pages received it. Pages that went away are removed.
    pub fn broadcast(&mut self, message: &CrossContextMessage) -> usize {
        let mut gone = Vec::new();
        let mut delivered = 0;

        for (id, entry) in &self.clients {
            if entry.tx.send(message.clone()).is_ok() {
                delivered += 1;
            } else {
                gone.push(*id);
            }
        }

        for id in gone {
            log::debug!("[Worker] Dropping disconnected page {id}");
            self.clients.remove(&id);
        }

        delivered
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_broadcast_reaches_every_page() {
        let mut registry = ClientRegistry::default();
        let (tx_a, mut rx_a) = mpsc::unbounded_channel();
        let (tx_b, mut rx_b) = mpsc::unbounded_channel();
        registry.insert(ClientId::new(), "https://app/a".into(), tx_a);
        registry.insert(ClientId::new(), "https://app/b".into(), tx_b);

        let delivered = registry.broadcast(&CrossContextMessage::NotificationCount(4));
        assert_eq!(delivered, 2);
        assert_eq!(
            rx_a.try_recv().unwrap(),
            CrossContextMessage::NotificationCount(4)
        );
        assert_eq!(
            rx_b.try_recv().unwrap(),
            CrossContextMessage::NotificationCount(4)
        );
    }

    #[test]
    fn test_broadcast_drops_closed_pages() {
        let mut registry = ClientRegistry::default();
        let (tx_live, _rx_live) = mpsc::unbounded_channel();
        let (tx_dead, rx_dead) = mpsc::unbounded_channel();
        registry.insert(ClientId::new(), "https://app/".into(), tx_live);
        registry.insert(ClientId::new(), "https://app/".into(), tx_dead);
        drop(rx_dead);

        assert_eq!(registry.broadcast(&CrossContextMessage::NotificationCount(1)), 1);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_find_by_url_and_remove() {
        let mut registry = ClientRegistry::default();
        let (tx, _rx) = mpsc::unbounded_channel();
        let id = ClientId::new();
        registry.insert(id, "https://web.dev".into(), tx);

        assert_eq!(registry.find_by_url("https://web.dev"), Some(id));
        assert_eq!(registry.find_by_url("https://example.com"), None);
        assert!(registry.remove(id));
        assert!(!registry.remove(id));
        assert!(registry.is_empty());
    }
}
