//! In-process transport: both peers live in the same process.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::{debug, info, instrument};

use super::transport::{Listener, PeerLink, Transport};
use super::NetworkError;
use crate::room::{NetworkIdentity, PeerId};

type Registry = HashMap<PeerId, mpsc::UnboundedSender<PeerLink>>;

/// Registry of hosted peer identifiers shared by every clone.
#[derive(Debug, Clone, Default)]
pub struct MemoryTransport {
    registry: Arc<Mutex<Registry>>,
}

impl MemoryTransport {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }
}

fn lock(registry: &Mutex<Registry>) -> MutexGuard<'_, Registry> {
    registry.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl Transport for MemoryTransport {
    #[instrument(skip(self, identity), fields(peer_id = %identity.peer_id()))]
    async fn listen(&self, identity: &NetworkIdentity) -> Result<Box<dyn Listener>, NetworkError> {
        let mut registry = lock(&self.registry);
        let peer_id = identity.peer_id().clone();
        if registry.get(&peer_id).is_some_and(|tx| !tx.is_closed()) {
            return Err(NetworkError::room_code_in_use(format!(
                "ID \"{}\" is taken",
                peer_id
            )));
        }
        let (tx, rx) = mpsc::unbounded_channel();
        registry.insert(peer_id.clone(), tx);
        info!("Registered in-process room");
        Ok(Box::new(MemoryListener {
            peer_id,
            incoming: rx,
            registry: Arc::clone(&self.registry),
        }))
    }

    #[instrument(skip(self, identity), fields(peer_id = %identity.peer_id()))]
    async fn connect(&self, identity: &NetworkIdentity) -> Result<PeerLink, NetworkError> {
        let not_found =
            || NetworkError::room_not_found(format!("Could not connect to peer {}", identity.peer_id()));
        let host = lock(&self.registry)
            .get(identity.peer_id())
            .cloned()
            .ok_or_else(not_found)?;
        let (host_side, guest_side) = PeerLink::pair();
        host.send(host_side).map_err(|_| not_found())?;
        debug!("Delivered link to in-process host");
        Ok(guest_side)
    }
}

struct MemoryListener {
    peer_id: PeerId,
    incoming: mpsc::UnboundedReceiver<PeerLink>,
    registry: Arc<Mutex<Registry>>,
}

#[async_trait]
impl Listener for MemoryListener {
    async fn accept(&mut self) -> Option<PeerLink> {
        self.incoming.recv().await
    }
}

impl Drop for MemoryListener {
    fn drop(&mut self) {
        self.incoming.close();
        let mut registry = lock(&self.registry);
        if registry.get(&self.peer_id).is_some_and(|tx| tx.is_closed()) {
            registry.remove(&self.peer_id);
            debug!(peer_id = %self.peer_id, "Unregistered in-process room");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::NetworkErrorKind;
    use crate::protocol::PeerMessage;
    use crate::room::RoomCode;

    fn identity(code: &str) -> NetworkIdentity {
        NetworkIdentity::new("test-", RoomCode::parse(code).unwrap())
    }

    #[tokio::test]
    async fn test_connect_to_unknown_room_fails() {
        let transport = MemoryTransport::new();
        let err = transport.connect(&identity("111111")).await.unwrap_err();
        assert_eq!(err.kind, NetworkErrorKind::RoomNotFound);
    }

    #[tokio::test]
    async fn test_duplicate_listen_fails_until_dropped() {
        let transport = MemoryTransport::new();
        let first = transport.listen(&identity("222222")).await.unwrap();
        let err = transport.listen(&identity("222222")).await.err().unwrap();
        assert_eq!(err.kind, NetworkErrorKind::RoomCodeInUse);

        drop(first);
        assert!(lock(&transport.registry).is_empty());
        assert!(transport.listen(&identity("222222")).await.is_ok());
    }

    #[tokio::test]
    async fn test_link_carries_messages_both_ways() {
        let transport = MemoryTransport::new();
        let mut listener = transport.listen(&identity("333333")).await.unwrap();
        let mut guest = transport.connect(&identity("333333")).await.unwrap();
        let mut host = listener.accept().await.unwrap();

        guest.send(PeerMessage::Ready).unwrap();
        assert_eq!(host.recv().await, Some(PeerMessage::Ready));
        host.send(PeerMessage::Move { index: 4 }).unwrap();
        assert_eq!(guest.recv().await, Some(PeerMessage::Move { index: 4 }));

        drop(host);
        assert_eq!(guest.recv().await, None);
    }
}
