//! Transport abstraction: how two peers find each other and exchange messages.

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::NetworkError;
use crate::protocol::PeerMessage;
use crate::room::NetworkIdentity;

/// An open, ordered, reliable channel to the other peer.
///
/// Dropping the link closes it; the remote side then sees `recv` return `None`.
#[derive(Debug)]
pub struct PeerLink {
    outbound: mpsc::UnboundedSender<PeerMessage>,
    inbound: mpsc::UnboundedReceiver<PeerMessage>,
    tasks: Vec<JoinHandle<()>>,
}

impl PeerLink {
    /// Wraps channel halves plus the I/O tasks feeding them.
    pub fn new(
        outbound: mpsc::UnboundedSender<PeerMessage>,
        inbound: mpsc::UnboundedReceiver<PeerMessage>,
        tasks: Vec<JoinHandle<()>>,
    ) -> Self {
        Self {
            outbound,
            inbound,
            tasks,
        }
    }

    /// Two links wired to each other in-process.
    pub fn pair() -> (PeerLink, PeerLink) {
        let (a_tx, a_rx) = mpsc::unbounded_channel();
        let (b_tx, b_rx) = mpsc::unbounded_channel();
        (
            PeerLink::new(a_tx, b_rx, Vec::new()),
            PeerLink::new(b_tx, a_rx, Vec::new()),
        )
    }

    /// Queues a message for the peer.
    pub fn send(&self, message: PeerMessage) -> Result<(), NetworkError> {
        self.outbound
            .send(message)
            .map_err(|_| NetworkError::other("Peer channel is closed"))
    }

    /// Next message from the peer, `None` once the channel closed.
    pub async fn recv(&mut self) -> Option<PeerMessage> {
        self.inbound.recv().await
    }
}

impl Drop for PeerLink {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

/// Accepts incoming links for one hosted identifier.
#[async_trait]
pub trait Listener: Send {
    /// Next incoming link, `None` once the listener can accept no more.
    async fn accept(&mut self) -> Option<PeerLink>;
}

/// Registers hosted identifiers and dials them.
#[async_trait]
pub trait Transport: Send + Sync + std::fmt::Debug {
    /// Starts listening under the identity's peer identifier.
    ///
    /// Fails with `RoomCodeInUse` when the identifier is taken.
    async fn listen(&self, identity: &NetworkIdentity) -> Result<Box<dyn Listener>, NetworkError>;

    /// Opens a link to the host owning the identity's peer identifier.
    ///
    /// Fails with `RoomNotFound` when nobody hosts it.
    async fn connect(&self, identity: &NetworkIdentity) -> Result<PeerLink, NetworkError>;
}
