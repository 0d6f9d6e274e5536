//! One peer connection: hosting or joining, the channel pump, lifecycle events.

use std::future::Future;
use std::sync::Arc;

use derive_new::new;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{Instrument, debug, info, info_span, instrument, warn};

use super::transport::{Listener, PeerLink, Transport};
use super::{ConnectionState, NetworkError, Role};
use crate::protocol::PeerMessage;
use crate::room::{NetworkIdentity, RoomCode};

/// Event reported by a [`NetworkSession`], tagged with its generation.
#[derive(Debug, Clone, new)]
pub struct NetworkEvent {
    /// Generation of the session that produced the event.
    pub generation: u64,
    /// What happened.
    pub kind: NetworkEventKind,
}

/// What a [`NetworkSession`] observed.
#[derive(Debug, Clone)]
pub enum NetworkEventKind {
    /// The connection moved to a new lifecycle state.
    StateChanged(ConnectionState),
    /// Host is listening; the code can be shared.
    RoomReady(RoomCode),
    /// A message arrived from the peer.
    Message(PeerMessage),
    /// The peer closed the channel.
    Closed,
    /// The connection failed.
    Failed(NetworkError),
}

/// Owns the connection to the other peer.
///
/// Dropping the session tears the connection down; the peer sees a close.
#[derive(Debug)]
pub struct NetworkSession {
    generation: u64,
    outbound: mpsc::UnboundedSender<PeerMessage>,
    state: watch::Receiver<ConnectionState>,
    task: JoinHandle<()>,
}

impl NetworkSession {
    /// Starts hosting under `identity`, accepting a single guest.
    #[instrument(skip(transport, identity, events), fields(room = %identity.room_code()))]
    pub fn host(
        generation: u64,
        transport: Arc<dyn Transport>,
        identity: NetworkIdentity,
        events: mpsc::UnboundedSender<NetworkEvent>,
    ) -> Self {
        info!("Opening room");
        Self::spawn(generation, Role::Host, events, move |driver, outbound| {
            driver.run_host(transport, identity, outbound)
        })
    }

    /// Dials the host owning `identity`.
    #[instrument(skip(transport, identity, events), fields(room = %identity.room_code()))]
    pub fn join(
        generation: u64,
        transport: Arc<dyn Transport>,
        identity: NetworkIdentity,
        events: mpsc::UnboundedSender<NetworkEvent>,
    ) -> Self {
        info!("Joining room");
        Self::spawn(generation, Role::Joiner, events, move |driver, outbound| {
            driver.run_join(transport, identity, outbound)
        })
    }

    fn spawn<F, Fut>(
        generation: u64,
        role: Role,
        events: mpsc::UnboundedSender<NetworkEvent>,
        run: F,
    ) -> Self
    where
        F: FnOnce(Driver, mpsc::UnboundedReceiver<PeerMessage>) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (outbound, outbound_rx) = mpsc::unbounded_channel();
        let (state_tx, state) = watch::channel(ConnectionState::Idle);
        let driver = Driver {
            generation,
            events,
            state: state_tx,
        };
        let span = info_span!("network_session", generation, %role);
        let task = tokio::spawn(run(driver, outbound_rx).instrument(span));
        Self {
            generation,
            outbound,
            state,
            task,
        }
    }

    /// Queues a message for the peer. Messages sent before the channel opens
    /// are delivered once it does.
    pub fn send(&self, message: PeerMessage) -> Result<(), NetworkError> {
        self.outbound
            .send(message)
            .map_err(|_| NetworkError::other("Connection is closed"))
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Tears the connection down.
    #[instrument(skip(self), fields(generation = self.generation))]
    pub fn close(self) {
        debug!("Closing network session");
    }
}

impl Drop for NetworkSession {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// What the pump loop woke up for.
enum Wake {
    Inbound(Option<PeerMessage>),
    Outbound(Option<PeerMessage>),
    Intruder(Option<PeerLink>),
}

struct Driver {
    generation: u64,
    events: mpsc::UnboundedSender<NetworkEvent>,
    state: watch::Sender<ConnectionState>,
}

impl Driver {
    fn emit(&self, kind: NetworkEventKind) {
        if self
            .events
            .send(NetworkEvent::new(self.generation, kind))
            .is_err()
        {
            debug!("Event receiver gone");
        }
    }

    fn set_state(&self, state: ConnectionState) {
        self.state.send_replace(state);
        debug!(%state, "Connection state changed");
        self.emit(NetworkEventKind::StateChanged(state));
    }

    fn fail(&self, error: NetworkError) {
        warn!(error = %error, "Connection failed");
        self.set_state(ConnectionState::Errored);
        self.emit(NetworkEventKind::Failed(error));
    }

    async fn run_host(
        self,
        transport: Arc<dyn Transport>,
        identity: NetworkIdentity,
        outbound: mpsc::UnboundedReceiver<PeerMessage>,
    ) {
        self.set_state(ConnectionState::Connecting);
        let mut listener = match transport.listen(&identity).await {
            Ok(listener) => listener,
            Err(e) => return self.fail(e),
        };
        self.set_state(ConnectionState::PeerOpen);
        self.emit(NetworkEventKind::RoomReady(identity.room_code().clone()));

        let Some(link) = listener.accept().await else {
            return self.fail(NetworkError::other("Stopped listening before a guest arrived"));
        };
        info!("Guest connected");
        self.set_state(ConnectionState::DataChannelOpen);
        self.pump(link, Some(listener), outbound).await;
    }

    async fn run_join(
        self,
        transport: Arc<dyn Transport>,
        identity: NetworkIdentity,
        outbound: mpsc::UnboundedReceiver<PeerMessage>,
    ) {
        self.set_state(ConnectionState::Connecting);
        let link = match transport.connect(&identity).await {
            Ok(link) => link,
            Err(e) => return self.fail(e),
        };
        info!("Connected to host");
        self.set_state(ConnectionState::DataChannelOpen);
        self.pump(link, None, outbound).await;
    }

    /// Relays messages both ways until either side closes. A host keeps its
    /// listener open only to turn away further guests.
    async fn pump(
        self,
        mut link: PeerLink,
        mut listener: Option<Box<dyn Listener>>,
        mut outbound: mpsc::UnboundedReceiver<PeerMessage>,
    ) {
        loop {
            let wake = tokio::select! {
                message = link.recv() => Wake::Inbound(message),
                message = outbound.recv() => Wake::Outbound(message),
                extra = accept_next(&mut listener) => Wake::Intruder(extra),
            };
            match wake {
                Wake::Inbound(Some(message)) => {
                    debug!(%message, "Received peer message");
                    self.emit(NetworkEventKind::Message(message));
                    if message == PeerMessage::Init {
                        self.set_state(ConnectionState::Ready);
                    }
                }
                Wake::Inbound(None) => {
                    info!("Peer closed the connection");
                    self.set_state(ConnectionState::Closed);
                    self.emit(NetworkEventKind::Closed);
                    return;
                }
                Wake::Outbound(Some(message)) => {
                    if let Err(e) = link.send(message) {
                        return self.fail(e);
                    }
                    debug!(%message, "Sent peer message");
                    if message == PeerMessage::Init {
                        self.set_state(ConnectionState::Ready);
                    }
                }
                Wake::Outbound(None) => return,
                Wake::Intruder(Some(extra)) => {
                    warn!("Rejecting additional guest");
                    drop(extra);
                }
                Wake::Intruder(None) => listener = None,
            }
        }
    }
}

async fn accept_next(listener: &mut Option<Box<dyn Listener>>) -> Option<PeerLink> {
    match listener {
        Some(listener) => listener.accept().await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::{MemoryTransport, NetworkErrorKind};

    fn identity(code: &str) -> NetworkIdentity {
        NetworkIdentity::new("session-", RoomCode::parse(code).unwrap())
    }

    async fn next_kind(events: &mut mpsc::UnboundedReceiver<NetworkEvent>) -> NetworkEventKind {
        events.recv().await.unwrap().kind
    }

    #[tokio::test]
    async fn test_join_unknown_room_fails_with_room_not_found() {
        let transport: Arc<dyn Transport> = Arc::new(MemoryTransport::new());
        let (tx, mut rx) = mpsc::unbounded_channel();
        let session = NetworkSession::join(3, transport, identity("222222"), tx);

        assert!(matches!(
            next_kind(&mut rx).await,
            NetworkEventKind::StateChanged(ConnectionState::Connecting)
        ));
        assert!(matches!(
            next_kind(&mut rx).await,
            NetworkEventKind::StateChanged(ConnectionState::Errored)
        ));
        match rx.recv().await.unwrap() {
            NetworkEvent {
                generation: 3,
                kind: NetworkEventKind::Failed(err),
            } => assert_eq!(err.kind, NetworkErrorKind::RoomNotFound),
            other => panic!("unexpected event {:?}", other),
        }
        assert_eq!(session.state(), ConnectionState::Errored);
    }

    #[tokio::test]
    async fn test_host_reports_room_ready_then_guest() {
        let transport: Arc<dyn Transport> = Arc::new(MemoryTransport::new());
        let (host_tx, mut host_rx) = mpsc::unbounded_channel();
        let _host = NetworkSession::host(1, Arc::clone(&transport), identity("333333"), host_tx);

        assert!(matches!(
            next_kind(&mut host_rx).await,
            NetworkEventKind::StateChanged(ConnectionState::Connecting)
        ));
        assert!(matches!(
            next_kind(&mut host_rx).await,
            NetworkEventKind::StateChanged(ConnectionState::PeerOpen)
        ));
        match next_kind(&mut host_rx).await {
            NetworkEventKind::RoomReady(code) => assert_eq!(code.as_str(), "333333"),
            other => panic!("unexpected event {:?}", other),
        }

        let (guest_tx, _guest_rx) = mpsc::unbounded_channel();
        let guest = NetworkSession::join(1, transport, identity("333333"), guest_tx);
        guest.send(PeerMessage::Ready).unwrap();

        assert!(matches!(
            next_kind(&mut host_rx).await,
            NetworkEventKind::StateChanged(ConnectionState::DataChannelOpen)
        ));
        assert!(matches!(
            next_kind(&mut host_rx).await,
            NetworkEventKind::Message(PeerMessage::Ready)
        ));
    }

    #[tokio::test]
    async fn test_dropping_session_closes_peer() {
        let transport: Arc<dyn Transport> = Arc::new(MemoryTransport::new());
        let (host_tx, mut host_rx) = mpsc::unbounded_channel();
        let host = NetworkSession::host(1, Arc::clone(&transport), identity("444444"), host_tx);
        while !matches!(next_kind(&mut host_rx).await, NetworkEventKind::RoomReady(_)) {}

        let (guest_tx, mut guest_rx) = mpsc::unbounded_channel();
        let _guest = NetworkSession::join(2, transport, identity("444444"), guest_tx);
        while !matches!(
            next_kind(&mut guest_rx).await,
            NetworkEventKind::StateChanged(ConnectionState::DataChannelOpen)
        ) {}
        while !matches!(
            next_kind(&mut host_rx).await,
            NetworkEventKind::StateChanged(ConnectionState::DataChannelOpen)
        ) {}

        host.close();
        loop {
            match next_kind(&mut guest_rx).await {
                NetworkEventKind::Closed => break,
                NetworkEventKind::StateChanged(_) => continue,
                other => panic!("unexpected event {:?}", other),
            }
        }
    }
}
