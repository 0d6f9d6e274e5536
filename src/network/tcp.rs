//! Direct TCP transport.
//!
//! A room code maps to a port (`base_port + code % port_span`). Frames are
//! newline-delimited JSON. A dialing peer opens with
//! `{"link":"dial","peer":"<peer id>"}` and the host answers
//! `{"link":"accept"}` or `{"link":"refuse"}` before any game message flows.

use std::io::ErrorKind as IoErrorKind;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::timeout;
use tracing::{debug, info, instrument, warn};

use super::transport::{Listener, PeerLink, Transport};
use super::NetworkError;
use crate::config::NetworkConfig;
use crate::protocol::PeerMessage;
use crate::room::{NetworkIdentity, PeerId, RoomCode};

/// How long a freshly accepted socket may take to introduce itself.
const DIAL_FRAME_TIMEOUT: Duration = Duration::from_secs(2);

type FrameReader = Lines<BufReader<OwnedReadHalf>>;

/// Link-establishment frames, exchanged once before the game protocol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "link", rename_all = "lowercase")]
enum LinkFrame {
    Dial { peer: String },
    Accept,
    Refuse,
}

/// TCP transport configured from [`NetworkConfig`].
#[derive(Debug, Clone)]
pub struct TcpTransport {
    bind_host: String,
    peer_host: String,
    base_port: u16,
    port_span: u16,
    connect_timeout: Duration,
}

impl TcpTransport {
    /// Creates a transport from the network section of the config.
    pub fn new(config: &NetworkConfig) -> Self {
        Self {
            bind_host: config.bind_host().clone(),
            peer_host: config.peer_host().clone(),
            base_port: *config.base_port(),
            port_span: (*config.port_span()).max(1),
            connect_timeout: config.connect_timeout(),
        }
    }

    /// Port a room code listens on.
    pub fn port_for(&self, code: &RoomCode) -> u16 {
        let offset = code.value() % u32::from(self.port_span);
        // Config validation keeps base_port + port_span within u16.
        self.base_port.saturating_add(offset as u16)
    }
}

#[async_trait]
impl Transport for TcpTransport {
    #[instrument(skip(self, identity), fields(peer_id = %identity.peer_id()))]
    async fn listen(&self, identity: &NetworkIdentity) -> Result<Box<dyn Listener>, NetworkError> {
        let port = self.port_for(identity.room_code());
        let listener = TcpListener::bind((self.bind_host.as_str(), port))
            .await
            .map_err(|e| match e.kind() {
                IoErrorKind::AddrInUse => NetworkError::room_code_in_use(format!(
                    "ID \"{}\" is taken (port {} in use)",
                    identity.peer_id(),
                    port
                )),
                _ => NetworkError::other(format!("Could not listen on port {}: {}", port, e)),
            })?;
        info!(port, "Listening for a guest");
        Ok(Box::new(TcpRoomListener::spawn(listener, identity.peer_id().clone())))
    }

    #[instrument(skip(self, identity), fields(peer_id = %identity.peer_id()))]
    async fn connect(&self, identity: &NetworkIdentity) -> Result<PeerLink, NetworkError> {
        let port = self.port_for(identity.room_code());
        let not_found =
            || NetworkError::room_not_found(format!("Could not connect to peer {}", identity.peer_id()));

        let stream = timeout(
            self.connect_timeout,
            TcpStream::connect((self.peer_host.as_str(), port)),
        )
        .await
        .map_err(|_| NetworkError::other(format!("Timed out dialing {}:{}", self.peer_host, port)))?
        .map_err(|e| match e.kind() {
            IoErrorKind::ConnectionRefused => not_found(),
            _ => NetworkError::other(format!("Could not dial {}:{}: {}", self.peer_host, port, e)),
        })?;
        stream.set_nodelay(true)?;

        let (read, mut write) = stream.into_split();
        let mut frames = BufReader::new(read).lines();
        write_frame(
            &mut write,
            &LinkFrame::Dial {
                peer: identity.peer_id().to_string(),
            },
        )
        .await?;

        let reply = timeout(self.connect_timeout, frames.next_line())
            .await
            .map_err(|_| NetworkError::other("Timed out waiting for the host to answer"))??;
        match reply.as_deref().map(serde_json::from_str::<LinkFrame>) {
            Some(Ok(LinkFrame::Accept)) => {
                info!(port, "Host accepted link");
                Ok(spawn_link(frames, write))
            }
            Some(Ok(LinkFrame::Refuse)) => Err(not_found()),
            Some(Ok(other)) => Err(NetworkError::other(format!(
                "Unexpected link frame from host: {:?}",
                other
            ))),
            Some(Err(e)) => Err(e.into()),
            None => Err(NetworkError::other(
                "Host closed the connection before accepting",
            )),
        }
    }
}

/// Accepts sockets on a background task and introduces each one on its own
/// task. Introduced links queue up for [`Listener::accept`].
struct TcpRoomListener {
    links: mpsc::UnboundedReceiver<PeerLink>,
    acceptor: JoinHandle<()>,
}

impl TcpRoomListener {
    fn spawn(listener: TcpListener, peer_id: PeerId) -> Self {
        let (tx, links) = mpsc::unbounded_channel();
        let acceptor = tokio::spawn(accept_loop(listener, peer_id, tx));
        Self { links, acceptor }
    }
}

#[async_trait]
impl Listener for TcpRoomListener {
    async fn accept(&mut self) -> Option<PeerLink> {
        self.links.recv().await
    }
}

impl Drop for TcpRoomListener {
    fn drop(&mut self) {
        self.acceptor.abort();
    }
}

/// Owns the socket and every pending introduction; aborting it drops both.
async fn accept_loop(listener: TcpListener, peer_id: PeerId, links: mpsc::UnboundedSender<PeerLink>) {
    let mut pending = JoinSet::new();
    loop {
        tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok((stream, addr)) => {
                    debug!(%addr, "Incoming TCP connection");
                    let peer_id = peer_id.clone();
                    let links = links.clone();
                    pending.spawn(async move {
                        match introduce(stream, &peer_id).await {
                            Ok(Some(link)) => {
                                let _ = links.send(link);
                            }
                            Ok(None) => {}
                            Err(e) => warn!(%addr, error = %e, "Dropping connection during introduction"),
                        }
                    });
                }
                Err(e) => {
                    warn!(error = %e, "Accept failed, closing listener");
                    return;
                }
            },
            Some(_) = pending.join_next() => {}
            () = links.closed() => return,
        }
    }
}

/// Reads the dial frame and answers it; `None` if the socket is not for us.
async fn introduce(stream: TcpStream, peer_id: &PeerId) -> Result<Option<PeerLink>, NetworkError> {
    stream.set_nodelay(true)?;
    let (read, mut write) = stream.into_split();
    let mut frames = BufReader::new(read).lines();

    let line = timeout(DIAL_FRAME_TIMEOUT, frames.next_line())
        .await
        .map_err(|_| NetworkError::other("Guest did not introduce itself"))??;
    let Some(line) = line else {
        return Ok(None);
    };
    match serde_json::from_str::<LinkFrame>(&line)? {
        LinkFrame::Dial { peer } if peer == peer_id.as_str() => {
            write_frame(&mut write, &LinkFrame::Accept).await?;
            Ok(Some(spawn_link(frames, write)))
        }
        LinkFrame::Dial { peer } => {
            warn!(requested = %peer, hosted = %peer_id, "Refusing dial for another room");
            write_frame(&mut write, &LinkFrame::Refuse).await?;
            Ok(None)
        }
        other => {
            warn!(?other, "Unexpected link frame from guest");
            Ok(None)
        }
    }
}

async fn write_frame<T: Serialize>(write: &mut OwnedWriteHalf, frame: &T) -> Result<(), NetworkError> {
    write_line(write, serde_json::to_string(frame)?).await
}

async fn write_line(write: &mut OwnedWriteHalf, mut line: String) -> Result<(), NetworkError> {
    line.push('\n');
    write.write_all(line.as_bytes()).await?;
    Ok(())
}

/// Bridges a socket to a [`PeerLink`] with one reader and one writer task.
fn spawn_link(mut frames: FrameReader, mut write: OwnedWriteHalf) -> PeerLink {
    let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<PeerMessage>();

    let reader = tokio::spawn(async move {
        loop {
            match frames.next_line().await {
                Ok(Some(line)) if line.trim().is_empty() => continue,
                Ok(Some(line)) => match PeerMessage::decode(&line) {
                    Ok(message) => {
                        if inbound_tx.send(message).is_err() {
                            break;
                        }
                    }
                    Err(e) => warn!(error = %e, %line, "Dropping malformed peer frame"),
                },
                Ok(None) => {
                    debug!("Peer closed the socket");
                    break;
                }
                Err(e) => {
                    warn!(error = %e, "Socket read failed");
                    break;
                }
            }
        }
    });

    let writer = tokio::spawn(async move {
        while let Some(message) = outbound_rx.recv().await {
            let sent = match message.encode() {
                Ok(line) => write_line(&mut write, line).await,
                Err(e) => Err(e.into()),
            };
            if let Err(e) = sent {
                warn!(error = %e, "Socket write failed");
                break;
            }
        }
        let _ = write.shutdown().await;
    });

    PeerLink::new(outbound_tx, inbound_rx, vec![reader, writer])
}
