//! Peer-to-peer connection layer.
//!
//! A [`NetworkSession`] owns one connection and reports what happens on it as
//! [`NetworkEvent`]s. How the two peers actually reach each other is behind
//! the [`Transport`] trait.

mod error;
mod memory;
mod session;
mod state;
mod tcp;
mod transport;

pub use error::{NetworkError, NetworkErrorKind};
pub use memory::MemoryTransport;
pub use session::{NetworkEvent, NetworkEventKind, NetworkSession};
pub use state::{ConnectionState, Role};
pub use tcp::TcpTransport;
pub use transport::{Listener, PeerLink, Transport};
