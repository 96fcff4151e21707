//! Transport layer for the chatwire client.
//!
//! Provides the [`Connection`] trait and the two ways of reaching a chat
//! server: a TCP stream carrying CRLF-terminated lines, and a UDP socket
//! carrying one binary message per datagram. The UDP side also does the
//! protocol's reliability work (acknowledgements and retransmission), so
//! callers see the same "send succeeded or the connection is gone"
//! contract on both.
//!
//! # Feature Flags
//!
//! - `tcp` (default): [`TcpConnection`]
//! - `udp` (default): [`UdpConnection`] and [`ReliabilityConfig`]

#![allow(async_fn_in_trait)]

mod error;
#[cfg(feature = "udp")]
mod reliable;
#[cfg(feature = "tcp")]
mod tcp;
#[cfg(feature = "udp")]
mod udp;

pub use error::TransportError;
#[cfg(feature = "udp")]
pub use reliable::ReliabilityConfig;
#[cfg(feature = "tcp")]
pub use tcp::{MAX_LINE_LEN, TcpConnection};
#[cfg(feature = "udp")]
pub use udp::{RECV_BUFFER_LEN, UdpConnection};

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counter for connection ids, shared by every transport kind.
static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Identifies one connection in log output, e.g. `udp-2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId {
    kind: &'static str,
    seq: u64,
}

impl ConnectionId {
    /// Allocates the next id for a connection of the given kind.
    pub fn next(kind: &'static str) -> Self {
        Self {
            kind,
            seq: NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed),
        }
    }

    pub fn kind(&self) -> &'static str {
        self.kind
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.kind, self.seq)
    }
}

/// One client connection to the chat server.
///
/// `send` returns once the transport has done everything it promises for
/// that message: for a stream the bytes are written, for datagrams the
/// server has confirmed receipt. `recv` yields whole messages (one line,
/// or one datagram) in the encoding the transport pairs with.
pub trait Connection: Send + Sync + 'static {
    /// The error type for connection operations.
    type Error: std::error::Error + Send + Sync;

    /// Sends one encoded message to the server.
    async fn send(&self, data: &[u8]) -> Result<(), Self::Error>;

    /// Receives the next encoded message from the server.
    ///
    /// Returns `Ok(None)` when the server closed the connection.
    async fn recv(&self) -> Result<Option<Vec<u8>>, Self::Error>;

    /// Closes the connection. Pending sends are abandoned.
    async fn close(&self) -> Result<(), Self::Error>;

    /// Returns the identifier used in log output.
    fn id(&self) -> ConnectionId;
}
