//! Datagram transport: one binary message per UDP datagram.
//!
//! A background reader task owns the receive side of the socket. For every
//! datagram from the server it:
//!
//! 1. acknowledges it at once (unless it is itself a `CONFIRM`),
//! 2. resolves the pending send it confirms (if it is a `CONFIRM`),
//! 3. drops it if its id was already delivered,
//! 4. otherwise forwards it to [`UdpConnection::recv`].
//!
//! The server may answer from a different port than the one first
//! contacted. The source address of the first datagram from the server's
//! IP becomes the destination for everything after it.

use std::collections::HashSet;
use std::io;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::Arc;

use chatwire_protocol::{Message, MessageId, encode_binary, peek_header};
use tokio::net::UdpSocket;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;

use crate::reliable::{PendingAcks, send_confirmed};
use crate::{Connection, ConnectionId, ReliabilityConfig, TransportError};

/// Size of the receive buffer. Large enough for every message kind at its
/// maximum field lengths.
pub const RECV_BUFFER_LEN: usize = 2048;

/// Datagrams waiting to be picked up by `recv`.
const INBOX_CAPACITY: usize = 64;

type Inbound = io::Result<Vec<u8>>;

/// Where outgoing datagrams go.
#[derive(Debug, Clone, Copy)]
struct Destination {
    addr: SocketAddr,
    /// Set once the server has answered; `addr` no longer changes.
    settled: bool,
}

/// State shared by the connection handle and its reader task.
struct Shared {
    id: ConnectionId,
    socket: UdpSocket,
    destination: Mutex<Destination>,
    pending: PendingAcks,
}

impl Shared {
    async fn send_to_server(&self, data: &[u8]) -> Result<(), TransportError> {
        let addr = self.destination.lock().await.addr;
        self.socket
            .send_to(data, addr)
            .await
            .map_err(TransportError::SendFailed)?;
        Ok(())
    }

    /// Decides whether a datagram from `from` belongs to this session,
    /// adopting the server's new port on the first answer.
    async fn accept_source(&self, from: SocketAddr) -> bool {
        let mut dest = self.destination.lock().await;
        if from.ip() != dest.addr.ip() {
            tracing::warn!(
                id = %self.id,
                %from,
                "datagram from unknown host dropped"
            );
            return false;
        }
        if dest.settled {
            if from != dest.addr {
                tracing::warn!(
                    id = %self.id,
                    %from,
                    "datagram from stale port dropped"
                );
                return false;
            }
            return true;
        }
        if from != dest.addr {
            tracing::info!(
                id = %self.id,
                from = %dest.addr,
                to = %from,
                "server switched port"
            );
            dest.addr = from;
        }
        dest.settled = true;
        true
    }

    async fn acknowledge(
        &self,
        ref_id: MessageId,
        to: SocketAddr,
    ) -> io::Result<()> {
        let ack = encode_binary(&Message::ack(ref_id));
        self.socket.send_to(&ack, to).await?;
        tracing::trace!(id = %self.id, %ref_id, "sent confirmation");
        Ok(())
    }
}

/// A UDP "connection" to the chat server.
pub struct UdpConnection {
    shared: Arc<Shared>,
    inbox: Mutex<mpsc::Receiver<Inbound>>,
    reader: JoinHandle<()>,
    config: ReliabilityConfig,
}

impl UdpConnection {
    /// Binds an ephemeral local socket and starts talking to `server`.
    ///
    /// Nothing is sent yet; UDP has no handshake.
    pub async fn connect(
        server: SocketAddr,
        config: ReliabilityConfig,
    ) -> Result<Self, TransportError> {
        let local = match server.ip() {
            IpAddr::V4(_) => SocketAddr::new(Ipv4Addr::UNSPECIFIED.into(), 0),
            IpAddr::V6(_) => SocketAddr::new(Ipv6Addr::UNSPECIFIED.into(), 0),
        };
        let socket = UdpSocket::bind(local)
            .await
            .map_err(TransportError::ConnectFailed)?;

        let id = ConnectionId::next("udp");
        tracing::info!(
            %id,
            %server,
            timeout_ms = config.confirm_timeout.as_millis() as u64,
            retransmissions = config.max_retransmissions,
            "datagram socket ready"
        );

        let shared = Arc::new(Shared {
            id,
            socket,
            destination: Mutex::new(Destination {
                addr: server,
                settled: false,
            }),
            pending: PendingAcks::default(),
        });

        let (tx, rx) = mpsc::channel(INBOX_CAPACITY);
        let reader = tokio::spawn(read_loop(Arc::clone(&shared), tx));

        Ok(Self {
            shared,
            inbox: Mutex::new(rx),
            reader,
            config,
        })
    }

    /// The address datagrams are currently sent to.
    pub async fn server_addr(&self) -> SocketAddr {
        self.shared.destination.lock().await.addr
    }

    /// The local address of the socket.
    pub fn local_addr(&self) -> Result<SocketAddr, TransportError> {
        self.shared
            .socket
            .local_addr()
            .map_err(TransportError::ConnectFailed)
    }
}

impl Connection for UdpConnection {
    type Error = TransportError;

    /// Sends one datagram. Anything but a `CONFIRM` is retransmitted until
    /// the server confirms it or the attempts run out.
    async fn send(&self, data: &[u8]) -> Result<(), Self::Error> {
        let header = peek_header(data).map_err(TransportError::InvalidDatagram)?;
        if header.is_ack() {
            return self.shared.send_to_server(data).await;
        }
        send_confirmed(&self.shared.pending, &self.config, header.id, || {
            self.shared.send_to_server(data)
        })
        .await
    }

    async fn recv(&self) -> Result<Option<Vec<u8>>, Self::Error> {
        match self.inbox.lock().await.recv().await {
            Some(Ok(datagram)) => Ok(Some(datagram)),
            Some(Err(e)) => Err(TransportError::ReceiveFailed(e)),
            None => Err(TransportError::ConnectionClosed(
                "datagram reader stopped".into(),
            )),
        }
    }

    async fn close(&self) -> Result<(), Self::Error> {
        self.reader.abort();
        self.shared.pending.abandon_all().await;
        tracing::debug!(id = %self.shared.id, "datagram socket closed");
        Ok(())
    }

    fn id(&self) -> ConnectionId {
        self.shared.id
    }
}

impl Drop for UdpConnection {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

async fn read_loop(shared: Arc<Shared>, inbox: mpsc::Sender<Inbound>) {
    let mut buf = vec![0u8; RECV_BUFFER_LEN];
    let mut delivered: HashSet<MessageId> = HashSet::new();

    loop {
        let (len, from) = match shared.socket.recv_from(&mut buf).await {
            Ok(received) => received,
            Err(e) => {
                let _ = inbox.send(Err(e)).await;
                break;
            }
        };
        if !shared.accept_source(from).await {
            continue;
        }
        let datagram = &buf[..len];

        // Too short to carry an id: nothing to acknowledge, let the
        // decoder report it.
        let Ok(header) = peek_header(datagram) else {
            if inbox.send(Ok(datagram.to_vec())).await.is_err() {
                break;
            }
            continue;
        };

        if header.is_ack() {
            if !shared.pending.confirm(header.id).await {
                tracing::debug!(
                    id = %shared.id,
                    ref_id = %header.id,
                    "late confirmation ignored"
                );
            }
            continue;
        }

        if let Err(e) = shared.acknowledge(header.id, from).await {
            let _ = inbox.send(Err(e)).await;
            break;
        }
        if !delivered.insert(header.id) {
            tracing::debug!(
                id = %shared.id,
                msg = %header.id,
                "duplicate datagram dropped"
            );
            continue;
        }
        if inbox.send(Ok(datagram.to_vec())).await.is_err() {
            break;
        }
    }

    shared.pending.abandon_all().await;
    tracing::debug!(id = %shared.id, "datagram reader stopped");
}
