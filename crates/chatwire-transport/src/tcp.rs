//! Stream transport: one CRLF-terminated text line per message.

use std::net::SocketAddr;

use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::Mutex;

use crate::{Connection, ConnectionId, TransportError};

/// Longest line accepted from the server, terminator included. Every
/// message kind fits at its maximum field lengths.
pub const MAX_LINE_LEN: usize = 2048;

/// A TCP connection to the chat server.
///
/// Reading and writing use separate halves behind separate locks, so the
/// receive task can sit in `recv` while the input task sends.
pub struct TcpConnection {
    id: ConnectionId,
    peer: SocketAddr,
    reader: Mutex<BufReader<OwnedReadHalf>>,
    writer: Mutex<OwnedWriteHalf>,
}

impl TcpConnection {
    /// Opens a TCP connection to `addr`.
    pub async fn connect(addr: SocketAddr) -> Result<Self, TransportError> {
        let stream = TcpStream::connect(addr)
            .await
            .map_err(TransportError::ConnectFailed)?;
        let id = ConnectionId::next("tcp");
        tracing::info!(%id, %addr, "connected");
        Ok(Self::from_stream(id, addr, stream))
    }

    fn from_stream(id: ConnectionId, peer: SocketAddr, stream: TcpStream) -> Self {
        let (read, write) = stream.into_split();
        Self {
            id,
            peer,
            reader: Mutex::new(BufReader::new(read)),
            writer: Mutex::new(write),
        }
    }

    /// The server address this connection was opened to.
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }
}

impl Connection for TcpConnection {
    type Error = TransportError;

    async fn send(&self, data: &[u8]) -> Result<(), Self::Error> {
        let mut writer = self.writer.lock().await;
        writer
            .write_all(data)
            .await
            .map_err(TransportError::SendFailed)?;
        writer.flush().await.map_err(TransportError::SendFailed)?;
        tracing::trace!(id = %self.id, len = data.len(), "line sent");
        Ok(())
    }

    /// Reads up to and including the next `\n`.
    ///
    /// A final line cut off by end of stream is still returned; the call
    /// after it returns `Ok(None)`. A line longer than [`MAX_LINE_LEN`]
    /// fails with [`TransportError::LineTooLong`].
    async fn recv(&self) -> Result<Option<Vec<u8>>, Self::Error> {
        let mut line = Vec::new();
        let mut reader = self.reader.lock().await;
        let read = (&mut *reader)
            .take(MAX_LINE_LEN as u64)
            .read_until(b'\n', &mut line)
            .await
            .map_err(TransportError::ReceiveFailed)?;
        if read == 0 {
            tracing::debug!(id = %self.id, "server closed the stream");
            return Ok(None);
        }
        if read == MAX_LINE_LEN && line.last() != Some(&b'\n') {
            tracing::warn!(id = %self.id, "line from server exceeds limit");
            return Err(TransportError::LineTooLong {
                limit: MAX_LINE_LEN,
            });
        }
        Ok(Some(line))
    }

    async fn close(&self) -> Result<(), Self::Error> {
        self.writer
            .lock()
            .await
            .shutdown()
            .await
            .map_err(TransportError::SendFailed)
    }

    fn id(&self) -> ConnectionId {
        self.id
    }
}
