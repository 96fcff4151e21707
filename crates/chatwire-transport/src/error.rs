use chatwire_protocol::MessageId;

/// Errors that can occur in the transport layer.
///
/// Every one of these is fatal to the session: the client reports it and
/// exits with a failure status.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Resolving or reaching the server failed.
    #[error("connect failed: {0}")]
    ConnectFailed(#[source] std::io::Error),

    /// The connection was closed underneath us.
    #[error("connection closed: {0}")]
    ConnectionClosed(String),

    /// Sending data failed.
    #[error("send failed: {0}")]
    SendFailed(#[source] std::io::Error),

    /// Receiving data failed.
    #[error("receive failed: {0}")]
    ReceiveFailed(#[source] std::io::Error),

    /// The server sent a line longer than the stream transport accepts.
    #[error("line from server exceeds {limit} bytes")]
    LineTooLong { limit: usize },

    /// A datagram was sent `attempts` times and never confirmed.
    #[error("message {id} was not confirmed after {attempts} attempts")]
    Unconfirmed { id: MessageId, attempts: u32 },

    /// The data handed to `send` is not a datagram this transport can
    /// track.
    #[error("cannot send datagram: {0}")]
    InvalidDatagram(#[source] chatwire_protocol::ProtocolError),
}
