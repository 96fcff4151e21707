//! Top-level error type for the client.

use chatwire_protocol::{ProtocolError, ValidationError};
use chatwire_session::SessionError;
use chatwire_transport::TransportError;

/// Any failure that ends the client with a non-zero exit status.
///
/// The `#[from]` variants let `?` lift crate errors without ceremony.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Connecting, sending, or receiving failed, or the server stopped
    /// confirming datagrams.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A message could not be encoded.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The server host name did not resolve.
    #[error("cannot resolve {host}: {source}")]
    Resolve {
        host: String,
        #[source]
        source: std::io::Error,
    },

    /// The server host name resolved to nothing.
    #[error("{0} has no usable address")]
    NoAddress(String),

    /// Reading user input failed.
    #[error("reading input failed: {0}")]
    Input(#[source] std::io::Error),

    /// Building the async runtime failed.
    #[error("cannot start runtime: {0}")]
    Runtime(#[source] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatwire_protocol::{Field, MessageId};
    use chatwire_session::Phase;

    #[test]
    fn test_from_transport_error() {
        let err: ClientError = TransportError::Unconfirmed {
            id: MessageId(5),
            attempts: 4,
        }
        .into();
        assert!(matches!(err, ClientError::Transport(_)));
        assert_eq!(
            err.to_string(),
            "message #5 was not confirmed after 4 attempts"
        );
    }

    #[test]
    fn test_from_protocol_error() {
        let err: ClientError = ProtocolError::UnknownType(0x42).into();
        assert!(matches!(err, ClientError::Protocol(_)));
    }

    #[test]
    fn test_from_session_error() {
        let err: ClientError = SessionError::NotAllowed {
            kind: chatwire_protocol::MessageKind::Join,
            phase: Phase::Start,
        }
        .into();
        assert!(matches!(err, ClientError::Session(_)));
    }

    #[test]
    fn test_from_validation_error() {
        let err: ClientError = ValidationError::Empty {
            field: Field::Content,
        }
        .into();
        assert!(matches!(err, ClientError::Validation(_)));
    }
}
