//! Error types for the session layer.

use chatwire_protocol::MessageKind;

use crate::Phase;

/// Errors reported by the shared [`Session`](crate::Session) handle.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// The session reached [`Phase::Ended`] before the awaited event.
    #[error("session ended")]
    Ended,

    /// The user tried to send something the current phase forbids.
    /// Nothing was sent and the phase is unchanged.
    #[error("{kind} is not allowed while the session is {phase}")]
    NotAllowed { kind: MessageKind, phase: Phase },
}
