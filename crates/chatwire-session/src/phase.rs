//! The protocol phases a session moves through.

use std::fmt;

/// Where the session is in the conversation with the server.
///
/// ```text
///   Start --(send AUTH)--> Authenticating --(REPLY OK)--> Open
///                              |     ^                     |
///                              |     +--(REPLY NOK)        |
///                              v                           v
///                            Ended <--------------(ERR / BYE)
///
///   any phase --(illegal incoming)--> Erroring --> Ended
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Phase {
    /// Nothing sent yet. The server may not speak first.
    #[default]
    Start,
    /// `AUTH` sent, waiting for a successful reply.
    Authenticating,
    /// Authenticated. Chat and channel changes are allowed.
    Open,
    /// The server broke the protocol. Ends on the next evaluation.
    Erroring,
    /// Terminal.
    Ended,
}

impl Phase {
    /// Returns `true` once nothing more may be sent or received.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Ended)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Start => write!(f, "start"),
            Self::Authenticating => write!(f, "authenticating"),
            Self::Open => write!(f, "open"),
            Self::Erroring => write!(f, "erroring"),
            Self::Ended => write!(f, "ended"),
        }
    }
}
