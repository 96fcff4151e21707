//! Core message types for the chat protocol.
//!
//! A [`Message`] is an immutable value: who it travels to
//! ([`Direction`]), an optional [`MessageId`], and a [`Payload`] holding
//! the kind-specific fields. Local-only commands (`/rename`, `/help`) are
//! not messages at all; they live in [`Command`](crate::Command), so the
//! codecs never see something that has no wire form.

use std::fmt;
use std::sync::atomic::{AtomicU16, Ordering};

use crate::{ChannelId, Content, DisplayName, Secret, Username};

/// Counter for outgoing message sequence numbers. Wraps at 65536.
static NEXT_MESSAGE_ID: AtomicU16 = AtomicU16::new(0);

// ---------------------------------------------------------------------------
// MessageId
// ---------------------------------------------------------------------------

/// The 16-bit sequence number of an outgoing message.
///
/// Assigned once, when an outgoing message is constructed. A
/// retransmission reuses the same id, which is how the peer recognizes
/// duplicates and how acknowledgements are matched to sends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MessageId(pub u16);

impl MessageId {
    /// Takes the next id from the process-wide counter.
    pub fn next() -> Self {
        Self(NEXT_MESSAGE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Direction and kind
// ---------------------------------------------------------------------------

/// Where a message travels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Client to server.
    Outgoing,
    /// Server to client.
    Incoming,
    /// Never leaves the client (`/rename`, `/help`).
    Local,
}

/// Every kind of message the client knows about, wire or local.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    Auth,
    Join,
    ChatText,
    Bye,
    Error,
    Reply,
    /// Datagram acknowledgement.
    Ack,
    Rename,
    Help,
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Auth => "AUTH",
            Self::Join => "JOIN",
            Self::ChatText => "MSG",
            Self::Bye => "BYE",
            Self::Error => "ERR",
            Self::Reply => "REPLY",
            Self::Ack => "CONFIRM",
            Self::Rename => "RENAME",
            Self::Help => "HELP",
        };
        f.write_str(name)
    }
}

// ---------------------------------------------------------------------------
// Payload
// ---------------------------------------------------------------------------

/// The kind-specific content of a wire message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// Sign in with an account and choose a display name.
    Auth {
        username: Username,
        display_name: DisplayName,
        secret: Secret,
    },

    /// Move to another channel.
    Join {
        channel_id: ChannelId,
        display_name: DisplayName,
    },

    /// A line of chat.
    Chat {
        display_name: DisplayName,
        content: Content,
    },

    /// A fatal error report. Receiving one ends the session.
    Error {
        display_name: DisplayName,
        content: Content,
    },

    /// Orderly end of the session.
    Bye,

    /// Server verdict on an `Auth` or `Join`.
    Reply { success: bool, content: Content },

    /// Datagram acknowledgement of the message with id `ref_id`.
    Ack { ref_id: MessageId },
}

impl Payload {
    /// Returns the kind of this payload.
    pub fn kind(&self) -> MessageKind {
        match self {
            Self::Auth { .. } => MessageKind::Auth,
            Self::Join { .. } => MessageKind::Join,
            Self::Chat { .. } => MessageKind::ChatText,
            Self::Error { .. } => MessageKind::Error,
            Self::Bye => MessageKind::Bye,
            Self::Reply { .. } => MessageKind::Reply,
            Self::Ack { .. } => MessageKind::Ack,
        }
    }
}

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

/// A protocol message, outgoing or incoming.
///
/// Outgoing messages other than `Ack` get a fresh [`MessageId`] at
/// construction. Incoming messages and acknowledgements carry none; an
/// acknowledgement names the message it confirms through `ref_id`
/// instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    direction: Direction,
    id: Option<MessageId>,
    payload: Payload,
}

impl Message {
    /// Builds a client-to-server message.
    pub fn outgoing(payload: Payload) -> Self {
        let id = match payload {
            Payload::Ack { .. } => None,
            _ => Some(MessageId::next()),
        };
        Self {
            direction: Direction::Outgoing,
            id,
            payload,
        }
    }

    /// Builds a server-to-client message.
    pub fn incoming(payload: Payload) -> Self {
        Self {
            direction: Direction::Incoming,
            id: None,
            payload,
        }
    }

    /// Builds the outgoing acknowledgement for `ref_id`.
    pub fn ack(ref_id: MessageId) -> Self {
        Self::outgoing(Payload::Ack { ref_id })
    }

    /// Builds an outgoing `Bye`.
    pub fn bye() -> Self {
        Self::outgoing(Payload::Bye)
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn id(&self) -> Option<MessageId> {
        self.id
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    pub fn kind(&self) -> MessageKind {
        self.payload.kind()
    }

    pub fn is_outgoing(&self) -> bool {
        self.direction == Direction::Outgoing
    }

    pub fn is_incoming(&self) -> bool {
        self.direction == Direction::Incoming
    }

    /// The sender name carried by the message, if its kind has one.
    pub fn display_name(&self) -> Option<&DisplayName> {
        match &self.payload {
            Payload::Auth { display_name, .. }
            | Payload::Join { display_name, .. }
            | Payload::Chat { display_name, .. }
            | Payload::Error { display_name, .. } => Some(display_name),
            _ => None,
        }
    }
}
