//! Error types for the protocol layer.
//!
//! Three kinds of failure live here. A [`ProtocolError`] means bytes from
//! the peer could not be understood. A [`ValidationError`] means a field
//! typed by the user breaks the field rules. An [`InputError`] means a
//! whole input line could not be turned into a command.

use crate::{Field, MessageKind};

/// Errors raised while encoding or decoding wire messages.
///
/// Every decode path returns one of these instead of panicking. The
/// bytes come from a peer we do not control, so an out-of-range offset
/// is an ordinary error, not a bug.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    /// The buffer ended before a fixed-size field could be read.
    #[error("message truncated: needed {needed} byte(s) at offset {offset}")]
    Truncated { offset: usize, needed: usize },

    /// A variable-length field was not followed by its zero byte.
    #[error("missing zero terminator after {0}")]
    MissingTerminator(&'static str),

    /// The binary type byte does not name any message kind.
    #[error("unknown message type 0x{0:02X}")]
    UnknownType(u8),

    /// The first word of a text line does not name any message kind.
    #[error("unknown message keyword {0:?}")]
    UnknownKeyword(String),

    /// The message kind was recognized but its layout is wrong.
    #[error("malformed message: {0}")]
    Malformed(String),

    /// The message kind only exists in the binary encoding.
    #[error("{0} has no text form")]
    NoTextForm(MessageKind),
}

/// A user-supplied field value that breaks the field rules.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// The field was empty.
    #[error("{field} must not be empty")]
    Empty { field: Field },

    /// The field exceeds its maximum length.
    #[error("{field} must be at most {max} characters long")]
    TooLong { field: Field, max: usize },

    /// The field contains a character outside its charset.
    #[error("{field} contains {ch:?}, only {} allowed", .field.charset())]
    InvalidCharacter { field: Field, ch: char },
}

/// An input line that cannot be turned into a [`Command`](crate::Command).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InputError {
    /// The line starts with `/` but names no known command.
    #[error("unrecognized command \"/{0}\", type \"/help\" to display help")]
    UnknownCommand(String),

    /// The command got the wrong number of arguments.
    #[error("wrong number of arguments, usage: {usage}")]
    Arity { usage: &'static str },

    /// One of the arguments failed validation.
    #[error(transparent)]
    Invalid(#[from] ValidationError),

    /// The line is not valid UTF-8 text.
    #[error("input line is not valid UTF-8 text")]
    NotText,
}
