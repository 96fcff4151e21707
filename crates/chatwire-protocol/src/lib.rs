//! Wire protocol for the chatwire client.
//!
//! This crate defines everything the client says and hears:
//!
//! - **Fields** ([`Username`], [`DisplayName`], [`Content`], ...): validated
//!   newtypes. Building one from user input checks length and charset.
//! - **Types** ([`Message`], [`Payload`], [`MessageId`]): the messages that
//!   travel on the wire, with their direction and sequence number.
//! - **Commands** ([`Command`]): one line of user input, parsed into a
//!   message to send or a local action.
//! - **Encodings**: the CRLF line format ([`encode_text`], [`decode_text`])
//!   and the fixed-layout datagram format ([`encode_binary`],
//!   [`decode_binary`]), both reachable through the [`Codec`] trait.
//! - **Errors** ([`ProtocolError`], [`ValidationError`], [`InputError`]).
//!
//! # Architecture
//!
//! The protocol layer knows nothing about sockets or session phases. It
//! turns lines and datagrams into [`Message`]s and back.
//!
//! ```text
//! Transport (bytes) -> Protocol (Message) -> Session (phase check)
//! ```

mod codec;
mod command;
mod error;
mod fields;
mod text;
mod types;

pub mod binary;

pub use binary::{
    HEADER_LEN, Header, code, decode_binary, encode_binary, peek_header,
};
pub use codec::{BinaryCodec, Codec, TextCodec};
pub use command::{Command, HELP};
pub use error::{InputError, ProtocolError, ValidationError};
pub use fields::{ChannelId, Content, DisplayName, Field, Secret, Username};
pub use text::{CRLF, decode_text, encode_text};
pub use types::{Direction, Message, MessageId, MessageKind, Payload};
