//! Codec trait and the two wire encodings.
//!
//! The transport drivers don't care HOW a message becomes bytes; they
//! hold something that implements [`Codec`]. The stream transport uses
//! [`TextCodec`], the datagram transport uses [`BinaryCodec`].

use crate::{
    Message, ProtocolError, decode_binary, decode_text, encode_binary,
    encode_text,
};

/// Converts between [`Message`]s and their wire bytes.
///
/// `Send + Sync + 'static` so a codec can live inside a client that is
/// driven from several tasks.
pub trait Codec: Send + Sync + 'static {
    /// Serializes an outgoing message.
    ///
    /// # Errors
    /// Returns `ProtocolError::NoTextForm` if the encoding cannot
    /// represent the message kind.
    fn encode(&self, message: &Message) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes received from the peer into an incoming message.
    ///
    /// # Errors
    /// Returns a `ProtocolError` if the bytes are malformed, truncated,
    /// or name an unknown message kind.
    fn decode(&self, data: &[u8]) -> Result<Message, ProtocolError>;
}

// ---------------------------------------------------------------------------
// TextCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] for the CRLF-terminated line encoding.
///
/// ```rust
/// use chatwire_protocol::{Codec, Content, DisplayName, Message, Payload, TextCodec};
///
/// let msg = Message::outgoing(Payload::Chat {
///     display_name: DisplayName::parse("Alice").unwrap(),
///     content: Content::parse("hello").unwrap(),
/// });
/// let bytes = TextCodec.encode(&msg).unwrap();
/// assert_eq!(bytes, b"MSG FROM Alice IS hello\r\n");
///
/// let decoded = TextCodec.decode(&bytes).unwrap();
/// assert_eq!(decoded.payload(), msg.payload());
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct TextCodec;

impl Codec for TextCodec {
    fn encode(&self, message: &Message) -> Result<Vec<u8>, ProtocolError> {
        encode_text(message).map(String::into_bytes)
    }

    fn decode(&self, data: &[u8]) -> Result<Message, ProtocolError> {
        let line = std::str::from_utf8(data).map_err(|e| {
            ProtocolError::Malformed(format!("line is not valid UTF-8: {e}"))
        })?;
        decode_text(line)
    }
}

// ---------------------------------------------------------------------------
// BinaryCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] for the fixed-layout datagram encoding.
#[derive(Debug, Clone, Copy, Default)]
pub struct BinaryCodec;

impl Codec for BinaryCodec {
    fn encode(&self, message: &Message) -> Result<Vec<u8>, ProtocolError> {
        Ok(encode_binary(message))
    }

    fn decode(&self, data: &[u8]) -> Result<Message, ProtocolError> {
        decode_binary(data)
    }
}
