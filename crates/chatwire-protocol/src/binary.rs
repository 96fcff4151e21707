//! Fixed-layout binary encoding, used over the datagram transport.
//!
//! Every message starts with a one-byte type code followed by a
//! little-endian `u16` (the message id, or for `CONFIRM` the id being
//! confirmed). Variable-length fields end with a single zero byte.
//!
//! ```text
//! CONFIRM  0x00 | ref_id
//! REPLY    0x01 | id | result(1) | reserved(2) | content...
//! AUTH     0x02 | id | username \0 | display_name \0 | secret \0
//! JOIN     0x03 | id | channel_id \0 | display_name \0
//! MSG      0x04 | id | display_name \0 | content \0
//! ERR      0xFE | id | display_name \0 | content \0
//! BYE      0xFF | id
//! ```

use crate::{
    ChannelId, Content, DisplayName, Message, MessageId, Payload,
    ProtocolError, Secret, Username,
};

/// Type codes of the binary encoding.
pub mod code {
    pub const ACK: u8 = 0x00;
    pub const REPLY: u8 = 0x01;
    pub const AUTH: u8 = 0x02;
    pub const JOIN: u8 = 0x03;
    pub const MSG: u8 = 0x04;
    pub const ERR: u8 = 0xFE;
    pub const BYE: u8 = 0xFF;
}

/// Size of the type code plus the id.
pub const HEADER_LEN: usize = 3;

/// The fixed prefix shared by every binary message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub code: u8,
    pub id: MessageId,
}

impl Header {
    /// Returns `true` for a `CONFIRM`, whose id field is a `ref_id`.
    pub fn is_ack(&self) -> bool {
        self.code == code::ACK
    }
}

/// Reads only the header of a datagram.
///
/// The reliability layer uses this to acknowledge a datagram before (and
/// regardless of whether) the rest of it decodes.
pub fn peek_header(data: &[u8]) -> Result<Header, ProtocolError> {
    let mut reader = Reader::new(data);
    Ok(Header {
        code: reader.u8()?,
        id: MessageId(reader.u16_le()?),
    })
}

/// Serializes a message into its datagram form.
///
/// A message without an id (an incoming one being re-encoded) is written
/// with id `0`.
pub fn encode_binary(message: &Message) -> Vec<u8> {
    let id = message.id().map_or(0, |id| id.0);
    let mut out = Vec::with_capacity(64);

    match message.payload() {
        Payload::Ack { ref_id } => {
            out.push(code::ACK);
            out.extend_from_slice(&ref_id.0.to_le_bytes());
        }
        Payload::Reply { success, content } => {
            put_header(&mut out, code::REPLY, id);
            out.push(u8::from(*success));
            out.extend_from_slice(&[0, 0]);
            out.extend_from_slice(content.as_str().as_bytes());
        }
        Payload::Auth {
            username,
            display_name,
            secret,
        } => {
            put_header(&mut out, code::AUTH, id);
            put_field(&mut out, username.as_str());
            put_field(&mut out, display_name.as_str());
            put_field(&mut out, secret.as_str());
        }
        Payload::Join {
            channel_id,
            display_name,
        } => {
            put_header(&mut out, code::JOIN, id);
            put_field(&mut out, channel_id.as_str());
            put_field(&mut out, display_name.as_str());
        }
        Payload::Chat {
            display_name,
            content,
        } => {
            put_header(&mut out, code::MSG, id);
            put_field(&mut out, display_name.as_str());
            put_field(&mut out, content.as_str());
        }
        Payload::Error {
            display_name,
            content,
        } => {
            put_header(&mut out, code::ERR, id);
            put_field(&mut out, display_name.as_str());
            put_field(&mut out, content.as_str());
        }
        Payload::Bye => put_header(&mut out, code::BYE, id),
    }

    out
}

/// Parses a datagram received from the peer.
///
/// The result is an incoming message; the wire id is not kept on it (use
/// [`peek_header`] when the id is needed). Bytes after the last expected
/// field are ignored.
pub fn decode_binary(data: &[u8]) -> Result<Message, ProtocolError> {
    let mut reader = Reader::new(data);
    let type_code = reader.u8()?;
    let id = reader.u16_le()?;

    let payload = match type_code {
        code::ACK => Payload::Ack {
            ref_id: MessageId(id),
        },
        code::REPLY => {
            let success = match reader.u8()? {
                0 => false,
                1 => true,
                other => {
                    return Err(ProtocolError::Malformed(format!(
                        "reply result must be 0 or 1, got {other}"
                    )));
                }
            };
            reader.take(2)?;
            let mut content = reader.rest();
            if let [head @ .., 0] = content {
                content = head;
            }
            Payload::Reply {
                success,
                content: Content::from_wire(text(content)),
            }
        }
        code::AUTH => Payload::Auth {
            username: Username::from_wire(reader.field("username")?),
            display_name: DisplayName::from_wire(
                reader.field("display name")?,
            ),
            secret: Secret::from_wire(reader.field("secret")?),
        },
        code::JOIN => Payload::Join {
            channel_id: ChannelId::from_wire(reader.field("channel id")?),
            display_name: DisplayName::from_wire(
                reader.field("display name")?,
            ),
        },
        code::MSG => Payload::Chat {
            display_name: DisplayName::from_wire(
                reader.field("display name")?,
            ),
            content: Content::from_wire(reader.field("content")?),
        },
        code::ERR => Payload::Error {
            display_name: DisplayName::from_wire(
                reader.field("display name")?,
            ),
            content: Content::from_wire(reader.field("content")?),
        },
        code::BYE => Payload::Bye,
        other => return Err(ProtocolError::UnknownType(other)),
    };

    Ok(Message::incoming(payload))
}

fn put_header(out: &mut Vec<u8>, type_code: u8, id: u16) {
    out.push(type_code);
    out.extend_from_slice(&id.to_le_bytes());
}

fn put_field(out: &mut Vec<u8>, value: &str) {
    out.extend_from_slice(value.as_bytes());
    out.push(0);
}

fn text(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

/// A cursor over an untrusted buffer. Every read is bounds-checked.
struct Reader<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> Reader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, offset: 0 }
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], ProtocolError> {
        let truncated = ProtocolError::Truncated {
            offset: self.offset,
            needed: len,
        };
        let end = self.offset.checked_add(len).ok_or(truncated.clone())?;
        let bytes = self.data.get(self.offset..end).ok_or(truncated)?;
        self.offset = end;
        Ok(bytes)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N], ProtocolError> {
        let offset = self.offset;
        let bytes = self.take(N)?;
        <[u8; N]>::try_from(bytes).map_err(|_| ProtocolError::Truncated {
            offset,
            needed: N,
        })
    }

    fn u8(&mut self) -> Result<u8, ProtocolError> {
        let [byte] = self.array()?;
        Ok(byte)
    }

    fn u16_le(&mut self) -> Result<u16, ProtocolError> {
        self.array().map(u16::from_le_bytes)
    }

    /// Reads a zero-terminated field and consumes the terminator.
    fn field(&mut self, name: &'static str) -> Result<String, ProtocolError> {
        let rest = self.data.get(self.offset..).unwrap_or_default();
        let len = rest
            .iter()
            .position(|b| *b == 0)
            .ok_or(ProtocolError::MissingTerminator(name))?;
        let value = text(&rest[..len]);
        self.offset += len + 1;
        Ok(value)
    }

    fn rest(&mut self) -> &'a [u8] {
        let rest = self.data.get(self.offset..).unwrap_or_default();
        self.offset = self.data.len();
        rest
    }
}
