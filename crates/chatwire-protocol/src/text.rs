//! Line-oriented text encoding, used over the stream transport.
//!
//! One message per line, each line terminated by `\r\n`:
//!
//! ```text
//! AUTH {username} AS {display_name} USING {secret}
//! JOIN {channel_id} AS {display_name}
//! MSG FROM {display_name} IS {content}
//! ERR FROM {display_name} IS {content}
//! REPLY {OK|NOK} IS {content}
//! BYE
//! ```
//!
//! Keywords are matched case-insensitively when decoding. Content is
//! everything after the fixed prefix, so it may contain spaces.

use crate::{
    ChannelId, Content, DisplayName, Message, MessageKind, Payload,
    ProtocolError, Secret, Username,
};

/// Line terminator of the text encoding.
pub const CRLF: &str = "\r\n";

/// Serializes a message into one CRLF-terminated line.
///
/// # Errors
/// Returns [`ProtocolError::NoTextForm`] for `CONFIRM`, which only exists
/// in the binary encoding.
pub fn encode_text(message: &Message) -> Result<String, ProtocolError> {
    let line = match message.payload() {
        Payload::Auth {
            username,
            display_name,
            secret,
        } => format!("AUTH {username} AS {display_name} USING {secret}"),
        Payload::Join {
            channel_id,
            display_name,
        } => format!("JOIN {channel_id} AS {display_name}"),
        Payload::Chat {
            display_name,
            content,
        } => format!("MSG FROM {display_name} IS {content}"),
        Payload::Error {
            display_name,
            content,
        } => format!("ERR FROM {display_name} IS {content}"),
        Payload::Reply { success, content } => {
            let verdict = if *success { "OK" } else { "NOK" };
            format!("REPLY {verdict} IS {content}")
        }
        Payload::Bye => "BYE".to_owned(),
        Payload::Ack { .. } => {
            return Err(ProtocolError::NoTextForm(MessageKind::Ack));
        }
    };
    Ok(line + CRLF)
}

/// Parses one line received from the peer.
///
/// The trailing `\r\n` (or a bare `\n`) is optional. An unknown leading
/// keyword yields [`ProtocolError::UnknownKeyword`]; a known keyword with
/// the wrong shape yields [`ProtocolError::Malformed`].
pub fn decode_text(line: &str) -> Result<Message, ProtocolError> {
    let line = line.trim_end_matches(['\r', '\n']);
    let (keyword, rest) = line.split_once(' ').unwrap_or((line, ""));

    let payload = match keyword.to_ascii_uppercase().as_str() {
        "REPLY" => {
            let mut parts = rest.splitn(3, ' ');
            let verdict = token(&mut parts, "reply result")?;
            let success = if verdict.eq_ignore_ascii_case("OK") {
                true
            } else if verdict.eq_ignore_ascii_case("NOK") {
                false
            } else {
                return Err(ProtocolError::Malformed(format!(
                    "reply result must be OK or NOK, got {verdict:?}"
                )));
            };
            expect(&mut parts, "IS")?;
            Payload::Reply {
                success,
                content: Content::from_wire(parts.next().unwrap_or_default()),
            }
        }
        "MSG" | "ERR" => {
            let mut parts = rest.splitn(4, ' ');
            expect(&mut parts, "FROM")?;
            let display_name =
                DisplayName::from_wire(token(&mut parts, "display name")?);
            expect(&mut parts, "IS")?;
            let content = Content::from_wire(parts.next().unwrap_or_default());
            if keyword.eq_ignore_ascii_case("MSG") {
                Payload::Chat {
                    display_name,
                    content,
                }
            } else {
                Payload::Error {
                    display_name,
                    content,
                }
            }
        }
        "AUTH" => {
            let mut parts = rest.split(' ');
            let username = Username::from_wire(token(&mut parts, "username")?);
            expect(&mut parts, "AS")?;
            let display_name =
                DisplayName::from_wire(token(&mut parts, "display name")?);
            expect(&mut parts, "USING")?;
            let secret = Secret::from_wire(token(&mut parts, "secret")?);
            no_more(&mut parts)?;
            Payload::Auth {
                username,
                display_name,
                secret,
            }
        }
        "JOIN" => {
            let mut parts = rest.split(' ');
            let channel_id =
                ChannelId::from_wire(token(&mut parts, "channel id")?);
            expect(&mut parts, "AS")?;
            let display_name =
                DisplayName::from_wire(token(&mut parts, "display name")?);
            no_more(&mut parts)?;
            Payload::Join {
                channel_id,
                display_name,
            }
        }
        "BYE" => {
            if !rest.trim().is_empty() {
                return Err(ProtocolError::Malformed(
                    "BYE takes no arguments".into(),
                ));
            }
            Payload::Bye
        }
        _ => return Err(ProtocolError::UnknownKeyword(keyword.to_owned())),
    };

    Ok(Message::incoming(payload))
}

/// Takes the next non-empty word.
fn token<'a>(
    parts: &mut impl Iterator<Item = &'a str>,
    what: &str,
) -> Result<&'a str, ProtocolError> {
    match parts.next() {
        Some(word) if !word.is_empty() => Ok(word),
        _ => Err(ProtocolError::Malformed(format!("missing {what}"))),
    }
}

/// Takes the next word and checks it is the given keyword.
fn expect<'a>(
    parts: &mut impl Iterator<Item = &'a str>,
    keyword: &str,
) -> Result<(), ProtocolError> {
    match parts.next() {
        Some(word) if word.eq_ignore_ascii_case(keyword) => Ok(()),
        Some(word) => Err(ProtocolError::Malformed(format!(
            "expected {keyword}, got {word:?}"
        ))),
        None => Err(ProtocolError::Malformed(format!("missing {keyword}"))),
    }
}

fn no_more<'a>(
    parts: &mut impl Iterator<Item = &'a str>,
) -> Result<(), ProtocolError> {
    match parts.next() {
        None => Ok(()),
        Some(extra) => Err(ProtocolError::Malformed(format!(
            "unexpected trailing {extra:?}"
        ))),
    }
}
