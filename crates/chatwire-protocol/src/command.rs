//! Parsing of user input lines into commands.
//!
//! A line starting with `/` is a command; anything else is chat text.
//! Validation runs before any [`Message`] is built, so a rejected line
//! never consumes a sequence number and never reaches the wire.

use crate::{
    ChannelId, Content, Direction, DisplayName, InputError, Message,
    MessageKind, Payload, Secret, Username,
};

/// The local help screen.
pub const HELP: &str = "\
--- chatwire help ---
/auth {Username} {Secret} {DisplayName}
    sign in to the server
/join {ChannelID}
    join a channel
/rename {DisplayName}
    change your display name (local only)
/help
    show this help screen
Any other line is sent as a chat message.";

/// What the user asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Send a message to the server.
    Send(Message),
    /// Change the local display name. Nothing is sent.
    Rename(DisplayName),
    /// Print [`HELP`]. Nothing is sent.
    Help,
}

impl Command {
    /// Parses one input line.
    ///
    /// `display_name` is the session's current name; it is stamped onto
    /// `JOIN` and chat messages.
    ///
    /// # Errors
    /// - [`InputError::UnknownCommand`] for an unrecognized `/command`
    /// - [`InputError::Arity`] for a wrong number of arguments
    /// - [`InputError::Invalid`] when an argument breaks its field rules
    pub fn parse(
        line: &str,
        display_name: &DisplayName,
    ) -> Result<Self, InputError> {
        let Some(command) = line.strip_prefix('/') else {
            let content = Content::parse(line)?;
            return Ok(Self::Send(Message::outgoing(Payload::Chat {
                display_name: display_name.clone(),
                content,
            })));
        };

        let mut words = command.split_whitespace();
        let name = words.next().unwrap_or_default();
        let args: Vec<&str> = words.collect();

        match name.to_ascii_lowercase().as_str() {
            "auth" => {
                let [username, secret, new_name] = args.as_slice() else {
                    return Err(InputError::Arity {
                        usage: "/auth {Username} {Secret} {DisplayName}",
                    });
                };
                let payload = Payload::Auth {
                    username: Username::parse(username)?,
                    secret: Secret::parse(secret)?,
                    display_name: DisplayName::parse(new_name)?,
                };
                Ok(Self::Send(Message::outgoing(payload)))
            }
            "join" => {
                let [channel] = args.as_slice() else {
                    return Err(InputError::Arity {
                        usage: "/join {ChannelID}",
                    });
                };
                let payload = Payload::Join {
                    channel_id: ChannelId::parse(channel)?,
                    display_name: display_name.clone(),
                };
                Ok(Self::Send(Message::outgoing(payload)))
            }
            "rename" => {
                let [new_name] = args.as_slice() else {
                    return Err(InputError::Arity {
                        usage: "/rename {DisplayName}",
                    });
                };
                Ok(Self::Rename(DisplayName::parse(new_name)?))
            }
            "help" => Ok(Self::Help),
            _ => Err(InputError::UnknownCommand(name.to_owned())),
        }
    }

    pub fn kind(&self) -> MessageKind {
        match self {
            Self::Send(message) => message.kind(),
            Self::Rename(_) => MessageKind::Rename,
            Self::Help => MessageKind::Help,
        }
    }

    pub fn direction(&self) -> Direction {
        match self {
            Self::Send(message) => message.direction(),
            Self::Rename(_) | Self::Help => Direction::Local,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Field, ValidationError, encode_text};

    fn alice() -> DisplayName {
        DisplayName::parse("Alice").unwrap()
    }

    #[test]
    fn test_parse_auth_produces_outgoing_auth() {
        let cmd =
            Command::parse("/auth alice secret123 Alice", &DisplayName::default())
                .unwrap();
        let Command::Send(msg) = cmd else {
            panic!("expected a message");
        };
        assert!(msg.is_outgoing());
        assert!(msg.id().is_some());
        assert_eq!(
            encode_text(&msg).unwrap(),
            "AUTH alice AS Alice USING secret123\r\n"
        );
    }

    #[test]
    fn test_parse_join_uses_current_display_name() {
        let Command::Send(msg) = Command::parse("/join general", &alice()).unwrap()
        else {
            panic!("expected a message");
        };
        assert_eq!(
            msg.payload(),
            &Payload::Join {
                channel_id: ChannelId::parse("general").unwrap(),
                display_name: alice(),
            }
        );
    }

    #[test]
    fn test_plain_line_is_chat() {
        let Command::Send(msg) = Command::parse("hello world", &alice()).unwrap()
        else {
            panic!("expected a message");
        };
        assert_eq!(msg.kind(), MessageKind::ChatText);
        assert_eq!(msg.display_name(), Some(&alice()));
    }

    #[test]
    fn test_rename_and_help_are_local() {
        let rename = Command::parse("/rename Bob", &alice()).unwrap();
        assert_eq!(rename, Command::Rename(DisplayName::parse("Bob").unwrap()));
        assert_eq!(rename.direction(), Direction::Local);
        assert_eq!(rename.kind(), MessageKind::Rename);

        let help = Command::parse("/HELP", &alice()).unwrap();
        assert_eq!(help, Command::Help);
        assert_eq!(help.direction(), Direction::Local);
    }

    #[test]
    fn test_wrong_arity_is_rejected() {
        assert!(matches!(
            Command::parse("/auth alice secret", &alice()),
            Err(InputError::Arity { .. })
        ));
        assert!(matches!(
            Command::parse("/join", &alice()),
            Err(InputError::Arity { .. })
        ));
        assert!(matches!(
            Command::parse("/rename a b", &alice()),
            Err(InputError::Arity { .. })
        ));
    }

    #[test]
    fn test_unknown_command() {
        assert_eq!(
            Command::parse("/quit", &alice()),
            Err(InputError::UnknownCommand("quit".into()))
        );
    }

    #[test]
    fn test_long_display_name_rejected_before_message_exists() {
        let long = "N".repeat(25);
        let result =
            Command::parse(&format!("/auth alice secret {long}"), &alice());
        assert_eq!(
            result,
            Err(InputError::Invalid(ValidationError::TooLong {
                field: Field::DisplayName,
                max: 20,
            }))
        );
    }

    #[test]
    fn test_invalid_chat_text_rejected() {
        assert!(matches!(
            Command::parse("tab\tinside", &alice()),
            Err(InputError::Invalid(_))
        ));
    }
}
