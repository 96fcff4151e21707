//! Validated field types carried inside chat messages.
//!
//! Each field is a newtype around `String`. The only public way to build
//! one from user input is `parse`, which enforces the length and charset
//! rules below, so a [`Message`](crate::Message) built from these types
//! can never carry an invalid field:
//!
//! | field        | max  | charset                          |
//! |--------------|------|----------------------------------|
//! | username     | 20   | ASCII alphanumeric or `-`        |
//! | secret       | 128  | ASCII alphanumeric or `-`        |
//! | channel id   | 20   | ASCII alphanumeric or `-`        |
//! | display name | 20   | printable ASCII `0x21..=0x7E`    |
//! | content      | 1400 | printable ASCII `0x20..=0x7E`    |
//!
//! Decoders use `from_wire` instead. Peer data is shown to the user as
//! received; rejecting a server's message over a field rule would turn a
//! cosmetic difference into a protocol error.

use std::fmt;

use crate::ValidationError;

/// Identifies which field rule applies to a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Username,
    Secret,
    ChannelId,
    DisplayName,
    Content,
}

impl Field {
    /// Maximum length of the field, in characters.
    pub const fn max_len(self) -> usize {
        match self {
            Self::Username | Self::ChannelId | Self::DisplayName => 20,
            Self::Secret => 128,
            Self::Content => 1400,
        }
    }

    /// Returns `true` if `c` may appear in this field.
    pub fn allows(self, c: char) -> bool {
        match self {
            Self::Username | Self::Secret | Self::ChannelId => {
                c.is_ascii_alphanumeric() || c == '-'
            }
            Self::DisplayName => ('\x21'..='\x7e').contains(&c),
            Self::Content => ('\x20'..='\x7e').contains(&c),
        }
    }

    /// Human-readable description of the allowed charset.
    pub const fn charset(self) -> &'static str {
        match self {
            Self::Username | Self::Secret | Self::ChannelId => {
                "alphanumerics or dash"
            }
            Self::DisplayName => "printable characters without space",
            Self::Content => "printable characters or space",
        }
    }

    /// Checks `value` against this field's rules.
    pub fn validate(self, value: &str) -> Result<(), ValidationError> {
        if value.is_empty() {
            return Err(ValidationError::Empty { field: self });
        }
        if let Some(ch) = value.chars().find(|c| !self.allows(*c)) {
            return Err(ValidationError::InvalidCharacter { field: self, ch });
        }
        // Every allowed character is ASCII, so bytes == characters here.
        if value.len() > self.max_len() {
            return Err(ValidationError::TooLong {
                field: self,
                max: self.max_len(),
            });
        }
        Ok(())
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Username => write!(f, "username"),
            Self::Secret => write!(f, "secret"),
            Self::ChannelId => write!(f, "channel id"),
            Self::DisplayName => write!(f, "display name"),
            Self::Content => write!(f, "message"),
        }
    }
}

/// Declares a validated string newtype for one [`Field`].
macro_rules! field_type {
    ($(#[$meta:meta])* $name:ident => $field:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash)]
        pub struct $name(String);

        impl $name {
            /// Validates user input and wraps it.
            pub fn parse(value: &str) -> Result<Self, ValidationError> {
                $field.validate(value)?;
                Ok(Self(value.to_owned()))
            }

            /// Wraps a value decoded from the wire without validating it.
            pub(crate) fn from_wire(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Returns the value as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

field_type! {
    /// Account name used to authenticate.
    Username => Field::Username
}

field_type! {
    /// Account secret used to authenticate.
    Secret => Field::Secret
}

field_type! {
    /// Name of the channel to join.
    ChannelId => Field::ChannelId
}

field_type! {
    /// The nickname shown next to the user's messages.
    ///
    /// `DisplayName::default()` is the empty name a session starts with,
    /// before the first `/auth`. It cannot be produced by `parse`.
    DisplayName => Field::DisplayName
}

field_type! {
    /// Chat or error text.
    Content => Field::Content
}

impl Default for DisplayName {
    fn default() -> Self {
        Self(String::new())
    }
}

impl DisplayName {
    /// Returns `true` for the initial, not-yet-chosen name.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
