//! Session layer for the chatwire client.
//!
//! This crate decides which messages are legal when:
//!
//! 1. **Phase** ([`Phase`]): where the conversation with the server is.
//! 2. **State machine** ([`SessionState::evaluate`]): checks every message
//!    the client is about to send and every message it receives against
//!    the current phase, and moves the phase along.
//! 3. **Shared handle** ([`Session`]): the one state record both client
//!    tasks read and mutate, with a notification the input side can wait
//!    on while a reply is outstanding.
//!
//! # How it fits in the stack
//!
//! ```text
//! Client driver (above)  <- asks "may I send this?" / "was that legal?"
//!     |
//! Session layer (this crate)  <- owns phase, reply flag, display name
//!     |
//! Protocol layer (below)  <- provides Message, DisplayName
//! ```

mod error;
mod phase;
mod session;
mod state;

pub use error::SessionError;
pub use phase::Phase;
pub use session::Session;
pub use state::SessionState;
