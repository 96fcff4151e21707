//! The session state machine.
//!
//! [`SessionState::evaluate`] is the only thing that moves the phase. It
//! is called once for every message the client is about to send and once
//! for every message it receives, and answers whether that message is
//! legitimate right now.

use chatwire_protocol::{Direction, DisplayName, Message, Payload};

use crate::Phase;

/// Everything the protocol needs to remember about one connection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    /// Current protocol phase.
    pub phase: Phase,

    /// An `AUTH` or `JOIN` was sent and its `REPLY` has not arrived.
    /// At most one such request is in flight.
    pub awaiting_reply: bool,

    /// The session is ending because of an error, either one the server
    /// reported or one it committed.
    pub error_flag: bool,

    /// The user's current nickname. Empty until the first `AUTH`.
    pub display_name: DisplayName,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Checks `message` against the current phase and applies the
    /// transition.
    ///
    /// Returns `true` if the message is legitimate. An illegitimate
    /// outgoing message leaves the state untouched and must not be sent.
    /// An illegitimate incoming message moves the session to
    /// [`Phase::Erroring`].
    ///
    /// `Erroring` always advances to `Ended` here, whatever the message.
    /// `Ended` ignores everything.
    pub fn evaluate(&mut self, message: &Message) -> bool {
        let before = self.phase;
        let legitimate = match message.direction() {
            Direction::Outgoing => self.evaluate_outgoing(message.payload()),
            Direction::Incoming => self.evaluate_incoming(message.payload()),
            Direction::Local => false,
        };

        if self.phase != before {
            tracing::debug!(
                kind = %message.kind(),
                direction = ?message.direction(),
                from = %before,
                to = %self.phase,
                "session phase changed"
            );
        }
        legitimate
    }

    fn evaluate_outgoing(&mut self, payload: &Payload) -> bool {
        match (self.phase, payload) {
            (
                Phase::Start | Phase::Authenticating,
                Payload::Auth { display_name, .. },
            ) => {
                self.phase = Phase::Authenticating;
                self.awaiting_reply = true;
                self.display_name = display_name.clone();
                true
            }
            (Phase::Authenticating, Payload::Bye) => {
                self.end();
                true
            }
            (Phase::Open, Payload::Join { .. }) => {
                self.awaiting_reply = true;
                true
            }
            (Phase::Open, Payload::Chat { .. }) => true,
            (Phase::Erroring, _) => {
                self.end();
                false
            }
            _ => false,
        }
    }

    fn evaluate_incoming(&mut self, payload: &Payload) -> bool {
        match (self.phase, payload) {
            (Phase::Authenticating, Payload::Reply { success, .. })
                if self.awaiting_reply =>
            {
                self.awaiting_reply = false;
                if *success {
                    self.phase = Phase::Open;
                }
                true
            }
            (Phase::Open, Payload::Reply { .. }) if self.awaiting_reply => {
                self.awaiting_reply = false;
                true
            }
            (Phase::Open, Payload::Chat { .. }) => true,
            (Phase::Authenticating | Phase::Open, Payload::Error { .. }) => {
                self.error_flag = true;
                self.end();
                true
            }
            (Phase::Open, Payload::Bye) => {
                self.end();
                true
            }
            (Phase::Erroring, _) => {
                self.end();
                false
            }
            (Phase::Ended, _) => false,
            (Phase::Start | Phase::Authenticating | Phase::Open, _) => {
                self.reject();
                false
            }
        }
    }

    /// Records a protocol violation by the server: the phase becomes
    /// [`Phase::Erroring`] and the error flag is raised.
    ///
    /// Used directly when an incoming message could not even be decoded.
    /// Has no effect once the session has ended.
    pub fn reject(&mut self) {
        if self.phase != Phase::Ended {
            self.phase = Phase::Erroring;
            self.error_flag = true;
        }
    }

    /// Replaces the display name used for outgoing messages.
    pub fn rename(&mut self, display_name: DisplayName) {
        self.display_name = display_name;
    }

    /// Ends the session from the client side (end of input, interrupt,
    /// or farewell after an error). Returns the phase it was in.
    pub fn terminate(&mut self) -> Phase {
        let before = self.phase;
        self.end();
        before
    }

    fn end(&mut self) {
        self.phase = Phase::Ended;
        self.awaiting_reply = false;
    }
}
