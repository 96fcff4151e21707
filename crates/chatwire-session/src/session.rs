//! The shared session handle.
//!
//! The client runs two tasks (one reading user input, one reading the
//! socket) that both consult and change the same [`SessionState`]. The
//! state lives in a `tokio::sync::watch` channel: every mutation goes
//! through the sender, which serializes writers, and any task can wait
//! for a condition on the state without polling.

use std::sync::Arc;

use chatwire_protocol::{DisplayName, Message};
use tokio::sync::watch;

use crate::{Phase, SessionError, SessionState};

/// Cheaply cloneable handle to one connection's session state.
#[derive(Debug, Clone)]
pub struct Session {
    state: Arc<watch::Sender<SessionState>>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    /// Creates a session in [`Phase::Start`].
    pub fn new() -> Self {
        let (state, _) = watch::channel(SessionState::new());
        Self {
            state: Arc::new(state),
        }
    }

    /// Runs the state machine on `message`. See [`SessionState::evaluate`].
    pub fn evaluate(&self, message: &Message) -> bool {
        let mut legitimate = false;
        self.state.send_modify(|state| {
            legitimate = state.evaluate(message);
        });
        legitimate
    }

    /// Evaluates a message the user wants to send.
    ///
    /// # Errors
    /// Returns [`SessionError::NotAllowed`] if the current phase forbids
    /// the message. The state is unchanged in that case.
    pub fn authorize(&self, message: &Message) -> Result<(), SessionError> {
        let phase = self.phase();
        if self.evaluate(message) {
            Ok(())
        } else {
            Err(SessionError::NotAllowed {
                kind: message.kind(),
                phase,
            })
        }
    }

    /// Marks the server as having broken the protocol.
    pub fn reject_incoming(&self) {
        self.state.send_modify(SessionState::reject);
    }

    /// Ends the session from the client side and returns the phase it
    /// was in before.
    pub fn terminate(&self) -> Phase {
        let mut before = Phase::Ended;
        self.state.send_modify(|state| before = state.terminate());
        before
    }

    pub fn rename(&self, display_name: DisplayName) {
        self.state.send_modify(|state| state.rename(display_name));
    }

    /// A copy of the current state.
    pub fn snapshot(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn phase(&self) -> Phase {
        self.state.borrow().phase
    }

    pub fn display_name(&self) -> DisplayName {
        self.state.borrow().display_name.clone()
    }

    /// Waits until no reply is outstanding.
    ///
    /// Returns immediately if none is. Outgoing requests are held back
    /// behind this so that at most one `AUTH`/`JOIN` is unanswered.
    ///
    /// # Errors
    /// Returns [`SessionError::Ended`] if the session ends while waiting.
    pub async fn wait_for_reply(&self) -> Result<(), SessionError> {
        let mut rx = self.state.subscribe();
        let state = rx
            .wait_for(|s| !s.awaiting_reply || s.phase.is_terminal())
            .await
            .map_err(|_| SessionError::Ended)?;
        if state.phase.is_terminal() {
            return Err(SessionError::Ended);
        }
        Ok(())
    }

    /// Waits until the session reaches [`Phase::Ended`].
    pub async fn ended(&self) {
        let mut rx = self.state.subscribe();
        let _ = rx.wait_for(|s| s.phase.is_terminal()).await;
    }
}
