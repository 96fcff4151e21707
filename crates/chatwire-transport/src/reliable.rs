//! Confirmation and retransmission of outgoing datagrams.
//!
//! Every datagram except `CONFIRM` is parked in a pending table under its
//! message id. The receive side resolves the entry when the matching
//! `CONFIRM` arrives; until then the sender resends the same bytes every
//! `confirm_timeout`, at most `max_retransmissions` extra times.

use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

use chatwire_protocol::MessageId;
use tokio::sync::{Mutex, oneshot};

use crate::TransportError;

/// How hard the datagram transport tries before giving up on a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReliabilityConfig {
    /// How long to wait for a `CONFIRM` before resending.
    pub confirm_timeout: Duration,
    /// How many times a message is resent after the first attempt.
    pub max_retransmissions: u8,
}

impl ReliabilityConfig {
    pub const DEFAULT_CONFIRM_TIMEOUT_MS: u64 = 250;
    pub const DEFAULT_CONFIRM_TIMEOUT: Duration =
        Duration::from_millis(Self::DEFAULT_CONFIRM_TIMEOUT_MS);
    pub const DEFAULT_MAX_RETRANSMISSIONS: u8 = 3;

    /// Total number of sends before a message counts as lost.
    pub fn attempts(&self) -> u32 {
        1 + u32::from(self.max_retransmissions)
    }
}

impl Default for ReliabilityConfig {
    fn default() -> Self {
        Self {
            confirm_timeout: Self::DEFAULT_CONFIRM_TIMEOUT,
            max_retransmissions: Self::DEFAULT_MAX_RETRANSMISSIONS,
        }
    }
}

/// Messages sent and not yet confirmed.
#[derive(Debug, Default)]
pub(crate) struct PendingAcks {
    waiting: Mutex<HashMap<MessageId, oneshot::Sender<()>>>,
}

impl PendingAcks {
    async fn register(&self, id: MessageId) -> oneshot::Receiver<()> {
        let (tx, rx) = oneshot::channel();
        if self.waiting.lock().await.insert(id, tx).is_some() {
            tracing::warn!(%id, "message id reused while still pending");
        }
        rx
    }

    async fn forget(&self, id: MessageId) {
        self.waiting.lock().await.remove(&id);
    }

    /// Resolves the entry for `ref_id`. Returns `false` for a `CONFIRM`
    /// nobody is waiting on (late, duplicated, or bogus).
    pub(crate) async fn confirm(&self, ref_id: MessageId) -> bool {
        match self.waiting.lock().await.remove(&ref_id) {
            Some(tx) => {
                let _ = tx.send(());
                true
            }
            None => false,
        }
    }

    /// Drops every entry, waking all senders with a closed channel.
    pub(crate) async fn abandon_all(&self) {
        self.waiting.lock().await.clear();
    }
}

/// Sends a datagram and waits until it is confirmed.
///
/// `transmit` performs one send of the unchanged bytes; it is called once
/// per attempt.
///
/// # Errors
/// - whatever `transmit` fails with
/// - [`TransportError::Unconfirmed`] once every attempt has timed out
/// - [`TransportError::ConnectionClosed`] if the receive side stopped
pub(crate) async fn send_confirmed<F, Fut>(
    pending: &PendingAcks,
    config: &ReliabilityConfig,
    id: MessageId,
    mut transmit: F,
) -> Result<(), TransportError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<(), TransportError>>,
{
    let mut confirmed = pending.register(id).await;
    let attempts = config.attempts();

    for attempt in 1..=attempts {
        if let Err(e) = transmit().await {
            pending.forget(id).await;
            return Err(e);
        }
        match tokio::time::timeout(config.confirm_timeout, &mut confirmed).await
        {
            Ok(Ok(())) => {
                tracing::debug!(%id, attempt, "datagram confirmed");
                return Ok(());
            }
            Ok(Err(_)) => {
                return Err(TransportError::ConnectionClosed(
                    "datagram receiver stopped".into(),
                ));
            }
            Err(_) if attempt < attempts => {
                tracing::debug!(%id, attempt, "no confirmation, resending");
            }
            Err(_) => {}
        }
    }

    pending.forget(id).await;
    tracing::warn!(%id, attempts, "datagram never confirmed");
    Err(TransportError::Unconfirmed { id, attempts })
}
