//! The client driver.
//!
//! One [`Client`] owns one connection and runs two activities against it
//! concurrently:
//!
//! - the **input loop** reads user lines, turns them into commands, holds
//!   requests back while a reply is outstanding, checks them against the
//!   session, then encodes and sends them;
//! - the **receive loop** decodes whatever the server sends, runs it
//!   through the session, prints it, and stops on `ERR`, `BYE`, or a
//!   protocol violation.
//!
//! Whichever finishes first (or the shutdown signal) decides the
//! [`Ending`]. The client then says goodbye as that ending requires and
//! closes the connection.

use std::future::Future;
use std::process::ExitCode;
use std::sync::Arc;

use chatwire_protocol::{
    BinaryCodec, Codec, Command, Content, DisplayName, HELP, InputError,
    Message, MessageKind, Payload, TextCodec,
};
use chatwire_session::{Phase, Session};
use chatwire_transport::{
    Connection, TcpConnection, TransportError, UdpConnection,
};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::{ClientConfig, ClientError, Console, TransportKind};

/// Content of the `ERR` the client sends after a protocol violation.
pub const VIOLATION_NOTICE: &str = "Unexpected message received from server";

/// Sender name used on that `ERR` before the user has chosen one.
const FALLBACK_NAME: &str = "chatwire";

/// How a session that did not fail locally came to an end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ending {
    /// User input reached end of file.
    InputClosed,
    /// The shutdown signal fired (Ctrl-C).
    Interrupted,
    /// The server said `BYE`.
    PeerBye,
    /// The server sent `ERR`.
    PeerError,
    /// The server sent something illegal or undecodable.
    ProtocolViolation,
}

impl Ending {
    /// `true` for endings that exit with status 0.
    pub fn is_graceful(self) -> bool {
        matches!(self, Self::InputClosed | Self::Interrupted | Self::PeerBye)
    }

    pub fn exit_code(self) -> ExitCode {
        if self.is_graceful() {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        }
    }
}

/// A chat session over one connection.
pub struct Client<C, K> {
    conn: C,
    codec: K,
    session: Session,
    console: Arc<dyn Console>,
}

impl<C, K> Client<C, K>
where
    C: Connection<Error = TransportError>,
    K: Codec,
{
    pub fn new(conn: C, codec: K, console: Arc<dyn Console>) -> Self {
        Self {
            conn,
            codec,
            session: Session::new(),
            console,
        }
    }

    /// The shared session state, e.g. for inspecting the phase.
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Runs the session until it ends.
    ///
    /// `input` supplies user lines; `shutdown` resolves when the user
    /// interrupts.
    ///
    /// # Errors
    /// Any transport failure, including an unconfirmed datagram or the
    /// server closing the stream without `BYE`.
    pub async fn run<R, S>(
        &self,
        input: R,
        shutdown: S,
    ) -> Result<Ending, ClientError>
    where
        R: AsyncBufRead + Unpin,
        S: Future<Output = ()>,
    {
        let conn_id = self.conn.id();
        tracing::debug!(%conn_id, "session started");

        // The receive loop is polled first so that when the server ends the
        // session, its ending wins over the input side noticing.
        let outcome = tokio::select! {
            biased;
            result = self.receive_loop() => result,
            result = self.input_loop(input) => result,
            () = shutdown => Ok(Ending::Interrupted),
        };

        let ending = match outcome {
            Ok(ending) => ending,
            Err(e) => {
                self.session.terminate();
                let _ = self.conn.close().await;
                return Err(e);
            }
        };

        let state = self.session.snapshot();
        tracing::info!(
            %conn_id,
            ?ending,
            phase = %state.phase,
            error_flag = state.error_flag,
            "session ending"
        );
        let farewell = self.farewell(ending).await;
        let closed = self.conn.close().await;
        farewell?;
        closed?;
        Ok(ending)
    }

    // -----------------------------------------------------------------------
    // Input side
    // -----------------------------------------------------------------------

    async fn input_loop<R>(&self, mut input: R) -> Result<Ending, ClientError>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut buf = Vec::new();
        loop {
            buf.clear();
            let read = input
                .read_until(b'\n', &mut buf)
                .await
                .map_err(ClientError::Input)?;
            if read == 0 {
                // Let an outstanding reply arrive before saying goodbye.
                self.session.wait_for_reply().await?;
                return Ok(Ending::InputClosed);
            }

            let Ok(text) = std::str::from_utf8(&buf) else {
                self.console.local_error(&InputError::NotText.to_string());
                continue;
            };
            let line = text.trim_end_matches(['\r', '\n']);
            if line.trim().is_empty() {
                continue;
            }
            self.handle_line(line).await?;
        }
    }

    async fn handle_line(&self, line: &str) -> Result<(), ClientError> {
        let command = match Command::parse(line, &self.session.display_name())
        {
            Ok(command) => command,
            Err(e) => {
                self.console.local_error(&e.to_string());
                return Ok(());
            }
        };
        tracing::trace!(
            kind = %command.kind(),
            direction = ?command.direction(),
            "input parsed"
        );

        match command {
            Command::Help => self.console.stdout(HELP),
            Command::Rename(name) => {
                tracing::debug!(%name, "display name changed");
                self.session.rename(name);
            }
            Command::Send(message) => {
                self.session.wait_for_reply().await?;
                if let Err(e) = self.session.authorize(&message) {
                    self.console.local_error(&e.to_string());
                    return Ok(());
                }
                self.transmit(&message).await?;
            }
        }
        Ok(())
    }

    async fn transmit(&self, message: &Message) -> Result<(), ClientError> {
        let data = self.codec.encode(message)?;
        self.conn.send(&data).await?;
        tracing::debug!(
            kind = %message.kind(),
            id = ?message.id(),
            "message sent"
        );
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Receive side
    // -----------------------------------------------------------------------

    async fn receive_loop(&self) -> Result<Ending, ClientError> {
        loop {
            let Some(data) = self.conn.recv().await? else {
                return Err(TransportError::ConnectionClosed(
                    "server closed the connection without BYE".into(),
                )
                .into());
            };
            if let Some(ending) = self.handle_incoming(&data) {
                return Ok(ending);
            }
        }
    }

    /// Processes one message from the server. Returns the ending if it
    /// ends the session.
    fn handle_incoming(&self, data: &[u8]) -> Option<Ending> {
        let message = match self.codec.decode(data) {
            Ok(message) => message,
            Err(e) => {
                tracing::warn!(error = %e, "undecodable message from server");
                self.session.reject_incoming();
                return Some(Ending::ProtocolViolation);
            }
        };

        // Confirmations belong to the transport.
        if message.kind() == MessageKind::Ack {
            return None;
        }

        let phase = self.session.phase();
        if !self.session.evaluate(&message) {
            tracing::warn!(
                kind = %message.kind(),
                %phase,
                "message not allowed in this phase"
            );
            return Some(Ending::ProtocolViolation);
        }

        self.console.incoming(&message);
        match message.payload() {
            Payload::Error { .. } => Some(Ending::PeerError),
            Payload::Bye => Some(Ending::PeerBye),
            _ => None,
        }
    }

    // -----------------------------------------------------------------------
    // Farewell
    // -----------------------------------------------------------------------

    async fn farewell(&self, ending: Ending) -> Result<(), ClientError> {
        match ending {
            Ending::InputClosed => {
                if self.session.terminate() != Phase::Ended {
                    self.transmit(&Message::bye()).await?;
                }
            }
            Ending::Interrupted => {
                if self.session.terminate() != Phase::Ended {
                    if let Err(e) = self.transmit(&Message::bye()).await {
                        tracing::warn!(
                            error = %e,
                            "farewell after interrupt failed"
                        );
                    }
                }
            }
            Ending::PeerBye => {}
            Ending::PeerError => {
                self.transmit(&Message::bye()).await?;
            }
            Ending::ProtocolViolation => {
                self.console.local_error(VIOLATION_NOTICE);
                let mut display_name = self.session.display_name();
                if display_name.is_empty() {
                    display_name = DisplayName::parse(FALLBACK_NAME)?;
                }
                let notice = Message::outgoing(Payload::Error {
                    display_name,
                    content: Content::parse(VIOLATION_NOTICE)?,
                });
                // Erroring advances to Ended on this evaluation.
                self.session.evaluate(&notice);
                self.transmit(&notice).await?;
                self.transmit(&Message::bye()).await?;
            }
        }
        Ok(())
    }
}

/// Connects to the configured server and runs a session on it.
///
/// TCP pairs with the text encoding and UDP with the binary one.
pub async fn run<R, S>(
    config: &ClientConfig,
    input: R,
    shutdown: S,
    console: Arc<dyn Console>,
) -> Result<Ending, ClientError>
where
    R: AsyncBufRead + Unpin,
    S: Future<Output = ()>,
{
    let addr = config.resolve().await?;
    tracing::info!(transport = %config.transport, %addr, "connecting");

    match config.transport {
        TransportKind::Tcp => {
            let conn = TcpConnection::connect(addr).await?;
            Client::new(conn, TextCodec, console).run(input, shutdown).await
        }
        TransportKind::Udp => {
            let conn =
                UdpConnection::connect(addr, config.reliability()).await?;
            Client::new(conn, BinaryCodec, console)
                .run(input, shutdown)
                .await
        }
    }
}
