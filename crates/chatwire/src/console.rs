//! Where the client's output goes.
//!
//! Standard output carries chat from other users and the help screen.
//! Standard error carries replies, errors from the server, and local
//! diagnostics. Logging goes through `tracing` and never mixes in here.

use std::io::Write;
use std::sync::{Mutex, PoisonError};

use chatwire_protocol::{Message, Payload};

/// Sink for user-facing output.
pub trait Console: Send + Sync {
    /// Writes one line to standard output.
    fn stdout(&self, line: &str);

    /// Writes one line to standard error.
    fn stderr(&self, line: &str);

    /// Reports a problem detected by the client itself.
    fn local_error(&self, description: &str) {
        self.stderr(&format!("ERR: {description}"));
    }

    /// Shows a message received from the server, if it is one the user
    /// sees.
    fn incoming(&self, message: &Message) {
        match message.payload() {
            Payload::Chat {
                display_name,
                content,
            } => self.stdout(&format!("{display_name}: {content}")),
            Payload::Reply { success, content } => {
                let verdict = if *success { "Success" } else { "Failure" };
                self.stderr(&format!("{verdict}: {content}"));
            }
            Payload::Error {
                display_name,
                content,
            } => self.stderr(&format!("ERR FROM {display_name}: {content}")),
            _ => {}
        }
    }
}

/// The process's real standard streams.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdConsole;

impl Console for StdConsole {
    fn stdout(&self, line: &str) {
        let mut out = std::io::stdout().lock();
        let _ = writeln!(out, "{line}").and_then(|()| out.flush());
    }

    fn stderr(&self, line: &str) {
        let _ = writeln!(std::io::stderr().lock(), "{line}");
    }
}

/// Collects output in memory.
#[derive(Debug, Default)]
pub struct BufferedConsole {
    stdout: Mutex<Vec<String>>,
    stderr: Mutex<Vec<String>>,
}

impl BufferedConsole {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lines written to standard output so far.
    pub fn stdout_lines(&self) -> Vec<String> {
        self.stdout
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Lines written to standard error so far.
    pub fn stderr_lines(&self) -> Vec<String> {
        self.stderr
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Console for BufferedConsole {
    fn stdout(&self, line: &str) {
        self.stdout
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(line.to_owned());
    }

    fn stderr(&self, line: &str) {
        self.stderr
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(line.to_owned());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatwire_protocol::{Codec, TextCodec};

    fn incoming(line: &str) -> Message {
        TextCodec.decode(line.as_bytes()).unwrap()
    }

    #[test]
    fn test_chat_goes_to_stdout() {
        let console = BufferedConsole::new();
        console.incoming(&incoming("MSG FROM Bob IS hi there\r\n"));
        assert_eq!(console.stdout_lines(), ["Bob: hi there"]);
        assert!(console.stderr_lines().is_empty());
    }

    #[test]
    fn test_replies_and_errors_go_to_stderr() {
        let console = BufferedConsole::new();
        console.incoming(&incoming("REPLY OK IS Joined\r\n"));
        console.incoming(&incoming("REPLY NOK IS No such channel\r\n"));
        console.incoming(&incoming("ERR FROM Server IS boom\r\n"));
        assert_eq!(
            console.stderr_lines(),
            [
                "Success: Joined",
                "Failure: No such channel",
                "ERR FROM Server: boom"
            ]
        );
        assert!(console.stdout_lines().is_empty());
    }

    #[test]
    fn test_bye_prints_nothing() {
        let console = BufferedConsole::new();
        console.incoming(&incoming("BYE\r\n"));
        assert!(console.stdout_lines().is_empty());
        assert!(console.stderr_lines().is_empty());
    }

    #[test]
    fn test_local_error_prefix() {
        let console = BufferedConsole::new();
        console.local_error("something broke");
        assert_eq!(console.stderr_lines(), ["ERR: something broke"]);
    }
}
