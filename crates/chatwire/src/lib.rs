//! # chatwire
//!
//! Client for the CHAT protocol, over TCP (text lines) or UDP (binary
//! datagrams with confirmation and retransmission).
//!
//! The crate ties the layers together:
//!
//! ```text
//! stdin -> Command -> Session (phase check) -> Codec -> Connection -> server
//! server -> Connection -> Codec -> Session (phase check) -> Console
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use chatwire::{ClientConfig, StdConsole, TransportKind};
//! use tokio::io::BufReader;
//!
//! # async fn demo() -> Result<(), chatwire::ClientError> {
//! let config = ClientConfig::new(TransportKind::Tcp, "localhost");
//! let input = BufReader::new(tokio::io::stdin());
//! let shutdown = async {
//!     let _ = tokio::signal::ctrl_c().await;
//! };
//! let console = Arc::new(StdConsole);
//! let ending = chatwire::run(&config, input, shutdown, console).await?;
//! println!("session ended: {ending:?}");
//! # Ok(())
//! # }
//! ```

mod cli;
mod client;
mod config;
mod console;
mod error;

pub use cli::Cli;
pub use client::{Client, Ending, VIOLATION_NOTICE, run};
pub use config::{ClientConfig, TransportKind};
pub use console::{BufferedConsole, Console, StdConsole};
pub use error::ClientError;
