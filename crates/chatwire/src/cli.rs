//! Command-line arguments.

use std::time::Duration;

use chatwire_transport::ReliabilityConfig;
use clap::Parser;

use crate::{ClientConfig, TransportKind};

/// Chat client for the CHAT protocol over TCP or UDP.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Transport protocol used for the connection.
    #[arg(short = 't', value_enum)]
    pub transport: TransportKind,

    /// Server IP address or host name.
    #[arg(short = 's')]
    pub server: String,

    /// Server port.
    #[arg(short = 'p', default_value_t = ClientConfig::DEFAULT_PORT)]
    pub port: u16,

    /// UDP confirmation timeout in milliseconds.
    #[arg(
        short = 'd',
        default_value_t = ReliabilityConfig::DEFAULT_CONFIRM_TIMEOUT_MS
    )]
    pub timeout_ms: u64,

    /// Maximum number of UDP retransmissions.
    #[arg(
        short = 'r',
        default_value_t = ReliabilityConfig::DEFAULT_MAX_RETRANSMISSIONS
    )]
    pub retransmissions: u8,
}

impl Cli {
    pub fn into_config(self) -> ClientConfig {
        ClientConfig {
            transport: self.transport,
            host: self.server,
            port: self.port,
            udp_timeout: Duration::from_millis(self.timeout_ms),
            udp_max_retransmissions: self.retransmissions,
        }
    }
}
