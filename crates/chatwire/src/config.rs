//! Typed client configuration.

use std::fmt;
use std::net::SocketAddr;
use std::time::Duration;

use chatwire_transport::ReliabilityConfig;

use crate::ClientError;

/// Which transport (and therefore which encoding) to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum TransportKind {
    /// TCP with CRLF-terminated text lines.
    Tcp,
    /// UDP with binary datagrams, confirmations and retransmission.
    Udp,
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tcp => write!(f, "tcp"),
            Self::Udp => write!(f, "udp"),
        }
    }
}

/// Everything needed to reach the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub transport: TransportKind,
    /// IP address or host name of the server.
    pub host: String,
    pub port: u16,
    /// UDP only: how long to wait for a confirmation before resending.
    pub udp_timeout: Duration,
    /// UDP only: how many times an unconfirmed datagram is resent.
    pub udp_max_retransmissions: u8,
}

impl ClientConfig {
    pub const DEFAULT_PORT: u16 = 4567;

    /// A configuration with every optional setting at its default.
    pub fn new(transport: TransportKind, host: impl Into<String>) -> Self {
        Self {
            transport,
            host: host.into(),
            port: Self::DEFAULT_PORT,
            udp_timeout: ReliabilityConfig::DEFAULT_CONFIRM_TIMEOUT,
            udp_max_retransmissions:
                ReliabilityConfig::DEFAULT_MAX_RETRANSMISSIONS,
        }
    }

    /// The datagram reliability settings.
    pub fn reliability(&self) -> ReliabilityConfig {
        ReliabilityConfig {
            confirm_timeout: self.udp_timeout,
            max_retransmissions: self.udp_max_retransmissions,
        }
    }

    /// Resolves `host:port` to one socket address, preferring IPv4.
    ///
    /// # Errors
    /// [`ClientError::Resolve`] if the lookup fails and
    /// [`ClientError::NoAddress`] if it finds nothing.
    pub async fn resolve(&self) -> Result<SocketAddr, ClientError> {
        let addrs: Vec<SocketAddr> =
            tokio::net::lookup_host((self.host.as_str(), self.port))
                .await
                .map_err(|source| ClientError::Resolve {
                    host: self.host.clone(),
                    source,
                })?
                .collect();

        let addr = addrs
            .iter()
            .find(|a| a.is_ipv4())
            .or_else(|| addrs.first())
            .copied()
            .ok_or_else(|| ClientError::NoAddress(self.host.clone()))?;
        tracing::debug!(host = %self.host, %addr, "resolved server");
        Ok(addr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::new(TransportKind::Udp, "localhost");
        assert_eq!(config.port, 4567);
        assert_eq!(config.udp_timeout, Duration::from_millis(250));
        assert_eq!(config.udp_max_retransmissions, 3);
        assert_eq!(config.reliability(), ReliabilityConfig::default());
    }

    #[tokio::test]
    async fn test_resolve_ip_literal() {
        let mut config = ClientConfig::new(TransportKind::Tcp, "127.0.0.1");
        config.port = 9999;
        let addr = config.resolve().await.unwrap();
        assert_eq!(addr, SocketAddr::from(([127, 0, 0, 1], 9999)));
    }

    #[tokio::test]
    async fn test_resolve_localhost_prefers_ipv4() {
        let config = ClientConfig::new(TransportKind::Tcp, "localhost");
        let addr = config.resolve().await.unwrap();
        assert!(addr.is_ipv4() || addr.ip().is_loopback());
        assert_eq!(addr.port(), 4567);
    }
}
