//! # Driven Ports (Outbound SPI)
//!
//! Interfaces the engine requires from its host.

use crate::domain::{Identity, IdentityError, Timestamp, TransportError};
use crate::service::ScannerConfig;
use async_trait::async_trait;
use std::net::{IpAddr, SocketAddr};
use tokio::io::{AsyncRead, AsyncWrite};

/// Byte stream a connection runs over.
///
/// Blanket-implemented for anything readable and writable, so both
/// `tokio::net::TcpStream` and `tokio::io::DuplexStream` qualify.
pub trait PeerStream: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T> PeerStream for T where T: AsyncRead + AsyncWrite + Unpin + Send {}

/// Opens outbound streams.
///
/// # Example Implementation
///
/// ```rust,ignore
/// struct TcpDialer;
///
/// #[async_trait]
/// impl Dialer for TcpDialer {
///     async fn dial(&self, addr: SocketAddr) -> Result<Box<dyn PeerStream>, TransportError> {
///         let stream = tokio::net::TcpStream::connect(addr).await?;
///         Ok(Box::new(stream))
///     }
/// }
/// ```
///
/// Deadlines are applied by the caller; implementations may block.
#[async_trait]
pub trait Dialer: Send + Sync {
    /// Open a stream to `addr`.
    async fn dial(&self, addr: SocketAddr) -> Result<Box<dyn PeerStream>, TransportError>;
}

/// Supplies the long-term identity used in every handshake.
pub trait IdentityProvider: Send + Sync {
    /// Load or build the identity.
    fn provide_identity(&self) -> Result<Identity, IdentityError>;
}

/// Checks whether a host exposes an RPC endpoint.
#[async_trait]
pub trait RpcProbe: Send + Sync {
    /// `true` if any probed endpoint on `ip` answered successfully.
    async fn probe(&self, ip: IpAddr) -> bool;
}

/// Wall clock, injectable for deterministic tests.
pub trait TimeSource: Send + Sync {
    /// Current Unix time.
    fn now(&self) -> Timestamp;
}

/// Source of scanner configuration.
pub trait ConfigProvider: Send + Sync {
    /// Configuration as loaded; the scanner normalizes zero values itself.
    fn scanner_config(&self) -> ScannerConfig;
}
