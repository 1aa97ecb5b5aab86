//! # Peerscan P2P - Native-Protocol Crawler Engine
//!
//! Discovers and fingerprints nodes of a Tezos-style peer-to-peer network by
//! speaking its wire protocol directly. Every reachable peer goes through the
//! full encrypted handshake; its advertised neighbors feed the frontier until
//! the crawl is exhausted or stopped.
//!
//! ## Architecture
//!
//! The crate follows Hexagonal Architecture with:
//! - **Domain Layer:** value types, error taxonomy and the binary codec
//! - **Ports Layer:** `CrawlerApi` (driving) plus `Dialer`, `TimeSource`,
//!   `IdentityProvider`, `ConfigProvider` and `RpcProbe` (driven)
//! - **Connection Layer:** the per-connection state machine over framed,
//!   encrypted streams
//! - **Service Layer:** candidates, frontier and the worker pool
//! - **Adapters Layer:** TCP, wall clock, identity file, TOML config and
//!   the HTTP RPC probe (feature-gated where they pull in extra crates)
//!
//! ## Example
//!
//! ```rust,ignore
//! use peerscan_p2p::{CrawlerApi, Scanner, ScannerConfig, SystemTimeSource, TcpDialer};
//! use std::sync::Arc;
//!
//! let config = ScannerConfig {
//!     bootstrap: vec!["boot.tzbeta.net".into()],
//!     ..ScannerConfig::default()
//! };
//! let scanner = Scanner::new(config, identity, Arc::new(TcpDialer::new()), Arc::new(SystemTimeSource::new()), None);
//! let mut results = scanner.listen().expect("first call");
//! scanner.scan().await?;
//! while let Some(peer) = results.recv().await {
//!     println!("{} synced={}", peer.address, peer.synced);
//! }
//! ```

// =============================================================================
// CORE MODULES
// =============================================================================

pub mod connection;
pub mod domain;
pub mod ports;
pub mod service;

// =============================================================================
// ADAPTERS
// =============================================================================

/// Concrete port implementations. TOML config requires `network`, the RPC
/// probe requires `rpc-probe`.
pub mod adapters;

/// Test doubles (FixedTimeSource, MockDialer, SimulatedPeer).
/// Requires feature: `test-utils`
#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

// =============================================================================
// RE-EXPORTS
// =============================================================================

pub use connection::{ConnectionState, PeerConnection, Timeouts, DEFAULT_MAX_MESSAGE_SIZE};

pub use domain::{
    canonical_addr, default_versions, Ack, BlockHeader, ChainId, CodecError, ConnectionMessage,
    ErrorKind, HandshakeError, Identity, IdentityError, Metadata, Peer, PeerError, PeerMessage,
    ProtocolError, ScanError, Timestamp, TransportError, Version,
};

pub use ports::{
    ConfigProvider, CrawlerApi, Dialer, IdentityProvider, PeerStream, RpcProbe, TimeSource,
};

pub use service::{Frontier, Ledger, Node, Scanner, ScannerConfig, DEFAULT_PORT};

pub use adapters::{
    FileIdentityProvider, StaticConfigProvider, StaticIdentityProvider, SystemTimeSource,
    TcpDialer,
};

#[cfg(feature = "network")]
pub use adapters::{ConfigError, TomlConfigProvider};

#[cfg(feature = "rpc-probe")]
pub use adapters::HttpRpcProbe;
