//! # Adapters
//!
//! Concrete implementations of the driven ports.
//!
//! - `TcpDialer` - outbound TCP via tokio
//! - `SystemTimeSource` - wall clock
//! - `FileIdentityProvider` / `StaticIdentityProvider` - identity loading
//! - `StaticConfigProvider` - in-memory configuration
//! - `TomlConfigProvider` - config file loading (requires "network" feature)
//! - `HttpRpcProbe` - RPC reachability check (requires "rpc-probe" feature)

/// Configuration providers
pub mod config;
/// Identity providers
pub mod identity;
/// RPC reachability probe
#[cfg(feature = "rpc-probe")]
pub mod rpc;
/// Outbound transport
pub mod tcp;
/// Time source adapters
pub mod time;

pub use config::StaticConfigProvider;
pub use identity::{FileIdentityProvider, StaticIdentityProvider};
pub use tcp::TcpDialer;
pub use time::SystemTimeSource;

#[cfg(feature = "network")]
pub use config::{ConfigError, TomlConfigProvider};

#[cfg(feature = "rpc-probe")]
pub use rpc::HttpRpcProbe;
