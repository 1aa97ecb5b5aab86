//! # Ports Layer - Hexagonal Architecture Boundaries
//!
//! - **Driving Port (Inbound):** [`CrawlerApi`], what the runtime calls.
//! - **Driven Ports (Outbound):** everything the engine needs from its host:
//!   a way to open streams, an identity, a clock, configuration and an
//!   optional RPC probe.
//!
//! Every driven port has a production adapter in [`crate::adapters`] and a
//! scripted double in `testing`.

pub mod inbound;
pub mod outbound;

pub use inbound::CrawlerApi;
pub use outbound::{ConfigProvider, Dialer, IdentityProvider, PeerStream, RpcProbe, TimeSource};
