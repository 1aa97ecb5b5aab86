//! # Domain Layer
//!
//! Value types shared by every layer, the error taxonomy and the binary
//! codec for the wire protocol. Nothing in here performs I/O.

pub mod codec;
pub mod errors;
pub mod identity;
pub mod peer;
pub mod version;

pub use codec::{Ack, BlockHeader, ChainId, ConnectionMessage, Metadata, PeerMessage};
pub use errors::{
    CodecError, ErrorKind, HandshakeError, IdentityError, PeerError, ProtocolError, ScanError,
    TransportError,
};
pub use identity::Identity;
pub use peer::{canonical_addr, Peer, Timestamp};
pub use version::{default_versions, Version};
