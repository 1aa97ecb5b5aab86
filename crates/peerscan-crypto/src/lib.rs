//! # Peerscan Crypto - Handshake Cryptography
//!
//! Primitives needed to talk to a Tezos-style node over its native
//! peer-to-peer protocol.
//!
//! ## Components
//!
//! | Module | Algorithm | Use Case |
//! |--------|-----------|----------|
//! | `keys` | X25519 keys, PoW stamp | Identity material |
//! | `nonce` | BLAKE2b-256 | Per-direction nonce derivation and increment |
//! | `peer_id` | BLAKE2b-128 + base58check | Stable peer identifiers |
//! | `precomputed` | X25519 + HSalsa20, XSalsa20-Poly1305 | Per-connection shared key, authenticated encryption |
//!
//! ## Wire Compatibility
//!
//! - The shared key is the NaCl `crypto_box_beforenm` construction.
//! - Ciphertexts use the NaCl secretbox layout: `tag(16) || ciphertext`.
//! - Nonces are 24-byte big-endian counters.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod errors;
pub mod keys;
pub mod nonce;
pub mod peer_id;
pub mod precomputed;

// Re-exports
pub use errors::CryptoError;
pub use keys::{ProofOfWorkStamp, PublicKey, SecretKey};
pub use nonce::{generate_nonces, Nonce, NoncePair, NONCE_SIZE};
pub use peer_id::derive_peer_id;
pub use precomputed::{decrypt, encrypt, PrecomputedKey, TAG_SIZE};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    #[test]
    fn test_version() {
        assert!(!super::VERSION.is_empty());
    }
}
