//! # Identity Key Material
//!
//! Fixed-length newtypes for the long-term key pair and the proof-of-work
//! stamp carried in every connection message.

use crate::CryptoError;
use std::fmt;
use zeroize::Zeroize;

/// Public key length in bytes.
pub const PUBLIC_KEY_SIZE: usize = 32;

/// Secret key length in bytes.
pub const SECRET_KEY_SIZE: usize = 32;

/// Proof-of-work stamp length in bytes.
pub const PROOF_OF_WORK_SIZE: usize = 24;

/// X25519 public key (256-bit).
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PublicKey([u8; PUBLIC_KEY_SIZE]);

impl PublicKey {
    /// Create from bytes.
    pub fn from_bytes(bytes: [u8; PUBLIC_KEY_SIZE]) -> Self {
        Self(bytes)
    }

    /// Create from a slice, checking the length.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, CryptoError> {
        fixed_from_slice(bytes).map(Self)
    }

    /// Parse from a hex string.
    pub fn from_hex(s: &str) -> Result<Self, CryptoError> {
        fixed_from_hex(s).map(Self)
    }

    /// Get inner bytes.
    pub fn as_bytes(&self) -> &[u8; PUBLIC_KEY_SIZE] {
        &self.0
    }

    /// Lowercase hex encoding.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", self.to_hex())
    }
}

/// X25519 secret key (256-bit). Zeroized on drop.
#[derive(Clone, Zeroize)]
#[zeroize(drop)]
pub struct SecretKey([u8; SECRET_KEY_SIZE]);

impl SecretKey {
    /// Create from bytes.
    pub fn from_bytes(bytes: [u8; SECRET_KEY_SIZE]) -> Self {
        Self(bytes)
    }

    /// Create from a slice, checking the length.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, CryptoError> {
        fixed_from_slice(bytes).map(Self)
    }

    /// Parse from a hex string.
    pub fn from_hex(s: &str) -> Result<Self, CryptoError> {
        let mut bytes = hex::decode(s.trim()).map_err(|e| CryptoError::InvalidHex(e.to_string()))?;
        let key = Self::from_slice(&bytes);
        bytes.zeroize();
        key
    }

    /// Generate a random key.
    pub fn generate() -> Self {
        let mut bytes = [0u8; SECRET_KEY_SIZE];
        rand::RngCore::fill_bytes(&mut rand::thread_rng(), &mut bytes);
        Self(bytes)
    }

    /// Get inner bytes.
    pub fn as_bytes(&self) -> &[u8; SECRET_KEY_SIZE] {
        &self.0
    }

    /// Derive the matching X25519 public key.
    pub fn public_key(&self) -> PublicKey {
        let secret = x25519_dalek::StaticSecret::from(self.0);
        PublicKey(x25519_dalek::PublicKey::from(&secret).to_bytes())
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretKey(..)")
    }
}

/// Anti-spam stamp sent in the handshake. Opaque to this crate.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ProofOfWorkStamp([u8; PROOF_OF_WORK_SIZE]);

impl ProofOfWorkStamp {
    /// Create from bytes.
    pub fn from_bytes(bytes: [u8; PROOF_OF_WORK_SIZE]) -> Self {
        Self(bytes)
    }

    /// Create from a slice, checking the length.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, CryptoError> {
        fixed_from_slice(bytes).map(Self)
    }

    /// Parse from a hex string.
    pub fn from_hex(s: &str) -> Result<Self, CryptoError> {
        fixed_from_hex(s).map(Self)
    }

    /// Get inner bytes.
    pub fn as_bytes(&self) -> &[u8; PROOF_OF_WORK_SIZE] {
        &self.0
    }
}

impl fmt::Debug for ProofOfWorkStamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ProofOfWorkStamp({})", hex::encode(self.0))
    }
}

pub(crate) fn fixed_from_slice<const N: usize>(bytes: &[u8]) -> Result<[u8; N], CryptoError> {
    <[u8; N]>::try_from(bytes).map_err(|_| CryptoError::InvalidKeyLength {
        expected: N,
        actual: bytes.len(),
    })
}

fn fixed_from_hex<const N: usize>(s: &str) -> Result<[u8; N], CryptoError> {
    let bytes = hex::decode(s.trim()).map_err(|e| CryptoError::InvalidHex(e.to_string()))?;
    fixed_from_slice(&bytes)
}
