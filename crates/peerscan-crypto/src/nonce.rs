//! # Connection Nonces
//!
//! Each connection carries two 24-byte nonces, one per direction. Both are
//! derived from the two exchanged connection messages and then advanced
//! independently, once per frame, as big-endian counters.

use crate::keys::fixed_from_slice;
use crate::CryptoError;
use blake2::digest::consts::U32;
use blake2::{Blake2b, Digest};
use std::fmt;

/// Nonce length in bytes.
pub const NONCE_SIZE: usize = 24;

const INIT_TO_RESP: &[u8] = b"Init -> Resp";
const RESP_TO_INIT: &[u8] = b"Resp -> Init";

type Blake2b256 = Blake2b<U32>;

/// A 24-byte nonce, treated as a big-endian unsigned integer.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Nonce([u8; NONCE_SIZE]);

impl Nonce {
    /// Create from bytes.
    pub fn from_bytes(bytes: [u8; NONCE_SIZE]) -> Self {
        Self(bytes)
    }

    /// Create from a slice, checking the length.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, CryptoError> {
        fixed_from_slice(bytes)
            .map(Self)
            .map_err(|_| CryptoError::InvalidNonceLength {
                expected: NONCE_SIZE,
                actual: bytes.len(),
            })
    }

    /// Parse from a hex string.
    pub fn from_hex(s: &str) -> Result<Self, CryptoError> {
        let bytes = hex::decode(s.trim()).map_err(|e| CryptoError::InvalidHex(e.to_string()))?;
        Self::from_slice(&bytes)
    }

    /// Generate a random nonce from the thread-local CSPRNG.
    pub fn random() -> Self {
        let mut bytes = [0u8; NONCE_SIZE];
        rand::RngCore::fill_bytes(&mut rand::thread_rng(), &mut bytes);
        Self(bytes)
    }

    /// Get inner bytes.
    pub fn as_bytes(&self) -> &[u8; NONCE_SIZE] {
        &self.0
    }

    /// Return `self + 1`.
    ///
    /// Carries propagate towards the most significant byte. The all-ones
    /// value wraps to zero; a connection never gets anywhere near it.
    #[must_use]
    pub fn increment(&self) -> Self {
        let mut bytes = self.0;
        for byte in bytes.iter_mut().rev() {
            let (value, overflow) = byte.overflowing_add(1);
            *byte = value;
            if !overflow {
                break;
            }
        }
        Self(bytes)
    }
}

impl fmt::Debug for Nonce {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Nonce({})", hex::encode(self.0))
    }
}

impl fmt::Display for Nonce {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

/// The two directional nonces of one connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoncePair {
    /// Used for frames this side sends.
    pub local: Nonce,
    /// Used for frames this side receives.
    pub remote: Nonce,
}

/// Derive the nonce pair from the raw connection messages.
///
/// `sent` and `recv` are the exact bytes exchanged on the wire, length prefix
/// included. `incoming` is true on the side that accepted the connection.
/// The initiator's `local` equals the responder's `remote` and vice versa.
pub fn generate_nonces(sent: &[u8], recv: &[u8], incoming: bool) -> NoncePair {
    let (init, resp) = if incoming { (recv, sent) } else { (sent, recv) };

    let init_to_resp = directional_nonce(init, resp, INIT_TO_RESP);
    let resp_to_init = directional_nonce(init, resp, RESP_TO_INIT);

    if incoming {
        NoncePair {
            local: init_to_resp,
            remote: resp_to_init,
        }
    } else {
        NoncePair {
            local: resp_to_init,
            remote: init_to_resp,
        }
    }
}

fn directional_nonce(init: &[u8], resp: &[u8], label: &[u8]) -> Nonce {
    let digest = Blake2b256::new()
        .chain_update(init)
        .chain_update(resp)
        .chain_update(label)
        .finalize();

    let mut bytes = [0u8; NONCE_SIZE];
    bytes.copy_from_slice(&digest[..NONCE_SIZE]);
    Nonce(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const SENT: &str = "00874d1b98317bd6efad8352a7144c9eb0b218c9130e0a875973908ddc894b764ffc0d7f176cf800b978af9e919bdc35122585168475096d0ebcaca1f2a1172412b91b363ff484d1c64c03417e0e755e696c386a0000002d53414e44424f5845445f54455a4f535f414c5048414e45545f323031382d31312d33305431353a33303a35365a00000000";
    const RECV: &str = "00874d1ab3845960b32b039fef38ca5c9f8f867df1d522f27a83e07d9dfbe3b296a6c076412d98b369ab015d57247e5380d708b9edfcca0ca2c865346ef9c3d7ed00182cf4f613a6303c9b2a28cda8ff93687bd20000002d53414e44424f5845445f54455a4f535f414c5048414e45545f323031382d31312d33305431353a33303a35365a00000000";

    fn vectors() -> (Vec<u8>, Vec<u8>) {
        (hex::decode(SENT).unwrap(), hex::decode(RECV).unwrap())
    }

    #[test]
    fn test_generate_nonces_outgoing() {
        let (sent, recv) = vectors();
        let pair = generate_nonces(&sent, &recv, false);
        assert_eq!(pair.local.to_string(), "8dde158c55cff52f4be9352787d333e616a67853640d72c5");
        assert_eq!(pair.remote.to_string(), "e67481a23cf9b404626a12bd405066e161b32dc53f469153");
    }

    #[test]
    fn test_generate_nonces_incoming() {
        let (sent, recv) = vectors();
        let pair = generate_nonces(&sent, &recv, true);
        assert_eq!(pair.local.to_string(), "ff0451d94af9f75a46d74a2a9f685cff20222a15829f121d");
        assert_eq!(pair.remote.to_string(), "8a09a2c43a61aa6eccee084aa66da9bc94b441b17615be58");
    }

    #[test]
    fn test_both_ends_agree() {
        let (sent, recv) = vectors();
        let initiator = generate_nonces(&sent, &recv, false);
        let responder = generate_nonces(&recv, &sent, true);
        assert_eq!(initiator.local, responder.remote);
        assert_eq!(initiator.remote, responder.local);
        assert_ne!(initiator.local, initiator.remote);
    }

    #[test]
    fn test_increment() {
        let nonce = Nonce::from_hex("0000000000cff52f4be9352787d333e616a67853640d72c5").unwrap();
        assert_eq!(
            nonce.increment().to_string(),
            "0000000000cff52f4be9352787d333e616a67853640d72c6"
        );
    }

    #[test]
    fn test_increment_carries() {
        let mut bytes = [0u8; NONCE_SIZE];
        bytes[22] = 0x01;
        bytes[23] = 0xff;
        let next = Nonce::from_bytes(bytes).increment();
        assert_eq!(next.as_bytes()[22], 0x02);
        assert_eq!(next.as_bytes()[23], 0x00);
    }

    #[test]
    fn test_increment_wraps_at_boundary() {
        let max = Nonce::from_bytes([0xff; NONCE_SIZE]);
        assert_eq!(max.increment(), Nonce::default());
    }

    #[test]
    fn test_from_slice_rejects_wrong_length() {
        assert_eq!(
            Nonce::from_slice(&[0u8; 23]).unwrap_err(),
            CryptoError::InvalidNonceLength {
                expected: 24,
                actual: 23
            }
        );
    }

    proptest! {
        #[test]
        fn prop_increment_is_strictly_monotonic(bytes in proptest::array::uniform24(any::<u8>())) {
            prop_assume!(bytes != [0xff; NONCE_SIZE]);
            let nonce = Nonce::from_bytes(bytes);
            // Same-length big-endian byte arrays order like the integers they encode.
            prop_assert!(nonce.increment().as_bytes() > nonce.as_bytes());
        }
    }
}
