//! # Shared Key and Authenticated Encryption
//!
//! NaCl `crypto_box` split into its two halves:
//!
//! - [`PrecomputedKey::precompute`] runs X25519 followed by HSalsa20 once per
//!   connection (`crypto_box_beforenm`).
//! - [`encrypt`] / [`decrypt`] run XSalsa20-Poly1305 with that key for every
//!   frame (`crypto_box_afternm`), producing `tag(16) || ciphertext`.

use crate::keys::fixed_from_slice;
use crate::nonce::NONCE_SIZE;
use crate::{CryptoError, PublicKey, SecretKey};
use crypto_secretbox::aead::generic_array::GenericArray;
use crypto_secretbox::aead::{AeadInPlace, KeyInit};
use crypto_secretbox::XSalsa20Poly1305;
use salsa20::cipher::consts::{U10, U16};
use std::fmt;
use zeroize::Zeroize;

/// Poly1305 tag length prepended to every ciphertext.
pub const TAG_SIZE: usize = 16;

/// Symmetric key shared by both ends of one connection. Zeroized on drop.
#[derive(Clone, Zeroize)]
#[zeroize(drop)]
pub struct PrecomputedKey([u8; 32]);

impl PrecomputedKey {
    /// Derive the shared key from the peer's public key and our secret key.
    pub fn precompute(peer_public_key: &PublicKey, own_secret_key: &SecretKey) -> Self {
        let secret = x25519_dalek::StaticSecret::from(*own_secret_key.as_bytes());
        let shared = secret.diffie_hellman(&x25519_dalek::PublicKey::from(*peer_public_key.as_bytes()));

        let input = GenericArray::<u8, U16>::default();
        let key = salsa20::hsalsa::<U10>(GenericArray::from_slice(shared.as_bytes()), &input);

        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&key);
        Self(bytes)
    }

    /// Create from raw key bytes.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Create from a slice, checking the length.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, CryptoError> {
        fixed_from_slice(bytes).map(Self)
    }

    /// Get inner bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    fn cipher(&self) -> XSalsa20Poly1305 {
        XSalsa20Poly1305::new(GenericArray::from_slice(&self.0))
    }
}

impl fmt::Debug for PrecomputedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PrecomputedKey(..)")
    }
}

/// Encrypt and authenticate `message`.
///
/// # Errors
///
/// Returns `CryptoError::InvalidNonceLength` unless `nonce` is 24 bytes.
pub fn encrypt(message: &[u8], nonce: &[u8], key: &PrecomputedKey) -> Result<Vec<u8>, CryptoError> {
    check_nonce(nonce)?;

    let mut out = vec![0u8; TAG_SIZE + message.len()];
    out[TAG_SIZE..].copy_from_slice(message);

    let tag = key
        .cipher()
        .encrypt_in_place_detached(GenericArray::from_slice(nonce), b"", &mut out[TAG_SIZE..])
        .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;
    out[..TAG_SIZE].copy_from_slice(&tag);

    Ok(out)
}

/// Verify and decrypt `ciphertext` produced by [`encrypt`].
///
/// # Errors
///
/// Returns `CryptoError::InvalidNonceLength` unless `nonce` is 24 bytes, and
/// `CryptoError::DecryptionFailed` when the input is shorter than a tag or
/// fails authentication.
pub fn decrypt(ciphertext: &[u8], nonce: &[u8], key: &PrecomputedKey) -> Result<Vec<u8>, CryptoError> {
    check_nonce(nonce)?;

    if ciphertext.len() < TAG_SIZE {
        return Err(CryptoError::DecryptionFailed(format!(
            "ciphertext of {} bytes is shorter than the {TAG_SIZE}-byte tag",
            ciphertext.len()
        )));
    }

    let (tag, body) = ciphertext.split_at(TAG_SIZE);
    let mut plaintext = body.to_vec();
    key.cipher()
        .decrypt_in_place_detached(
            GenericArray::from_slice(nonce),
            b"",
            &mut plaintext,
            GenericArray::from_slice(tag),
        )
        .map_err(|_| CryptoError::DecryptionFailed("authentication failed".into()))?;

    Ok(plaintext)
}

fn check_nonce(nonce: &[u8]) -> Result<(), CryptoError> {
    if nonce.len() != NONCE_SIZE {
        return Err(CryptoError::InvalidNonceLength {
            expected: NONCE_SIZE,
            actual: nonce.len(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Nonce;
    use proptest::prelude::*;

    const PEER_PK: &str = "96678b88756dd6cfd6c129980247b70a6e44da77823c3672a2ec0eae870d8646";
    const OWN_SK: &str = "a18dc11cb480ebd31081e1541df8bd70c57da0fa419b5036242f8619d605e75a";
    const SHARED: &str = "5228751a6f5a6494e38e1042f578e3a64ae3462b7899356f49e50be846c9609c";
    const NONCE: &str = "8dde158c55cff52f4be9352787d333e616a67853640d72c5";
    const PLAINTEXT: &str = "00874d1b98317bd6efad8352a7144c9eb0b218c9130e0a875973908ddc894b764ffc0d7f176cf800b978af9e919bdc35122585168475096d0ebcaca1f2a1172412b91b363ff484d1c64c03417e0e755e696c386a0000002d53414e44424f5845445f54455a4f535f414c5048414e45545f323031382d31312d33305431353a33303a35365a00000000";
    const CIPHERTEXT: &str = "45d82d5c4067f5c32748596c1bbc93a9f87b5b1f2058ddd82b6f081ca484b672395c7473ab897c64c01c33878ac1ccb6919a75c9938d8bcf0e7917ddac13a787cfb5c9a5aea50d24502cf86b5c9b000358c039334ec077afe98936feec0dabfff35f14cafd2cd3173bbd56a7c6e5bf6f5f57c92b59b129918a5895e883e7d999b191aad078c4a5b164144c1beaed58b49ba9be094abf3a3bd9";

    fn shared_key() -> PrecomputedKey {
        PrecomputedKey::from_slice(&hex::decode(SHARED).unwrap()).unwrap()
    }

    #[test]
    fn test_precompute_known_answer() {
        let key = PrecomputedKey::precompute(
            &PublicKey::from_hex(PEER_PK).unwrap(),
            &SecretKey::from_hex(OWN_SK).unwrap(),
        );
        assert_eq!(hex::encode(key.as_bytes()), SHARED);
    }

    #[test]
    fn test_precompute_is_symmetric() {
        let alice = SecretKey::from_bytes([0x11; 32]);
        let bob = SecretKey::from_bytes([0x22; 32]);
        let ab = PrecomputedKey::precompute(&bob.public_key(), &alice);
        let ba = PrecomputedKey::precompute(&alice.public_key(), &bob);
        assert_eq!(ab.as_bytes(), ba.as_bytes());
    }

    #[test]
    fn test_encrypt_known_answer() {
        let nonce = hex::decode(NONCE).unwrap();
        let encrypted = encrypt(&hex::decode(PLAINTEXT).unwrap(), &nonce, &shared_key()).unwrap();
        assert_eq!(hex::encode(&encrypted), CIPHERTEXT);
    }

    #[test]
    fn test_decrypt_known_answer() {
        let nonce = hex::decode(NONCE).unwrap();
        let plaintext = decrypt(&hex::decode(CIPHERTEXT).unwrap(), &nonce, &shared_key()).unwrap();
        assert_eq!(hex::encode(plaintext), PLAINTEXT);
    }

    #[test]
    fn test_wrong_key_fails() {
        let nonce = hex::decode(NONCE).unwrap();
        let zero_key = PrecomputedKey::from_bytes([0u8; 32]);
        let result = decrypt(&hex::decode(CIPHERTEXT).unwrap(), &nonce, &zero_key);
        assert!(matches!(result, Err(CryptoError::DecryptionFailed(_))));
    }

    #[test]
    fn test_tampered_ciphertext_fails() {
        let nonce = Nonce::random();
        let mut encrypted = encrypt(b"metadata", nonce.as_bytes(), &shared_key()).unwrap();
        encrypted[TAG_SIZE] ^= 0x01;
        assert!(decrypt(&encrypted, nonce.as_bytes(), &shared_key()).is_err());
    }

    #[test]
    fn test_wrong_nonce_length_fails() {
        let expected = CryptoError::InvalidNonceLength {
            expected: 24,
            actual: 12,
        };
        assert_eq!(encrypt(b"x", &[0u8; 12], &shared_key()).unwrap_err(), expected);
        assert_eq!(
            decrypt(&[0u8; 32], &[0u8; 12], &shared_key()).unwrap_err(),
            expected
        );
    }

    #[test]
    fn test_short_ciphertext_fails() {
        let nonce = Nonce::random();
        assert!(matches!(
            decrypt(&[0u8; TAG_SIZE - 1], nonce.as_bytes(), &shared_key()),
            Err(CryptoError::DecryptionFailed(_))
        ));
    }

    #[test]
    fn test_empty_message_is_just_a_tag() {
        let nonce = Nonce::random();
        let encrypted = encrypt(&[], nonce.as_bytes(), &shared_key()).unwrap();
        assert_eq!(encrypted.len(), TAG_SIZE);
        assert!(decrypt(&encrypted, nonce.as_bytes(), &shared_key()).unwrap().is_empty());
    }

    proptest! {
        #[test]
        fn prop_decrypt_inverts_encrypt(
            message in proptest::collection::vec(any::<u8>(), 0..512),
            nonce in proptest::array::uniform24(any::<u8>()),
        ) {
            let key = shared_key();
            let encrypted = encrypt(&message, &nonce, &key).unwrap();
            prop_assert_eq!(decrypt(&encrypted, &nonce, &key).unwrap(), message);
        }
    }
}
