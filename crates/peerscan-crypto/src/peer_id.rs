//! Peer id derivation: base58check(prefix || BLAKE2b-128(public key)).

use crate::PublicKey;
use blake2::digest::consts::U16;
use blake2::{Blake2b, Digest};
use sha2::Sha256;

/// Version prefix that makes encoded ids start with `id`.
pub const PEER_ID_PREFIX: [u8; 2] = [153, 103];

const CHECKSUM_SIZE: usize = 4;

type Blake2b128 = Blake2b<U16>;

/// Derive the printable peer id of a public key.
pub fn derive_peer_id(public_key: &PublicKey) -> String {
    let hash = Blake2b128::digest(public_key.as_bytes());

    let mut payload = Vec::with_capacity(PEER_ID_PREFIX.len() + hash.len() + CHECKSUM_SIZE);
    payload.extend_from_slice(&PEER_ID_PREFIX);
    payload.extend_from_slice(&hash);

    let checksum = Sha256::digest(Sha256::digest(&payload));
    payload.extend_from_slice(&checksum[..CHECKSUM_SIZE]);

    bs58::encode(payload).into_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_answers() {
        let cases = [
            (
                "9e83ee6e795be9551bb11d026034923ff3361fad0b3108b996797c5640588341",
                "idr9VuS3wKx7CQdhAGSR6Z2e9hjD4b",
            ),
            (
                "87ae33eef29911bbf1a2cee6386efe1879d5589c85cd2b156d5efed7b1290826",
                "idtm6jM1Fz1eFu9D2Sn34AruzAxVbW",
            ),
            (
                "7a8bc8486d5279c4bd16f720b1f5fc55b82e7507d7cc5bb4a368b31f11c4e334",
                "idsMpA9XmaY8hMx1pypAzv3eisWtud",
            ),
            (
                "4e33c71c0265e2dc91e028bdf950052315f354709d6a21df98bb3710ae629649",
                "idqthtAP6gEYCMJbFBvxKiND8HSzoJ",
            ),
        ];

        for (key, expected) in cases {
            let key = PublicKey::from_hex(key).unwrap();
            assert_eq!(derive_peer_id(&key), expected);
        }
    }

    #[test]
    fn test_distinct_keys_give_distinct_ids() {
        let a = derive_peer_id(&PublicKey::from_bytes([1u8; 32]));
        let b = derive_peer_id(&PublicKey::from_bytes([2u8; 32]));
        assert_ne!(a, b);
        assert!(a.starts_with("id"));
    }
}
