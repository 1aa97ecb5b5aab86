//! Long-term identity consumed by the handshake.

use crate::domain::errors::IdentityError;
use peerscan_crypto::{derive_peer_id, ProofOfWorkStamp, PublicKey, SecretKey};

/// Key pair, peer id and proof-of-work stamp. Immutable for the process
/// lifetime; shared read-only by every worker.
#[derive(Debug, Clone)]
pub struct Identity {
    /// Base58check peer id derived from `public_key`.
    pub peer_id: String,
    /// X25519 public key.
    pub public_key: PublicKey,
    /// X25519 secret key.
    pub secret_key: SecretKey,
    /// Anti-spam stamp sent in every connection message.
    pub proof_of_work_stamp: ProofOfWorkStamp,
}

impl Identity {
    /// Build an identity from a secret key, deriving the public key and id.
    pub fn from_secret_key(secret_key: SecretKey, proof_of_work_stamp: ProofOfWorkStamp) -> Self {
        let public_key = secret_key.public_key();
        Self {
            peer_id: derive_peer_id(&public_key),
            public_key,
            secret_key,
            proof_of_work_stamp,
        }
    }

    /// Build an identity from stored parts, checking that they belong together.
    ///
    /// The peer id is always re-derived from the public key.
    pub fn from_parts(
        public_key: PublicKey,
        secret_key: SecretKey,
        proof_of_work_stamp: ProofOfWorkStamp,
    ) -> Result<Self, IdentityError> {
        if secret_key.public_key() != public_key {
            return Err(IdentityError::KeyMismatch {
                public_key: public_key.to_hex(),
            });
        }
        Ok(Self::from_secret_key(secret_key, proof_of_work_stamp))
    }
}
