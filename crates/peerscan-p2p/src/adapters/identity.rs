//! Identity providers.
//!
//! The identity file is the JSON document a node writes on first start:
//!
//! ```json
//! {
//!   "peer_id": "idt...",
//!   "public_key": "<64 hex>",
//!   "secret_key": "<64 hex>",
//!   "proof_of_work_stamp": "<48 hex>"
//! }
//! ```

use crate::domain::{Identity, IdentityError};
use crate::ports::IdentityProvider;
use peerscan_crypto::{ProofOfWorkStamp, PublicKey, SecretKey};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

#[derive(Debug, Deserialize)]
struct IdentityFile {
    #[serde(default)]
    peer_id: Option<String>,
    public_key: String,
    secret_key: String,
    proof_of_work_stamp: String,
}

/// Loads the identity from a JSON file on every call.
#[derive(Debug, Clone)]
pub struct FileIdentityProvider {
    path: PathBuf,
}

impl FileIdentityProvider {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Parse an identity document.
    ///
    /// The secret key must derive the public key. A stored peer id that
    /// differs from the derived one is reported and replaced.
    ///
    /// # Errors
    ///
    /// `Parse` for invalid JSON, `InvalidKey` for bad hex or lengths and
    /// `KeyMismatch` when the keys do not belong together.
    pub fn parse(content: &str) -> Result<Identity, IdentityError> {
        let file: IdentityFile =
            serde_json::from_str(content).map_err(|e| IdentityError::Parse(e.to_string()))?;

        let identity = Identity::from_parts(
            PublicKey::from_hex(&file.public_key)?,
            SecretKey::from_hex(&file.secret_key)?,
            ProofOfWorkStamp::from_hex(&file.proof_of_work_stamp)?,
        )?;

        if let Some(stored) = file.peer_id.filter(|id| *id != identity.peer_id) {
            warn!(
                stored = %stored,
                derived = %identity.peer_id,
                "identity file peer id does not match its public key, using the derived id"
            );
        }
        Ok(identity)
    }
}

impl IdentityProvider for FileIdentityProvider {
    fn provide_identity(&self) -> Result<Identity, IdentityError> {
        let content = fs::read_to_string(&self.path).map_err(|e| IdentityError::Io {
            path: self.path.display().to_string(),
            error: e.to_string(),
        })?;
        Self::parse(&content)
    }
}

/// Hands out a fixed identity.
#[derive(Debug, Clone)]
pub struct StaticIdentityProvider {
    identity: Identity,
}

impl StaticIdentityProvider {
    pub fn new(identity: Identity) -> Self {
        Self { identity }
    }
}

impl IdentityProvider for StaticIdentityProvider {
    fn provide_identity(&self) -> Result<Identity, IdentityError> {
        Ok(self.identity.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::test_identity;

    fn document(peer_id: &str, public_key: &str) -> String {
        serde_json::json!({
            "peer_id": peer_id,
            "public_key": public_key,
            "secret_key": "07".repeat(32),
            "proof_of_work_stamp": "07".repeat(24),
        })
        .to_string()
    }

    #[test]
    fn test_parse_valid_document() {
        let expected = test_identity(7);
        let content = document(&expected.peer_id, &expected.public_key.to_hex());

        let identity = FileIdentityProvider::parse(&content).unwrap();
        assert_eq!(identity.peer_id, expected.peer_id);
        assert_eq!(identity.public_key, expected.public_key);
    }

    #[test]
    fn test_stale_peer_id_is_replaced() {
        let expected = test_identity(7);
        let content = document("idsomethingelse", &expected.public_key.to_hex());

        let identity = FileIdentityProvider::parse(&content).unwrap();
        assert_eq!(identity.peer_id, expected.peer_id);
    }

    #[test]
    fn test_mismatched_keys_are_rejected() {
        let other = test_identity(8);
        let content = document(&other.peer_id, &other.public_key.to_hex());

        assert!(matches!(
            FileIdentityProvider::parse(&content),
            Err(IdentityError::KeyMismatch { .. })
        ));
    }

    #[test]
    fn test_bad_hex_and_json_are_rejected() {
        assert!(matches!(
            FileIdentityProvider::parse(&document("id", "zz")),
            Err(IdentityError::InvalidKey(_))
        ));
        assert!(matches!(
            FileIdentityProvider::parse("{ not json"),
            Err(IdentityError::Parse(_))
        ));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let provider = FileIdentityProvider::new("/nonexistent/identity.json");
        assert!(matches!(
            provider.provide_identity(),
            Err(IdentityError::Io { .. })
        ));
    }

    #[test]
    fn test_static_provider() {
        let identity = test_identity(3);
        let provider = StaticIdentityProvider::new(identity.clone());
        assert_eq!(provider.provide_identity().unwrap().peer_id, identity.peer_id);
    }
}
