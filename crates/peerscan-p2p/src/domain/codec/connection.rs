//! Cleartext connection message exchanged first on every connection.
//!
//! ```text
//! len(2) | port(2) | public_key(32) | proof_of_work(24) | nonce(24) | versions
//! version := name_len(4) | name | major(2) | minor(2)
//! ```

use super::{put_length_prefixed, Reader, FRAME_LENGTH_SIZE};
use crate::domain::errors::CodecError;
use crate::domain::version::Version;
use peerscan_crypto::keys::{PROOF_OF_WORK_SIZE, PUBLIC_KEY_SIZE};
use peerscan_crypto::{Nonce, ProofOfWorkStamp, PublicKey, NONCE_SIZE};

const FIXED_FIELDS_SIZE: usize = 2 + PUBLIC_KEY_SIZE + PROOF_OF_WORK_SIZE + NONCE_SIZE;

/// Smallest well-formed connection message, length prefix included.
pub const CONNECTION_MESSAGE_MIN_SIZE: usize = FRAME_LENGTH_SIZE + FIXED_FIELDS_SIZE;

/// Handshake payload announcing our key, stamp, nonce and versions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionMessage {
    /// Port the sender listens on.
    pub port: u16,
    /// Sender's public key.
    pub public_key: PublicKey,
    /// Sender's proof-of-work stamp.
    pub proof_of_work_stamp: ProofOfWorkStamp,
    /// Fresh random nonce, one per message.
    pub nonce: Nonce,
    /// Supported versions, in preference order.
    pub versions: Vec<Version>,
}

impl ConnectionMessage {
    /// Build a message with a fresh random nonce.
    pub fn new(
        port: u16,
        versions: Vec<Version>,
        public_key: PublicKey,
        proof_of_work_stamp: ProofOfWorkStamp,
    ) -> Self {
        Self {
            port,
            public_key,
            proof_of_work_stamp,
            nonce: Nonce::random(),
            versions,
        }
    }

    /// Encode with the 2-byte length prefix.
    pub fn encode(&self) -> Result<Vec<u8>, CodecError> {
        let mut body = Vec::with_capacity(FIXED_FIELDS_SIZE + 64);
        body.extend_from_slice(&self.port.to_be_bytes());
        body.extend_from_slice(self.public_key.as_bytes());
        body.extend_from_slice(self.proof_of_work_stamp.as_bytes());
        body.extend_from_slice(self.nonce.as_bytes());
        for version in &self.versions {
            put_length_prefixed(&mut body, "version name", version.name.as_bytes())?;
            body.extend_from_slice(&version.major.to_be_bytes());
            body.extend_from_slice(&version.minor.to_be_bytes());
        }

        let len = u16::try_from(body.len()).map_err(|_| CodecError::TooLarge {
            field: "connection message",
            size: body.len(),
            limit: u16::MAX as usize,
        })?;

        let mut out = Vec::with_capacity(FRAME_LENGTH_SIZE + body.len());
        out.extend_from_slice(&len.to_be_bytes());
        out.extend_from_slice(&body);
        Ok(out)
    }

    /// Decode a complete message, length prefix included.
    pub fn decode(bytes: &[u8]) -> Result<Self, CodecError> {
        if bytes.len() < CONNECTION_MESSAGE_MIN_SIZE {
            return Err(CodecError::Truncated {
                offset: 0,
                needed: CONNECTION_MESSAGE_MIN_SIZE,
                available: bytes.len(),
            });
        }

        let mut reader = Reader::new(bytes);
        let declared = reader.u16()? as usize;
        if declared != reader.remaining() {
            return Err(CodecError::LengthMismatch {
                declared,
                actual: reader.remaining(),
            });
        }

        let port = reader.u16()?;
        let public_key = PublicKey::from_bytes(reader.array()?);
        let proof_of_work_stamp = ProofOfWorkStamp::from_bytes(reader.array()?);
        let nonce = Nonce::from_bytes(reader.array()?);
        let versions = decode_versions(&mut reader)?;

        Ok(Self {
            port,
            public_key,
            proof_of_work_stamp,
            nonce,
            versions,
        })
    }
}

/// Consume version records until the buffer ends. A zero-length name stops
/// decoding; whatever follows it is ignored.
fn decode_versions(reader: &mut Reader<'_>) -> Result<Vec<Version>, CodecError> {
    let mut versions = Vec::new();
    while !reader.is_empty() {
        let name = reader.length_prefixed()?;
        if name.is_empty() {
            break;
        }
        let name = std::str::from_utf8(name).map_err(|e| CodecError::InvalidField {
            field: "version name",
            reason: e.to_string(),
        })?;
        let major = reader.u16()?;
        let minor = reader.u16()?;
        versions.push(Version::new(name, major, minor));
    }
    Ok(versions)
}
