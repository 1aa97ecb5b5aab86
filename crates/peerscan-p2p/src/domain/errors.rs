//! # Domain Errors
//!
//! Error taxonomy of the crawl engine.
//!
//! | Error | Scope | Retry |
//! |-------|-------|-------|
//! | `TransportError` | connect / read / write / deadline | candidate retried after backoff |
//! | `CryptoError` | bad nonce length, failed authentication | connection dropped, candidate retried |
//! | `HandshakeError` | connection message exchange | connection dropped, candidate retried |
//! | `ProtocolError` | framing, unexpected tags, call order | connection dropped, candidate retried |
//! | `Nack` | peer refused the connection | terminal |
//!
//! A candidate that runs out of attempts is still emitted, carrying a
//! [`PeerError`] built from its last failure with `exhausted` set.

use peerscan_crypto::CryptoError;
use serde::Serialize;
use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;

/// Binary codec failures. Every out-of-range read ends up here.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// Fewer bytes available than the field requires.
    #[error("truncated input: need {needed} bytes at offset {offset}, {available} available")]
    Truncated {
        /// Offset of the field being read.
        offset: usize,
        /// Bytes the field needs.
        needed: usize,
        /// Bytes left in the buffer.
        available: usize,
    },

    /// A length prefix disagrees with the buffer it frames.
    #[error("declared length {declared} does not match {actual} remaining bytes")]
    LengthMismatch {
        /// Length announced by the prefix.
        declared: usize,
        /// Bytes actually present.
        actual: usize,
    },

    /// A field decoded but holds an unusable value.
    #[error("invalid {field}: {reason}")]
    InvalidField {
        /// Field name.
        field: &'static str,
        /// What is wrong with it.
        reason: String,
    },

    /// Value too large for its length prefix.
    #[error("{field} of {size} bytes exceeds the {limit}-byte limit")]
    TooLarge {
        /// Field name.
        field: &'static str,
        /// Encoded size.
        size: usize,
        /// Maximum the prefix can express.
        limit: usize,
    },
}

/// Transport-level failures. Retryable per the backoff policy.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Dial failed.
    #[error("connect to {addr} failed: {reason}")]
    Connect {
        /// Target address.
        addr: SocketAddr,
        /// Underlying reason.
        reason: String,
    },

    /// An operation exceeded its deadline.
    #[error("{operation} timed out after {timeout:?}")]
    Timeout {
        /// Which operation.
        operation: &'static str,
        /// Deadline that elapsed.
        timeout: Duration,
    },

    /// Read or write failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The peer closed the stream.
    #[error("connection closed by peer")]
    Closed,

    /// The candidate is still backing off.
    #[error("{addr} is backing off for another {remaining:?}")]
    Backoff {
        /// Candidate address.
        addr: SocketAddr,
        /// Time left before the next attempt.
        remaining: Duration,
    },
}

/// Connection message exchange failures.
#[derive(Debug, Error)]
pub enum HandshakeError {
    /// Our connection message could not be sent.
    #[error("sending connection message: {0}")]
    Send(#[source] TransportError),

    /// The peer's connection message could not be read.
    #[error("receiving connection message: {0}")]
    Receive(#[source] TransportError),

    /// The peer's connection message did not decode.
    #[error("malformed connection message: {0}")]
    Malformed(#[source] CodecError),
}

/// Protocol violations on an established connection.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Operation called out of order.
    #[error("cannot {operation} while {state}")]
    InvalidState {
        /// Attempted operation.
        operation: &'static str,
        /// Current connection state.
        state: String,
    },

    /// A message failed to decode.
    #[error("malformed {message}: {source}")]
    Malformed {
        /// Message being decoded.
        message: &'static str,
        /// Decode failure.
        #[source]
        source: CodecError,
    },

    /// The peer answered with the wrong message.
    #[error("unexpected message: expected {expected}, got {actual}")]
    UnexpectedMessage {
        /// Message the protocol requires here.
        expected: &'static str,
        /// Message actually received.
        actual: String,
    },

    /// Reassembled message exceeds the configured limit.
    #[error("message of {size} bytes exceeds the {limit}-byte limit")]
    MessageTooLarge {
        /// Declared size.
        size: usize,
        /// Configured limit.
        limit: usize,
    },
}

/// Top-level error of a scan attempt.
#[derive(Debug, Error)]
pub enum ScanError {
    /// Transport failure.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Encryption or decryption failure.
    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),

    /// Connection message exchange failed.
    #[error("handshake failed: {0}")]
    Handshake(#[from] HandshakeError),

    /// Protocol violation.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// The peer answered the ack with a nack.
    #[error("{addr} - received nack")]
    Nack {
        /// Peer that refused.
        addr: SocketAddr,
    },

    /// No bootstrap entry resolved to an address.
    #[error("bootstrap list resolved to no addresses")]
    EmptyBootstrap,

    /// `scan()` was called twice.
    #[error("scanner already started")]
    AlreadyStarted,

    /// The scanner has been stopped.
    #[error("scanner stopped")]
    Stopped,
}

impl ScanError {
    /// Classify for the output record.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Transport(_) => ErrorKind::Transport,
            Self::Crypto(_) => ErrorKind::Crypto,
            Self::Handshake(_) => ErrorKind::Handshake,
            Self::Protocol(_) => ErrorKind::Protocol,
            Self::Nack { .. } => ErrorKind::Nack,
            Self::EmptyBootstrap | Self::AlreadyStarted | Self::Stopped => ErrorKind::Scanner,
        }
    }

    /// Whether the candidate may be attempted again.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::Nack { .. })
    }
}

/// Coarse error classification carried by emitted peers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Connect, read, write or deadline failure.
    Transport,
    /// Nonce or authentication failure.
    Crypto,
    /// Connection message exchange failure.
    Handshake,
    /// Protocol violation.
    Protocol,
    /// Peer refused the connection.
    Nack,
    /// Scanner-level condition.
    Scanner,
}

/// Serializable failure recorded on an emitted [`Peer`](crate::domain::Peer).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PeerError {
    /// Classification.
    pub kind: ErrorKind,
    /// Human-readable description.
    pub message: String,
    /// Failed attempts made on the peer.
    pub attempts: u32,
    /// The peer ran out of retries rather than failing terminally.
    pub exhausted: bool,
}

impl PeerError {
    /// Mark this as the outcome of `attempts` retryable failures in a row.
    pub fn exhausted_after(mut self, attempts: u32) -> Self {
        self.attempts = attempts;
        self.exhausted = true;
        self
    }
}

impl From<&ScanError> for PeerError {
    fn from(err: &ScanError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
            attempts: 0,
            exhausted: false,
        }
    }
}

/// Identity provisioning failures.
#[derive(Debug, Error)]
pub enum IdentityError {
    /// The identity source could not be read.
    #[error("failed to read {path}: {error}")]
    Io {
        /// Source path.
        path: String,
        /// Underlying error.
        error: String,
    },

    /// The identity source is not valid JSON.
    #[error("failed to parse identity: {0}")]
    Parse(String),

    /// Key material is malformed.
    #[error("invalid key material: {0}")]
    InvalidKey(#[from] CryptoError),

    /// The secret key does not derive the stored public key.
    #[error("secret key does not match public key {public_key}")]
    KeyMismatch {
        /// Public key found in the identity source.
        public_key: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr() -> SocketAddr {
        "10.0.0.1:9732".parse().unwrap()
    }

    #[test]
    fn test_only_nack_is_terminal() {
        assert!(!ScanError::Nack { addr: addr() }.is_retryable());
        assert!(ScanError::from(TransportError::Closed).is_retryable());
        assert!(ScanError::from(CryptoError::DecryptionFailed("tag".into())).is_retryable());
    }

    #[test]
    fn test_peer_error_from_scan_error() {
        let err = ScanError::Nack { addr: addr() };
        let record = PeerError::from(&err);
        assert_eq!(record.kind, ErrorKind::Nack);
        assert_eq!(record.message, "10.0.0.1:9732 - received nack");
        assert!(!record.exhausted);
    }

    #[test]
    fn test_exhausted_record() {
        let record = PeerError::from(&ScanError::from(TransportError::Closed)).exhausted_after(3);
        assert_eq!(record.kind, ErrorKind::Transport);
        assert_eq!(record.attempts, 3);
        assert!(record.exhausted);
    }

    #[test]
    fn test_error_kind_serializes_snake_case() {
        let json = serde_json::to_string(&ErrorKind::Transport).unwrap();
        assert_eq!(json, "\"transport\"");
    }

    #[test]
    fn test_timeout_display() {
        let err = TransportError::Timeout {
            operation: "connect",
            timeout: Duration::from_secs(8),
        };
        assert_eq!(err.to_string(), "connect timed out after 8s");
    }
}
