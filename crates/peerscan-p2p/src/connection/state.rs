//! Connection phases.

use super::framing::SecureChannel;
use crate::ports::PeerStream;
use std::fmt;

/// Internal phase. Each variant owns exactly the resources valid in it, so a
/// channel cannot be used before the handshake derived its keys.
pub(crate) enum Phase {
    Disconnected,
    Connected(Box<dyn PeerStream>),
    /// Our connection message is on the wire; `sent` keeps its exact bytes
    /// for nonce derivation.
    HandshakeSent {
        stream: Box<dyn PeerStream>,
        sent: Vec<u8>,
    },
    HandshakeReceived(SecureChannel),
    MetaExchanged(SecureChannel),
    Established(SecureChannel),
    Failed(String),
}

impl Phase {
    pub(crate) fn state(&self) -> ConnectionState {
        match self {
            Self::Disconnected => ConnectionState::Disconnected,
            Self::Connected(_) => ConnectionState::Connected,
            Self::HandshakeSent { .. } => ConnectionState::HandshakeSent,
            Self::HandshakeReceived(_) => ConnectionState::HandshakeReceived,
            Self::MetaExchanged(_) => ConnectionState::MetaExchanged,
            Self::Established(_) => ConnectionState::Established,
            Self::Failed(reason) => ConnectionState::Failed(reason.clone()),
        }
    }
}

/// Observable state of a [`PeerConnection`](super::PeerConnection).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    /// No transport yet.
    Disconnected,
    /// Transport open, nothing exchanged.
    Connected,
    /// Our connection message was sent.
    HandshakeSent,
    /// Both connection messages exchanged, session keys derived.
    HandshakeReceived,
    /// Metadata exchanged.
    MetaExchanged,
    /// Acks exchanged; payload messages may flow.
    Established,
    /// Terminal failure.
    Failed(String),
}

impl ConnectionState {
    /// Terminal failure state.
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected => f.write_str("disconnected"),
            Self::Connected => f.write_str("connected"),
            Self::HandshakeSent => f.write_str("handshake sent"),
            Self::HandshakeReceived => f.write_str("handshake received"),
            Self::MetaExchanged => f.write_str("metadata exchanged"),
            Self::Established => f.write_str("established"),
            Self::Failed(reason) => write!(f, "failed ({reason})"),
        }
    }
}
