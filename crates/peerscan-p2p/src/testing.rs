//! # Test Utilities
//!
//! Deterministic doubles for the driven ports.
//!
//! - [`FixedTimeSource`]: a settable clock
//! - [`MockDialer`]: scripted dial outcomes per address
//! - [`SimulatedPeer`]: a responder node that speaks the real protocol over
//!   an in-memory duplex stream, driven by a [`PeerConnection`] with
//!   `incoming = true`

use crate::connection::{PeerConnection, Timeouts};
use crate::domain::{
    Ack, BlockHeader, ChainId, Identity, Metadata, PeerMessage, ProtocolError, ScanError,
    Timestamp, TransportError, Version,
};
use crate::ports::{Dialer, PeerStream, TimeSource};
use async_trait::async_trait;
use parking_lot::Mutex;
use peerscan_crypto::{ProofOfWorkStamp, SecretKey};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Unix time used by default in tests: 2023-11-14T22:13:20Z.
pub const TEST_NOW: i64 = 1_700_000_000;

const DUPLEX_BUFFER: usize = 256 * 1024;

/// Deterministic identity built from a one-byte seed.
pub fn test_identity(seed: u8) -> Identity {
    Identity::from_secret_key(
        SecretKey::from_bytes([seed; 32]),
        ProofOfWorkStamp::from_bytes([seed; 24]),
    )
}

// =============================================================================
// TIME
// =============================================================================

/// Clock frozen at a settable instant.
#[derive(Debug)]
pub struct FixedTimeSource {
    secs: AtomicI64,
}

impl FixedTimeSource {
    /// Frozen at `secs`.
    pub fn new(secs: i64) -> Self {
        Self {
            secs: AtomicI64::new(secs),
        }
    }

    /// Move the clock.
    pub fn set(&self, secs: i64) {
        self.secs.store(secs, Ordering::SeqCst);
    }
}

impl Default for FixedTimeSource {
    fn default() -> Self {
        Self::new(TEST_NOW)
    }
}

impl TimeSource for FixedTimeSource {
    fn now(&self) -> Timestamp {
        Timestamp::new(self.secs.load(Ordering::SeqCst))
    }
}

// =============================================================================
// SIMULATED PEER
// =============================================================================

/// Scripted responder node.
#[derive(Debug, Clone)]
pub struct SimulatedPeer {
    /// Responder identity.
    pub identity: Identity,
    /// Versions it announces.
    pub versions: Vec<Version>,
    /// Metadata it sends.
    pub metadata: Metadata,
    /// Its answer to our ack.
    pub ack: Ack,
    /// Chain it asks us about.
    pub chain_id: ChainId,
    /// Timestamp of the head it reports.
    pub head_timestamp: i64,
    /// Entries it advertises, once per bootstrap round.
    pub neighbors: Vec<String>,
    /// Hang up right after the connection message exchange.
    pub close_after_handshake: bool,
    offered: Arc<Mutex<Vec<Vec<Version>>>>,
}

impl SimulatedPeer {
    /// A synced, accepting peer with no neighbors.
    pub fn new(seed: u8) -> Self {
        Self {
            identity: test_identity(seed),
            versions: vec![Version::new("TEZOS_MAINNET", 0, 1)],
            metadata: Metadata::default(),
            ack: Ack::Ack,
            chain_id: ChainId::from_bytes([0x7a, 0x06, 0xa7, 0x70]),
            head_timestamp: TEST_NOW - 30,
            neighbors: Vec::new(),
            close_after_handshake: false,
            offered: Arc::default(),
        }
    }

    /// Advertise these entries.
    pub fn with_neighbors<I, S>(mut self, neighbors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.neighbors = neighbors.into_iter().map(Into::into).collect();
        self
    }

    /// Refuse the connection at the ack step.
    pub fn refusing(mut self) -> Self {
        self.ack = Ack::Nack;
        self
    }

    /// Hang up once connection messages are exchanged.
    pub fn closing_after_handshake(mut self) -> Self {
        self.close_after_handshake = true;
        self
    }

    /// Versions the dialer offered, one entry per completed handshake.
    /// Shared by every clone.
    pub fn offered_versions(&self) -> Vec<Vec<Version>> {
        self.offered.lock().clone()
    }

    /// Report a head with this timestamp.
    pub fn with_head_timestamp(mut self, timestamp: i64) -> Self {
        self.head_timestamp = timestamp;
        self
    }

    /// Run the responder on `stream` in a background task.
    pub fn serve<S>(self, stream: S, remote: SocketAddr) -> JoinHandle<Result<(), ScanError>>
    where
        S: PeerStream + 'static,
    {
        tokio::spawn(self.run(Box::new(stream), remote))
    }

    async fn run(self, stream: Box<dyn PeerStream>, remote: SocketAddr) -> Result<(), ScanError> {
        let mut conn = PeerConnection::from_stream(stream, remote, true, Timeouts::default());
        conn.handshake(&self.identity, 9732, self.versions.clone()).await?;
        self.offered.lock().push(conn.peer().versions.clone());
        if self.close_after_handshake {
            conn.close().await;
            return Ok(());
        }
        conn.exchange_metadata(self.metadata).await?;
        conn.exchange_ack_with(self.ack).await?;
        if self.ack == Ack::Nack {
            conn.close().await;
            return Ok(());
        }

        conn.send_message(&PeerMessage::GetCurrentBranch(self.chain_id))
            .await?;
        conn.receive_message().await?;
        conn.send_message(&PeerMessage::current_branch_echo(self.chain_id))
            .await?;

        match conn.receive_message().await? {
            PeerMessage::GetCurrentHead(_) => {}
            other => {
                return Err(ProtocolError::UnexpectedMessage {
                    expected: "get_current_head",
                    actual: other.to_string(),
                }
                .into())
            }
        }
        let header = BlockHeader {
            level: 1_000,
            timestamp: self.head_timestamp,
            fitness: vec![vec![0x02]],
            ..BlockHeader::default()
        };
        conn.send_message(&PeerMessage::CurrentHead {
            chain_id: self.chain_id,
            header,
            mempool: vec![0; 8],
        })
        .await?;

        for _ in 0..2 {
            if conn.receive_message().await? == PeerMessage::Bootstrap {
                conn.send_message(&PeerMessage::Advertise(self.neighbors.clone()))
                    .await?;
            }
        }

        // Hold the stream open until the scanner hangs up.
        let _ = conn.receive_message().await;
        Ok(())
    }
}

// =============================================================================
// DIALER
// =============================================================================

/// What a [`MockDialer`] does when asked for an address.
#[derive(Debug, Clone)]
pub enum DialBehavior {
    /// Fail immediately.
    Refuse,
    /// Never complete; the caller's deadline fires.
    Hang,
    /// Connect to a simulated responder.
    Peer(SimulatedPeer),
}

/// Dialer with per-address scripted outcomes. Unscripted addresses refuse.
#[derive(Debug, Default)]
pub struct MockDialer {
    behaviors: Mutex<HashMap<SocketAddr, DialBehavior>>,
    dials: Mutex<HashMap<SocketAddr, usize>>,
}

impl MockDialer {
    /// Dialer that refuses everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Script `addr`.
    pub fn with(self, addr: SocketAddr, behavior: DialBehavior) -> Self {
        self.behaviors.lock().insert(addr, behavior);
        self
    }

    /// How many times `addr` was dialed.
    pub fn dial_count(&self, addr: SocketAddr) -> usize {
        self.dials.lock().get(&addr).copied().unwrap_or(0)
    }

    /// Dials across all addresses.
    pub fn total_dials(&self) -> usize {
        self.dials.lock().values().sum()
    }

    /// Wrap in an `Arc` for sharing with a scanner.
    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }
}

#[async_trait]
impl Dialer for MockDialer {
    async fn dial(&self, addr: SocketAddr) -> Result<Box<dyn PeerStream>, TransportError> {
        *self.dials.lock().entry(addr).or_insert(0) += 1;
        let behavior = self
            .behaviors
            .lock()
            .get(&addr)
            .cloned()
            .unwrap_or(DialBehavior::Refuse);

        match behavior {
            DialBehavior::Refuse => Err(TransportError::Connect {
                addr,
                reason: "connection refused".into(),
            }),
            DialBehavior::Hang => std::future::pending().await,
            DialBehavior::Peer(peer) => {
                let (local, remote) = tokio::io::duplex(DUPLEX_BUFFER);
                let scanner_side: SocketAddr = ([127, 0, 0, 1], 49152).into();
                let _ = peer.serve(remote, scanner_side);
                Ok(Box::new(local))
            }
        }
    }
}
