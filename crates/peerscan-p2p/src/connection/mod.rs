//! # Peer Connection
//!
//! One transport connection and the session derived from it.
//!
//! ```text
//! Disconnected ─connect─▶ Connected ─┐
//!                                    │ handshake
//!              HandshakeSent ◀───────┘
//!                   │
//!                   ▼
//!          HandshakeReceived ─exchange_metadata─▶ MetaExchanged ─exchange_ack─▶ Established
//!
//! any failure ─▶ Failed(reason)
//! ```
//!
//! Each operation takes the resources of the phase it starts from and
//! installs `Failed` while it runs, so a future dropped mid-operation leaves
//! the connection unusable instead of silently desynchronizing the nonces.
//! Calling an operation from the wrong phase is rejected without touching
//! the current phase.

mod framing;
mod state;

pub use state::ConnectionState;

use crate::domain::{
    canonical_addr, Ack, ConnectionMessage, HandshakeError, Identity, Metadata, Peer,
    PeerMessage, ProtocolError, ScanError, Timestamp, TransportError, Version,
};
use crate::ports::{Dialer, PeerStream};
use framing::SecureChannel;
use peerscan_crypto::{derive_peer_id, generate_nonces, PrecomputedKey};
use state::Phase;
use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;
use tracing::{debug, instrument};

/// Upper bound on a reassembled payload message.
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 2 * 1024 * 1024;

const INTERRUPTED: &str = "operation interrupted";

/// Per-operation deadlines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    /// Opening the transport.
    pub connect: Duration,
    /// Sending or receiving a connection message.
    pub handshake: Duration,
    /// One encrypted request/response step.
    pub message: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            connect: Duration::from_secs(8),
            handshake: Duration::from_secs(6),
            message: Duration::from_secs(10),
        }
    }
}

/// Run `fut` under `limit`, turning expiry into [`TransportError::Timeout`].
async fn deadline<T, E, F>(limit: Duration, operation: &'static str, fut: F) -> Result<T, E>
where
    F: Future<Output = Result<T, E>>,
    E: From<TransportError>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(TransportError::Timeout {
            operation,
            timeout: limit,
        }
        .into()),
    }
}

/// Parse one advertised `host:port` entry. Unparseable, unspecified and
/// port-zero entries are dropped.
pub(crate) fn parse_neighbor(entry: &str) -> Option<SocketAddr> {
    let addr = canonical_addr(entry.parse::<SocketAddr>().ok()?);
    (!addr.ip().is_unspecified() && addr.port() != 0).then_some(addr)
}

/// A single connection to a remote node.
pub struct PeerConnection {
    address: SocketAddr,
    incoming: bool,
    timeouts: Timeouts,
    max_message_size: usize,
    phase: Phase,
    peer: Peer,
}

impl PeerConnection {
    /// Outbound connection to `address`, not yet dialed.
    pub fn new(address: SocketAddr, timeouts: Timeouts) -> Self {
        Self {
            address,
            incoming: false,
            timeouts,
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
            phase: Phase::Disconnected,
            peer: Peer::new(address),
        }
    }

    /// Wrap an already open stream. `incoming` is true on the accepting side.
    pub fn from_stream(
        stream: Box<dyn PeerStream>,
        address: SocketAddr,
        incoming: bool,
        timeouts: Timeouts,
    ) -> Self {
        Self {
            incoming,
            phase: Phase::Connected(stream),
            ..Self::new(address, timeouts)
        }
    }

    /// Override the reassembly limit.
    pub fn with_max_message_size(mut self, max_message_size: usize) -> Self {
        self.max_message_size = max_message_size;
        self
    }

    /// Remote address.
    pub fn address(&self) -> SocketAddr {
        self.address
    }

    /// Current state.
    pub fn state(&self) -> ConnectionState {
        self.phase.state()
    }

    /// Everything learned about the remote so far.
    pub fn peer(&self) -> &Peer {
        &self.peer
    }

    /// Consume the connection, keeping the learned record.
    pub fn into_peer(self) -> Peer {
        self.peer
    }

    // =========================================================================
    // PHASE HELPERS
    // =========================================================================

    /// Take the resources of the expected phase, leaving `Failed` in place.
    /// On a phase mismatch the current phase is restored.
    fn take_phase<T>(
        &mut self,
        operation: &'static str,
        extract: impl FnOnce(Phase) -> Result<T, Phase>,
    ) -> Result<T, ScanError> {
        let phase = std::mem::replace(&mut self.phase, Phase::Failed(INTERRUPTED.to_owned()));
        extract(phase).map_err(|phase| {
            let state = phase.state().to_string();
            self.phase = phase;
            ProtocolError::InvalidState { operation, state }.into()
        })
    }

    fn take_established(&mut self, operation: &'static str) -> Result<SecureChannel, ScanError> {
        self.take_phase(operation, |phase| match phase {
            Phase::Established(channel) => Ok(channel),
            other => Err(other),
        })
    }

    fn fail(&mut self, err: ScanError) -> ScanError {
        debug!(addr = %self.address, error = %err, "connection failed");
        self.phase = Phase::Failed(err.to_string());
        err
    }

    // =========================================================================
    // TRANSITIONS
    // =========================================================================

    /// Open the transport through `dialer` under the connect deadline.
    #[instrument(skip_all, fields(addr = %self.address))]
    pub async fn connect(&mut self, dialer: &dyn Dialer) -> Result<(), ScanError> {
        self.take_phase("connect", |phase| match phase {
            Phase::Disconnected => Ok(()),
            other => Err(other),
        })?;

        let addr = self.address;
        match deadline(self.timeouts.connect, "connect", dialer.dial(addr)).await {
            Ok(stream) => {
                self.phase = Phase::Connected(stream);
                Ok(())
            }
            Err(e) => Err(self.fail(e.into())),
        }
    }

    /// Exchange connection messages and derive the session.
    ///
    /// `port` is the listening port we announce; `versions` are offered in
    /// order. On success the peer id and advertised versions are recorded.
    #[instrument(skip_all, fields(addr = %self.address))]
    pub async fn handshake(
        &mut self,
        identity: &Identity,
        port: u16,
        versions: Vec<Version>,
    ) -> Result<(), ScanError> {
        self.send_connection_message(identity, port, versions).await?;
        self.receive_connection_message(identity).await?;
        debug!(peer_id = ?self.peer.id, "handshake complete");
        Ok(())
    }

    async fn send_connection_message(
        &mut self,
        identity: &Identity,
        port: u16,
        versions: Vec<Version>,
    ) -> Result<(), ScanError> {
        let mut stream = self.take_phase("handshake", |phase| match phase {
            Phase::Connected(stream) => Ok(stream),
            other => Err(other),
        })?;

        let message = ConnectionMessage::new(
            port,
            versions,
            identity.public_key,
            identity.proof_of_work_stamp,
        );
        let sent = match message.encode() {
            Ok(bytes) => bytes,
            Err(e) => return Err(self.fail(HandshakeError::Malformed(e).into())),
        };

        let written = deadline(
            self.timeouts.handshake,
            "send connection message",
            framing::write_raw(&mut stream, &sent),
        )
        .await;
        if let Err(e) = written {
            return Err(self.fail(HandshakeError::Send(e).into()));
        }

        self.phase = Phase::HandshakeSent { stream, sent };
        Ok(())
    }

    async fn receive_connection_message(&mut self, identity: &Identity) -> Result<(), ScanError> {
        let (mut stream, sent) = self.take_phase("handshake", |phase| match phase {
            Phase::HandshakeSent { stream, sent } => Ok((stream, sent)),
            other => Err(other),
        })?;

        // Kept exactly as framed on the wire: nonces are derived from these bytes.
        let received = match deadline(
            self.timeouts.handshake,
            "receive connection message",
            framing::read_prefixed(&mut stream),
        )
        .await
        {
            Ok(bytes) => bytes,
            Err(e) => return Err(self.fail(HandshakeError::Receive(e).into())),
        };

        let remote = match ConnectionMessage::decode(&received) {
            Ok(message) => message,
            Err(e) => return Err(self.fail(HandshakeError::Malformed(e).into())),
        };

        let nonces = generate_nonces(&sent, &received, self.incoming);
        let key = PrecomputedKey::precompute(&remote.public_key, &identity.secret_key);

        self.peer.id = Some(derive_peer_id(&remote.public_key));
        self.peer.versions = remote.versions;
        self.phase = Phase::HandshakeReceived(SecureChannel::new(stream, key, nonces));
        Ok(())
    }

    /// Send our metadata and read the peer's, recording its flags.
    #[instrument(skip_all, fields(addr = %self.address))]
    pub async fn exchange_metadata(&mut self, own: Metadata) -> Result<Metadata, ScanError> {
        let mut channel = self.take_phase("exchange metadata", |phase| match phase {
            Phase::HandshakeReceived(channel) => Ok(channel),
            other => Err(other),
        })?;

        let result = deadline(self.timeouts.message, "metadata exchange", async {
            channel.write_encrypted(&own.encode()).await?;
            let reply = channel.read_encrypted().await?;
            Metadata::decode(&reply).map_err(|source| {
                ScanError::from(ProtocolError::Malformed {
                    message: "metadata",
                    source,
                })
            })
        })
        .await;

        match result {
            Ok(remote) => {
                self.peer.disable_mempool = remote.disable_mempool;
                self.peer.private_node = remote.private_node;
                self.phase = Phase::MetaExchanged(channel);
                Ok(remote)
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Send an ack and read the peer's answer. A nack is [`ScanError::Nack`].
    pub async fn exchange_ack(&mut self) -> Result<(), ScanError> {
        self.exchange_ack_with(Ack::Ack).await
    }

    /// Like [`exchange_ack`](Self::exchange_ack) with an arbitrary own answer.
    /// Used by the responder side to refuse a connection.
    #[instrument(skip_all, fields(addr = %self.address))]
    pub(crate) async fn exchange_ack_with(&mut self, own: Ack) -> Result<(), ScanError> {
        let mut channel = self.take_phase("exchange ack", |phase| match phase {
            Phase::MetaExchanged(channel) => Ok(channel),
            other => Err(other),
        })?;

        let result = deadline(self.timeouts.message, "ack exchange", async {
            channel.write_encrypted(&own.encode()).await?;
            let reply = channel.read_encrypted().await?;
            Ack::decode(&reply).map_err(|source| {
                ScanError::from(ProtocolError::Malformed {
                    message: "ack",
                    source,
                })
            })
        })
        .await;

        match result {
            Ok(Ack::Ack) => {
                self.phase = Phase::Established(channel);
                Ok(())
            }
            Ok(Ack::Nack) => Err(self.fail(ScanError::Nack { addr: self.address })),
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Send one payload message.
    pub async fn send_message(&mut self, message: &PeerMessage) -> Result<(), ScanError> {
        let mut channel = self.take_established("send message")?;

        let result = deadline(self.timeouts.message, "send message", async {
            let bytes = message.encode().map_err(|source| {
                ScanError::from(ProtocolError::Malformed {
                    message: "outgoing peer message",
                    source,
                })
            })?;
            channel.send(&bytes).await
        })
        .await;

        match result {
            Ok(()) => {
                self.phase = Phase::Established(channel);
                Ok(())
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Receive one payload message, reassembling multi-frame messages.
    pub async fn receive_message(&mut self) -> Result<PeerMessage, ScanError> {
        let mut channel = self.take_established("receive message")?;
        let limit = self.max_message_size;

        let result = deadline(self.timeouts.message, "receive message", async {
            let bytes = channel.receive(limit).await?;
            PeerMessage::decode(&bytes).map_err(|source| {
                ScanError::from(ProtocolError::Malformed {
                    message: "peer message",
                    source,
                })
            })
        })
        .await;

        match result {
            Ok(message) => {
                self.phase = Phase::Established(channel);
                Ok(message)
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    fn unexpected(&mut self, expected: &'static str, actual: &PeerMessage) -> ScanError {
        self.fail(
            ProtocolError::UnexpectedMessage {
                expected,
                actual: actual.to_string(),
            }
            .into(),
        )
    }

    /// Answer the peer's branch request and fetch its current head.
    ///
    /// Sets and returns `synced`: the head is younger than `synced_time`
    /// relative to `now`.
    #[instrument(skip_all, fields(addr = %self.address))]
    pub async fn sync_head(
        &mut self,
        synced_time: Duration,
        now: Timestamp,
    ) -> Result<bool, ScanError> {
        let chain_id = match self.receive_message().await? {
            PeerMessage::GetCurrentBranch(chain_id) => chain_id,
            other => return Err(self.unexpected("get_current_branch", &other)),
        };

        self.send_message(&PeerMessage::current_branch_echo(chain_id))
            .await?;
        // Whatever the peer sends next is only consumed.
        let reply = self.receive_message().await?;
        debug!(message = %reply, "branch echo answered");

        self.send_message(&PeerMessage::GetCurrentHead(chain_id))
            .await?;
        let header = match self.receive_message().await? {
            PeerMessage::CurrentHead { header, .. } => header,
            other => return Err(self.unexpected("current_head", &other)),
        };

        let threshold = i64::try_from(synced_time.as_secs()).unwrap_or(i64::MAX);
        let synced = now.seconds_since(header.timestamp) < threshold;
        self.peer.synced = synced;
        debug!(level = header.level, timestamp = header.timestamp, synced, "head synced");
        Ok(synced)
    }

    /// Two rounds of `Bootstrap`, collecting every advertised address.
    ///
    /// Neighbors are recorded as they arrive, so a failure in the second
    /// round keeps what the first one produced.
    #[instrument(skip_all, fields(addr = %self.address))]
    pub async fn discover_neighbors(&mut self) -> Result<Vec<SocketAddr>, ScanError> {
        for _ in 0..2 {
            self.send_message(&PeerMessage::Bootstrap).await?;
            match self.receive_message().await? {
                PeerMessage::Advertise(entries) => {
                    for entry in entries {
                        match parse_neighbor(&entry) {
                            Some(addr) if !self.peer.neighbors.contains(&addr) => {
                                self.peer.neighbors.push(addr);
                            }
                            Some(_) => {}
                            None => debug!(entry = %entry, "skipping unusable neighbor"),
                        }
                    }
                }
                other => debug!(message = %other, "ignoring non-advertise reply"),
            }
        }
        Ok(self.peer.neighbors.clone())
    }

    /// Shut the transport down. A failed connection stays failed.
    pub async fn close(&mut self) {
        let phase = std::mem::replace(&mut self.phase, Phase::Disconnected);
        match phase {
            Phase::Connected(mut stream) | Phase::HandshakeSent { mut stream, .. } => {
                let _ = tokio::io::AsyncWriteExt::shutdown(&mut stream).await;
            }
            Phase::HandshakeReceived(channel)
            | Phase::MetaExchanged(channel)
            | Phase::Established(channel) => channel.shutdown().await,
            Phase::Failed(reason) => self.phase = Phase::Failed(reason),
            Phase::Disconnected => {}
        }
    }
}
