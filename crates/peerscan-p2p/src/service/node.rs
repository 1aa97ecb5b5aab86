//! One crawl candidate and its retry state.

use super::config::{ScannerConfig, MAX_ATTEMPTS_TIMEOUT};
use crate::connection::PeerConnection;
use crate::domain::{
    default_versions, Identity, Metadata, Peer, PeerError, ScanError, TransportError, Version,
};
use crate::ports::{Dialer, RpcProbe, TimeSource};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// Borrowed collaborators for one attempt.
pub(crate) struct AttemptContext<'a> {
    pub(crate) identity: &'a Identity,
    pub(crate) dialer: &'a dyn Dialer,
    pub(crate) clock: &'a dyn TimeSource,
    pub(crate) rpc: Option<&'a dyn RpcProbe>,
    pub(crate) config: &'a ScannerConfig,
}

/// A candidate address plus what previous attempts learned about it.
#[derive(Debug)]
pub struct Node {
    peer: Peer,
    attempts_count: u32,
    max_attempts: u32,
    attempts_duration: Duration,
    next_retry_time: Option<Instant>,
    terminal: bool,
}

impl Node {
    /// Fresh candidate; `max_attempts` of 0 is unlimited.
    pub fn new(address: SocketAddr, max_attempts: u32, attempts_duration: Duration) -> Self {
        Self {
            peer: Peer::new(address),
            attempts_count: 0,
            max_attempts,
            attempts_duration,
            next_retry_time: None,
            terminal: false,
        }
    }

    /// Candidate address.
    pub fn address(&self) -> SocketAddr {
        self.peer.address
    }

    /// Failed attempts so far.
    pub fn attempts_count(&self) -> u32 {
        self.attempts_count
    }

    /// Earliest instant the next attempt may start.
    pub fn ready_at(&self) -> Option<Instant> {
        self.next_retry_time
    }

    #[cfg(test)]
    pub(crate) fn set_ready_at(&mut self, at: Instant) {
        self.next_retry_time = Some(at);
    }

    /// Record as learned so far.
    pub fn peer(&self) -> &Peer {
        &self.peer
    }

    /// Whether another attempt is allowed.
    pub fn has_attempts(&self) -> bool {
        !self.terminal && (self.max_attempts == 0 || self.attempts_count < self.max_attempts)
    }

    /// Mark the record as a terminal failure. A retryable `err` on a
    /// candidate with no attempts left is recorded as exhaustion.
    pub fn set_error_state(&mut self, err: &ScanError) {
        self.peer.synced = false;
        self.peer.private_node = true;
        let mut error = PeerError::from(err);
        if err.is_retryable() && !self.has_attempts() {
            error = error.exhausted_after(self.attempts_count);
        } else {
            error.attempts = self.attempts_count;
        }
        self.peer.error = Some(error);
    }

    /// Final record.
    pub fn into_peer(self) -> Peer {
        self.peer
    }

    /// One full attempt: connect, handshake, metadata and ack, head sync,
    /// then neighbor discovery and the optional RPC probe.
    ///
    /// A failure up to head sync consumes an attempt and schedules the next
    /// one `attempts_duration` later. A neighbor discovery failure does not:
    /// the peer is returned with whatever neighbors arrived.
    pub(crate) async fn get_peer(&mut self, ctx: &AttemptContext<'_>) -> Result<Peer, ScanError> {
        let addr = self.address();
        if let Some(ready) = self.next_retry_time {
            let now = Instant::now();
            if now < ready {
                return Err(TransportError::Backoff {
                    addr,
                    remaining: ready - now,
                }
                .into());
            }
        }

        let mut conn = PeerConnection::new(addr, ctx.config.timeouts)
            .with_max_message_size(ctx.config.max_message_size);

        if let Err(err) = self.establish(&mut conn, ctx).await {
            conn.close().await;
            self.learn(conn.into_peer());
            self.record_failure(&err);
            return Err(err);
        }

        if let Err(err) = conn.discover_neighbors().await {
            debug!(%addr, error = %err, neighbors = conn.peer().neighbors.len(), "neighbor discovery cut short");
        }
        conn.close().await;

        let mut peer = conn.into_peer();
        if let Some(rpc) = ctx.rpc {
            peer.rpc = rpc.probe(addr.ip()).await;
        }
        Ok(peer)
    }

    async fn establish(
        &self,
        conn: &mut PeerConnection,
        ctx: &AttemptContext<'_>,
    ) -> Result<(), ScanError> {
        conn.connect(ctx.dialer).await?;
        conn.handshake(ctx.identity, ctx.config.advertised_port, self.versions())
            .await?;
        conn.exchange_metadata(Metadata::default()).await?;
        conn.exchange_ack().await?;
        conn.sync_head(ctx.config.synced_time, ctx.clock.now())
            .await?;
        Ok(())
    }

    /// Versions to offer: those learned from the peer, else the defaults.
    fn versions(&self) -> Vec<Version> {
        if self.peer.versions.is_empty() {
            default_versions()
        } else {
            self.peer.versions.clone()
        }
    }

    /// Keep the id and versions a failed attempt still managed to learn.
    fn learn(&mut self, partial: Peer) {
        if partial.id.is_some() {
            self.peer.id = partial.id;
        }
        if !partial.versions.is_empty() {
            self.peer.versions = partial.versions;
        }
    }

    fn record_failure(&mut self, err: &ScanError) {
        self.attempts_count = self.attempts_count.saturating_add(1);
        let now = Instant::now();
        self.next_retry_time = Some(
            now.checked_add(self.attempts_duration)
                .unwrap_or(now + MAX_ATTEMPTS_TIMEOUT),
        );
        if !err.is_retryable() {
            self.terminal = true;
        }
    }
}
