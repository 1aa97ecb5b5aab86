//! Peer records and time values.

use crate::domain::errors::PeerError;
use crate::domain::version::Version;
use serde::Serialize;
use std::net::{IpAddr, SocketAddr};

/// Unix time in whole seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
pub struct Timestamp(i64);

impl Timestamp {
    /// Create from seconds since the Unix epoch.
    pub fn new(secs: i64) -> Self {
        Self(secs)
    }

    /// Seconds since the Unix epoch.
    pub fn as_secs(&self) -> i64 {
        self.0
    }

    /// Seconds elapsed from `earlier` to `self`. Negative if `earlier` is in the future.
    pub fn seconds_since(&self, earlier: i64) -> i64 {
        self.0.saturating_sub(earlier)
    }
}

/// A discovered or attempted remote node.
///
/// Filled in while a connection progresses, then handed to the result stream
/// where it is never touched again.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Peer {
    /// Network address the node was dialed at.
    pub address: SocketAddr,
    /// Peer id derived from the node's public key, once known.
    pub id: Option<String>,
    /// Versions the node advertised in its connection message.
    pub versions: Vec<Version>,
    /// Metadata flag: the node does not relay mempool content.
    pub disable_mempool: bool,
    /// Metadata flag, also forced on for failed candidates.
    pub private_node: bool,
    /// Head block is younger than the synced-time threshold.
    pub synced: bool,
    /// An auxiliary RPC endpoint answered.
    pub rpc: bool,
    /// Terminal failure, if the candidate never completed.
    pub error: Option<PeerError>,
    /// Addresses the node advertised.
    pub neighbors: Vec<SocketAddr>,
}

impl Peer {
    /// A blank record for `address`.
    pub fn new(address: SocketAddr) -> Self {
        Self {
            address,
            id: None,
            versions: Vec::new(),
            disable_mempool: false,
            private_node: false,
            synced: false,
            rpc: false,
            error: None,
            neighbors: Vec::new(),
        }
    }

    /// True unless the record carries a terminal failure.
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Normalize an address so the same endpoint always compares equal.
///
/// IPv4-mapped IPv6 addresses (`::ffff:a.b.c.d`) become plain IPv4.
pub fn canonical_addr(addr: SocketAddr) -> SocketAddr {
    match addr.ip() {
        IpAddr::V6(v6) => match v6.to_ipv4_mapped() {
            Some(v4) => SocketAddr::new(IpAddr::V4(v4), addr.port()),
            None => addr,
        },
        IpAddr::V4(_) => addr,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_addr_unmaps_ipv4() {
        let mapped: SocketAddr = "[::ffff:10.1.2.3]:9732".parse().unwrap();
        assert_eq!(canonical_addr(mapped), "10.1.2.3:9732".parse().unwrap());

        let v6: SocketAddr = "[2001:db8::1]:9732".parse().unwrap();
        assert_eq!(canonical_addr(v6), v6);
    }

    #[test]
    fn test_peer_serializes_record_fields() {
        let mut peer = Peer::new("10.0.0.1:9732".parse().unwrap());
        peer.id = Some("idr9VuS3wKx7CQdhAGSR6Z2e9hjD4b".into());
        peer.neighbors.push("10.0.0.2:9732".parse().unwrap());

        let json: serde_json::Value = serde_json::to_value(&peer).unwrap();
        assert_eq!(json["address"], "10.0.0.1:9732");
        assert_eq!(json["neighbors"][0], "10.0.0.2:9732");
        assert_eq!(json["error"], serde_json::Value::Null);
        assert_eq!(json["synced"], false);
    }

    #[test]
    fn test_seconds_since() {
        let now = Timestamp::new(1_000);
        assert_eq!(now.seconds_since(990), 10);
        assert_eq!(now.seconds_since(1_010), -10);
    }
}
