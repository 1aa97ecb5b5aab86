//! JSON-lines result writer.

use peerscan_p2p::{Peer, PeerError, Version};
use serde::Serialize;
use std::io::Write;
use std::net::{IpAddr, SocketAddr};

/// One output line.
#[derive(Debug, Serialize)]
struct PeerRecord<'a> {
    ip: IpAddr,
    port: u16,
    id: Option<&'a str>,
    private_node: bool,
    rpc: bool,
    synced: bool,
    disable_mempool: bool,
    neighbors: &'a [SocketAddr],
    versions: &'a [Version],
    error: Option<&'a PeerError>,
}

impl<'a> From<&'a Peer> for PeerRecord<'a> {
    fn from(peer: &'a Peer) -> Self {
        Self {
            ip: peer.address.ip(),
            port: peer.address.port(),
            id: peer.id.as_deref(),
            private_node: peer.private_node,
            rpc: peer.rpc,
            synced: peer.synced,
            disable_mempool: peer.disable_mempool,
            neighbors: &peer.neighbors,
            versions: &peer.versions,
            error: peer.error.as_ref(),
        }
    }
}

/// Writes peers one JSON document per line and counts them.
pub struct RecordWriter<W: Write> {
    out: W,
    written: usize,
}

impl<W: Write> RecordWriter<W> {
    /// Writer over `out` with nothing written yet.
    pub fn new(out: W) -> Self {
        Self { out, written: 0 }
    }

    /// Append `peer` as one line and flush.
    pub fn write(&mut self, peer: &Peer) -> anyhow::Result<()> {
        serde_json::to_writer(&mut self.out, &PeerRecord::from(peer))?;
        self.out.write_all(b"\n")?;
        self.out.flush()?;
        self.written += 1;
        Ok(())
    }

    /// Records written so far.
    pub fn written(&self) -> usize {
        self.written
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use peerscan_p2p::ScanError;
    use serde_json::Value;

    #[test]
    fn test_successful_peer_line() {
        let mut peer = Peer::new("10.0.0.1:9732".parse().unwrap());
        peer.id = Some("idtest".into());
        peer.synced = true;
        peer.versions = vec![Version::new("TEZOS_MAINNET", 0, 1)];
        peer.neighbors = vec!["10.0.0.2:9732".parse().unwrap()];

        let mut writer = RecordWriter::new(Vec::new());
        writer.write(&peer).unwrap();
        assert_eq!(writer.written(), 1);

        let line = String::from_utf8(writer.out).unwrap();
        assert!(line.ends_with('\n'));
        let value: Value = serde_json::from_str(line.trim_end()).unwrap();
        assert_eq!(value["ip"], "10.0.0.1");
        assert_eq!(value["port"], 9732);
        assert_eq!(value["id"], "idtest");
        assert_eq!(value["synced"], true);
        assert_eq!(value["neighbors"][0], "10.0.0.2:9732");
        assert!(value["error"].is_null());
    }

    #[test]
    fn test_failed_peer_line() {
        let addr = "10.0.0.1:9732".parse().unwrap();
        let mut peer = Peer::new(addr);
        peer.private_node = true;
        peer.error = Some(PeerError::from(&ScanError::Nack { addr }));

        let mut writer = RecordWriter::new(Vec::new());
        writer.write(&peer).unwrap();

        let value: Value = serde_json::from_slice(&writer.out).unwrap();
        assert_eq!(value["private_node"], true);
        assert_eq!(value["error"]["kind"], "nack");
        assert_eq!(value["error"]["message"], "10.0.0.1:9732 - received nack");
        assert_eq!(value["error"]["exhausted"], false);
    }
}
