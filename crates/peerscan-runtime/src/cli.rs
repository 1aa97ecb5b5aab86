use clap::Parser;
use std::path::PathBuf;

/// Peerscan: native-protocol crawler for Tezos-style networks
#[derive(Parser, Debug)]
#[command(name = "peerscan")]
#[command(about = "Crawl a peer-to-peer network and fingerprint every reachable node")]
pub struct Args {
    /// Scanner configuration file (TOML)
    #[arg(short, long, default_value = "peerscan.toml")]
    pub config: PathBuf,

    /// Identity file (JSON with hex keys)
    #[arg(short, long, default_value = "identity.json")]
    pub identity: PathBuf,

    /// Output file for JSON lines; stdout when omitted
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::parse_from(["peerscan"]);
        assert_eq!(args.config, PathBuf::from("peerscan.toml"));
        assert_eq!(args.identity, PathBuf::from("identity.json"));
        assert!(args.output.is_none());
        assert_eq!(args.log_level, "info");
    }

    #[test]
    fn test_overrides() {
        let args = Args::parse_from([
            "peerscan",
            "--config",
            "/etc/peerscan.toml",
            "-o",
            "peers.jsonl",
            "--log-level",
            "peerscan_p2p=debug",
        ]);
        assert_eq!(args.config, PathBuf::from("/etc/peerscan.toml"));
        assert_eq!(args.output, Some(PathBuf::from("peers.jsonl")));
        assert_eq!(args.log_level, "peerscan_p2p=debug");
    }
}
