//! Protocol versions announced in the connection message.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Network name offered when nothing is known about the peer yet.
pub const MAINNET_VERSION_NAME: &str = "TEZOS_MAINNET";

/// One protocol/network variant a peer supports.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Version {
    /// Network name, e.g. `TEZOS_MAINNET`.
    pub name: String,
    /// Major version.
    pub major: u16,
    /// Minor version.
    pub minor: u16,
}

impl Version {
    /// Create a version.
    pub fn new(name: impl Into<String>, major: u16, minor: u16) -> Self {
        Self {
            name: name.into(),
            major,
            minor,
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}.{}", self.name, self.major, self.minor)
    }
}

/// Versions offered on a first attempt.
pub fn default_versions() -> Vec<Version> {
    vec![Version::new(MAINNET_VERSION_NAME, 0, 0)]
}
