//! Scanner configuration.

use crate::connection::{Timeouts, DEFAULT_MAX_MESSAGE_SIZE};
use std::time::Duration;

/// Port assumed for bootstrap entries that name none.
pub const DEFAULT_PORT: u16 = 9732;
/// Head age below which a peer counts as synced.
pub const DEFAULT_SYNCED_TIME: Duration = Duration::from_secs(120);
/// Concurrent workers.
pub const DEFAULT_THREADS_COUNT: usize = 4;
/// Delay between attempts on one candidate.
pub const DEFAULT_ATTEMPTS_TIMEOUT: Duration = Duration::from_secs(300);
/// Longest delay between attempts on one candidate.
pub const MAX_ATTEMPTS_TIMEOUT: Duration = Duration::from_secs(24 * 60 * 60);
/// Bound of the result stream.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// Everything a [`Scanner`](super::Scanner) needs besides its ports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannerConfig {
    /// Seed entries: `ip`, `ip:port`, `host` or `host:port`.
    pub bootstrap: Vec<String>,
    /// Head age below which a peer counts as synced.
    pub synced_time: Duration,
    /// Concurrent workers.
    pub threads_count: usize,
    /// Attempts per candidate; 0 is unlimited.
    pub max_attempts: u32,
    /// Delay between attempts on one candidate.
    pub attempts_timeout: Duration,
    /// Listening port announced in our connection message.
    pub advertised_port: u16,
    /// Bound of the result stream.
    pub channel_capacity: usize,
    /// Upper bound on a reassembled payload message.
    pub max_message_size: usize,
    /// Per-operation deadlines.
    pub timeouts: Timeouts,
    /// Probe RPC ports of every finalized peer.
    pub rpc_probe: bool,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            bootstrap: Vec::new(),
            synced_time: DEFAULT_SYNCED_TIME,
            threads_count: DEFAULT_THREADS_COUNT,
            max_attempts: 0,
            attempts_timeout: DEFAULT_ATTEMPTS_TIMEOUT,
            advertised_port: DEFAULT_PORT,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
            timeouts: Timeouts::default(),
            rpc_probe: false,
        }
    }
}

impl ScannerConfig {
    /// Replace zero values with their defaults and cap `attempts_timeout`
    /// at [`MAX_ATTEMPTS_TIMEOUT`]. `max_attempts` keeps 0, which means
    /// unlimited.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        if self.synced_time.is_zero() {
            self.synced_time = DEFAULT_SYNCED_TIME;
        }
        if self.threads_count == 0 {
            self.threads_count = DEFAULT_THREADS_COUNT;
        }
        if self.attempts_timeout.is_zero() {
            self.attempts_timeout = DEFAULT_ATTEMPTS_TIMEOUT;
        }
        self.attempts_timeout = self.attempts_timeout.min(MAX_ATTEMPTS_TIMEOUT);
        if self.channel_capacity == 0 {
            self.channel_capacity = DEFAULT_CHANNEL_CAPACITY;
        }
        if self.max_message_size == 0 {
            self.max_message_size = DEFAULT_MAX_MESSAGE_SIZE;
        }
        self
    }
}
