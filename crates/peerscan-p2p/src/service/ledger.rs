//! Crawl-wide address bookkeeping.

use parking_lot::Mutex;
use std::collections::HashSet;
use std::net::SocketAddr;

/// Addresses ever enqueued and addresses already emitted.
///
/// `known` keeps an address from entering the frontier twice. `proofed`
/// keeps it from being emitted twice, even if two workers finish it.
#[derive(Debug, Default)]
pub struct Ledger {
    known: Mutex<HashSet<SocketAddr>>,
    proofed: Mutex<HashSet<SocketAddr>>,
}

impl Ledger {
    /// Empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `addr` for the frontier. True only the first time.
    pub fn try_enqueue(&self, addr: SocketAddr) -> bool {
        self.known.lock().insert(addr)
    }

    /// Claim `addr` for emission. True only the first time.
    pub fn try_proof(&self, addr: SocketAddr) -> bool {
        self.proofed.lock().insert(addr)
    }

    /// Whether `addr` has already been emitted.
    pub fn is_proofed(&self, addr: SocketAddr) -> bool {
        self.proofed.lock().contains(&addr)
    }

    /// Addresses ever enqueued.
    pub fn known_count(&self) -> usize {
        self.known.lock().len()
    }

    /// Addresses emitted.
    pub fn proofed_count(&self) -> usize {
        self.proofed.lock().len()
    }
}
