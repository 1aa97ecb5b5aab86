use super::config::{ScannerConfig, DEFAULT_PORT};
use super::frontier::Frontier;
use super::ledger::Ledger;
use super::node::{AttemptContext, Node};
use crate::domain::{canonical_addr, Identity, Peer, ScanError};
use crate::ports::{CrawlerApi, Dialer, RpcProbe, TimeSource};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::net::{IpAddr, SocketAddr};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Crawl scheduler implementing the driving port.
///
/// Owns the frontier, the ledger of seen and finalized addresses, a fixed
/// pool of worker tasks and the bounded result stream.
///
/// # Example
///
/// ```rust,ignore
/// let scanner = Scanner::new(config, identity, Arc::new(TcpDialer::new()), Arc::new(SystemTimeSource), None);
/// let mut results = scanner.listen().expect("first call");
/// scanner.scan().await?;
/// while let Some(peer) = results.recv().await {
///     println!("{}", serde_json::to_string(&peer)?);
/// }
/// ```
pub struct Scanner {
    shared: Arc<Shared>,
    results: Mutex<Option<mpsc::Receiver<Peer>>>,
    sender: Mutex<Option<mpsc::Sender<Peer>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    stop_tx: watch::Sender<bool>,
    started: AtomicBool,
}

/// State every worker reads.
struct Shared {
    config: ScannerConfig,
    identity: Identity,
    dialer: Arc<dyn Dialer>,
    clock: Arc<dyn TimeSource>,
    rpc: Option<Arc<dyn RpcProbe>>,
    frontier: Frontier,
    ledger: Ledger,
    stopped: AtomicBool,
}

impl Scanner {
    /// Build an idle scanner. Zero config values are replaced with defaults.
    pub fn new(
        config: ScannerConfig,
        identity: Identity,
        dialer: Arc<dyn Dialer>,
        clock: Arc<dyn TimeSource>,
        rpc: Option<Arc<dyn RpcProbe>>,
    ) -> Self {
        let config = config.normalized();
        let (tx, rx) = mpsc::channel(config.channel_capacity);
        let (stop_tx, _) = watch::channel(false);

        Self {
            shared: Arc::new(Shared {
                config,
                identity,
                dialer,
                clock,
                rpc,
                frontier: Frontier::new(),
                ledger: Ledger::new(),
                stopped: AtomicBool::new(false),
            }),
            results: Mutex::new(Some(rx)),
            sender: Mutex::new(Some(tx)),
            workers: Mutex::new(Vec::new()),
            stop_tx,
            started: AtomicBool::new(false),
        }
    }

    /// Effective configuration.
    pub fn config(&self) -> &ScannerConfig {
        &self.shared.config
    }

    /// True once [`stop`](CrawlerApi::stop) has been called.
    pub fn is_stopped(&self) -> bool {
        self.shared.is_stopped()
    }

    /// Addresses finalized so far.
    pub fn proofed_count(&self) -> usize {
        self.shared.ledger.proofed_count()
    }

    /// Addresses ever queued.
    pub fn known_count(&self) -> usize {
        self.shared.ledger.known_count()
    }

    fn seed(&self, addrs: Vec<SocketAddr>) -> usize {
        let mut seeded = 0;
        for addr in addrs {
            if self.shared.ledger.try_enqueue(addr) && self.shared.enqueue(addr) {
                seeded += 1;
            }
        }
        seeded
    }
}

#[async_trait]
impl CrawlerApi for Scanner {
    fn listen(&self) -> Option<mpsc::Receiver<Peer>> {
        self.results.lock().take()
    }

    async fn scan(&self) -> Result<(), ScanError> {
        if self.is_stopped() {
            return Err(ScanError::Stopped);
        }
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(ScanError::AlreadyStarted);
        }

        let seeds = resolve_bootstrap(&self.shared.config.bootstrap, DEFAULT_PORT).await;
        if seeds.is_empty() {
            self.started.store(false, Ordering::SeqCst);
            return Err(ScanError::EmptyBootstrap);
        }
        let seeded = self.seed(seeds);

        let Some(sender) = self.sender.lock().take() else {
            return Err(ScanError::Stopped);
        };
        let threads = self.shared.config.threads_count;
        let mut workers = self.workers.lock();
        for id in 0..threads {
            workers.push(tokio::spawn(run_worker(
                id,
                self.shared.clone(),
                sender.clone(),
                self.stop_tx.subscribe(),
            )));
        }

        info!(seeds = seeded, workers = threads, "scan started");
        Ok(())
    }

    async fn stop(&self) {
        if self.shared.stopped.swap(true, Ordering::SeqCst) {
            return;
        }
        let _ = self.stop_tx.send(true);
        self.shared.frontier.close();
        self.sender.lock().take();

        let handles = std::mem::take(&mut *self.workers.lock());
        for handle in handles {
            if let Err(err) = handle.await {
                warn!(error = %err, "worker panicked");
            }
        }
        info!(
            proofed = self.shared.ledger.proofed_count(),
            "scan stopped"
        );
    }
}

impl Shared {
    fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    fn enqueue(&self, addr: SocketAddr) -> bool {
        self.frontier.push(Node::new(
            addr,
            self.config.max_attempts,
            self.config.attempts_timeout,
        ))
    }

    fn context(&self) -> AttemptContext<'_> {
        AttemptContext {
            identity: &self.identity,
            dialer: self.dialer.as_ref(),
            clock: self.clock.as_ref(),
            rpc: self.rpc.as_deref(),
            config: &self.config,
        }
    }

    /// Run one attempt on `node`. Returns the record to emit, if this
    /// attempt finalized the address.
    async fn process(&self, mut node: Node) -> Option<Peer> {
        let addr = node.address();
        if self.ledger.is_proofed(addr) {
            debug!(%addr, "already proofed, skipping");
            return None;
        }

        match node.get_peer(&self.context()).await {
            Ok(peer) => {
                if self.is_stopped() {
                    debug!(%addr, "scan stopped, dropping finalized peer");
                    return None;
                }
                if !self.ledger.try_proof(addr) {
                    return None;
                }
                let mut queued = 0;
                for neighbor in &peer.neighbors {
                    if self.ledger.try_enqueue(*neighbor) && self.enqueue(*neighbor) {
                        queued += 1;
                    }
                }
                info!(
                    %addr,
                    synced = peer.synced,
                    neighbors = peer.neighbors.len(),
                    queued,
                    "peer finalized"
                );
                Some(peer)
            }
            Err(err) => {
                if self.is_stopped() {
                    return None;
                }
                if node.has_attempts() {
                    debug!(%addr, attempt = node.attempts_count(), error = %err, "attempt failed, requeueing");
                    self.frontier.push(node);
                    return None;
                }
                node.set_error_state(&err);
                if err.is_retryable() {
                    warn!(%addr, attempts = node.attempts_count(), error = %err, "attempts exhausted");
                } else {
                    warn!(%addr, error = %err, "peer failed terminally");
                }
                if !self.ledger.try_proof(addr) {
                    return None;
                }
                Some(node.into_peer())
            }
        }
    }
}

async fn run_worker(
    id: usize,
    shared: Arc<Shared>,
    results: mpsc::Sender<Peer>,
    mut stop: watch::Receiver<bool>,
) {
    while !shared.is_stopped() {
        let node = tokio::select! {
            biased;
            _ = stop.changed() => break,
            node = shared.frontier.pop() => match node {
                Some(node) => node,
                None => break,
            },
        };

        // In-flight network calls run to completion or to their deadline.
        let emitted = shared.process(node).await;

        let mut interrupted = false;
        if let Some(peer) = emitted {
            tokio::select! {
                biased;
                _ = stop.changed() => interrupted = true,
                sent = results.send(peer) => {
                    if sent.is_err() {
                        debug!(worker = id, "result stream dropped");
                    }
                }
            }
        }
        shared.frontier.complete();
        if interrupted {
            break;
        }
    }
    info!(worker = id, "worker exited");
}

/// Resolve bootstrap entries to canonical, deduplicated socket addresses.
///
/// Entries may be `ip`, `ip:port`, `host` or `host:port`; a missing port is
/// `default_port`. Entries that fail to resolve are logged and skipped.
pub(crate) async fn resolve_bootstrap(entries: &[String], default_port: u16) -> Vec<SocketAddr> {
    let mut seen = HashSet::new();
    let mut resolved = Vec::new();

    for entry in entries {
        let entry = entry.trim();
        let addrs: Vec<SocketAddr> = if let Ok(ip) = entry.parse::<IpAddr>() {
            vec![SocketAddr::new(ip, default_port)]
        } else if let Ok(addr) = entry.parse::<SocketAddr>() {
            vec![addr]
        } else {
            let target = if has_port(entry) {
                entry.to_string()
            } else {
                format!("{entry}:{default_port}")
            };
            match tokio::net::lookup_host(target).await {
                Ok(found) => found.collect(),
                Err(err) => {
                    warn!(entry, error = %err, "cannot resolve bootstrap entry");
                    continue;
                }
            }
        };

        for addr in addrs.into_iter().map(canonical_addr) {
            if seen.insert(addr) {
                resolved.push(addr);
            }
        }
    }
    resolved
}

fn has_port(entry: &str) -> bool {
    entry
        .rsplit_once(':')
        .is_some_and(|(host, port)| {
            !host.is_empty() && !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit())
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entries(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_resolve_literal_entries() {
        let resolved = resolve_bootstrap(
            &entries(&["10.0.0.1", "10.0.0.2:9733", "[::ffff:10.0.0.1]:9732", " 10.0.0.1 "]),
            9732,
        )
        .await;

        assert_eq!(
            resolved,
            vec![
                "10.0.0.1:9732".parse::<SocketAddr>().unwrap(),
                "10.0.0.2:9733".parse().unwrap(),
            ]
        );
    }

    #[tokio::test]
    async fn test_resolve_localhost() {
        let resolved = resolve_bootstrap(&entries(&["localhost"]), 9732).await;
        assert!(!resolved.is_empty());
        assert!(resolved.iter().all(|a| a.port() == 9732 && a.ip().is_loopback()));
    }

    #[tokio::test]
    async fn test_unresolvable_entries_are_skipped() {
        let resolved =
            resolve_bootstrap(&entries(&["boot.example.net:99999", "10.0.0.1"]), 9732).await;
        assert_eq!(resolved, vec!["10.0.0.1:9732".parse::<SocketAddr>().unwrap()]);
    }

    #[test]
    fn test_has_port() {
        assert!(has_port("boot.example.net:9732"));
        assert!(!has_port("boot.example.net"));
        assert!(has_port("boot.example.net:99999"));
        assert!(!has_port("[::1]"));
        assert!(!has_port(":9732"));
    }
}
