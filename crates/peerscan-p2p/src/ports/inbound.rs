//! # Driving Port (Inbound API)

use crate::domain::{Peer, ScanError};
use async_trait::async_trait;
use tokio::sync::mpsc;

/// Lifecycle of one crawl.
///
/// ```rust,ignore
/// let mut results = crawler.listen().expect("first call");
/// crawler.scan().await?;
/// while let Some(peer) = results.recv().await {
///     println!("{}", peer.address);
/// }
/// ```
#[async_trait]
pub trait CrawlerApi: Send + Sync {
    /// Take the result stream. Returns `None` after the first call.
    ///
    /// The stream yields every finalized peer exactly once and closes when
    /// all workers have exited.
    fn listen(&self) -> Option<mpsc::Receiver<Peer>>;

    /// Resolve the bootstrap list, seed the frontier and start the workers.
    ///
    /// Returns once the workers are running; the crawl itself continues in
    /// the background.
    async fn scan(&self) -> Result<(), ScanError>;

    /// Signal every worker to stop and wait for them. Idempotent.
    async fn stop(&self);
}
