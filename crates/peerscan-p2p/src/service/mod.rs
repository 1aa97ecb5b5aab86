//! # Scanner Service
//!
//! Crawl scheduling on top of the connection state machine.
//!
//! - [`Node`]: one candidate address with its retry budget and backoff
//! - [`Frontier`]: delay-ordered queue of candidates shared by the workers
//! - [`Ledger`]: addresses ever queued and addresses already emitted
//! - [`Scanner`]: worker pool and result stream, implementing
//!   [`CrawlerApi`](crate::ports::CrawlerApi)

mod config;
mod frontier;
mod ledger;
mod node;
mod scanner;

pub use config::{
    ScannerConfig, DEFAULT_ATTEMPTS_TIMEOUT, DEFAULT_CHANNEL_CAPACITY, DEFAULT_PORT,
    DEFAULT_SYNCED_TIME, DEFAULT_THREADS_COUNT, MAX_ATTEMPTS_TIMEOUT,
};
pub use frontier::Frontier;
pub use ledger::Ledger;
pub use node::Node;
pub use scanner::Scanner;
