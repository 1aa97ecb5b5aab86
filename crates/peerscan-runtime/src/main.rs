//! # Peerscan
//!
//! Runs one crawl from the configured bootstrap list and writes every
//! finalized peer as a JSON line.
//!
//! ## Startup Sequence
//!
//! 1. Parse the command line and install the tracing subscriber
//! 2. Load the scanner configuration and the identity
//! 3. Build the scanner with the TCP dialer and the system clock
//! 4. Start the crawl; Ctrl+C stops it
//! 5. Drain the result stream until it closes

mod cli;
mod output;

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use peerscan_p2p::{
    ConfigProvider, CrawlerApi, FileIdentityProvider, HttpRpcProbe, IdentityProvider, RpcProbe,
    Scanner, SystemTimeSource, TcpDialer, TomlConfigProvider,
};

use crate::cli::Args;
use crate::output::RecordWriter;

fn init_tracing(fallback: &str) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(fallback))
        .context("invalid log filter")?;

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_target(true).with_writer(io::stderr))
        .try_init()
        .context("failed to install tracing subscriber")?;
    Ok(())
}

fn open_output(args: &Args) -> Result<Box<dyn Write + Send>> {
    Ok(match &args.output {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("failed to create {}", path.display()))?,
        )),
        None => Box::new(io::stdout()),
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(&args.log_level)?;

    let config = TomlConfigProvider::load(&args.config)
        .with_context(|| format!("failed to load config {}", args.config.display()))?
        .scanner_config();
    let identity = FileIdentityProvider::new(&args.identity)
        .provide_identity()
        .with_context(|| format!("failed to load identity {}", args.identity.display()))?;
    info!(peer_id = %identity.peer_id, bootstrap = config.bootstrap.len(), "starting peerscan");

    let rpc: Option<Arc<dyn RpcProbe>> = if config.rpc_probe {
        Some(Arc::new(HttpRpcProbe::new().context("failed to build RPC client")?))
    } else {
        None
    };

    let scanner = Arc::new(Scanner::new(
        config,
        identity,
        Arc::new(TcpDialer::new()),
        Arc::new(SystemTimeSource::new()),
        rpc,
    ));
    let mut results = scanner
        .listen()
        .context("result stream already taken")?;
    scanner.scan().await.context("failed to start scan")?;

    let stopper = scanner.clone();
    tokio::spawn(async move {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "cannot listen for Ctrl+C");
            return;
        }
        info!("interrupt received, stopping");
        stopper.stop().await;
    });

    let mut writer = RecordWriter::new(open_output(&args)?);
    while let Some(peer) = results.recv().await {
        writer.write(&peer).context("failed to write peer record")?;
    }

    scanner.stop().await;
    info!(peers = writer.written(), "scan finished");
    Ok(())
}
