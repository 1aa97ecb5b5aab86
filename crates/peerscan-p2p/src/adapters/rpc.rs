use crate::ports::RpcProbe;
use async_trait::async_trait;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;
use tracing::{debug, trace};

/// Ports a node's RPC server usually listens on.
pub const DEFAULT_RPC_PORTS: [u16; 2] = [8732, 18732];

const HEAD_PATH: &str = "/chains/main/blocks/head";
const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Probes `GET /chains/main/blocks/head` on each configured port and
/// reports whether any of them answered with a success status.
#[derive(Debug, Clone)]
pub struct HttpRpcProbe {
    client: reqwest::Client,
    ports: Vec<u16>,
}

impl HttpRpcProbe {
    /// Probe the default ports with a 5 second timeout per request.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built.
    pub fn new() -> Result<Self, reqwest::Error> {
        Self::with_timeout(DEFAULT_PROBE_TIMEOUT)
    }

    /// Probe the default ports with `timeout` per request.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built.
    pub fn with_timeout(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            ports: DEFAULT_RPC_PORTS.to_vec(),
        })
    }

    /// Probe `ports` instead of the defaults.
    #[must_use]
    pub fn with_ports(mut self, ports: Vec<u16>) -> Self {
        self.ports = ports;
        self
    }

    fn url(ip: IpAddr, port: u16) -> String {
        format!("http://{}{HEAD_PATH}", SocketAddr::new(ip, port))
    }
}

#[async_trait]
impl RpcProbe for HttpRpcProbe {
    async fn probe(&self, ip: IpAddr) -> bool {
        for &port in &self.ports {
            let url = Self::url(ip, port);
            match self.client.get(&url).send().await {
                Ok(response) if response.status().is_success() => {
                    debug!(%ip, port, "rpc endpoint answered");
                    return true;
                }
                Ok(response) => trace!(%url, status = %response.status(), "rpc probe rejected"),
                Err(err) => trace!(%url, error = %err, "rpc probe failed"),
            }
        }
        false
    }
}
