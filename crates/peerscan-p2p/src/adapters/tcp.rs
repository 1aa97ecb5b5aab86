use crate::domain::TransportError;
use crate::ports::{Dialer, PeerStream};
use async_trait::async_trait;
use std::net::SocketAddr;
use tokio::net::TcpStream;
use tracing::trace;

/// Opens plain TCP connections. Deadlines are applied by the connection.
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpDialer;

impl TcpDialer {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Dialer for TcpDialer {
    async fn dial(&self, addr: SocketAddr) -> Result<Box<dyn PeerStream>, TransportError> {
        let stream = TcpStream::connect(addr)
            .await
            .map_err(|e| TransportError::Connect {
                addr,
                reason: e.to_string(),
            })?;
        if let Err(err) = stream.set_nodelay(true) {
            trace!(%addr, error = %err, "cannot set TCP_NODELAY");
        }
        Ok(Box::new(stream))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_dial_local_listener() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            socket.write_all(b"ok").await.unwrap();
        });

        let mut stream = TcpDialer::new().dial(addr).await.unwrap();
        let mut buf = [0u8; 2];
        stream.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"ok");
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_refused_dial_is_connect_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = TcpDialer::new().dial(addr).await.err().unwrap();
        assert!(matches!(err, TransportError::Connect { addr: a, .. } if a == addr));
    }
}
