//! Length-prefixed frames and the encrypted channel built on top of them.

use crate::domain::codec::{FRAME_LENGTH_SIZE, MESSAGE_LENGTH_SIZE};
use crate::domain::{CodecError, ProtocolError, ScanError, TransportError};
use crate::ports::PeerStream;
use peerscan_crypto::{decrypt, encrypt, Nonce, NoncePair, PrecomputedKey, TAG_SIZE};
use std::io;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::trace;

/// Largest plaintext that still fits one frame once the tag is added.
pub(crate) const MAX_FRAME_PLAINTEXT: usize = u16::MAX as usize - TAG_SIZE;

/// Write `payload` behind its 2-byte length.
pub(crate) async fn write_frame<W>(writer: &mut W, payload: &[u8]) -> Result<(), TransportError>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    let len = u16::try_from(payload.len()).map_err(|_| {
        TransportError::Io(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("frame of {} bytes does not fit a 2-byte length", payload.len()),
        ))
    })?;

    let mut buf = Vec::with_capacity(FRAME_LENGTH_SIZE + payload.len());
    buf.extend_from_slice(&len.to_be_bytes());
    buf.extend_from_slice(payload);
    write_raw(writer, &buf).await
}

/// Write bytes that already carry their own length prefix.
pub(crate) async fn write_raw<W>(writer: &mut W, bytes: &[u8]) -> Result<(), TransportError>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    writer.write_all(bytes).await?;
    writer.flush().await?;
    Ok(())
}

/// Read one frame body: exactly two length bytes, then exactly that many bytes.
pub(crate) async fn read_frame<R>(reader: &mut R) -> Result<Vec<u8>, TransportError>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut framed = read_prefixed(reader).await?;
    Ok(framed.split_off(FRAME_LENGTH_SIZE))
}

/// Read one frame and keep its length prefix.
pub(crate) async fn read_prefixed<R>(reader: &mut R) -> Result<Vec<u8>, TransportError>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut len = [0u8; FRAME_LENGTH_SIZE];
    read_exact(reader, &mut len).await?;

    let mut framed = vec![0u8; FRAME_LENGTH_SIZE + u16::from_be_bytes(len) as usize];
    framed[..FRAME_LENGTH_SIZE].copy_from_slice(&len);
    read_exact(reader, &mut framed[FRAME_LENGTH_SIZE..]).await?;
    Ok(framed)
}

async fn read_exact<R>(reader: &mut R, buf: &mut [u8]) -> Result<(), TransportError>
where
    R: AsyncRead + Unpin + ?Sized,
{
    match reader.read_exact(buf).await {
        Ok(_) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Err(TransportError::Closed),
        Err(e) => Err(TransportError::Io(e)),
    }
}

/// Stream plus the session state derived by the handshake.
///
/// Every frame written consumes the local nonce, every frame read consumes
/// the remote nonce. The two counters advance independently and only after
/// the frame was successfully processed.
pub(crate) struct SecureChannel {
    stream: Box<dyn PeerStream>,
    key: PrecomputedKey,
    local_nonce: Nonce,
    remote_nonce: Nonce,
}

impl SecureChannel {
    pub(crate) fn new(stream: Box<dyn PeerStream>, key: PrecomputedKey, nonces: NoncePair) -> Self {
        Self {
            stream,
            key,
            local_nonce: nonces.local,
            remote_nonce: nonces.remote,
        }
    }

    /// Encrypt and write a single frame.
    pub(crate) async fn write_encrypted(&mut self, plaintext: &[u8]) -> Result<(), ScanError> {
        let ciphertext = encrypt(plaintext, self.local_nonce.as_bytes(), &self.key)?;
        write_frame(&mut self.stream, &ciphertext).await?;
        trace!(nonce = %self.local_nonce, bytes = plaintext.len(), "frame sent");
        self.local_nonce = self.local_nonce.increment();
        Ok(())
    }

    /// Read and decrypt a single frame.
    pub(crate) async fn read_encrypted(&mut self) -> Result<Vec<u8>, ScanError> {
        let ciphertext = read_frame(&mut self.stream).await?;
        let plaintext = decrypt(&ciphertext, self.remote_nonce.as_bytes(), &self.key)?;
        trace!(nonce = %self.remote_nonce, bytes = plaintext.len(), "frame received");
        self.remote_nonce = self.remote_nonce.increment();
        Ok(plaintext)
    }

    /// Send an encoded payload message, split over as many frames as needed.
    pub(crate) async fn send(&mut self, message: &[u8]) -> Result<(), ScanError> {
        for chunk in message.chunks(MAX_FRAME_PLAINTEXT) {
            self.write_encrypted(chunk).await?;
        }
        Ok(())
    }

    /// Receive one payload message, reassembling frames until the declared
    /// 4-byte length is satisfied.
    pub(crate) async fn receive(&mut self, max_size: usize) -> Result<Vec<u8>, ScanError> {
        let mut message = self.read_encrypted().await?;

        let prefix: [u8; MESSAGE_LENGTH_SIZE] = message
            .get(..MESSAGE_LENGTH_SIZE)
            .and_then(|p| p.try_into().ok())
            .ok_or_else(|| ProtocolError::Malformed {
                message: "peer message",
                source: CodecError::Truncated {
                    offset: 0,
                    needed: MESSAGE_LENGTH_SIZE,
                    available: message.len(),
                },
            })?;

        let total = MESSAGE_LENGTH_SIZE.saturating_add(u32::from_be_bytes(prefix) as usize);
        if total > max_size {
            return Err(ProtocolError::MessageTooLarge {
                size: total,
                limit: max_size,
            }
            .into());
        }

        while message.len() < total {
            let frame = self.read_encrypted().await?;
            message.extend_from_slice(&frame);
        }
        Ok(message)
    }

    pub(crate) async fn shutdown(mut self) {
        let _ = self.stream.shutdown().await;
    }
}
