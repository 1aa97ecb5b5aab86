//! # Binary Codec
//!
//! Wire layouts of the cleartext connection message and of the encrypted
//! payload messages. All integers are big-endian.
//!
//! Decoding never indexes past the end of a buffer: every read goes through
//! [`Reader`], which turns a short buffer into [`CodecError::Truncated`].

mod connection;
mod peer_message;

pub use connection::{ConnectionMessage, CONNECTION_MESSAGE_MIN_SIZE};
pub use peer_message::{
    Ack, BlockHeader, ChainId, Metadata, PeerMessage, BLOCK_HEADER_FIXED_SIZE, TAG_ADVERTISE,
    TAG_BOOTSTRAP, TAG_CURRENT_BRANCH, TAG_CURRENT_HEAD, TAG_DISCONNECT, TAG_GET_CURRENT_BRANCH,
    TAG_GET_CURRENT_HEAD,
};

use crate::domain::errors::CodecError;

/// Size of the 2-byte length prefix on connection messages and frames.
pub const FRAME_LENGTH_SIZE: usize = 2;

/// Size of the 4-byte length prefix on payload messages.
pub const MESSAGE_LENGTH_SIZE: usize = 4;

/// Size of the 2-byte payload message tag.
pub const MESSAGE_TAG_SIZE: usize = 2;

// =============================================================================
// READER
// =============================================================================

/// Bounds-checked cursor over a byte slice.
#[derive(Debug, Clone)]
pub(crate) struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub(crate) fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub(crate) fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    pub(crate) fn take(&mut self, n: usize) -> Result<&'a [u8], CodecError> {
        if n > self.remaining() {
            return Err(CodecError::Truncated {
                offset: self.pos,
                needed: n,
                available: self.remaining(),
            });
        }
        let bytes = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(bytes)
    }

    pub(crate) fn array<const N: usize>(&mut self) -> Result<[u8; N], CodecError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    pub(crate) fn u8(&mut self) -> Result<u8, CodecError> {
        Ok(self.array::<1>()?[0])
    }

    pub(crate) fn u16(&mut self) -> Result<u16, CodecError> {
        self.array().map(u16::from_be_bytes)
    }

    pub(crate) fn u32(&mut self) -> Result<u32, CodecError> {
        self.array().map(u32::from_be_bytes)
    }

    pub(crate) fn i64(&mut self) -> Result<i64, CodecError> {
        self.array().map(i64::from_be_bytes)
    }

    /// A `u32` length followed by that many bytes.
    pub(crate) fn length_prefixed(&mut self) -> Result<&'a [u8], CodecError> {
        let len = self.u32()? as usize;
        self.take(len)
    }

    /// Everything not yet consumed.
    pub(crate) fn rest(&mut self) -> &'a [u8] {
        let bytes = &self.buf[self.pos..];
        self.pos = self.buf.len();
        bytes
    }
}

/// Append `bytes` preceded by their `u32` length.
pub(crate) fn put_length_prefixed(
    out: &mut Vec<u8>,
    field: &'static str,
    bytes: &[u8],
) -> Result<(), CodecError> {
    let len = u32::try_from(bytes.len()).map_err(|_| CodecError::TooLarge {
        field,
        size: bytes.len(),
        limit: u32::MAX as usize,
    })?;
    out.extend_from_slice(&len.to_be_bytes());
    out.extend_from_slice(bytes);
    Ok(())
}

#[cfg(test)]
mod tests;
