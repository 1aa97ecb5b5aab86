//! Payload messages carried inside encrypted frames.
//!
//! Metadata and ack are raw byte strings. Everything after them is tagged:
//!
//! ```text
//! len(4) | tag(2) | payload(len - 2)
//! ```

use super::{put_length_prefixed, Reader, MESSAGE_LENGTH_SIZE, MESSAGE_TAG_SIZE};
use crate::domain::errors::CodecError;
use std::fmt;

// =============================================================================
// TAGS
// =============================================================================

/// Orderly disconnect.
pub const TAG_DISCONNECT: u16 = 0x01;
/// Request for known peer addresses.
pub const TAG_BOOTSTRAP: u16 = 0x02;
/// List of known peer addresses.
pub const TAG_ADVERTISE: u16 = 0x03;
/// Request for the current branch of a chain.
pub const TAG_GET_CURRENT_BRANCH: u16 = 0x10;
/// Current branch of a chain.
pub const TAG_CURRENT_BRANCH: u16 = 0x11;
/// Request for the current head of a chain.
pub const TAG_GET_CURRENT_HEAD: u16 = 0x13;
/// Current head of a chain.
pub const TAG_CURRENT_HEAD: u16 = 0x14;

const HASH_SIZE: usize = 32;

/// Block header size with an empty fitness list and no protocol data.
pub const BLOCK_HEADER_FIXED_SIZE: usize = 4 + 1 + HASH_SIZE + 8 + 1 + HASH_SIZE + 4 + HASH_SIZE;

// =============================================================================
// METADATA / ACK
// =============================================================================

/// Connection metadata exchanged right after the handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Metadata {
    /// The sender does not want mempool traffic.
    pub disable_mempool: bool,
    /// The sender must not be advertised to others.
    pub private_node: bool,
}

impl Metadata {
    /// Encoded size.
    pub const SIZE: usize = 2;

    /// Encode as two boolean bytes.
    pub fn encode(&self) -> [u8; Self::SIZE] {
        [u8::from(self.disable_mempool), u8::from(self.private_node)]
    }

    /// Decode from at least two bytes; trailing bytes are ignored.
    pub fn decode(bytes: &[u8]) -> Result<Self, CodecError> {
        let mut reader = Reader::new(bytes);
        Ok(Self {
            disable_mempool: reader.u8()? != 0,
            private_node: reader.u8()? != 0,
        })
    }
}

/// Final handshake confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ack {
    /// Connection accepted.
    Ack,
    /// Connection refused.
    Nack,
}

impl Ack {
    /// Encode as a single byte.
    pub fn encode(&self) -> [u8; 1] {
        match self {
            Self::Ack => [0x00],
            Self::Nack => [0xff],
        }
    }

    /// Decode the first byte: zero is ack, anything else is nack.
    pub fn decode(bytes: &[u8]) -> Result<Self, CodecError> {
        match Reader::new(bytes).u8()? {
            0x00 => Ok(Self::Ack),
            _ => Ok(Self::Nack),
        }
    }
}

// =============================================================================
// CHAIN ID / BLOCK HEADER
// =============================================================================

/// 4-byte chain identifier.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ChainId([u8; 4]);

impl ChainId {
    /// Create from bytes.
    pub fn from_bytes(bytes: [u8; 4]) -> Self {
        Self(bytes)
    }

    /// Get inner bytes.
    pub fn as_bytes(&self) -> &[u8; 4] {
        &self.0
    }

    /// Decode a payload that consists of the chain id and nothing else.
    pub fn decode(bytes: &[u8]) -> Result<Self, CodecError> {
        <[u8; 4]>::try_from(bytes)
            .map(Self)
            .map_err(|_| CodecError::InvalidField {
                field: "chain id",
                reason: format!("expected 4 bytes, got {}", bytes.len()),
            })
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ChainId({})", self)
    }
}

/// Shell block header.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BlockHeader {
    /// Block height.
    pub level: u32,
    /// Protocol number.
    pub proto: u8,
    /// Predecessor block hash.
    pub predecessor: [u8; HASH_SIZE],
    /// Seconds since the Unix epoch.
    pub timestamp: i64,
    /// Number of validation passes.
    pub validation_pass: u8,
    /// Operation list list hash.
    pub operations_hash: [u8; HASH_SIZE],
    /// Fitness components.
    pub fitness: Vec<Vec<u8>>,
    /// Context hash.
    pub context: [u8; HASH_SIZE],
    /// Protocol-specific tail, not interpreted.
    pub protocol_data: Vec<u8>,
}

impl BlockHeader {
    /// Encode without an outer length prefix.
    pub fn encode(&self) -> Result<Vec<u8>, CodecError> {
        let mut out = Vec::with_capacity(BLOCK_HEADER_FIXED_SIZE + self.protocol_data.len());
        out.extend_from_slice(&self.level.to_be_bytes());
        out.push(self.proto);
        out.extend_from_slice(&self.predecessor);
        out.extend_from_slice(&self.timestamp.to_be_bytes());
        out.push(self.validation_pass);
        out.extend_from_slice(&self.operations_hash);

        let mut fitness = Vec::new();
        for entry in &self.fitness {
            put_length_prefixed(&mut fitness, "fitness entry", entry)?;
        }
        put_length_prefixed(&mut out, "fitness", &fitness)?;

        out.extend_from_slice(&self.context);
        out.extend_from_slice(&self.protocol_data);
        Ok(out)
    }

    /// Decode a header occupying all of `bytes`.
    pub fn decode(bytes: &[u8]) -> Result<Self, CodecError> {
        let mut reader = Reader::new(bytes);
        let level = u32::from_be_bytes(reader.array()?);
        let proto = reader.u8()?;
        let predecessor = reader.array()?;
        let timestamp = reader.i64()?;
        let validation_pass = reader.u8()?;
        let operations_hash = reader.array()?;

        let mut fitness_reader = Reader::new(reader.length_prefixed()?);
        let mut fitness = Vec::new();
        while !fitness_reader.is_empty() {
            fitness.push(fitness_reader.length_prefixed()?.to_vec());
        }

        let context = reader.array()?;
        let protocol_data = reader.rest().to_vec();

        Ok(Self {
            level,
            proto,
            predecessor,
            timestamp,
            validation_pass,
            operations_hash,
            fitness,
            context,
            protocol_data,
        })
    }
}

// =============================================================================
// PEER MESSAGE
// =============================================================================

/// Tagged message exchanged on an established connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeerMessage {
    /// Orderly disconnect.
    Disconnect,
    /// Ask for known peer addresses.
    Bootstrap,
    /// Known peer addresses as `host:port` strings.
    Advertise(Vec<String>),
    /// Ask for the current branch.
    GetCurrentBranch(ChainId),
    /// Current head plus a history of block hashes.
    CurrentBranch {
        /// Chain the branch belongs to.
        chain_id: ChainId,
        /// Head of the branch.
        head: BlockHeader,
        /// Ancestor block hashes.
        history: Vec<[u8; HASH_SIZE]>,
    },
    /// Ask for the current head.
    GetCurrentHead(ChainId),
    /// Current head and the sender's mempool.
    CurrentHead {
        /// Chain the head belongs to.
        chain_id: ChainId,
        /// Head block header.
        header: BlockHeader,
        /// Mempool encoding, not interpreted.
        mempool: Vec<u8>,
    },
    /// A tag this codec does not model.
    Unknown {
        /// Wire tag.
        tag: u16,
        /// Raw payload.
        payload: Vec<u8>,
    },
}

impl PeerMessage {
    /// The reply sent when a peer asks for our current branch: its own chain
    /// id with an all-zero header and no history.
    pub fn current_branch_echo(chain_id: ChainId) -> Self {
        Self::CurrentBranch {
            chain_id,
            head: BlockHeader::default(),
            history: Vec::new(),
        }
    }

    /// Wire tag.
    pub fn tag(&self) -> u16 {
        match self {
            Self::Disconnect => TAG_DISCONNECT,
            Self::Bootstrap => TAG_BOOTSTRAP,
            Self::Advertise(_) => TAG_ADVERTISE,
            Self::GetCurrentBranch(_) => TAG_GET_CURRENT_BRANCH,
            Self::CurrentBranch { .. } => TAG_CURRENT_BRANCH,
            Self::GetCurrentHead(_) => TAG_GET_CURRENT_HEAD,
            Self::CurrentHead { .. } => TAG_CURRENT_HEAD,
            Self::Unknown { tag, .. } => *tag,
        }
    }

    /// Short name for logs and errors.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Disconnect => "disconnect",
            Self::Bootstrap => "bootstrap",
            Self::Advertise(_) => "advertise",
            Self::GetCurrentBranch(_) => "get_current_branch",
            Self::CurrentBranch { .. } => "current_branch",
            Self::GetCurrentHead(_) => "get_current_head",
            Self::CurrentHead { .. } => "current_head",
            Self::Unknown { .. } => "unknown",
        }
    }

    /// Encode with the 4-byte length and the tag.
    pub fn encode(&self) -> Result<Vec<u8>, CodecError> {
        let mut payload = Vec::new();
        match self {
            Self::Disconnect | Self::Bootstrap => {}
            Self::Advertise(addresses) => {
                for address in addresses {
                    put_length_prefixed(&mut payload, "advertised address", address.as_bytes())?;
                }
            }
            Self::GetCurrentBranch(chain_id) | Self::GetCurrentHead(chain_id) => {
                payload.extend_from_slice(chain_id.as_bytes());
            }
            Self::CurrentBranch {
                chain_id,
                head,
                history,
            } => {
                payload.extend_from_slice(chain_id.as_bytes());
                put_length_prefixed(&mut payload, "block header", &head.encode()?)?;
                for hash in history {
                    payload.extend_from_slice(hash);
                }
            }
            Self::CurrentHead {
                chain_id,
                header,
                mempool,
            } => {
                payload.extend_from_slice(chain_id.as_bytes());
                put_length_prefixed(&mut payload, "block header", &header.encode()?)?;
                payload.extend_from_slice(mempool);
            }
            Self::Unknown { payload: raw, .. } => payload.extend_from_slice(raw),
        }

        let size = MESSAGE_TAG_SIZE + payload.len();
        let len = u32::try_from(size).map_err(|_| CodecError::TooLarge {
            field: "peer message",
            size,
            limit: u32::MAX as usize,
        })?;

        let mut out = Vec::with_capacity(MESSAGE_LENGTH_SIZE + size);
        out.extend_from_slice(&len.to_be_bytes());
        out.extend_from_slice(&self.tag().to_be_bytes());
        out.extend_from_slice(&payload);
        Ok(out)
    }

    /// Decode a complete message. Unmodelled tags become [`PeerMessage::Unknown`].
    pub fn decode(bytes: &[u8]) -> Result<Self, CodecError> {
        let mut reader = Reader::new(bytes);
        let declared = reader.u32()? as usize;
        if declared != reader.remaining() {
            return Err(CodecError::LengthMismatch {
                declared,
                actual: reader.remaining(),
            });
        }

        let tag = reader.u16()?;
        let payload = reader.rest();
        let mut reader = Reader::new(payload);

        let message = match tag {
            TAG_DISCONNECT => Self::Disconnect,
            TAG_BOOTSTRAP => Self::Bootstrap,
            TAG_ADVERTISE => {
                let mut addresses = Vec::new();
                while !reader.is_empty() {
                    let raw = reader.length_prefixed()?;
                    let address = std::str::from_utf8(raw).map_err(|e| CodecError::InvalidField {
                        field: "advertised address",
                        reason: e.to_string(),
                    })?;
                    addresses.push(address.to_owned());
                }
                Self::Advertise(addresses)
            }
            TAG_GET_CURRENT_BRANCH => Self::GetCurrentBranch(ChainId::decode(payload)?),
            TAG_GET_CURRENT_HEAD => Self::GetCurrentHead(ChainId::decode(payload)?),
            TAG_CURRENT_BRANCH => {
                let chain_id = ChainId::from_bytes(reader.array()?);
                let head = BlockHeader::decode(reader.length_prefixed()?)?;
                let rest = reader.rest();
                if rest.len() % HASH_SIZE != 0 {
                    return Err(CodecError::InvalidField {
                        field: "branch history",
                        reason: format!("{} bytes is not a whole number of hashes", rest.len()),
                    });
                }
                let history = rest
                    .chunks_exact(HASH_SIZE)
                    .map(|chunk| {
                        let mut hash = [0u8; HASH_SIZE];
                        hash.copy_from_slice(chunk);
                        hash
                    })
                    .collect();
                Self::CurrentBranch {
                    chain_id,
                    head,
                    history,
                }
            }
            TAG_CURRENT_HEAD => {
                let chain_id = ChainId::from_bytes(reader.array()?);
                let header = BlockHeader::decode(reader.length_prefixed()?)?;
                Self::CurrentHead {
                    chain_id,
                    header,
                    mempool: reader.rest().to_vec(),
                }
            }
            _ => Self::Unknown {
                tag,
                payload: payload.to_vec(),
            },
        };
        Ok(message)
    }
}

impl fmt::Display for PeerMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (0x{:02x})", self.name(), self.tag())
    }
}
