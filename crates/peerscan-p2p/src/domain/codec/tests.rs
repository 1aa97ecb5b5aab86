use super::*;
use crate::domain::version::Version;
use peerscan_crypto::{Nonce, ProofOfWorkStamp, PublicKey};
use proptest::prelude::*;

const CONNECTION_VECTOR: &str = "007c2604911787157ac31ac86ba49ae929ec665c6b955eb51cfcddb8dde96c71cc0f9b2536daf0fc3b618be0d6e04396ac77664535295b0c2656721493d6c99cc0d985948a128278b3c02f42499d9fddbc7693020000002254455a4f535f5a45524f4e45545f323031392d30382d30365431353a31383a35365a00000000";

fn vector_message() -> ConnectionMessage {
    ConnectionMessage {
        port: 9732,
        public_key: PublicKey::from_hex(
            "911787157ac31ac86ba49ae929ec665c6b955eb51cfcddb8dde96c71cc0f9b25",
        )
        .unwrap(),
        proof_of_work_stamp: ProofOfWorkStamp::from_hex(
            "36daf0fc3b618be0d6e04396ac77664535295b0c26567214",
        )
        .unwrap(),
        nonce: Nonce::from_hex("93d6c99cc0d985948a128278b3c02f42499d9fddbc769302").unwrap(),
        versions: vec![Version::new("TEZOS_ZERONET_2019-08-06T15:18:56Z", 0, 0)],
    }
}

fn chain() -> ChainId {
    ChainId::from_bytes([0x7a, 0x06, 0xa7, 0x70])
}

// =============================================================================
// CONNECTION MESSAGE
// =============================================================================

#[test]
fn test_connection_message_encodes_known_vector() {
    let encoded = vector_message().encode().unwrap();
    assert_eq!(hex::encode(encoded), CONNECTION_VECTOR);
}

#[test]
fn test_connection_message_decodes_known_vector() {
    let bytes = hex::decode(CONNECTION_VECTOR).unwrap();
    assert_eq!(ConnectionMessage::decode(&bytes).unwrap(), vector_message());
}

#[test]
fn test_connection_message_rejects_short_input() {
    let bytes = hex::decode(CONNECTION_VECTOR).unwrap();
    let err = ConnectionMessage::decode(&bytes[..CONNECTION_MESSAGE_MIN_SIZE - 1]).unwrap_err();
    assert!(matches!(err, CodecError::Truncated { .. }));
}

#[test]
fn test_connection_message_rejects_length_mismatch() {
    let mut bytes = hex::decode(CONNECTION_VECTOR).unwrap();
    bytes.push(0);
    let err = ConnectionMessage::decode(&bytes).unwrap_err();
    assert_eq!(
        err,
        CodecError::LengthMismatch {
            declared: 124,
            actual: 125
        }
    );
}

#[test]
fn test_connection_message_truncated_version_record() {
    let mut message = vector_message().encode().unwrap();
    // Drop the minor version and fix up the length prefix.
    message.truncate(message.len() - 2);
    let len = (message.len() - FRAME_LENGTH_SIZE) as u16;
    message[..2].copy_from_slice(&len.to_be_bytes());

    let err = ConnectionMessage::decode(&message).unwrap_err();
    assert!(matches!(err, CodecError::Truncated { .. }));
}

#[test]
fn test_zero_length_version_name_stops_decoding() {
    let mut message = vector_message();
    message.versions.clear();
    let mut bytes = message.encode().unwrap();
    bytes.extend_from_slice(&[0, 0, 0, 0, 0xde, 0xad]);
    let len = (bytes.len() - FRAME_LENGTH_SIZE) as u16;
    bytes[..2].copy_from_slice(&len.to_be_bytes());

    let decoded = ConnectionMessage::decode(&bytes).unwrap();
    assert!(decoded.versions.is_empty());
}

#[test]
fn test_connection_message_without_versions() {
    let mut message = vector_message();
    message.versions.clear();
    let bytes = message.encode().unwrap();
    assert_eq!(bytes.len(), CONNECTION_MESSAGE_MIN_SIZE);
    assert_eq!(ConnectionMessage::decode(&bytes).unwrap(), message);
}

#[test]
fn test_new_connection_messages_use_fresh_nonces() {
    let template = vector_message();
    let a = ConnectionMessage::new(
        9732,
        template.versions.clone(),
        template.public_key,
        template.proof_of_work_stamp,
    );
    let b = ConnectionMessage::new(9732, template.versions, template.public_key, template.proof_of_work_stamp);
    assert_ne!(a.nonce, b.nonce);
}

// =============================================================================
// METADATA / ACK
// =============================================================================

#[test]
fn test_metadata_encoding() {
    let metadata = Metadata {
        disable_mempool: false,
        private_node: true,
    };
    assert_eq!(metadata.encode(), [0x00, 0x01]);
    assert_eq!(Metadata::decode(&[0x00, 0x01, 0xff]).unwrap(), metadata);
    assert!(matches!(
        Metadata::decode(&[0x01]),
        Err(CodecError::Truncated { .. })
    ));
}

#[test]
fn test_ack_any_nonzero_byte_is_nack() {
    assert_eq!(Ack::decode(&[0x00]).unwrap(), Ack::Ack);
    assert_eq!(Ack::decode(&[0xff]).unwrap(), Ack::Nack);
    assert_eq!(Ack::decode(&[0x01, 0x00]).unwrap(), Ack::Nack);
    assert!(Ack::decode(&[]).is_err());
    assert_eq!(Ack::Nack.encode(), [0xff]);
}

// =============================================================================
// PEER MESSAGES
// =============================================================================

#[test]
fn test_bootstrap_bytes() {
    assert_eq!(hex::encode(PeerMessage::Bootstrap.encode().unwrap()), "000000020002");
    assert_eq!(
        PeerMessage::decode(&hex::decode("000000020002").unwrap()).unwrap(),
        PeerMessage::Bootstrap
    );
}

#[test]
fn test_get_current_head_bytes() {
    let encoded = PeerMessage::GetCurrentHead(chain()).encode().unwrap();
    assert_eq!(hex::encode(encoded), "0000000600137a06a770");
}

#[test]
fn test_current_branch_echo_layout() {
    let encoded = PeerMessage::current_branch_echo(chain()).encode().unwrap();

    assert_eq!(encoded.len(), MESSAGE_LENGTH_SIZE + 124);
    assert_eq!(&encoded[..4], &124u32.to_be_bytes());
    assert_eq!(&encoded[4..6], &TAG_CURRENT_BRANCH.to_be_bytes());
    assert_eq!(&encoded[6..10], chain().as_bytes());
    assert_eq!(&encoded[10..14], &(BLOCK_HEADER_FIXED_SIZE as u32).to_be_bytes());
    assert!(encoded[14..].iter().all(|b| *b == 0));
}

#[test]
fn test_advertise_decodes_every_entry() {
    let message = PeerMessage::Advertise(vec![
        "10.0.0.2:9732".into(),
        "[2001:db8::1]:9732".into(),
        "".into(),
    ]);
    let encoded = message.encode().unwrap();
    assert_eq!(PeerMessage::decode(&encoded).unwrap(), message);
}

#[test]
fn test_advertise_truncated_entry_is_error() {
    let mut encoded = PeerMessage::Advertise(vec!["10.0.0.2:9732".into()])
        .encode()
        .unwrap();
    encoded.truncate(encoded.len() - 3);
    let len = (encoded.len() - MESSAGE_LENGTH_SIZE) as u32;
    encoded[..4].copy_from_slice(&len.to_be_bytes());
    assert!(matches!(
        PeerMessage::decode(&encoded),
        Err(CodecError::Truncated { .. })
    ));
}

#[test]
fn test_current_head_with_fitness_and_mempool() {
    let header = BlockHeader {
        level: 812_345,
        proto: 4,
        predecessor: [0x11; 32],
        timestamp: 1_571_000_000,
        validation_pass: 4,
        operations_hash: [0x22; 32],
        fitness: vec![vec![0x01], vec![0x00, 0x00, 0x00, 0x00, 0x00, 0x0c, 0x5a, 0x7b]],
        context: [0x33; 32],
        protocol_data: vec![0xaa; 40],
    };
    let message = PeerMessage::CurrentHead {
        chain_id: chain(),
        header: header.clone(),
        mempool: vec![0, 0, 0, 0, 0, 0, 0, 0],
    };

    let encoded = message.encode().unwrap();
    let decoded = PeerMessage::decode(&encoded).unwrap();
    assert_eq!(decoded, message);

    let header_bytes = header.encode().unwrap();
    assert_eq!(
        header_bytes.len(),
        BLOCK_HEADER_FIXED_SIZE + (4 + 1) + (4 + 8) + 40
    );
}

#[test]
fn test_block_header_level_is_unsigned() {
    let mut bytes = BlockHeader::default().encode().unwrap();
    bytes[..4].copy_from_slice(&[0xff, 0xff, 0xff, 0xfe]);

    let header = BlockHeader::decode(&bytes).unwrap();
    assert_eq!(header.level, 4_294_967_294);
}

#[test]
fn test_current_branch_history_must_be_whole_hashes() {
    let mut encoded = PeerMessage::CurrentBranch {
        chain_id: chain(),
        head: BlockHeader::default(),
        history: vec![[0x44; 32]],
    }
    .encode()
    .unwrap();
    encoded.pop();
    let len = (encoded.len() - MESSAGE_LENGTH_SIZE) as u32;
    encoded[..4].copy_from_slice(&len.to_be_bytes());

    assert!(matches!(
        PeerMessage::decode(&encoded),
        Err(CodecError::InvalidField {
            field: "branch history",
            ..
        })
    ));
}

#[test]
fn test_get_current_branch_requires_four_byte_chain() {
    let bytes = hex::decode("000000050010010203").unwrap();
    assert!(PeerMessage::decode(&bytes).is_err());

    let bytes = hex::decode("00000006001001020304").unwrap();
    assert_eq!(
        PeerMessage::decode(&bytes).unwrap(),
        PeerMessage::GetCurrentBranch(ChainId::from_bytes([1, 2, 3, 4]))
    );
}

#[test]
fn test_unknown_tag_is_preserved() {
    let bytes = hex::decode("000000050060abcdef").unwrap();
    let decoded = PeerMessage::decode(&bytes).unwrap();
    assert_eq!(
        decoded,
        PeerMessage::Unknown {
            tag: 0x60,
            payload: vec![0xab, 0xcd, 0xef]
        }
    );
    assert_eq!(decoded.encode().unwrap(), bytes);
    assert_eq!(decoded.to_string(), "unknown (0x60)");
}

#[test]
fn test_peer_message_length_mismatch() {
    let bytes = hex::decode("000000030002").unwrap();
    assert_eq!(
        PeerMessage::decode(&bytes).unwrap_err(),
        CodecError::LengthMismatch {
            declared: 3,
            actual: 2
        }
    );
}

#[test]
fn test_chain_id_display() {
    assert_eq!(chain().to_string(), "7a06a770");
}

// =============================================================================
// PROPERTIES
// =============================================================================

fn arb_version() -> impl Strategy<Value = Version> {
    ("[A-Z_]{1,24}", any::<u16>(), any::<u16>())
        .prop_map(|(name, major, minor)| Version::new(name, major, minor))
}

proptest! {
    #[test]
    fn prop_connection_message_roundtrip(
        port in any::<u16>(),
        pk in proptest::array::uniform32(any::<u8>()),
        pow in proptest::array::uniform24(any::<u8>()),
        nonce in proptest::array::uniform24(any::<u8>()),
        versions in proptest::collection::vec(arb_version(), 0..4),
    ) {
        let message = ConnectionMessage {
            port,
            public_key: PublicKey::from_bytes(pk),
            proof_of_work_stamp: ProofOfWorkStamp::from_bytes(pow),
            nonce: Nonce::from_bytes(nonce),
            versions,
        };
        let encoded = message.encode().unwrap();
        prop_assert_eq!(ConnectionMessage::decode(&encoded).unwrap(), message);
    }

    #[test]
    fn prop_decoders_never_panic(bytes in proptest::collection::vec(any::<u8>(), 0..512)) {
        let _ = ConnectionMessage::decode(&bytes);
        let _ = PeerMessage::decode(&bytes);
        let _ = BlockHeader::decode(&bytes);
        let _ = Metadata::decode(&bytes);
        let _ = Ack::decode(&bytes);
    }

    #[test]
    fn prop_framed_payloads_never_panic(
        tag in prop_oneof![Just(0x03u16), Just(0x10), Just(0x11), Just(0x13), Just(0x14)],
        payload in proptest::collection::vec(any::<u8>(), 0..256),
    ) {
        let mut bytes = ((payload.len() + 2) as u32).to_be_bytes().to_vec();
        bytes.extend_from_slice(&tag.to_be_bytes());
        bytes.extend_from_slice(&payload);
        let _ = PeerMessage::decode(&bytes);
    }
}
