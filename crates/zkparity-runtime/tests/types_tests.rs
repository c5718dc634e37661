//! Integration tests for core types in zkparity-runtime

use zkparity_runtime::{
    FieldWord, Parity, ProofPoints, Tally, TransactionResult, TxHash, VoteCalldata, CALLDATA_SIZE,
};

fn points() -> ProofPoints {
    ProofPoints {
        a: [FieldWord::from_u64(11), FieldWord::from_u64(12)],
        b: [
            [FieldWord::from_u64(21), FieldWord::from_u64(22)],
            [FieldWord::from_u64(23), FieldWord::from_u64(24)],
        ],
        c: [FieldWord::from_u64(31), FieldWord::from_u64(32)],
    }
}

// ============================================================================
// FieldWord
// ============================================================================

#[test]
fn test_field_word_hex_format() {
    let word = FieldWord::from_u64(255);
    let hex = word.to_hex();

    assert!(hex.starts_with("0x"));
    assert_eq!(hex.len(), 66);
    assert!(hex.ends_with("ff"));
}

#[test]
fn test_field_word_from_short_hex() {
    let word = FieldWord::from_hex("0x1").expect("short hex should parse");
    assert_eq!(word, FieldWord::from_u64(1));

    let unprefixed = FieldWord::from_hex("abc").expect("unprefixed hex should parse");
    assert_eq!(unprefixed.to_u64(), Some(0xabc));
}

#[test]
fn test_field_word_rejects_bad_hex() {
    assert!(FieldWord::from_hex("0x").is_err());
    assert!(FieldWord::from_hex("0xzz").is_err());
    assert!(FieldWord::from_hex(&format!("0x{}", "1".repeat(65))).is_err());
}

#[test]
fn test_field_word_large_value_has_no_u64() {
    let mut bytes = [0u8; 32];
    bytes[0] = 0x30;
    assert_eq!(FieldWord::new(bytes).to_u64(), None);
}

#[test]
fn test_field_word_json_is_hex_string() {
    let json = serde_json::to_string(&FieldWord::from_u64(16)).expect("Failed to serialize word");
    assert_eq!(
        json,
        "\"0x0000000000000000000000000000000000000000000000000000000000000010\""
    );

    let back: FieldWord = serde_json::from_str(&json).expect("Failed to deserialize word");
    assert_eq!(back, FieldWord::from_u64(16));
}

// ============================================================================
// VoteCalldata
// ============================================================================

#[test]
fn test_calldata_binary_layout() {
    let calldata = VoteCalldata::new(points(), FieldWord::from_u64(1));
    let bytes = calldata.to_bytes();

    assert_eq!(bytes.len(), CALLDATA_SIZE);
    assert_eq!(bytes[31], 11);
    assert_eq!(bytes[63], 12);
    assert_eq!(bytes[95], 21);
    assert_eq!(bytes[191], 24);
    assert_eq!(bytes[255], 32);
    assert_eq!(bytes[287], 1);

    let decoded = VoteCalldata::from_bytes(&bytes).expect("Failed to decode calldata");
    assert_eq!(decoded, calldata);
}

#[test]
fn test_calldata_rejects_wrong_length() {
    let err = VoteCalldata::from_bytes(&[0u8; 287]).unwrap_err();
    assert!(err.to_string().contains("288"));

    assert!(VoteCalldata::from_bytes(&[0u8; 320]).is_err());
}

#[test]
fn test_calldata_json_shape() {
    let calldata = VoteCalldata::new(points(), FieldWord::ZERO);
    let value = serde_json::to_value(calldata).expect("Failed to serialize calldata");

    assert_eq!(value["proof"]["a"].as_array().map(|a| a.len()), Some(2));
    assert_eq!(value["proof"]["b"][0].as_array().map(|a| a.len()), Some(2));
    assert_eq!(value["proof"]["b"][1].as_array().map(|a| a.len()), Some(2));
    assert_eq!(value["inputs"].as_array().map(|a| a.len()), Some(1));

    let back: VoteCalldata = serde_json::from_value(value).expect("Failed to deserialize calldata");
    assert_eq!(back, calldata);
}

// ============================================================================
// Parity, Tally, transactions
// ============================================================================

#[test]
fn test_parity_bits_and_candidates() {
    assert_eq!(Parity::from_bit(0), Some(Parity::Even));
    assert_eq!(Parity::from_bit(1), Some(Parity::Odd));
    assert_eq!(Parity::from_bit(2), None);

    assert_eq!(Parity::Even.index(), 0);
    assert_eq!(Parity::Odd.index(), 1);
    assert_eq!(Parity::Even.candidate(), "A");
    assert_eq!(Parity::Odd.candidate(), "B");
}

#[test]
fn test_tally_display() {
    let tally = Tally::new(2, 5);
    assert_eq!(tally.to_string(), "A (even): 2, B (odd): 5");
    assert_eq!(Tally::default().total(), 0);
}

#[test]
fn test_tx_hash_display_and_short() {
    let mut bytes = [0u8; 32];
    bytes[0] = 0xab;
    bytes[31] = 0xcd;
    let hash = TxHash::new(bytes);

    assert!(hash.to_string().starts_with("0xab"));
    assert!(hash.short().starts_with("0xab000000"));
    assert!(hash.short().ends_with("00cd"));
}

#[test]
fn test_transaction_result_serialization() {
    let result = TransactionResult {
        hash: TxHash::new([7u8; 32]),
        success: false,
        block: 3,
        revert_reason: Some("invalid proof".to_string()),
    };

    let json = serde_json::to_string(&result).expect("Failed to serialize result");
    let back: TransactionResult = serde_json::from_str(&json).expect("Failed to deserialize");
    assert_eq!(back, result);
}
