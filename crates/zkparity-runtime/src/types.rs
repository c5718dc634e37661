//! Core types for the zkparity toolkit
//!
//! This module defines the data that crosses component boundaries: the
//! byte-exact `vote` calldata, the parity of a ballot, the public tally and
//! transaction outcomes. Nothing here knows about curves or fields; the
//! verifier crate owns the mapping between these words and BN254 elements.

use crate::error::{Result, VoteError};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Size in bytes of one calldata word
pub const WORD_SIZE: usize = 32;

/// Number of words in a `vote` call: a(2) + b(4) + c(2) + inputs(1)
pub const CALLDATA_WORDS: usize = 9;

/// Size in bytes of an encoded `vote` call
pub const CALLDATA_SIZE: usize = CALLDATA_WORDS * WORD_SIZE;

/// A 32-byte big-endian unsigned integer, the unit of the submission interface
///
/// Serialized as a `0x`-prefixed lowercase hex string so proofs read the same
/// in JSON as they do in a block explorer.
///
/// # Examples
///
/// ```
/// use zkparity_runtime::FieldWord;
///
/// let one = FieldWord::from_u64(1);
/// assert_eq!(one.as_bytes()[31], 1);
/// assert!(FieldWord::ZERO.is_zero());
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct FieldWord([u8; WORD_SIZE]);

impl FieldWord {
    pub const ZERO: FieldWord = FieldWord([0u8; WORD_SIZE]);

    pub fn new(bytes: [u8; WORD_SIZE]) -> Self {
        Self(bytes)
    }

    pub fn from_u64(value: u64) -> Self {
        let mut bytes = [0u8; WORD_SIZE];
        bytes[WORD_SIZE - 8..].copy_from_slice(&value.to_be_bytes());
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; WORD_SIZE] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|&b| b == 0)
    }

    /// Returns the value if it fits in a `u64`.
    pub fn to_u64(&self) -> Option<u64> {
        if self.0[..WORD_SIZE - 8].iter().any(|&b| b != 0) {
            return None;
        }
        let mut tail = [0u8; 8];
        tail.copy_from_slice(&self.0[WORD_SIZE - 8..]);
        Some(u64::from_be_bytes(tail))
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    /// Parse a hex word, with or without `0x`, left-padding short values.
    pub fn from_hex(s: &str) -> Result<Self> {
        let digits = s.strip_prefix("0x").unwrap_or(s);
        if digits.is_empty() || digits.len() > WORD_SIZE * 2 {
            return Err(VoteError::serialization(format!(
                "word must have 1..=64 hex digits, got {}",
                digits.len()
            )));
        }
        let padded = format!("{:0>64}", digits);
        let bytes = hex::decode(&padded)
            .map_err(|e| VoteError::serialization(format!("invalid hex word: {}", e)))?;
        let mut word = [0u8; WORD_SIZE];
        word.copy_from_slice(&bytes);
        Ok(Self(word))
    }
}

impl fmt::Debug for FieldWord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FieldWord({})", self.to_hex())
    }
}

impl fmt::Display for FieldWord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for FieldWord {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for FieldWord {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        FieldWord::from_hex(&s).map_err(de::Error::custom)
    }
}

/// Affine coordinates of the three Groth16 proof elements
///
/// `b` is a G2 point whose coordinates live in Fq2; each coordinate is laid
/// out imaginary part first (`[c1, c0]`), the order expected by the EVM
/// pairing precompile.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProofPoints {
    pub a: [FieldWord; 2],
    pub b: [[FieldWord; 2]; 2],
    pub c: [FieldWord; 2],
}

/// Arguments of one `vote(a, b, c, inputs)` call
///
/// # Examples
///
/// ```
/// use zkparity_runtime::{FieldWord, ProofPoints, VoteCalldata, CALLDATA_SIZE};
///
/// let points = ProofPoints {
///     a: [FieldWord::from_u64(1), FieldWord::from_u64(2)],
///     b: [[FieldWord::ZERO; 2]; 2],
///     c: [FieldWord::from_u64(1), FieldWord::from_u64(2)],
/// };
/// let calldata = VoteCalldata::new(points, FieldWord::from_u64(1));
/// assert_eq!(calldata.to_bytes().len(), CALLDATA_SIZE);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VoteCalldata {
    pub proof: ProofPoints,
    pub inputs: [FieldWord; 1],
}

impl VoteCalldata {
    pub fn new(proof: ProofPoints, parity_input: FieldWord) -> Self {
        Self { proof, inputs: [parity_input] }
    }

    fn words(&self) -> [&FieldWord; CALLDATA_WORDS] {
        let p = &self.proof;
        [
            &p.a[0], &p.a[1], &p.b[0][0], &p.b[0][1], &p.b[1][0], &p.b[1][1], &p.c[0], &p.c[1],
            &self.inputs[0],
        ]
    }

    /// Encode as `a.x ‖ a.y ‖ b.x ‖ b.y ‖ c.x ‖ c.y ‖ input`, 288 bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(CALLDATA_SIZE);
        for word in self.words() {
            out.extend_from_slice(word.as_bytes());
        }
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != CALLDATA_SIZE {
            return Err(VoteError::serialization(format!(
                "calldata must be {} bytes, got {}",
                CALLDATA_SIZE,
                bytes.len()
            )));
        }

        let mut words = [FieldWord::ZERO; CALLDATA_WORDS];
        for (word, chunk) in words.iter_mut().zip(bytes.chunks_exact(WORD_SIZE)) {
            let mut raw = [0u8; WORD_SIZE];
            raw.copy_from_slice(chunk);
            *word = FieldWord::new(raw);
        }

        Ok(Self {
            proof: ProofPoints {
                a: [words[0], words[1]],
                b: [[words[2], words[3]], [words[4], words[5]]],
                c: [words[6], words[7]],
            },
            inputs: [words[8]],
        })
    }

    /// The public parity claimed by this call, if the input word is 0 or 1.
    pub fn claimed_parity(&self) -> Option<Parity> {
        self.inputs[0].to_u64().and_then(Parity::from_bit)
    }
}

/// Which counter a ballot lands in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Parity {
    /// Public output 0, candidate A
    Even,
    /// Public output 1, candidate B
    Odd,
}

impl Parity {
    pub fn of(value: u8) -> Self {
        if value & 1 == 0 {
            Parity::Even
        } else {
            Parity::Odd
        }
    }

    pub fn from_bit(bit: u64) -> Option<Self> {
        match bit {
            0 => Some(Parity::Even),
            1 => Some(Parity::Odd),
            _ => None,
        }
    }

    pub fn bit(self) -> u64 {
        match self {
            Parity::Even => 0,
            Parity::Odd => 1,
        }
    }

    /// Counter index used by `votes(index)`
    pub fn index(self) -> u32 {
        self.bit() as u32
    }

    pub fn candidate(self) -> &'static str {
        match self {
            Parity::Even => "A",
            Parity::Odd => "B",
        }
    }
}

impl fmt::Display for Parity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Parity::Even => write!(f, "even (candidate A)"),
            Parity::Odd => write!(f, "odd (candidate B)"),
        }
    }
}

/// The two public counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tally {
    pub even: u64,
    pub odd: u64,
}

impl Tally {
    pub fn new(even: u64, odd: u64) -> Self {
        Self { even, odd }
    }

    pub fn total(&self) -> u64 {
        self.even.saturating_add(self.odd)
    }

    pub fn count(&self, parity: Parity) -> u64 {
        match parity {
            Parity::Even => self.even,
            Parity::Odd => self.odd,
        }
    }
}

impl fmt::Display for Tally {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "A (even): {}, B (odd): {}", self.even, self.odd)
    }
}

/// Transaction identifier assigned by the ledger
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TxHash([u8; 32]);

impl TxHash {
    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    pub fn from_hex(s: &str) -> Result<Self> {
        Ok(TxHash(*FieldWord::from_hex(s)?.as_bytes()))
    }

    /// Shortened form for status lines, e.g. `0x1234abcd…9f0e`
    pub fn short(&self) -> String {
        let full = self.to_hex();
        format!("{}…{}", &full[..10], &full[full.len() - 4..])
    }
}

impl fmt::Debug for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TxHash({})", self.to_hex())
    }
}

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for TxHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for TxHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        TxHash::from_hex(&s).map_err(de::Error::custom)
    }
}

/// Terminal outcome of a submitted transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionResult {
    pub hash: TxHash,
    pub success: bool,
    pub block: u64,
    pub revert_reason: Option<String>,
}
