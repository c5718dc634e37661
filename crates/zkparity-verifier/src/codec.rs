//! Word-level codec between BN254 elements and `vote` calldata
//!
//! Every coordinate travels as a 32-byte big-endian word. G2 coordinates are
//! elements of Fq2 and are written imaginary part first. The point at infinity
//! is all zeros. Decoding is strict: each word must be a canonical field
//! element and each point must lie on its curve and in the prime-order
//! subgroup.

use ark_bn254::{Bn254, Fq, Fq2, Fr, G1Affine, G2Affine};
use ark_ec::AffineRepr;
use ark_ff::{BigInt, BigInteger, PrimeField};
use ark_groth16::Proof;
use thiserror::Error;
use zkparity_runtime::{FieldWord, Parity, ProofPoints, VoteCalldata, WORD_SIZE};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("word {0} is not a canonical field element")]
    NonCanonical(String),

    #[error("point {0} is not on the curve")]
    NotOnCurve(&'static str),

    #[error("point {0} is not in the prime-order subgroup")]
    WrongSubgroup(&'static str),

    #[error("public input must be 0 or 1, got {0}")]
    PublicInput(String),
}

pub fn field_to_word<F: PrimeField>(value: &F) -> FieldWord {
    let bytes = value.into_bigint().to_bytes_be();
    let mut word = [0u8; WORD_SIZE];
    let take = bytes.len().min(WORD_SIZE);
    word[WORD_SIZE - take..].copy_from_slice(&bytes[bytes.len() - take..]);
    FieldWord::new(word)
}

/// Decode a word, rejecting values at or above the field modulus.
pub fn word_to_field<F: PrimeField<BigInt = BigInt<4>>>(word: &FieldWord) -> Result<F, CodecError> {
    let mut limbs = [0u64; 4];
    for (limb, chunk) in limbs.iter_mut().zip(word.as_bytes().rchunks(8)) {
        let mut buf = [0u8; 8];
        buf.copy_from_slice(chunk);
        *limb = u64::from_be_bytes(buf);
    }
    F::from_bigint(BigInt::new(limbs)).ok_or_else(|| CodecError::NonCanonical(word.to_hex()))
}

pub fn g1_to_words(point: &G1Affine) -> [FieldWord; 2] {
    if point.infinity {
        return [FieldWord::ZERO; 2];
    }
    [field_to_word(&point.x), field_to_word(&point.y)]
}

pub fn g1_from_words(words: &[FieldWord; 2], label: &'static str) -> Result<G1Affine, CodecError> {
    if words.iter().all(FieldWord::is_zero) {
        return Ok(<G1Affine as AffineRepr>::zero());
    }

    let x: Fq = word_to_field(&words[0])?;
    let y: Fq = word_to_field(&words[1])?;
    let point = G1Affine::new_unchecked(x, y);

    if !point.is_on_curve() {
        return Err(CodecError::NotOnCurve(label));
    }
    if !point.is_in_correct_subgroup_assuming_on_curve() {
        return Err(CodecError::WrongSubgroup(label));
    }
    Ok(point)
}

pub fn g2_to_words(point: &G2Affine) -> [[FieldWord; 2]; 2] {
    if point.infinity {
        return [[FieldWord::ZERO; 2]; 2];
    }
    [
        [field_to_word(&point.x.c1), field_to_word(&point.x.c0)],
        [field_to_word(&point.y.c1), field_to_word(&point.y.c0)],
    ]
}

pub fn g2_from_words(
    words: &[[FieldWord; 2]; 2],
    label: &'static str,
) -> Result<G2Affine, CodecError> {
    if words.iter().flatten().all(FieldWord::is_zero) {
        return Ok(<G2Affine as AffineRepr>::zero());
    }

    let x = Fq2::new(word_to_field(&words[0][1])?, word_to_field(&words[0][0])?);
    let y = Fq2::new(word_to_field(&words[1][1])?, word_to_field(&words[1][0])?);
    let point = G2Affine::new_unchecked(x, y);

    if !point.is_on_curve() {
        return Err(CodecError::NotOnCurve(label));
    }
    // The G2 cofactor is not one, so on-curve points can still be outside the subgroup.
    if !point.is_in_correct_subgroup_assuming_on_curve() {
        return Err(CodecError::WrongSubgroup(label));
    }
    Ok(point)
}

pub fn proof_to_points(proof: &Proof<Bn254>) -> ProofPoints {
    ProofPoints { a: g1_to_words(&proof.a), b: g2_to_words(&proof.b), c: g1_to_words(&proof.c) }
}

pub fn points_to_proof(points: &ProofPoints) -> Result<Proof<Bn254>, CodecError> {
    Ok(Proof {
        a: g1_from_words(&points.a, "a")?,
        b: g2_from_words(&points.b, "b")?,
        c: g1_from_words(&points.c, "c")?,
    })
}

/// Package a proof and its parity output as `vote` arguments.
pub fn encode_calldata(proof: &Proof<Bn254>, parity: Parity) -> VoteCalldata {
    VoteCalldata::new(proof_to_points(proof), FieldWord::from_u64(parity.bit()))
}

/// Read the public input word, accepting only 0 and 1.
pub fn decode_public_input(word: &FieldWord) -> Result<(Parity, Fr), CodecError> {
    let parity = word
        .to_u64()
        .and_then(Parity::from_bit)
        .ok_or_else(|| CodecError::PublicInput(word.to_hex()))?;
    Ok((parity, Fr::from(parity.bit())))
}
