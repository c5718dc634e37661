//! Verifier & tally contract
//!
//! Holds an embedded verification key and two public counters. A `vote` call
//! either passes every check and increments exactly one counter, or it is
//! rejected and the state is left untouched.

use crate::codec::{decode_public_input, points_to_proof};
use crate::verifier::{Groth16Verifier, VerifyError};
use crate::vk_components::VkComponents;
use blake2::{Blake2s256, Digest};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;
use tracing::{debug, info, warn};
use zkparity_runtime::{Parity, Tally, VoteCalldata};

/// Why the contract reverted a call
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum VerificationRejected {
    #[error("malformed public input: {0}")]
    MalformedPublicInput(String),

    #[error("malformed proof: {0}")]
    MalformedProof(String),

    #[error("proof already accepted")]
    ReplayedProof,

    #[error("invalid proof")]
    InvalidProof,

    #[error("tally counter overflow")]
    TallyOverflow,

    #[error("invalid counter index {0}")]
    InvalidIndex(u32),

    #[error("invalid verification key: {0}")]
    InvalidVerificationKey(String),

    #[error("corrupt contract state: {0}")]
    CorruptState(String),
}

/// Persistent contract storage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TallyState {
    pub verification_key: VkComponents,
    pub even_count: u64,
    pub odd_count: u64,
    /// Hex digests of every accepted calldata
    pub accepted: Vec<String>,
}

#[derive(Clone)]
pub struct VoteTally {
    components: VkComponents,
    verifier: Groth16Verifier,
    even_count: u64,
    odd_count: u64,
    accepted: BTreeSet<[u8; 32]>,
}

fn calldata_digest(calldata: &VoteCalldata) -> [u8; 32] {
    Blake2s256::digest(calldata.to_bytes()).into()
}

impl VoteTally {
    /// Deploy a fresh contract with both counters at zero.
    pub fn deploy(components: VkComponents) -> Result<Self, VerificationRejected> {
        let verifier = Groth16Verifier::from_components(&components)
            .map_err(|e| VerificationRejected::InvalidVerificationKey(e.to_string()))?;

        if verifier.num_public_inputs() != 1 {
            return Err(VerificationRejected::InvalidVerificationKey(format!(
                "expected 1 public input, key has {}",
                verifier.num_public_inputs()
            )));
        }

        Ok(Self { components, verifier, even_count: 0, odd_count: 0, accepted: BTreeSet::new() })
    }

    /// Rebuild a contract from stored state.
    ///
    /// The counters must add up to the number of distinct accepted digests.
    pub fn restore(state: TallyState) -> Result<Self, VerificationRejected> {
        let mut tally = Self::deploy(state.verification_key)?;

        for digest_hex in &state.accepted {
            let bytes = hex::decode(digest_hex)
                .map_err(|e| VerificationRejected::CorruptState(e.to_string()))?;
            let digest: [u8; 32] = bytes.try_into().map_err(|_| {
                VerificationRejected::CorruptState("digest must be 32 bytes".to_string())
            })?;
            if !tally.accepted.insert(digest) {
                return Err(VerificationRejected::CorruptState(format!(
                    "duplicate accepted digest {}",
                    digest_hex
                )));
            }
        }

        let total = state.even_count.checked_add(state.odd_count).ok_or_else(|| {
            VerificationRejected::CorruptState("counter total overflows".to_string())
        })?;
        if total != tally.accepted.len() as u64 {
            return Err(VerificationRejected::CorruptState(format!(
                "counters total {} but {} proofs accepted",
                total,
                tally.accepted.len()
            )));
        }

        tally.even_count = state.even_count;
        tally.odd_count = state.odd_count;
        Ok(tally)
    }

    #[cfg(test)]
    pub(crate) fn with_counts(mut self, even: u64, odd: u64) -> Self {
        self.even_count = even;
        self.odd_count = odd;
        self
    }

    pub fn snapshot(&self) -> TallyState {
        TallyState {
            verification_key: self.components.clone(),
            even_count: self.even_count,
            odd_count: self.odd_count,
            accepted: self.accepted.iter().map(hex::encode).collect(),
        }
    }

    /// Verify a proof and count it.
    pub fn vote(&mut self, calldata: &VoteCalldata) -> Result<Parity, VerificationRejected> {
        let (parity, input) = decode_public_input(&calldata.inputs[0])
            .map_err(|e| VerificationRejected::MalformedPublicInput(e.to_string()))?;

        let proof = points_to_proof(&calldata.proof)
            .map_err(|e| VerificationRejected::MalformedProof(e.to_string()))?;

        let digest = calldata_digest(calldata);
        if self.accepted.contains(&digest) {
            warn!(digest = %hex::encode(digest), "Rejected replayed proof");
            return Err(VerificationRejected::ReplayedProof);
        }

        match self.verifier.verify(&proof, &[input]) {
            Ok(true) => {}
            Ok(false) => {
                debug!(%parity, "Pairing check failed");
                return Err(VerificationRejected::InvalidProof);
            }
            Err(VerifyError::Codec(e)) => {
                return Err(VerificationRejected::MalformedProof(e.to_string()))
            }
            Err(e) => return Err(VerificationRejected::MalformedPublicInput(e.to_string())),
        }

        let counter = match parity {
            Parity::Even => &mut self.even_count,
            Parity::Odd => &mut self.odd_count,
        };
        let next = counter.checked_add(1).ok_or(VerificationRejected::TallyOverflow)?;

        self.accepted.insert(digest);
        *counter = next;

        info!(%parity, even = self.even_count, odd = self.odd_count, "Vote counted");
        Ok(parity)
    }

    /// Counter by index: 0 is even, 1 is odd.
    pub fn votes(&self, index: u32) -> Result<u64, VerificationRejected> {
        match index {
            0 => Ok(self.even_count),
            1 => Ok(self.odd_count),
            other => Err(VerificationRejected::InvalidIndex(other)),
        }
    }

    pub fn tally(&self) -> Tally {
        Tally::new(self.even_count, self.odd_count)
    }

    pub fn accepted_count(&self) -> usize {
        self.accepted.len()
    }

    pub fn verification_key(&self) -> &VkComponents {
        &self.components
    }
}
