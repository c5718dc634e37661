//! VK Components - the verification key as it is embedded in the tally contract

use crate::codec::{g1_from_words, g1_to_words, g2_from_words, g2_to_words, CodecError};
use ark_bn254::Bn254;
use ark_groth16::VerifyingKey;
use blake2::{Blake2s256, Digest};
use serde::{Deserialize, Serialize};
use zkparity_runtime::FieldWord;

/// Serializable Groth16 verification key, stored as calldata-style words.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VkComponents {
    pub alpha_g1: [FieldWord; 2],
    pub beta_g2: [[FieldWord; 2]; 2],
    pub gamma_g2: [[FieldWord; 2]; 2],
    pub delta_g2: [[FieldWord; 2]; 2],
    /// Input commitment bases; one more than the number of public inputs
    pub gamma_abc_g1: Vec<[FieldWord; 2]>,
}

impl VkComponents {
    pub fn from_verifying_key(vk: &VerifyingKey<Bn254>) -> Self {
        Self {
            alpha_g1: g1_to_words(&vk.alpha_g1),
            beta_g2: g2_to_words(&vk.beta_g2),
            gamma_g2: g2_to_words(&vk.gamma_g2),
            delta_g2: g2_to_words(&vk.delta_g2),
            gamma_abc_g1: vk.gamma_abc_g1.iter().map(g1_to_words).collect(),
        }
    }

    pub fn to_verifying_key(&self) -> Result<VerifyingKey<Bn254>, CodecError> {
        Ok(VerifyingKey {
            alpha_g1: g1_from_words(&self.alpha_g1, "alpha")?,
            beta_g2: g2_from_words(&self.beta_g2, "beta")?,
            gamma_g2: g2_from_words(&self.gamma_g2, "gamma")?,
            delta_g2: g2_from_words(&self.delta_g2, "delta")?,
            gamma_abc_g1: self
                .gamma_abc_g1
                .iter()
                .map(|words| g1_from_words(words, "gamma_abc"))
                .collect::<Result<Vec<_>, _>>()?,
        })
    }

    pub fn num_public_inputs(&self) -> usize {
        self.gamma_abc_g1.len().saturating_sub(1)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, postcard::Error> {
        postcard::to_allocvec(self)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, postcard::Error> {
        postcard::from_bytes(bytes)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// BLAKE2s digest of the compact encoding, used to identify a deployment.
    pub fn key_id(&self) -> Result<String, postcard::Error> {
        let digest = Blake2s256::digest(self.to_bytes()?);
        Ok(hex::encode(digest))
    }
}
