//! Groth16 pairing check over BN254
//!
//! Accepts a proof `(A, B, C)` for public inputs `x` iff
//! `e(A, B) = e(α, β) · e(IC(x), γ) · e(C, δ)` where
//! `IC(x) = γ_abc[0] + Σ xᵢ · γ_abc[i + 1]`.

use crate::codec::{decode_public_input, points_to_proof, CodecError};
use crate::vk_components::VkComponents;
use ark_bn254::{Bn254, Fr, G1Affine};
use ark_ec::{pairing::Pairing, AffineRepr, CurveGroup};
use ark_groth16::{Proof, VerifyingKey};
use thiserror::Error;
use zkparity_runtime::VoteCalldata;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerifyError {
    #[error("verification key has no input bases")]
    EmptyKey,

    #[error("expected {expected} public inputs, got {got}")]
    InputCount { expected: usize, got: usize },

    #[error(transparent)]
    Codec(#[from] CodecError),
}

#[derive(Clone)]
pub struct Groth16Verifier {
    vk: VerifyingKey<Bn254>,
}

impl Groth16Verifier {
    pub fn new(vk: VerifyingKey<Bn254>) -> Result<Self, VerifyError> {
        if vk.gamma_abc_g1.is_empty() {
            return Err(VerifyError::EmptyKey);
        }
        Ok(Self { vk })
    }

    pub fn from_components(components: &VkComponents) -> Result<Self, VerifyError> {
        Self::new(components.to_verifying_key()?)
    }

    pub fn num_public_inputs(&self) -> usize {
        self.vk.gamma_abc_g1.len() - 1
    }

    pub fn verifying_key(&self) -> &VerifyingKey<Bn254> {
        &self.vk
    }

    fn input_commitment(&self, public_inputs: &[Fr]) -> G1Affine {
        let mut acc = self.vk.gamma_abc_g1[0].into_group();
        for (input, base) in public_inputs.iter().zip(self.vk.gamma_abc_g1.iter().skip(1)) {
            acc += *base * input;
        }
        acc.into_affine()
    }

    pub fn verify(&self, proof: &Proof<Bn254>, public_inputs: &[Fr]) -> Result<bool, VerifyError> {
        let expected = self.num_public_inputs();
        if public_inputs.len() != expected {
            return Err(VerifyError::InputCount { expected, got: public_inputs.len() });
        }

        let ic = self.input_commitment(public_inputs);
        let lhs = Bn254::pairing(proof.a, proof.b);
        let rhs = Bn254::multi_pairing(
            [self.vk.alpha_g1, ic, proof.c],
            [self.vk.beta_g2, self.vk.gamma_g2, self.vk.delta_g2],
        );

        Ok(lhs == rhs)
    }

    /// Decode and check a full `vote` call.
    pub fn verify_calldata(&self, calldata: &VoteCalldata) -> Result<bool, VerifyError> {
        let (_, input) = decode_public_input(&calldata.inputs[0])?;
        let proof = points_to_proof(&calldata.proof)?;
        self.verify(&proof, &[input])
    }
}
