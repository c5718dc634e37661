//! Native Groth16 prover for the parity circuit
//!
//! Proofs are generated off-ledger with fresh blinding randomness per proof,
//! so two proofs for the same public parity never share their points.

use super::keys::KeyBlob;
use crate::circuit::CompiledCircuit;
use crate::witness::{compute_witness, Witness};
use ark_bn254::{Bn254, Fr};
use ark_groth16::{Groth16, PreparedVerifyingKey, Proof};
use ark_snark::SNARK;
use rand::{CryptoRng, RngCore};
use tracing::{debug, info};
use zkparity_runtime::{Parity, Result, VoteCalldata, VoteError};
use zkparity_verifier::{codec::encode_calldata, VkComponents};

/// A Groth16 proof with its public inputs
#[derive(Debug, Clone, PartialEq)]
pub struct VoteProof {
    pub proof: Proof<Bn254>,
    pub public_inputs: Vec<Fr>,
    pub parity: Parity,
}

impl VoteProof {
    pub fn to_calldata(&self) -> VoteCalldata {
        encode_calldata(&self.proof, self.parity)
    }
}

/// Prove that `witness` satisfies `circuit`, consuming the witness.
pub fn generate_proof<R: RngCore + CryptoRng>(
    circuit: &CompiledCircuit,
    witness: Witness,
    proving_key: &KeyBlob,
    rng: &mut R,
) -> Result<VoteProof> {
    proving_key.check_circuit(circuit)?;

    if witness.circuit_fingerprint() != circuit.fingerprint() {
        return Err(VoteError::circuit("witness was computed for a different circuit"));
    }

    let parity = witness.public_output();
    let public_inputs = witness.public_inputs();
    let assignment = witness.into_assignment();

    let proof =
        Groth16::<Bn254>::prove(proving_key.proving_key(), circuit.synthesizer(Some(assignment)), rng)
            .map_err(|e| VoteError::proof_generation(format!("Failed to create proof: {}", e)))?;

    debug!(%parity, "Proof generated");
    Ok(VoteProof { proof, public_inputs, parity })
}

pub struct NativeProver {
    circuit: CompiledCircuit,
    key: KeyBlob,
    prepared_vk: PreparedVerifyingKey<Bn254>,
}

impl NativeProver {
    pub fn new(circuit: CompiledCircuit, key: KeyBlob) -> Result<Self> {
        key.check_circuit(&circuit)?;

        let prepared_vk = <Groth16<Bn254> as SNARK<Fr>>::process_vk(key.verifying_key())
            .map_err(|e| VoteError::proving_key(format!("Failed to prepare verifying key: {}", e)))?;

        info!(circuit = circuit.name(), fingerprint = %circuit.fingerprint_hex(), "Prover ready");
        Ok(Self { circuit, key, prepared_vk })
    }

    pub fn from_base64(circuit: CompiledCircuit, proving_key_base64: &str) -> Result<Self> {
        Self::new(circuit, KeyBlob::from_base64(proving_key_base64)?)
    }

    pub fn circuit(&self) -> &CompiledCircuit {
        &self.circuit
    }

    pub fn key(&self) -> &KeyBlob {
        &self.key
    }

    pub fn verification_key(&self) -> VkComponents {
        self.key.verification_components()
    }

    /// Compute the witness for `private_input` and prove it.
    pub fn prove<R: RngCore + CryptoRng>(&self, private_input: i64, rng: &mut R) -> Result<VoteProof> {
        let witness = compute_witness(&self.circuit, private_input)?;
        generate_proof(&self.circuit, witness, &self.key, rng)
    }

    /// Off-ledger check with the arkworks verifier.
    pub fn verify(&self, proof: &VoteProof) -> Result<bool> {
        <Groth16<Bn254> as SNARK<Fr>>::verify_with_processed_vk(
            &self.prepared_vk,
            &proof.public_inputs,
            &proof.proof,
        )
        .map_err(|e| VoteError::proof_generation(format!("Verification failed: {}", e)))
    }
}
