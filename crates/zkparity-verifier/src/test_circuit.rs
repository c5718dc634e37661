//! One-bit circuit used to produce real proofs in unit tests.

use ark_bn254::{Bn254, Fr};
use ark_groth16::{Groth16, Proof, ProvingKey, VerifyingKey};
use ark_relations::{
    lc,
    r1cs::{ConstraintSynthesizer, ConstraintSystemRef, SynthesisError, Variable},
};
use ark_snark::SNARK;
use rand::rngs::StdRng;

/// Public `p`, private `b`: `b·b = b` and `b·1 = p`.
#[derive(Clone, Copy)]
pub struct BitCircuit {
    bit: Option<bool>,
}

impl BitCircuit {
    pub fn new(bit: bool) -> Self {
        Self { bit: Some(bit) }
    }

    pub fn blank() -> Self {
        Self { bit: None }
    }
}

impl ConstraintSynthesizer<Fr> for BitCircuit {
    fn generate_constraints(self, cs: ConstraintSystemRef<Fr>) -> Result<(), SynthesisError> {
        let value = self.bit.map(|b| Fr::from(b as u64));
        let public = cs.new_input_variable(|| value.ok_or(SynthesisError::AssignmentMissing))?;
        let private = cs.new_witness_variable(|| value.ok_or(SynthesisError::AssignmentMissing))?;

        cs.enforce_constraint(lc!() + private, lc!() + private, lc!() + private)?;
        cs.enforce_constraint(lc!() + private, lc!() + Variable::One, lc!() + public)?;
        Ok(())
    }
}

pub fn setup(rng: &mut StdRng) -> (ProvingKey<Bn254>, VerifyingKey<Bn254>) {
    Groth16::<Bn254>::circuit_specific_setup(BitCircuit::blank(), rng).unwrap()
}

pub fn prove(pk: &ProvingKey<Bn254>, circuit: BitCircuit, rng: &mut StdRng) -> Proof<Bn254> {
    Groth16::<Bn254>::prove(pk, circuit, rng).unwrap()
}
