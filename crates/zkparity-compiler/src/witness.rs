//! Witness generation
//!
//! Fills every wire of a [`CompiledCircuit`] from the private vote by running
//! the circuit's hints in order, then checks the result against each
//! constraint. The private value never reaches a log line or an error message.

use crate::circuit::{CompiledCircuit, Hint, PARITY_WIRE};
use ark_bn254::Fr;
use ark_ff::{One, Zero};
use std::fmt;
use zkparity_runtime::{Parity, Result, VoteError};

/// Full wire assignment for one private input
///
/// Not `Clone` and not serializable. Proof generation consumes it and the
/// values are overwritten on drop.
pub struct Witness {
    values: Vec<Fr>,
    parity: Parity,
    fingerprint: [u8; 32],
}

impl Witness {
    pub fn public_output(&self) -> Parity {
        self.parity
    }

    /// Public wire values in public-input order
    pub fn public_inputs(&self) -> Vec<Fr> {
        vec![self.values[PARITY_WIRE]]
    }

    pub fn num_wires(&self) -> usize {
        self.values.len()
    }

    pub fn circuit_fingerprint(&self) -> &[u8; 32] {
        &self.fingerprint
    }

    pub(crate) fn into_assignment(mut self) -> Vec<Fr> {
        std::mem::take(&mut self.values)
    }
}

impl fmt::Debug for Witness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Witness")
            .field("wires", &self.values.len())
            .field("values", &"<redacted>")
            .field("parity", &self.parity)
            .finish()
    }
}

impl Drop for Witness {
    fn drop(&mut self) {
        self.values.iter_mut().for_each(|v| *v = Fr::zero());
    }
}

/// Parse a decimal vote. Range is checked by [`compute_witness`].
pub fn parse_vote_input(input: &str) -> Result<i64> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(VoteError::input_range("vote is empty"));
    }
    if !trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return Err(VoteError::input_range("vote must be a non-negative decimal integer"));
    }
    trimmed
        .parse::<i64>()
        .map_err(|_| VoteError::input_range("vote is too large"))
}

pub fn compute_witness(circuit: &CompiledCircuit, private_input: i64) -> Result<Witness> {
    let max = circuit.max_input();
    let input = u64::try_from(private_input)
        .ok()
        .filter(|v| *v <= max)
        .ok_or_else(|| VoteError::input_range(format!("vote must be an integer in [0, {}]", max)))?;

    let mut raw = vec![0u64; circuit.num_wires()];
    raw[0] = 1;
    for hint in circuit.hints() {
        match *hint {
            Hint::Input { wire } => raw[wire] = input,
            Hint::Bit { of, index, wire } => raw[wire] = (raw[of] >> index) & 1,
            Hint::Copy { from, to } => raw[to] = raw[from],
        }
    }

    let values: Vec<Fr> = raw.iter().map(|&v| Fr::from(v)).collect();
    let parity = Parity::from_bit(raw[PARITY_WIRE]);
    raw.iter_mut().for_each(|v| *v = 0);

    let witness = Witness {
        values,
        parity: parity.ok_or_else(|| VoteError::circuit("parity wire is not a bit"))?,
        fingerprint: *circuit.fingerprint(),
    };

    debug_assert_eq!(witness.values[0], Fr::one());
    if let Some(index) = circuit.first_unsatisfied(&witness.values) {
        return Err(VoteError::circuit(format!("constraint {} is not satisfied", index)));
    }

    tracing::debug!(wires = witness.num_wires(), "Witness computed");
    Ok(witness)
}
