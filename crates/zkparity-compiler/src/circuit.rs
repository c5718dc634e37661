//! Compiled R1CS form of the parity circuit
//!
//! Wire layout:
//!
//! | wire      | role                          |
//! |-----------|-------------------------------|
//! | 0         | constant one                  |
//! | 1         | parity (public)               |
//! | 2         | vote (private)                |
//! | 3..3+n    | bits `b0..b(n-1)` (private)   |
//!
//! Constraints, each `⟨A,w⟩·⟨B,w⟩ = ⟨C,w⟩`:
//! `bᵢ·bᵢ = bᵢ` for every bit, `(Σ 2ⁱ·bᵢ)·1 = vote`, `b0·1 = parity`.

use crate::ast::CircuitIR;
use crate::error::{CircuitError, Result};
use ark_bn254::Fr;
use ark_ff::{One, Zero};
use ark_relations::{
    lc,
    r1cs::{ConstraintSynthesizer, ConstraintSystemRef, LinearCombination, SynthesisError, Variable},
};
use blake2::{Blake2s256, Digest};
use serde::Serialize;

pub const ONE_WIRE: usize = 0;
pub const PARITY_WIRE: usize = 1;
pub const VOTE_WIRE: usize = 2;
pub const FIRST_BIT_WIRE: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Term {
    pub wire: usize,
    pub coeff: u64,
}

impl Term {
    fn wire(wire: usize) -> Self {
        Self { wire, coeff: 1 }
    }
}

/// One row `⟨a,w⟩·⟨b,w⟩ = ⟨c,w⟩`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct R1csRow {
    pub a: Vec<Term>,
    pub b: Vec<Term>,
    pub c: Vec<Term>,
}

/// How the witness generator fills a wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Hint {
    /// Copy the private input
    Input { wire: usize },
    /// Bit `index` of the value on wire `of`
    Bit { of: usize, index: u32, wire: usize },
    Copy { from: usize, to: usize },
}

#[derive(Serialize)]
struct CanonicalForm<'a> {
    name: &'a str,
    version: u32,
    bits: u32,
    num_wires: usize,
    public_wires: &'a [usize],
    constraints: &'a [R1csRow],
    hints: &'a [Hint],
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledCircuit {
    name: String,
    version: u32,
    bits: u32,
    num_wires: usize,
    public_wires: Vec<usize>,
    constraints: Vec<R1csRow>,
    hints: Vec<Hint>,
    fingerprint: [u8; 32],
}

impl CompiledCircuit {
    pub fn from_ir(ir: &CircuitIR) -> Result<Self> {
        let bits = ir.range_bits();
        let bit_wire = |i: u32| FIRST_BIT_WIRE + i as usize;
        let num_wires = FIRST_BIT_WIRE + bits as usize;

        let mut constraints = Vec::with_capacity(bits as usize + 2);
        for i in 0..bits {
            let b = Term::wire(bit_wire(i));
            constraints.push(R1csRow { a: vec![b], b: vec![b], c: vec![b] });
        }
        constraints.push(R1csRow {
            a: (0..bits).map(|i| Term { wire: bit_wire(i), coeff: 1u64 << i }).collect(),
            b: vec![Term::wire(ONE_WIRE)],
            c: vec![Term::wire(VOTE_WIRE)],
        });
        constraints.push(R1csRow {
            a: vec![Term::wire(bit_wire(0))],
            b: vec![Term::wire(ONE_WIRE)],
            c: vec![Term::wire(PARITY_WIRE)],
        });

        let mut hints = vec![Hint::Input { wire: VOTE_WIRE }];
        hints.extend((0..bits).map(|index| Hint::Bit { of: VOTE_WIRE, index, wire: bit_wire(index) }));
        hints.push(Hint::Copy { from: bit_wire(0), to: PARITY_WIRE });

        let mut circuit = Self {
            name: ir.name.clone(),
            version: ir.version,
            bits,
            num_wires,
            public_wires: vec![PARITY_WIRE],
            constraints,
            hints,
            fingerprint: [0u8; 32],
        };
        circuit.fingerprint = circuit.compute_fingerprint()?;
        Ok(circuit)
    }

    fn compute_fingerprint(&self) -> Result<[u8; 32]> {
        let canonical = CanonicalForm {
            name: &self.name,
            version: self.version,
            bits: self.bits,
            num_wires: self.num_wires,
            public_wires: &self.public_wires,
            constraints: &self.constraints,
            hints: &self.hints,
        };
        let encoded = bincode::serialize(&canonical)
            .map_err(|e| CircuitError::Encoding(format!("Failed to encode circuit: {}", e)))?;
        Ok(Blake2s256::digest(&encoded).into())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn bits(&self) -> u32 {
        self.bits
    }

    /// Largest accepted private input
    pub fn max_input(&self) -> u64 {
        (1u64 << self.bits) - 1
    }

    pub fn num_wires(&self) -> usize {
        self.num_wires
    }

    pub fn num_constraints(&self) -> usize {
        self.constraints.len()
    }

    pub fn num_public(&self) -> usize {
        self.public_wires.len()
    }

    /// Wires other than the constant one and the public outputs
    pub fn num_private(&self) -> usize {
        self.num_wires - 1 - self.public_wires.len()
    }

    pub fn public_wires(&self) -> &[usize] {
        &self.public_wires
    }

    pub fn constraints(&self) -> &[R1csRow] {
        &self.constraints
    }

    pub fn hints(&self) -> &[Hint] {
        &self.hints
    }

    pub fn fingerprint(&self) -> &[u8; 32] {
        &self.fingerprint
    }

    pub fn fingerprint_hex(&self) -> String {
        hex::encode(self.fingerprint)
    }

    fn evaluate(terms: &[Term], assignment: &[Fr]) -> Fr {
        terms.iter().fold(Fr::zero(), |acc, term| {
            acc + Fr::from(term.coeff) * assignment.get(term.wire).copied().unwrap_or_default()
        })
    }

    /// Index of the first constraint the assignment violates.
    pub fn first_unsatisfied(&self, assignment: &[Fr]) -> Option<usize> {
        if assignment.len() != self.num_wires || assignment.first() != Some(&Fr::one()) {
            return Some(0);
        }
        self.constraints.iter().position(|row| {
            Self::evaluate(&row.a, assignment) * Self::evaluate(&row.b, assignment)
                != Self::evaluate(&row.c, assignment)
        })
    }

    pub fn is_satisfied(&self, assignment: &[Fr]) -> bool {
        self.first_unsatisfied(assignment).is_none()
    }

    /// Arkworks view of this circuit; `None` is used for key generation.
    pub fn synthesizer(&self, assignment: Option<Vec<Fr>>) -> VoteCircuit<'_> {
        VoteCircuit { circuit: self, assignment }
    }
}

/// Replays the compiled constraint list into an arkworks constraint system
pub struct VoteCircuit<'a> {
    circuit: &'a CompiledCircuit,
    assignment: Option<Vec<Fr>>,
}

fn to_lc(terms: &[Term], vars: &[Variable]) -> std::result::Result<LinearCombination<Fr>, SynthesisError> {
    let mut combination = lc!();
    for term in terms {
        let var = *vars.get(term.wire).ok_or(SynthesisError::AssignmentMissing)?;
        combination = combination + (Fr::from(term.coeff), var);
    }
    Ok(combination)
}

impl ConstraintSynthesizer<Fr> for VoteCircuit<'_> {
    fn generate_constraints(self, cs: ConstraintSystemRef<Fr>) -> std::result::Result<(), SynthesisError> {
        let circuit = self.circuit;
        let value = |wire: usize| {
            self.assignment
                .as_ref()
                .and_then(|values| values.get(wire).copied())
                .ok_or(SynthesisError::AssignmentMissing)
        };

        let mut vars = Vec::with_capacity(circuit.num_wires);
        vars.push(Variable::One);
        for wire in 1..circuit.num_wires {
            let var = if circuit.public_wires.contains(&wire) {
                cs.new_input_variable(|| value(wire))?
            } else {
                cs.new_witness_variable(|| value(wire))?
            };
            vars.push(var);
        }

        for row in &circuit.constraints {
            cs.enforce_constraint(to_lc(&row.a, &vars)?, to_lc(&row.b, &vars)?, to_lc(&row.c, &vars)?)?;
        }
        Ok(())
    }
}

impl Drop for VoteCircuit<'_> {
    fn drop(&mut self) {
        if let Some(values) = self.assignment.as_mut() {
            values.iter_mut().for_each(|v| *v = Fr::zero());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compile_default;
    use ark_relations::r1cs::ConstraintSystem;

    fn assignment_for(v: u64) -> Vec<Fr> {
        let mut values = vec![Fr::one(), Fr::from(v & 1), Fr::from(v)];
        values.extend((0..8).map(|i| Fr::from((v >> i) & 1)));
        values
    }

    #[test]
    fn test_layout_counts() {
        let circuit = compile_default().unwrap();
        assert_eq!(circuit.num_wires(), 11);
        assert_eq!(circuit.num_constraints(), 10);
        assert_eq!(circuit.num_public(), 1);
        assert_eq!(circuit.num_private(), 9);
        assert_eq!(circuit.max_input(), 255);
    }

    #[test]
    fn test_recomposition_coefficients() {
        let circuit = compile_default().unwrap();
        let row = &circuit.constraints()[8];
        let coeffs: Vec<u64> = row.a.iter().map(|t| t.coeff).collect();
        assert_eq!(coeffs, vec![1, 2, 4, 8, 16, 32, 64, 128]);
        assert_eq!(row.c, vec![Term::wire(VOTE_WIRE)]);
    }

    #[test]
    fn test_manual_assignment_satisfies() {
        let circuit = compile_default().unwrap();
        assert!(circuit.is_satisfied(&assignment_for(0)));
        assert!(circuit.is_satisfied(&assignment_for(173)));
        assert!(circuit.is_satisfied(&assignment_for(255)));
    }

    #[test]
    fn test_wrong_parity_detected() {
        let circuit = compile_default().unwrap();
        let mut values = assignment_for(6);
        values[PARITY_WIRE] = Fr::one();
        assert_eq!(circuit.first_unsatisfied(&values), Some(9));
    }

    #[test]
    fn test_non_boolean_bit_detected() {
        let circuit = compile_default().unwrap();
        let mut values = assignment_for(2);
        values[FIRST_BIT_WIRE + 1] = Fr::from(2u64);
        assert_eq!(circuit.first_unsatisfied(&values), Some(1));
    }

    #[test]
    fn test_arkworks_system_matches() {
        let circuit = compile_default().unwrap();
        let cs = ConstraintSystem::<Fr>::new_ref();
        circuit.synthesizer(Some(assignment_for(77))).generate_constraints(cs.clone()).unwrap();

        assert!(cs.is_satisfied().unwrap());
        assert_eq!(cs.num_constraints(), 10);
        assert_eq!(cs.num_instance_variables(), 2);
        assert_eq!(cs.num_witness_variables(), 9);
    }
}
