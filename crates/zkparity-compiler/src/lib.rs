//! zkparity Compiler
//!
//! Compiles the annotated parity circuit source to R1CS, computes witnesses
//! for private votes and proves them with Groth16 over BN254.

pub mod ast;
pub mod circuit;
pub mod codegen;
pub mod error;
pub mod parser;
pub mod witness;

pub use ast::{transform_to_ir, CircuitIR, Constraint, ZkField, ZkType, CIRCUIT_VERSION, VOTE_BITS};
pub use circuit::{CompiledCircuit, Hint, R1csRow, Term, VoteCircuit};
pub use codegen::{
    generate_proof, trusted_setup, KeyBlob, KeyManager, KeyMetadata, NativeProver, VoteProof,
};
pub use error::{CircuitError, Result};
pub use parser::{parse_circuit, FieldAnnotation, ParsedCircuit, ParsedField};
pub use witness::{compute_witness, parse_vote_input, Witness};

/// Source of the bundled `VoteEvenOrOdd` circuit
pub const DEFAULT_CIRCUIT_SOURCE: &str = include_str!("../circuits/vote_even_or_odd.zk");

/// Compile circuit source text. Deterministic for a given source.
pub fn compile(source: &str) -> Result<CompiledCircuit> {
    let parsed = parse_circuit(source)?;
    let ir = transform_to_ir(parsed)?;
    let circuit = CompiledCircuit::from_ir(&ir)?;

    tracing::debug!(
        circuit = circuit.name(),
        constraints = circuit.num_constraints(),
        fingerprint = %circuit.fingerprint_hex(),
        "Compiled circuit"
    );
    Ok(circuit)
}

pub fn compile_default() -> Result<CompiledCircuit> {
    compile(DEFAULT_CIRCUIT_SOURCE)
}
