//! Groth16 back end for compiled circuits
//!
//! Key generation and caching live in [`keys`]; proof generation and
//! off-ledger verification live in [`prover`].

pub mod keys;
pub mod prover;

pub use keys::{trusted_setup, KeyBlob, KeyManager, KeyMetadata};
pub use prover::{generate_proof, NativeProver, VoteProof};
