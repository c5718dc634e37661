//! Error taxonomy for a vote attempt
//!
//! Every stage of the pipeline (input parsing, witness computation, proving,
//! submission, confirmation) reports failures through [`VoteError`]. A failed
//! attempt never leaves a partial vote behind, so every variant means the
//! same thing to the caller: nothing was counted unless the ledger says so.

use std::time::Duration;
use thiserror::Error;

/// Result type alias for zkparity operations
pub type Result<T> = std::result::Result<T, VoteError>;

/// Main error type for a vote attempt
#[derive(Debug, Error)]
pub enum VoteError {
    /// The user-supplied vote is not an integer in `[0, 255]`
    #[error("Input out of range: {0}")]
    InputRange(String),

    /// The circuit program is malformed or has the wrong version
    #[error("Circuit error: {0}")]
    Circuit(String),

    /// The proving key does not belong to the compiled circuit
    #[error("Proving key error: {0}")]
    ProvingKey(String),

    /// Arithmetic or synthesis failure while building the proof
    #[error("Proof generation error: {0}")]
    ProofGeneration(String),

    /// The ledger refused the transaction before accepting it
    #[error("Submission error: {0}")]
    Submission(String),

    /// The ledger executed the transaction and the verifier reverted it
    #[error("Verification rejected in transaction {tx_hash}: {reason}")]
    VerificationRejected { tx_hash: String, reason: String },

    /// No terminal receipt within the confirmation bound; the outcome is unknown
    #[error("Timed out after {waited:?} waiting for transaction {tx_hash}; re-read the tally before retrying")]
    Timeout { tx_hash: String, waited: Duration },

    /// Serialization or deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O error wrapper
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl VoteError {
    pub fn input_range(msg: impl Into<String>) -> Self {
        Self::InputRange(msg.into())
    }

    pub fn circuit(msg: impl Into<String>) -> Self {
        Self::Circuit(msg.into())
    }

    pub fn proving_key(msg: impl Into<String>) -> Self {
        Self::ProvingKey(msg.into())
    }

    pub fn proof_generation(msg: impl Into<String>) -> Self {
        Self::ProofGeneration(msg.into())
    }

    pub fn submission(msg: impl Into<String>) -> Self {
        Self::Submission(msg.into())
    }

    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization(msg.into())
    }

    /// Whether the caller must consult the tally before deciding to retry.
    ///
    /// Only a timeout leaves the outcome ambiguous. Every other error
    /// happened either before the ledger accepted anything or after it
    /// reported a definite revert.
    pub fn is_ambiguous(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Whether the error was raised before the ledger accepted any transaction.
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            Self::InputRange(_)
                | Self::Circuit(_)
                | Self::ProvingKey(_)
                | Self::ProofGeneration(_)
                | Self::Serialization(_)
                | Self::Io(_)
        )
    }
}
