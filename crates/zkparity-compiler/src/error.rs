//! Compiler error types

use thiserror::Error;
use zkparity_runtime::VoteError;

#[derive(Debug, Error)]
pub enum CircuitError {
    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Unsupported type for zk: {0}")]
    UnsupportedType(String),

    #[error("Invalid annotation: {0}")]
    InvalidAnnotation(String),

    #[error("Invalid circuit shape: {0}")]
    InvalidShape(String),

    #[error("Circuit version mismatch: expected {expected}, found {found}")]
    VersionMismatch { expected: u32, found: u32 },

    #[error("Syntax error: {0}")]
    SynError(#[from] syn::Error),

    #[error("Encoding error: {0}")]
    Encoding(String),
}

impl From<CircuitError> for VoteError {
    fn from(err: CircuitError) -> Self {
        VoteError::Circuit(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, CircuitError>;
