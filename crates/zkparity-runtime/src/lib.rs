//! zkparity Runtime
//!
//! Shared types and the error taxonomy for the zkparity voting toolkit.
//! Every other crate in the workspace speaks in terms of these definitions:
//! the `vote` calldata layout, ballot parity, the public tally and the
//! outcome of a ledger transaction.

pub mod error;
pub mod types;

pub use error::{Result, VoteError};
pub use types::{
    FieldWord, Parity, ProofPoints, Tally, TransactionResult, TxHash, VoteCalldata,
    CALLDATA_SIZE, CALLDATA_WORDS, WORD_SIZE,
};
