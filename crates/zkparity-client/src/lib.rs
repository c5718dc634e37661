//! zkparity Client
//!
//! Submission side of the parity vote: the ledger interface with a local
//! devnet implementation, the chain submitter, the tally reader and the
//! pipeline that ties proving to submission.

pub mod config;
pub mod ledger;
pub mod pipeline;
pub mod provider;
pub mod submitter;
pub mod tally;

pub use config::ClientConfig;
pub use ledger::{Ledger, LedgerSettings, LocalLedger, TxOutcome, TxReceipt};
pub use pipeline::{VotePipeline, VoteReceipt};
pub use provider::{ArtifactProvider, FsArtifacts, InMemoryArtifacts, CIRCUIT_SOURCE_FILE};
pub use submitter::{ChainSubmitter, TransactionHandle};
pub use tally::TallyReader;
