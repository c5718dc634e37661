//! Chain submitter
//!
//! Sends one `vote` transaction and follows it to a terminal receipt. It
//! never resubmits: if no receipt shows up within the confirmation timeout
//! the outcome is unknown and the caller gets [`VoteError::Timeout`].

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::time::{sleep, timeout};
use tracing::{debug, info, warn};
use zkparity_runtime::{Result, TransactionResult, TxHash, VoteCalldata, VoteError};

use crate::config::ClientConfig;
use crate::ledger::Ledger;

/// A transaction the ledger has accepted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransactionHandle {
    hash: TxHash,
    submitted_at: Instant,
}

impl TransactionHandle {
    pub fn hash(&self) -> TxHash {
        self.hash
    }

    pub fn elapsed(&self) -> Duration {
        self.submitted_at.elapsed()
    }
}

pub struct ChainSubmitter<L> {
    ledger: Arc<L>,
    confirmation_timeout: Duration,
    poll_interval: Duration,
}

impl<L: Ledger> ChainSubmitter<L> {
    pub fn new(ledger: Arc<L>, config: &ClientConfig) -> Self {
        Self {
            ledger,
            confirmation_timeout: config.confirmation_timeout,
            poll_interval: config.poll_interval,
        }
    }

    pub fn confirmation_timeout(&self) -> Duration {
        self.confirmation_timeout
    }

    pub async fn submit(&self, calldata: &VoteCalldata) -> Result<TransactionHandle> {
        let hash = self.ledger.send_vote(calldata).await?;
        info!(tx = %hash.short(), "Transaction submitted");
        Ok(TransactionHandle { hash, submitted_at: Instant::now() })
    }

    /// Wait for the terminal receipt of `handle`.
    ///
    /// A reverted transaction is a successful wait with `success == false`.
    pub async fn await_receipt(&self, handle: &TransactionHandle) -> Result<TransactionResult> {
        let hash = handle.hash;
        let poll = async {
            loop {
                if let Some(receipt) = self.ledger.receipt(&hash).await? {
                    return Ok::<_, VoteError>(receipt);
                }
                debug!(tx = %hash.short(), "Waiting for receipt");
                sleep(self.poll_interval).await;
            }
        };

        match timeout(self.confirmation_timeout, poll).await {
            Ok(receipt) => {
                let result: TransactionResult = receipt?.into();
                info!(tx = %hash.short(), block = result.block, success = result.success, "Transaction confirmed");
                Ok(result)
            }
            Err(_) => {
                warn!(tx = %hash.short(), "No receipt before the confirmation timeout");
                Err(VoteError::Timeout { tx_hash: hash.to_hex(), waited: self.confirmation_timeout })
            }
        }
    }

    pub async fn submit_and_confirm(&self, calldata: &VoteCalldata) -> Result<TransactionResult> {
        let handle = self.submit(calldata).await?;
        self.await_receipt(&handle).await
    }
}
