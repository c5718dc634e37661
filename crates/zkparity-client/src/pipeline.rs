//! Vote pipeline
//!
//! `parse → witness → proof → calldata` runs locally and touches nothing
//! shared. `submit → await receipt → read tally` is the only part that talks
//! to the ledger. Any error aborts the attempt at the stage that raised it.

use std::sync::Arc;

use rand::rngs::OsRng;
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use tracing::info;
use zkparity_compiler::{compile, parse_vote_input, NativeProver, VoteProof};
use zkparity_runtime::{Parity, Result, Tally, TxHash, VoteCalldata, VoteError};

use crate::config::ClientConfig;
use crate::ledger::Ledger;
use crate::provider::ArtifactProvider;
use crate::submitter::ChainSubmitter;
use crate::tally::TallyReader;

/// Outcome of a counted vote
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteReceipt {
    pub tx_hash: TxHash,
    pub parity: Parity,
    pub block: u64,
    pub tally: Tally,
}

pub struct VotePipeline<L> {
    prover: NativeProver,
    submitter: ChainSubmitter<L>,
    reader: TallyReader<L>,
}

impl<L: Ledger> VotePipeline<L> {
    pub fn new<P: ArtifactProvider>(artifacts: &P, ledger: Arc<L>, config: &ClientConfig) -> Result<Self> {
        let circuit = compile(&artifacts.circuit_source()?)?;
        let prover = NativeProver::from_base64(circuit, &artifacts.proving_key_base64()?)?;

        Ok(Self {
            prover,
            submitter: ChainSubmitter::new(Arc::clone(&ledger), config),
            reader: TallyReader::new(ledger),
        })
    }

    pub fn prover(&self) -> &NativeProver {
        &self.prover
    }

    pub fn submitter(&self) -> &ChainSubmitter<L> {
        &self.submitter
    }

    pub fn reader(&self) -> &TallyReader<L> {
        &self.reader
    }

    /// Local stages: parse the decimal vote, compute the witness and prove it.
    pub fn prepare<R: RngCore + CryptoRng>(&self, input: &str, rng: &mut R) -> Result<VoteProof> {
        let vote = parse_vote_input(input)?;
        self.prover.prove(vote, rng)
    }

    /// Submit prepared calldata and wait for it to be counted.
    pub async fn submit(&self, calldata: &VoteCalldata) -> Result<VoteReceipt> {
        let result = self.submitter.submit_and_confirm(calldata).await?;
        if !result.success {
            return Err(VoteError::VerificationRejected {
                tx_hash: result.hash.to_hex(),
                reason: result.revert_reason.unwrap_or_else(|| "reverted".to_string()),
            });
        }

        let parity = calldata
            .claimed_parity()
            .ok_or_else(|| VoteError::serialization("counted calldata carries no parity"))?;
        let tally = self.reader.read_tally().await?;

        info!(tx = %result.hash.short(), %parity, %tally, "Vote counted");
        Ok(VoteReceipt { tx_hash: result.hash, parity, block: result.block, tally })
    }

    pub async fn cast_vote_with_rng<R: RngCore + CryptoRng>(
        &self,
        input: &str,
        rng: &mut R,
    ) -> Result<VoteReceipt> {
        let calldata = self.prepare(input, rng)?.to_calldata();
        self.submit(&calldata).await
    }

    /// Full pipeline with fresh OS randomness.
    pub async fn cast_vote(&self, input: &str) -> Result<VoteReceipt> {
        let calldata = self.prepare(input, &mut OsRng)?.to_calldata();
        self.submit(&calldata).await
    }

    pub async fn read_tally(&self) -> Result<Tally> {
        self.reader.read_tally().await
    }
}
