//! Ledger interface and the local devnet ledger
//!
//! [`LocalLedger`] hosts one [`VoteTally`] contract. Transactions wait in a
//! mempool until a block is produced, then execute in arrival order. A
//! reverted transaction is still mined: it gets a failed receipt and leaves
//! the contract untouched.

use std::collections::{HashMap, VecDeque};
use std::fs;
use std::future::Future;
use std::path::{Path, PathBuf};

use blake2::{Blake2s256, Digest};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use zkparity_runtime::{Parity, Result, Tally, TransactionResult, TxHash, VoteCalldata, VoteError};
use zkparity_verifier::{TallyState, VerificationRejected, VkComponents, VoteTally};

/// What executing a transaction did to the contract
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TxOutcome {
    Counted(Parity),
    Reverted(VerificationRejected),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxReceipt {
    pub hash: TxHash,
    pub block: u64,
    pub outcome: TxOutcome,
}

impl TxReceipt {
    pub fn success(&self) -> bool {
        matches!(self.outcome, TxOutcome::Counted(_))
    }
}

impl From<TxReceipt> for TransactionResult {
    fn from(receipt: TxReceipt) -> Self {
        let revert_reason = match &receipt.outcome {
            TxOutcome::Counted(_) => None,
            TxOutcome::Reverted(reason) => Some(reason.to_string()),
        };
        TransactionResult {
            hash: receipt.hash,
            success: revert_reason.is_none(),
            block: receipt.block,
            revert_reason,
        }
    }
}

/// Submission side of a ledger hosting the tally contract
pub trait Ledger: Send + Sync {
    /// Queue a `vote` call. Errors mean the ledger refused it outright.
    fn send_vote(&self, calldata: &VoteCalldata) -> impl Future<Output = Result<TxHash>> + Send;

    /// Terminal receipt, or `None` while the transaction is pending.
    fn receipt(&self, hash: &TxHash) -> impl Future<Output = Result<Option<TxReceipt>>> + Send;

    /// Read-only `votes(index)` call.
    fn votes(&self, index: u32) -> impl Future<Output = Result<u64>> + Send;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerSettings {
    /// Produce a block as soon as a transaction arrives
    pub auto_mine: bool,
    /// Pending transactions accepted before `send_vote` refuses
    pub mempool_limit: usize,
}

impl Default for LedgerSettings {
    fn default() -> Self {
        Self { auto_mine: true, mempool_limit: 1024 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct PendingTx {
    hash: TxHash,
    calldata: VoteCalldata,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LedgerSnapshot {
    contract: TallyState,
    height: u64,
    nonce: u64,
    pending: Vec<PendingTx>,
    receipts: Vec<TxReceipt>,
}

#[derive(Clone)]
struct LedgerInner {
    contract: VoteTally,
    height: u64,
    nonce: u64,
    mempool: VecDeque<PendingTx>,
    receipts: HashMap<TxHash, TxReceipt>,
}

impl LedgerInner {
    fn execute_block(&mut self) -> u64 {
        self.height += 1;
        let block = self.height;

        while let Some(tx) = self.mempool.pop_front() {
            let outcome = match self.contract.vote(&tx.calldata) {
                Ok(parity) => TxOutcome::Counted(parity),
                Err(reason) => {
                    warn!(tx = %tx.hash.short(), %reason, "Transaction reverted");
                    TxOutcome::Reverted(reason)
                }
            };
            self.receipts.insert(tx.hash, TxReceipt { hash: tx.hash, block, outcome });
        }

        debug!(block, "Block produced");
        block
    }

    fn snapshot(&self) -> LedgerSnapshot {
        let mut receipts: Vec<TxReceipt> = self.receipts.values().cloned().collect();
        receipts.sort_by(|a, b| a.block.cmp(&b.block).then(a.hash.cmp(&b.hash)));

        LedgerSnapshot {
            contract: self.contract.snapshot(),
            height: self.height,
            nonce: self.nonce,
            pending: self.mempool.iter().cloned().collect(),
            receipts,
        }
    }
}

fn tx_hash(nonce: u64, calldata: &VoteCalldata) -> TxHash {
    let mut hasher = Blake2s256::new();
    hasher.update(nonce.to_be_bytes());
    hasher.update(calldata.to_bytes());
    TxHash::new(hasher.finalize().into())
}

/// Single-contract devnet, optionally backed by a JSON file
///
/// Receipts are kept forever and every state change rewrites the whole
/// snapshot, so the file grows with the number of transactions.
pub struct LocalLedger {
    inner: Mutex<LedgerInner>,
    settings: LedgerSettings,
    path: Option<PathBuf>,
}

impl LocalLedger {
    /// In-memory ledger with a freshly deployed tally contract.
    pub fn deploy(components: VkComponents, settings: LedgerSettings) -> Result<Self> {
        let contract = VoteTally::deploy(components)
            .map_err(|e| VoteError::submission(format!("deployment rejected: {}", e)))?;

        info!(auto_mine = settings.auto_mine, "Tally contract deployed");
        Ok(Self::from_parts(contract, 0, 0, VecDeque::new(), HashMap::new(), settings, None))
    }

    /// Deploy a fresh contract and persist it at `path`.
    pub fn create<P: AsRef<Path>>(
        path: P,
        components: VkComponents,
        settings: LedgerSettings,
    ) -> Result<Self> {
        let mut ledger = Self::deploy(components, settings)?;
        ledger.path = Some(path.as_ref().to_path_buf());

        let snapshot = ledger.inner.get_mut().snapshot();
        write_snapshot(path.as_ref(), &snapshot)?;
        Ok(ledger)
    }

    /// Reopen a ledger previously written by [`LocalLedger::create`].
    pub fn open<P: AsRef<Path>>(path: P, settings: LedgerSettings) -> Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)?;
        let snapshot: LedgerSnapshot = serde_json::from_str(&json)
            .map_err(|e| VoteError::serialization(format!("corrupt ledger file: {}", e)))?;

        let contract = VoteTally::restore(snapshot.contract)
            .map_err(|e| VoteError::serialization(format!("corrupt ledger file: {}", e)))?;
        let receipts = snapshot.receipts.into_iter().map(|r| (r.hash, r)).collect();

        debug!(path = %path.display(), height = snapshot.height, "Ledger opened");
        Ok(Self::from_parts(
            contract,
            snapshot.height,
            snapshot.nonce,
            snapshot.pending.into(),
            receipts,
            settings,
            Some(path.to_path_buf()),
        ))
    }

    fn from_parts(
        contract: VoteTally,
        height: u64,
        nonce: u64,
        mempool: VecDeque<PendingTx>,
        receipts: HashMap<TxHash, TxReceipt>,
        settings: LedgerSettings,
        path: Option<PathBuf>,
    ) -> Self {
        Self {
            inner: Mutex::new(LedgerInner { contract, height, nonce, mempool, receipts }),
            settings,
            path,
        }
    }

    pub fn settings(&self) -> LedgerSettings {
        self.settings
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Execute every pending transaction in a new block.
    pub async fn mine_block(&self) -> Result<u64> {
        let mut inner = self.inner.lock().await;
        self.commit(&mut inner, LedgerInner::execute_block)
    }

    pub async fn height(&self) -> u64 {
        self.inner.lock().await.height
    }

    /// Transactions accepted so far, mined or not
    pub async fn transaction_count(&self) -> u64 {
        self.inner.lock().await.nonce
    }

    pub async fn pending_count(&self) -> usize {
        self.inner.lock().await.mempool.len()
    }

    pub async fn tally(&self) -> Tally {
        self.inner.lock().await.contract.tally()
    }

    pub async fn verification_key(&self) -> VkComponents {
        self.inner.lock().await.contract.verification_key().clone()
    }

    /// Write the current state to the backing file, if any.
    pub async fn persist(&self) -> Result<()> {
        let inner = self.inner.lock().await;
        self.persist_locked(&inner)
    }

    /// Apply `change` to a copy of the state and keep it only once persisted.
    ///
    /// A failed write leaves the ledger exactly as it was before the call.
    fn commit<T>(
        &self,
        inner: &mut LedgerInner,
        change: impl FnOnce(&mut LedgerInner) -> T,
    ) -> Result<T> {
        if self.path.is_none() {
            return Ok(change(inner));
        }

        let mut staged = inner.clone();
        let output = change(&mut staged);
        self.persist_locked(&staged)?;
        *inner = staged;
        Ok(output)
    }

    fn persist_locked(&self, inner: &LedgerInner) -> Result<()> {
        match &self.path {
            Some(path) => write_snapshot(path, &inner.snapshot()),
            None => Ok(()),
        }
    }
}

fn write_snapshot(path: &Path, snapshot: &LedgerSnapshot) -> Result<()> {
    let json = serde_json::to_string_pretty(snapshot)
        .map_err(|e| VoteError::serialization(format!("Failed to encode ledger: {}", e)))?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, json)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

impl Ledger for LocalLedger {
    async fn send_vote(&self, calldata: &VoteCalldata) -> Result<TxHash> {
        let mut inner = self.inner.lock().await;
        if inner.mempool.len() >= self.settings.mempool_limit {
            return Err(VoteError::submission("mempool is full"));
        }

        let auto_mine = self.settings.auto_mine;
        let hash = self.commit(&mut inner, |state| {
            state.nonce += 1;
            let hash = tx_hash(state.nonce, calldata);
            state.mempool.push_back(PendingTx { hash, calldata: *calldata });
            if auto_mine {
                state.execute_block();
            }
            hash
        })?;

        debug!(tx = %hash.short(), pending = inner.mempool.len(), "Transaction accepted");
        Ok(hash)
    }

    async fn receipt(&self, hash: &TxHash) -> Result<Option<TxReceipt>> {
        Ok(self.inner.lock().await.receipts.get(hash).cloned())
    }

    async fn votes(&self, index: u32) -> Result<u64> {
        self.inner
            .lock()
            .await
            .contract
            .votes(index)
            .map_err(|e| VoteError::submission(format!("votes({}) reverted: {}", index, e)))
    }
}
