//! Tests for the devnet ledger, the submitter and the tally reader

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use proptest::prelude::*;
use rand::{rngs::StdRng, SeedableRng};
use tempfile::TempDir;
use zkparity_client::{
    ChainSubmitter, ClientConfig, Ledger, LedgerSettings, LocalLedger, TallyReader, TxOutcome,
};
use zkparity_compiler::{compile_default, trusted_setup, NativeProver};
use zkparity_runtime::{Parity, Tally, VoteCalldata, VoteError};
use zkparity_verifier::{VerificationRejected, VkComponents};

/// One trusted setup shared by every test in this file
fn prover() -> &'static NativeProver {
    static PROVER: OnceLock<NativeProver> = OnceLock::new();
    PROVER.get_or_init(|| {
        let circuit = compile_default().unwrap();
        let key = trusted_setup(&circuit, &mut StdRng::seed_from_u64(2024)).unwrap();
        NativeProver::new(circuit, key).unwrap()
    })
}

fn components() -> VkComponents {
    prover().verification_key()
}

fn calldata(vote: i64, seed: u64) -> VoteCalldata {
    prover().prove(vote, &mut StdRng::seed_from_u64(seed)).unwrap().to_calldata()
}

fn config() -> ClientConfig {
    ClientConfig {
        confirmation_timeout: Duration::from_secs(5),
        poll_interval: Duration::from_millis(5),
        ..ClientConfig::default()
    }
}

// ============================================================================
// LEDGER TESTS
// ============================================================================

#[tokio::test]
async fn test_blocks_execute_in_arrival_order() {
    let settings = LedgerSettings { auto_mine: false, ..LedgerSettings::default() };
    let ledger = LocalLedger::deploy(components(), settings).unwrap();

    let replayed = calldata(3, 1);
    let first = ledger.send_vote(&replayed).await.unwrap();
    let second = ledger.send_vote(&replayed).await.unwrap();
    assert_ne!(first, second);
    assert!(ledger.receipt(&first).await.unwrap().is_none());

    assert_eq!(ledger.mine_block().await.unwrap(), 1);

    let first = ledger.receipt(&first).await.unwrap().unwrap();
    let second = ledger.receipt(&second).await.unwrap().unwrap();
    assert_eq!(first.outcome, TxOutcome::Counted(Parity::Odd));
    assert_eq!(second.outcome, TxOutcome::Reverted(VerificationRejected::ReplayedProof));
    assert_eq!(first.block, 1);
    assert_eq!(ledger.tally().await, Tally::new(0, 1));
}

#[tokio::test]
async fn test_mempool_limit() {
    let settings = LedgerSettings { auto_mine: false, mempool_limit: 1 };
    let ledger = LocalLedger::deploy(components(), settings).unwrap();

    ledger.send_vote(&calldata(2, 2)).await.unwrap();
    let err = ledger.send_vote(&calldata(4, 3)).await.unwrap_err();
    assert!(matches!(err, VoteError::Submission(_)));
    assert_eq!(ledger.transaction_count().await, 1);

    ledger.mine_block().await.unwrap();
    ledger.send_vote(&calldata(4, 3)).await.unwrap();
}

#[tokio::test]
async fn test_invalid_counter_index() {
    let ledger = LocalLedger::deploy(components(), LedgerSettings::default()).unwrap();
    assert_eq!(ledger.votes(0).await.unwrap(), 0);
    assert_eq!(ledger.votes(1).await.unwrap(), 0);
    assert!(ledger.votes(2).await.is_err());
}

#[tokio::test]
async fn test_deploy_rejects_wrong_key_shape() {
    let mut components = components();
    components.gamma_abc_g1.push(components.gamma_abc_g1[0]);
    assert!(LocalLedger::deploy(components, LedgerSettings::default()).is_err());
}

#[tokio::test]
async fn test_persisted_ledger_reopens() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("nested").join("devnet.json");
    let replayed = calldata(10, 4);

    {
        let ledger = LocalLedger::create(&path, components(), LedgerSettings::default()).unwrap();
        ledger.send_vote(&replayed).await.unwrap();
        ledger.send_vote(&calldata(11, 5)).await.unwrap();
    }

    let ledger = LocalLedger::open(&path, LedgerSettings::default()).unwrap();
    assert_eq!(ledger.tally().await, Tally::new(1, 1));
    assert_eq!(ledger.height().await, 2);
    assert_eq!(ledger.verification_key().await, components());

    let hash = ledger.send_vote(&replayed).await.unwrap();
    let receipt = ledger.receipt(&hash).await.unwrap().unwrap();
    assert_eq!(receipt.outcome, TxOutcome::Reverted(VerificationRejected::ReplayedProof));
}

#[tokio::test]
async fn test_pending_transactions_survive_reopen() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("devnet.json");
    let settings = LedgerSettings { auto_mine: false, ..LedgerSettings::default() };

    let hash = {
        let ledger = LocalLedger::create(&path, components(), settings).unwrap();
        ledger.send_vote(&calldata(8, 6)).await.unwrap()
    };

    let ledger = LocalLedger::open(&path, settings).unwrap();
    assert_eq!(ledger.pending_count().await, 1);
    ledger.mine_block().await.unwrap();
    assert!(ledger.receipt(&hash).await.unwrap().unwrap().success());
}

#[tokio::test]
async fn test_open_corrupt_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("devnet.json");
    std::fs::write(&path, "{ \"height\": 1 }").unwrap();

    assert!(matches!(
        LocalLedger::open(&path, LedgerSettings::default()),
        Err(VoteError::Serialization(_))
    ));
    assert!(matches!(
        LocalLedger::open(temp_dir.path().join("missing.json"), LedgerSettings::default()),
        Err(VoteError::Io(_))
    ));
}

#[tokio::test]
async fn test_failed_write_leaves_ledger_unchanged() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("devnet.json");
    let ledger = LocalLedger::create(&path, components(), LedgerSettings::default()).unwrap();

    let blocker = temp_dir.path().join("devnet.json.tmp");
    std::fs::create_dir(&blocker).unwrap();

    let vote = calldata(4, 9);
    let err = ledger.send_vote(&vote).await.unwrap_err();
    assert!(matches!(err, VoteError::Io(_)));
    assert!(err.is_local());
    assert_eq!(ledger.tally().await, Tally::new(0, 0));
    assert_eq!(ledger.transaction_count().await, 0);
    assert_eq!(ledger.height().await, 0);

    std::fs::remove_dir(&blocker).unwrap();
    ledger.send_vote(&vote).await.unwrap();
    assert_eq!(ledger.tally().await, Tally::new(1, 0));

    let reopened = LocalLedger::open(&path, LedgerSettings::default()).unwrap();
    assert_eq!(reopened.tally().await, Tally::new(1, 0));
}

#[tokio::test]
async fn test_failed_write_keeps_block_pending() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("devnet.json");
    let settings = LedgerSettings { auto_mine: false, ..LedgerSettings::default() };
    let ledger = LocalLedger::create(&path, components(), settings).unwrap();
    let hash = ledger.send_vote(&calldata(5, 10)).await.unwrap();

    let blocker = temp_dir.path().join("devnet.json.tmp");
    std::fs::create_dir(&blocker).unwrap();

    assert!(matches!(ledger.mine_block().await, Err(VoteError::Io(_))));
    assert_eq!(ledger.height().await, 0);
    assert_eq!(ledger.pending_count().await, 1);
    assert!(ledger.receipt(&hash).await.unwrap().is_none());
    assert_eq!(ledger.tally().await, Tally::new(0, 0));

    std::fs::remove_dir(&blocker).unwrap();
    assert_eq!(ledger.mine_block().await.unwrap(), 1);
    assert_eq!(ledger.tally().await, Tally::new(0, 1));
}

// ============================================================================
// SUBMITTER AND READER TESTS
// ============================================================================

#[tokio::test]
async fn test_submitter_reports_revert_as_result() {
    let ledger = Arc::new(LocalLedger::deploy(components(), LedgerSettings::default()).unwrap());
    let submitter = ChainSubmitter::new(Arc::clone(&ledger), &config());

    let replayed = calldata(20, 7);
    assert!(submitter.submit_and_confirm(&replayed).await.unwrap().success);

    let result = submitter.submit_and_confirm(&replayed).await.unwrap();
    assert!(!result.success);
    assert_eq!(result.revert_reason.as_deref(), Some("proof already accepted"));
}

#[tokio::test]
async fn test_submitter_timeout_does_not_resubmit() {
    let settings = LedgerSettings { auto_mine: false, ..LedgerSettings::default() };
    let ledger = Arc::new(LocalLedger::deploy(components(), settings).unwrap());
    let config = ClientConfig {
        confirmation_timeout: Duration::from_millis(50),
        poll_interval: Duration::from_millis(5),
        ..ClientConfig::default()
    };
    let submitter = ChainSubmitter::new(Arc::clone(&ledger), &config);

    let handle = submitter.submit(&calldata(1, 8)).await.unwrap();
    let err = submitter.await_receipt(&handle).await.unwrap_err();
    assert!(matches!(err, VoteError::Timeout { ref tx_hash, .. } if *tx_hash == handle.hash().to_hex()));
    assert_eq!(ledger.transaction_count().await, 1);

    ledger.mine_block().await.unwrap();
    let result = submitter.await_receipt(&handle).await.unwrap();
    assert!(result.success);
    assert_eq!(result.hash, handle.hash());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_votes_are_serialized() {
    let ledger = Arc::new(LocalLedger::deploy(components(), LedgerSettings::default()).unwrap());

    let mut tasks = Vec::new();
    for i in 0..8u64 {
        let ledger = Arc::clone(&ledger);
        let calldata = calldata(i as i64, 100 + i);
        tasks.push(tokio::spawn(async move {
            let submitter = ChainSubmitter::new(ledger, &config());
            submitter.submit_and_confirm(&calldata).await
        }));
    }
    for task in tasks {
        assert!(task.await.unwrap().unwrap().success);
    }

    let tally = TallyReader::new(ledger).read_tally().await.unwrap();
    assert_eq!(tally, Tally::new(4, 4));
}

// ============================================================================
// PROPERTY TESTS
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(8))]

    #[test]
    fn prop_tally_matches_accepted_votes(votes in prop::collection::vec(0i64..=255, 1..6)) {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let tally = runtime.block_on(async {
            let ledger = Arc::new(LocalLedger::deploy(components(), LedgerSettings::default()).unwrap());
            let submitter = ChainSubmitter::new(Arc::clone(&ledger), &config());
            for (i, vote) in votes.iter().enumerate() {
                let result = submitter.submit_and_confirm(&calldata(*vote, i as u64)).await.unwrap();
                assert!(result.success);
            }
            TallyReader::new(ledger).read_tally().await.unwrap()
        });

        let even = votes.iter().filter(|v| *v % 2 == 0).count() as u64;
        prop_assert_eq!(tally.total(), votes.len() as u64);
        prop_assert_eq!(tally, Tally::new(even, votes.len() as u64 - even));
    }
}
