//! End-to-end session flows over the mock collaborators.

use ballot_sync::{
    Account, CallLog, MockBlobStore, MockLedger, MockOutcome, MockWallet, SessionApi,
    SessionConfig, SessionService, SyncError,
};
use std::sync::Arc;
use std::time::Duration;

const OWNER: &str = "0xOwner0000000000000000000000000000000001";
const VOTER: &str = "0xVoter0000000000000000000000000000000002";

type MockSession = SessionService<MockWallet, MockLedger, MockBlobStore>;

fn session_over(wallet: MockWallet, ledger: MockLedger, blobs: MockBlobStore) -> MockSession {
    SessionService::new(SessionConfig::for_testing(), wallet, ledger, blobs)
}

fn seeded_ledger(log: &Arc<CallLog>) -> MockLedger {
    let ledger = MockLedger::with_log(OWNER, Arc::clone(log));
    ledger.push_candidate("Alice", 3, Some("cidA"));
    ledger.push_candidate("Bob", 5, Some("cidB"));
    ledger
}

#[tokio::test]
async fn refresh_builds_ordered_dense_snapshot() {
    let log = CallLog::new();
    let session = session_over(
        MockWallet::new(&[VOTER]),
        seeded_ledger(&log),
        MockBlobStore::new(),
    );

    let snapshot = session.refresh().await.unwrap();

    assert_eq!(snapshot.len(), 2);
    let names: Vec<_> = snapshot.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, ["Alice", "Bob"]);
    let indices: Vec<_> = snapshot.iter().map(|c| c.index).collect();
    assert_eq!(indices, [0, 1]);
    assert_eq!(snapshot.get(0).unwrap().vote_count, 3);
    assert_eq!(snapshot.get(1).unwrap().vote_count, 5);
    assert_eq!(
        snapshot.get(1).unwrap().blob_ref.as_ref().map(|r| r.as_str()),
        Some("cidB")
    );
    // Candidates were read strictly in index order.
    assert!(log.first_position("ledger.candidates(0)") < log.first_position("ledger.candidates(1)"));
}

#[tokio::test]
async fn added_candidate_appears_after_refresh() {
    let log = CallLog::new();
    let session = session_over(
        MockWallet::new(&[OWNER]),
        seeded_ledger(&log),
        MockBlobStore::with_log(Arc::clone(&log)),
    );
    session.connect().await.unwrap();
    session.refresh().await.unwrap();

    let blob_ref = session.add_candidate("Carol", b"carol.png").await.unwrap();

    let snapshot = session.snapshot().await;
    assert_eq!(snapshot.len(), 3);
    let carol = snapshot.get(2).unwrap();
    assert_eq!(carol.index, 2);
    assert_eq!(carol.name, "Carol");
    assert_eq!(carol.vote_count, 0);
    assert_eq!(carol.blob_ref.as_ref(), Some(&blob_ref));
}

#[tokio::test]
async fn blob_upload_strictly_precedes_ledger_submission() {
    let log = CallLog::new();
    let session = session_over(
        MockWallet::new(&[OWNER]),
        seeded_ledger(&log),
        MockBlobStore::with_log(Arc::clone(&log)),
    );
    session.connect().await.unwrap();
    session.refresh().await.unwrap();
    session.add_candidate("Carol", b"carol.png").await.unwrap();

    let put = log.first_position("blob.put").unwrap();
    let submit = log.first_position("ledger.addCandidate").unwrap();
    assert!(put < submit);
}

#[tokio::test]
async fn store_failure_stops_before_any_ledger_write() {
    let log = CallLog::new();
    let blobs = MockBlobStore::with_log(Arc::clone(&log));
    blobs.set_fail_put(true);
    let session = session_over(MockWallet::new(&[OWNER]), seeded_ledger(&log), blobs);
    session.connect().await.unwrap();
    session.refresh().await.unwrap();

    let result = session.add_candidate("Carol", b"carol.png").await;

    assert!(matches!(result, Err(SyncError::StoreUnavailable(_))));
    assert_eq!(log.count_of("ledger.addCandidate"), 0);
}

#[tokio::test]
async fn organize_failure_never_blocks_the_ledger_write() {
    let log = CallLog::new();
    let blobs = MockBlobStore::with_log(Arc::clone(&log));
    blobs.set_fail_organize(true);
    let session = session_over(MockWallet::new(&[OWNER]), seeded_ledger(&log), blobs);
    session.connect().await.unwrap();
    session.refresh().await.unwrap();

    session.add_candidate("Carol", b"carol.png").await.unwrap();

    assert_eq!(log.count_of("blob.organize"), 1);
    assert_eq!(log.count_of("ledger.addCandidate"), 1);
}

#[tokio::test]
async fn confirmed_vote_increments_exactly_one_tally() {
    let log = CallLog::new();
    let session = session_over(
        MockWallet::new(&[VOTER]),
        seeded_ledger(&log),
        MockBlobStore::new(),
    );
    session.connect().await.unwrap();
    let before = session.refresh().await.unwrap();

    session.cast_vote(1).await.unwrap();

    let after = session.snapshot().await;
    assert_eq!(after.get(1).unwrap().vote_count, before.get(1).unwrap().vote_count + 1);
    assert_eq!(after.get(0).unwrap(), before.get(0).unwrap());
    assert_eq!(after.len(), before.len());
}

#[tokio::test]
async fn reverted_write_surfaces_and_skips_refresh() {
    let log = CallLog::new();
    let ledger = seeded_ledger(&log);
    ledger.set_outcome(MockOutcome::Revert(Some("vote closed".to_string())));
    let session = session_over(MockWallet::new(&[VOTER]), ledger, MockBlobStore::new());
    session.connect().await.unwrap();
    let before = session.refresh().await.unwrap();
    let reads_before = log.count_of("ledger.candidatesCount");

    let result = session.cast_vote(0).await;

    match result {
        Err(SyncError::Reverted { reason }) => {
            assert_eq!(reason.as_deref(), Some("vote closed"));
        }
        other => panic!("expected revert, got {other:?}"),
    }
    // No refresh was triggered and the prior snapshot is untouched.
    assert_eq!(log.count_of("ledger.candidatesCount"), reads_before);
    assert_eq!(session.snapshot().await, before);
}

#[tokio::test]
async fn timed_out_write_surfaces_and_skips_refresh() {
    let log = CallLog::new();
    let ledger = seeded_ledger(&log);
    ledger.set_outcome(MockOutcome::TimeOut);
    let session = session_over(MockWallet::new(&[VOTER]), ledger, MockBlobStore::new());
    session.connect().await.unwrap();
    let before = session.refresh().await.unwrap();
    let reads_before = log.count_of("ledger.candidatesCount");

    let result = session.cast_vote(0).await;

    assert!(matches!(result, Err(SyncError::TimedOut)));
    assert_eq!(log.count_of("ledger.candidatesCount"), reads_before);
    assert_eq!(session.snapshot().await, before);
}

#[tokio::test]
async fn unknown_index_fails_locally_with_zero_remote_calls() {
    let log = CallLog::new();
    let session = session_over(
        MockWallet::new(&[VOTER]),
        seeded_ledger(&log),
        MockBlobStore::new(),
    );
    session.connect().await.unwrap();
    session.refresh().await.unwrap();
    let calls_before = log.calls().len();

    let result = session.cast_vote(7).await;

    assert!(matches!(result, Err(SyncError::InvalidIndex { index: 7 })));
    assert_eq!(log.calls().len(), calls_before);
}

#[tokio::test]
async fn ownership_is_case_insensitive_and_recomputed_on_switch() {
    let upper = OWNER.to_uppercase().replace("0X", "0x");
    let lower = OWNER.to_lowercase();
    let wallet = MockWallet::new(&[upper.as_str()]);
    let ledger = MockLedger::new(lower.as_str());
    let session = session_over(wallet.clone(), ledger, MockBlobStore::new());

    session.connect().await.unwrap();
    assert!(session.is_owner().await);

    wallet.set_accounts(&[VOTER]);
    session.connect().await.unwrap();
    assert!(!session.is_owner().await);
    assert_eq!(session.account().await, Some(Account::new(VOTER)));
}

#[tokio::test]
async fn account_watcher_rederives_identity() {
    let wallet = MockWallet::new(&[OWNER]);
    let session = Arc::new(session_over(
        wallet.clone(),
        MockLedger::new(OWNER),
        MockBlobStore::new(),
    ));
    session.connect().await.unwrap();
    assert!(session.is_owner().await);
    let watcher = session.spawn_account_watcher();

    wallet.switch_account(VOTER);

    // Give the watcher task a moment to re-resolve.
    let mut flipped = false;
    for _ in 0..50 {
        tokio::time::sleep(Duration::from_millis(10)).await;
        if !session.is_owner().await {
            flipped = true;
            break;
        }
    }
    assert!(flipped, "ownership flag was not recomputed");
    assert_eq!(session.account().await, Some(Account::new(VOTER)));
    watcher.abort();
}

#[tokio::test]
async fn second_write_is_rejected_while_one_is_in_flight() {
    let log = CallLog::new();
    let ledger = seeded_ledger(&log);
    ledger.set_confirm_delay(Duration::from_millis(200));
    let session = Arc::new(session_over(
        MockWallet::new(&[VOTER]),
        ledger,
        MockBlobStore::new(),
    ));
    session.connect().await.unwrap();
    session.refresh().await.unwrap();

    let first = {
        let session = Arc::clone(&session);
        tokio::spawn(async move { session.cast_vote(0).await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert!(session.write_in_flight());
    assert!(matches!(
        session.cast_vote(1).await,
        Err(SyncError::WriteInFlight)
    ));
    // Only the first vote ever reached the ledger.
    assert_eq!(log.count_of("ledger.vote"), 1);

    first.await.unwrap().unwrap();
    assert!(!session.write_in_flight());
}

#[tokio::test]
async fn refresh_runs_concurrently_with_an_in_flight_write() {
    let log = CallLog::new();
    let ledger = seeded_ledger(&log);
    ledger.set_confirm_delay(Duration::from_millis(200));
    let session = Arc::new(session_over(
        MockWallet::new(&[VOTER]),
        ledger,
        MockBlobStore::new(),
    ));
    session.connect().await.unwrap();
    session.refresh().await.unwrap();

    let write = {
        let session = Arc::clone(&session);
        tokio::spawn(async move { session.cast_vote(0).await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert!(session.write_in_flight());
    // Reads never take the write slot.
    let snapshot = session.refresh().await.unwrap();
    assert_eq!(snapshot.len(), 2);

    write.await.unwrap().unwrap();
}

#[tokio::test]
async fn failed_refresh_retains_prior_snapshot() {
    let log = CallLog::new();
    let ledger = seeded_ledger(&log);
    let session = session_over(MockWallet::new(&[VOTER]), ledger.clone(), MockBlobStore::new());
    let before = session.refresh().await.unwrap();

    // A third candidate appears but its read fails partway through.
    ledger.push_candidate("Carol", 0, None);
    ledger.set_fail_read_at(Some(2));

    let result = session.refresh().await;
    assert!(matches!(result, Err(SyncError::RemoteUnavailable(_))));
    // No truncated snapshot was installed.
    assert_eq!(session.snapshot().await, before);

    ledger.set_fail_read_at(None);
    let recovered = session.refresh().await.unwrap();
    assert_eq!(recovered.len(), 3);
}

#[tokio::test]
async fn non_owner_submission_is_rejected_by_the_ledger() {
    let log = CallLog::new();
    let session = session_over(
        MockWallet::new(&[VOTER]),
        seeded_ledger(&log),
        MockBlobStore::with_log(Arc::clone(&log)),
    );
    session.connect().await.unwrap();
    session.refresh().await.unwrap();
    assert!(!session.is_owner().await);

    // The advisory flag gates presentation only; the ledger is the
    // authority and refuses the write itself.
    let result = session.add_candidate("Mallory", b"mallory.png").await;
    assert!(matches!(result, Err(SyncError::RejectedByLedger(_))));
    // The blob was already uploaded and stays behind, orphaned.
    assert_eq!(log.count_of("blob.put"), 1);
}
