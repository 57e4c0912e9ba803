//! # Outbound Ports
//!
//! Traits for the external collaborators: wallet provider, ledger contract,
//! content-addressed blob store. Mock implementations live at the bottom.

use crate::domain::{Account, BlobRef, CandidateRecord, Receipt, SyncError, WriteOutcome};
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::mpsc;

/// Wallet provider - outbound port.
#[async_trait]
pub trait WalletProvider: Send + Sync {
    /// Request account access; the first account is the active identity.
    async fn request_accounts(&self) -> Result<Vec<Account>, SyncError>;

    /// Identifier of the network the provider is connected to.
    async fn current_network(&self) -> Result<String, SyncError>;

    /// Subscribe to account-change notifications. The receiver yields the
    /// new active account whenever the user switches identities.
    fn subscribe_account_changes(&self) -> mpsc::UnboundedReceiver<Account>;
}

/// Ledger contract connection - outbound port.
///
/// Writes return a pending receipt immediately; the caller awaits the
/// confirmation separately. Every write carries the `from` account so the
/// signer is always the connected identity.
#[async_trait]
pub trait LedgerConnection: Send + Sync {
    /// Recorded contract owner. Read-only, no side effects.
    async fn read_owner(&self) -> Result<Account, SyncError>;

    /// Number of registered candidates.
    async fn candidate_count(&self) -> Result<u64, SyncError>;

    /// Candidate record at a ledger index.
    async fn candidate_at(&self, index: u64) -> Result<CandidateRecord, SyncError>;

    /// Submit a candidate registration referencing an already stored blob.
    async fn submit_candidate(
        &self,
        from: &Account,
        name: &str,
        blob_ref: &BlobRef,
    ) -> Result<Receipt, SyncError>;

    /// Submit a vote for a candidate index.
    async fn submit_vote(&self, from: &Account, index: u64) -> Result<Receipt, SyncError>;

    /// Wait for the final outcome of a submitted write. Suspends only the
    /// calling task; a bounded wait classifies expiry as
    /// [`WriteOutcome::TimedOut`] without canceling the transaction.
    async fn await_confirmation(&self, receipt: &Receipt) -> Result<WriteOutcome, SyncError>;
}

/// Content-addressed blob store - outbound port.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store bytes and return their content identifier. Deterministic:
    /// identical content yields an identical identifier.
    async fn put(&self, bytes: &[u8]) -> Result<BlobRef, SyncError>;

    /// Best-effort bookkeeping that makes stored content browsable.
    /// Callers treat failures as log-only; blob durability never depends
    /// on this step.
    async fn organize(&self, blob_ref: &BlobRef) -> Result<(), SyncError>;
}

// =============================================================================
// Mock Implementations for Testing
// =============================================================================

fn locked<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().expect("mock state lock poisoned")
}

/// Records the order of remote calls made against the mock collaborators.
///
/// Shared between mocks so tests can assert cross-component sequencing,
/// e.g. that a blob upload strictly precedes the ledger submission.
#[derive(Debug, Default)]
pub struct CallLog {
    calls: Mutex<Vec<String>>,
}

impl CallLog {
    /// New empty shared log.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Append a call marker.
    pub fn record(&self, call: impl Into<String>) {
        locked(&self.calls).push(call.into());
    }

    /// All markers in call order.
    pub fn calls(&self) -> Vec<String> {
        locked(&self.calls).clone()
    }

    /// Number of markers starting with `prefix`.
    pub fn count_of(&self, prefix: &str) -> usize {
        locked(&self.calls)
            .iter()
            .filter(|c| c.starts_with(prefix))
            .count()
    }

    /// Position of the first marker starting with `prefix`.
    pub fn first_position(&self, prefix: &str) -> Option<usize> {
        locked(&self.calls)
            .iter()
            .position(|c| c.starts_with(prefix))
    }
}

/// Mock wallet provider.
///
/// Clone handles share state, so a test can keep one handle and hand
/// another to the session under test.
#[derive(Clone)]
pub struct MockWallet {
    inner: Arc<MockWalletState>,
}

struct MockWalletState {
    accounts: Mutex<Vec<Account>>,
    network: Mutex<String>,
    absent: AtomicBool,
    reject: AtomicBool,
    change_tx: Mutex<Option<mpsc::UnboundedSender<Account>>>,
}

impl MockWallet {
    /// Wallet with the given accounts; the first is active.
    pub fn new(accounts: &[&str]) -> Self {
        Self {
            inner: Arc::new(MockWalletState {
                accounts: Mutex::new(accounts.iter().copied().map(Account::new).collect()),
                network: Mutex::new("1337".to_string()),
                absent: AtomicBool::new(false),
                reject: AtomicBool::new(false),
                change_tx: Mutex::new(None),
            }),
        }
    }

    /// Simulate a missing provider.
    pub fn absent() -> Self {
        let wallet = Self::new(&[]);
        wallet.inner.absent.store(true, Ordering::SeqCst);
        wallet
    }

    /// Simulate the user declining the access request.
    pub fn rejecting(account: &str) -> Self {
        let wallet = Self::new(&[account]);
        wallet.inner.reject.store(true, Ordering::SeqCst);
        wallet
    }

    /// Replace the account list without notifying subscribers.
    pub fn set_accounts(&self, accounts: &[&str]) {
        *locked(&self.inner.accounts) = accounts.iter().copied().map(Account::new).collect();
    }

    /// Switch the active account and emit a change notification.
    pub fn switch_account(&self, account: &str) {
        self.set_accounts(&[account]);
        if let Some(tx) = locked(&self.inner.change_tx).as_ref() {
            let _ = tx.send(Account::new(account));
        }
    }
}

#[async_trait]
impl WalletProvider for MockWallet {
    async fn request_accounts(&self) -> Result<Vec<Account>, SyncError> {
        if self.inner.absent.load(Ordering::SeqCst) {
            return Err(SyncError::NoWallet("no provider installed".to_string()));
        }
        if self.inner.reject.load(Ordering::SeqCst) {
            return Err(SyncError::UserRejected);
        }
        Ok(locked(&self.inner.accounts).clone())
    }

    async fn current_network(&self) -> Result<String, SyncError> {
        if self.inner.absent.load(Ordering::SeqCst) {
            return Err(SyncError::NoWallet("no provider installed".to_string()));
        }
        Ok(locked(&self.inner.network).clone())
    }

    fn subscribe_account_changes(&self) -> mpsc::UnboundedReceiver<Account> {
        let (tx, rx) = mpsc::unbounded_channel();
        *locked(&self.inner.change_tx) = Some(tx);
        rx
    }
}

/// How the mock ledger resolves submitted writes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MockOutcome {
    /// Apply the write and confirm it.
    Confirm,
    /// Roll the write back with an optional revert reason.
    Revert(Option<String>),
    /// Leave the write unresolved; the caller's bounded wait expires.
    TimeOut,
}

#[derive(Clone, Debug)]
enum MockWrite {
    Vote { index: u64 },
    Add { name: String, blob_ref: BlobRef },
}

/// Mock ledger connection holding candidate state in memory.
#[derive(Clone)]
pub struct MockLedger {
    inner: Arc<MockLedgerState>,
}

struct MockLedgerState {
    owner: Mutex<Account>,
    candidates: Mutex<Vec<CandidateRecord>>,
    pending: Mutex<HashMap<String, MockWrite>>,
    outcome: Mutex<MockOutcome>,
    confirm_delay: Mutex<Duration>,
    fail_reads: AtomicBool,
    fail_read_at: Mutex<Option<u64>>,
    reject_writes: Mutex<Option<String>>,
    next_tx: AtomicU64,
    log: Arc<CallLog>,
}

impl MockLedger {
    /// Ledger owned by the given account, with an empty candidate list.
    pub fn new(owner: &str) -> Self {
        Self::with_log(owner, CallLog::new())
    }

    /// Same, recording calls into a shared log.
    pub fn with_log(owner: &str, log: Arc<CallLog>) -> Self {
        Self {
            inner: Arc::new(MockLedgerState {
                owner: Mutex::new(Account::new(owner)),
                candidates: Mutex::new(Vec::new()),
                pending: Mutex::new(HashMap::new()),
                outcome: Mutex::new(MockOutcome::Confirm),
                confirm_delay: Mutex::new(Duration::ZERO),
                fail_reads: AtomicBool::new(false),
                fail_read_at: Mutex::new(None),
                reject_writes: Mutex::new(None),
                next_tx: AtomicU64::new(1),
                log,
            }),
        }
    }

    /// Seed a candidate record.
    pub fn push_candidate(&self, name: &str, votes: u64, blob_ref: Option<&str>) {
        locked(&self.inner.candidates).push(CandidateRecord {
            name: name.to_string(),
            vote_count: votes,
            blob_ref: blob_ref.map(BlobRef::new),
        });
    }

    /// Replace the recorded owner.
    pub fn set_owner(&self, owner: &str) {
        *locked(&self.inner.owner) = Account::new(owner);
    }

    /// Choose how submitted writes resolve.
    pub fn set_outcome(&self, outcome: MockOutcome) {
        *locked(&self.inner.outcome) = outcome;
    }

    /// Delay confirmation resolution, to keep a write in flight.
    pub fn set_confirm_delay(&self, delay: Duration) {
        *locked(&self.inner.confirm_delay) = delay;
    }

    /// Make every read fail.
    pub fn set_fail_reads(&self, fail: bool) {
        self.inner.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make the read of one specific candidate index fail.
    pub fn set_fail_read_at(&self, index: Option<u64>) {
        *locked(&self.inner.fail_read_at) = index;
    }

    /// Make every write submission fail with the given reason.
    pub fn set_reject_writes(&self, reason: Option<&str>) {
        *locked(&self.inner.reject_writes) = reason.map(str::to_string);
    }

    /// Current candidate records, for assertions.
    pub fn records(&self) -> Vec<CandidateRecord> {
        locked(&self.inner.candidates).clone()
    }

    fn next_tx_hash(&self) -> String {
        format!("0xtx{:04x}", self.inner.next_tx.fetch_add(1, Ordering::SeqCst))
    }
}

#[async_trait]
impl LedgerConnection for MockLedger {
    async fn read_owner(&self) -> Result<Account, SyncError> {
        self.inner.log.record("ledger.owner");
        if self.inner.fail_reads.load(Ordering::SeqCst) {
            return Err(SyncError::RemoteUnavailable("mock node down".to_string()));
        }
        Ok(locked(&self.inner.owner).clone())
    }

    async fn candidate_count(&self) -> Result<u64, SyncError> {
        self.inner.log.record("ledger.candidatesCount");
        if self.inner.fail_reads.load(Ordering::SeqCst) {
            return Err(SyncError::RemoteUnavailable("mock node down".to_string()));
        }
        Ok(locked(&self.inner.candidates).len() as u64)
    }

    async fn candidate_at(&self, index: u64) -> Result<CandidateRecord, SyncError> {
        self.inner.log.record(format!("ledger.candidates({index})"));
        if self.inner.fail_reads.load(Ordering::SeqCst)
            || *locked(&self.inner.fail_read_at) == Some(index)
        {
            return Err(SyncError::RemoteUnavailable("mock node down".to_string()));
        }
        locked(&self.inner.candidates)
            .get(index as usize)
            .cloned()
            .ok_or_else(|| SyncError::RemoteUnavailable(format!("no candidate at {index}")))
    }

    async fn submit_candidate(
        &self,
        from: &Account,
        name: &str,
        blob_ref: &BlobRef,
    ) -> Result<Receipt, SyncError> {
        self.inner.log.record("ledger.addCandidate");
        if let Some(reason) = locked(&self.inner.reject_writes).clone() {
            return Err(SyncError::RejectedByLedger(reason));
        }
        // The ledger is the authority on ownership, whatever the client thinks.
        if !from.matches(&locked(&self.inner.owner)) {
            return Err(SyncError::RejectedByLedger(
                "caller is not the owner".to_string(),
            ));
        }
        let tx_hash = self.next_tx_hash();
        locked(&self.inner.pending).insert(
            tx_hash.clone(),
            MockWrite::Add {
                name: name.to_string(),
                blob_ref: blob_ref.clone(),
            },
        );
        Ok(Receipt::new(tx_hash))
    }

    async fn submit_vote(&self, _from: &Account, index: u64) -> Result<Receipt, SyncError> {
        self.inner.log.record(format!("ledger.vote({index})"));
        if let Some(reason) = locked(&self.inner.reject_writes).clone() {
            return Err(SyncError::RejectedByLedger(reason));
        }
        if index as usize >= locked(&self.inner.candidates).len() {
            return Err(SyncError::InvalidIndex { index });
        }
        let tx_hash = self.next_tx_hash();
        locked(&self.inner.pending).insert(tx_hash.clone(), MockWrite::Vote { index });
        Ok(Receipt::new(tx_hash))
    }

    async fn await_confirmation(&self, receipt: &Receipt) -> Result<WriteOutcome, SyncError> {
        self.inner.log.record("ledger.getReceipt");
        let delay = *locked(&self.inner.confirm_delay);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        let outcome = locked(&self.inner.outcome).clone();
        match outcome {
            MockOutcome::Confirm => {
                if let Some(write) = locked(&self.inner.pending).remove(&receipt.tx_hash) {
                    let mut candidates = locked(&self.inner.candidates);
                    match write {
                        MockWrite::Vote { index } => {
                            if let Some(record) = candidates.get_mut(index as usize) {
                                record.vote_count += 1;
                            }
                        }
                        MockWrite::Add { name, blob_ref } => {
                            candidates.push(CandidateRecord {
                                name,
                                vote_count: 0,
                                blob_ref: Some(blob_ref),
                            });
                        }
                    }
                }
                Ok(WriteOutcome::Confirmed {
                    receipt: receipt.clone(),
                })
            }
            MockOutcome::Revert(reason) => {
                locked(&self.inner.pending).remove(&receipt.tx_hash);
                Ok(WriteOutcome::Reverted { reason })
            }
            // Pending entry stays: the transaction was not canceled.
            MockOutcome::TimeOut => Ok(WriteOutcome::TimedOut),
        }
    }
}

/// Mock content-addressed blob store.
#[derive(Clone, Default)]
pub struct MockBlobStore {
    inner: Arc<MockBlobState>,
}

#[derive(Default)]
struct MockBlobState {
    fail_put: AtomicBool,
    fail_organize: AtomicBool,
    puts: Mutex<Vec<Vec<u8>>>,
    organized: Mutex<Vec<BlobRef>>,
    log: Mutex<Option<Arc<CallLog>>>,
}

impl MockBlobStore {
    /// Store that accepts everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Same, recording calls into a shared log.
    pub fn with_log(log: Arc<CallLog>) -> Self {
        let store = Self::default();
        *locked(&store.inner.log) = Some(log);
        store
    }

    /// Make uploads fail.
    pub fn set_fail_put(&self, fail: bool) {
        self.inner.fail_put.store(fail, Ordering::SeqCst);
    }

    /// Make the organize step fail.
    pub fn set_fail_organize(&self, fail: bool) {
        self.inner.fail_organize.store(fail, Ordering::SeqCst);
    }

    /// Number of successful uploads.
    pub fn put_count(&self) -> usize {
        locked(&self.inner.puts).len()
    }

    /// Refs passed to the organize step.
    pub fn organized(&self) -> Vec<BlobRef> {
        locked(&self.inner.organized).clone()
    }

    fn record(&self, call: &str) {
        if let Some(log) = locked(&self.inner.log).as_ref() {
            log.record(call);
        }
    }
}

#[async_trait]
impl BlobStore for MockBlobStore {
    async fn put(&self, bytes: &[u8]) -> Result<BlobRef, SyncError> {
        self.record("blob.put");
        if self.inner.fail_put.load(Ordering::SeqCst) {
            return Err(SyncError::StoreUnavailable("mock store offline".to_string()));
        }
        locked(&self.inner.puts).push(bytes.to_vec());
        // Content addressing: identical bytes always yield the same ref.
        let digest = Sha256::digest(bytes);
        let id: String = digest[..8].iter().map(|b| format!("{b:02x}")).collect();
        Ok(BlobRef::new(format!("bafk{id}")))
    }

    async fn organize(&self, blob_ref: &BlobRef) -> Result<(), SyncError> {
        self.record("blob.organize");
        if self.inner.fail_organize.load(Ordering::SeqCst) {
            return Err(SyncError::StoreUnavailable(
                "mock organize failed".to_string(),
            ));
        }
        locked(&self.inner.organized).push(blob_ref.clone());
        Ok(())
    }
}
