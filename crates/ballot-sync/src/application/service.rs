//! # Session Service
//!
//! Application service orchestrating identity resolution, snapshot
//! refreshes, and the two write paths against the outbound ports.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::config::SessionConfig;
use crate::domain::{
    invariant_dense_snapshot, invariant_is_owner, invariant_known_index, validate_candidate_name,
    validate_image, Account, BlobRef, Candidate, CandidateSnapshot, IdentityState, PendingIntent,
    Receipt, SyncError, WriteOutcome,
};
use crate::ports::{BlobStore, LedgerConnection, SessionApi, WalletProvider};

/// Ballot session service.
///
/// Owns all session state (identity, snapshot, in-flight write slot); no
/// ambient globals. Share it by handle (`Arc`) with presentation adapters.
pub struct SessionService<W, L, B> {
    /// Static wiring.
    config: SessionConfig,
    /// Wallet provider port.
    wallet: W,
    /// Ledger contract port.
    ledger: L,
    /// Blob store port.
    blobs: B,
    /// Connected account and its ownership standing.
    identity: RwLock<IdentityState>,
    /// Last refreshed candidate snapshot.
    snapshot: RwLock<CandidateSnapshot>,
    /// Single-slot write guard. Holding the lock marks a write in flight;
    /// the payload names the intent. Reads never take this lock.
    in_flight: Mutex<Option<PendingIntent>>,
}

impl<W, L, B> SessionService<W, L, B>
where
    W: WalletProvider,
    L: LedgerConnection,
    B: BlobStore,
{
    /// Create a session over the given ports.
    pub fn new(config: SessionConfig, wallet: W, ledger: L, blobs: B) -> Self {
        Self {
            config,
            wallet,
            ledger,
            blobs,
            identity: RwLock::new(IdentityState::default()),
            snapshot: RwLock::new(CandidateSnapshot::empty()),
            in_flight: Mutex::new(None),
        }
    }

    /// The session configuration.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Network identifier reported by the wallet provider.
    pub async fn network(&self) -> Result<String, SyncError> {
        self.wallet.current_network().await
    }

    /// Re-run identity resolution whenever the wallet reports an account
    /// switch. The watcher queues on the same write slot as writes, so a
    /// mid-write account change never rebinds an in-flight submission.
    pub fn spawn_account_watcher(self: &Arc<Self>) -> tokio::task::JoinHandle<()>
    where
        W: 'static,
        L: 'static,
        B: 'static,
    {
        let mut changes = self.wallet.subscribe_account_changes();
        let session = Arc::clone(self);
        tokio::spawn(async move {
            while let Some(account) = changes.recv().await {
                info!(account = %account, "wallet account changed, re-resolving identity");
                if let Err(err) = session.connect().await {
                    warn!(%err, "identity re-resolution failed");
                }
            }
        })
    }

    /// Connected account or `NotConnected`.
    async fn current_account(&self) -> Result<Account, SyncError> {
        self.identity
            .read()
            .await
            .account
            .clone()
            .ok_or(SyncError::NotConnected)
    }

    /// Resolve the active account and recompute the ownership flag.
    async fn resolve_identity(&self) -> Result<Account, SyncError> {
        let accounts = self.wallet.request_accounts().await?;
        let account = accounts
            .into_iter()
            .next()
            .ok_or_else(|| SyncError::NoWallet("provider returned no accounts".to_string()))?;
        let owner = self.ledger.read_owner().await?;
        let is_owner = invariant_is_owner(&account, &owner);

        let mut identity = self.identity.write().await;
        *identity = IdentityState {
            account: Some(account.clone()),
            is_owner,
        };
        info!(account = %account, is_owner, "session connected");
        Ok(account)
    }

    /// Read the full candidate list: count first, then every index in
    /// order. Indices are dense and assigned in creation order, so the
    /// read order is part of the contract. Any failure aborts the whole
    /// read; nothing truncated is ever returned.
    async fn read_candidates(&self) -> Result<CandidateSnapshot, SyncError> {
        let count = self.ledger.candidate_count().await?;
        let mut candidates = Vec::with_capacity(count as usize);
        for index in 0..count {
            let record = self.ledger.candidate_at(index).await?;
            candidates.push(Candidate {
                index,
                name: record.name,
                vote_count: record.vote_count,
                blob_ref: record.blob_ref,
            });
        }
        invariant_dense_snapshot(&candidates)?;
        debug!(count, "candidate list read");
        Ok(CandidateSnapshot::new(candidates))
    }

    /// Rebuild and install the snapshot. The prior snapshot stays
    /// untouched unless the whole read succeeds.
    async fn refresh_snapshot(&self) -> Result<CandidateSnapshot, SyncError> {
        let fresh = self.read_candidates().await?;
        *self.snapshot.write().await = fresh.clone();
        Ok(fresh)
    }

    /// Map a write outcome onto the caller's result. Only a confirmed
    /// write refreshes the snapshot: after a revert or a timeout the prior
    /// snapshot may still be accurate, and refreshing would dress the
    /// failure up as a stale-looking success.
    async fn finish_write(&self, outcome: WriteOutcome) -> Result<Receipt, SyncError> {
        match outcome {
            WriteOutcome::Confirmed { receipt } => {
                self.refresh_snapshot().await?;
                Ok(receipt)
            }
            WriteOutcome::Reverted { reason } => Err(SyncError::Reverted { reason }),
            WriteOutcome::TimedOut => Err(SyncError::TimedOut),
        }
    }

    async fn vote_pipeline(&self, from: &Account, index: u64) -> Result<Receipt, SyncError> {
        let receipt = self.ledger.submit_vote(from, index).await?;
        debug!(index, tx_hash = %receipt.tx_hash, "vote submitted");
        let outcome = self.ledger.await_confirmation(&receipt).await?;
        self.finish_write(outcome).await
    }

    /// Two-phase candidate write. The blob upload strictly precedes the
    /// ledger submission: a confirmed record must never reference content
    /// that was not durably stored first. On any later failure the blob
    /// stays behind, orphaned but harmless; content-addressed storage has
    /// no meaningful delete-on-rollback.
    async fn add_candidate_pipeline(
        &self,
        from: &Account,
        name: &str,
        image: &[u8],
    ) -> Result<BlobRef, SyncError> {
        let blob_ref = self.blobs.put(image).await?;
        debug!(%blob_ref, "candidate image stored");
        if let Err(err) = self.blobs.organize(&blob_ref).await {
            // Best-effort bookkeeping; durability does not depend on it.
            warn!(%blob_ref, %err, "blob organize step failed");
        }
        let receipt = self.ledger.submit_candidate(from, name, &blob_ref).await?;
        debug!(name, tx_hash = %receipt.tx_hash, "candidate submitted");
        let outcome = self.ledger.await_confirmation(&receipt).await?;
        self.finish_write(outcome).await?;
        Ok(blob_ref)
    }
}

#[async_trait]
impl<W, L, B> SessionApi for SessionService<W, L, B>
where
    W: WalletProvider + 'static,
    L: LedgerConnection + 'static,
    B: BlobStore + 'static,
{
    async fn connect(&self) -> Result<Account, SyncError> {
        // Queue behind any in-flight write: an identity swap must not race
        // a pending submission.
        let _slot = self.in_flight.lock().await;
        self.resolve_identity().await
    }

    async fn refresh(&self) -> Result<CandidateSnapshot, SyncError> {
        self.refresh_snapshot().await
    }

    async fn cast_vote(&self, index: u64) -> Result<Receipt, SyncError> {
        {
            let snapshot = self.snapshot.read().await;
            invariant_known_index(&snapshot, index)?;
        }
        let from = self.current_account().await?;

        let mut slot = self
            .in_flight
            .try_lock()
            .map_err(|_| SyncError::WriteInFlight)?;
        *slot = Some(PendingIntent::Vote { index });
        let result = self.vote_pipeline(&from, index).await;
        *slot = None;
        result
    }

    async fn add_candidate(&self, name: &str, image: &[u8]) -> Result<BlobRef, SyncError> {
        validate_candidate_name(name)?;
        validate_image(image)?;
        let from = self.current_account().await?;

        let mut slot = self
            .in_flight
            .try_lock()
            .map_err(|_| SyncError::WriteInFlight)?;
        *slot = Some(PendingIntent::AddCandidate {
            name: name.to_string(),
        });
        let result = self.add_candidate_pipeline(&from, name, image).await;
        *slot = None;
        result
    }

    async fn snapshot(&self) -> CandidateSnapshot {
        self.snapshot.read().await.clone()
    }

    async fn account(&self) -> Option<Account> {
        self.identity.read().await.account.clone()
    }

    async fn is_owner(&self) -> bool {
        self.identity.read().await.is_owner
    }

    fn write_in_flight(&self) -> bool {
        self.in_flight.try_lock().is_err()
    }
}
