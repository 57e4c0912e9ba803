//! # Inbound Ports
//!
//! API trait defining what a ballot session can do. Implemented by the
//! application service; this is the surface a presentation adapter drives.

use crate::domain::{Account, BlobRef, CandidateSnapshot, Receipt, SyncError};
use async_trait::async_trait;

/// Ballot session API - inbound port.
#[async_trait]
pub trait SessionApi: Send + Sync {
    /// Resolve the active wallet account and recompute ownership.
    ///
    /// Idempotent: calling again re-resolves and may change the account if
    /// the user switched identities in the provider.
    async fn connect(&self) -> Result<Account, SyncError>;

    /// Rebuild the candidate snapshot from the ledger, wholesale.
    ///
    /// On any read failure the prior snapshot is retained unchanged.
    async fn refresh(&self) -> Result<CandidateSnapshot, SyncError>;

    /// Submit a vote for a previously observed candidate index and wait for
    /// its outcome. Refreshes the snapshot only on confirmation.
    async fn cast_vote(&self, index: u64) -> Result<Receipt, SyncError>;

    /// Two-phase candidate registration: upload the image to the blob
    /// store, then commit the reference to the ledger. Returns the content
    /// identifier of the uploaded image.
    async fn add_candidate(&self, name: &str, image: &[u8]) -> Result<BlobRef, SyncError>;

    /// The last refreshed snapshot.
    async fn snapshot(&self) -> CandidateSnapshot;

    /// Currently connected account, if any.
    async fn account(&self) -> Option<Account>;

    /// Whether the connected account is the recorded ledger owner.
    ///
    /// Advisory: gates client-side exposure of candidate registration; the
    /// ledger re-checks ownership on every write.
    async fn is_owner(&self) -> bool;

    /// Whether a write from this session is still awaiting its outcome.
    fn write_in_flight(&self) -> bool;
}
