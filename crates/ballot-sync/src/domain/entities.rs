//! # Domain Entities
//!
//! Candidate snapshot and session identity state.

use super::value_objects::{Account, BlobRef};
use serde::{Deserialize, Serialize};

/// A single candidate as observed at the last refresh.
///
/// The authoritative copy lives in the ledger; this is a read-only view.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Candidate {
    /// Ledger-assigned index: stable, zero-based, dense.
    pub index: u64,
    /// Candidate display name.
    pub name: String,
    /// Vote tally at the time of the refresh.
    pub vote_count: u64,
    /// Content identifier of the candidate image, if one was registered.
    pub blob_ref: Option<BlobRef>,
}

/// Point-in-time copy of the ledger's candidate list.
///
/// Rebuilt wholesale on every refresh, never patched incrementally, so the
/// local view cannot drift from missed events. The snapshot is only as
/// current as the last refresh; after a write it is stale until refreshed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CandidateSnapshot {
    candidates: Vec<Candidate>,
}

impl CandidateSnapshot {
    /// Build a snapshot from candidates already ordered by index.
    pub fn new(candidates: Vec<Candidate>) -> Self {
        Self { candidates }
    }

    /// Snapshot with no candidates (state before the first refresh).
    pub fn empty() -> Self {
        Self::default()
    }

    /// Number of candidates observed.
    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    /// True before the first successful refresh or on an empty ballot.
    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// Candidate at a ledger index. Positional lookup is valid because the
    /// snapshot is dense and ordered.
    pub fn get(&self, index: u64) -> Option<&Candidate> {
        self.candidates.get(index as usize)
    }

    /// Whether an index was observed in this snapshot.
    pub fn contains_index(&self, index: u64) -> bool {
        (index as usize) < self.candidates.len()
    }

    /// Iterate candidates in index order.
    pub fn iter(&self) -> std::slice::Iter<'_, Candidate> {
        self.candidates.iter()
    }

    /// The candidates as a slice, index order.
    pub fn as_slice(&self) -> &[Candidate] {
        &self.candidates
    }
}

/// Identity resolved from the wallet, plus its ownership standing.
///
/// `is_owner` is advisory: it gates what the presentation layer offers, the
/// ledger re-checks ownership on every write.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct IdentityState {
    /// Connected account, if a session is established.
    pub account: Option<Account>,
    /// Whether the connected account equals the recorded ledger owner.
    pub is_owner: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(index: u64, name: &str, votes: u64) -> Candidate {
        Candidate {
            index,
            name: name.to_string(),
            vote_count: votes,
            blob_ref: None,
        }
    }

    #[test]
    fn test_empty_snapshot() {
        let snapshot = CandidateSnapshot::empty();
        assert!(snapshot.is_empty());
        assert_eq!(snapshot.len(), 0);
        assert!(!snapshot.contains_index(0));
    }

    #[test]
    fn test_snapshot_positional_lookup() {
        let snapshot =
            CandidateSnapshot::new(vec![candidate(0, "Alice", 3), candidate(1, "Bob", 5)]);
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.get(1).map(|c| c.name.as_str()), Some("Bob"));
        assert!(snapshot.contains_index(1));
        assert!(!snapshot.contains_index(2));
    }

    #[test]
    fn test_identity_default_is_disconnected() {
        let identity = IdentityState::default();
        assert!(identity.account.is_none());
        assert!(!identity.is_owner);
    }
}
