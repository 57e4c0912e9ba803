//! # Domain Invariants
//!
//! Rules that must hold for every snapshot and every write the core issues.

use super::entities::{Candidate, CandidateSnapshot};
use super::errors::SyncError;
use super::value_objects::Account;

/// Invariant: a refreshed snapshot is dense and ordered.
///
/// Indices must ascend from zero with no gaps; the ledger assigns them in
/// creation order, so anything else means a corrupted or reordered read.
pub fn invariant_dense_snapshot(candidates: &[Candidate]) -> Result<(), SyncError> {
    for (position, candidate) in candidates.iter().enumerate() {
        if candidate.index != position as u64 {
            return Err(SyncError::RemoteUnavailable(format!(
                "candidate list not dense: index {} at position {}",
                candidate.index, position
            )));
        }
    }
    Ok(())
}

/// Invariant: a vote may only target an index observed in the most recent
/// snapshot. The core never invents or guesses indices.
pub fn invariant_known_index(snapshot: &CandidateSnapshot, index: u64) -> Result<(), SyncError> {
    if snapshot.contains_index(index) {
        Ok(())
    } else {
        Err(SyncError::InvalidIndex { index })
    }
}

/// Ownership is a case-insensitive address comparison against the ledger's
/// recorded owner.
pub fn invariant_is_owner(account: &Account, owner: &Account) -> bool {
    account.matches(owner)
}

/// A candidate name must carry visible characters.
pub fn validate_candidate_name(name: &str) -> Result<(), SyncError> {
    if name.trim().is_empty() {
        return Err(SyncError::Validation(
            "candidate name must not be empty".to_string(),
        ));
    }
    Ok(())
}

/// A candidate image must be present before any remote call is issued.
pub fn validate_image(bytes: &[u8]) -> Result<(), SyncError> {
    if bytes.is_empty() {
        return Err(SyncError::Validation(
            "candidate image must not be empty".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(index: u64) -> Candidate {
        Candidate {
            index,
            name: format!("c{index}"),
            vote_count: 0,
            blob_ref: None,
        }
    }

    #[test]
    fn test_dense_snapshot_ok() {
        let candidates = vec![candidate(0), candidate(1), candidate(2)];
        assert!(invariant_dense_snapshot(&candidates).is_ok());
        assert!(invariant_dense_snapshot(&[]).is_ok());
    }

    #[test]
    fn test_dense_snapshot_gap_rejected() {
        let candidates = vec![candidate(0), candidate(2)];
        assert!(invariant_dense_snapshot(&candidates).is_err());
    }

    #[test]
    fn test_dense_snapshot_wrong_start_rejected() {
        let candidates = vec![candidate(1)];
        assert!(invariant_dense_snapshot(&candidates).is_err());
    }

    #[test]
    fn test_known_index() {
        let snapshot = CandidateSnapshot::new(vec![candidate(0), candidate(1)]);
        assert!(invariant_known_index(&snapshot, 1).is_ok());
        assert!(matches!(
            invariant_known_index(&snapshot, 2),
            Err(SyncError::InvalidIndex { index: 2 })
        ));
    }

    #[test]
    fn test_owner_comparison_case_insensitive() {
        let account = Account::new("0xDeAdBeEf");
        let owner = Account::new("0xdeadbeef");
        assert!(invariant_is_owner(&account, &owner));
        assert!(!invariant_is_owner(&account, &Account::new("0xcafe")));
    }

    #[test]
    fn test_name_validation() {
        assert!(validate_candidate_name("Carol").is_ok());
        assert!(validate_candidate_name("").is_err());
        assert!(validate_candidate_name("   \t").is_err());
    }

    #[test]
    fn test_image_validation() {
        assert!(validate_image(&[1, 2, 3]).is_ok());
        assert!(validate_image(&[]).is_err());
    }
}
