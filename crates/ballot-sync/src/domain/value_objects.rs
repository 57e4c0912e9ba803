//! # Domain Value Objects
//!
//! Immutable value types shared across the synchronization core.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque wallet address identifying the connected identity.
///
/// Addresses are hex strings with no canonical letter case, so equality for
/// ownership purposes is case-insensitive (`matches`). The derived `Eq` is
/// byte-exact and only used for change detection.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Account(String);

impl Account {
    /// Wrap an address string.
    pub fn new(address: impl Into<String>) -> Self {
        Self(address.into())
    }

    /// The raw address string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Case-insensitive address comparison.
    pub fn matches(&self, other: &Account) -> bool {
        self.0.eq_ignore_ascii_case(&other.0)
    }
}

impl fmt::Display for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Content identifier produced by the blob store.
///
/// The same byte content always yields the same identifier. A ref is
/// meaningless until a confirmed candidate record points at it; until then
/// it is an orphaned but harmless upload.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct BlobRef(String);

impl BlobRef {
    /// Wrap a content identifier.
    pub fn new(content_id: impl Into<String>) -> Self {
        Self(content_id.into())
    }

    /// The raw content identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BlobRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Handle for a submitted write, trackable to a final outcome.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Receipt {
    /// Transaction hash assigned by the ledger on submission.
    pub tx_hash: String,
}

impl Receipt {
    /// Create a receipt from a transaction hash.
    pub fn new(tx_hash: impl Into<String>) -> Self {
        Self {
            tx_hash: tx_hash.into(),
        }
    }
}

/// Final classification of a submitted write.
///
/// `TimedOut` is client-local: the bounded wait expired without a
/// confirmation, but the transaction was not canceled and may still land.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WriteOutcome {
    /// The transaction was mined and finalized.
    Confirmed {
        /// Receipt of the confirmed transaction
        receipt: Receipt,
    },
    /// The ledger executed and rolled back the transaction.
    Reverted {
        /// Revert reason, if the ledger reported one
        reason: Option<String>,
    },
    /// No confirmation within the bounded wait; outcome unknown.
    TimedOut,
}

impl WriteOutcome {
    /// True only for a confirmed write.
    pub fn is_confirmed(&self) -> bool {
        matches!(self, WriteOutcome::Confirmed { .. })
    }
}

/// A write in flight from this session, before ledger confirmation.
///
/// Transient: held only by the single-slot write guard, never persisted,
/// cleared when the write reaches a final outcome.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PendingIntent {
    /// Two-phase candidate registration.
    AddCandidate {
        /// Candidate name being submitted
        name: String,
    },
    /// Vote submission for a previously observed index.
    Vote {
        /// Candidate index being voted for
        index: u64,
    },
}

/// Raw candidate record as the ledger contract returns it.
///
/// The ledger-assigned index is positional and is attached by the refresh
/// that reads records in index order.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CandidateRecord {
    /// Candidate display name.
    pub name: String,
    /// Current vote tally.
    pub vote_count: u64,
    /// Content identifier of the candidate image, if one was registered.
    #[serde(default)]
    pub blob_ref: Option<BlobRef>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_account_matches_ignores_case() {
        let a = Account::new("0xAbCd01");
        let b = Account::new("0xabcd01");
        assert!(a.matches(&b));
        assert_ne!(a, b);
    }

    #[test]
    fn test_account_mismatch() {
        let a = Account::new("0xAbCd01");
        let b = Account::new("0xabcd02");
        assert!(!a.matches(&b));
    }

    #[test]
    fn test_write_outcome_confirmed() {
        let outcome = WriteOutcome::Confirmed {
            receipt: Receipt::new("0x1"),
        };
        assert!(outcome.is_confirmed());
        assert!(!WriteOutcome::TimedOut.is_confirmed());
    }

    #[test]
    fn test_candidate_record_json_shape() {
        let record: CandidateRecord =
            serde_json::from_str(r#"{"name":"Alice","voteCount":3,"blobRef":"cidA"}"#).unwrap();
        assert_eq!(record.name, "Alice");
        assert_eq!(record.vote_count, 3);
        assert_eq!(record.blob_ref, Some(BlobRef::new("cidA")));
    }

    #[test]
    fn test_candidate_record_blob_ref_optional() {
        let record: CandidateRecord =
            serde_json::from_str(r#"{"name":"Bob","voteCount":0}"#).unwrap();
        assert_eq!(record.blob_ref, None);
    }
}
