//! # Domain Errors
//!
//! Error taxonomy for the ballot synchronization core.

use thiserror::Error;

/// Errors surfaced by the synchronization core and its ports.
#[derive(Debug, Error)]
pub enum SyncError {
    /// No wallet provider is reachable at session start.
    #[error("no wallet provider available: {0}")]
    NoWallet(String),

    /// The user declined the account access request.
    #[error("account access rejected by the user")]
    UserRejected,

    /// A write was attempted before an account was resolved.
    #[error("no account connected")]
    NotConnected,

    /// The ledger node could not be reached or answered garbage.
    #[error("ledger unavailable: {0}")]
    RemoteUnavailable(String),

    /// The ledger refused a state-changing submission (e.g. caller not owner).
    #[error("rejected by ledger: {0}")]
    RejectedByLedger(String),

    /// A vote targeted an index that is not a known candidate.
    #[error("candidate index {index} is not in the ballot")]
    InvalidIndex {
        /// The index that was submitted
        index: u64,
    },

    /// The transaction was mined and rolled back by the ledger.
    #[error("transaction reverted: {}", .reason.as_deref().unwrap_or("no reason given"))]
    Reverted {
        /// Revert reason reported by the ledger, if any
        reason: Option<String>,
    },

    /// No confirmation arrived within the bounded wait. The transaction may
    /// still land later; this is never a success and never a known failure.
    #[error("confirmation wait expired; transaction outcome unknown")]
    TimedOut,

    /// The blob store could not accept or acknowledge an upload.
    #[error("blob store unavailable: {0}")]
    StoreUnavailable(String),

    /// Local input validation failed; no remote call was issued.
    #[error("invalid input: {0}")]
    Validation(String),

    /// A prior write from this session has not reached a final outcome.
    #[error("a write is already awaiting confirmation")]
    WriteInFlight,
}

impl SyncError {
    /// True for outcomes where the submitted transaction is known to have
    /// failed, as opposed to an unknown outcome.
    pub fn is_known_failure(&self) -> bool {
        matches!(self, SyncError::Reverted { .. })
    }

    /// True when the outcome of a submitted transaction is still unknown
    /// and must not be treated as either success or failure.
    pub fn is_unknown_outcome(&self) -> bool {
        matches!(self, SyncError::TimedOut)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_index_display() {
        let err = SyncError::InvalidIndex { index: 7 };
        assert!(err.to_string().contains('7'));
    }

    #[test]
    fn test_reverted_with_reason() {
        let err = SyncError::Reverted {
            reason: Some("not owner".to_string()),
        };
        assert!(err.to_string().contains("not owner"));
    }

    #[test]
    fn test_reverted_without_reason() {
        let err = SyncError::Reverted { reason: None };
        assert!(err.to_string().contains("no reason given"));
    }

    #[test]
    fn test_timeout_is_not_known_failure() {
        assert!(!SyncError::TimedOut.is_known_failure());
        assert!(SyncError::TimedOut.is_unknown_outcome());
        assert!(SyncError::Reverted { reason: None }.is_known_failure());
    }
}
