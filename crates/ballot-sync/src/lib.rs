//! # Ballot Sync
//!
//! Synchronization core for a wallet-driven candidate ballot.
//!
//! A connected user views the on-chain candidate list, casts one vote, and,
//! when recognized as the contract owner, registers a new candidate whose
//! image lives in a content-addressed blob store. This crate owns the part
//! that has to be right:
//!
//! - identity resolution from a wallet provider, with an advisory
//!   ownership flag derived against the ledger's recorded owner
//! - a wholesale candidate snapshot rebuilt from the ledger on every
//!   refresh, never patched incrementally
//! - the two-phase candidate write: blob upload strictly before the ledger
//!   commit, so a confirmed record never points at missing content
//! - vote casting with local index validation and a single-slot in-flight
//!   write guard serializing submissions per session
//!
//! ## Module Structure
//!
//! ```text
//! ballot-sync/
//! ├── domain/          # Candidate, CandidateSnapshot, SyncError, invariants
//! ├── ports/           # SessionApi (inbound) + wallet/ledger/blob traits (outbound)
//! ├── application/     # SessionService orchestrating everything
//! ├── adapters/        # JSON-RPC wallet/ledger, IPFS-style blob store
//! └── config.rs        # SessionConfig
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;

// Re-exports
pub use adapters::{IpfsStore, JsonRpcLedger, JsonRpcWallet};
pub use application::SessionService;
pub use config::SessionConfig;
pub use domain::{
    Account, BlobRef, Candidate, CandidateRecord, CandidateSnapshot, IdentityState, PendingIntent,
    Receipt, SyncError, WriteOutcome,
};
pub use ports::{
    BlobStore, CallLog, LedgerConnection, MockBlobStore, MockLedger, MockOutcome, MockWallet,
    SessionApi, WalletProvider,
};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    #[test]
    fn test_version() {
        assert!(!super::VERSION.is_empty());
    }
}
