//! # Adapters Layer (Hexagonal Architecture)
//!
//! Implementations of the outbound ports against real transports.

mod ipfs;
mod ledger;
mod rpc;
mod wallet;

pub use ipfs::IpfsStore;
pub use ledger::JsonRpcLedger;
pub use wallet::JsonRpcWallet;
