//! # Session Configuration
//!
//! Static wiring for a ballot session. All values are configuration
//! constants; nothing here is derived at runtime.

use crate::domain::BlobRef;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Ballot session configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SessionConfig {
    /// JSON-RPC endpoint of the ledger node.
    pub ledger_rpc_url: String,

    /// JSON-RPC endpoint of the wallet provider.
    pub wallet_rpc_url: String,

    /// Address of the ballot contract on the ledger.
    pub contract_address: String,

    /// HTTP API endpoint of the blob store.
    pub blob_api_url: String,

    /// Public gateway base URL for displaying stored content.
    pub gateway_base_url: String,

    /// Bounded wait for write confirmation, in seconds. Expiry classifies
    /// the write as timed out; the transaction itself is not canceled.
    pub confirmation_timeout_secs: u64,

    /// Receipt poll interval, in milliseconds.
    pub receipt_poll_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ledger_rpc_url: "http://localhost:8545".to_string(),
            wallet_rpc_url: "http://localhost:8545".to_string(),
            contract_address: "0xe7f1725E7734CE288F8367e1Bb143E90bb3F0512".to_string(),
            blob_api_url: "http://localhost:5001".to_string(),
            gateway_base_url: "https://ipfs.io".to_string(),
            confirmation_timeout_secs: 90,
            receipt_poll_ms: 1500,
        }
    }
}

impl SessionConfig {
    /// Config for tests (short waits).
    pub fn for_testing() -> Self {
        Self {
            confirmation_timeout_secs: 2,
            receipt_poll_ms: 10,
            ..Self::default()
        }
    }

    /// Bounded confirmation wait as a [`Duration`].
    pub fn confirmation_timeout(&self) -> Duration {
        Duration::from_secs(self.confirmation_timeout_secs)
    }

    /// Receipt poll interval as a [`Duration`].
    pub fn receipt_poll_interval(&self) -> Duration {
        Duration::from_millis(self.receipt_poll_ms)
    }

    /// Public retrieval URL for a stored blob. Display-only; the core never
    /// fetches through the gateway.
    pub fn gateway_url(&self, blob_ref: &BlobRef) -> String {
        format!(
            "{}/ipfs/{}",
            self.gateway_base_url.trim_end_matches('/'),
            blob_ref
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SessionConfig::default();
        assert_eq!(config.confirmation_timeout_secs, 90);
        assert!(config.contract_address.starts_with("0x"));
    }

    #[test]
    fn test_testing_config_is_fast() {
        let config = SessionConfig::for_testing();
        assert!(config.confirmation_timeout() <= Duration::from_secs(2));
    }

    #[test]
    fn test_gateway_url_formatting() {
        let config = SessionConfig {
            gateway_base_url: "https://ipfs.io/".to_string(),
            ..SessionConfig::default()
        };
        assert_eq!(
            config.gateway_url(&BlobRef::new("cidA")),
            "https://ipfs.io/ipfs/cidA"
        );
    }
}
