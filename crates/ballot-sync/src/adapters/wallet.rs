//! Wallet provider adapter speaking the EIP-1193-style JSON-RPC method set.

use super::rpc::{RpcError, RpcTransport};
use crate::domain::{Account, SyncError};
use crate::ports::WalletProvider;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::debug;

/// Provider error code for a user-declined request.
const USER_REJECTED_CODE: i64 = 4001;

/// JSON-RPC wallet provider.
///
/// Account changes are detected by polling `eth_accounts`; an HTTP
/// transport has no push channel.
pub struct JsonRpcWallet {
    rpc: Arc<RpcTransport>,
    poll_interval: Duration,
}

impl JsonRpcWallet {
    /// Connect to a wallet provider endpoint.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            rpc: Arc::new(RpcTransport::new(url)),
            poll_interval: Duration::from_secs(5),
        }
    }

    /// Same, with a custom account poll interval.
    pub fn with_poll_interval(url: impl Into<String>, poll_interval: Duration) -> Self {
        Self {
            rpc: Arc::new(RpcTransport::new(url)),
            poll_interval,
        }
    }

    fn map_err(&self, err: RpcError) -> SyncError {
        match err {
            RpcError::Remote {
                code: USER_REJECTED_CODE,
                ..
            } => SyncError::UserRejected,
            RpcError::Connection(url) => {
                SyncError::NoWallet(format!("no provider reachable at {url}"))
            }
            other => SyncError::NoWallet(other.to_string()),
        }
    }
}

#[async_trait]
impl WalletProvider for JsonRpcWallet {
    async fn request_accounts(&self) -> Result<Vec<Account>, SyncError> {
        let accounts: Vec<String> = self
            .rpc
            .call("eth_requestAccounts", Vec::<()>::new())
            .await
            .map_err(|e| self.map_err(e))?;
        Ok(accounts.into_iter().map(Account::new).collect())
    }

    async fn current_network(&self) -> Result<String, SyncError> {
        self.rpc
            .call("net_version", Vec::<()>::new())
            .await
            .map_err(|e| self.map_err(e))
    }

    fn subscribe_account_changes(&self) -> mpsc::UnboundedReceiver<Account> {
        let (tx, rx) = mpsc::unbounded_channel();
        let rpc = Arc::clone(&self.rpc);
        let interval = self.poll_interval;
        tokio::spawn(async move {
            // First observation only sets the baseline; connect() already
            // resolved the initial identity.
            let mut last: Option<String> = None;
            loop {
                tokio::time::sleep(interval).await;
                if tx.is_closed() {
                    break;
                }
                let accounts: Result<Vec<String>, _> =
                    rpc.call("eth_accounts", Vec::<()>::new()).await;
                let Some(current) = accounts.ok().and_then(|a| a.into_iter().next()) else {
                    continue;
                };
                let changed = last
                    .as_deref()
                    .map(|l| !l.eq_ignore_ascii_case(&current))
                    .unwrap_or(false);
                if changed {
                    debug!(account = %current, "active account changed");
                    if tx.send(Account::new(current.clone())).is_err() {
                        break;
                    }
                }
                last = Some(current);
            }
        });
        rx
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_rejection_maps_to_domain_error() {
        let wallet = JsonRpcWallet::new("http://localhost:8545");
        let err = wallet.map_err(RpcError::Remote {
            code: USER_REJECTED_CODE,
            message: "User rejected the request.".to_string(),
        });
        assert!(matches!(err, SyncError::UserRejected));
    }

    #[test]
    fn test_unreachable_provider_maps_to_no_wallet() {
        let wallet = JsonRpcWallet::new("http://localhost:8545");
        let err = wallet.map_err(RpcError::Connection("http://localhost:8545".to_string()));
        assert!(matches!(err, SyncError::NoWallet(_)));
    }
}
