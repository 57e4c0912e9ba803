//! Ledger adapter for the ballot contract, spoken over JSON-RPC.
//!
//! The node exposes the contract through a `ballot_` method namespace; the
//! contract address travels as the first parameter of every call.

use super::rpc::{RpcError, RpcTransport};
use crate::config::SessionConfig;
use crate::domain::{Account, BlobRef, CandidateRecord, Receipt, SyncError, WriteOutcome};
use crate::ports::LedgerConnection;
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

/// Node error code for a vote targeting an unknown candidate index.
const ERR_INVALID_INDEX: i64 = -32001;

/// Receipt state as reported by the node.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
enum TxStatus {
    Pending,
    Confirmed,
    Reverted,
}

/// Receipt lookup response.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReceiptStatus {
    status: TxStatus,
    #[serde(default)]
    revert_reason: Option<String>,
}

/// JSON-RPC ledger connection.
pub struct JsonRpcLedger {
    rpc: RpcTransport,
    contract: String,
    confirmation_timeout: Duration,
    poll_interval: Duration,
}

impl JsonRpcLedger {
    /// Connect to a node for the given contract address.
    pub fn new(url: impl Into<String>, contract: impl Into<String>) -> Self {
        Self {
            rpc: RpcTransport::new(url),
            contract: contract.into(),
            confirmation_timeout: Duration::from_secs(90),
            poll_interval: Duration::from_millis(1500),
        }
    }

    /// Build the connection from session configuration.
    pub fn from_config(config: &SessionConfig) -> Self {
        Self {
            rpc: RpcTransport::new(config.ledger_rpc_url.clone()),
            contract: config.contract_address.clone(),
            confirmation_timeout: config.confirmation_timeout(),
            poll_interval: config.receipt_poll_interval(),
        }
    }

    /// Every read failure is a node problem from the caller's perspective.
    fn map_read_err(err: RpcError) -> SyncError {
        SyncError::RemoteUnavailable(err.to_string())
    }

    fn map_vote_err(index: u64, err: RpcError) -> SyncError {
        match err {
            RpcError::Remote {
                code: ERR_INVALID_INDEX,
                ..
            } => SyncError::InvalidIndex { index },
            RpcError::Remote { code, message } => {
                SyncError::RejectedByLedger(format!("{code}: {message}"))
            }
            other => SyncError::RemoteUnavailable(other.to_string()),
        }
    }

    fn map_submit_err(err: RpcError) -> SyncError {
        match err {
            RpcError::Remote { code, message } => {
                SyncError::RejectedByLedger(format!("{code}: {message}"))
            }
            other => SyncError::RemoteUnavailable(other.to_string()),
        }
    }

    async fn poll_until_final(&self, receipt: &Receipt) -> Result<WriteOutcome, SyncError> {
        loop {
            let status: Option<ReceiptStatus> = self
                .rpc
                .call("ballot_getReceipt", (receipt.tx_hash.as_str(),))
                .await
                .map_err(Self::map_read_err)?;
            match status {
                Some(ReceiptStatus {
                    status: TxStatus::Confirmed,
                    ..
                }) => {
                    return Ok(WriteOutcome::Confirmed {
                        receipt: receipt.clone(),
                    })
                }
                Some(ReceiptStatus {
                    status: TxStatus::Reverted,
                    revert_reason,
                }) => {
                    return Ok(WriteOutcome::Reverted {
                        reason: revert_reason,
                    })
                }
                // Not indexed yet, or still pending: keep polling.
                _ => tokio::time::sleep(self.poll_interval).await,
            }
        }
    }
}

#[async_trait]
impl LedgerConnection for JsonRpcLedger {
    async fn read_owner(&self) -> Result<Account, SyncError> {
        let owner: String = self
            .rpc
            .call("ballot_owner", (self.contract.as_str(),))
            .await
            .map_err(Self::map_read_err)?;
        Ok(Account::new(owner))
    }

    async fn candidate_count(&self) -> Result<u64, SyncError> {
        self.rpc
            .call("ballot_candidatesCount", (self.contract.as_str(),))
            .await
            .map_err(Self::map_read_err)
    }

    async fn candidate_at(&self, index: u64) -> Result<CandidateRecord, SyncError> {
        self.rpc
            .call("ballot_candidates", (self.contract.as_str(), index))
            .await
            .map_err(Self::map_read_err)
    }

    async fn submit_candidate(
        &self,
        from: &Account,
        name: &str,
        blob_ref: &BlobRef,
    ) -> Result<Receipt, SyncError> {
        let tx_hash: String = self
            .rpc
            .call(
                "ballot_addCandidate",
                (self.contract.as_str(), from.as_str(), name, blob_ref.as_str()),
            )
            .await
            .map_err(Self::map_submit_err)?;
        debug!(%tx_hash, "candidate submission accepted");
        Ok(Receipt::new(tx_hash))
    }

    async fn submit_vote(&self, from: &Account, index: u64) -> Result<Receipt, SyncError> {
        let tx_hash: String = self
            .rpc
            .call(
                "ballot_vote",
                (self.contract.as_str(), from.as_str(), index),
            )
            .await
            .map_err(|e| Self::map_vote_err(index, e))?;
        debug!(%tx_hash, index, "vote submission accepted");
        Ok(Receipt::new(tx_hash))
    }

    async fn await_confirmation(&self, receipt: &Receipt) -> Result<WriteOutcome, SyncError> {
        match tokio::time::timeout(self.confirmation_timeout, self.poll_until_final(receipt)).await
        {
            Ok(outcome) => outcome,
            // Expiry is a classification, not a cancel: the transaction may
            // still confirm later.
            Err(_) => Ok(WriteOutcome::TimedOut),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_receipt_status_parse() {
        let status: ReceiptStatus =
            serde_json::from_str(r#"{"status":"reverted","revertReason":"not owner"}"#).unwrap();
        assert_eq!(status.status, TxStatus::Reverted);
        assert_eq!(status.revert_reason.as_deref(), Some("not owner"));

        let pending: ReceiptStatus = serde_json::from_str(r#"{"status":"pending"}"#).unwrap();
        assert_eq!(pending.status, TxStatus::Pending);
        assert!(pending.revert_reason.is_none());
    }

    #[test]
    fn test_invalid_index_code_mapping() {
        let err = JsonRpcLedger::map_vote_err(
            3,
            RpcError::Remote {
                code: ERR_INVALID_INDEX,
                message: "bad index".to_string(),
            },
        );
        assert!(matches!(err, SyncError::InvalidIndex { index: 3 }));
    }

    #[test]
    fn test_other_write_rejections_keep_reason() {
        let err = JsonRpcLedger::map_submit_err(RpcError::Remote {
            code: -32000,
            message: "caller is not the owner".to_string(),
        });
        match err {
            SyncError::RejectedByLedger(reason) => assert!(reason.contains("not the owner")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_transport_failures_are_remote_unavailable() {
        let err = JsonRpcLedger::map_submit_err(RpcError::Connection("http://node".to_string()));
        assert!(matches!(err, SyncError::RemoteUnavailable(_)));
    }
}
