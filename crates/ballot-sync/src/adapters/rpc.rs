//! JSON-RPC 2.0 plumbing shared by the wallet and ledger adapters.

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// JSON-RPC request structure.
#[derive(Debug, Serialize)]
struct JsonRpcRequest<'a, T: Serialize> {
    jsonrpc: &'static str,
    method: &'a str,
    params: T,
    id: u64,
}

/// JSON-RPC response structure.
#[derive(Debug, Deserialize)]
struct JsonRpcResponse<T> {
    #[allow(dead_code)]
    jsonrpc: Option<String>,
    #[allow(dead_code)]
    id: Option<u64>,
    result: Option<T>,
    error: Option<JsonRpcErrorObject>,
}

/// JSON-RPC error object.
#[derive(Debug, Deserialize)]
pub(crate) struct JsonRpcErrorObject {
    /// Remote error code.
    pub code: i64,
    /// Remote error message.
    pub message: String,
}

/// Transport-level errors, mapped onto the domain taxonomy by each adapter.
#[derive(Debug, thiserror::Error)]
pub(crate) enum RpcError {
    #[error("HTTP request failed: {0}")]
    Http(String),
    #[error("cannot connect to {0}")]
    Connection(String),
    #[error("remote error {code}: {message}")]
    Remote { code: i64, message: String },
    #[error("failed to parse response: {0}")]
    Parse(String),
    #[error("response missing result")]
    MissingResult,
}

/// Plain HTTP JSON-RPC transport with an atomic request-id counter.
pub(crate) struct RpcTransport {
    client: reqwest::Client,
    url: String,
    request_id: AtomicU64,
}

impl RpcTransport {
    /// Create a transport for the given endpoint.
    pub fn new(url: impl Into<String>) -> Self {
        // Default client if the builder fails; reqwest::Client::new() is infallible.
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            client,
            url: url.into(),
            request_id: AtomicU64::new(1),
        }
    }

    /// Make a JSON-RPC call.
    pub async fn call<P: Serialize, R: DeserializeOwned>(
        &self,
        method: &str,
        params: P,
    ) -> Result<R, RpcError> {
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            method,
            params,
            id: self.request_id.fetch_add(1, Ordering::Relaxed),
        };

        let response = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() {
                    RpcError::Connection(self.url.clone())
                } else {
                    RpcError::Http(e.to_string())
                }
            })?;

        let rpc_response: JsonRpcResponse<R> = response
            .json()
            .await
            .map_err(|e| RpcError::Parse(e.to_string()))?;

        if let Some(error) = rpc_response.error {
            return Err(RpcError::Remote {
                code: error.code,
                message: error.message,
            });
        }

        rpc_response.result.ok_or(RpcError::MissingResult)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_wire_shape() {
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            method: "ballot_vote",
            params: ("0xc0ffee", 1u64),
            id: 7,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["jsonrpc"], "2.0");
        assert_eq!(json["method"], "ballot_vote");
        assert_eq!(json["params"][1], 1);
        assert_eq!(json["id"], 7);
    }

    #[test]
    fn test_response_error_parse() {
        let raw = r#"{"jsonrpc":"2.0","id":1,"error":{"code":4001,"message":"denied"}}"#;
        let response: JsonRpcResponse<String> = serde_json::from_str(raw).unwrap();
        let error = response.error.unwrap();
        assert_eq!(error.code, 4001);
        assert_eq!(error.message, "denied");
    }

    #[test]
    fn test_response_result_parse() {
        let raw = r#"{"jsonrpc":"2.0","id":1,"result":["0xa11ce"]}"#;
        let response: JsonRpcResponse<Vec<String>> = serde_json::from_str(raw).unwrap();
        assert_eq!(response.result.unwrap(), vec!["0xa11ce".to_string()]);
    }
}
