//! JSON-RPC message shapes for talking to a node.
//!
//! Only the payloads live here. Moving them over HTTP is the caller's job.

use alloc::string::{String, ToString};
use alloc::vec;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use crate::error::{MinerError, Result};
use crate::template::BlockTemplate;

/// A JSON-RPC 1.0 request as bitcoind expects it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RpcRequest {
    pub jsonrpc: String,
    pub id: String,
    pub method: String,
    pub params: Value,
}

impl RpcRequest {
    /// A JSON-RPC 1.0 request envelope.
    pub fn new(id: &str, method: &str, params: Value) -> Self {
        RpcRequest {
            jsonrpc: "1.0".to_string(),
            id: id.to_string(),
            method: method.to_string(),
            params,
        }
    }

    /// `getblocktemplate` with the segwit rule set, which nodes require.
    pub fn get_block_template() -> Self {
        Self::new("miner", "getblocktemplate", json!([{ "rules": ["segwit"] }]))
    }

    /// `submitblock` for a hex-serialized block.
    pub fn submit_block(block_hex: &str) -> Self {
        Self::new("submit", "submitblock", Value::Array(vec![Value::String(block_hex.to_string())]))
    }

    /// Serialize as the HTTP POST body.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// The `error` object of a JSON-RPC response.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
}

/// A JSON-RPC response envelope.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RpcResponse {
    #[serde(default)]
    pub result: Value,
    #[serde(default)]
    pub error: Option<RpcError>,
    #[serde(default)]
    pub id: Value,
}

impl RpcResponse {
    /// Parse a response body.
    pub fn from_json_str(s: &str) -> Result<Self> {
        Ok(serde_json::from_str(s)?)
    }

    /// The `result` member, or the node's error.
    pub fn into_result(self) -> Result<Value> {
        match self.error {
            Some(e) => Err(MinerError::RpcFailed {
                code: e.code,
                message: e.message,
            }),
            None => Ok(self.result),
        }
    }
}

/// Parse a `getblocktemplate` response into a template.
pub fn parse_template_response(body: &str) -> Result<BlockTemplate> {
    let result = RpcResponse::from_json_str(body)?.into_result()?;
    BlockTemplate::from_json(&result)
}

/// Interpret a `submitblock` response.
///
/// A null error with a null result means the block was accepted. A
/// non-null error, or a string result such as `"duplicate"` or
/// `"inconclusive"`, is a rejection.
pub fn parse_submit_response(body: &str) -> Result<()> {
    let response = RpcResponse::from_json_str(body)?;
    if let Some(e) = response.error {
        return Err(MinerError::BlockRejected(e.message));
    }
    match response.result {
        Value::Null => Ok(()),
        Value::String(reason) => Err(MinerError::BlockRejected(reason)),
        other => Err(MinerError::BlockRejected(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_envelope() {
        let body = RpcRequest::submit_block("00ff").to_json().unwrap();
        let value: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(value["jsonrpc"], "1.0");
        assert_eq!(value["method"], "submitblock");
        assert_eq!(value["params"], json!(["00ff"]));

        let gbt = RpcRequest::get_block_template();
        assert_eq!(gbt.params, json!([{ "rules": ["segwit"] }]));
    }

    #[test]
    fn test_submit_accepted() {
        assert_eq!(parse_submit_response(r#"{"result":null,"error":null,"id":"submit"}"#), Ok(()));
    }

    #[test]
    fn test_submit_rejected_by_error() {
        let body = r#"{"result":null,"error":{"code":-22,"message":"Block decode failed"},"id":"submit"}"#;
        assert_eq!(
            parse_submit_response(body),
            Err(MinerError::BlockRejected("Block decode failed".to_string()))
        );
    }

    #[test]
    fn test_submit_rejected_by_reason() {
        let body = r#"{"result":"high-hash","error":null,"id":"submit"}"#;
        assert_eq!(
            parse_submit_response(body),
            Err(MinerError::BlockRejected("high-hash".to_string()))
        );
    }

    #[test]
    fn test_template_response_error() {
        let body = r#"{"result":null,"error":{"code":-10,"message":"Bitcoin Core is in initial sync"},"id":"miner"}"#;
        assert_eq!(
            parse_template_response(body),
            Err(MinerError::RpcFailed {
                code: -10,
                message: "Bitcoin Core is in initial sync".to_string()
            })
        );
    }

    #[test]
    fn test_template_response_ok() {
        let body = r#"{"result":{"version":536870912,"previousblockhash":"000000000000000000024bead8df69990852c202db0e0097c1a12ea637d7e96d","bits":"17034219","curtime":1700000000,"height":875000,"coinbasevalue":312500000,"transactions":[]},"error":null,"id":"miner"}"#;
        let template = parse_template_response(body).unwrap();
        assert_eq!(template.height, 875000);
        assert!(template.transactions.is_empty());
    }

    #[test]
    fn test_malformed_body() {
        assert!(matches!(parse_submit_response("not json"), Err(MinerError::Json(_))));
    }
}
