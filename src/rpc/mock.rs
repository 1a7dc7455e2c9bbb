//! In-memory transport for offline use and tests.
//!
//! Answers from canned per-method outcomes and records every request, so
//! callers can assert on exactly what would have gone on the wire.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};

use crate::rpc::envelope::{RpcErrorObject, RpcOutcome, RpcRequest};
use crate::rpc::transport::Transport;

#[derive(Debug, Default)]
pub struct MockTransport {
    canned: Mutex<HashMap<String, RpcOutcome>>,
    requests: Mutex<Vec<RpcRequest>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `method` (fully qualified) with `result`.
    pub fn respond(mut self, method: &str, result: Value) -> Self {
        self.canned
            .get_mut()
            .insert(method.to_string(), RpcOutcome::Success(result));
        self
    }

    /// Answer `method` with a JSON-RPC error object.
    pub fn reject(mut self, method: &str, code: i64, message: &str) -> Self {
        self.canned.get_mut().insert(
            method.to_string(),
            RpcOutcome::RpcError(RpcErrorObject {
                code,
                message: message.to_string(),
                data: None,
            }),
        );
        self
    }

    /// Make `method` behave as if every node were down.
    pub fn unreachable(mut self, method: &str) -> Self {
        self.canned.get_mut().insert(
            method.to_string(),
            RpcOutcome::NetworkFailure(format!("{} unreachable", method)),
        );
        self
    }

    /// Every request received so far, in order.
    pub fn requests(&self) -> Vec<RpcRequest> {
        self.requests.lock().clone()
    }

    pub fn methods(&self) -> Vec<String> {
        self.requests.lock().iter().map(|r| r.method.clone()).collect()
    }

    pub fn calls_to(&self, method: &str) -> usize {
        self.requests
            .lock()
            .iter()
            .filter(|r| r.method == method)
            .count()
    }
}

/// Head block reported by an unconfigured mock.
pub const MOCK_HEAD_BLOCK: u64 = 100_003;
/// `previous` of the block two below [`MOCK_HEAD_BLOCK`].
pub const MOCK_PREVIOUS_BLOCK_ID: &str = "000186a0d1e2f3a4b5c6d7e8f900000000000000";
/// Serialization returned by an unconfigured `get_transaction_hex`.
pub const MOCK_TRANSACTION_HEX: &str = "a086d1e2f3a4000000000000000000";

/// What an unconfigured method returns.
fn default_result(method: &str) -> Value {
    let name = method.rsplit('.').next().unwrap_or(method);
    match name {
        "get_dynamic_global_properties" => json!({
            "head_block_number": MOCK_HEAD_BLOCK,
            "head_block_id": "",
            "time": "1970-01-01T00:00:00"
        }),
        "get_block_header" => json!({"header": {"previous": MOCK_PREVIOUS_BLOCK_ID}}),
        "get_transaction_hex" => json!(MOCK_TRANSACTION_HEX),
        "get_version" => json!({
            "blockchain_version": "1.27.0",
            "chain_id": "beeab0de00000000000000000000000000000000000000000000000000000000"
        }),
        "verify_authority" => json!(true),
        "get_account_count" | "get_witness_count" => json!(0),
        n if n.starts_with("list_") || n.starts_with("lookup_") => json!([]),
        _ => json!({}),
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: &RpcRequest) -> RpcOutcome {
        self.requests.lock().push(request.clone());
        self.canned
            .lock()
            .get(&request.method)
            .cloned()
            .unwrap_or_else(|| RpcOutcome::Success(default_result(&request.method)))
    }
}
