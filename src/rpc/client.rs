//! Typed JSON-RPC client on top of a [`Transport`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::warn;

use crate::error::{ClientError, ClientResult};
use crate::observability::metrics;
use crate::rpc::envelope::{RpcOutcome, RpcRequest};
use crate::rpc::methods;
use crate::rpc::transport::Transport;

/// Whether network-class failures propagate or collapse to an empty result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Strictness {
    #[default]
    Strict,
    /// Transport and RPC errors become `Value::Null`. Nothing else is swallowed.
    Lenient,
}

impl Strictness {
    fn settle(self, method: &str, err: ClientError) -> ClientResult<Value> {
        match self {
            Strictness::Strict => Err(err),
            Strictness::Lenient => {
                warn!(method = %method, error = %err, "Suppressed error on lenient call");
                Ok(Value::Null)
            }
        }
    }
}

/// Turn a transport outcome into a caller-facing result.
pub fn resolve_outcome(outcome: RpcOutcome, method: &str, strictness: Strictness) -> ClientResult<Value> {
    match outcome {
        RpcOutcome::Success(value) => Ok(value),
        RpcOutcome::RpcError(e) => strictness.settle(
            method,
            ClientError::Rpc {
                code: e.code,
                message: e.message,
                data: e.data,
            },
        ),
        RpcOutcome::NetworkFailure(detail) => {
            strictness.settle(method, ClientError::Transport(detail))
        }
    }
}

#[derive(Clone)]
pub struct RpcClient {
    transport: Arc<dyn Transport>,
    next_id: Arc<AtomicU64>,
}

impl std::fmt::Debug for RpcClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcClient")
            .field("next_id", &self.next_id.load(Ordering::Relaxed))
            .finish()
    }
}

impl RpcClient {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            next_id: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Call `api.method` after checking it against the supported table.
    pub async fn call(
        &self,
        api: &str,
        method: &str,
        params: Option<Value>,
        strictness: Strictness,
    ) -> ClientResult<Value> {
        let spec = methods::lookup(api, method)?;
        let params = params.unwrap_or_else(|| spec.empty_params());
        methods::check_params(spec, method, &params)?;

        let qualified = format!("{}.{}", spec.name, method);
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let request = RpcRequest::new(id, qualified.as_str(), params);

        let start = Instant::now();
        let outcome = self.transport.send(&request).await;
        metrics::record_rpc_duration(&qualified, start);

        resolve_outcome(outcome, &qualified, strictness)
    }

    /// Strict call whose result is decoded into `T`.
    pub async fn call_as<T: DeserializeOwned>(
        &self,
        api: &str,
        method: &str,
        params: Option<Value>,
    ) -> ClientResult<T> {
        let value = self.call(api, method, params, Strictness::Strict).await?;
        serde_json::from_value(value).map_err(|e| {
            ClientError::Serialization(format!("unexpected result for {}.{}: {}", api, method, e))
        })
    }

    /// Hex of the node's binary serialization of `tx`.
    pub async fn get_transaction_hex<T: Serialize>(&self, tx: &T) -> ClientResult<String> {
        let params = json!([serde_json::to_value(tx)?]);
        self.call_as("condenser_api", "get_transaction_hex", Some(params))
            .await
    }

    /// `Some(true)` when the node accepts the signatures. `None` means a
    /// lenient call produced no answer, which is not the same as `false`.
    pub async fn verify_authority<T: Serialize>(
        &self,
        tx: &T,
        strictness: Strictness,
    ) -> ClientResult<Option<bool>> {
        let params = json!([serde_json::to_value(tx)?]);
        let value = self
            .call("condenser_api", "verify_authority", Some(params), strictness)
            .await?;
        match value {
            Value::Null => Ok(None),
            Value::Bool(b) => Ok(Some(b)),
            other if strictness == Strictness::Lenient => {
                warn!(result = %other, "verify_authority returned a non-boolean result");
                Ok(None)
            }
            other => Err(ClientError::Serialization(format!(
                "verify_authority returned {}",
                other
            ))),
        }
    }

    /// `database_api.get_dynamic_global_properties`.
    pub async fn get_dynamic_global_properties(&self, strictness: Strictness) -> ClientResult<Value> {
        self.call("database_api", "get_dynamic_global_properties", None, strictness)
            .await
    }

    /// `block_api.get_block`.
    pub async fn get_block(&self, block_num: u64, strictness: Strictness) -> ClientResult<Value> {
        self.call(
            "block_api",
            "get_block",
            Some(json!({ "block_num": block_num })),
            strictness,
        )
        .await
    }

    /// `block_api.get_block_header`.
    pub async fn get_block_header(&self, block_num: u64, strictness: Strictness) -> ClientResult<Value> {
        self.call(
            "block_api",
            "get_block_header",
            Some(json!({ "block_num": block_num })),
            strictness,
        )
        .await
    }

    /// `database_api.get_version`, which carries the chain id.
    pub async fn get_version(&self, strictness: Strictness) -> ClientResult<Value> {
        self.call("database_api", "get_version", None, strictness)
            .await
    }

    /// Fire-and-forget submission.
    pub async fn broadcast_transaction<T: Serialize>(
        &self,
        tx: &T,
        strictness: Strictness,
    ) -> ClientResult<Value> {
        let params = json!([serde_json::to_value(tx)?]);
        self.call("condenser_api", "broadcast_transaction", Some(params), strictness)
            .await
    }

    /// Submission that waits for block inclusion.
    pub async fn broadcast_transaction_synchronous<T: Serialize>(
        &self,
        tx: &T,
        strictness: Strictness,
    ) -> ClientResult<Value> {
        let params = json!([serde_json::to_value(tx)?]);
        self.call(
            "condenser_api",
            "broadcast_transaction_synchronous",
            Some(params),
            strictness,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rpc::mock::MockTransport;

    fn client(mock: MockTransport) -> (RpcClient, Arc<MockTransport>) {
        let mock = Arc::new(mock);
        (RpcClient::new(mock.clone()), mock)
    }

    #[tokio::test]
    async fn test_unsupported_method_never_hits_transport() {
        let (rpc, mock) = client(MockTransport::new());
        let result = rpc.call("condenser_api", "drop_tables", None, Strictness::Lenient).await;
        assert!(matches!(result, Err(ClientError::Validation(_))));
        assert!(mock.requests().is_empty());
    }

    #[tokio::test]
    async fn test_empty_params_follow_api_shape() {
        let (rpc, mock) = client(MockTransport::new());
        rpc.call("condenser", "get_config", None, Strictness::Strict).await.unwrap();
        rpc.call("database", "get_config", None, Strictness::Strict).await.unwrap();

        let requests = mock.requests();
        assert_eq!(requests[0].method, "condenser_api.get_config");
        assert_eq!(requests[0].params, json!([]));
        assert_eq!(requests[1].params, json!({}));
        assert!(requests[1].id > requests[0].id);
    }

    #[tokio::test]
    async fn test_strict_and_lenient_rpc_error() {
        let mock = MockTransport::new().reject("condenser_api.get_accounts", -32000, "bad");
        let (rpc, _) = client(mock);

        let strict = rpc
            .call("condenser_api", "get_accounts", Some(json!([["alice"]])), Strictness::Strict)
            .await;
        assert!(matches!(strict, Err(ClientError::Rpc { code: -32000, .. })));

        let lenient = rpc
            .call("condenser_api", "get_accounts", Some(json!([["alice"]])), Strictness::Lenient)
            .await
            .unwrap();
        assert_eq!(lenient, Value::Null);
    }

    #[tokio::test]
    async fn test_lenient_network_failure_is_unknown_authority() {
        let mock = MockTransport::new().unreachable("condenser_api.verify_authority");
        let (rpc, _) = client(mock);

        let verdict = rpc.verify_authority(&json!({}), Strictness::Lenient).await.unwrap();
        assert_eq!(verdict, None);

        let strict = rpc.verify_authority(&json!({}), Strictness::Strict).await;
        assert!(matches!(strict, Err(ClientError::Transport(_))));
    }

    #[tokio::test]
    async fn test_non_boolean_verdict() {
        let mock = MockTransport::new().respond("condenser_api.verify_authority", json!({}));
        let (rpc, _) = client(mock);

        let verdict = rpc.verify_authority(&json!({}), Strictness::Lenient).await.unwrap();
        assert_eq!(verdict, None);

        let strict = rpc.verify_authority(&json!({}), Strictness::Strict).await;
        assert!(matches!(strict, Err(ClientError::Serialization(_))));
    }

    #[tokio::test]
    async fn test_lenient_does_not_hide_bad_params() {
        let (rpc, _) = client(MockTransport::new());
        let result = rpc
            .call("block_api", "get_block", Some(json!([1])), Strictness::Lenient)
            .await;
        assert!(matches!(result, Err(ClientError::Validation(_))));
    }

    #[tokio::test]
    async fn test_broadcast_variants() {
        let (rpc, mock) = client(MockTransport::new());
        rpc.broadcast_transaction_synchronous(&json!({}), Strictness::Strict).await.unwrap();
        rpc.broadcast_transaction(&json!({}), Strictness::Strict).await.unwrap();
        assert_eq!(
            mock.methods(),
            vec![
                "condenser_api.broadcast_transaction_synchronous".to_string(),
                "condenser_api.broadcast_transaction".to_string()
            ]
        );
    }
}

