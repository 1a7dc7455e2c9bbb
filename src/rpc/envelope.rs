//! JSON-RPC 2.0 envelope and the per-call outcome type.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A JSON-RPC 2.0 request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcRequest {
    /// Always "2.0".
    pub jsonrpc: String,
    /// Fully qualified `<api>.<method>`.
    pub method: String,
    /// Positional array or named object, depending on the API.
    pub params: Value,
    pub id: u64,
}

impl RpcRequest {
    pub fn new(id: u64, method: impl Into<String>, params: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            method: method.into(),
            params,
            id,
        }
    }
}

/// The `error` member of a JSON-RPC response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcErrorObject {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// What a node that answered actually said.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeReply {
    Result(Value),
    Error(RpcErrorObject),
}

impl NodeReply {
    /// Interpret a decoded response body.
    ///
    /// A present `result` member wins, even when it is `null`. Bodies with
    /// neither member are not JSON-RPC responses.
    pub fn from_body(body: Value) -> Result<Self, String> {
        let mut object = match body {
            Value::Object(map) => map,
            other => return Err(format!("expected an object, got {}", type_name(&other))),
        };

        if let Some(result) = object.remove("result") {
            return Ok(NodeReply::Result(result));
        }
        if let Some(error) = object.remove("error") {
            let parsed = serde_json::from_value::<RpcErrorObject>(error.clone()).unwrap_or(
                RpcErrorObject {
                    code: 0,
                    message: error.to_string(),
                    data: None,
                },
            );
            return Ok(NodeReply::Error(parsed));
        }
        Err("response has neither result nor error".to_string())
    }
}

/// Outcome of sending one request through a transport.
#[derive(Debug, Clone, PartialEq)]
pub enum RpcOutcome {
    /// A node returned a `result`.
    Success(Value),
    /// A reachable node returned a JSON-RPC error object.
    RpcError(RpcErrorObject),
    /// No node produced a usable response.
    NetworkFailure(String),
}

impl From<NodeReply> for RpcOutcome {
    fn from(reply: NodeReply) -> Self {
        match reply {
            NodeReply::Result(value) => RpcOutcome::Success(value),
            NodeReply::Error(error) => RpcOutcome::RpcError(error),
        }
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
