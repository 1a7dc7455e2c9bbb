//! Ordered multi-node JSON-RPC transport with per-call failover.
//!
//! # Responsibilities
//! - Try nodes strictly in configured order for every call
//! - Retry gateway statuses and connection errors on the same node
//! - Stop at the first node that answers with `result` or `error`
//!
//! # Design Decisions
//! - A JSON-RPC error from a reachable node is final; no further nodes
//! - An undecodable body counts as a node failure, same as a timeout
//! - No shared mutable state: node list is immutable, each call is independent

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::config::validation::TIMEOUT_RANGE;
use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};
use crate::observability::metrics;
use crate::resilience::timeouts::bounded;
use crate::resilience::{AttemptFailure, RetryPolicy};
use crate::rpc::envelope::{NodeReply, RpcOutcome, RpcRequest};
use crate::rpc::node::{Node, NodeList};

/// Something that can deliver a JSON-RPC request to the chain.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &RpcRequest) -> RpcOutcome;
}

/// HTTP transport over an ordered node list.
#[derive(Debug)]
pub struct HttpTransport {
    nodes: NodeList,
    http: reqwest::Client,
    timeout: Duration,
    policy: RetryPolicy,
}

impl HttpTransport {
    pub fn new(nodes: NodeList, timeout: Duration, policy: RetryPolicy) -> ClientResult<Self> {
        if !TIMEOUT_RANGE.contains(&timeout.as_secs()) {
            return Err(ClientError::Configuration(format!(
                "timeout must be {}..={} seconds, got {}",
                TIMEOUT_RANGE.start(),
                TIMEOUT_RANGE.end(),
                timeout.as_secs()
            )));
        }

        let http = reqwest::Client::builder()
            .connect_timeout(timeout)
            .user_agent(concat!("hive-broadcaster/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ClientError::Configuration(format!("HTTP client: {}", e)))?;

        Ok(Self {
            nodes,
            http,
            timeout,
            policy,
        })
    }

    pub fn from_config(config: &ClientConfig) -> ClientResult<Self> {
        let nodes = NodeList::new(&config.nodes)?;
        Self::new(
            nodes,
            Duration::from_secs(config.timeouts.request_secs),
            RetryPolicy::from_config(&config.retries),
        )
    }

    pub fn nodes(&self) -> &NodeList {
        &self.nodes
    }

    /// Swap the node list. Requires exclusive access, so no call can be in flight.
    pub fn replace_nodes(&mut self, nodes: NodeList) {
        self.nodes = nodes;
    }

    /// One HTTP round-trip against one node.
    async fn attempt(&self, node: &Node, request: &RpcRequest) -> Result<NodeReply, AttemptFailure> {
        let send = self.http.post(node.endpoint()).json(request).send();
        let response = match bounded(self.timeout, send).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => return Err(AttemptFailure::Connection(e.to_string())),
            Err(elapsed) => return Err(AttemptFailure::Connection(elapsed.to_string())),
        };

        let status = response.status();
        if !status.is_success() {
            return Err(AttemptFailure::Status(status.as_u16()));
        }

        let body = match bounded(self.timeout, response.bytes()).await {
            Ok(Ok(body)) => body,
            Ok(Err(e)) => return Err(AttemptFailure::Connection(e.to_string())),
            Err(elapsed) => return Err(AttemptFailure::Connection(elapsed.to_string())),
        };

        let value = serde_json::from_slice(&body)
            .map_err(|e| AttemptFailure::MalformedBody(e.to_string()))?;
        NodeReply::from_body(value).map_err(AttemptFailure::MalformedBody)
    }

    /// All attempts against a single node, with same-node retries.
    async fn try_node(&self, node: &Node, request: &RpcRequest) -> Result<NodeReply, AttemptFailure> {
        let mut attempt: u32 = 1;
        loop {
            match self.attempt(node, request).await {
                Ok(reply) => return Ok(reply),
                Err(failure) => {
                    if !self.policy.should_retry(attempt, &failure) {
                        return Err(failure);
                    }
                    let delay = self.policy.delay(attempt);
                    debug!(
                        node = %node,
                        attempt = attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %failure,
                        "Retrying node"
                    );
                    metrics::record_rpc_attempt(node.authority(), "retry");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: &RpcRequest) -> RpcOutcome {
        let mut last_failure = None;

        for (node_idx, node) in self.nodes.iter().enumerate() {
            match self.try_node(node, request).await {
                Ok(reply) => {
                    let outcome = match &reply {
                        NodeReply::Result(_) => "success",
                        NodeReply::Error(_) => "rpc_error",
                    };
                    metrics::record_rpc_attempt(node.authority(), outcome);
                    return reply.into();
                }
                Err(failure) => {
                    warn!(
                        node_idx = node_idx,
                        node = %node,
                        method = %request.method,
                        error = %failure,
                        "Node failed, trying next"
                    );
                    metrics::record_rpc_attempt(node.authority(), "failure");
                    last_failure = Some(failure);
                }
            }
        }

        let detail = last_failure
            .map(|f| f.to_string())
            .unwrap_or_else(|| "no nodes".to_string());
        RpcOutcome::NetworkFailure(format!(
            "all {} nodes failed for {}; last error: {}",
            self.nodes.len(),
            request.method,
            detail
        ))
    }
}
