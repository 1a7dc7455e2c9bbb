//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the client.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Public Hive API nodes, tried in this order unless overridden.
pub const DEFAULT_NODES: &[&str] = &[
    "api.hive.blog",
    "api.openhive.network",
    "anyx.io",
    "hived.privex.io",
    "rpc.ausbit.dev",
    "techcoderx.com",
    "rpc.ecency.com",
    "hive.roelandp.nl",
    "hived.emre.sh",
    "api.deathwing.me",
    "api.c0ff33a.uk",
    "hive-api.arcange.eu",
];

/// Root configuration for the client.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Ordered node list (hostnames or URLs).
    pub nodes: Vec<String>,

    /// Hex chain identifier. Fetched from the node when absent.
    pub chain_id: Option<String>,

    /// Acting account for high-level operations.
    pub account: Option<String>,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Per-node retry configuration.
    pub retries: RetryConfig,

    /// Broadcast defaults.
    pub broadcast: BroadcastConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            nodes: DEFAULT_NODES.iter().map(|n| n.to_string()).collect(),
            chain_id: None,
            account: None,
            timeouts: TimeoutConfig::default(),
            retries: RetryConfig::default(),
            broadcast: BroadcastConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

/// Timeout configuration for network calls.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Per-request timeout in seconds, within [5, 120].
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 10 }
    }
}

/// Retry configuration applied to each individual node attempt.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Attempts per node, within [1, 10].
    pub max_attempts: u32,

    /// Base delay for exponential backoff in milliseconds.
    pub base_delay_ms: u64,

    /// Maximum delay for exponential backoff in milliseconds.
    pub max_delay_ms: u64,

    /// HTTP statuses that trigger a retry on the same node.
    pub retry_statuses: Vec<u16>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 500,
            max_delay_ms: 4000,
            retry_statuses: vec![502, 503, 504],
        }
    }
}

/// Defaults applied to every broadcast unless overridden per call.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BroadcastConfig {
    /// Seconds until the transaction expires, within [5, 120].
    pub expiration_secs: u32,

    /// Wait for block inclusion.
    pub synchronous: bool,

    /// Raise on RPC errors instead of returning an empty result.
    pub strict: bool,

    /// Ask the node to verify the signed authority before submitting.
    pub verify: bool,
}

impl Default for BroadcastConfig {
    fn default() -> Self {
        Self {
            expiration_secs: 30,
            synchronous: false,
            strict: true,
            verify: false,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit JSON log lines instead of the human format.
    pub json: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json: false,
        }
    }
}
