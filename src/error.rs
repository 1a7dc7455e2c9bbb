//! Crate-wide error taxonomy.
//!
//! # Propagation
//! - `Validation`, `Authority` and `Crypto` are never suppressed
//! - `Transport` and `Rpc` are the only variants a lenient call may turn into
//!   an empty result (see [`crate::rpc::Strictness`])

use thiserror::Error;

/// Errors produced anywhere in the client.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Invalid node, timeout, retry or role input. Always a caller bug.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Unknown operation tag, malformed identifier or parameter.
    #[error("Validation error: {0}")]
    Validation(String),

    /// No sufficient key, or the node rejected the signed authority.
    #[error("Authority error: {0}")]
    Authority(String),

    /// A usable recoverable signature could not be produced.
    #[error("Cryptographic error: {0}")]
    Crypto(String),

    /// Every configured node was unreachable.
    #[error("Transport error: {0}")]
    Transport(String),

    /// A reachable node answered with a JSON-RPC error object.
    #[error("RPC error {code}: {message}")]
    Rpc {
        code: i64,
        message: String,
        data: Option<serde_json::Value>,
    },

    /// A JSON value did not have the expected shape.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration file could not be loaded.
    #[error(transparent)]
    Config(#[from] crate::config::loader::ConfigError),
}

impl ClientError {
    /// Whether a lenient call is allowed to swallow this error.
    pub fn is_network_class(&self) -> bool {
        matches!(self, ClientError::Transport(_) | ClientError::Rpc { .. })
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        ClientError::Serialization(err.to_string())
    }
}

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;
