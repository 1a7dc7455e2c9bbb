//! Per-node retry policy.
//!
//! # Responsibilities
//! - Decide whether a failed attempt is retried on the same node
//! - Compute the wait before the next attempt
//!
//! # Design Decisions
//! - Only gateway-class statuses (default 502/503/504) and connection
//!   errors are retried; any other failure moves straight to the next node
//! - Host failover is a separate loop in the transport; this policy never
//!   skips a node

use std::time::Duration;

use crate::config::RetryConfig;
use crate::resilience::backoff::calculate_backoff;

/// Why a single attempt against a node failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptFailure {
    /// Connect/read/write failure or timeout.
    Connection(String),
    /// The node answered with a non-success HTTP status.
    Status(u16),
    /// The body was not a JSON-RPC envelope.
    MalformedBody(String),
}

impl std::fmt::Display for AttemptFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AttemptFailure::Connection(e) => write!(f, "connection failed: {}", e),
            AttemptFailure::Status(code) => write!(f, "HTTP status {}", code),
            AttemptFailure::MalformedBody(e) => write!(f, "malformed body: {}", e),
        }
    }
}

/// Retry policy built once from configuration.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay_ms: u64,
    max_delay_ms: u64,
    retry_statuses: Vec<u16>,
}

impl RetryPolicy {
    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base_delay_ms: config.base_delay_ms,
            max_delay_ms: config.max_delay_ms,
            retry_statuses: config.retry_statuses.clone(),
        }
    }

    /// A policy that never retries on the same node.
    pub fn single_attempt() -> Self {
        Self {
            max_attempts: 1,
            base_delay_ms: 0,
            max_delay_ms: 0,
            retry_statuses: Vec::new(),
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Whether `failure` on attempt number `attempt` (1-based) is retried.
    pub fn should_retry(&self, attempt: u32, failure: &AttemptFailure) -> bool {
        if attempt >= self.max_attempts {
            return false;
        }
        match failure {
            AttemptFailure::Connection(_) => true,
            AttemptFailure::Status(code) => self.retry_statuses.contains(code),
            AttemptFailure::MalformedBody(_) => false,
        }
    }

    /// Wait before attempt `attempt + 1`.
    pub fn delay(&self, attempt: u32) -> Duration {
        calculate_backoff(attempt, self.base_delay_ms, self.max_delay_ms)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gateway_statuses_retry() {
        let policy = RetryPolicy::default();
        assert!(policy.should_retry(1, &AttemptFailure::Status(503)));
        assert!(policy.should_retry(2, &AttemptFailure::Status(502)));
        assert!(!policy.should_retry(3, &AttemptFailure::Status(504)));
        assert!(!policy.should_retry(1, &AttemptFailure::Status(404)));
    }

    #[test]
    fn test_connection_and_body_failures() {
        let policy = RetryPolicy::default();
        assert!(policy.should_retry(1, &AttemptFailure::Connection("refused".into())));
        assert!(!policy.should_retry(1, &AttemptFailure::MalformedBody("eof".into())));
    }

    #[test]
    fn test_single_attempt() {
        let policy = RetryPolicy::single_attempt();
        assert_eq!(policy.max_attempts(), 1);
        assert!(!policy.should_retry(1, &AttemptFailure::Connection("x".into())));
    }
}
