//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeout, retries, expiration)
//! - Reject empty or malformed node entries and chain ids
//!
//! # Design Decisions
//! - Returns all violations, not just the first
//! - Validation is a pure function: ClientConfig → Result<(), Vec<ConfigViolation>>

use std::fmt;

use crate::config::schema::ClientConfig;
use crate::rpc::node::Node;

/// Accepted range for the per-request timeout, in seconds.
pub const TIMEOUT_RANGE: std::ops::RangeInclusive<u64> = 5..=120;

/// Accepted range for per-node attempts.
pub const RETRY_RANGE: std::ops::RangeInclusive<u32> = 1..=10;

/// Accepted range for transaction expiration, in seconds.
pub const EXPIRATION_RANGE: std::ops::RangeInclusive<u32> = 5..=120;

/// A single semantic problem found in a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigViolation {
    pub field: &'static str,
    pub message: String,
}

impl ConfigViolation {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ConfigViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a configuration, collecting every violation.
pub fn validate_config(config: &ClientConfig) -> Result<(), Vec<ConfigViolation>> {
    let mut violations = Vec::new();

    if config.nodes.is_empty() {
        violations.push(ConfigViolation::new("nodes", "at least one node is required"));
    }
    for raw in &config.nodes {
        if let Err(e) = Node::parse(raw) {
            violations.push(ConfigViolation::new("nodes", e.to_string()));
        }
    }

    if let Some(chain_id) = &config.chain_id {
        let valid = chain_id.len() == 64 && chain_id.chars().all(|c| c.is_ascii_hexdigit());
        if !valid {
            violations.push(ConfigViolation::new(
                "chain_id",
                "must be 64 hexadecimal characters",
            ));
        }
    }

    if !TIMEOUT_RANGE.contains(&config.timeouts.request_secs) {
        violations.push(ConfigViolation::new(
            "timeouts.request_secs",
            format!("{} is outside 5..=120", config.timeouts.request_secs),
        ));
    }

    if !RETRY_RANGE.contains(&config.retries.max_attempts) {
        violations.push(ConfigViolation::new(
            "retries.max_attempts",
            format!("{} is outside 1..=10", config.retries.max_attempts),
        ));
    }
    if config.retries.base_delay_ms > config.retries.max_delay_ms {
        violations.push(ConfigViolation::new(
            "retries.base_delay_ms",
            "must not exceed retries.max_delay_ms",
        ));
    }

    if !EXPIRATION_RANGE.contains(&config.broadcast.expiration_secs) {
        violations.push(ConfigViolation::new(
            "broadcast.expiration_secs",
            format!("{} is outside 5..=120", config.broadcast.expiration_secs),
        ));
    }

    if violations.is_empty() {
        Ok(())
    } else {
        Err(violations)
    }
}
