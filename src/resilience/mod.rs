//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Attempt against one node:
//!     → timeouts.rs (hard deadline around the HTTP round-trip)
//!     → On failure: retries.rs (retry on same node? wait per backoff.rs)
//!     → Exhausted: transport moves on to the next node
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every network call has a deadline
//! - Same-node retries and host failover are independent loops
//! - Jittered backoff keeps many clients from retrying in lockstep

pub mod backoff;
pub mod retries;
pub mod timeouts;

pub use retries::{AttemptFailure, RetryPolicy};
