//! Timeout enforcement.
//!
//! # Responsibilities
//! - Wrap every network future in a deadline
//! - Keep timeout failures distinct from other failures
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities
//! - There is no cancellation primitive besides the deadline itself

use std::future::Future;
use std::time::Duration;

/// The deadline elapsed before the wrapped future finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeadlineExceeded(pub Duration);

impl std::fmt::Display for DeadlineExceeded {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "timed out after {}s", self.0.as_secs())
    }
}

/// Run `fut` with a hard deadline.
pub async fn bounded<F>(deadline: Duration, fut: F) -> Result<F::Output, DeadlineExceeded>
where
    F: Future,
{
    tokio::time::timeout(deadline, fut)
        .await
        .map_err(|_| DeadlineExceeded(deadline))
}
