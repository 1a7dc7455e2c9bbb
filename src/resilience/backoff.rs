//! Exponential backoff with jitter.

use rand::Rng;
use std::time::Duration;

/// Delay before retry number `attempt` (1-based) on the same node.
///
/// Attempt 0 never waits. The delay doubles per attempt, is capped at
/// `max_ms`, then gets up to 10% jitter on top.
pub fn calculate_backoff(attempt: u32, base_ms: u64, max_ms: u64) -> Duration {
    if attempt == 0 {
        return Duration::ZERO;
    }

    let factor = 2u64.saturating_pow(attempt - 1);
    let capped = base_ms.saturating_mul(factor).min(max_ms);

    let jitter_range = capped / 10;
    let jitter = if jitter_range > 0 {
        rand::thread_rng().gen_range(0..jitter_range)
    } else {
        0
    };

    Duration::from_millis(capped + jitter)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_growth() {
        assert_eq!(calculate_backoff(0, 500, 4000), Duration::ZERO);

        let first = calculate_backoff(1, 500, 4000);
        assert!(first >= Duration::from_millis(500) && first < Duration::from_millis(550));

        let second = calculate_backoff(2, 500, 4000);
        assert!(second >= Duration::from_millis(1000));
    }

    #[test]
    fn test_backoff_cap() {
        let capped = calculate_backoff(30, 500, 4000);
        assert!(capped >= Duration::from_millis(4000));
        assert!(capped < Duration::from_millis(4400));
    }
}
