//! Retry backoff (spec.md §4.5): exponential, capped by `MaxWorkflowWaitBackoffTime` /
//! `MaxWorkflowFailedBackoffTime`, grounded on `backoff`-crate usage already present in the
//! teacher's dependency stack.
use std::time::Duration;

use backoff::{ExponentialBackoffBuilder, backoff::Backoff};

/// Computes the delay before retry number `attempt` (1-based), starting from `retry_delay` and
/// doubling each attempt, capped at `max_backoff`.
pub fn delay_for_attempt(retry_delay: Duration, max_backoff: Duration, attempt: u32) -> Duration {
    let mut policy = ExponentialBackoffBuilder::new()
        .with_initial_interval(retry_delay)
        .with_max_interval(max_backoff)
        .with_multiplier(2.0)
        .with_max_elapsed_time(None)
        .build();

    let mut delay = retry_delay;
    for _ in 0..attempt.saturating_sub(1) {
        delay = policy.next_backoff().unwrap_or(max_backoff);
    }
    delay.min(max_backoff)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_attempt_uses_the_configured_delay() {
        let delay = delay_for_attempt(Duration::from_secs(5), Duration::from_secs(300), 1);
        assert_eq!(delay, Duration::from_secs(5));
    }

    #[test]
    fn later_attempts_never_exceed_the_cap() {
        let delay = delay_for_attempt(Duration::from_secs(5), Duration::from_secs(60), 20);
        assert!(delay <= Duration::from_secs(60));
    }
}
