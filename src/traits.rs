//! Shared trait abstractions for common patterns

use std::time::Duration;

/// Bounded retry bookkeeping shared by anything that can be retried by hand.
pub trait RetryLogic {
    fn get_retry_count(&self) -> u32;

    /// Delay to wait before the next attempt, or `None` once the budget is spent
    fn next_retry_delay(
        &self,
        max_retries: u32,
        retry_delay_ms: u64,
        exponential_backoff: bool,
    ) -> Option<Duration> {
        retry_delay_with_backoff(
            self.get_retry_count(),
            max_retries,
            retry_delay_ms,
            exponential_backoff,
        )
    }
}

/// Standard retry logic implementation
pub fn retry_delay_with_backoff(
    retry_count: u32,
    max_retries: u32,
    retry_delay_ms: u64,
    exponential_backoff: bool,
) -> Option<Duration> {
    if retry_count >= max_retries {
        return None;
    }

    let delay_multiplier = if exponential_backoff {
        2_u64.saturating_pow(retry_count)
    } else {
        1
    };
    Some(Duration::from_millis(
        retry_delay_ms.saturating_mul(delay_multiplier),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Attempts(u32);

    impl RetryLogic for Attempts {
        fn get_retry_count(&self) -> u32 {
            self.0
        }
    }

    #[test]
    fn test_backoff_doubles_until_exhausted() {
        assert_eq!(
            Attempts(0).next_retry_delay(3, 100, true),
            Some(Duration::from_millis(100))
        );
        assert_eq!(
            Attempts(2).next_retry_delay(3, 100, true),
            Some(Duration::from_millis(400))
        );
        assert_eq!(
            Attempts(2).next_retry_delay(3, 100, false),
            Some(Duration::from_millis(100))
        );
        assert_eq!(Attempts(3).next_retry_delay(3, 100, true), None);
    }
}
