use std::time::Duration;

/// Automatic reconnection after transport errors
///
/// Disabled by default: an errored stream stays errored until the caller
/// connects again.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Consecutive failed attempts before giving up (0 = never retry)
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl ReconnectPolicy {
    pub const fn disabled() -> Self {
        Self {
            max_retries: 0,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
        }
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.max_retries > 0
    }

    /// Delay before retry number `attempt` (1-based), or None once exhausted
    pub fn delay_for(&self, attempt: u32) -> Option<Duration> {
        if attempt == 0 || attempt > self.max_retries {
            return None;
        }
        let factor = 1u32.checked_shl(attempt - 1).unwrap_or(u32::MAX);
        let delay = self
            .initial_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay);
        Some(delay.min(self.max_delay))
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::disabled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_never_retries() {
        let policy = ReconnectPolicy::default();
        assert!(!policy.is_enabled());
        assert_eq!(policy.delay_for(1), None);
    }

    #[test]
    fn test_exponential_backoff_is_capped() {
        let policy = ReconnectPolicy {
            max_retries: 10,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(10),
        };
        assert_eq!(policy.delay_for(1), Some(Duration::from_secs(1)));
        assert_eq!(policy.delay_for(2), Some(Duration::from_secs(2)));
        assert_eq!(policy.delay_for(4), Some(Duration::from_secs(8)));
        assert_eq!(policy.delay_for(5), Some(Duration::from_secs(10)));
        assert_eq!(policy.delay_for(10), Some(Duration::from_secs(10)));
        assert_eq!(policy.delay_for(11), None);
    }

    #[test]
    fn test_huge_attempt_numbers_do_not_overflow() {
        let policy = ReconnectPolicy::disabled().with_max_retries(u32::MAX);
        assert_eq!(policy.delay_for(40), Some(policy.max_delay));
    }
}
