//! Reconnect timing for mirror sessions.
//!
//! The default is a fixed delay with no jitter and no attempt cap: the mirror
//! keeps retrying for as long as the process lives. Exponential backoff with
//! a ceiling is available for deployments that want it.

use std::time::Duration;

pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_millis(1000);
pub const DEFAULT_MAX_RECONNECT_DELAY: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// Wait `delay` before every attempt.
    Fixed,
    /// Double the delay after each consecutive failure, up to `max`.
    Exponential { max: Duration },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub delay: Duration,
    pub backoff: Backoff,
    /// `None` retries forever.
    pub max_attempts: Option<u32>,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            delay: DEFAULT_RECONNECT_DELAY,
            backoff: Backoff::Fixed,
            max_attempts: None,
        }
    }
}

impl ReconnectPolicy {
    pub fn fixed(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }

    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: Option<u32>) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Delay before retry number `attempt` (1-indexed, counted since the last
    /// successful open).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        match self.backoff {
            Backoff::Fixed => self.delay,
            Backoff::Exponential { max } => {
                let shift = attempt.saturating_sub(1).min(16);
                self.delay.saturating_mul(1 << shift).min(max)
            }
        }
    }

    pub fn should_retry(&self, attempt: u32) -> bool {
        self.max_attempts.is_none_or(|max| attempt <= max)
    }
}

/// Counts consecutive failed attempts for one session.
#[derive(Debug, Default)]
pub struct ReconnectState {
    attempt: u32,
}

impl ReconnectState {
    /// Record a closed or failed connection and return the retry number.
    pub fn record_close(&mut self) -> u32 {
        self.attempt = self.attempt.saturating_add(1);
        self.attempt
    }

    /// A connection opened; backoff starts over.
    pub fn reset(&mut self) {
        self.attempt = 0;
    }

    pub fn attempt(&self) -> u32 {
        self.attempt
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_fixed_one_second_forever() {
        let policy = ReconnectPolicy::default();
        for attempt in [1, 2, 10, 1_000, u32::MAX] {
            assert_eq!(policy.delay_for(attempt), Duration::from_millis(1000));
            assert!(policy.should_retry(attempt));
        }
    }

    #[test]
    fn exponential_doubles_up_to_ceiling() {
        let policy = ReconnectPolicy::fixed(Duration::from_millis(250)).with_backoff(
            Backoff::Exponential {
                max: Duration::from_secs(2),
            },
        );
        let delays: Vec<_> = (1..=6).map(|n| policy.delay_for(n).as_millis()).collect();
        assert_eq!(delays, vec![250, 500, 1000, 2000, 2000, 2000]);
        assert_eq!(policy.delay_for(u32::MAX), Duration::from_secs(2));
    }

    #[test]
    fn attempt_cap_is_inclusive() {
        let policy = ReconnectPolicy::default().with_max_attempts(Some(3));
        assert!(policy.should_retry(3));
        assert!(!policy.should_retry(4));
    }

    #[test]
    fn state_resets_after_open() {
        let mut state = ReconnectState::default();
        assert_eq!(state.record_close(), 1);
        assert_eq!(state.record_close(), 2);
        state.reset();
        assert_eq!(state.attempt(), 0);
        assert_eq!(state.record_close(), 1);
    }
}
