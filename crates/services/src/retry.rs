//! Automatic retry schedule for feed fetches.
//!
//! The attempt ceiling lives here; the delays between attempts come from
//! a `backoff` schedule built per load cycle.

use std::time::Duration;

use backoff::backoff::Backoff as _;
use backoff::ExponentialBackoff;

/// How the delay grows between automatic attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Backoff {
    /// `base × n`
    Linear,
    /// `base × 2^(n-1)`
    #[default]
    Exponential,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Every attempt counts, including the first one.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub backoff: Backoff,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(8000),
            backoff: Backoff::Exponential,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration, max_delay: Duration, backoff: Backoff) -> Self {
        Self { max_attempts: max_attempts.max(1), base_delay, max_delay, backoff }
    }

    /// A policy that gives up after the first failure.
    pub fn no_retry() -> Self {
        Self { max_attempts: 1, ..Self::default() }
    }

    /// Whether another automatic attempt follows attempt number `attempt` (1-based).
    pub fn allows_retry_after(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }

    /// Fresh delay schedule for one load cycle. No jitter, no elapsed-time cap:
    /// the attempt ceiling is what ends a cycle.
    pub fn schedule(&self) -> RetrySchedule {
        match self.backoff {
            Backoff::Exponential => {
                let mut exponential = ExponentialBackoff {
                    current_interval: self.base_delay,
                    initial_interval: self.base_delay,
                    randomization_factor: 0.0,
                    multiplier: 2.0,
                    max_interval: self.max_delay,
                    max_elapsed_time: None,
                    ..ExponentialBackoff::default()
                };
                exponential.reset();
                RetrySchedule::Exponential(exponential)
            }
            Backoff::Linear => RetrySchedule::Linear(LinearBackoff::new(self.base_delay, self.max_delay)),
        }
    }
}

/// Grows by one `step` per retry, capped at `max_interval`.
#[derive(Debug, Clone)]
pub struct LinearBackoff {
    step: Duration,
    max_interval: Duration,
    retries: u32,
}

impl LinearBackoff {
    pub fn new(step: Duration, max_interval: Duration) -> Self {
        Self { step, max_interval, retries: 0 }
    }
}

impl backoff::backoff::Backoff for LinearBackoff {
    fn reset(&mut self) {
        self.retries = 0;
    }

    fn next_backoff(&mut self) -> Option<Duration> {
        self.retries = self.retries.saturating_add(1);
        Some(self.step.saturating_mul(self.retries).min(self.max_interval))
    }
}

/// Delay schedule for one load cycle.
#[derive(Debug)]
pub enum RetrySchedule {
    Exponential(ExponentialBackoff),
    Linear(LinearBackoff),
}

impl backoff::backoff::Backoff for RetrySchedule {
    fn reset(&mut self) {
        match self {
            RetrySchedule::Exponential(b) => b.reset(),
            RetrySchedule::Linear(b) => b.reset(),
        }
    }

    fn next_backoff(&mut self) -> Option<Duration> {
        match self {
            RetrySchedule::Exponential(b) => b.next_backoff(),
            RetrySchedule::Linear(b) => b.next_backoff(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(backoff: Backoff) -> RetryPolicy {
        RetryPolicy::new(5, Duration::from_millis(100), Duration::from_millis(1000), backoff)
    }

    fn first_delays(policy: &RetryPolicy, n: usize) -> Vec<u128> {
        let mut schedule = policy.schedule();
        std::iter::from_fn(|| schedule.next_backoff()).take(n).map(|d| d.as_millis()).collect()
    }

    #[test]
    fn test_exponential_doubles_until_cap() {
        assert_eq!(first_delays(&policy(Backoff::Exponential), 6), vec![100, 200, 400, 800, 1000, 1000]);
    }

    #[test]
    fn test_linear_grows_by_base() {
        assert_eq!(first_delays(&policy(Backoff::Linear), 4), vec![100, 200, 300, 400]);
    }

    #[test]
    fn test_long_schedule_stays_at_cap() {
        for backoff in [Backoff::Exponential, Backoff::Linear] {
            let delays = first_delays(&policy(backoff), 200);
            assert_eq!(delays.len(), 200);
            assert_eq!(delays.last(), Some(&1000));
        }
    }

    #[test]
    fn test_reset_restarts_schedule() {
        let mut schedule = policy(Backoff::Linear).schedule();
        schedule.next_backoff();
        schedule.next_backoff();
        schedule.reset();
        assert_eq!(schedule.next_backoff(), Some(Duration::from_millis(100)));
    }

    #[test]
    fn test_attempt_budget_includes_first_try() {
        let p = RetryPolicy::default();
        assert!(p.allows_retry_after(1));
        assert!(p.allows_retry_after(2));
        assert!(!p.allows_retry_after(3));
        assert!(!RetryPolicy::no_retry().allows_retry_after(1));
    }

    #[test]
    fn test_zero_attempts_is_clamped() {
        let p = RetryPolicy::new(0, Duration::ZERO, Duration::ZERO, Backoff::Linear);
        assert_eq!(p.max_attempts, 1);
    }
}
