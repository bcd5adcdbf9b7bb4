//! Retry bookkeeping for a single logical call
//!
//! A [`RetryState`] lives for exactly one call to `ApiClient::execute` and
//! decides, attempt by attempt, whether another attempt is allowed and how
//! long to wait before it.

use std::collections::HashMap;
use std::time::Duration;

use backoff::backoff::Backoff;
use backoff::{ExponentialBackoff, ExponentialBackoffBuilder};

use crate::core::Method;
use crate::error::{ClassifiedError, ErrorType};

use super::RecoveryPlan;

/// Upper bound for a single backoff delay
const MAX_BACKOFF_INTERVAL: Duration = Duration::from_secs(60);

/// Attempt accounting for one logical call
#[derive(Debug)]
pub struct RetryState {
    attempts_made: u32,
    max_attempts: u32,
    retries_by_type: HashMap<ErrorType, u32>,
    network_backoff: Option<ExponentialBackoff>,
}

impl RetryState {
    /// GET calls get `configured_attempts`; every other method gets exactly one.
    pub fn for_method(method: Method, configured_attempts: u32) -> Self {
        let max_attempts = if method.is_idempotent() {
            configured_attempts.max(1)
        } else {
            1
        };

        Self {
            attempts_made: 0,
            max_attempts,
            retries_by_type: HashMap::new(),
            network_backoff: None,
        }
    }

    /// Record the start of an attempt and return its 1-based number
    pub fn begin_attempt(&mut self) -> u32 {
        debug_assert!(self.attempts_made < self.max_attempts);
        self.attempts_made += 1;
        self.attempts_made
    }

    pub fn attempts_made(&self) -> u32 {
        self.attempts_made
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Decide whether the failed attempt is followed by another one.
    ///
    /// Returns the delay to sleep before the next attempt, or `None` when the
    /// call must end with `error`.
    pub fn next_delay(&mut self, error: &ClassifiedError, plan: &RecoveryPlan) -> Option<Duration> {
        if !plan.is_retry() || self.attempts_made >= self.max_attempts {
            return None;
        }

        let retries = self.retries_by_type.entry(error.error_type()).or_insert(0);
        if let Some(limit) = plan.max_attempts {
            if *retries + 1 >= limit {
                return None;
            }
        }

        let base = plan.delay.unwrap_or_default();
        let delay = if plan.backoff {
            let schedule = self.network_backoff.get_or_insert_with(|| doubling_schedule(base));
            schedule.next_backoff()?
        } else {
            base
        };

        *retries += 1;

        log::warn!(
            "{} error [{}], retrying in {:?} (attempt {}/{})",
            error.error_type(),
            error.code(),
            delay,
            self.attempts_made + 1,
            self.max_attempts
        );

        Some(delay)
    }
}

/// Network retry delays with no jitter and no elapsed-time cap.
///
/// The k-th retry (k counted from 0) waits `base * 2^k`, so the first retry
/// waits exactly `base`, then `2*base`, `4*base` and so on up to
/// `MAX_BACKOFF_INTERVAL`.
fn doubling_schedule(base: Duration) -> ExponentialBackoff {
    ExponentialBackoffBuilder::new()
        .with_initial_interval(base)
        .with_multiplier(2.0)
        .with_randomization_factor(0.0)
        .with_max_interval(MAX_BACKOFF_INTERVAL.max(base))
        .with_max_elapsed_time(None)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{classify, RawFailure};
    use crate::resilience::{RecoveryConfig, RecoveryPolicy};

    fn policy() -> RecoveryPolicy {
        RecoveryPolicy::new(RecoveryConfig {
            network_retry_delay: Duration::from_millis(100),
            rate_limit_delay: Duration::from_millis(500),
            ..RecoveryConfig::default()
        })
    }

    #[test]
    fn test_non_get_gets_single_attempt() {
        for method in [Method::Post, Method::Put, Method::Delete] {
            let state = RetryState::for_method(method, 5);
            assert_eq!(state.max_attempts(), 1);
        }
        assert_eq!(RetryState::for_method(Method::Get, 5).max_attempts(), 5);
        assert_eq!(RetryState::for_method(Method::Get, 0).max_attempts(), 1);
    }

    #[test]
    fn test_network_delays_double() {
        let policy = policy();
        let error = classify(RawFailure::network("refused"));
        let plan = policy.policy_for(&error);
        let mut state = RetryState::for_method(Method::Get, 3);

        state.begin_attempt();
        assert_eq!(state.next_delay(&error, &plan), Some(Duration::from_millis(100)));
        state.begin_attempt();
        assert_eq!(state.next_delay(&error, &plan), Some(Duration::from_millis(200)));
        state.begin_attempt();
        assert_eq!(state.next_delay(&error, &plan), None);
        assert_eq!(state.attempts_made(), 3);
    }

    #[test]
    fn test_kth_network_retry_waits_base_times_two_to_the_k() {
        let policy = RecoveryPolicy::new(RecoveryConfig {
            network_retry_delay: Duration::from_millis(100),
            network_max_attempts: 5,
            ..RecoveryConfig::default()
        });
        let error = classify(RawFailure::network("refused"));
        let plan = policy.policy_for(&error);
        let mut state = RetryState::for_method(Method::Get, 5);

        let mut delays = Vec::new();
        loop {
            state.begin_attempt();
            match state.next_delay(&error, &plan) {
                Some(delay) => delays.push(delay),
                None => break,
            }
        }

        let expected: Vec<Duration> = (0..4).map(|k| Duration::from_millis(100 * 2u64.pow(k))).collect();
        assert_eq!(delays, expected);
    }

    #[test]
    fn test_network_budget_caps_configured_attempts() {
        let policy = policy();
        let error = classify(RawFailure::network("refused"));
        let plan = policy.policy_for(&error);
        let mut state = RetryState::for_method(Method::Get, 10);

        let mut attempts = 0;
        loop {
            state.begin_attempt();
            attempts += 1;
            if state.next_delay(&error, &plan).is_none() {
                break;
            }
        }
        assert_eq!(attempts, 3);
    }

    #[test]
    fn test_rate_limit_retries_once_with_fixed_delay() {
        let policy = policy();
        let error = classify(RawFailure::http(429, None));
        let plan = policy.policy_for(&error);
        let mut state = RetryState::for_method(Method::Get, 5);

        state.begin_attempt();
        assert_eq!(state.next_delay(&error, &plan), Some(Duration::from_millis(500)));
        state.begin_attempt();
        assert_eq!(state.next_delay(&error, &plan), None);
    }

    #[test]
    fn test_post_never_retries() {
        let policy = policy();
        let error = classify(RawFailure::timeout("slow"));
        let plan = policy.policy_for(&error);
        let mut state = RetryState::for_method(Method::Post, 3);

        state.begin_attempt();
        assert_eq!(state.next_delay(&error, &plan), None);
    }

    #[test]
    fn test_show_error_stops_immediately() {
        let policy = policy();
        let error = classify(RawFailure::http(404, None));
        let plan = policy.policy_for(&error);
        let mut state = RetryState::for_method(Method::Get, 3);

        state.begin_attempt();
        assert_eq!(state.next_delay(&error, &plan), None);
    }
}
