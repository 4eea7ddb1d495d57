//! Retry-with-backoff policy for Reasoner calls.

use intentus_config::ReasonerSettings;
use std::time::Duration;

/// Bounded exponential backoff.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first (1 = no retry)
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    /// Deadline for a single attempt
    pub request_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&ReasonerSettings::default())
    }
}

impl From<&ReasonerSettings> for RetryPolicy {
    fn from(settings: &ReasonerSettings) -> Self {
        Self {
            max_attempts: settings.max_attempts.max(1),
            initial_backoff: Duration::from_millis(settings.initial_backoff_ms),
            max_backoff: Duration::from_millis(settings.max_backoff_ms),
            request_timeout: settings.request_timeout(),
        }
    }
}

impl RetryPolicy {
    /// Delay before retry `retry_idx`; index 0 is the wait after the first failed attempt.
    pub fn delay_for_attempt(&self, retry_idx: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry_idx);
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }

    /// Like [`delay_for_attempt`](Self::delay_for_attempt), but never shorter
    /// than a server-provided hint (still capped at `max_backoff`).
    pub fn delay_with_hint(&self, retry_idx: u32, hint: Option<Duration>) -> Duration {
        let base = self.delay_for_attempt(retry_idx);
        match hint {
            Some(hint) => base.max(hint).min(self.max_backoff),
            None => base,
        }
    }
}
