//! Bounded resubmission of unprocessed batch work.
//!
//! Store batch calls may hand back part of what was submitted. The
//! resubmission loops in [`Store`](crate::store::Store) count consecutive
//! calls that made no progress and give up once the configured limit is
//! reached. Delays between stalled attempts are off by default.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the resubmission guard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Consecutive stalled attempts tolerated before giving up.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: usize,
    /// Base delay between stalled attempts in milliseconds.
    #[serde(default)]
    pub base_delay_ms: u64,
    /// Maximum delay cap in milliseconds.
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    /// Draw each delay uniformly from zero up to the backoff delay.
    #[serde(default)]
    pub jitter: bool,
}

fn default_max_attempts() -> usize {
    10
}

fn default_max_delay_ms() -> u64 {
    30_000
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: 0,
            max_delay_ms: default_max_delay_ms(),
            jitter: false,
        }
    }
}

impl RetryConfig {
    /// Creates a new retry config.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Never gives up on unprocessed work.
    ///
    /// A key or item the store rejects forever keeps the loop spinning;
    /// only use this when the caller imposes its own deadline.
    #[must_use]
    pub fn unbounded() -> Self {
        Self {
            max_attempts: usize::MAX,
            ..Self::default()
        }
    }

    /// Sets the maximum stalled attempts.
    #[must_use]
    pub fn with_max_attempts(mut self, attempts: usize) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// Sets the base delay.
    #[must_use]
    pub fn with_base_delay_ms(mut self, delay: u64) -> Self {
        self.base_delay_ms = delay;
        self
    }

    /// Sets the maximum delay.
    #[must_use]
    pub fn with_max_delay_ms(mut self, delay: u64) -> Self {
        self.max_delay_ms = delay;
        self
    }

    /// Enables or disables jitter.
    #[must_use]
    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }
}

/// Outcome of recording a stalled attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Resubmit after the specified delay.
    Retry(Duration),
    /// No more attempts, give up.
    GiveUp,
}

/// Tracks consecutive stalled attempts for one batch operation.
#[derive(Debug)]
pub struct RetryGuard {
    config: RetryConfig,
    stalled: usize,
}

impl RetryGuard {
    /// Creates a guard for a new operation.
    #[must_use]
    pub fn new(config: RetryConfig) -> Self {
        Self { config, stalled: 0 }
    }

    /// Number of consecutive stalled attempts so far.
    #[must_use]
    pub fn stalled(&self) -> usize {
        self.stalled
    }

    /// Records an attempt that completed at least part of its input.
    pub fn record_progress(&mut self) {
        self.stalled = 0;
    }

    /// Records an attempt that completed nothing.
    pub fn record_stall(&mut self) -> RetryDecision {
        self.stalled = self.stalled.saturating_add(1);
        if self.stalled >= self.config.max_attempts {
            return RetryDecision::GiveUp;
        }
        RetryDecision::Retry(self.calculate_delay())
    }

    /// Records the outcome of one call and waits out any delay.
    ///
    /// Returns `false` when the guard has given up.
    pub async fn settle(&mut self, progressed: bool) -> bool {
        if progressed {
            self.record_progress();
            return true;
        }

        match self.record_stall() {
            RetryDecision::Retry(delay) => {
                if !delay.is_zero() {
                    tracing::debug!(
                        stalled = self.stalled,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        "Backing off before resubmitting unprocessed work"
                    );
                    tokio::time::sleep(delay).await;
                }
                true
            }
            RetryDecision::GiveUp => false,
        }
    }

    /// Doubles `base_delay_ms` per stalled attempt, capped at `max_delay_ms`.
    fn calculate_delay(&self) -> Duration {
        let exponent = u32::try_from(self.stalled.saturating_sub(1)).unwrap_or(u32::MAX);
        let delay = self
            .config
            .base_delay_ms
            .saturating_mul(2u64.saturating_pow(exponent))
            .min(self.config.max_delay_ms);

        if self.config.jitter && delay > 0 {
            return Duration::from_millis(rand::thread_rng().gen_range(0..=delay));
        }
        Duration::from_millis(delay)
    }
}
