//! Configuration for batch operations and client construction.

use crate::batch::RetryConfig;
use serde::{Deserialize, Serialize};

/// Environment variable holding the deployment region.
pub const REGION_ENV: &str = "AWS_REGION";
/// Fallback environment variable for the region.
pub const DEFAULT_REGION_ENV: &str = "AWS_DEFAULT_REGION";
/// Environment variable holding the queue URL used for acknowledgements.
pub const QUEUE_URL_ENV: &str = "EVENTSHELL_QUEUE_URL";

/// Per-call limits imposed by the external store and queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchLimits {
    /// Maximum keys per batch lookup.
    #[serde(default = "default_batch_get_size")]
    pub batch_get: usize,
    /// Maximum items per batch write.
    #[serde(default = "default_batch_write_size")]
    pub batch_write: usize,
    /// Maximum entries per message delete call.
    #[serde(default = "default_delete_size")]
    pub delete_messages: usize,
}

fn default_batch_get_size() -> usize {
    100
}

fn default_batch_write_size() -> usize {
    25
}

fn default_delete_size() -> usize {
    10
}

impl Default for BatchLimits {
    fn default() -> Self {
        Self {
            batch_get: default_batch_get_size(),
            batch_write: default_batch_write_size(),
            delete_messages: default_delete_size(),
        }
    }
}

impl BatchLimits {
    /// Sets the batch lookup size.
    #[must_use]
    pub fn with_batch_get(mut self, size: usize) -> Self {
        self.batch_get = size;
        self
    }

    /// Sets the batch write size.
    #[must_use]
    pub fn with_batch_write(mut self, size: usize) -> Self {
        self.batch_write = size;
        self
    }

    /// Sets the message delete size.
    #[must_use]
    pub fn with_delete_messages(mut self, size: usize) -> Self {
        self.delete_messages = size;
        self
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShellConfig {
    /// Region passed to client constructors.
    #[serde(default)]
    pub region: Option<String>,
    /// Queue URL for acknowledging processed records.
    #[serde(default)]
    pub queue_url: Option<String>,
    /// Batch size limits.
    #[serde(default)]
    pub limits: BatchLimits,
    /// Guard for unprocessed-item resubmission.
    #[serde(default)]
    pub retry: RetryConfig,
}

impl ShellConfig {
    /// Creates a configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a configuration from process environment variables.
    ///
    /// The region is read from `AWS_REGION`, then `AWS_DEFAULT_REGION`.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a configuration using `lookup` to resolve variables.
    #[must_use]
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Self {
            region: non_empty(REGION_ENV).or_else(|| non_empty(DEFAULT_REGION_ENV)),
            queue_url: non_empty(QUEUE_URL_ENV),
            ..Self::default()
        }
    }

    /// Sets the region.
    #[must_use]
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    /// Sets the queue URL.
    #[must_use]
    pub fn with_queue_url(mut self, url: impl Into<String>) -> Self {
        self.queue_url = Some(url.into());
        self
    }

    /// Sets the batch limits.
    #[must_use]
    pub fn with_limits(mut self, limits: BatchLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Sets the resubmission guard.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }
}
