//! Settlement of independently evaluated work units.
//!
//! Every unit is driven to completion before the batch is partitioned into
//! successes and failures; nothing short-circuits on the first error.

use crate::errors::AggregateFailure;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::future::Future;

/// Record of one failed work unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureRecord {
    /// Position of the unit in the input batch.
    pub index: usize,
    /// Error message.
    pub error: String,
}

impl FailureRecord {
    /// Creates a new failure record.
    #[must_use]
    pub fn new(index: usize, error: impl Into<String>) -> Self {
        Self {
            index,
            error: error.into(),
        }
    }
}

/// Counts describing a settled batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SettlementSummary {
    /// Number of units evaluated.
    pub total: usize,
    /// Number of units that succeeded.
    pub succeeded: usize,
    /// Number of units that failed.
    pub failed: usize,
}

impl SettlementSummary {
    /// Returns the success rate.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.succeeded as f64 / self.total as f64
    }
}

/// A batch of outcomes partitioned into successes and failures.
#[derive(Debug, Clone)]
pub struct Settlement<T> {
    succeeded: Vec<(usize, T)>,
    failed: Vec<FailureRecord>,
}

impl<T> Settlement<T> {
    /// Partitions already-settled outcomes, keeping input positions.
    pub fn from_results<E, I>(results: I) -> Self
    where
        E: Display,
        I: IntoIterator<Item = Result<T, E>>,
    {
        let mut succeeded = Vec::new();
        let mut failed = Vec::new();

        for (index, result) in results.into_iter().enumerate() {
            match result {
                Ok(value) => succeeded.push((index, value)),
                Err(error) => failed.push(FailureRecord::new(index, error.to_string())),
            }
        }

        Self { succeeded, failed }
    }

    /// Drives every future to completion, then partitions the outcomes.
    pub async fn settle_all<E, I, Fut>(units: I) -> Self
    where
        E: Display,
        I: IntoIterator<Item = Fut>,
        Fut: Future<Output = Result<T, E>>,
    {
        Self::from_results(join_all(units).await)
    }

    /// Successful units with their input positions, in input order.
    #[must_use]
    pub fn successes(&self) -> &[(usize, T)] {
        &self.succeeded
    }

    /// Failed units in input order.
    #[must_use]
    pub fn failures(&self) -> &[FailureRecord] {
        &self.failed
    }

    /// Returns true if any unit failed.
    #[must_use]
    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty()
    }

    /// Returns the failure reasons in input order.
    #[must_use]
    pub fn failure_reasons(&self) -> Vec<String> {
        self.failed.iter().map(|f| f.error.clone()).collect()
    }

    /// Summarises the failures as an aggregate error, if there are any.
    #[must_use]
    pub fn failure(&self) -> Option<AggregateFailure> {
        self.has_failures()
            .then(|| AggregateFailure::new(self.failure_reasons()))
    }

    /// Returns counts for this settlement.
    #[must_use]
    pub fn summary(&self) -> SettlementSummary {
        SettlementSummary {
            total: self.succeeded.len() + self.failed.len(),
            succeeded: self.succeeded.len(),
            failed: self.failed.len(),
        }
    }

    /// Splits into successes and failures.
    #[must_use]
    pub fn into_parts(self) -> (Vec<(usize, T)>, Vec<FailureRecord>) {
        (self.succeeded, self.failed)
    }
}
