//! Error types for the eventshell crate.
//!
//! Library failures are modelled with `thiserror`. Errors raised by user
//! handlers, hooks and client implementations are plain `anyhow::Error`
//! values; the pipeline hands them back unchanged so callers can downcast
//! to their own types.

use thiserror::Error;

/// The main error type for eventshell operations.
#[derive(Debug, Error)]
pub enum ShellError {
    /// No callable handler was supplied.
    #[error("Expected a handler function.")]
    InvalidHandler,

    /// A required argument of a batch or store operation was absent.
    #[error("Missing required {0} parameter")]
    MissingArgument(&'static str),

    /// An error hook failed while handling an earlier failure.
    #[error(transparent)]
    ErrorStage(#[from] ErrorStageFailure),

    /// One or more records of a batch failed to process.
    #[error("{0}")]
    Aggregate(#[from] AggregateFailure),

    /// Resubmission of unprocessed work made no progress for too long.
    #[error("{operation} gave up after {attempts} attempts without progress ({pending} pending)")]
    RetryExhausted {
        /// The batch operation that gave up.
        operation: &'static str,
        /// Consecutive attempts that made no progress.
        attempts: usize,
        /// Number of inputs still unprocessed.
        pending: usize,
    },

    /// A store or queue client call failed.
    #[error(transparent)]
    Client(#[from] anyhow::Error),
}

impl ShellError {
    /// Creates a retry exhausted error.
    #[must_use]
    pub fn retry_exhausted(operation: &'static str, attempts: usize, pending: usize) -> Self {
        Self::RetryExhausted {
            operation,
            attempts,
            pending,
        }
    }

    /// Returns true if this error reports partially failed batch records.
    #[must_use]
    pub fn is_partial_failure(&self) -> bool {
        matches!(self, Self::Aggregate(_))
    }
}

/// Raised when an `on_error` hook itself fails.
///
/// Displays as the hook's error. The failure that triggered the error
/// hooks is the [`source`](std::error::Error::source), so it shows up when
/// walking the error chain.
#[derive(Debug, Error)]
#[error("{error}")]
pub struct ErrorStageFailure {
    error: anyhow::Error,
    #[source]
    original: anyhow::Error,
}

impl ErrorStageFailure {
    /// Creates a new error stage failure.
    #[must_use]
    pub fn new(error: anyhow::Error, original: anyhow::Error) -> Self {
        Self { error, original }
    }

    /// The error raised by the failing error hook.
    #[must_use]
    pub fn error(&self) -> &anyhow::Error {
        &self.error
    }

    /// The error that caused the error hooks to run.
    #[must_use]
    pub fn original(&self) -> &anyhow::Error {
        &self.original
    }

    /// Splits into `(error, original)`.
    #[must_use]
    pub fn into_parts(self) -> (anyhow::Error, anyhow::Error) {
        (self.error, self.original)
    }
}

/// Raised after a batch settles with at least one failed record.
#[derive(Debug, Clone, Error)]
#[error("Some records failed to process: {}", reasons.join("\n"))]
pub struct AggregateFailure {
    /// Failure reasons in record order.
    pub reasons: Vec<String>,
}

impl AggregateFailure {
    /// Creates a new aggregate failure.
    #[must_use]
    pub fn new(reasons: Vec<String>) -> Self {
        Self { reasons }
    }

    /// Number of failed records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.reasons.len()
    }

    /// Returns true if no reasons were recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.reasons.is_empty()
    }
}
