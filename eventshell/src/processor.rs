//! Partial-failure processing of queue batch events.
//!
//! Every record is evaluated concurrently. Records that succeed are
//! acknowledged by deleting them from the queue; if any record failed the
//! invocation then fails with an [`AggregateFailure`] so the queue
//! redelivers only what is left.
//!
//! [`AggregateFailure`]: crate::errors::AggregateFailure

use crate::batch::{chunk, Settlement};
use crate::config::ShellConfig;
use crate::errors::ShellError;
use crate::queue::{self, DeleteEntry, FailedEntry, QueueClient, QueueRecord};
use async_trait::async_trait;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Evaluates one record of a queue batch.
///
/// `message` is the record body decoded as JSON, or `None` if the body is
/// not valid JSON. Implemented for any `Fn(Option<Value>, QueueRecord) ->
/// impl Future<Output = anyhow::Result<()>>`.
#[async_trait]
pub trait RecordHandler: Send + Sync {
    /// Processes one record.
    async fn handle_record(&self, message: Option<Value>, record: &QueueRecord)
        -> anyhow::Result<()>;
}

#[async_trait]
impl<F, Fut> RecordHandler for F
where
    F: Fn(Option<Value>, QueueRecord) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<()>> + Send,
{
    async fn handle_record(
        &self,
        message: Option<Value>,
        record: &QueueRecord,
    ) -> anyhow::Result<()> {
        (self)(message, record.clone()).await
    }
}

/// Configuration for a [`BatchProcessor`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessorConfig {
    /// Queue the records are acknowledged on.
    pub queue_url: String,
    /// Maximum entries per delete call.
    #[serde(default = "default_delete_chunk_size")]
    pub delete_chunk_size: usize,
}

fn default_delete_chunk_size() -> usize {
    10
}

impl ProcessorConfig {
    /// Creates a configuration for `queue_url`.
    #[must_use]
    pub fn new(queue_url: impl Into<String>) -> Self {
        Self {
            queue_url: queue_url.into(),
            delete_chunk_size: default_delete_chunk_size(),
        }
    }

    /// Creates a configuration from the shell configuration.
    ///
    /// # Errors
    ///
    /// Returns `MissingArgument("queue_url")` if no queue URL is configured.
    pub fn from_config(config: &ShellConfig) -> Result<Self, ShellError> {
        let queue_url = config
            .queue_url
            .clone()
            .ok_or(ShellError::MissingArgument("queue_url"))?;
        Ok(Self {
            queue_url,
            delete_chunk_size: config.limits.delete_messages,
        })
    }

    /// Sets the maximum entries per delete call.
    #[must_use]
    pub fn with_delete_chunk_size(mut self, size: usize) -> Self {
        self.delete_chunk_size = size;
        self
    }
}

/// Outcome of one processed batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchReport {
    /// Records in the event.
    pub total: usize,
    /// Records whose handler succeeded.
    pub succeeded: usize,
    /// Records whose handler failed.
    pub failed: usize,
    /// Messages the queue confirmed as deleted.
    pub acknowledged: usize,
    /// Entries the queue refused to delete.
    pub unacknowledged: Vec<FailedEntry>,
    /// Delete calls issued.
    pub delete_calls: usize,
}

impl BatchReport {
    /// Returns true if every record succeeded and was acknowledged.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failed == 0 && self.unacknowledged.is_empty()
    }
}

/// Processes queue batch events with partial-failure semantics.
#[derive(Clone)]
pub struct BatchProcessor {
    client: Arc<dyn QueueClient>,
    config: ProcessorConfig,
}

impl BatchProcessor {
    /// Creates a processor acknowledging through `client`.
    ///
    /// # Errors
    ///
    /// Returns `MissingArgument("queue_url")` if the queue URL is empty.
    pub fn new(client: Arc<dyn QueueClient>, config: ProcessorConfig) -> Result<Self, ShellError> {
        if config.queue_url.trim().is_empty() {
            return Err(ShellError::MissingArgument("queue_url"));
        }
        Ok(Self { client, config })
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &ProcessorConfig {
        &self.config
    }

    /// Processes every record of `event` with `handler`.
    ///
    /// An event without a `Records` array is a no-op. Successful records
    /// are acknowledged before failures are reported.
    ///
    /// # Errors
    ///
    /// Returns [`ShellError::Aggregate`] if any record failed, or
    /// [`ShellError::Client`] if an acknowledgement call failed.
    pub async fn process<H>(&self, event: &Value, handler: &H) -> Result<BatchReport, ShellError>
    where
        H: RecordHandler + ?Sized,
    {
        let Some(records) = queue::records(event) else {
            debug!("Event has no records, nothing to process");
            return Ok(BatchReport::default());
        };

        let settlement: Settlement<()> = Settlement::settle_all(
            records
                .iter()
                .map(|record| handler.handle_record(record.json_body(), record)),
        )
        .await;

        let summary = settlement.summary();
        let mut report = BatchReport {
            total: summary.total,
            succeeded: summary.succeeded,
            failed: summary.failed,
            ..BatchReport::default()
        };

        for failure in settlement.failures() {
            warn!(
                index = failure.index,
                message_id = %records[failure.index].message_id,
                error = %failure.error,
                "Record failed to process"
            );
        }

        let handles: Vec<&str> = settlement
            .successes()
            .iter()
            .map(|(index, ())| records[*index].receipt_handle.as_str())
            .collect();
        let transport_error = self.acknowledge(&handles, &mut report).await;

        info!(
            total = report.total,
            succeeded = report.succeeded,
            failed = report.failed,
            acknowledged = report.acknowledged,
            "Batch processed"
        );

        if let Some(failure) = settlement.failure() {
            if let Some(error) = transport_error {
                warn!(error = %error, "Acknowledgement failed alongside record failures");
            }
            return Err(failure.into());
        }

        match transport_error {
            Some(error) => Err(ShellError::Client(error)),
            None => Ok(report),
        }
    }

    /// Deletes the given messages, one concurrent call per chunk.
    ///
    /// Returns the first transport error once every call has settled.
    async fn acknowledge(&self, handles: &[&str], report: &mut BatchReport) -> Option<anyhow::Error> {
        if handles.is_empty() {
            return None;
        }

        let entries: Vec<DeleteEntry> = handles
            .iter()
            .enumerate()
            .map(|(id, handle)| DeleteEntry::new(id.to_string(), *handle))
            .collect();
        let chunks = chunk(entries, self.config.delete_chunk_size);
        report.delete_calls = chunks.len();

        let queue_url = self.config.queue_url.as_str();
        let outcomes = join_all(
            chunks
                .into_iter()
                .map(|entries| self.client.delete_messages(queue_url, entries)),
        )
        .await;

        let mut transport_error = None;
        for outcome in outcomes {
            match outcome {
                Ok(output) => {
                    report.acknowledged += output.successful.len();
                    for failed in &output.failed {
                        warn!(
                            id = %failed.id,
                            code = %failed.code,
                            message = %failed.message,
                            "Queue refused to delete message"
                        );
                    }
                    report.unacknowledged.extend(output.failed);
                }
                Err(error) => {
                    warn!(error = %error, "Delete call failed");
                    transport_error.get_or_insert(error);
                }
            }
        }
        transport_error
    }
}

impl fmt::Debug for BatchProcessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchProcessor")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
