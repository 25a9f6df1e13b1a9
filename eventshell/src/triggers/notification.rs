//! Notification topic events, delivered directly or through a FIFO queue.

use crate::middleware::Handler;
use crate::processor::RecordHandler;
use crate::queue::QueueRecord;
use anyhow::Context as _;
use async_trait::async_trait;
use serde_json::Value;
use std::future::Future;

/// Decodes the message of a notification event as JSON.
///
/// A notification event carries exactly one record. Returns `None` if the
/// record or message is absent or the message is not valid JSON.
#[must_use]
pub fn message(event: &Value) -> Option<Value> {
    let raw = event
        .get("Records")?
        .get(0)?
        .get("Sns")?
        .get("Message")?
        .as_str()?;
    serde_json::from_str(raw).ok()
}

/// Decodes the message of a notification record delivered through a FIFO
/// queue.
///
/// # Errors
///
/// Fails if the record has no `Message` string or it is not valid JSON, so
/// the queue record is reported as failed and redelivered.
pub fn fifo_message(sns_record: &Value) -> anyhow::Result<Value> {
    let raw = sns_record
        .get("Message")
        .and_then(Value::as_str)
        .context("notification record has no Message")?;
    serde_json::from_str(raw).context("notification message is not valid JSON")
}

/// Adapts `Fn(message, event)` into a [`Handler`] for notification events.
///
/// `message` is `None` when the message is not valid JSON.
#[derive(Debug, Clone)]
pub struct NotificationHandler<F> {
    f: F,
}

impl<F> NotificationHandler<F> {
    /// Wraps `f`.
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

#[async_trait]
impl<F, Fut> Handler for NotificationHandler<F>
where
    F: Fn(Option<Value>, Value) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<Value>> + Send,
{
    async fn handle(&self, event: &Value, _context: &Value) -> anyhow::Result<Value> {
        (self.f)(message(event), event.clone()).await
    }
}

/// Adapts `Fn(message, sns_record, queue_record)` into a
/// [`RecordHandler`] for FIFO topics.
///
/// Each queue record body is the notification envelope. Plug the adapter
/// into a [`BatchProcessor`] so handled records are acknowledged.
///
/// [`BatchProcessor`]: crate::processor::BatchProcessor
#[derive(Debug, Clone)]
pub struct FifoNotificationHandler<F> {
    f: F,
}

impl<F> FifoNotificationHandler<F> {
    /// Wraps `f`.
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

#[async_trait]
impl<F, Fut> RecordHandler for FifoNotificationHandler<F>
where
    F: Fn(Value, Value, QueueRecord) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<()>> + Send,
{
    async fn handle_record(
        &self,
        envelope: Option<Value>,
        record: &QueueRecord,
    ) -> anyhow::Result<()> {
        let sns_record = envelope.context("queue record body is not a notification envelope")?;
        let message = fifo_message(&sns_record)?;
        (self.f)(message, sns_record, record.clone()).await
    }
}
