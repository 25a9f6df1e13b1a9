//! Queue batch events and the acknowledgement client.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One message of a queue batch event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueRecord {
    /// Position of the record in the batch.
    pub index: usize,
    /// Message identifier, empty if the event omitted it.
    pub message_id: String,
    /// Raw message body.
    pub body: String,
    /// Token used to acknowledge (delete) the message.
    pub receipt_handle: String,
    /// Message attributes as delivered.
    pub attributes: Value,
    /// The record exactly as it appeared in the event.
    pub raw: Value,
}

impl QueueRecord {
    fn from_raw(index: usize, raw: &Value) -> Self {
        let text = |field: &str| {
            raw.get(field)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };

        Self {
            index,
            message_id: text("messageId"),
            body: text("body"),
            receipt_handle: text("receiptHandle"),
            attributes: raw.get("attributes").cloned().unwrap_or(Value::Null),
            raw: raw.clone(),
        }
    }

    /// Decodes the body as JSON; `None` if it is not valid JSON.
    #[must_use]
    pub fn json_body(&self) -> Option<Value> {
        serde_json::from_str(&self.body).ok()
    }
}

/// Extracts the records of a queue batch event.
///
/// Returns `None` when the event has no `Records` array.
#[must_use]
pub fn records(event: &Value) -> Option<Vec<QueueRecord>> {
    let raw = event.get("Records")?.as_array()?;
    Some(
        raw.iter()
            .enumerate()
            .map(|(index, record)| QueueRecord::from_raw(index, record))
            .collect(),
    )
}

/// One entry of a delete-messages call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DeleteEntry {
    /// Entry identifier, unique within the call.
    pub id: String,
    /// Receipt handle of the message to delete.
    pub receipt_handle: String,
}

impl DeleteEntry {
    /// Creates a new entry.
    #[must_use]
    pub fn new(id: impl Into<String>, receipt_handle: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            receipt_handle: receipt_handle.into(),
        }
    }
}

/// An entry the queue refused to delete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct FailedEntry {
    /// Entry identifier.
    pub id: String,
    /// Error code reported by the queue.
    #[serde(default)]
    pub code: String,
    /// Error message reported by the queue.
    #[serde(default)]
    pub message: String,
}

/// Result of one delete-messages call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DeleteMessagesOutput {
    /// Ids of deleted entries.
    #[serde(default)]
    pub successful: Vec<String>,
    /// Entries that were not deleted.
    #[serde(default)]
    pub failed: Vec<FailedEntry>,
}

impl DeleteMessagesOutput {
    /// An output reporting every entry as deleted.
    #[must_use]
    pub fn all_deleted(entries: &[DeleteEntry]) -> Self {
        Self {
            successful: entries.iter().map(|e| e.id.clone()).collect(),
            failed: Vec::new(),
        }
    }
}

/// Operations consumed from the external message queue.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait QueueClient: Send + Sync {
    /// Deletes up to ten messages from `queue_url`.
    async fn delete_messages(
        &self,
        queue_url: &str,
        entries: Vec<DeleteEntry>,
    ) -> anyhow::Result<DeleteMessagesOutput>;
}
