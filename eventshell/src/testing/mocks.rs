//! Scripted clients and recording stages for testing.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::{HashSet, VecDeque};

use crate::batch::Page;
use crate::middleware::{Request, Stage};
use crate::queue::{DeleteEntry, DeleteMessagesOutput, FailedEntry, QueueClient};
use crate::store::{BatchGetOutput, BatchWriteOutput, StoreClient, WriteRequest};

/// A store client that replays scripted responses and records every call.
///
/// Batch and page responses are consumed in the order they were pushed.
/// Once a script runs dry the configured default is returned; the
/// defaults report complete batches and a final empty page.
#[derive(Debug, Default)]
pub struct ScriptedStore {
    batch_get: Mutex<VecDeque<BatchGetOutput>>,
    default_batch_get: Mutex<BatchGetOutput>,
    batch_get_calls: Mutex<Vec<Vec<Value>>>,
    batch_write: Mutex<VecDeque<BatchWriteOutput>>,
    default_batch_write: Mutex<BatchWriteOutput>,
    batch_write_calls: Mutex<Vec<Vec<WriteRequest>>>,
    query: Mutex<VecDeque<Page<Value>>>,
    query_cursors: Mutex<Vec<Option<Value>>>,
    scan: Mutex<VecDeque<Page<Value>>>,
    scan_cursors: Mutex<Vec<Option<Value>>>,
    item: Mutex<Option<Value>>,
    single_calls: Mutex<Vec<(&'static str, Value)>>,
}

impl ScriptedStore {
    /// Creates a store with empty scripts.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues the response of the next batch lookup.
    pub fn push_batch_get(&self, output: BatchGetOutput) {
        self.batch_get.lock().push_back(output);
    }

    /// Sets the response returned once the lookup script is exhausted.
    pub fn set_default_batch_get(&self, output: BatchGetOutput) {
        *self.default_batch_get.lock() = output;
    }

    /// Keys submitted to each batch lookup, in call order.
    #[must_use]
    pub fn batch_get_calls(&self) -> Vec<Vec<Value>> {
        self.batch_get_calls.lock().clone()
    }

    /// Queues the response of the next batch write.
    pub fn push_batch_write(&self, output: BatchWriteOutput) {
        self.batch_write.lock().push_back(output);
    }

    /// Sets the response returned once the write script is exhausted.
    pub fn set_default_batch_write(&self, output: BatchWriteOutput) {
        *self.default_batch_write.lock() = output;
    }

    /// Requests submitted to each batch write, in call order.
    #[must_use]
    pub fn batch_write_calls(&self) -> Vec<Vec<WriteRequest>> {
        self.batch_write_calls.lock().clone()
    }

    /// Queues the next query page.
    pub fn push_query(&self, page: Page<Value>) {
        self.query.lock().push_back(page);
    }

    /// Cursors passed to each query call.
    #[must_use]
    pub fn query_cursors(&self) -> Vec<Option<Value>> {
        self.query_cursors.lock().clone()
    }

    /// Queues the next scan page.
    pub fn push_scan(&self, page: Page<Value>) {
        self.scan.lock().push_back(page);
    }

    /// Cursors passed to each scan call.
    #[must_use]
    pub fn scan_cursors(&self) -> Vec<Option<Value>> {
        self.scan_cursors.lock().clone()
    }

    /// Sets the item returned by `get`.
    pub fn set_item(&self, item: Option<Value>) {
        *self.item.lock() = item;
    }

    /// Single-item operations received, as `(operation, params)`.
    #[must_use]
    pub fn single_calls(&self) -> Vec<(&'static str, Value)> {
        self.single_calls.lock().clone()
    }

    fn record_single(&self, operation: &'static str, params: Value) {
        self.single_calls.lock().push((operation, params));
    }
}

#[async_trait]
impl StoreClient for ScriptedStore {
    async fn get(&self, params: Value) -> anyhow::Result<Option<Value>> {
        self.record_single("get", params);
        Ok(self.item.lock().clone())
    }

    async fn put(&self, params: Value) -> anyhow::Result<Value> {
        self.record_single("put", params);
        Ok(json!({}))
    }

    async fn update(&self, params: Value) -> anyhow::Result<Value> {
        self.record_single("update", params);
        Ok(json!({}))
    }

    async fn delete(&self, params: Value) -> anyhow::Result<Value> {
        self.record_single("delete", params);
        Ok(json!({}))
    }

    async fn transact_write(&self, params: Value) -> anyhow::Result<Value> {
        self.record_single("transact_write", params);
        Ok(json!({}))
    }

    async fn batch_get(
        &self,
        _collection: &str,
        keys: Vec<Value>,
        _options: &Value,
    ) -> anyhow::Result<BatchGetOutput> {
        self.batch_get_calls.lock().push(keys);
        let scripted = self.batch_get.lock().pop_front();
        Ok(scripted.unwrap_or_else(|| self.default_batch_get.lock().clone()))
    }

    async fn batch_write(
        &self,
        _collection: &str,
        requests: Vec<WriteRequest>,
    ) -> anyhow::Result<BatchWriteOutput> {
        self.batch_write_calls.lock().push(requests);
        let scripted = self.batch_write.lock().pop_front();
        Ok(scripted.unwrap_or_else(|| self.default_batch_write.lock().clone()))
    }

    async fn query(&self, _params: &Value, cursor: Option<Value>) -> anyhow::Result<Page<Value>> {
        self.query_cursors.lock().push(cursor);
        let scripted = self.query.lock().pop_front();
        Ok(scripted.unwrap_or_else(|| Page::last(Vec::new())))
    }

    async fn scan(&self, _params: &Value, cursor: Option<Value>) -> anyhow::Result<Page<Value>> {
        self.scan_cursors.lock().push(cursor);
        let scripted = self.scan.lock().pop_front();
        Ok(scripted.unwrap_or_else(|| Page::last(Vec::new())))
    }
}

/// A queue client that records delete calls.
///
/// Every entry is deleted unless its id was passed to [`refuse`].
///
/// [`refuse`]: RecordingQueue::refuse
#[derive(Debug, Default)]
pub struct RecordingQueue {
    calls: Mutex<Vec<(String, Vec<DeleteEntry>)>>,
    refused: Mutex<HashSet<String>>,
}

impl RecordingQueue {
    /// Creates a queue that deletes everything.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the queue report the entry with `id` as failed.
    pub fn refuse(&self, id: impl Into<String>) {
        self.refused.lock().insert(id.into());
    }

    /// Delete calls received, as `(queue_url, entries)`.
    #[must_use]
    pub fn calls(&self) -> Vec<(String, Vec<DeleteEntry>)> {
        self.calls.lock().clone()
    }

    /// Receipt handles deleted so far.
    #[must_use]
    pub fn deleted_handles(&self) -> Vec<String> {
        let refused = self.refused.lock();
        self.calls
            .lock()
            .iter()
            .flat_map(|(_, entries)| entries.iter())
            .filter(|entry| !refused.contains(&entry.id))
            .map(|entry| entry.receipt_handle.clone())
            .collect()
    }
}

#[async_trait]
impl QueueClient for RecordingQueue {
    async fn delete_messages(
        &self,
        queue_url: &str,
        entries: Vec<DeleteEntry>,
    ) -> anyhow::Result<DeleteMessagesOutput> {
        let mut output = DeleteMessagesOutput::default();
        {
            let refused = self.refused.lock();
            for entry in &entries {
                if refused.contains(&entry.id) {
                    output.failed.push(FailedEntry {
                        id: entry.id.clone(),
                        code: "ReceiptHandleIsInvalid".to_string(),
                        message: "refused".to_string(),
                    });
                } else {
                    output.successful.push(entry.id.clone());
                }
            }
        }
        self.calls.lock().push((queue_url.to_string(), entries));
        Ok(output)
    }
}

/// A stage that records which of its hooks ran into a shared log.
#[derive(Debug)]
pub struct RecordingStage {
    name: String,
    log: std::sync::Arc<Mutex<Vec<String>>>,
}

impl RecordingStage {
    /// Creates a stage appending `"{name}:{hook}"` entries to `log`.
    #[must_use]
    pub fn new(name: impl Into<String>, log: std::sync::Arc<Mutex<Vec<String>>>) -> Self {
        Self {
            name: name.into(),
            log,
        }
    }

    fn record(&self, hook: &str) {
        self.log.lock().push(format!("{}:{hook}", self.name));
    }
}

#[async_trait]
impl Stage for RecordingStage {
    fn name(&self) -> &str {
        &self.name
    }

    async fn before(&self, _request: &mut Request) -> anyhow::Result<()> {
        self.record("before");
        Ok(())
    }

    async fn after(&self, _request: &mut Request) -> anyhow::Result<()> {
        self.record("after");
        Ok(())
    }

    async fn on_error(&self, _request: &mut Request) -> anyhow::Result<()> {
        self.record("on_error");
        Ok(())
    }
}
