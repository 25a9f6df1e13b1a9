//! Document store access with batch helpers.
//!
//! [`StoreClient`] is the seam to the external store. [`Store`] layers
//! argument validation, chunking, pagination and resubmission of
//! unprocessed work on top of it.

mod bulk;
mod documents;

pub use bulk::{BulkGet, BulkWrite, Store};
pub use documents::{unmarshall, unmarshall_records, update_expression, UpdateExpression};

use crate::batch::Page;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// A single request inside a batch write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum WriteRequest {
    /// Create or replace an item.
    #[serde(rename = "PutRequest")]
    Put {
        /// The item to write.
        #[serde(rename = "Item")]
        item: Value,
    },
    /// Delete an item by key.
    #[serde(rename = "DeleteRequest")]
    Delete {
        /// The key of the item.
        #[serde(rename = "Key")]
        key: Value,
    },
}

impl WriteRequest {
    /// Creates a put request.
    #[must_use]
    pub fn put(item: Value) -> Self {
        Self::Put { item }
    }

    /// Creates a delete request.
    #[must_use]
    pub fn delete(key: Value) -> Self {
        Self::Delete { key }
    }
}

/// Response of one batch lookup call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchGetOutput {
    /// Items found, per collection.
    #[serde(default)]
    pub responses: HashMap<String, Vec<Value>>,
    /// Keys the store did not get to, per collection.
    #[serde(default)]
    pub unprocessed_keys: HashMap<String, Vec<Value>>,
}

impl BatchGetOutput {
    /// Creates an output for a single collection.
    #[must_use]
    pub fn new(collection: &str, items: Vec<Value>) -> Self {
        Self {
            responses: HashMap::from([(collection.to_string(), items)]),
            unprocessed_keys: HashMap::new(),
        }
    }

    /// Sets the unprocessed keys for a collection.
    #[must_use]
    pub fn with_unprocessed(mut self, collection: &str, keys: Vec<Value>) -> Self {
        self.unprocessed_keys.insert(collection.to_string(), keys);
        self
    }

    /// Removes and returns the items for a collection.
    pub fn take_items(&mut self, collection: &str) -> Vec<Value> {
        self.responses.remove(collection).unwrap_or_default()
    }

    /// Removes and returns the unprocessed keys for a collection.
    pub fn take_unprocessed(&mut self, collection: &str) -> Vec<Value> {
        self.unprocessed_keys.remove(collection).unwrap_or_default()
    }
}

/// Response of one batch write call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchWriteOutput {
    /// Requests the store did not get to, per collection.
    #[serde(default)]
    pub unprocessed_items: HashMap<String, Vec<WriteRequest>>,
}

impl BatchWriteOutput {
    /// An output with nothing left over.
    #[must_use]
    pub fn complete() -> Self {
        Self::default()
    }

    /// An output reporting unprocessed requests for a collection.
    #[must_use]
    pub fn unprocessed(collection: &str, requests: Vec<WriteRequest>) -> Self {
        Self {
            unprocessed_items: HashMap::from([(collection.to_string(), requests)]),
        }
    }

    /// Removes and returns the unprocessed requests for a collection.
    pub fn take_unprocessed(&mut self, collection: &str) -> Vec<WriteRequest> {
        self.unprocessed_items.remove(collection).unwrap_or_default()
    }
}

/// Operations consumed from the external document store.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StoreClient: Send + Sync {
    /// Fetches one item; `None` when it does not exist.
    async fn get(&self, params: Value) -> anyhow::Result<Option<Value>>;

    /// Creates or replaces one item.
    async fn put(&self, params: Value) -> anyhow::Result<Value>;

    /// Updates one item.
    async fn update(&self, params: Value) -> anyhow::Result<Value>;

    /// Deletes one item.
    async fn delete(&self, params: Value) -> anyhow::Result<Value>;

    /// Applies a set of writes atomically.
    async fn transact_write(&self, params: Value) -> anyhow::Result<Value>;

    /// Looks up a batch of keys in one collection.
    async fn batch_get(
        &self,
        collection: &str,
        keys: Vec<Value>,
        options: &Value,
    ) -> anyhow::Result<BatchGetOutput>;

    /// Writes a batch of requests to one collection.
    async fn batch_write(
        &self,
        collection: &str,
        requests: Vec<WriteRequest>,
    ) -> anyhow::Result<BatchWriteOutput>;

    /// Reads one page of a query.
    async fn query(&self, params: &Value, cursor: Option<Value>) -> anyhow::Result<Page<Value>>;

    /// Reads one page of a scan.
    async fn scan(&self, params: &Value, cursor: Option<Value>) -> anyhow::Result<Page<Value>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_write_request_wire_shape() {
        let request = WriteRequest::put(json!({ "test": 1 }));
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({ "PutRequest": { "Item": { "test": 1 } } })
        );
    }

    #[test]
    fn test_take_items_for_missing_collection() {
        let mut output = BatchGetOutput::new("Music", vec![json!(1)]);
        assert!(output.take_items("Other").is_empty());
        assert_eq!(output.take_items("Music"), vec![json!(1)]);
        assert!(output.take_unprocessed("Music").is_empty());
    }
}
