//! Batch operations over a [`StoreClient`].

use super::{StoreClient, WriteRequest};
use crate::batch::{fetch_all, ChunkQueue, KeyQueue, RetryConfig, RetryGuard};
use crate::config::{BatchLimits, ShellConfig};
use crate::errors::ShellError;
use serde_json::{json, Value};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Arguments of [`Store::bulk_get`].
#[derive(Debug, Clone, Default)]
pub struct BulkGet {
    collection: Option<String>,
    keys: Option<Vec<Value>>,
    options: Option<Value>,
}

impl BulkGet {
    /// Looks up `keys` in `collection` with no extra options.
    pub fn new(collection: impl Into<String>, keys: Vec<Value>) -> Self {
        Self {
            collection: Some(collection.into()),
            keys: Some(keys),
            options: Some(json!({})),
        }
    }

    /// Sets the collection.
    #[must_use]
    pub fn collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = Some(collection.into());
        self
    }

    /// Sets the keys.
    #[must_use]
    pub fn keys(mut self, keys: Vec<Value>) -> Self {
        self.keys = Some(keys);
        self
    }

    /// Sets per-call options such as a projection.
    #[must_use]
    pub fn options(mut self, options: Value) -> Self {
        self.options = Some(options);
        self
    }

    fn validate(self) -> Result<(String, Vec<Value>, Value), ShellError> {
        let collection = self
            .collection
            .filter(|c| !c.is_empty())
            .ok_or(ShellError::MissingArgument("table"))?;
        let keys = self.keys.ok_or(ShellError::MissingArgument("keys"))?;
        let options = self
            .options
            .filter(|o| !o.is_null())
            .ok_or(ShellError::MissingArgument("params"))?;
        Ok((collection, keys, options))
    }
}

/// Arguments of [`Store::bulk_write`].
#[derive(Debug, Clone, Default)]
pub struct BulkWrite {
    collection: Option<String>,
    items: Option<Vec<Value>>,
}

impl BulkWrite {
    /// Writes `items` to `collection`.
    pub fn new(collection: impl Into<String>, items: Vec<Value>) -> Self {
        Self {
            collection: Some(collection.into()),
            items: Some(items),
        }
    }

    /// Sets the collection.
    #[must_use]
    pub fn collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = Some(collection.into());
        self
    }

    /// Sets the items.
    #[must_use]
    pub fn items(mut self, items: Vec<Value>) -> Self {
        self.items = Some(items);
        self
    }

    fn validate(self) -> Result<(String, Vec<Value>), ShellError> {
        let collection = self
            .collection
            .filter(|c| !c.is_empty())
            .ok_or(ShellError::MissingArgument("table"))?;
        let items = self.items.ok_or(ShellError::MissingArgument("items"))?;
        Ok((collection, items))
    }
}

/// Document store with batch helpers.
#[derive(Clone)]
pub struct Store {
    client: Arc<dyn StoreClient>,
    limits: BatchLimits,
    retry: RetryConfig,
}

fn require_params(params: &Value) -> Result<(), ShellError> {
    if params.is_null() {
        return Err(ShellError::MissingArgument("params"));
    }
    Ok(())
}

impl Store {
    /// Creates a store with default limits and resubmission guard.
    pub fn new(client: Arc<dyn StoreClient>) -> Self {
        Self {
            client,
            limits: BatchLimits::default(),
            retry: RetryConfig::default(),
        }
    }

    /// Creates a store using the limits and guard from `config`.
    pub fn from_config(client: Arc<dyn StoreClient>, config: &ShellConfig) -> Self {
        Self {
            client,
            limits: config.limits,
            retry: config.retry.clone(),
        }
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

    /// Fetches one item, `None` if it does not exist.
    pub async fn get(&self, params: Value) -> Result<Option<Value>, ShellError> {
        require_params(&params)?;
        Ok(self.client.get(params).await?)
    }

    /// Creates or replaces one item.
    pub async fn put(&self, params: Value) -> Result<Value, ShellError> {
        require_params(&params)?;
        Ok(self.client.put(params).await?)
    }

    /// Updates one item.
    pub async fn update(&self, params: Value) -> Result<Value, ShellError> {
        require_params(&params)?;
        Ok(self.client.update(params).await?)
    }

    /// Deletes one item.
    pub async fn delete(&self, params: Value) -> Result<Value, ShellError> {
        require_params(&params)?;
        Ok(self.client.delete(params).await?)
    }

    /// Applies a set of writes atomically.
    pub async fn transact_write(&self, params: Value) -> Result<Value, ShellError> {
        require_params(&params)?;
        Ok(self.client.transact_write(params).await?)
    }

    /// Looks up every key, resubmitting unprocessed keys until none remain.
    ///
    /// Each call takes up to `limits.batch_get` keys from the front of the
    /// pending keys. Unprocessed keys go back to the front, so the next call
    /// retries them first and fills the rest with keys not yet attempted.
    /// Items are returned in the order the store handed them back.
    pub async fn bulk_get(&self, request: BulkGet) -> Result<Vec<Value>, ShellError> {
        let (collection, keys, options) = request.validate()?;
        let mut queue = KeyQueue::new(keys, self.limits.batch_get);
        let mut guard = RetryGuard::new(self.retry.clone());
        let mut items = Vec::new();
        let mut calls = 0usize;

        while let Some(chunk) = queue.next_chunk() {
            let submitted = chunk.len();
            let mut output = self.client.batch_get(&collection, chunk, &options).await?;
            calls += 1;

            let found = output.take_items(&collection);
            let unprocessed = output.take_unprocessed(&collection);
            debug!(
                collection = %collection,
                submitted,
                found = found.len(),
                unprocessed = unprocessed.len(),
                "Batch lookup returned"
            );

            let progressed = !found.is_empty() || unprocessed.len() < submitted;
            items.extend(found);

            if unprocessed.is_empty() {
                guard.record_progress();
                continue;
            }

            if !guard.settle(progressed).await {
                let pending = unprocessed.len() + queue.len();
                warn!(collection = %collection, pending, "Giving up on unprocessed keys");
                return Err(ShellError::retry_exhausted("bulk_get", guard.stalled(), pending));
            }
            queue.push_retry(unprocessed);
        }

        info!(collection = %collection, calls, items = items.len(), "Bulk lookup complete");
        Ok(items)
    }

    /// Writes every item, resubmitting unprocessed requests until none remain.
    ///
    /// Items are wrapped as put requests and sent in chunks of at most
    /// `limits.batch_write`, last chunk first. Unprocessed requests are
    /// retried immediately as a chunk of their own.
    pub async fn bulk_write(&self, request: BulkWrite) -> Result<(), ShellError> {
        let (collection, items) = request.validate()?;
        let requests = items.into_iter().map(WriteRequest::put).collect();
        let mut queue = ChunkQueue::new(requests, self.limits.batch_write);
        let mut guard = RetryGuard::new(self.retry.clone());
        let mut calls = 0usize;

        while let Some(chunk) = queue.next_chunk() {
            let submitted = chunk.len();
            let mut output = self.client.batch_write(&collection, chunk).await?;
            calls += 1;

            let unprocessed = output.take_unprocessed(&collection);
            debug!(
                collection = %collection,
                submitted,
                unprocessed = unprocessed.len(),
                "Batch write returned"
            );

            if unprocessed.is_empty() {
                guard.record_progress();
                continue;
            }

            if !guard.settle(unprocessed.len() < submitted).await {
                let pending = unprocessed.len() + queue.pending_items();
                warn!(collection = %collection, pending, "Giving up on unprocessed items");
                return Err(ShellError::retry_exhausted("bulk_write", guard.stalled(), pending));
            }
            queue.push_retry(unprocessed);
        }

        info!(collection = %collection, calls, "Bulk write complete");
        Ok(())
    }

    /// Runs a query and returns the items of every page.
    pub async fn query_all(&self, params: Value) -> Result<Vec<Value>, ShellError> {
        require_params(&params)?;
        let client = self.client.as_ref();
        let params = &params;
        let items = fetch_all(move |cursor| client.query(params, cursor)).await?;
        Ok(items)
    }

    /// Runs a scan and returns the items of every page.
    pub async fn scan_all(&self, params: Value) -> Result<Vec<Value>, ShellError> {
        require_params(&params)?;
        let client = self.client.as_ref();
        let params = &params;
        let items = fetch_all(move |cursor| client.scan(params, cursor)).await?;
        Ok(items)
    }
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("limits", &self.limits)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::Page;
    use crate::store::{BatchGetOutput, BatchWriteOutput, MockStoreClient};
    use crate::testing::ScriptedStore;
    use pretty_assertions::assert_eq;

    fn key(artist: &str, title: &str) -> Value {
        json!({ "Artist": { "S": artist }, "SongTitle": { "S": title } })
    }

    fn album(title: &str) -> Value {
        json!({ "AlbumTitle": { "S": title } })
    }

    #[tokio::test]
    async fn test_bulk_get_requires_arguments() {
        let store = Store::new(Arc::new(ScriptedStore::new()));

        let err = store.bulk_get(BulkGet::default()).await.unwrap_err();
        assert_eq!(err.to_string(), "Missing required table parameter");

        let err = store
            .bulk_get(BulkGet::default().collection("Music"))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Missing required keys parameter");

        let err = store
            .bulk_get(BulkGet::default().collection("Music").keys(vec![]))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Missing required params parameter");
    }

    #[tokio::test]
    async fn test_bulk_get_resubmits_unprocessed_keys() {
        let client = Arc::new(ScriptedStore::new());
        client.push_batch_get(
            BatchGetOutput::new(
                "Music",
                vec![album("Somewhat Famous"), album("Blue Sky Blues")],
            )
            .with_unprocessed("Music", vec![key("Acme Band", "Happy Day")]),
        );
        client.push_batch_get(BatchGetOutput::new("Music", vec![album("Found it")]));

        let store = Store::new(client.clone());
        let items = store
            .bulk_get(BulkGet::new(
                "Music",
                vec![
                    key("No One You Know", "Call Me Today"),
                    key("Acme Band", "Happy Day"),
                    key("No One You Know", "Scared of My Shadow"),
                ],
            ))
            .await
            .unwrap();

        assert_eq!(
            items,
            vec![
                album("Somewhat Famous"),
                album("Blue Sky Blues"),
                album("Found it")
            ]
        );
        let calls = client.batch_get_calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[1], vec![key("Acme Band", "Happy Day")]);
    }

    #[tokio::test]
    async fn test_bulk_get_tops_up_retried_keys() {
        let client = Arc::new(ScriptedStore::new());
        client.push_batch_get(
            BatchGetOutput::new("Music", vec![json!(0)])
                .with_unprocessed("Music", vec![json!(1)]),
        );

        let store = Store::new(client.clone()).with_limits(BatchLimits::default().with_batch_get(2));
        store
            .bulk_get(BulkGet::new("Music", (0..5).map(|i| json!(i)).collect()))
            .await
            .unwrap();

        assert_eq!(
            client.batch_get_calls(),
            vec![
                vec![json!(0), json!(1)],
                vec![json!(1), json!(2)],
                vec![json!(3), json!(4)],
            ]
        );
    }

    #[tokio::test]
    async fn test_bulk_get_gives_up_on_stuck_key() {
        let client = Arc::new(ScriptedStore::new());
        client.set_default_batch_get(
            BatchGetOutput::new("Music", vec![]).with_unprocessed("Music", vec![json!("stuck")]),
        );

        let store = Store::new(client.clone()).with_retry(RetryConfig::new().with_max_attempts(3));
        let err = store
            .bulk_get(BulkGet::new("Music", vec![json!("stuck")]))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ShellError::RetryExhausted {
                operation: "bulk_get",
                attempts: 3,
                pending: 1
            }
        ));
        assert_eq!(client.batch_get_calls().len(), 3);
    }

    #[tokio::test]
    async fn test_bulk_write_requires_arguments() {
        let store = Store::new(Arc::new(ScriptedStore::new()));

        let err = store.bulk_write(BulkWrite::default()).await.unwrap_err();
        assert_eq!(err.to_string(), "Missing required table parameter");

        let err = store
            .bulk_write(BulkWrite::default().collection("Music"))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Missing required items parameter");
    }

    #[tokio::test]
    async fn test_bulk_write_resubmits_unprocessed_items() {
        let client = Arc::new(ScriptedStore::new());
        client.push_batch_write(BatchWriteOutput::unprocessed(
            "Music",
            vec![WriteRequest::put(json!({ "test": 1 }))],
        ));

        let store = Store::new(client.clone());
        store
            .bulk_write(BulkWrite::new("Music", vec![json!({ "test": 1 }); 26]))
            .await
            .unwrap();

        let calls = client.batch_write_calls();
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[0].len(), 1);
        assert_eq!(calls[1].len(), 1);
        assert_eq!(calls[2].len(), 25);
        assert_eq!(calls[0][0], WriteRequest::put(json!({ "test": 1 })));
    }

    #[tokio::test]
    async fn test_bulk_write_gives_up_on_stuck_item() {
        let client = Arc::new(ScriptedStore::new());
        client.set_default_batch_write(BatchWriteOutput::unprocessed(
            "Music",
            vec![WriteRequest::put(json!("stuck"))],
        ));

        let store = Store::new(client.clone()).with_retry(RetryConfig::new().with_max_attempts(2));
        let err = store
            .bulk_write(BulkWrite::new("Music", vec![json!("stuck")]))
            .await
            .unwrap_err();

        assert!(matches!(err, ShellError::RetryExhausted { operation: "bulk_write", .. }));
        assert_eq!(client.batch_write_calls().len(), 2);
    }

    #[tokio::test]
    async fn test_query_all_follows_cursor() {
        let client = Arc::new(ScriptedStore::new());
        client.push_query(Page::more(vec![json!({"foo": "1", "bar": "2"})], json!({"bar": "2"})));
        client.push_query(Page::more(vec![json!({"foo": "3", "bar": "4"})], json!({"bar": "4"})));
        client.push_query(Page::last(vec![json!({"foo": "5", "bar": "6"})]));

        let store = Store::new(client.clone());
        let items = store
            .query_all(json!({ "TableName": "testTable" }))
            .await
            .unwrap();

        assert_eq!(
            items,
            vec![
                json!({"foo": "1", "bar": "2"}),
                json!({"foo": "3", "bar": "4"}),
                json!({"foo": "5", "bar": "6"}),
            ]
        );
        assert_eq!(
            client.query_cursors(),
            vec![None, Some(json!({"bar": "2"})), Some(json!({"bar": "4"}))]
        );
    }

    #[tokio::test]
    async fn test_scan_all_two_pages() {
        let mut mock = MockStoreClient::new();
        let mut seq = mockall::Sequence::new();
        mock.expect_scan()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, cursor| {
                assert!(cursor.is_none());
                Ok(Page::more(vec![json!({"foo": "1"})], json!({"bar": "2"})))
            });
        mock.expect_scan()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(Page::last(vec![json!({"foo": "3"})])));

        let store = Store::new(Arc::new(mock));
        let items = store
            .scan_all(json!({ "TableName": "testTable" }))
            .await
            .unwrap();

        assert_eq!(items, vec![json!({"foo": "1"}), json!({"foo": "3"})]);
    }

    #[tokio::test]
    async fn test_single_item_operations_require_params() {
        let store = Store::new(Arc::new(ScriptedStore::new()));

        for err in [
            store.put(Value::Null).await.unwrap_err(),
            store.update(Value::Null).await.unwrap_err(),
            store.delete(Value::Null).await.unwrap_err(),
            store.transact_write(Value::Null).await.unwrap_err(),
            store.scan_all(Value::Null).await.unwrap_err(),
            store.query_all(Value::Null).await.unwrap_err(),
        ] {
            assert_eq!(err.to_string(), "Missing required params parameter");
        }
        assert!(store.get(Value::Null).await.is_err());
    }

    #[tokio::test]
    async fn test_get_missing_item_is_none() {
        let mut mock = MockStoreClient::new();
        mock.expect_get().returning(|_| Ok(None));

        let store = Store::new(Arc::new(mock));
        let item = store
            .get(json!({ "TableName": "testTable", "Key": { "foo": "1" } }))
            .await
            .unwrap();
        assert!(item.is_none());
    }

    #[tokio::test]
    async fn test_put_passes_params_through() {
        let mut mock = MockStoreClient::new();
        mock.expect_put()
            .withf(|params| params["TableName"] == "testTable")
            .times(1)
            .returning(|_| Ok(json!({})));

        let store = Store::new(Arc::new(mock));
        store
            .put(json!({ "TableName": "testTable", "Item": { "foo": "1", "bar": "2" } }))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_client_errors_propagate() {
        let mut mock = MockStoreClient::new();
        mock.expect_batch_write()
            .returning(|_, _| Err(anyhow::anyhow!("throttled")));

        let store = Store::new(Arc::new(mock));
        let err = store
            .bulk_write(BulkWrite::new("Music", vec![json!(1)]))
            .await
            .unwrap_err();
        assert!(matches!(err, ShellError::Client(_)));
    }
}
