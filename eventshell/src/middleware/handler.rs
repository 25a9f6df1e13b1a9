//! Handler trait wrapped by a pipeline.

use async_trait::async_trait;
use serde_json::Value;
use std::future::Future;

/// The function a pipeline wraps.
///
/// Implemented for any `Fn(Value, Value) -> impl Future<Output =
/// anyhow::Result<Value>>`, receiving owned copies of the event and
/// context as left by the `before` hooks.
#[async_trait]
pub trait Handler: Send + Sync {
    /// Handles one event.
    async fn handle(&self, event: &Value, context: &Value) -> anyhow::Result<Value>;
}

#[async_trait]
impl<F, Fut> Handler for F
where
    F: Fn(Value, Value) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<Value>> + Send,
{
    async fn handle(&self, event: &Value, context: &Value) -> anyhow::Result<Value> {
        (self)(event.clone(), context.clone()).await
    }
}
