//! Pipeline engine running stages around a handler.

use super::{Handler, Request, Stage};
use crate::errors::{ErrorStageFailure, ShellError};
use async_trait::async_trait;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn, Instrument};

/// A handler wrapped in an ordered list of stages.
///
/// Stages registered A then B run as `B.before, A.before, handler,
/// A.after, B.after`; on failure the `on_error` hooks run as `A, B`.
#[derive(Clone)]
pub struct Pipeline {
    handler: Arc<dyn Handler>,
    stages: Vec<Arc<dyn Stage>>,
}

impl Pipeline {
    /// Wraps a handler with an empty stage list.
    pub fn wrap<H>(handler: H) -> Self
    where
        H: Handler + 'static,
    {
        Self {
            handler: Arc::new(handler),
            stages: Vec::new(),
        }
    }

    /// Wraps a handler that may be absent.
    ///
    /// Fails with [`ShellError::InvalidHandler`] when `handler` is `None`.
    pub fn try_wrap(handler: Option<Arc<dyn Handler>>) -> Result<Self, ShellError> {
        let handler = handler.ok_or(ShellError::InvalidHandler)?;
        Ok(Self {
            handler,
            stages: Vec::new(),
        })
    }

    /// Registers a stage.
    #[must_use]
    pub fn with<S>(mut self, stage: S) -> Self
    where
        S: Stage + 'static,
    {
        self.stages.push(Arc::new(stage));
        self
    }

    /// Registers a stage. Alias of [`with`](Self::with).
    #[must_use]
    pub fn use_stage<S>(self, stage: S) -> Self
    where
        S: Stage + 'static,
    {
        self.with(stage)
    }

    /// Registers a shared stage.
    #[must_use]
    pub fn with_shared(mut self, stage: Arc<dyn Stage>) -> Self {
        self.stages.push(stage);
        self
    }

    /// Registers a stage on an existing pipeline.
    pub fn push<S>(&mut self, stage: S) -> &mut Self
    where
        S: Stage + 'static,
    {
        self.stages.push(Arc::new(stage));
        self
    }

    /// Number of registered stages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Returns true if no stages are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Runs one invocation.
    ///
    /// On failure the error returned by the handler or hook is handed back
    /// unchanged unless an `on_error` hook recovers it by setting a
    /// response. If an `on_error` hook fails, the result is a
    /// [`ShellError::ErrorStage`] carrying both errors.
    pub async fn invoke(&self, event: Value, context: Value) -> anyhow::Result<Value> {
        let mut request = Request::new(event, context);
        let span = tracing::debug_span!(
            "pipeline",
            request_id = %request.request_id(),
            stages = self.stages.len(),
        );

        async move {
            match self.run(&mut request).await {
                Ok(()) => {
                    debug!("Pipeline completed");
                    Ok(request.take_response().unwrap_or(Value::Null))
                }
                Err(error) => self.recover(request, error).await,
            }
        }
        .instrument(span)
        .await
    }

    async fn run(&self, request: &mut Request) -> anyhow::Result<()> {
        for stage in self.stages.iter().rev() {
            debug!(stage = stage.name(), "Running before hook");
            stage.before(request).await?;
        }

        let response = self
            .handler
            .handle(request.event(), request.context())
            .await?;
        request.set_response(response);

        for stage in &self.stages {
            debug!(stage = stage.name(), "Running after hook");
            stage.after(request).await?;
        }

        Ok(())
    }

    async fn recover(&self, mut request: Request, error: anyhow::Error) -> anyhow::Result<Value> {
        warn!(error = %error, "Pipeline failed, running error hooks");

        request.clear_response();
        request.set_error(error);

        for stage in &self.stages {
            debug!(stage = stage.name(), "Running error hook");
            if let Err(stage_error) = stage.on_error(&mut request).await {
                warn!(
                    stage = stage.name(),
                    error = %stage_error,
                    "Error hook failed"
                );
                let original = take_original(&mut request);
                return Err(ShellError::from(ErrorStageFailure::new(stage_error, original)).into());
            }
        }

        if request.has_response() {
            debug!("Error hooks recovered the invocation");
            return Ok(request.take_response().unwrap_or(Value::Null));
        }

        Err(take_original(&mut request))
    }
}

// The error slot is only written by the engine, so it is always filled here.
fn take_original(request: &mut Request) -> anyhow::Error {
    request
        .take_error()
        .unwrap_or_else(|| anyhow::anyhow!("pipeline failed without a recorded error"))
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field(
                "stages",
                &self.stages.iter().map(|s| s.name()).collect::<Vec<_>>(),
            )
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Handler for Pipeline {
    async fn handle(&self, event: &Value, context: &Value) -> anyhow::Result<Value> {
        self.invoke(event.clone(), context.clone()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::FnStage;
    use crate::testing::RecordingStage;
    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::error::Error as _;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, thiserror::Error)]
    #[error("mock")]
    struct MockError;

    type Log = Arc<Mutex<Vec<String>>>;

    fn echo_handler(log: Log) -> impl Handler {
        move |event: Value, _context: Value| {
            let log = log.clone();
            async move {
                log.lock().push("handler".to_string());
                Ok::<_, anyhow::Error>(event)
            }
        }
    }

    fn failing_handler() -> impl Handler {
        |_event: Value, _context: Value| async { Err::<Value, _>(anyhow::Error::new(MockError)) }
    }

    #[tokio::test]
    async fn test_invokes_handler() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let pipeline = Pipeline::wrap(move |_e: Value, _c: Value| {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Ok::<_, anyhow::Error>(json!({ "statusCode": 200 })) }
        });

        let out = pipeline
            .invoke(json!({"mock": "event"}), json!({"mock": "context"}))
            .await
            .unwrap();

        assert_eq!(out, json!({ "statusCode": 200 }));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_try_wrap_rejects_missing_handler() {
        let err = Pipeline::try_wrap(None).unwrap_err();
        assert!(matches!(err, ShellError::InvalidHandler));
        assert!(err.to_string().contains("function"));
    }

    #[tokio::test]
    async fn test_hook_ordering() {
        let log: Log = Arc::default();
        let pipeline = Pipeline::wrap(echo_handler(log.clone()))
            .with(RecordingStage::new("A", log.clone()))
            .use_stage(RecordingStage::new("B", log.clone()));

        pipeline.invoke(json!({}), json!({})).await.unwrap();

        assert_eq!(
            *log.lock(),
            vec!["B:before", "A:before", "handler", "A:after", "B:after"]
        );
    }

    #[tokio::test]
    async fn test_error_hook_ordering() {
        let log: Log = Arc::default();
        let pipeline = Pipeline::wrap(failing_handler())
            .with(RecordingStage::new("A", log.clone()))
            .with(RecordingStage::new("B", log.clone()));

        assert!(pipeline.invoke(json!({}), json!({})).await.is_err());
        assert_eq!(
            *log.lock(),
            vec!["B:before", "A:before", "A:on_error", "B:on_error"]
        );
    }

    #[tokio::test]
    async fn test_before_hook_mutates_context() {
        let pipeline = Pipeline::wrap(|_e: Value, context: Value| async move {
            Ok::<_, anyhow::Error>(context)
        })
        .with(FnStage::new("ctx").on_before(|req| {
            req.context_mut()["foo"] = json!("bar");
            Ok(())
        }));

        let out = pipeline
            .invoke(json!({}), json!({"mock": "context"}))
            .await
            .unwrap();
        assert_eq!(out, json!({"mock": "context", "foo": "bar"}));
    }

    #[tokio::test]
    async fn test_after_hook_rewrites_response() {
        let pipeline = Pipeline::wrap(|_e: Value, _c: Value| async {
            Ok::<_, anyhow::Error>(json!({"foo": "bar"}))
        })
        .with(FnStage::new("stringify").on_after(|req| {
            let body = req.response().map(ToString::to_string).unwrap_or_default();
            req.set_response(Value::String(body));
            Ok(())
        }));

        let out = pipeline.invoke(Value::Null, Value::Null).await.unwrap();
        assert_eq!(out, json!(r#"{"foo":"bar"}"#));
    }

    #[tokio::test]
    async fn test_handler_error_propagates_unchanged() {
        let pipeline = Pipeline::wrap(failing_handler());

        let err = pipeline.invoke(json!({}), json!({})).await.unwrap_err();
        assert!(err.downcast_ref::<MockError>().is_some());
    }

    #[tokio::test]
    async fn test_error_hook_sees_error_and_recovers() {
        let seen = Arc::new(Mutex::new(None));
        let seen_clone = seen.clone();
        let pipeline = Pipeline::wrap(failing_handler()).with(FnStage::new("recover").on_failure(
            move |req| {
                let message = req.error().map(ToString::to_string);
                *seen_clone.lock() = message.clone();
                req.set_response(json!({ "recovered": message }));
                Ok(())
            },
        ));

        let out = pipeline.invoke(json!({}), json!({})).await.unwrap();
        assert_eq!(out, json!({ "recovered": "mock" }));
        assert_eq!(seen.lock().as_deref(), Some("mock"));
    }

    #[tokio::test]
    async fn test_error_hook_without_response_rethrows() {
        let pipeline = Pipeline::wrap(failing_handler()).with(FnStage::new("null").on_failure(
            |req| {
                req.set_response(Value::Null);
                Ok(())
            },
        ));

        let err = pipeline.invoke(json!({}), json!({})).await.unwrap_err();
        assert!(err.downcast_ref::<MockError>().is_some());
    }

    #[tokio::test]
    async fn test_failing_error_hook_keeps_original_as_cause() {
        let pipeline = Pipeline::wrap(failing_handler()).with(
            FnStage::new("broken").on_failure(|_| Err(anyhow::anyhow!("error middleware error"))),
        );

        let err = pipeline.invoke(json!({}), json!({})).await.unwrap_err();
        assert_eq!(err.to_string(), "error middleware error");

        match err.downcast_ref::<ShellError>() {
            Some(ShellError::ErrorStage(failure)) => {
                assert!(failure.original().downcast_ref::<MockError>().is_some());
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_failing_error_hook_chains_original_error() {
        let pipeline = Pipeline::wrap(|_e: Value, _c: Value| async {
            Err::<Value, _>(anyhow::anyhow!("original"))
        })
        .with(FnStage::new("broken").on_failure(|_| Err(anyhow::anyhow!("hook failed"))));

        let err = pipeline.invoke(json!({}), json!({})).await.unwrap_err();

        let chain: Vec<String> = err.chain().map(ToString::to_string).collect();
        assert_eq!(chain, vec!["hook failed".to_string(), "original".to_string()]);
        assert_eq!(err.source().map(ToString::to_string).as_deref(), Some("original"));
    }

    #[tokio::test]
    async fn test_failing_error_hook_stops_later_hooks() {
        let log: Log = Arc::default();
        let pipeline = Pipeline::wrap(failing_handler())
            .with(FnStage::new("broken").on_failure(|_| Err(anyhow::anyhow!("boom"))))
            .with(RecordingStage::new("B", log.clone()));

        assert!(pipeline.invoke(json!({}), json!({})).await.is_err());
        assert!(!log.lock().iter().any(|entry| entry == "B:on_error"));
    }

    #[tokio::test]
    async fn test_after_failure_clears_partial_response() {
        let pipeline = Pipeline::wrap(|_e: Value, _c: Value| async {
            Ok::<_, anyhow::Error>(json!("partial"))
        })
        .with(FnStage::new("check").on_failure(|req| {
            assert!(req.response().is_none());
            req.set_response(json!("fallback"));
            Ok(())
        }))
        .with(FnStage::new("explode").on_after(|_| Err(anyhow::anyhow!("after failed"))));

        let out = pipeline.invoke(Value::Null, Value::Null).await.unwrap();
        assert_eq!(out, json!("fallback"));
    }

    #[tokio::test]
    async fn test_before_failure_skips_handler() {
        let log: Log = Arc::default();
        let pipeline = Pipeline::wrap(echo_handler(log.clone()))
            .with(FnStage::new("deny").on_before(|_| Err(anyhow::anyhow!("denied"))));

        let err = pipeline.invoke(json!({}), json!({})).await.unwrap_err();
        assert_eq!(err.to_string(), "denied");
        assert!(log.lock().is_empty());
    }

    #[tokio::test]
    async fn test_push_registers_on_existing_pipeline() {
        let log: Log = Arc::default();
        let mut pipeline = Pipeline::wrap(echo_handler(log.clone()));
        pipeline.push(RecordingStage::new("late", log.clone()));

        assert_eq!(pipeline.len(), 1);
        pipeline.invoke(json!({}), json!({})).await.unwrap();
        assert_eq!(log.lock().first().map(String::as_str), Some("late:before"));
    }

    #[tokio::test]
    async fn test_nested_pipeline_as_handler() {
        let inner = Pipeline::wrap(|event: Value, _c: Value| async move {
            Ok::<_, anyhow::Error>(event)
        });
        let outer = Pipeline::wrap(inner);

        let out = outer.invoke(json!({"n": 1}), Value::Null).await.unwrap();
        assert_eq!(out, json!({"n": 1}));
    }
}
