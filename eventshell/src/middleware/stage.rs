//! Middleware stages.

use super::Request;
use async_trait::async_trait;
use std::fmt;

/// A unit of middleware contributing hooks around the handler.
///
/// Every hook is optional; the defaults do nothing. `before` hooks run in
/// reverse registration order, `after` and `on_error` hooks in
/// registration order.
#[async_trait]
pub trait Stage: Send + Sync {
    /// Returns the stage name used in log fields.
    fn name(&self) -> &str {
        "stage"
    }

    /// Called before the handler.
    async fn before(&self, _request: &mut Request) -> anyhow::Result<()> {
        Ok(())
    }

    /// Called after the handler produced a response.
    async fn after(&self, _request: &mut Request) -> anyhow::Result<()> {
        Ok(())
    }

    /// Called when a hook or the handler failed.
    ///
    /// Setting a response on the request recovers the invocation.
    async fn on_error(&self, _request: &mut Request) -> anyhow::Result<()> {
        Ok(())
    }
}

type Hook = Box<dyn Fn(&mut Request) -> anyhow::Result<()> + Send + Sync>;

/// A stage assembled from synchronous closures.
///
/// ```rust,ignore
/// let stage = FnStage::new("cors")
///     .on_after(|req| {
///         if let Some(resp) = req.response_mut() {
///             resp["headers"]["Access-Control-Allow-Origin"] = "*".into();
///         }
///         Ok(())
///     });
/// ```
pub struct FnStage {
    name: String,
    before: Option<Hook>,
    after: Option<Hook>,
    on_error: Option<Hook>,
}

impl FnStage {
    /// Creates a stage with no hooks.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            before: None,
            after: None,
            on_error: None,
        }
    }

    /// Sets the `before` hook.
    #[must_use]
    pub fn on_before<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut Request) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.before = Some(Box::new(hook));
        self
    }

    /// Sets the `after` hook.
    #[must_use]
    pub fn on_after<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut Request) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.after = Some(Box::new(hook));
        self
    }

    /// Sets the `on_error` hook.
    #[must_use]
    pub fn on_failure<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut Request) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.on_error = Some(Box::new(hook));
        self
    }
}

impl fmt::Debug for FnStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnStage")
            .field("name", &self.name)
            .field("before", &self.before.is_some())
            .field("after", &self.after.is_some())
            .field("on_error", &self.on_error.is_some())
            .finish()
    }
}

fn run_hook(hook: Option<&Hook>, request: &mut Request) -> anyhow::Result<()> {
    hook.map_or(Ok(()), |hook| hook(request))
}

#[async_trait]
impl Stage for FnStage {
    fn name(&self) -> &str {
        &self.name
    }

    async fn before(&self, request: &mut Request) -> anyhow::Result<()> {
        run_hook(self.before.as_ref(), request)
    }

    async fn after(&self, request: &mut Request) -> anyhow::Result<()> {
        run_hook(self.after.as_ref(), request)
    }

    async fn on_error(&self, request: &mut Request) -> anyhow::Result<()> {
        run_hook(self.on_error.as_ref(), request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    #[tokio::test]
    async fn test_empty_stage_is_noop() {
        let stage = FnStage::new("empty");
        let mut request = Request::new(json!({}), json!({}));

        stage.before(&mut request).await.unwrap();
        stage.after(&mut request).await.unwrap();
        stage.on_error(&mut request).await.unwrap();

        assert_eq!(stage.name(), "empty");
        assert!(request.response().is_none());
    }

    #[tokio::test]
    async fn test_hooks_mutate_request() {
        let stage = FnStage::new("tagger")
            .on_before(|req| {
                req.context_mut()["tagged"] = json!(true);
                Ok(())
            })
            .on_failure(|req| {
                req.set_response(json!("recovered"));
                Ok(())
            });

        let mut request = Request::new(Value::Null, json!({}));
        stage.before(&mut request).await.unwrap();
        stage.on_error(&mut request).await.unwrap();

        assert_eq!(request.context()["tagged"], json!(true));
        assert_eq!(request.response(), Some(&json!("recovered")));
    }

    #[test]
    fn test_debug_lists_hooks() {
        let stage = FnStage::new("debug").on_after(|_| Ok(()));
        let rendered = format!("{stage:?}");
        assert!(rendered.contains("after: true"));
        assert!(rendered.contains("before: false"));
    }
}
