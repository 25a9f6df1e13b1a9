//! HTTP request events.

use crate::middleware::Handler;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::future::Future;

fn raw_body(event: &Value) -> Option<&str> {
    event.get("body").and_then(Value::as_str)
}

/// Returns the lowercased `Content-Type` header, matched case-insensitively.
pub(crate) fn content_type(event: &Value) -> Option<String> {
    event
        .get("headers")
        .and_then(Value::as_object)?
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case("content-type"))
        .and_then(|(_, value)| value.as_str())
        .map(str::to_ascii_lowercase)
}

/// Decodes the request body as JSON; `None` if absent or malformed.
#[must_use]
pub fn json_body(event: &Value) -> Option<Value> {
    serde_json::from_str(raw_body(event)?).ok()
}

/// Decodes a URL-encoded request body into an object of strings.
///
/// A key that appears more than once maps to an array of its values in
/// order. A missing body decodes to an empty object.
#[must_use]
pub fn form_body(event: &Value) -> Value {
    let body = raw_body(event).unwrap_or_default();
    let mut fields = Map::new();

    for (key, value) in form_urlencoded::parse(body.as_bytes()) {
        let value = Value::String(value.into_owned());
        match fields.get_mut(key.as_ref()) {
            Some(Value::Array(values)) => values.push(value),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, value]);
            }
            None => {
                fields.insert(key.into_owned(), value);
            }
        }
    }

    Value::Object(fields)
}

/// Returns the path parameters of the request, `Value::Null` if none.
#[must_use]
pub fn path_parameters(event: &Value) -> Value {
    event.get("pathParameters").cloned().unwrap_or(Value::Null)
}

/// Adapts `Fn(body, event, context)` into a [`Handler`] for JSON requests.
///
/// `body` is `None` when the request body is not valid JSON.
#[derive(Debug, Clone)]
pub struct JsonHandler<F> {
    f: F,
}

impl<F> JsonHandler<F> {
    /// Wraps `f`.
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

#[async_trait]
impl<F, Fut> Handler for JsonHandler<F>
where
    F: Fn(Option<Value>, Value, Value) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<Value>> + Send,
{
    async fn handle(&self, event: &Value, context: &Value) -> anyhow::Result<Value> {
        (self.f)(json_body(event), event.clone(), context.clone()).await
    }
}

/// Adapts `Fn(form, path_parameters)` into a [`Handler`] for URL-encoded
/// requests.
#[derive(Debug, Clone)]
pub struct FormHandler<F> {
    f: F,
}

impl<F> FormHandler<F> {
    /// Wraps `f`.
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

#[async_trait]
impl<F, Fut> Handler for FormHandler<F>
where
    F: Fn(Value, Value) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<Value>> + Send,
{
    async fn handle(&self, event: &Value, _context: &Value) -> anyhow::Result<Value> {
        (self.f)(form_body(event), path_parameters(event)).await
    }
}
