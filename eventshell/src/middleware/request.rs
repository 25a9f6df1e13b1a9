//! Per-invocation request state threaded through the stages.

use serde_json::Value;
use uuid::Uuid;

/// Mutable state of one pipeline invocation.
///
/// Stages may rewrite the event, context and response. The error slot is
/// owned by the engine and is only readable from stages.
#[derive(Debug)]
pub struct Request {
    request_id: Uuid,
    event: Value,
    context: Value,
    response: Option<Value>,
    error: Option<anyhow::Error>,
}

impl Request {
    /// Creates the request for a new invocation.
    #[must_use]
    pub fn new(event: Value, context: Value) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            event,
            context,
            response: None,
            error: None,
        }
    }

    /// Identifier of this invocation, used in log fields.
    #[must_use]
    pub fn request_id(&self) -> Uuid {
        self.request_id
    }

    /// The triggering event.
    #[must_use]
    pub fn event(&self) -> &Value {
        &self.event
    }

    /// Mutable access to the triggering event.
    pub fn event_mut(&mut self) -> &mut Value {
        &mut self.event
    }

    /// The invocation context.
    #[must_use]
    pub fn context(&self) -> &Value {
        &self.context
    }

    /// Mutable access to the invocation context.
    pub fn context_mut(&mut self) -> &mut Value {
        &mut self.context
    }

    /// The current response, if any.
    #[must_use]
    pub fn response(&self) -> Option<&Value> {
        self.response.as_ref()
    }

    /// Mutable access to the response slot.
    pub fn response_mut(&mut self) -> &mut Option<Value> {
        &mut self.response
    }

    /// Sets the response.
    pub fn set_response(&mut self, response: Value) {
        self.response = Some(response);
    }

    /// Clears the response.
    pub fn clear_response(&mut self) {
        self.response = None;
    }

    /// Returns true if a non-null response is present.
    #[must_use]
    pub fn has_response(&self) -> bool {
        matches!(&self.response, Some(v) if !v.is_null())
    }

    /// The failure being handled, while error stages run.
    #[must_use]
    pub fn error(&self) -> Option<&anyhow::Error> {
        self.error.as_ref()
    }

    pub(crate) fn set_error(&mut self, error: anyhow::Error) {
        self.error = Some(error);
    }

    pub(crate) fn take_error(&mut self) -> Option<anyhow::Error> {
        self.error.take()
    }

    pub(crate) fn take_response(&mut self) -> Option<Value> {
        self.response.take()
    }
}
