//! Decoders and handler adapters for the supported trigger events.
//!
//! Each decoder turns a raw event into the payload a handler cares about.
//! Undecodable payloads are reported as `None` and left to the handler.

pub mod http;
pub mod notification;

pub use http::{form_body, json_body, path_parameters, FormHandler, JsonHandler};
pub use notification::{fifo_message, message, FifoNotificationHandler, NotificationHandler};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// The kinds of event a function can be invoked with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trigger {
    /// HTTP request with a JSON body.
    HttpJson,
    /// HTTP request with a URL-encoded form body.
    HttpForm,
    /// Notification topic delivery.
    Notification,
    /// Notification from a FIFO topic, delivered through a queue.
    NotificationFifo,
    /// Batch of queue messages.
    QueueBatch,
}

impl Trigger {
    /// Infers the trigger from the shape of `event`.
    #[must_use]
    pub fn detect(event: &Value) -> Option<Self> {
        if let Some(first) = event
            .get("Records")
            .and_then(Value::as_array)
            .and_then(|records| records.first())
        {
            if first.get("Sns").is_some() {
                return Some(Self::Notification);
            }
            if first.get("receiptHandle").is_some() {
                let wraps_fifo_topic = first
                    .get("body")
                    .and_then(Value::as_str)
                    .and_then(|body| serde_json::from_str::<Value>(body).ok())
                    .and_then(|envelope| {
                        envelope
                            .get("TopicArn")
                            .and_then(Value::as_str)
                            .map(|arn| arn.ends_with(".fifo"))
                    })
                    .unwrap_or(false);
                return Some(if wraps_fifo_topic {
                    Self::NotificationFifo
                } else {
                    Self::QueueBatch
                });
            }
            return None;
        }

        if event.get("body").is_some() || event.get("httpMethod").is_some() {
            let is_form = http::content_type(event)
                .is_some_and(|ct| ct.starts_with("application/x-www-form-urlencoded"));
            return Some(if is_form { Self::HttpForm } else { Self::HttpJson });
        }

        None
    }

    /// Returns the trigger name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HttpJson => "http_json",
            Self::HttpForm => "http_form",
            Self::Notification => "notification",
            Self::NotificationFifo => "notification_fifo",
            Self::QueueBatch => "queue_batch",
        }
    }
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
