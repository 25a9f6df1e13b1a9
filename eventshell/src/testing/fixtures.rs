//! Event fixtures shaped like the payloads each trigger delivers.

use serde_json::{json, Value};

/// An HTTP event carrying `body` as a JSON string.
#[must_use]
pub fn json_event(body: &Value) -> Value {
    json!({
        "httpMethod": "POST",
        "headers": { "Content-Type": "application/json" },
        "body": body.to_string(),
    })
}

/// An HTTP event carrying a URL-encoded `body` and path parameters.
#[must_use]
pub fn form_event(body: &str, path_parameters: Value) -> Value {
    json!({
        "httpMethod": "POST",
        "headers": { "Content-Type": "application/x-www-form-urlencoded" },
        "body": body,
        "pathParameters": path_parameters,
    })
}

/// A notification event with a single record whose message is `message`.
#[must_use]
pub fn notification_event(message: &str) -> Value {
    json!({
        "Records": [{
            "EventSource": "aws:sns",
            "Sns": {
                "MessageId": "00000000-0000-0000-0000-000000000000",
                "Message": message,
            }
        }]
    })
}

/// A queue batch event with one record per body.
///
/// Records are numbered from zero: message id `m{i}`, receipt handle `r{i}`.
#[must_use]
pub fn queue_event<I, S>(bodies: I) -> Value
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let records: Vec<Value> = bodies
        .into_iter()
        .enumerate()
        .map(|(i, body)| {
            json!({
                "messageId": format!("m{i}"),
                "receiptHandle": format!("r{i}"),
                "body": body.into(),
                "attributes": {},
            })
        })
        .collect();
    json!({ "Records": records })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue;

    #[test]
    fn test_queue_event_numbers_records() {
        let event = queue_event(["a", "b"]);
        let records = queue::records(&event).unwrap();

        assert_eq!(records[1].message_id, "m1");
        assert_eq!(records[1].receipt_handle, "r1");
        assert_eq!(records[1].body, "b");
    }
}
