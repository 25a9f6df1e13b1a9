//! HTTP response envelope for functions behind an API gateway.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Header allowing requests from any origin.
pub const ALLOW_ORIGIN: &str = "Access-Control-Allow-Origin";
/// Header allowing credentialed requests.
pub const ALLOW_CREDENTIALS: &str = "Access-Control-Allow-Credentials";

/// A gateway response: status code, optional serialized body and headers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonResponse {
    /// HTTP status code.
    pub status_code: u16,
    /// Response body; objects and arrays are serialized to a string.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
    /// Response headers, always including the CORS headers.
    pub headers: Map<String, Value>,
    /// Extra top-level fields merged into the response.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Builds a response for `status` and `body`.
///
/// Object and array bodies are serialized to JSON text, strings are passed
/// through, and `null`, `false`, `0` and empty-string bodies are omitted.
#[must_use]
pub fn json(status: u16, body: Value) -> JsonResponse {
    JsonResponse {
        status_code: status,
        body: encode_body(body),
        headers: cors_headers(Map::new()),
        extra: Map::new(),
    }
}

fn encode_body(body: Value) -> Option<Value> {
    let empty = match &body {
        Value::Null | Value::Bool(false) => true,
        Value::String(s) => s.is_empty(),
        Value::Number(n) => n.as_f64() == Some(0.0),
        _ => false,
    };
    if empty {
        return None;
    }
    if body.is_object() || body.is_array() {
        return Some(Value::String(body.to_string()));
    }
    Some(body)
}

fn cors_headers(mut headers: Map<String, Value>) -> Map<String, Value> {
    headers.insert(ALLOW_ORIGIN.to_string(), Value::String("*".to_string()));
    headers.insert(ALLOW_CREDENTIALS.to_string(), Value::Bool(true));
    headers
}

impl JsonResponse {
    /// Merges a top-level field into the response.
    ///
    /// `statusCode`, `body` and `headers` replace the built values; the CORS
    /// headers are re-applied on top of replaced headers.
    #[must_use]
    pub fn with_field(mut self, name: impl Into<String>, value: Value) -> Self {
        let name = name.into();
        match name.as_str() {
            "statusCode" => {
                if let Some(code) = value.as_u64().and_then(|c| u16::try_from(c).ok()) {
                    self.status_code = code;
                }
            }
            "body" => self.body = Some(value),
            "headers" => {
                let headers = match value {
                    Value::Object(map) => map,
                    _ => Map::new(),
                };
                self.headers = cors_headers(headers);
            }
            _ => {
                self.extra.insert(name, value);
            }
        }
        self
    }

    /// Adds a response header. The CORS headers cannot be overridden.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        let name = name.into();
        if name != ALLOW_ORIGIN && name != ALLOW_CREDENTIALS {
            self.headers.insert(name, value.into());
        }
        self
    }

    /// Converts the response into the value returned to the gateway.
    #[must_use]
    pub fn into_value(self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

impl From<JsonResponse> for Value {
    fn from(response: JsonResponse) -> Self {
        response.into_value()
    }
}
