//! Conversions between plain documents and the store's typed wire format.

use crate::errors::ShellError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

/// Converts one typed attribute value (`{"S": "x"}`, `{"N": "1"}`, ...)
/// into a plain JSON value.
///
/// A plain object whose single key is not a type tag is treated as a map
/// of attributes. Anything else is returned as-is.
#[must_use]
pub fn unmarshall(attribute: &Value) -> Value {
    let Some(map) = attribute.as_object() else {
        return attribute.clone();
    };

    if map.len() == 1 {
        if let Some((tag, inner)) = map.iter().next() {
            if let Some(value) = unmarshall_tagged(tag, inner) {
                return value;
            }
        }
    }

    unmarshall_map(map)
}

fn unmarshall_tagged(tag: &str, inner: &Value) -> Option<Value> {
    let value = match (tag, inner) {
        ("S" | "B", Value::String(_)) => inner.clone(),
        ("N", Value::String(s)) => parse_number(s),
        ("BOOL", Value::Bool(_)) => inner.clone(),
        ("NULL", _) => Value::Null,
        ("M", Value::Object(map)) => unmarshall_map(map),
        ("L", Value::Array(items)) => Value::Array(items.iter().map(unmarshall).collect()),
        ("SS" | "BS", Value::Array(_)) => inner.clone(),
        ("NS", Value::Array(items)) => Value::Array(
            items
                .iter()
                .map(|n| n.as_str().map_or_else(|| n.clone(), parse_number))
                .collect(),
        ),
        _ => return None,
    };
    Some(value)
}

fn unmarshall_map(map: &Map<String, Value>) -> Value {
    Value::Object(
        map.iter()
            .map(|(name, attribute)| (name.clone(), unmarshall(attribute)))
            .collect(),
    )
}

fn parse_number(raw: &str) -> Value {
    if let Ok(int) = raw.parse::<i64>() {
        return Value::Number(int.into());
    }
    raw.parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map_or_else(|| Value::String(raw.to_string()), Value::Number)
}

/// Extracts and decodes the named image (`NewImage`, `OldImage`) from each
/// change-stream record.
///
/// Records without the image decode to `Value::Null`.
///
/// # Errors
///
/// Returns `MissingArgument("records")` if `records` is not an array.
pub fn unmarshall_records(records: &Value, image: &str) -> Result<Vec<Value>, ShellError> {
    let records = records
        .as_array()
        .ok_or(ShellError::MissingArgument("records"))?;

    Ok(records
        .iter()
        .map(|record| {
            record
                .get("dynamodb")
                .and_then(|stream| stream.get(image))
                .map_or(Value::Null, unmarshall)
        })
        .collect())
}

/// Parameters of an update derived from two versions of a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UpdateExpression {
    /// Placeholder to attribute name.
    pub expression_attribute_names: Map<String, Value>,
    /// Placeholder to new value; omitted when only removals remain.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub expression_attribute_values: Map<String, Value>,
    /// The `SET`/`REMOVE` expression.
    pub update_expression: String,
}

impl UpdateExpression {
    /// Returns true if the two documents did not differ.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.update_expression.is_empty()
    }
}

fn placeholder(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

/// Builds the update turning `original` into `updated`.
///
/// Changed or added top-level fields become `SET` clauses and fields
/// missing from `updated` become `REMOVE` clauses, both in key order.
///
/// # Errors
///
/// Returns `MissingArgument("original and updated")` unless both
/// arguments are objects.
pub fn update_expression(original: &Value, updated: &Value) -> Result<UpdateExpression, ShellError> {
    let (Some(original), Some(updated)) = (original.as_object(), updated.as_object()) else {
        return Err(ShellError::MissingArgument("original and updated"));
    };

    let mut names = Map::new();
    let mut values = Map::new();
    let mut set = Vec::new();
    let mut remove = Vec::new();

    for (name, value) in updated {
        if original.get(name) == Some(value) {
            continue;
        }
        let key = placeholder(name);
        names.insert(format!("#{key}"), Value::String(name.clone()));
        values.insert(format!(":{key}"), value.clone());
        set.push(format!("#{key} = :{key}"));
    }

    for name in original.keys().filter(|name| !updated.contains_key(*name)) {
        let key = placeholder(name);
        names.insert(format!("#{key}"), Value::String(name.clone()));
        remove.push(format!("#{key}"));
    }

    let mut clauses = Vec::new();
    if !set.is_empty() {
        clauses.push(format!("SET {}", set.join(", ")));
    }
    if !remove.is_empty() {
        clauses.push(format!("REMOVE {}", remove.join(", ")));
    }

    Ok(UpdateExpression {
        expression_attribute_names: names,
        expression_attribute_values: values,
        update_expression: clauses.join(" "),
    })
}
