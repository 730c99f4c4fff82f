//! Post-processing for the `metrics` row.
//!
//! The warehouse hands the per-priority breakdown back as a JSON-encoded
//! string column. It is decoded into a list of records before the row goes
//! out; a breakdown that cannot be decoded becomes an empty list instead of
//! failing the request.

use ownership_backend::Row;
use serde_json::Value;

/// Column holding the serialized per-priority breakdown.
pub const BREAKDOWN_FIELD: &str = "priority_breakdown";

/// Decode a breakdown cell into a list of records.
///
/// Accepts the JSON string the warehouse produces, or an array that a
/// backend already decoded. Anything else, including malformed JSON or an
/// array holding non-objects, yields an empty list.
pub fn decode_breakdown(value: &Value) -> Vec<Row> {
    let decoded = match value {
        Value::String(text) => match serde_json::from_str::<Value>(text) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!(error = %e, "priority breakdown is not valid JSON");
                return Vec::new();
            }
        },
        Value::Array(_) => value.clone(),
        Value::Null => return Vec::new(),
        other => {
            tracing::warn!(kind = json_kind(other), "unexpected priority breakdown value");
            return Vec::new();
        }
    };

    let items = match decoded {
        Value::Array(items) => items,
        other => {
            tracing::warn!(kind = json_kind(&other), "priority breakdown is not a list");
            return Vec::new();
        }
    };

    let mut records = Vec::with_capacity(items.len());
    for item in items {
        match item {
            Value::Object(record) => records.push(record),
            other => {
                tracing::warn!(kind = json_kind(&other), "priority breakdown entry is not a record");
                return Vec::new();
            }
        }
    }
    records
}

/// Replace the serialized breakdown in a metrics row with its decoded form.
///
/// A row without the column gets an empty list, so callers always see the
/// field. Column order is preserved.
pub fn normalize_metrics_row(mut row: Row) -> Row {
    let decoded = row
        .get(BREAKDOWN_FIELD)
        .map(decode_breakdown)
        .unwrap_or_default();
    let decoded = Value::Array(decoded.into_iter().map(Value::Object).collect());
    match row.get_mut(BREAKDOWN_FIELD) {
        Some(slot) => *slot = decoded,
        None => {
            row.insert(BREAKDOWN_FIELD.to_string(), decoded);
        }
    }
    row
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
