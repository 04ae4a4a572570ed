//! Record diffing and pruning for request bodies.

use crate::record::Record;
use serde_json::{Map, Value};

/// Equality used when diffing.
///
/// Arrays and objects compare by their serialized form, so key order
/// matters. Numbers compare numerically (`1 == 1.0`), everything else
/// strictly.
pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Array(_) | Value::Object(_), _) | (_, Value::Array(_) | Value::Object(_)) => {
            a.to_string() == b.to_string()
        }
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}

/// Keys of `current` whose value differs from (or is missing in) `pristine`.
pub fn diff(pristine: &Record, current: &Record) -> Record {
    current
        .iter()
        .filter(|(key, value)| {
            pristine
                .get(key.as_str())
                .map_or(true, |old| !values_equal(old, value))
        })
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

/// Recursively drop `null`, empty objects and empty arrays.
///
/// Emptiness is judged after pruning, so `{"a": {"b": null}}` prunes to
/// `{}`. Falsy scalars (`""`, `false`, `0`) are kept.
pub fn prune_deep(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(prune_record(map)),
        Value::Array(items) => Value::Array(prune_array(items)),
        other => other.clone(),
    }
}

/// Prune every member of an array, dropping members that end up `null` or
/// empty.
pub fn prune_array(values: &[Value]) -> Vec<Value> {
    values
        .iter()
        .map(prune_deep)
        .filter(|v| !is_prunable(v))
        .collect()
}

/// [`prune_deep`] for a record.
pub fn prune_record(record: &Map<String, Value>) -> Record {
    record
        .iter()
        .map(|(key, value)| (key.clone(), prune_deep(value)))
        .filter(|(_, value)| !is_prunable(value))
        .collect()
}

fn is_prunable(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

/// The body sent for a save.
///
/// With `diff_mode` the pruned patch between the pruned pristine and
/// current records; otherwise the full pruned current record.
pub fn request_body(pristine: &Record, current: &Record, diff_mode: bool) -> Record {
    let current = prune_record(current);
    if !diff_mode {
        return current;
    }
    let pristine = prune_record(pristine);
    prune_record(&diff(&pristine, &current))
}
