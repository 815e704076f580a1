//! Purpose: Combine the JSON of several converted documents into one module view.
//! Exports: `merge_into`.
//! Role: Multi-file conversion support for the native host (one module = many files).
//! Invariants: Objects merge recursively; arrays concatenate in input order; other values: last wins.
use serde_json::Value;

pub fn merge_into(target: &mut Value, incoming: Value) {
    match (target, incoming) {
        (Value::Object(target), Value::Object(incoming)) => {
            for (key, value) in incoming {
                match target.get_mut(&key) {
                    Some(existing) => merge_into(existing, value),
                    None => {
                        target.insert(key, value);
                    }
                }
            }
        }
        (Value::Array(target), Value::Array(incoming)) => target.extend(incoming),
        (target, incoming) => *target = incoming,
    }
}
