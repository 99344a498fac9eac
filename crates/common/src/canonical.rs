//! Canonical-JSON equality, used by the Structurer to decide whether two
//! emissions of the same datasetId share a version (§4.4.4, §8).

use serde_json::Value;

/// Recursively sorts object keys while preserving array order (array order
/// is semantically meaningful — experiment sequence — so only map keys are
/// canonicalized) and renders the result as a JSON string suitable for
/// equality comparison or use as a hash-map key.
pub fn canonical_key(value: &Value) -> String {
    let sorted = sort_value(value);
    serde_json::to_string(&sorted).expect("serde_json::Value always serializes")
}

/// Two values are canonically equal when their sorted-key JSON renderings
/// are byte-identical.
pub fn canonical_eq(a: &Value, b: &Value) -> bool {
    canonical_key(a) == canonical_key(b)
}

fn sort_value(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|(a, _), (b, _)| a.cmp(b));
            let mut sorted = serde_json::Map::new();
            for (k, v) in entries {
                sorted.insert(k.clone(), sort_value(v));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.iter().map(sort_value).collect()),
        other => other.clone(),
    }
}
