// Semantic equality of specification payloads.
//
// The API server drops nulls and empty collections when it stores an object,
// so a spec read back from the cache can differ from a freshly built one in
// representation only. Both sides are serialised and normalised before being
// compared structurally.

use serde::Serialize;
use serde_json::Value;

pub fn equal<T: Serialize>(a: &T, b: &T) -> Result<bool, serde_json::Error> {
    Ok(normalize(serde_json::to_value(a)?) == normalize(serde_json::to_value(b)?))
}

fn normalize(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| (k, normalize(v)))
                .filter(|(_, v)| !is_empty(v))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(normalize).collect()),
        v => v,
    }
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn identical_values_are_equal() {
        let a = json!({"hosts": ["a.example.com"], "gateways": ["gw"]});
        assert!(equal(&a, &a.clone()).unwrap());
    }

    #[test]
    fn absent_and_defaulted_fields_are_equal() {
        let built = json!({"hosts": ["a.example.com"], "gateways": [], "tls": null});
        let stored = json!({"hosts": ["a.example.com"]});
        assert!(equal(&built, &stored).unwrap());

        let nested = json!({"http": [{"route": [{"destination": {"host": "a", "port": {}}}]}]});
        let trimmed = json!({"http": [{"route": [{"destination": {"host": "a"}}]}]});
        assert!(equal(&nested, &trimmed).unwrap());
    }

    #[test]
    fn differing_values_are_not_equal() {
        let a = json!({"hosts": ["origin.example.com"]});
        let b = json!({"hosts": ["desired.example.com"]});
        assert!(!equal(&a, &b).unwrap());
    }

    #[test]
    fn array_order_is_significant() {
        let a = json!({"hosts": ["a", "b"]});
        let b = json!({"hosts": ["b", "a"]});
        assert!(!equal(&a, &b).unwrap());
    }

    #[test]
    fn scalar_defaults_are_not_dropped() {
        let a = json!({"weight": 0, "mirror": false});
        let b = json!({});
        assert!(!equal(&a, &b).unwrap());
    }
}
