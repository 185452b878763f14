//! Canonical Key Module
//!
//! Derives deterministic cache keys from a namespace prefix and a set of
//! request parameters.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{CacheError, Result};

// == Canonical Key ==
/// Builds the cache key for `params` under `prefix`.
///
/// The parameters must serialize to a JSON object. Its fields are sorted by
/// name and rendered as `name=JSON(value)`, joined with `&`, and appended to
/// `"{prefix}:"`. Nested objects are rendered with sorted fields too, so two
/// deeply equal parameter sets always produce the same key regardless of the
/// order their fields were built in.
///
/// # Errors
/// Returns [`CacheError::MalformedKeyInput`] when the parameters cannot be
/// serialized, are not an object, or contain a field name with `=` or `&`
/// (which would make two different parameter sets encode identically).
///
/// # Example
/// ```
/// use serde_json::json;
/// use travel_cache::cache::canonical_key;
///
/// let key = canonical_key("directions", &json!({"origin": "Paris", "mode": "driving"})).unwrap();
/// assert_eq!(key, r#"directions:mode="driving"&origin="Paris""#);
/// ```
pub fn canonical_key<P>(prefix: &str, params: &P) -> Result<String>
where
    P: Serialize + ?Sized,
{
    let value = serde_json::to_value(params)
        .map_err(|e| CacheError::MalformedKeyInput(e.to_string()))?;

    let fields = match value {
        Value::Object(fields) => fields,
        other => {
            return Err(CacheError::MalformedKeyInput(format!(
                "parameters must be an object, got {}",
                json_kind(&other)
            )))
        }
    };

    let mut key = String::with_capacity(prefix.len() + 1 + fields.len() * 16);
    key.push_str(prefix);
    key.push(':');

    for (i, (name, value)) in sorted_fields(&fields).into_iter().enumerate() {
        if name.contains(|c: char| c == '=' || c == '&') {
            return Err(CacheError::MalformedKeyInput(format!(
                "parameter name '{}' contains a reserved character",
                name
            )));
        }
        if i > 0 {
            key.push('&');
        }
        key.push_str(name);
        key.push('=');
        write_canonical_json(value, &mut key);
    }

    Ok(key)
}

fn sorted_fields(fields: &Map<String, Value>) -> Vec<(&String, &Value)> {
    let mut sorted: Vec<_> = fields.iter().collect();
    sorted.sort_by(|a, b| a.0.cmp(b.0));
    sorted
}

/// Compact JSON with object fields in sorted order.
fn write_canonical_json(value: &Value, out: &mut String) {
    match value {
        Value::Object(fields) => {
            out.push('{');
            for (i, (name, nested)) in sorted_fields(fields).into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(name.clone()).to_string());
                out.push(':');
                write_canonical_json(nested, out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical_json(item, out);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;

    #[test]
    fn test_key_format() {
        let key = canonical_key("place", &json!({"placeId": "ChIJ123"})).unwrap();
        assert_eq!(key, r#"place:placeId="ChIJ123""#);
    }

    #[test]
    fn test_fields_are_sorted() {
        let key = canonical_key("geocode", &json!({"lng": 2.35, "lat": 48.85})).unwrap();
        assert_eq!(key, "geocode:lat=48.85&lng=2.35");
    }

    #[test]
    fn test_empty_params() {
        let key = canonical_key("reviews", &json!({})).unwrap();
        assert_eq!(key, "reviews:");
    }

    #[test]
    fn test_nested_objects_are_canonical() {
        let a = json!({"origin": {"lat": 1, "lng": 2}, "waypoints": [{"b": 1, "a": 2}]});
        let b = json!({"waypoints": [{"a": 2, "b": 1}], "origin": {"lng": 2, "lat": 1}});

        let key_a = canonical_key("directions", &a).unwrap();
        assert_eq!(key_a, canonical_key("directions", &b).unwrap());
        assert_eq!(
            key_a,
            r#"directions:origin={"lat":1,"lng":2}&waypoints=[{"a":2,"b":1}]"#
        );
    }

    #[test]
    fn test_array_order_is_significant() {
        let a = canonical_key("directions", &json!({"waypoints": ["A", "B"]})).unwrap();
        let b = canonical_key("directions", &json!({"waypoints": ["B", "A"]})).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_string_and_number_values_differ() {
        let a = canonical_key("place", &json!({"id": 123})).unwrap();
        let b = canonical_key("place", &json!({"id": "123"})).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_typed_params() {
        #[derive(Serialize)]
        struct DirectionsParams<'a> {
            origin: &'a str,
            destination: &'a str,
            mode: &'a str,
        }

        let params = DirectionsParams {
            origin: "Louvre",
            destination: "Orsay",
            mode: "walking",
        };
        let key = canonical_key("directions", &params).unwrap();
        assert_eq!(
            key,
            r#"directions:destination="Orsay"&mode="walking"&origin="Louvre""#
        );
    }

    #[test]
    fn test_hashmap_params_are_order_independent() {
        let mut params = HashMap::new();
        for (k, v) in [("z", 1), ("a", 2), ("m", 3)] {
            params.insert(k.to_string(), v);
        }
        let key = canonical_key("reviews", &params).unwrap();
        assert_eq!(key, "reviews:a=2&m=3&z=1");
    }

    #[test]
    fn test_non_object_params_rejected() {
        let result = canonical_key("place", &json!(["a", "b"]));
        assert!(matches!(result, Err(CacheError::MalformedKeyInput(_))));

        let result = canonical_key("place", "plain string");
        assert!(matches!(result, Err(CacheError::MalformedKeyInput(_))));
    }

    #[test]
    fn test_unserializable_params_rejected() {
        // Tuple keys cannot become JSON object keys
        let mut params = HashMap::new();
        params.insert((1, 2), "value");

        let result = canonical_key("place", &params);
        assert!(matches!(result, Err(CacheError::MalformedKeyInput(_))));
    }

    #[test]
    fn test_reserved_characters_in_names_rejected() {
        let result = canonical_key("place", &json!({"a=1&b": 2}));
        assert!(matches!(result, Err(CacheError::MalformedKeyInput(_))));
    }

    #[test]
    fn test_reserved_characters_in_values_allowed() {
        let a = canonical_key("place", &json!({"a": "1&b=2"})).unwrap();
        let b = canonical_key("place", &json!({"a": "1", "b": 2})).unwrap();
        assert_ne!(a, b);
    }
}
