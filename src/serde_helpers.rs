// Lenient (de)serializers for hand-edited curriculum files.
//
// Imported documents are accepted best-effort: a field holding the wrong JSON type falls back
// to a default instead of rejecting the whole document.

use log::warn;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serializer};
use serde_json::Value;

/// Truthiness of a JSON value, the way the editor checks optional fields
/// (`null`, `false`, `0`, `""` are falsy; arrays and objects are always truthy).
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().map_or(false, |n| n != 0.0 && !n.is_nan()),
        Value::String(text) => !text.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Converts a scalar JSON value to text. Composite values yield an empty string.
pub fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Number(number) => number.to_string(),
        Value::Bool(flag) => flag.to_string(),
        Value::Null => String::new(),
        Value::Array(_) | Value::Object(_) => {
            warn!("Expected a text value, found {}; using an empty string", value);
            String::new()
        }
    }
}

/// Deserializes a list element by element, skipping (and logging) entries that do not fit `T`.
/// A missing or non-array value yields an empty list.
pub fn vec_from_value<T: DeserializeOwned>(value: Value) -> Vec<T> {
    match value {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| match serde_json::from_value(item) {
                Ok(parsed) => Some(parsed),
                Err(e) => {
                    warn!("Skipping malformed list entry: {}", e);
                    None
                }
            })
            .collect(),
        Value::Null => Vec::new(),
        other => {
            warn!("Expected a list, found {}; using an empty list", other);
            Vec::new()
        }
    }
}

pub fn lenient_vec<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(vec_from_value(value))
}

pub fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value_to_string(&value))
}

pub fn opt_lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Null => None,
        other => Some(value_to_string(&other)),
    })
}

pub fn truthy<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(is_truthy(&value))
}

pub fn opt_truthy<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Null => None,
        other => Some(is_truthy(&other)),
    })
}

/// Numbers typed into a text box arrive as strings; unparsable input counts as zero.
pub fn lenient_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Number(number) => number.as_f64().unwrap_or(0.0),
        Value::String(text) => text.trim().parse().unwrap_or(0.0),
        Value::Bool(true) => 1.0,
        _ => 0.0,
    })
}

/// Writes whole numbers without a fractional part, so a weight read as `2` is written back
/// as `2` rather than `2.0`.
pub fn whole_number<S>(value: &f64, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    const MAX_EXACT: f64 = 9_007_199_254_740_992.0; // 2^53
    if value.fract() == 0.0 && value.abs() <= MAX_EXACT {
        serializer.serialize_i64(*value as i64)
    } else {
        serializer.serialize_f64(*value)
    }
}

#[must_use]
pub fn is_false(value: &bool) -> bool {
    !*value
}

/// Removes `null` members from every object, recursively. Absent and `null` fields are
/// treated alike by the importer.
pub fn strip_nulls(value: &mut Value) {
    match value {
        Value::Object(fields) => {
            fields.retain(|_, member| !member.is_null());
            fields.values_mut().for_each(strip_nulls);
        }
        Value::Array(items) => items.iter_mut().for_each(strip_nulls),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Deserialize, Debug, Default)]
    #[serde(default)]
    struct Sample {
        #[serde(deserialize_with = "lenient_vec")]
        names: Vec<String>,
        #[serde(deserialize_with = "lenient_string")]
        weight: String,
        #[serde(deserialize_with = "truthy")]
        flag: bool,
        #[serde(deserialize_with = "lenient_f64")]
        score: f64,
    }

    #[test]
    fn test_truthiness_matches_editor_checks() {
        assert!(!is_truthy(&json!(null)));
        assert!(!is_truthy(&json!("")));
        assert!(!is_truthy(&json!(0)));
        assert!(is_truthy(&json!([])));
        assert!(is_truthy(&json!({})));
        assert!(is_truthy(&json!("x")));
    }

    #[test]
    fn test_lenient_fields_accept_mismatched_types() {
        let sample: Sample = serde_json::from_value(json!({
            "names": ["a", 3, "b"],
            "weight": 20,
            "flag": "yes",
            "score": "2.5"
        }))
        .unwrap();

        assert_eq!(sample.names, vec!["a", "b"]);
        assert_eq!(sample.weight, "20");
        assert!(sample.flag);
        assert_eq!(sample.score, 2.5);
    }

    #[test]
    fn test_non_array_list_becomes_empty() {
        let sample: Sample = serde_json::from_value(json!({ "names": "oops" })).unwrap();
        assert!(sample.names.is_empty());
    }

    #[test]
    fn test_whole_number_drops_fraction() {
        #[derive(serde::Serialize)]
        struct Weighted {
            #[serde(serialize_with = "whole_number")]
            weight: f64,
        }
        let whole = serde_json::to_value(Weighted { weight: 3.0 }).unwrap();
        assert_eq!(whole, json!({ "weight": 3 }));
        let fractional = serde_json::to_value(Weighted { weight: 1.25 }).unwrap();
        assert_eq!(fractional, json!({ "weight": 1.25 }));
    }

    #[test]
    fn test_strip_nulls_recurses() {
        let mut value = json!({ "a": null, "b": [{ "c": null, "d": 1 }] });
        strip_nulls(&mut value);
        assert_eq!(value, json!({ "b": [{ "d": 1 }] }));
    }
}
