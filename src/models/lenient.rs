//! Lenient decoding for backend and geocoder payloads.
//!
//! Plan documents are produced by a language model and geocoders encode
//! coordinates as strings, so numbers show up as `12.5`, `"12.5"` or `null`,
//! text fields as `null` or numbers, and lists as `null`.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, de};
use serde_json::Value;

fn value_to_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

/// Accepts a number or numeric string; anything else becomes `0.0`.
pub fn f64_or_zero<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value_to_f64(&value).unwrap_or(0.0))
}

/// Accepts a number or numeric string; `null` and missing become `None`.
pub fn option_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value_to_f64(&value))
}

/// Requires a number or numeric string.
pub fn f64_required<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    value_to_f64(&value)
        .ok_or_else(|| de::Error::custom(format!("expected a number, found {value}")))
}

fn value_to_string(value: Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn value_to_u32(value: &Value) -> Option<u32> {
    let number = value_to_f64(value)?;
    (0.0..=f64::from(u32::MAX))
        .contains(&number)
        .then(|| number.round() as u32)
}

/// Text, number or bool rendered as text; `null` and anything else become empty.
pub fn string_or_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value_to_string(value).unwrap_or_default())
}

/// Like [`string_or_empty`], but `null` and blank text become `None`.
pub fn option_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value_to_string(value).filter(|s| !s.trim().is_empty()))
}

/// Count from a number or numeric string; anything else becomes `0`.
pub fn u32_or_zero<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value_to_u32(&value).unwrap_or(0))
}

/// Count from a number or numeric string; `null` and garbage become `None`.
pub fn option_u32<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value_to_u32(&value))
}

/// List of text items; `null` is empty and non-text items are dropped.
pub fn string_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Array(items) => items.into_iter().filter_map(value_to_string).collect(),
        Value::String(single) if !single.trim().is_empty() => vec![single],
        _ => Vec::new(),
    })
}

/// List of `T`; `null` is empty. Items themselves must still decode.
pub fn list_or_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    match value {
        Value::Null => Ok(Vec::new()),
        other => serde_json::from_value(other).map_err(de::Error::custom),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Deserialize)]
    struct Sample {
        #[serde(deserialize_with = "f64_required")]
        lat: f64,
        #[serde(default, deserialize_with = "f64_or_zero")]
        cost: f64,
        #[serde(default, deserialize_with = "option_f64")]
        importance: Option<f64>,
    }

    #[test]
    fn test_accepts_strings_and_numbers() {
        let sample: Sample =
            serde_json::from_str(r#"{"lat": "48.8582599", "cost": 120, "importance": 0.61}"#)
                .unwrap();
        assert_eq!(sample.lat, 48.858_259_9);
        assert_eq!(sample.cost, 120.0);
        assert_eq!(sample.importance, Some(0.61));
    }

    #[test]
    fn test_missing_and_garbage_values() {
        let sample: Sample = serde_json::from_str(r#"{"lat": 1, "cost": "about 50"}"#).unwrap();
        assert_eq!(sample.cost, 0.0);
        assert_eq!(sample.importance, None);

        let result: Result<Sample, _> = serde_json::from_str(r#"{"lat": "north"}"#);
        assert!(result.is_err());
    }

    #[derive(Deserialize)]
    struct Text {
        #[serde(default, deserialize_with = "string_or_empty")]
        name: String,
        #[serde(default, deserialize_with = "option_string")]
        time: Option<String>,
        #[serde(default, deserialize_with = "u32_or_zero")]
        day: u32,
        #[serde(default, deserialize_with = "option_u32")]
        travelers: Option<u32>,
        #[serde(default, deserialize_with = "string_list")]
        tips: Vec<String>,
        #[serde(default, deserialize_with = "list_or_empty")]
        costs: Vec<f64>,
    }

    #[test]
    fn test_text_and_counts_from_loose_payloads() {
        let text: Text = serde_json::from_str(
            r#"{"name": null, "time": 9, "day": "2", "travelers": "两人", "tips": ["带伞", 3, null, {"x": 1}], "costs": null}"#,
        )
        .unwrap();
        assert_eq!(text.name, "");
        assert_eq!(text.time.as_deref(), Some("9"));
        assert_eq!(text.day, 2);
        assert_eq!(text.travelers, None);
        assert_eq!(text.tips, vec!["带伞", "3"]);
        assert!(text.costs.is_empty());
    }

    #[test]
    fn test_single_tip_and_negative_count() {
        let text: Text =
            serde_json::from_str(r#"{"name": 12, "time": "  ", "day": -1, "tips": "早点出发"}"#).unwrap();
        assert_eq!(text.name, "12");
        assert_eq!(text.time, None);
        assert_eq!(text.day, 0);
        assert_eq!(text.tips, vec!["早点出发"]);
    }
}
