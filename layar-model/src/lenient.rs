//! Readers for columns that arrive as strings in one dataset and as numbers
//! in another. The bundled JSON is a pandas dump of a CSV export, so `tahun`
//! can be `"2025"`, `2025` or `2025.0`, and numeric columns can carry the
//! literal `"nan"`.
//!
//! Records keep the stored [`Value`] untouched; these helpers only derive a
//! typed view from it.

use serde::{Deserialize, Deserializer};
use serde_json::{Number, Value};

/// A year as text. Integral floats are printed without a fractional part so
/// `2025.0` and `2025` both read as `"2025"`. Blank strings read as absent.
pub fn year_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(raw) if raw.trim().is_empty() => None,
        Value::String(raw) => Some(raw.clone()),
        Value::Number(number) => Some(integral_or_plain(number)),
        other => Some(other.to_string()),
    }
}

/// A finite number from a number or a numeric string. Anything else,
/// including `"nan"` and `"N/A"`, reads as absent.
pub fn finite_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        Value::String(raw) => raw.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|v| v.is_finite())
}

/// `deserialize_with` helper that keeps an explicit `null` as `Some(Null)`,
/// so a present-but-null key survives a round trip. Pair it with
/// `#[serde(default)]` for absent keys.
pub fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

fn integral_or_plain(number: &Number) -> String {
    if let Some(int) = number.as_i64() {
        return int.to_string();
    }
    match number.as_f64() {
        Some(v) if v.is_finite() && v.fract() == 0.0 => format!("{}", v as i64),
        _ => number.to_string(),
    }
}
