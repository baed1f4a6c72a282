use std::time::Duration;

pub fn parse_csv_var(name: &str) -> Option<Vec<String>> {
    std::env::var(name).ok().map(|raw| parse_csv(&raw))
}

pub fn parse_csv(raw: &str) -> Vec<String> {
    raw.split(',')
        .filter_map(|part| {
            let trimmed = part.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        })
        .collect()
}

/// Parse a boolean value from a raw string, accepting common env-style forms.
///
/// Accepted truthy values (case-insensitive): `"1"`, `"true"`, `"yes"`, `"on"`.
/// Accepted falsy values: `"0"`, `"false"`, `"no"`, `"off"`.
pub fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

pub fn parse_bool_var(name: &str) -> Option<bool> {
    std::env::var(name).ok().and_then(|raw| parse_bool(&raw))
}

/// Durations are written the humantime way (`100ms`, `10s`). A bare integer
/// is read as milliseconds.
pub fn parse_duration(raw: &str) -> Option<Duration> {
    let trimmed = raw.trim();
    if let Ok(millis) = trimmed.parse::<u64>() {
        return Some(Duration::from_millis(millis));
    }
    humantime::parse_duration(trimmed).ok()
}

pub fn parse_duration_var(name: &str) -> Option<Duration> {
    std::env::var(name).ok().and_then(|raw| parse_duration(&raw))
}

pub fn parse_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|s| s.trim().parse().ok())
}

/// Non-blank environment variable.
pub fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .filter(|value| !value.trim().is_empty())
}
