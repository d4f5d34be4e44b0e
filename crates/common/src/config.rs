//! Environment parsing helpers shared by the service `Config` loaders.
//!
//! Each service owns its `Config::from_vars`; these helpers keep the
//! bounded-integer and required-variable rules identical across them.

use std::collections::HashMap;
use std::time::Duration;

/// Fetch a required variable, treating an empty value as missing.
#[must_use]
pub fn required<'a>(vars: &'a HashMap<String, String>, name: &str) -> Option<&'a str> {
    vars.get(name).map(String::as_str).filter(|v| !v.trim().is_empty())
}

/// Parse an optional integer variable constrained to `min..=max`.
///
/// Returns `default` when the variable is unset.
///
/// # Errors
///
/// Returns a human-readable message naming the variable when the value is
/// not an integer or falls outside the range.
pub fn bounded_u64(
    vars: &HashMap<String, String>,
    name: &str,
    default: u64,
    min: u64,
    max: u64,
) -> Result<u64, String> {
    let Some(raw) = vars.get(name) else {
        return Ok(default);
    };
    let value: u64 = raw
        .trim()
        .parse()
        .map_err(|e| format!("{name} must be a valid integer, got '{raw}': {e}"))?;
    if value < min || value > max {
        return Err(format!(
            "{name} must be between {min} and {max}, got {value}"
        ));
    }
    Ok(value)
}

/// [`bounded_u64`] for millisecond timeouts.
///
/// # Errors
///
/// Same as [`bounded_u64`].
pub fn timeout_ms(
    vars: &HashMap<String, String>,
    name: &str,
    default_ms: u64,
    max_ms: u64,
) -> Result<Duration, String> {
    bounded_u64(vars, name, default_ms, 1, max_ms).map(Duration::from_millis)
}
