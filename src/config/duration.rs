//! Kubernetes-style duration strings (`30s`, `5m`, `1h30m`, `1d`).

use anyhow::{anyhow, Result};
use regex::Regex;
use std::time::Duration;

/// Parse a duration made of one or more `<number><unit>` segments
///
/// Units are `s`, `m`, `h` and `d` (case insensitive). The total must be positive.
///
/// # Errors
///
/// Returns an error for empty input, unknown units, trailing garbage or a zero total.
pub fn parse_kubernetes_duration(duration_str: &str) -> Result<Duration> {
    let trimmed = duration_str.trim();
    if trimmed.is_empty() {
        return Err(anyhow!("Duration string cannot be empty"));
    }

    let whole = Regex::new(r"^(\d+[smhd])+$").map_err(|e| anyhow!("Failed to compile regex: {e}"))?;
    let segment = Regex::new(r"(?P<number>\d+)(?P<unit>[smhd])")
        .map_err(|e| anyhow!("Failed to compile regex: {e}"))?;

    let lower = trimmed.to_lowercase();
    if !whole.is_match(&lower) {
        return Err(anyhow!(
            "Invalid duration format '{trimmed}'. Expected <number><unit> segments (e.g. '30s', '5m', '1h30m')"
        ));
    }

    let mut total_secs: u64 = 0;
    for captures in segment.captures_iter(&lower) {
        let number: u64 = captures["number"]
            .parse()
            .map_err(|e| anyhow!("Invalid duration number in '{trimmed}': {e}"))?;
        let multiplier = match &captures["unit"] {
            "s" => 1,
            "m" => 60,
            "h" => 3_600,
            "d" => 86_400,
            other => return Err(anyhow!("Unknown duration unit '{other}' in '{trimmed}'")),
        };
        total_secs = number
            .checked_mul(multiplier)
            .and_then(|secs| total_secs.checked_add(secs))
            .ok_or_else(|| anyhow!("Duration '{trimmed}' overflows"))?;
    }

    if total_secs == 0 {
        return Err(anyhow!("Duration must be greater than 0, got '{trimmed}'"));
    }
    Ok(Duration::from_secs(total_secs))
}
