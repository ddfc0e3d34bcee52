// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Idp Sync Authors

//! Numeric-prefix duration strings (`"30s"`, `"1h"`, `"6h"`), the same
//! convention the teacher's `engine::monitor::parse_duration` uses for
//! timer and interval configuration.

use std::time::Duration;

pub fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty duration string".to_string());
    }

    let (num_str, suffix) = s
        .char_indices()
        .find(|(_, c)| !c.is_ascii_digit())
        .map(|(i, _)| (&s[..i], &s[i..]))
        .unwrap_or((s, ""));

    let num: u64 = num_str.parse().map_err(|_| format!("invalid number in duration: {s}"))?;

    let multiplier = match suffix.trim() {
        "ms" | "millis" | "millisecond" | "milliseconds" => return Ok(Duration::from_millis(num)),
        "" | "s" | "sec" | "secs" | "second" | "seconds" => 1,
        "m" | "min" | "mins" | "minute" | "minutes" => 60,
        "h" | "hr" | "hrs" | "hour" | "hours" => 3600,
        "d" | "day" | "days" => 86400,
        other => return Err(format!("unknown duration suffix: {other}")),
    };

    Ok(Duration::from_secs(num * multiplier))
}

/// Same grammar, widened to a `chrono::Duration` for the cold-start
/// lookback (which is added to a `DateTime<Utc>`, not a `tokio` timer).
pub fn parse_chrono_duration(s: &str) -> Result<chrono::Duration, String> {
    let std = parse_duration(s)?;
    chrono::Duration::from_std(std).map_err(|e| e.to_string())
}

#[cfg(test)]
#[path = "duration_tests.rs"]
mod tests;
