// src/config/duration.rs

//! Duration strings as they appear in task files and the config file.
//!
//! The accepted grammar is a sequence of `<number><unit>` pairs, e.g.
//! `"30m"`, `"1h30m"`, `"1.5s"`, `"250ms"`. Units: `ns`, `us` (or `µs`),
//! `ms`, `s`, `m`, `h`. A bare `"0"` is also accepted.

use std::time::Duration;

/// Parse a duration string such as `"1h30m"` or `"250ms"`.
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty duration string".to_string());
    }
    if s == "0" {
        return Ok(Duration::ZERO);
    }

    let mut rest = s;
    let mut total_nanos = 0f64;

    while !rest.is_empty() {
        let num_end = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .ok_or_else(|| format!("duration '{s}' is missing a unit suffix"))?;
        if num_end == 0 {
            return Err(format!("invalid duration '{s}': expected a number"));
        }

        let (num_part, tail) = rest.split_at(num_end);
        let value: f64 = num_part
            .parse()
            .map_err(|e| format!("invalid duration number '{num_part}': {e}"))?;

        let unit_end = tail
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(tail.len());
        let (unit, next) = tail.split_at(unit_end);

        let nanos_per_unit = match unit {
            "ns" => 1.0,
            "us" | "µs" => 1e3,
            "ms" => 1e6,
            "s" => 1e9,
            "m" => 60e9,
            "h" => 3600e9,
            other => {
                return Err(format!(
                    "unsupported duration unit '{other}' in '{s}'; expected ns, us, ms, s, m, or h"
                ));
            }
        };

        total_nanos += value * nanos_per_unit;
        rest = next;
    }

    Ok(Duration::from_nanos(total_nanos.round() as u64))
}

/// Render a duration compactly: `"250ms"`, `"1.503s"`, `"2m5s"`, `"1h0m3s"`.
pub fn format_duration(d: Duration) -> String {
    let millis = d.as_millis();
    if millis < 1000 {
        return format!("{millis}ms");
    }

    let total_secs = d.as_secs();
    if total_secs < 60 {
        return format!("{:.3}s", d.as_secs_f64());
    }

    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;
    if hours > 0 {
        format!("{hours}h{minutes}m{seconds}s")
    } else {
        format!("{minutes}m{seconds}s")
    }
}
