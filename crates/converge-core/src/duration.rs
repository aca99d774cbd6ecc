//! Duration strings in the remote service's canonical form.
//!
//! Inputs look like `5 s`, `5s`, `5 seconds` or `5000 ms`. All of them render
//! back as `5 s`: the largest unit that divides the value exactly, separated
//! from the magnitude by one space.

use std::sync::LazyLock;

use regex::Regex;

static DURATION_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(\d+)\s*([A-Za-z]+)\s*$").unwrap());

const MILLIS_PER_SECOND: u64 = 1_000;
const MILLIS_PER_MINUTE: u64 = 60 * MILLIS_PER_SECOND;
const MILLIS_PER_HOUR: u64 = 60 * MILLIS_PER_MINUTE;
const MILLIS_PER_DAY: u64 = 24 * MILLIS_PER_HOUR;
const MILLIS_PER_WEEK: u64 = 7 * MILLIS_PER_DAY;

/// Render units, largest first.
const RENDER_UNITS: &[(u64, &str)] = &[
    (MILLIS_PER_WEEK, "w"),
    (MILLIS_PER_DAY, "d"),
    (MILLIS_PER_HOUR, "h"),
    (MILLIS_PER_MINUTE, "m"),
    (MILLIS_PER_SECOND, "s"),
    (1, "ms"),
];

fn unit_millis(unit: &str) -> Option<u64> {
    let millis = match unit.to_ascii_lowercase().as_str() {
        "ms" | "msec" | "msecs" | "millisecond" | "milliseconds" => 1,
        "s" | "sec" | "secs" | "second" | "seconds" => MILLIS_PER_SECOND,
        "m" | "min" | "mins" | "minute" | "minutes" => MILLIS_PER_MINUTE,
        "h" | "hr" | "hrs" | "hour" | "hours" => MILLIS_PER_HOUR,
        "d" | "day" | "days" => MILLIS_PER_DAY,
        "w" | "week" | "weeks" => MILLIS_PER_WEEK,
        _ => return None,
    };
    Some(millis)
}

/// Parse a duration string into milliseconds.
pub fn parse(input: &str) -> Result<u64, String> {
    let captures = DURATION_PATTERN
        .captures(input)
        .ok_or_else(|| format!("'{input}' is not a duration (expected e.g. \"5 s\")"))?;

    let magnitude: u64 = captures[1]
        .parse()
        .map_err(|_| format!("'{}' is out of range", &captures[1]))?;
    let unit = &captures[2];
    let per_unit = unit_millis(unit).ok_or_else(|| format!("unknown duration unit '{unit}'"))?;

    magnitude
        .checked_mul(per_unit)
        .ok_or_else(|| format!("'{input}' is out of range"))
}

/// Render milliseconds in canonical form.
pub fn render(millis: u64) -> String {
    if millis == 0 {
        return "0 s".to_string();
    }
    let (per_unit, unit) = RENDER_UNITS
        .iter()
        .find(|(per_unit, _)| millis % per_unit == 0)
        .copied()
        .unwrap_or((1, "ms"));
    format!("{} {unit}", millis / per_unit)
}

/// Parse and re-render a duration string.
pub fn normalize(input: &str) -> Result<String, String> {
    parse(input).map(render)
}
