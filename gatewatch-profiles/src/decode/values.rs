//! Normalisation of vendor value strings.
//!
//! Devices report the same quantity in many spellings: `"507000000 Hz"`,
//! `"507.0 MHz"`, `"507"`; `"4.5 dBmV"`, `" 4.5"`; `"7 days 00h:23m:15s"`,
//! `"17d 3h 12m"`. Everything here is a pure function.

use regex::Regex;
use std::sync::LazyLock;
use std::time::Duration;

/// Below this a bare frequency number is taken to be MHz.
const BARE_MHZ_LIMIT: f64 = 100_000.0;

static NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[-+]?\d+(?:\.\d+)?").expect("Invalid regex"));

static DAYS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d+)\s*(?:day\(s\)|days?\b|d\b)").expect("Invalid regex")
});

/// `00h:23m:15s` or `02:03:04`
static CLOCK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d+)\s*h?\s*:\s*(\d+)\s*m?\s*:\s*(\d+)\s*s?").expect("Invalid regex")
});

static HOURS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d+)\s*h(?:ours?|rs?)?\b").expect("Invalid regex")
});

static MINUTES_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d+)\s*m(?:in(?:ute)?s?)?\b").expect("Invalid regex")
});

static SECONDS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d+)\s*s(?:ec(?:ond)?s?)?\b").expect("Invalid regex")
});

/// Collapses runs of whitespace and trims.
pub fn clean_text(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Extracts the first decimal number, ignoring units.
pub fn parse_number(raw: &str) -> Option<f64> {
    NUMBER_RE
        .find(raw)
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .filter(|n| n.is_finite())
}

/// Parses a channel id.
pub fn parse_channel_id(raw: &str) -> Option<u32> {
    raw.trim().parse().ok()
}

/// Parses a codeword counter, tolerating thousands separators.
pub fn parse_count(raw: &str) -> Option<u64> {
    let digits: String = raw.trim().chars().filter(|c| *c != ',').collect();
    digits.parse().ok()
}

/// Parses a frequency into Hz.
///
/// Explicit `Hz`/`kHz`/`MHz` units are honoured; a bare number is MHz when
/// small and Hz otherwise.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn parse_frequency_hz(raw: &str) -> Option<u64> {
    let value = parse_number(raw)?;
    if value < 0.0 {
        return None;
    }
    let lower = raw.to_ascii_lowercase();
    let hz = if lower.contains("mhz") {
        value * 1_000_000.0
    } else if lower.contains("khz") {
        value * 1_000.0
    } else if lower.contains("hz") || value >= BARE_MHZ_LIMIT {
        value
    } else {
        value * 1_000_000.0
    };
    Some(hz.round() as u64)
}

/// Parses an uptime string into a duration.
///
/// Accepts bare seconds, `7 days 00h:23m:15s`, `1 day(s) 02:03:04` and
/// `17d 3h 12m`.
pub fn parse_uptime(raw: &str) -> Option<Duration> {
    let text = raw.trim();
    if text.is_empty() {
        return None;
    }
    if let Ok(secs) = text.parse::<u64>() {
        return Some(Duration::from_secs(secs));
    }

    let capture = |re: &Regex, s: &str| -> Option<u64> {
        re.captures(s)
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().parse().ok())
    };

    let days = capture(&DAYS_RE, text);
    let (hours, minutes, seconds) = if let Some(c) = CLOCK_RE.captures(text) {
        let part = |i: usize| c.get(i).and_then(|m| m.as_str().parse::<u64>().ok());
        (part(1), part(2), part(3))
    } else {
        // Strip the day part so "17d" is not read as anything else.
        let rest = DAYS_RE.replace_all(text, "");
        (
            capture(&HOURS_RE, &rest),
            capture(&MINUTES_RE, &rest),
            capture(&SECONDS_RE, &rest),
        )
    };

    if days.is_none() && hours.is_none() && minutes.is_none() && seconds.is_none() {
        return None;
    }

    let total = days.unwrap_or(0) * 86_400
        + hours.unwrap_or(0) * 3_600
        + minutes.unwrap_or(0) * 60
        + seconds.unwrap_or(0);
    Some(Duration::from_secs(total))
}
