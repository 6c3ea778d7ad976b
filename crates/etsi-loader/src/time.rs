//! ETSI Loader Time Parsing
//!
//! Converts time-column cells into UTC epoch seconds. The parser is picked
//! from the time measurement's unit: `unixutc` columns hold integer
//! seconds, a unit that looks like a date pattern (`yyyy-MM-dd HH:mm:ss`)
//! is used as the format, and anything else falls back to common layouts.
//!
//! @version 0.1.0
//! @author AutomataNexus Development Team

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use etsi_schema::UNIX_UTC;

/// Layouts tried when the unit carries no pattern.
const FALLBACK_FORMATS: [&str; 6] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%SZ",
    "%Y/%m/%d %H:%M:%S",
    "%d/%m/%Y %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

/// Time-column parser.
#[derive(Debug, Clone, PartialEq)]
pub enum TimeParser {
    /// Integer epoch seconds.
    UnixUtc,
    /// A chrono format translated from the unit pattern.
    Pattern(String),
    /// RFC 3339 and a fixed list of common layouts.
    Auto,
}

impl TimeParser {
    /// Choose the parser for a time measurement unit.
    pub fn for_unit(unit: &str) -> Self {
        let unit = unit.trim();
        if unit.eq_ignore_ascii_case(UNIX_UTC) {
            Self::UnixUtc
        } else if looks_like_pattern(unit) {
            Self::Pattern(translate_pattern(unit))
        } else {
            Self::Auto
        }
    }

    /// Parse a cell into epoch seconds.
    pub fn parse(&self, cell: &str) -> Result<i64, String> {
        let cell = cell.trim();
        if cell.is_empty() {
            return Err("empty time cell".to_string());
        }
        match self {
            Self::UnixUtc => parse_epoch(cell),
            Self::Pattern(format) => parse_with(cell, format)
                .ok_or_else(|| format!("'{}' does not match '{}'", cell, format)),
            Self::Auto => parse_auto(cell),
        }
    }
}

/// Parse `yyyy-MM-ddThh:mm:ssZ` style timestamps into epoch seconds.
pub fn parse_iso(cell: &str) -> Option<i64> {
    let cell = cell.trim();
    DateTime::parse_from_rfc3339(cell)
        .map(|dt| dt.timestamp())
        .ok()
        .or_else(|| parse_with(cell, "%Y-%m-%dT%H:%M:%SZ"))
        .or_else(|| parse_with(cell, "%Y-%m-%dT%H:%M:%S"))
}

fn parse_epoch(cell: &str) -> Result<i64, String> {
    if let Ok(seconds) = cell.parse::<i64>() {
        return Ok(seconds);
    }
    match cell.parse::<f64>() {
        Ok(seconds) if seconds.is_finite() => Ok(seconds.trunc() as i64),
        _ => Err(format!("'{}' is not an epoch timestamp", cell)),
    }
}

fn parse_auto(cell: &str) -> Result<i64, String> {
    if let Some(seconds) = parse_iso(cell) {
        return Ok(seconds);
    }
    for format in FALLBACK_FORMATS {
        if let Some(seconds) = parse_with(cell, format) {
            return Ok(seconds);
        }
    }
    parse_with(cell, "%Y-%m-%d")
        .or_else(|| cell.parse::<i64>().ok())
        .ok_or_else(|| format!("unrecognized timestamp '{}'", cell))
}

fn parse_with(cell: &str, format: &str) -> Option<i64> {
    if let Ok(dt) = NaiveDateTime::parse_from_str(cell, format) {
        return Some(dt.and_utc().timestamp());
    }
    NaiveDate::parse_from_str(cell, format)
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc().timestamp())
}

fn looks_like_pattern(unit: &str) -> bool {
    unit.contains("yy") && (unit.contains("MM") || unit.contains("dd"))
}

/// Translate a `yyyy-MM-dd HH:mm:ss` pattern into a chrono format string.
pub fn translate_pattern(pattern: &str) -> String {
    const TOKENS: [(&str, &str); 11] = [
        ("yyyy", "%Y"),
        ("yy", "%y"),
        ("MM", "%m"),
        ("dd", "%d"),
        ("HH", "%H"),
        ("hh", "%H"),
        ("mm", "%M"),
        ("ss", "%S"),
        ("SSS", "%3f"),
        ("'T'", "T"),
        ("%", "%%"),
    ];

    let mut out = String::with_capacity(pattern.len() + 8);
    let mut rest = pattern;
    'outer: while !rest.is_empty() {
        for (token, replacement) in TOKENS {
            if let Some(tail) = rest.strip_prefix(token) {
                out.push_str(replacement);
                rest = tail;
                continue 'outer;
            }
        }
        let mut chars = rest.chars();
        if let Some(c) = chars.next() {
            out.push(c);
        }
        rest = chars.as_str();
    }
    out
}

// =============================================================================
// Tests
// =============================================================================
