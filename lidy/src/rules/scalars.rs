use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Utc};
use fancy_regex::Regex;
use lazy_static::lazy_static;

lazy_static! {
    static ref BASE64: Regex = Regex::new(r"^[a-zA-Z0-9_\-+/ \n]*[= \n]*$").ok().unwrap();
}

/// YAML 1.1 boolean words, matched without regard to case.
pub(crate) fn bool_token(text: &str) -> Option<bool> {
    match text.to_ascii_lowercase().as_str() {
        "y" | "yes" | "true" | "on" => Some(true),
        "n" | "no" | "false" | "off" => Some(false),
        _ => None,
    }
}

pub(crate) fn is_base64(text: &str) -> bool {
    BASE64.is_match(text).unwrap_or(false)
}

///
/// Parses an ISO 8601 timestamp. Full RFC 3339 date-times keep their offset,
/// date-times without an offset and plain dates are taken as UTC.
///
pub(crate) fn parse_timestamp(text: &str) -> Option<DateTime<FixedOffset>> {
    let text = text.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
        return Some(parsed);
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Some(Utc.from_utc_datetime(&naive).fixed_offset());
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive).fixed_offset())
}

#[cfg(test)]
#[path = "scalars_tests.rs"]
mod scalars_tests;
