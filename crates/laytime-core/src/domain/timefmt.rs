//! Timestamp wire format for events.
//!
//! Events serialize timestamps as `YYYY-MM-DD HH:MM:SS` (no zone).
//! Deserialization is lenient so collaborator output and structured SoF
//! blocks such as `2025-6-7 8:0:0` are accepted.
//!
//! Instants outside four-digit years are written as `null`. That covers
//! [`UNPARSABLE_START`] and end times estimated from it; a `null` start
//! reads back as the sentinel.

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serializer};

use super::event::UNPARSABLE_START;

/// Output format for event timestamps.
pub const FORMAT: &str = "%Y-%m-%d %H:%M:%S";

static LENIENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(\d{4})[-/](\d{1,2})[-/](\d{1,2})(?:[ T]+(\d{1,2}):(\d{1,2})(?::(\d{1,2})(?:\.\d+)?)?)?\s*$")
        .expect("valid lenient timestamp regex")
});

/// Parse a timestamp in any of the accepted shapes.
///
/// Missing time parts default to zero. Out-of-range components yield `None`.
pub fn parse_lenient(raw: &str) -> Option<NaiveDateTime> {
    let caps = LENIENT.captures(raw)?;
    let num = |i: usize| -> Option<u32> {
        match caps.get(i) {
            Some(m) => m.as_str().parse().ok(),
            None => Some(0),
        }
    };
    let year: i32 = caps.get(1)?.as_str().parse().ok()?;
    let date = NaiveDate::from_ymd_opt(year, num(2)?, num(3)?)?;
    date.and_hms_opt(num(4)?, num(5)?, num(6)?)
}

/// Wire text for `value`, or `None` when it has no four-digit year.
pub fn to_wire(value: &NaiveDateTime) -> Option<String> {
    (0..=9999)
        .contains(&value.year())
        .then(|| value.format(FORMAT).to_string())
}

fn serialize_wire<S: Serializer>(value: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error> {
    match to_wire(value) {
        Some(text) => serializer.serialize_str(&text),
        None => serializer.serialize_none(),
    }
}

fn read_wire<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<NaiveDateTime>, D::Error> {
    let raw = Option::<String>::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => parse_lenient(s)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("unparsable timestamp: {s}"))),
    }
}

pub fn serialize<S: Serializer>(value: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error> {
    serialize_wire(value, serializer)
}

/// `null` and empty strings read as [`UNPARSABLE_START`].
pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDateTime, D::Error> {
    Ok(read_wire(deserializer)?.unwrap_or(UNPARSABLE_START))
}

/// Same format for optional timestamps; empty strings read as `None`.
pub mod option {
    use super::*;

    pub fn serialize<S: Serializer>(
        value: &Option<NaiveDateTime>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(ts) => serialize_wire(ts, serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<NaiveDateTime>, D::Error> {
        read_wire(deserializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, FORMAT).expect("fixture timestamp")
    }

    #[test]
    fn parses_canonical_and_iso_forms() {
        assert_eq!(
            parse_lenient("2024-01-10 08:30:00"),
            Some(ts("2024-01-10 08:30:00"))
        );
        assert_eq!(
            parse_lenient("2024-01-10T08:30:00"),
            Some(ts("2024-01-10 08:30:00"))
        );
        assert_eq!(parse_lenient("2024-01-10 08:30"), Some(ts("2024-01-10 08:30:00")));
    }

    #[test]
    fn parses_unpadded_components() {
        assert_eq!(parse_lenient("2025-6-7 8:0:0"), Some(ts("2025-06-07 08:00:00")));
    }

    #[test]
    fn date_only_is_midnight() {
        assert_eq!(parse_lenient("2024-03-01"), Some(ts("2024-03-01 00:00:00")));
    }

    #[test]
    fn sentinel_has_no_wire_text() {
        assert_eq!(to_wire(&UNPARSABLE_START), None);
        assert_eq!(
            to_wire(&ts("2024-01-10 08:30:00")).as_deref(),
            Some("2024-01-10 08:30:00")
        );
    }

    #[test]
    fn rejects_out_of_range_and_garbage() {
        assert_eq!(parse_lenient("2024-13-01 10:00"), None);
        assert_eq!(parse_lenient("2024-01-10 25:00"), None);
        assert_eq!(parse_lenient("yesterday"), None);
    }
}
