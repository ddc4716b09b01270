//! Shared calendar vocabulary: the month table and the date/time
//! patterns every stage uses to read timestamps out of SoF text.
//!
//! An unrecognised month name is a match failure. Nothing here
//! substitutes a default month.

use chrono::{NaiveDate, NaiveTime};
use once_cell::sync::Lazy;
use regex::Regex;
use std::ops::Range;

/// The single month lookup table. Abbreviations and full names, lowercase.
pub static MONTHS: [(&str, u32); 24] = [
    ("jan", 1),
    ("january", 1),
    ("feb", 2),
    ("february", 2),
    ("mar", 3),
    ("march", 3),
    ("apr", 4),
    ("april", 4),
    ("may", 5),
    ("jun", 6),
    ("june", 6),
    ("jul", 7),
    ("july", 7),
    ("aug", 8),
    ("august", 8),
    ("sep", 9),
    ("sept", 9),
    ("september", 9),
    ("oct", 10),
    ("october", 10),
    ("nov", 11),
    ("november", 11),
    ("dec", 12),
    ("december", 12),
];

/// Resolve a month name or abbreviation to `1..=12`.
pub fn month_number(name: &str) -> Option<u32> {
    let key = name.trim().trim_end_matches('.').to_ascii_lowercase();
    MONTHS
        .iter()
        .find(|(label, _)| *label == key)
        .map(|(_, number)| *number)
}

/// Two-digit years are taken as 20xx.
pub fn expand_year(year: i32) -> i32 {
    if year < 100 {
        year + 2000
    } else {
        year
    }
}

/// Validated time of day. Out-of-range captures are discarded, never clamped.
pub fn time_of_day(hour: u32, minute: u32) -> Option<NaiveTime> {
    if hour > 23 || minute > 59 {
        return None;
    }
    NaiveTime::from_hms_opt(hour, minute, 0)
}

fn named_date(day: &str, month: &str, year: &str) -> Option<NaiveDate> {
    let month = month_number(month)?;
    let day: u32 = day.parse().ok()?;
    let year: i32 = year.parse().ok()?;
    NaiveDate::from_ymd_opt(expand_year(year), month, day)
}

fn numeric_ymd(year: &str, month: &str, day: &str) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year.parse().ok()?, month.parse().ok()?, day.parse().ok()?)
}

fn clock(hour: &str, minute: &str) -> Option<NaiveTime> {
    time_of_day(hour.parse().ok()?, minute.parse().ok()?)
}

// ---------------------------------------------------------------------------
// Dated event lines
// ---------------------------------------------------------------------------

static DATED_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(\d{1,2})\s+([a-z]{3,9})\.?,?\s+(\d{4})\s*,?\s+(\d{1,2}):(\d{2})\s*(?:hours|hrs|lt)?\s+-\s+(\S.*)",
    )
    .expect("valid dated line regex")
});

/// A `DD Mon YYYY HH:MM - description` stamp found on a line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatedStamp {
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub description: String,
    /// Byte span of the whole stamp within the line.
    pub span: Range<usize>,
}

/// Find the dated event stamp on a line, if any.
///
/// Stamps with an unknown month or an invalid clock time are rejected.
pub fn find_dated_stamp(line: &str) -> Option<DatedStamp> {
    for caps in DATED_LINE.captures_iter(line) {
        let whole = caps.get(0)?;
        let Some(date) = named_date(&caps[1], &caps[2], &caps[3]) else {
            continue;
        };
        let Some(time) = clock(&caps[4], &caps[5]) else {
            continue;
        };
        return Some(DatedStamp {
            date,
            time,
            description: caps[6].trim().to_string(),
            span: whole.range(),
        });
    }
    None
}

// ---------------------------------------------------------------------------
// Free-standing dates and times
// ---------------------------------------------------------------------------

static ISO_DATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(\d{4})[-/](\d{1,2})[-/](\d{1,2})\b").expect("valid iso date regex")
});

static DAY_MONTH_YEAR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(\d{1,2})(?:st|nd|rd|th)?\s+(?:of\s+)?([a-z]{3,9})\.?,?\s+(\d{4}|\d{2})\b")
        .expect("valid day month year regex")
});

static MONTH_DAY_YEAR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b([a-z]{3,9})\.?\s+(\d{1,2})(?:st|nd|rd|th)?,?\s+(\d{4})\b")
        .expect("valid month day year regex")
});

static NUMERIC_DATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(\d{1,2})/(\d{1,2})/(\d{4}|\d{2})\b").expect("valid numeric date regex")
});

static CLOCK_TIME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(\d{1,2}):(\d{2})\b").expect("valid clock time regex"));

static MILITARY_TIME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(\d{2})(\d{2})\s*(?:hours|hrs|hr|lt)\b").expect("valid military time regex")
});

static DOTTED_TIME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(\d{1,2})\.(\d{2})\s*(?:hours|hrs|hr|lt)\b").expect("valid dotted time regex")
});

/// First calendar date mentioned on a line.
///
/// Numeric dates are read day-first (`DD/MM/YYYY`); when the second
/// field cannot be a month they are read month-first instead.
pub fn find_date(line: &str) -> Option<NaiveDate> {
    for caps in ISO_DATE.captures_iter(line) {
        if let Some(date) = numeric_ymd(&caps[1], &caps[2], &caps[3]) {
            return Some(date);
        }
    }

    for caps in DAY_MONTH_YEAR.captures_iter(line) {
        if let Some(date) = named_date(&caps[1], &caps[2], &caps[3]) {
            return Some(date);
        }
    }

    for caps in MONTH_DAY_YEAR.captures_iter(line) {
        if let Some(date) = named_date(&caps[2], &caps[1], &caps[3]) {
            return Some(date);
        }
    }

    for caps in NUMERIC_DATE.captures_iter(line) {
        let (Ok(first), Ok(second), Ok(year)) = (
            caps[1].parse::<u32>(),
            caps[2].parse::<u32>(),
            caps[3].parse::<i32>(),
        ) else {
            continue;
        };
        let year = expand_year(year);
        let (day, month) = if second > 12 && first <= 12 {
            (second, first)
        } else {
            (first, second)
        };
        if let Some(date) = NaiveDate::from_ymd_opt(year, month, day) {
            return Some(date);
        }
    }

    None
}

/// First valid time of day mentioned on a line.
///
/// In a range such as `08:30 - 11:00` the first time wins.
pub fn find_time(line: &str) -> Option<NaiveTime> {
    for re in [&*CLOCK_TIME, &*MILITARY_TIME, &*DOTTED_TIME] {
        for caps in re.captures_iter(line) {
            if let Some(time) = clock(&caps[1], &caps[2]) {
                return Some(time);
            }
        }
    }
    None
}

/// Document-wide reference date: the first date in the leading lines.
pub fn base_date<S: AsRef<str>>(lines: &[S], scan_lines: usize) -> Option<NaiveDate> {
    lines
        .iter()
        .take(scan_lines)
        .find_map(|line| find_date(line.as_ref()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid fixture date")
    }

    fn time(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).expect("valid fixture time")
    }

    #[test]
    fn month_table_accepts_short_and_full_names() {
        assert_eq!(month_number("Jan"), Some(1));
        assert_eq!(month_number("SEPTEMBER"), Some(9));
        assert_eq!(month_number("Sept."), Some(9));
        assert_eq!(month_number("dec"), Some(12));
    }

    #[test]
    fn unknown_month_is_rejected_not_defaulted() {
        assert_eq!(month_number("Foo"), None);
        assert_eq!(find_dated_stamp("10 Foo 2024 08:30 - Vessel arrived"), None);
        assert_eq!(find_date("10 Foo 2024"), None);
    }

    #[test]
    fn time_of_day_discards_out_of_range() {
        assert_eq!(time_of_day(23, 59), Some(time(23, 59)));
        assert_eq!(time_of_day(24, 0), None);
        assert_eq!(time_of_day(12, 60), None);
    }

    #[test]
    fn dated_stamp_captures_description() {
        let stamp = find_dated_stamp("10 Jan 2024 08:30 - Vessel arrived at port limits")
            .expect("stamp found");
        assert_eq!(stamp.date, date(2024, 1, 10));
        assert_eq!(stamp.time, time(8, 30));
        assert_eq!(stamp.description, "Vessel arrived at port limits");
        assert_eq!(stamp.span.start, 0);
    }

    #[test]
    fn dated_stamp_rejects_invalid_clock() {
        assert_eq!(find_dated_stamp("10 Jan 2024 25:30 - Vessel arrived"), None);
    }

    #[test]
    fn find_date_reads_each_supported_shape() {
        assert_eq!(find_date("Date: 2024-01-10"), Some(date(2024, 1, 10)));
        assert_eq!(find_date("On 5th June 2024 the vessel"), Some(date(2024, 6, 5)));
        assert_eq!(find_date("dated Jan 12, 2024"), Some(date(2024, 1, 12)));
        assert_eq!(find_date("12 Mar 24"), Some(date(2024, 3, 12)));
        assert_eq!(find_date("05/03/2024"), Some(date(2024, 3, 5)));
        assert_eq!(find_date("03/25/2024"), Some(date(2024, 3, 25)));
        assert_eq!(find_date("no dates here"), None);
    }

    #[test]
    fn find_date_skips_words_that_are_not_months() {
        assert_eq!(find_date("anchored for 2 hours 30 minutes"), None);
    }

    #[test]
    fn find_time_prefers_first_in_range() {
        assert_eq!(find_time("08:30 - 11:00 loading"), Some(time(8, 30)));
        assert_eq!(find_time("commenced 1430 hrs"), Some(time(14, 30)));
        assert_eq!(find_time("at 07.15 hours"), Some(time(7, 15)));
        assert_eq!(find_time("at 27:15 and 09:05"), Some(time(9, 5)));
        assert_eq!(find_time("quantity 2.50 MT"), None);
    }

    #[test]
    fn base_date_scans_only_leading_lines() {
        let mut lines = vec!["STATEMENT OF FACTS".to_string(); 25];
        lines[22] = "Date: 10 Jan 2024".to_string();
        assert_eq!(base_date(&lines, 20), None);
        lines[3] = "Date: 11 Jan 2024".to_string();
        assert_eq!(base_date(&lines, 20), Some(date(2024, 1, 11)));
    }
}
