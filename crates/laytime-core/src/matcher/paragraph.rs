//! Paragraph-style clauses: `On 5th June 2024 at 08:30, ...`,
//! `At 09:15, the pilot boarded and at 10:00 tugs made fast.`,
//! `Loading commenced at 13:00.`
//!
//! Each `at|by HH:MM` anchor takes its description either from the
//! clause ending in an event verb just before it, or from the text after
//! it up to the next anchor or sentence end. Between two anchors, an
//! event clause led by `and`/`then` belongs to the later anchor:
//! `arrived at 08:00 and dropped anchor at 09:10` yields two events.
//!
//! The date comes from an `On <date>` clause in the same sentence, else
//! is carried over from an earlier sentence, a recent line, or the
//! document base date.

use chrono::{NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;
use std::ops::Range;

use super::rules::{overlaps_any, RuleTable};
use crate::calendar;
use crate::domain::EventType;

/// How far back (in lines) a date may be carried.
pub const CARRY_BACK_LINES: usize = 5;

static SENTENCE_BREAK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[.;!?](?:\s+|$)").expect("valid sentence break regex"));

static TIME_ANCHOR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:at|by)\s+(?:about\s+|around\s+)?(\d{1,2}):(\d{2})(?:\s*(?:hours|lt)\b)?")
        .expect("valid time anchor regex")
});

static DATE_CLAUSE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\bon\s+(?:(\d{1,2})(?:st|nd|rd|th)?\s+(?:of\s+)?([a-z]{3,9})\.?,?\s+(\d{4})|([a-z]{3,9})\.?\s+(\d{1,2})(?:st|nd|rd|th)?,?\s+(\d{4}))",
    )
    .expect("valid date clause regex")
});

static TRAILING_VERB: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?:commenced|started|began|resumed|completed|finished|boarded|embarked|made\s+fast|secured|tendered|accepted|connected|disconnected|arrived|berthed|anchored|unberthed|departed|sailed|shifted|moored|cast\s+off|(?:dropped|let\s+go)\s+anchor)\s*$",
    )
    .expect("valid trailing verb regex")
});

static CONJUNCTION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:,\s*|\s+)(?:and|then|while|whereupon)\s+").expect("valid conjunction regex")
});

static LEADING_FILLER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?:and\s+|then\s+|also\s+)+").expect("valid leading filler regex")
});

static TRAILING_FILLER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(?:\s+(?:and|then))+$").expect("valid trailing filler regex"));

/// A classified paragraph clause.
#[derive(Debug, Clone, PartialEq)]
pub struct ClauseMatch {
    pub event_type: EventType,
    /// Byte span of the clause within the line.
    pub span: Range<usize>,
    pub description: String,
    pub stamp: NaiveDateTime,
    /// `true` when the date sits in the same sentence as the time.
    pub dated_in_sentence: bool,
}

struct DateClause {
    span: Range<usize>,
    date: NaiveDate,
}

fn date_clauses(line: &str) -> Vec<DateClause> {
    DATE_CLAUSE
        .captures_iter(line)
        .filter_map(|caps| {
            let span = caps.get(0)?.range();
            let date = match (caps.get(1), caps.get(2), caps.get(3)) {
                (Some(d), Some(m), Some(y)) => named(d.as_str(), m.as_str(), y.as_str()),
                _ => named(caps.get(5)?.as_str(), caps.get(4)?.as_str(), caps.get(6)?.as_str()),
            }?;
            Some(DateClause { span, date })
        })
        .collect()
}

fn named(day: &str, month: &str, year: &str) -> Option<NaiveDate> {
    let month = calendar::month_number(month)?;
    NaiveDate::from_ymd_opt(year.parse().ok()?, month, day.parse().ok()?)
}

fn sentences(line: &str) -> Vec<Range<usize>> {
    let mut out = Vec::new();
    let mut start = 0;
    for m in SENTENCE_BREAK.find_iter(line) {
        out.push(start..m.start());
        start = m.end();
    }
    if start < line.len() {
        out.push(start..line.len());
    }
    out
}

/// Date carried into `line_index` from the lines just above it.
pub fn carried_date<S: AsRef<str>>(lines: &[S], line_index: usize) -> Option<NaiveDate> {
    let from = line_index.saturating_sub(CARRY_BACK_LINES);
    (from..line_index).rev().find_map(|i| {
        let line = lines[i].as_ref();
        date_clauses(line)
            .last()
            .map(|c| c.date)
            .or_else(|| calendar::find_date(line))
    })
}

fn tidy(text: &str) -> String {
    let mut out = text.trim_matches(|c: char| c.is_whitespace() || ",;:-".contains(c));
    if let Some(m) = LEADING_FILLER.find(out) {
        out = &out[m.end()..];
    }
    let out = TRAILING_FILLER.replace(out, "");
    out.trim_matches(|c: char| c.is_whitespace() || ",;:-".contains(c))
        .to_string()
}

/// Start of the event clause after the last conjunction in `range`, if
/// that clause names an event.
fn conjoined_clause(rules: &RuleTable, line: &str, range: Range<usize>) -> Option<usize> {
    let segment = &line[range.clone()];
    let m = CONJUNCTION.find_iter(segment).last()?;
    let tail = &segment[m.end()..];
    rules.classify(tail)?;
    Some(range.start + m.end())
}

/// Scan one line for paragraph clauses outside `claimed`.
///
/// `carried` is the date to use when the line itself has no earlier
/// `On <date>` clause. Clauses without any date source are skipped.
pub fn scan_line(
    rules: &RuleTable,
    line: &str,
    claimed: &[Range<usize>],
    carried: Option<NaiveDate>,
) -> Vec<ClauseMatch> {
    let sentences = sentences(line);
    let dates = date_clauses(line);
    let anchors: Vec<(Range<usize>, chrono::NaiveTime)> = TIME_ANCHOR
        .captures_iter(line)
        .filter_map(|caps| {
            let span = caps.get(0)?.range();
            let time = calendar::time_of_day(caps[1].parse().ok()?, caps[2].parse().ok()?)?;
            (!overlaps_any(&span, claimed)).then_some((span, time))
        })
        .collect();

    let mut out = Vec::new();
    for (k, (anchor, time)) in anchors.iter().enumerate() {
        let Some(sentence) = sentences.iter().find(|s| s.contains(&anchor.start)) else {
            continue;
        };

        let prev_bound = k
            .checked_sub(1)
            .map(|j| anchors[j].0.end)
            .filter(|end| *end > sentence.start)
            .unwrap_or(sentence.start)
            .min(anchor.start);
        let next_bound = anchors
            .get(k + 1)
            .map(|(a, _)| a.start)
            .filter(|start| *start < sentence.end)
            .unwrap_or(sentence.end)
            .max(anchor.end);

        let in_sentence_date = dates
            .iter()
            .filter(|d| d.span.start >= sentence.start && d.span.end <= anchor.start)
            .last();

        let backward = &line[prev_bound..anchor.start];
        let backward_clean = match in_sentence_date {
            Some(d) if d.span.start >= prev_bound => {
                format!("{}{}", &line[prev_bound..d.span.start], &line[d.span.end..anchor.start])
            }
            _ => backward.to_string(),
        };

        let conjoined = conjoined_clause(rules, line, prev_bound..anchor.start);
        let (description, span) = if let Some(from) = conjoined {
            (tidy(&line[from..anchor.start]), from..anchor.end)
        } else if TRAILING_VERB.is_match(backward_clean.trim_end()) {
            (tidy(&backward_clean), prev_bound..anchor.end)
        } else {
            // A conjoined clause just before the next anchor is left to it.
            let forward_end = if next_bound < sentence.end {
                conjoined_clause(rules, line, anchor.end..next_bound)
                    .and_then(|from| {
                        CONJUNCTION
                            .find_iter(&line[anchor.end..from])
                            .last()
                            .map(|m| anchor.end + m.start())
                    })
                    .unwrap_or(next_bound)
            } else {
                next_bound
            };
            (tidy(&line[anchor.end..forward_end]), anchor.start..forward_end)
        };
        if description.is_empty() || overlaps_any(&span, claimed) {
            continue;
        }
        let Some(event_type) = rules.classify(&description) else {
            continue;
        };

        let (date, dated_in_sentence) = match in_sentence_date {
            Some(d) => (Some(d.date), true),
            None => (
                dates
                    .iter()
                    .filter(|d| d.span.end <= anchor.start)
                    .last()
                    .map(|d| d.date)
                    .or(carried),
                false,
            ),
        };
        let Some(date) = date else {
            continue;
        };

        out.push(ClauseMatch {
            event_type,
            span,
            description,
            stamp: date.and_time(*time),
            dated_in_sentence,
        });
    }
    out
}
