//! Duration engine: explicit durations from text, type and cargo based
//! estimates otherwise, and the end time that follows from either.
//!
//! # Invariants
//!
//! - An explicit duration is authoritative: the end time is derived from
//!   it, never the other way round.
//! - An estimated duration is re-derived from `end - start` after the end
//!   time is computed.
//! - Durations are at least [`MIN_DURATION_HOURS`] and `end > start`.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::calendar;
use crate::domain::{EventContext, EventType};
use crate::obs;

/// Six minutes.
pub const MIN_DURATION_HOURS: f64 = 0.1;

/// Round hours to two decimals.
pub fn round2(hours: f64) -> f64 {
    (hours * 100.0).round() / 100.0
}

pub fn hours_between(start: NaiveDateTime, end: NaiveDateTime) -> f64 {
    (end - start).num_seconds() as f64 / 3600.0
}

pub fn hours_to_delta(hours: f64) -> Duration {
    Duration::seconds((hours * 3600.0).round() as i64)
}

/// End time and duration for a span read from a source.
///
/// A positive span shorter than [`MIN_DURATION_HOURS`] is stretched to
/// it. Empty and inverted spans come back unchanged so the reconciler
/// can repair and report them.
pub fn floored_span(start: NaiveDateTime, end: NaiveDateTime) -> (NaiveDateTime, f64) {
    let hours = hours_between(start, end);
    if end > start && hours < MIN_DURATION_HOURS {
        return (start + hours_to_delta(MIN_DURATION_HOURS), MIN_DURATION_HOURS);
    }
    (end, round2(hours))
}

// ---------------------------------------------------------------------------
// Explicit durations
// ---------------------------------------------------------------------------

static FULL_STAMP: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(\d{1,2})\s+([a-z]{3,9})\.?\s+(\d{4})\s+(\d{1,2}):(\d{2})\b")
        .expect("valid full stamp regex")
});

/// `DD Mon YYYY HH:MM - <description> - [DD Mon YYYY] HH:MM`.
static DATED_RANGE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(\d{1,2})\s+([a-z]{3,9})\.?\s+(\d{4})\s+(\d{1,2}):(\d{2})\s*-.*?-\s*(?:(\d{1,2})\s+([a-z]{3,9})\.?\s+(\d{4})\s+)?(\d{1,2}):(\d{2})\b",
    )
    .expect("valid dated range regex")
});

static TIME_RANGE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(\d{1,2}):(\d{2})\s*(?:-|to|until|till)\s*(\d{1,2}):(\d{2})\b")
        .expect("valid time range regex")
});

static FOR_HOURS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:for|lasting)\s+(\d+(?:\.\d+)?)\s*hours?(?:\s+(?:and\s+)?(\d+)\s*minutes?)?\b")
        .expect("valid for-hours regex")
});

static FOR_MINUTES: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:for|lasting)\s+(\d+)\s*minutes?\b").expect("valid for-minutes regex")
});

static AFTER_HOURS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bafter\s+(\d+(?:\.\d+)?)\s*hours?\b").expect("valid after-hours regex")
});

static AFTER_MINUTES: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bafter\s+(\d+)\s*minutes?\b").expect("valid after-minutes regex")
});

fn stamp_at(caps: &regex::Captures<'_>) -> Option<NaiveDateTime> {
    let date = date_at(caps, 1)?;
    let time = calendar::time_of_day(caps[4].parse().ok()?, caps[5].parse().ok()?)?;
    Some(date.and_time(time))
}

/// Date from the day, month and year groups starting at `first`.
fn date_at(caps: &regex::Captures<'_>, first: usize) -> Option<NaiveDate> {
    let month = calendar::month_number(caps.get(first + 1)?.as_str())?;
    NaiveDate::from_ymd_opt(
        caps.get(first + 2)?.as_str().parse().ok()?,
        month,
        caps.get(first)?.as_str().parse().ok()?,
    )
}

/// Hours covered by a [`DATED_RANGE`] match. Without an end date the end
/// falls on the start date, or the next day when it is earlier.
fn dated_range_hours(caps: &regex::Captures<'_>) -> Option<f64> {
    let start = stamp_at(caps)?;
    let time = calendar::time_of_day(caps[9].parse().ok()?, caps[10].parse().ok()?)?;
    let end = match date_at(caps, 6) {
        Some(date) => date.and_time(time),
        None => {
            let same_day = start.date().and_time(time);
            if same_day < start {
                same_day + Duration::days(1)
            } else {
                same_day
            }
        }
    };
    positive(hours_between(start, end))
}

fn positive(hours: f64) -> Option<f64> {
    (hours.is_finite() && hours > 0.0).then_some(hours)
}

/// Duration stated in `text`, in hours.
///
/// Checked in order: two full timestamps, a full timestamp followed by
/// `- <description> - HH:MM`, an `HH:MM - HH:MM` range (in both ranges a
/// second time earlier than the first rolls over midnight),
/// `for N hours [M minutes]`, `for N minutes`, `after N hours`,
/// `after N minutes`.
pub fn explicit_duration(text: &str) -> Option<f64> {
    let stamps: Vec<NaiveDateTime> = FULL_STAMP
        .captures_iter(text)
        .filter_map(|caps| stamp_at(&caps))
        .collect();
    if let [first, second, ..] = stamps.as_slice() {
        if let Some(hours) = positive(hours_between(*first, *second)) {
            return Some(round2(hours));
        }
    }

    if let Some(hours) = DATED_RANGE.captures(text).and_then(|caps| dated_range_hours(&caps)) {
        return Some(round2(hours));
    }

    if let Some(caps) = TIME_RANGE.captures(text) {
        let parts: Option<Vec<u32>> = (1..=4).map(|i| caps[i].parse().ok()).collect();
        if let Some(p) = parts {
            if let (Some(a), Some(b)) = (
                calendar::time_of_day(p[0], p[1]),
                calendar::time_of_day(p[2], p[3]),
            ) {
                let mut secs = (b - a).num_seconds();
                if secs < 0 {
                    secs += 24 * 3600;
                }
                if let Some(hours) = positive(secs as f64 / 3600.0) {
                    return Some(round2(hours));
                }
            }
        }
    }

    if let Some(caps) = FOR_HOURS.captures(text) {
        let hours: f64 = caps[1].parse().ok()?;
        let minutes: f64 = caps
            .get(2)
            .and_then(|m| m.as_str().parse().ok())
            .unwrap_or(0.0);
        if let Some(h) = positive(hours + minutes / 60.0) {
            return Some(round2(h));
        }
    }

    let minutes = |re: &Regex| -> Option<f64> {
        let caps = re.captures(text)?;
        positive(caps[1].parse::<f64>().ok()? / 60.0).map(round2)
    };
    let hours = |re: &Regex| -> Option<f64> {
        let caps = re.captures(text)?;
        positive(caps[1].parse::<f64>().ok()?).map(round2)
    };

    minutes(&FOR_MINUTES)
        .or_else(|| hours(&AFTER_HOURS))
        .or_else(|| minutes(&AFTER_MINUTES))
}

// ---------------------------------------------------------------------------
// Estimates
// ---------------------------------------------------------------------------

/// Base durations per type and cargo coefficients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DurationPolicy {
    pub default_hours: f64,
    pub base_hours: BTreeMap<EventType, f64>,
    /// Keyed by a lowercase cargo term; matched as a substring of the
    /// captured cargo type, longest key first.
    pub cargo_coefficients: BTreeMap<String, f64>,
}

impl Default for DurationPolicy {
    fn default() -> Self {
        let base_hours = [
            (EventType::Anchored, 4.0),
            (EventType::Arrived, 0.5),
            (EventType::Berthed, 1.0),
            (EventType::Unberthed, 0.5),
            (EventType::CargoLoading, 24.0),
            (EventType::CargoDischarge, 18.0),
            (EventType::CompletedLoading, 0.5),
            (EventType::CompletedDischarge, 0.5),
            (EventType::Shifting, 1.5),
            (EventType::Departed, 0.5),
            (EventType::Survey, 1.0),
            (EventType::HosesConnected, 0.5),
            (EventType::HosesDisconnected, 0.5),
            (EventType::PilotBoarded, 0.5),
            (EventType::TugsMadeFast, 0.5),
            (EventType::NorTendered, 0.25),
        ]
        .into_iter()
        .collect();
        let cargo_coefficients = [
            ("coal", 1.2),
            ("iron ore", 1.3),
            ("grain", 1.1),
            ("oil", 0.8),
            ("container", 0.6),
            ("bulk", 1.2),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();
        Self {
            base_hours,
            default_hours: 2.0,
            cargo_coefficients,
        }
    }
}

impl DurationPolicy {
    pub fn coefficient(&self, cargo_type: &str) -> f64 {
        let cargo = cargo_type.to_lowercase();
        self.cargo_coefficients
            .iter()
            .filter(|(key, _)| cargo.contains(key.as_str()))
            .max_by_key(|(key, _)| key.len())
            .map(|(_, coefficient)| *coefficient)
            .unwrap_or(1.0)
    }

    /// Estimated hours for a type, scaled by the captured cargo.
    pub fn estimate(&self, event_type: EventType, context: &EventContext) -> f64 {
        let base = self
            .base_hours
            .get(&event_type)
            .copied()
            .unwrap_or(self.default_hours);
        let coefficient = context
            .cargo_type
            .as_deref()
            .map(|c| self.coefficient(c))
            .unwrap_or(1.0);
        base * coefficient
    }
}

// ---------------------------------------------------------------------------
// End time
// ---------------------------------------------------------------------------

/// Start, end and duration settled for one event.
#[derive(Debug, Clone, PartialEq)]
pub struct Timing {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub duration_hours: f64,
    pub explicit: bool,
    /// Set when the end had to be repaired to keep `end > start`.
    pub repair: Option<String>,
}

/// Settle the end time and duration of an event starting at `start`.
pub fn compute_timing(
    start: NaiveDateTime,
    raw_text: &str,
    event_type: EventType,
    context: &EventContext,
    policy: &DurationPolicy,
) -> Timing {
    let explicit = explicit_duration(raw_text);
    let mut hours = explicit.unwrap_or_else(|| policy.estimate(event_type, context));
    if !hours.is_finite() || hours <= 0.0 {
        hours = MIN_DURATION_HOURS;
    }
    hours = hours.max(MIN_DURATION_HOURS);

    let mut timing = Timing {
        start,
        end: start + hours_to_delta(hours),
        duration_hours: round2(hours),
        explicit: explicit.is_some(),
        repair: None,
    };
    if !timing.explicit {
        timing.duration_hours = round2(hours_between(timing.start, timing.end)).max(MIN_DURATION_HOURS);
    }
    ensure_ordered(&mut timing, event_type);
    timing
}

fn ensure_ordered(timing: &mut Timing, event_type: EventType) {
    if timing.end > timing.start {
        return;
    }
    let note = if timing.end < timing.start {
        std::mem::swap(&mut timing.start, &mut timing.end);
        "End time preceded start time; start and end swapped."
    } else {
        timing.end = timing.start + hours_to_delta(MIN_DURATION_HOURS);
        "End time equal to start time; end extended by 6 minutes."
    };
    if !timing.explicit {
        timing.duration_hours = round2(hours_between(timing.start, timing.end));
    }
    obs::emit_invariant_repaired(event_type, note);
    timing.repair = Some(note.to_string());
}
