//! Temporal resolution: an absolute start time for every candidate.
//!
//! Resolution order, first success wins:
//!
//! 1. date and time captured inline by the matcher,
//! 2. a dated stamp re-scanned from the candidate's own line,
//! 3. a date from the context window (nearest line first) and a time
//!    from the current line or its immediate neighbours,
//! 4. a time alone, dated with the base date or else the clock's day,
//! 5. a placeholder hour from [`PlaceholderPolicy`].
//!
//! The wall clock is only reached through [`Clock`], so tests inject a
//! [`FixedClock`].

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::calendar;
use crate::context::window;
use crate::domain::EventType;
use crate::matcher::Candidate;
use crate::metrics::METRICS;

/// Source of "now" for document-relative fallbacks.
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;

    fn today(&self) -> NaiveDate {
        self.now().date()
    }
}

/// Wall clock in UTC.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Utc::now().naive_utc()
    }
}

/// A clock frozen at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedClock(pub NaiveDateTime);

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}

/// Hour-of-day table for events with no recoverable time.
///
/// The hour for a candidate on line `n` is
/// `(hours[type] + (n % line_cycle) * stride_hours) % 24`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaceholderPolicy {
    pub default_hour: u32,
    pub line_cycle: usize,
    pub stride_hours: u32,
    pub hours: BTreeMap<EventType, u32>,
}

impl Default for PlaceholderPolicy {
    fn default() -> Self {
        let hours = [
            (EventType::Anchored, 6),
            (EventType::Arrived, 8),
            (EventType::Berthed, 10),
            (EventType::CargoLoading, 12),
            (EventType::CargoDischarge, 14),
            (EventType::Shifting, 16),
            (EventType::Unberthed, 18),
            (EventType::Departed, 20),
        ]
        .into_iter()
        .collect();
        Self {
            hours,
            default_hour: 12,
            line_cycle: 4,
            stride_hours: 2,
        }
    }
}

impl PlaceholderPolicy {
    pub fn hour_for(&self, event_type: EventType, line_index: usize) -> u32 {
        let base = self
            .hours
            .get(&event_type)
            .copied()
            .unwrap_or(self.default_hour);
        // Reduced mod 24 first so hostile configs cannot overflow.
        let step = (line_index % self.line_cycle.max(1)) as u64 % 24;
        let hour = (u64::from(base) % 24 + step * (u64::from(self.stride_hours) % 24)) % 24;
        hour as u32
    }

    pub fn time_for(&self, event_type: EventType, line_index: usize) -> NaiveTime {
        NaiveTime::from_hms_opt(self.hour_for(event_type, line_index), 0, 0)
            .unwrap_or(NaiveTime::MIN)
    }
}

/// Which step of the resolution chain produced a start time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeSource {
    Inline,
    LineRescan,
    ContextWindow,
    BaseDate,
    ClockDate,
    Placeholder,
}

impl fmt::Display for TimeSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TimeSource::Inline => "inline",
            TimeSource::LineRescan => "line_rescan",
            TimeSource::ContextWindow => "context_window",
            TimeSource::BaseDate => "base_date",
            TimeSource::ClockDate => "clock_date",
            TimeSource::Placeholder => "placeholder",
        };
        f.write_str(s)
    }
}

/// Resolved start time plus which signals were actually found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub start: NaiveDateTime,
    pub source: TimeSource,
    pub date_found: bool,
    pub time_found: bool,
}

/// Resolves candidate start times for one document.
pub struct TemporalResolver<'a> {
    base_date: Option<NaiveDate>,
    clock: &'a dyn Clock,
    policy: &'a PlaceholderPolicy,
    context_window: usize,
}

impl<'a> TemporalResolver<'a> {
    pub fn new(
        base_date: Option<NaiveDate>,
        clock: &'a dyn Clock,
        policy: &'a PlaceholderPolicy,
        context_window: usize,
    ) -> Self {
        Self {
            base_date,
            clock,
            policy,
            context_window,
        }
    }

    pub fn resolve<S: AsRef<str>>(&self, candidate: &Candidate, lines: &[S]) -> Resolution {
        let index = candidate.line_index();

        if let Some(start) = candidate.inline {
            return found(start, TimeSource::Inline);
        }

        let own_line = lines.get(index).map(|l| l.as_ref()).unwrap_or_default();
        if let Some(stamp) = calendar::find_dated_stamp(own_line) {
            return found(stamp.date.and_time(stamp.time), TimeSource::LineRescan);
        }

        let date = window(lines.len(), index, self.context_window)
            .into_iter()
            .find_map(|i| calendar::find_date(lines[i].as_ref()));
        let time = window(lines.len(), index, 1)
            .into_iter()
            .find_map(|i| calendar::find_time(lines[i].as_ref()));

        match (date, time) {
            (Some(date), Some(time)) => found(date.and_time(time), TimeSource::ContextWindow),
            (None, Some(time)) => match self.base_date {
                Some(base) => Resolution {
                    start: base.and_time(time),
                    source: TimeSource::BaseDate,
                    date_found: false,
                    time_found: true,
                },
                None => Resolution {
                    start: self.clock.today().and_time(time),
                    source: TimeSource::ClockDate,
                    date_found: false,
                    time_found: true,
                },
            },
            (date, None) => {
                METRICS.inc_placeholder_times();
                let day = date
                    .or(self.base_date)
                    .unwrap_or_else(|| self.clock.today());
                Resolution {
                    start: day.and_time(self.policy.time_for(candidate.event_type(), index)),
                    source: TimeSource::Placeholder,
                    date_found: date.is_some(),
                    time_found: false,
                }
            }
        }
    }
}

fn found(start: NaiveDateTime, source: TimeSource) -> Resolution {
    Resolution {
        start,
        source,
        date_found: true,
        time_found: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::{CandidateId, PatternFamily};

    fn ts(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d)
            .and_then(|date| date.and_hms_opt(h, mi, 0))
            .expect("valid fixture timestamp")
    }

    fn keyword(event_type: EventType, line_index: usize) -> Candidate {
        Candidate {
            id: CandidateId {
                event_type,
                line_index,
                offset: 0,
            },
            family: PatternFamily::Keyword,
            description: String::new(),
            raw_text: String::new(),
            inline: None,
        }
    }

    fn clock() -> FixedClock {
        FixedClock(ts(2030, 6, 1, 12, 0))
    }

    #[test]
    fn inline_stamp_wins() {
        let mut candidate = keyword(EventType::Arrived, 0);
        candidate.inline = Some(ts(2024, 1, 10, 8, 30));
        let policy = PlaceholderPolicy::default();
        let c = clock();
        let resolver = TemporalResolver::new(None, &c, &policy, 2);
        let r = resolver.resolve(&candidate, &["anything 23:59"]);
        assert_eq!(r.start, ts(2024, 1, 10, 8, 30));
        assert_eq!(r.source, TimeSource::Inline);
    }

    #[test]
    fn combines_window_date_with_nearby_time() {
        let lines = ["Date: 12 Jan 2024", "Remarks", "Vessel anchored 14:20"];
        let policy = PlaceholderPolicy::default();
        let c = clock();
        let resolver = TemporalResolver::new(None, &c, &policy, 2);
        let r = resolver.resolve(&keyword(EventType::Anchored, 2), &lines);
        assert_eq!(r.start, ts(2024, 1, 12, 14, 20));
        assert_eq!(r.source, TimeSource::ContextWindow);
        assert!(r.date_found && r.time_found);
    }

    #[test]
    fn time_only_uses_base_date() {
        let lines = ["x", "x", "x", "x", "Vessel anchored 14:20"];
        let policy = PlaceholderPolicy::default();
        let c = clock();
        let base = NaiveDate::from_ymd_opt(2024, 1, 9);
        let resolver = TemporalResolver::new(base, &c, &policy, 2);
        let r = resolver.resolve(&keyword(EventType::Anchored, 4), &lines);
        assert_eq!(r.start, ts(2024, 1, 9, 14, 20));
        assert_eq!(r.source, TimeSource::BaseDate);
        assert!(!r.date_found);
    }

    #[test]
    fn time_only_without_base_date_uses_injected_clock() {
        let lines = ["Vessel anchored 14:20"];
        let policy = PlaceholderPolicy::default();
        let c = clock();
        let resolver = TemporalResolver::new(None, &c, &policy, 2);
        let r = resolver.resolve(&keyword(EventType::Anchored, 0), &lines);
        assert_eq!(r.start, ts(2030, 6, 1, 14, 20));
        assert_eq!(r.source, TimeSource::ClockDate);
    }

    #[test]
    fn placeholder_is_deterministic_per_type_and_line() {
        let lines = ["a", "b", "c", "Vessel berthed"];
        let policy = PlaceholderPolicy::default();
        let c = clock();
        let base = NaiveDate::from_ymd_opt(2024, 1, 9);
        let resolver = TemporalResolver::new(base, &c, &policy, 2);
        let r = resolver.resolve(&keyword(EventType::Berthed, 3), &lines);
        // Berthed 10h + (3 % 4) * 2h
        assert_eq!(r.start, ts(2024, 1, 9, 16, 0));
        assert_eq!(r.source, TimeSource::Placeholder);
        assert!(!r.time_found);
        assert_eq!(resolver.resolve(&keyword(EventType::Berthed, 3), &lines), r);
    }

    #[test]
    fn placeholder_hour_wraps_and_uses_default() {
        let policy = PlaceholderPolicy::default();
        assert_eq!(policy.hour_for(EventType::Departed, 3), 2);
        assert_eq!(policy.hour_for(EventType::Survey, 0), 12);
    }

    #[test]
    fn policy_is_configurable() {
        let mut policy = PlaceholderPolicy::default();
        policy.hours.insert(EventType::Survey, 7);
        policy.stride_hours = 0;
        assert_eq!(policy.hour_for(EventType::Survey, 3), 7);
    }

    #[test]
    fn oversized_stride_wraps_without_overflow() {
        let policy = PlaceholderPolicy {
            stride_hours: u32::MAX,
            line_cycle: usize::MAX,
            ..PlaceholderPolicy::default()
        };
        assert_eq!(policy.hour_for(EventType::Survey, 1_000_000), 12);
        assert!(policy.hour_for(EventType::Arrived, usize::MAX - 1) < 24);
    }
}
