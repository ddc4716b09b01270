//! Overlap reconciliation between neighbouring events in sorted order.
//!
//! The anomaly detector reuses [`OverlapPolicy::assess`] so both passes
//! agree on which overlaps are trimmed and which are preserved.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::domain::timefmt::FORMAT;
use crate::domain::Event;
use crate::duration::{floored_span, hours_between, hours_to_delta, round2, MIN_DURATION_HOURS};
use crate::obs;

/// Thresholds shared by the reconciler and the anomaly detector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlapPolicy {
    /// Overlaps up to this many seconds are trimmed.
    pub tolerance_secs: i64,
    /// Duration floor applied right after a trim.
    pub trim_floor_hours: f64,
}

impl Default for OverlapPolicy {
    fn default() -> Self {
        Self {
            tolerance_secs: 300,
            trim_floor_hours: 0.5,
        }
    }
}

/// How an overlap between `current` and `next` is handled.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Overlap {
    /// Cut `current.end` back to `next.start`.
    Trim { to: NaiveDateTime, minutes: f64 },
    /// Leave both events alone and record the overlap.
    Preserve { minutes: f64, significant: bool },
    /// Minor overlap left in place because `current` states its own
    /// duration in the source text.
    Stated { minutes: f64 },
}

impl Overlap {
    pub fn minutes(&self) -> f64 {
        match self {
            Overlap::Trim { minutes, .. }
            | Overlap::Preserve { minutes, .. }
            | Overlap::Stated { minutes } => *minutes,
        }
    }
}

/// Note left on an event whose overlap was preserved.
pub fn significant_overlap_note(minutes: f64) -> String {
    format!("Significant overlap of {minutes:.1} minutes with next event. Original times preserved.")
}

fn untrimmable_overlap_note(minutes: f64) -> String {
    format!(
        "Overlap of {minutes:.1} minutes with next event leaves no room to trim. Original times preserved."
    )
}

fn stated_overlap_note(minutes: f64) -> String {
    format!(
        "Overlap of {minutes:.1} minutes with next event kept: duration is stated in the source text."
    )
}

impl OverlapPolicy {
    /// Classify the overlap between two neighbours, if any.
    ///
    /// A trim is only offered when it leaves `current` at least
    /// [`MIN_DURATION_HOURS`] long and `current` has no explicit duration.
    pub fn assess(&self, current: &Event, next: &Event) -> Option<Overlap> {
        if !current.has_valid_start() || !next.has_valid_start() {
            return None;
        }
        let end = current.end_time?;
        if end <= next.start_time {
            return None;
        }
        let secs = (end - next.start_time).num_seconds();
        let minutes = secs as f64 / 60.0;
        if secs > self.tolerance_secs {
            return Some(Overlap::Preserve {
                minutes,
                significant: true,
            });
        }
        if current.explicit_duration().is_some() {
            return Some(Overlap::Stated { minutes });
        }
        let room = next.start_time - current.start_time >= hours_to_delta(MIN_DURATION_HOURS);
        if room {
            Some(Overlap::Trim {
                to: next.start_time,
                minutes,
            })
        } else {
            Some(Overlap::Preserve {
                minutes,
                significant: false,
            })
        }
    }

    pub fn preserved_note(&self, overlap: &Overlap) -> Option<String> {
        match overlap {
            Overlap::Trim { .. } => None,
            Overlap::Preserve {
                minutes,
                significant: true,
            } => Some(significant_overlap_note(*minutes)),
            Overlap::Preserve { minutes, .. } => Some(untrimmable_overlap_note(*minutes)),
            Overlap::Stated { minutes } => Some(stated_overlap_note(*minutes)),
        }
    }
}

/// Repair `end <= start` by re-deriving the end from the duration.
///
/// Returns `true` when the event was changed.
pub(crate) fn repair_inverted(event: &mut Event) -> bool {
    let Some(end) = event.end_time else {
        return false;
    };
    if end > event.start_time || !event.has_valid_start() {
        return false;
    }
    let hours = event
        .explicit_duration()
        .unwrap_or(event.duration_hours.abs())
        .max(MIN_DURATION_HOURS);
    let repaired = event.start_time + hours_to_delta(hours);
    let note = if end < event.start_time {
        format!(
            "Negative duration (end time before start time) repaired: end time set to {} from duration of {:.2} hours.",
            repaired.format(FORMAT),
            hours
        )
    } else {
        format!(
            "Zero-length event repaired: end time set to {} from duration of {:.2} hours.",
            repaired.format(FORMAT),
            hours
        )
    };
    event.end_time = Some(repaired);
    event.duration_hours = round2(hours);
    obs::emit_invariant_repaired(event.event_type, &note);
    event.push_anomaly(note);
    true
}

/// Walk neighbours in order and trim or flag overlaps.
///
/// Never removes or reorders events; only end times, durations and
/// anomaly notes of the earlier event in a pair change.
pub fn reconcile_overlaps(mut events: Vec<Event>, policy: &OverlapPolicy) -> Vec<Event> {
    for event in events.iter_mut() {
        repair_inverted(event);
    }

    for i in 1..events.len() {
        let (head, tail) = events.split_at_mut(i);
        let current = &mut head[i - 1];
        let next = &tail[0];
        let Some(overlap) = policy.assess(current, next) else {
            continue;
        };
        match overlap {
            Overlap::Trim { to, minutes } => {
                tracing::debug!(
                    event_type = %current.event_type,
                    minutes = minutes,
                    "minor overlap trimmed"
                );
                current.end_time = Some(to);
                current.duration_hours =
                    round2(hours_between(current.start_time, to)).max(policy.trim_floor_hours);
            }
            preserve => {
                if let Some(note) = policy.preserved_note(&preserve) {
                    current.push_anomaly(note);
                }
            }
        }
    }
    events
}

/// Final consistency pass.
///
/// Without an explicit duration in `raw_text` the duration is re-derived
/// from `end - start`. With one, the floored explicit value is reported
/// and the end time is rebuilt as `start + duration`.
pub fn enforce_consistency(mut events: Vec<Event>) -> Vec<Event> {
    for event in events.iter_mut() {
        repair_inverted(event);
        let Some(end) = event.end_time else {
            continue;
        };
        match event.explicit_duration() {
            Some(explicit) if event.has_valid_start() => {
                let hours = round2(explicit.max(MIN_DURATION_HOURS));
                event.end_time = Some(event.start_time + hours_to_delta(hours));
                event.duration_hours = hours;
            }
            _ => {
                let (end, hours) = floored_span(event.start_time, end);
                event.end_time = Some(end);
                event.duration_hours = hours;
            }
        }
    }
    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{EventContext, EventType};
    use chrono::{Duration, NaiveDate};

    fn at(hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 10)
            .and_then(|d| d.and_hms_opt(hour, minute, 0))
            .expect("valid fixture")
    }

    fn event(event_type: EventType, start: NaiveDateTime, end: NaiveDateTime) -> Event {
        Event {
            event_type,
            start_time: start,
            end_time: Some(end),
            duration_hours: round2(hours_between(start, end)),
            location: "Unknown".to_string(),
            description: event_type.label().to_string(),
            confidence: 0.8,
            raw_text: event_type.label().to_string(),
            context: EventContext::default(),
            anomalies: Vec::new(),
        }
    }

    #[test]
    fn four_minute_overlap_is_trimmed_without_note() {
        let next_start = at(10, 0);
        let events = vec![
            event(EventType::Berthed, at(8, 0), next_start + Duration::minutes(4)),
            event(EventType::CargoLoading, next_start, at(20, 0)),
        ];
        let out = reconcile_overlaps(events, &OverlapPolicy::default());
        assert_eq!(out[0].end_time, Some(next_start));
        assert_eq!(out[0].duration_hours, 2.0);
        assert!(out[0].anomalies.is_empty());
    }

    #[test]
    fn trim_applies_floor_before_consistency() {
        let events = vec![
            event(EventType::PilotBoarded, at(8, 0), at(8, 14)),
            event(EventType::TugsMadeFast, at(8, 10), at(9, 0)),
        ];
        let out = reconcile_overlaps(events, &OverlapPolicy::default());
        assert_eq!(out[0].end_time, Some(at(8, 10)));
        assert_eq!(out[0].duration_hours, 0.5);
        let out = enforce_consistency(out);
        assert_eq!(out[0].duration_hours, 0.17);
    }

    #[test]
    fn thirty_minute_overlap_is_preserved_and_flagged() {
        let next_start = at(10, 0);
        let original_end = next_start + Duration::minutes(30);
        let events = vec![
            event(EventType::Berthed, at(8, 0), original_end),
            event(EventType::CargoLoading, next_start, at(20, 0)),
        ];
        let out = reconcile_overlaps(events, &OverlapPolicy::default());
        assert_eq!(out[0].end_time, Some(original_end));
        assert_eq!(out[0].anomalies.len(), 1);
        assert!(out[0].anomalies[0].contains("30.0 minutes"));
    }

    #[test]
    fn overlap_without_room_is_preserved() {
        let events = vec![
            event(EventType::HosesConnected, at(8, 0), at(8, 6)),
            event(EventType::CargoLoading, at(8, 3), at(9, 0)),
        ];
        let out = reconcile_overlaps(events, &OverlapPolicy::default());
        assert_eq!(out[0].end_time, Some(at(8, 6)));
        assert!(out[0].anomalies[0].contains("no room to trim"));
    }

    #[test]
    fn inverted_event_is_repaired_from_duration() {
        let mut broken = event(EventType::Shifting, at(10, 0), at(9, 0));
        broken.duration_hours = -1.5;
        let out = reconcile_overlaps(vec![broken], &OverlapPolicy::default());
        assert_eq!(out[0].end_time, Some(at(11, 30)));
        assert_eq!(out[0].duration_hours, 1.5);
        assert!(out[0].anomalies[0].starts_with("Negative duration"));
    }

    #[test]
    fn never_removes_or_reorders() {
        let events = vec![
            event(EventType::Arrived, at(6, 0), at(9, 0)),
            event(EventType::Anchored, at(7, 0), at(8, 0)),
            event(EventType::Berthed, at(7, 30), at(12, 0)),
        ];
        let types: Vec<EventType> = events.iter().map(|e| e.event_type).collect();
        let out = reconcile_overlaps(events, &OverlapPolicy::default());
        assert_eq!(out.iter().map(|e| e.event_type).collect::<Vec<_>>(), types);
    }

    #[test]
    fn consistency_rebuilds_end_from_explicit_duration() {
        let mut anchored = event(EventType::Anchored, at(8, 0), at(9, 0));
        anchored.raw_text = "Vessel anchored for 2.5 hours".to_string();
        anchored.duration_hours = 1.0;
        let out = enforce_consistency(vec![anchored]);
        assert_eq!(out[0].duration_hours, 2.5);
        assert_eq!(out[0].end_time, Some(at(10, 30)));
    }

    #[test]
    fn short_explicit_duration_is_floored() {
        let mut hoses = event(EventType::HosesConnected, at(8, 0), at(8, 6));
        hoses.raw_text = "Hoses connected 08:00 - 08:03".to_string();
        let out = enforce_consistency(vec![hoses]);
        assert_eq!(out[0].duration_hours, 0.1);
        assert_eq!(out[0].end_time, Some(at(8, 6)));
    }

    #[test]
    fn explicit_duration_is_not_trimmed() {
        let mut survey = event(EventType::Survey, at(8, 0), at(11, 0));
        survey.raw_text = "Survey conducted for 3 hours".to_string();
        let events = vec![survey, event(EventType::PilotBoarded, at(10, 58), at(11, 30))];
        let out = reconcile_overlaps(events, &OverlapPolicy::default());
        assert_eq!(out[0].end_time, Some(at(11, 0)));
        assert!(out[0].anomalies[0].contains("duration is stated"));
    }

    #[test]
    fn consistency_rederives_estimated_duration() {
        let mut berthed = event(EventType::Berthed, at(8, 0), at(9, 45));
        berthed.duration_hours = 1.0;
        let out = enforce_consistency(vec![berthed]);
        assert_eq!(out[0].duration_hours, 1.75);
    }
}
