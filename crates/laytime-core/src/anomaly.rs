//! Anomaly detection over the final event list.
//!
//! [`detect`] never removes events. It annotates each issue it finds and
//! applies the same correction the reconciler would, so an event list
//! that skipped reconciliation still comes out with `start < end`.
//! Overlap thresholds come from the shared [`OverlapPolicy`].

use std::collections::BTreeMap;

use crate::domain::timefmt::FORMAT;
use crate::domain::Event;
use crate::duration::{hours_between, hours_to_delta, round2, MIN_DURATION_HOURS};
use crate::obs;
use crate::reconcile::overlap::Overlap;
use crate::reconcile::OverlapPolicy;

/// Duration assumed when an end time must be estimated and none is known.
pub const DEFAULT_ESTIMATE_HOURS: f64 = 1.0;

fn flag(index: usize, event: &mut Event, note: String) {
    obs::emit_anomaly_flagged(index, event.event_type, &note);
    event.push_anomaly(note);
}

fn check_event(index: usize, event: &mut Event) {
    if !event.has_valid_start() {
        flag(index, event, "Missing or invalid start time.".to_string());
    }

    match event.end_time {
        None => {
            flag(index, event, "Missing or invalid end time.".to_string());
            let hours = if event.duration_hours != 0.0 && event.duration_hours.is_finite() {
                event.duration_hours.abs()
            } else {
                DEFAULT_ESTIMATE_HOURS
            }
            .max(MIN_DURATION_HOURS);
            event.end_time = Some(event.start_time + hours_to_delta(hours));
            event.duration_hours = round2(hours);
            flag(
                index,
                event,
                format!("End time estimated based on duration ({hours:.2} hours)."),
            );
        }
        Some(end) if end < event.start_time => {
            flag(
                index,
                event,
                "End time before start time (negative duration).".to_string(),
            );
            let start = event.start_time;
            event.start_time = end;
            event.end_time = Some(start);
            let hours = round2(
                event
                    .explicit_duration()
                    .unwrap_or_else(|| hours_between(end, start)),
            );
            event.duration_hours = hours;
            flag(
                index,
                event,
                format!("Duration adjusted to positive: {hours:.2} hours."),
            );
        }
        Some(end) if end == event.start_time => {
            flag(index, event, "Zero-length event.".to_string());
            let hours = event.duration_hours.abs().max(MIN_DURATION_HOURS);
            let extended = event.start_time + hours_to_delta(hours);
            event.end_time = Some(extended);
            event.duration_hours = round2(hours);
            flag(
                index,
                event,
                format!("End time extended to {}.", extended.format(FORMAT)),
            );
        }
        Some(_) => {}
    }

    if event.duration_hours < 0.0 {
        flag(
            index,
            event,
            format!("Reported duration was negative ({:.2} hours).", event.duration_hours),
        );
        event.duration_hours = event.duration_hours.abs();
        flag(
            index,
            event,
            format!("Duration adjusted to positive: {:.2} hours.", event.duration_hours),
        );
    }
}

/// Annotate every event with the issues found in it and its successor.
pub fn detect(mut events: Vec<Event>, policy: &OverlapPolicy) -> Vec<Event> {
    for (index, event) in events.iter_mut().enumerate() {
        check_event(index, event);
    }

    for i in 1..events.len() {
        let (head, tail) = events.split_at_mut(i);
        let current = &mut head[i - 1];
        let next = &tail[0];
        let Some(overlap) = policy.assess(current, next) else {
            continue;
        };
        flag(
            i - 1,
            current,
            format!(
                "Overlaps with next event '{}' (starts at {}).",
                next.event_type,
                next.start_time.format(FORMAT)
            ),
        );
        match overlap {
            Overlap::Trim { to, .. } => {
                current.end_time = Some(to);
                current.duration_hours = round2(hours_between(current.start_time, to));
                flag(
                    i - 1,
                    current,
                    format!(
                        "Minor overlap detected. Adjusted end time to match next event's start time: {}",
                        to.format(FORMAT)
                    ),
                );
            }
            preserve => {
                if let Some(note) = policy.preserved_note(&preserve) {
                    flag(i - 1, current, note);
                }
            }
        }
    }
    events
}

/// Fold collaborator findings into rule-based ones.
///
/// For each event index the collaborator's notes come first; rule-based
/// notes it did not repeat are kept after them. Indices past the end of
/// `events` are ignored.
pub fn merge_collaborator_findings(
    mut events: Vec<Event>,
    findings: BTreeMap<usize, Vec<String>>,
) -> Vec<Event> {
    for (index, notes) in findings {
        let Some(event) = events.get_mut(index) else {
            tracing::debug!(index = index, "collaborator finding for unknown event ignored");
            continue;
        };
        if notes.is_empty() {
            continue;
        }
        let rule_based = std::mem::take(&mut event.anomalies);
        for note in notes.into_iter().chain(rule_based) {
            event.push_anomaly(note);
        }
    }
    events
}
