use chrono::{NaiveDateTime, Timelike};
use std::collections::HashSet;

use crate::domain::{Event, EventType};

fn key(event: &Event) -> (EventType, NaiveDateTime) {
    let start = event.start_time;
    (event.event_type, start.with_nanosecond(0).unwrap_or(start))
}

/// Drop events repeating an earlier `(event_type, start_time)` pair.
///
/// Compared at second precision. The first occurrence wins and later
/// duplicates are dropped without a note.
pub fn dedup(events: Vec<Event>) -> Vec<Event> {
    let mut seen = HashSet::new();
    let before = events.len();
    let kept: Vec<Event> = events
        .into_iter()
        .filter(|event| seen.insert(key(event)))
        .collect();
    if kept.len() < before {
        tracing::debug!(dropped = before - kept.len(), "duplicate events dropped");
    }
    kept
}
