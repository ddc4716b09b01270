//! Structured SoF blocks.
//!
//! Some statements are exported as labelled blocks rather than prose:
//!
//! ```text
//! [Event 1]
//! Event: Arrived
//! VesselName: MV Ocean Star
//! Start: 2025-6-7 8:0:0
//! End: 2025-6-7 8:30:0
//! Location: Port Alpha
//! ```
//!
//! Each block becomes one event. Timing problems are left in place for
//! the reconciler and the anomaly detector to repair and record.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::context::{describe, DEFAULT_LOCATION};
use crate::domain::timefmt::parse_lenient;
use crate::domain::{Event, EventContext, EventType, UNPARSABLE_START};
use crate::duration::floored_span;
use crate::matcher::RuleTable;

/// Confidence given to events read from labelled blocks.
pub const BLOCK_CONFIDENCE: f64 = 0.95;

static BLOCK_HEADER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\[\s*event\s+\d+\s*\]").expect("valid block header regex"));

static FIELD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^\s*([A-Za-z][A-Za-z ]*?)\s*:\s*(.*?)\s*$").expect("valid block field regex")
});

#[derive(Debug, Default)]
struct Block<'a> {
    event: Option<&'a str>,
    vessel: Option<&'a str>,
    start: Option<&'a str>,
    end: Option<&'a str>,
    location: Option<&'a str>,
    cargo: Option<&'a str>,
    quantity: Option<&'a str>,
}

fn non_empty(value: &str) -> Option<&str> {
    (!value.is_empty()).then_some(value)
}

fn read_block(body: &str) -> Block<'_> {
    let mut block = Block::default();
    for caps in FIELD.captures_iter(body) {
        let (Some(key), Some(value)) = (caps.get(1), caps.get(2)) else {
            continue;
        };
        let value = non_empty(value.as_str());
        let key: String = key
            .as_str()
            .chars()
            .filter(|c| c.is_ascii_alphabetic())
            .map(|c| c.to_ascii_lowercase())
            .collect();
        let slot = match key.as_str() {
            "event" | "eventtype" => &mut block.event,
            "vesselname" | "vessel" => &mut block.vessel,
            "start" | "starttime" => &mut block.start,
            "end" | "endtime" => &mut block.end,
            "location" | "destination" => &mut block.location,
            "cargotype" | "cargo" => &mut block.cargo,
            "quantity" => &mut block.quantity,
            _ => continue,
        };
        if slot.is_none() {
            *slot = value;
        }
    }
    block
}

fn event_type_of(label: &str) -> EventType {
    match EventType::from_label(label) {
        EventType::Unknown => RuleTable::standard()
            .classify(label)
            .unwrap_or(EventType::Unknown),
        known => known,
    }
}

/// Whether `text` contains at least one `[Event N]` header.
pub fn has_event_blocks(text: &str) -> bool {
    BLOCK_HEADER.is_match(text)
}

/// Parse every `[Event N]` block that names an event type.
///
/// An unreadable `Start` becomes [`UNPARSABLE_START`] with no end time;
/// an unreadable `End` leaves the end unset. An `End` before `Start`
/// is kept as written and yields a negative duration; a span under six
/// minutes is stretched to six.
pub fn parse_event_blocks(text: &str) -> Vec<Event> {
    if !has_event_blocks(text) {
        return Vec::new();
    }
    let mut events = Vec::new();
    for body in BLOCK_HEADER.split(text).skip(1) {
        let block = read_block(body);
        let Some(label) = block.event else {
            tracing::debug!("structured block without an event field skipped");
            continue;
        };
        let event_type = event_type_of(label);

        let start = block.start.and_then(parse_lenient);
        let (end, duration_hours) = match (start, block.end.and_then(parse_lenient)) {
            (Some(start), Some(end)) => {
                let (end, hours) = floored_span(start, end);
                (Some(end), hours)
            }
            _ => (None, 0.0),
        };

        let context = EventContext {
            cargo_type: block.cargo.map(|c| c.to_lowercase()),
            quantity: block.quantity.map(str::to_string),
            weather: None,
        };
        let description = match block.vessel {
            Some(vessel) => format!("Vessel {vessel} - {event_type}"),
            None => describe(event_type, &context),
        };

        events.push(Event {
            event_type,
            start_time: start.unwrap_or(UNPARSABLE_START),
            end_time: end,
            duration_hours,
            location: block.location.unwrap_or(DEFAULT_LOCATION).to_string(),
            description,
            confidence: BLOCK_CONFIDENCE,
            raw_text: body.trim().to_string(),
            context,
            anomalies: Vec::new(),
        });
    }
    events
}
