//! Document-level statistics and the laytime summary.

use serde::{Deserialize, Serialize};

use crate::domain::{Event, Statistics, TypeStatistics};
use crate::duration::round2;

/// Which events count towards `totalLaytime`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LaytimeBasis {
    /// Loading and discharge events, including their completions.
    #[default]
    CargoOperations,
    AllEvents,
}

impl LaytimeBasis {
    pub fn counts(self, event: &Event) -> bool {
        match self {
            LaytimeBasis::CargoOperations => event.event_type.is_cargo_operation(),
            LaytimeBasis::AllEvents => true,
        }
    }
}

/// Counts and durations per event type. All zero for an empty list.
pub fn statistics(events: &[Event]) -> Statistics {
    let mut stats = Statistics {
        total_events: events.len(),
        ..Statistics::default()
    };
    let mut total = 0.0;
    for event in events {
        total += event.duration_hours;
        let entry = stats
            .event_types
            .entry(event.event_type.label().to_string())
            .or_insert_with(TypeStatistics::default);
        entry.count += 1;
        entry.total_duration += event.duration_hours;
    }
    for entry in stats.event_types.values_mut() {
        entry.total_duration = round2(entry.total_duration);
    }
    stats.total_duration_hours = round2(total);
    if !events.is_empty() {
        stats.average_event_duration = round2(total / events.len() as f64);
    }
    stats
}

/// `"<N.N> hours"` summed over the events counted by `basis`.
pub fn total_laytime(events: &[Event], basis: LaytimeBasis) -> String {
    let hours: f64 = events
        .iter()
        .filter(|e| basis.counts(e))
        .map(|e| e.duration_hours)
        .sum();
    format!("{hours:.1} hours")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{EventContext, EventType};
    use chrono::NaiveDate;

    fn event(event_type: EventType, hours: f64) -> Event {
        let start = NaiveDate::from_ymd_opt(2024, 1, 10)
            .and_then(|d| d.and_hms_opt(8, 0, 0))
            .expect("valid fixture");
        Event {
            event_type,
            start_time: start,
            end_time: Some(start + crate::duration::hours_to_delta(hours)),
            duration_hours: hours,
            location: "Unknown".to_string(),
            description: String::new(),
            confidence: 0.8,
            raw_text: String::new(),
            context: EventContext::default(),
            anomalies: Vec::new(),
        }
    }

    #[test]
    fn empty_list_yields_zeroes() {
        let stats = statistics(&[]);
        assert_eq!(stats.total_events, 0);
        assert_eq!(stats.total_duration_hours, 0.0);
        assert_eq!(stats.average_event_duration, 0.0);
        assert!(stats.event_types.is_empty());
        assert_eq!(total_laytime(&[], LaytimeBasis::CargoOperations), "0.0 hours");
    }

    #[test]
    fn groups_by_type_label() {
        let events = vec![
            event(EventType::CargoLoading, 10.0),
            event(EventType::CargoLoading, 4.5),
            event(EventType::Berthed, 1.0),
        ];
        let stats = statistics(&events);
        assert_eq!(stats.total_events, 3);
        assert_eq!(stats.total_duration_hours, 15.5);
        assert_eq!(stats.average_event_duration, 5.17);
        assert_eq!(stats.event_types["Cargo Loading"].count, 2);
        assert_eq!(stats.event_types["Cargo Loading"].total_duration, 14.5);
        assert_eq!(stats.event_types["Berthed"].count, 1);
    }

    #[test]
    fn laytime_basis_selects_events() {
        let events = vec![
            event(EventType::CargoDischarge, 18.0),
            event(EventType::CompletedDischarge, 0.5),
            event(EventType::Anchored, 4.0),
        ];
        assert_eq!(total_laytime(&events, LaytimeBasis::CargoOperations), "18.5 hours");
        assert_eq!(total_laytime(&events, LaytimeBasis::AllEvents), "22.5 hours");
    }

    #[test]
    fn statistics_serialize_with_snake_case_keys() {
        let value = serde_json::to_value(statistics(&[event(EventType::Survey, 1.0)]))
            .expect("serialize statistics");
        assert_eq!(value["total_events"], 1);
        assert_eq!(value["event_types"]["Survey"]["total_duration"], 1.0);
        assert!(value.get("average_event_duration").is_some());
    }
}
