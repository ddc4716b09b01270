use crate::domain::Event;

/// Stable sort by start time, ascending.
///
/// Events with an unparsable start carry [`crate::domain::UNPARSABLE_START`]
/// and therefore come first.
pub fn sort_chronological(mut events: Vec<Event>) -> Vec<Event> {
    events.sort_by_key(|event| event.start_time);
    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{EventContext, EventType, UNPARSABLE_START};
    use chrono::{NaiveDate, NaiveDateTime};

    fn at(hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 10)
            .and_then(|d| d.and_hms_opt(hour, 0, 0))
            .expect("valid fixture")
    }

    fn event(start: NaiveDateTime, description: &str) -> Event {
        Event {
            event_type: EventType::Survey,
            start_time: start,
            end_time: None,
            duration_hours: 1.0,
            location: "Unknown".to_string(),
            description: description.to_string(),
            confidence: 0.5,
            raw_text: String::new(),
            context: EventContext::default(),
            anomalies: Vec::new(),
        }
    }

    #[test]
    fn orders_by_start_and_keeps_ties_stable() {
        let out = sort_chronological(vec![
            event(at(10), "late"),
            event(at(8), "tie-a"),
            event(at(8), "tie-b"),
        ]);
        let order: Vec<&str> = out.iter().map(|e| e.description.as_str()).collect();
        assert_eq!(order, vec!["tie-a", "tie-b", "late"]);
    }

    #[test]
    fn unparsable_start_sorts_first() {
        let out = sort_chronological(vec![event(at(1), "real"), event(UNPARSABLE_START, "broken")]);
        assert_eq!(out[0].description, "broken");
        assert!(out.windows(2).all(|w| w[0].start_time <= w[1].start_time));
    }
}
