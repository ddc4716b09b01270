use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::timefmt;

/// Sentinel start for events whose timestamp could not be parsed.
///
/// Sorts before every real instant so such events surface first.
pub const UNPARSABLE_START: NaiveDateTime = NaiveDateTime::MIN;

/// Fixed vocabulary of port-call events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum EventType {
    Anchored,
    Arrived,
    Berthed,
    Unberthed,
    CargoLoading,
    CargoDischarge,
    CompletedLoading,
    CompletedDischarge,
    Shifting,
    Departed,
    Survey,
    HosesConnected,
    HosesDisconnected,
    PilotBoarded,
    TugsMadeFast,
    NorTendered,
    Unknown,
}

impl EventType {
    pub const ALL: [EventType; 17] = [
        EventType::Anchored,
        EventType::Arrived,
        EventType::Berthed,
        EventType::Unberthed,
        EventType::CargoLoading,
        EventType::CargoDischarge,
        EventType::CompletedLoading,
        EventType::CompletedDischarge,
        EventType::Shifting,
        EventType::Departed,
        EventType::Survey,
        EventType::HosesConnected,
        EventType::HosesDisconnected,
        EventType::PilotBoarded,
        EventType::TugsMadeFast,
        EventType::NorTendered,
        EventType::Unknown,
    ];

    /// Display label used on the wire.
    pub fn label(self) -> &'static str {
        match self {
            EventType::Anchored => "Anchored",
            EventType::Arrived => "Arrived",
            EventType::Berthed => "Berthed",
            EventType::Unberthed => "Unberthed",
            EventType::CargoLoading => "Cargo Loading",
            EventType::CargoDischarge => "Cargo Discharge",
            EventType::CompletedLoading => "Completed Loading",
            EventType::CompletedDischarge => "Completed Discharge",
            EventType::Shifting => "Shifting",
            EventType::Departed => "Departed",
            EventType::Survey => "Survey",
            EventType::HosesConnected => "Hoses Connected",
            EventType::HosesDisconnected => "Hoses Disconnected",
            EventType::PilotBoarded => "Pilot Boarded",
            EventType::TugsMadeFast => "Tugs Made Fast",
            EventType::NorTendered => "NOR Tendered",
            EventType::Unknown => "Unknown",
        }
    }

    /// Resolve a loosely written type name (`"cargo_loading"`, `"Berthing"`,
    /// `"NOR"`) to a variant. Anything unrecognised maps to `Unknown`.
    pub fn from_label(raw: &str) -> EventType {
        let key: String = raw
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_lowercase())
            .collect();
        match key.as_str() {
            "anchored" | "anchoring" | "anchor" | "atanchor" => EventType::Anchored,
            "arrived" | "arrival" | "eosp" => EventType::Arrived,
            "berthed" | "berthing" | "berth" | "allfast" | "alongside" => EventType::Berthed,
            "unberthed" | "unberthing" | "unberth" | "castoff" => EventType::Unberthed,
            "cargoloading" | "loading" | "loadingcommenced" | "commencedloading" => {
                EventType::CargoLoading
            }
            "cargodischarge" | "discharge" | "discharging" | "dischargecommenced"
            | "commenceddischarge" => EventType::CargoDischarge,
            "completedloading" | "loadingcompleted" => EventType::CompletedLoading,
            "completeddischarge" | "dischargecompleted" => EventType::CompletedDischarge,
            "shifting" | "shifted" | "shift" => EventType::Shifting,
            "departed" | "departure" | "sailed" => EventType::Departed,
            "survey" | "draftsurvey" | "draughtsurvey" | "inspection" => EventType::Survey,
            "hosesconnected" | "hoseconnected" => EventType::HosesConnected,
            "hosesdisconnected" | "hosedisconnected" => EventType::HosesDisconnected,
            "pilotboarded" | "pilotonboard" | "pob" => EventType::PilotBoarded,
            "tugsmadefast" | "tugmadefast" | "tugsfast" => EventType::TugsMadeFast,
            "nortendered" | "nor" | "noticeofreadiness" | "noraccepted" => EventType::NorTendered,
            _ => EventType::Unknown,
        }
    }

    /// Whether time spent in this event counts towards laytime.
    pub fn is_cargo_operation(self) -> bool {
        matches!(
            self,
            EventType::CargoLoading
                | EventType::CargoDischarge
                | EventType::CompletedLoading
                | EventType::CompletedDischarge
        )
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl From<EventType> for String {
    fn from(value: EventType) -> Self {
        value.label().to_string()
    }
}

impl From<String> for EventType {
    fn from(value: String) -> Self {
        EventType::from_label(&value)
    }
}

/// Attributes captured from the lines around an event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cargo_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weather: Option<String>,
}

impl EventContext {
    pub fn is_empty(&self) -> bool {
        self.cargo_type.is_none() && self.quantity.is_none() && self.weather.is_none()
    }
}

/// A resolved port-call event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub event_type: EventType,
    #[serde(with = "timefmt")]
    pub start_time: NaiveDateTime,
    #[serde(with = "timefmt::option", default)]
    pub end_time: Option<NaiveDateTime>,
    /// Hours. Authoritative over `end_time` when `raw_text` states a duration.
    #[serde(rename = "duration")]
    pub duration_hours: f64,
    pub location: String,
    pub description: String,
    /// In `[0, 1]`.
    pub confidence: f64,
    pub raw_text: String,
    #[serde(default, skip_serializing_if = "EventContext::is_empty")]
    pub context: EventContext,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub anomalies: Vec<String>,
}

impl Event {
    /// Explicit duration stated in the source text, in hours.
    pub fn explicit_duration(&self) -> Option<f64> {
        crate::duration::explicit_duration(&self.raw_text)
    }

    pub fn has_valid_start(&self) -> bool {
        self.start_time != UNPARSABLE_START
    }

    /// Hours between start and end, if an end is known.
    pub fn span_hours(&self) -> Option<f64> {
        self.end_time
            .map(|end| (end - self.start_time).num_seconds() as f64 / 3600.0)
    }

    /// Append an anomaly note unless the exact text is already recorded.
    pub fn push_anomaly(&mut self, note: impl Into<String>) {
        let note = note.into();
        if !self.anomalies.iter().any(|a| a == &note) {
            self.anomalies.push(note);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn sample() -> Event {
        let start = NaiveDate::from_ymd_opt(2024, 1, 10)
            .and_then(|d| d.and_hms_opt(8, 30, 0))
            .expect("valid fixture");
        Event {
            event_type: EventType::CargoLoading,
            start_time: start,
            end_time: Some(start + chrono::Duration::hours(2)),
            duration_hours: 2.0,
            location: "Berth 5".to_string(),
            description: "Cargo loading operations".to_string(),
            confidence: 0.9,
            raw_text: "10 Jan 2024 08:30 - Loading commenced".to_string(),
            context: EventContext::default(),
            anomalies: Vec::new(),
        }
    }

    #[test]
    fn labels_roundtrip_through_from_label() {
        for ty in EventType::ALL {
            assert_eq!(EventType::from_label(ty.label()), ty, "label {}", ty.label());
        }
    }

    #[test]
    fn from_label_accepts_snake_case_and_synonyms() {
        assert_eq!(EventType::from_label("cargo_loading"), EventType::CargoLoading);
        assert_eq!(EventType::from_label("Berthing"), EventType::Berthed);
        assert_eq!(EventType::from_label("NOR"), EventType::NorTendered);
        assert_eq!(EventType::from_label("bunkering"), EventType::Unknown);
    }

    #[test]
    fn cargo_operations_are_laytime_relevant() {
        assert!(EventType::CargoDischarge.is_cargo_operation());
        assert!(EventType::CompletedLoading.is_cargo_operation());
        assert!(!EventType::Berthed.is_cargo_operation());
    }

    #[test]
    fn event_serializes_with_wire_keys() {
        let value = serde_json::to_value(sample()).expect("serialize event");
        assert_eq!(value["eventType"], "Cargo Loading");
        assert_eq!(value["startTime"], "2024-01-10 08:30:00");
        assert_eq!(value["endTime"], "2024-01-10 10:30:00");
        assert_eq!(value["duration"], 2.0);
        assert_eq!(value["rawText"], "10 Jan 2024 08:30 - Loading commenced");
        assert!(value.get("anomalies").is_none());
        assert!(value.get("context").is_none());
    }

    #[test]
    fn event_roundtrips_through_json() {
        let mut event = sample();
        event.context.cargo_type = Some("coal".to_string());
        event.push_anomaly("Missing or invalid end time.");
        let json = serde_json::to_string(&event).expect("serialize");
        let back: Event = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, event);
    }

    #[test]
    fn push_anomaly_skips_exact_duplicates() {
        let mut event = sample();
        event.push_anomaly("overlap");
        event.push_anomaly("overlap");
        event.push_anomaly("other");
        assert_eq!(event.anomalies, vec!["overlap", "other"]);
    }

    #[test]
    fn explicit_duration_reads_raw_text() {
        let mut event = sample();
        assert_eq!(event.explicit_duration(), None);
        event.raw_text = "Vessel anchored for 2.5 hours".to_string();
        assert_eq!(event.explicit_duration(), Some(2.5));
    }

    #[test]
    fn span_hours_matches_end_minus_start() {
        assert_eq!(sample().span_hours(), Some(2.0));
    }
}
