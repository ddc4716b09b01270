use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::event::Event;

/// Vessel particulars captured from the document header.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VesselInfo {
    pub name: Option<String>,
    pub imo: Option<String>,
    pub flag: Option<String>,
}

/// Port particulars captured from the document header.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortInfo {
    pub name: Option<String>,
    pub country: Option<String>,
}

/// Per-type totals inside [`Statistics`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TypeStatistics {
    pub count: usize,
    /// Hours, rounded to two decimals.
    pub total_duration: f64,
}

/// Document-level statistics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Statistics {
    pub total_events: usize,
    pub total_duration_hours: f64,
    /// Keyed by event type label.
    pub event_types: BTreeMap<String, TypeStatistics>,
    pub average_event_duration: f64,
}

/// Which path produced the events of an extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExtractionMethod {
    RuleBased,
    Augmented,
}

impl fmt::Display for ExtractionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtractionMethod::RuleBased => write!(f, "rule-based"),
            ExtractionMethod::Augmented => write!(f, "augmented"),
        }
    }
}

/// Result of extracting one document. Immutable once returned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentExtraction {
    pub events: Vec<Event>,
    pub vessel_info: VesselInfo,
    pub port_info: PortInfo,
    /// `"<N.N> hours"`.
    pub total_laytime: String,
    pub statistics: Statistics,
    /// Base date when one was found, otherwise the extraction day.
    pub document_date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_date: Option<NaiveDate>,
    pub extracted_from: String,
    pub total_events: usize,
    pub extraction_timestamp: NaiveDateTime,
    pub extraction_method: ExtractionMethod,
}

impl DocumentExtraction {
    pub fn anomaly_count(&self) -> usize {
        self.events.iter().map(|e| e.anomalies.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty() -> DocumentExtraction {
        let date = NaiveDate::from_ymd_opt(2024, 1, 10).expect("valid date");
        DocumentExtraction {
            events: Vec::new(),
            vessel_info: VesselInfo::default(),
            port_info: PortInfo::default(),
            total_laytime: "0.0 hours".to_string(),
            statistics: Statistics::default(),
            document_date: date,
            base_date: None,
            extracted_from: "sof.txt".to_string(),
            total_events: 0,
            extraction_timestamp: date.and_hms_opt(12, 0, 0).expect("valid time"),
            extraction_method: ExtractionMethod::RuleBased,
        }
    }

    #[test]
    fn output_contract_has_fixed_keys() {
        let raw = serde_json::to_value(empty()).expect("serialize extraction");
        let obj = raw.as_object().expect("extraction object");
        for key in [
            "events",
            "vesselInfo",
            "portInfo",
            "totalLaytime",
            "statistics",
            "documentDate",
            "extractedFrom",
            "totalEvents",
            "extractionTimestamp",
            "extractionMethod",
        ] {
            assert!(obj.contains_key(key), "missing key {key}");
        }
        assert_eq!(raw["documentDate"], "2024-01-10");
        assert_eq!(raw["extractionTimestamp"], "2024-01-10T12:00:00");
        assert_eq!(raw["extractionMethod"], "rule-based");
        assert_eq!(raw["statistics"]["total_events"], 0);
        assert!(raw["vesselInfo"]["imo"].is_null());
    }

    #[test]
    fn extraction_method_display_matches_wire() {
        for method in [ExtractionMethod::RuleBased, ExtractionMethod::Augmented] {
            let wire = serde_json::to_value(method).expect("serialize method");
            assert_eq!(wire, method.to_string());
        }
    }
}
