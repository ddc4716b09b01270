//! Vessel and port particulars from the document header.
//!
//! Only captured values are returned. A field the text does not state
//! stays `None`; no master data is consulted.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::context::title_case;
use crate::domain::{PortInfo, VesselInfo};

static VESSEL_FIELD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?im)^\s*(?:vessel(?:'s)?(?:\s+name)?|ship(?:\s+name)?|name\s+of\s+vessel)\s*[:\-]\s*(.+?)\s*$")
        .expect("valid vessel field regex")
});

static PREFIXED_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:MV|MS|SS)\.?\s+([A-Z][A-Za-z0-9-]*(?:\s+[A-Z][A-Za-z0-9-]*){0,3})")
        .expect("valid prefixed vessel name regex")
});

static IMO: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bimo(?:\s*number|\s*no\.?)?\s*[:.]?\s*(\d{7})\b").expect("valid imo regex")
});

static FLAG_FIELD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?im)^\s*flag(?:\s+state)?\s*[:\-]\s*([A-Za-z][A-Za-z ]*?)\s*$")
        .expect("valid flag field regex")
});

static FLAGGED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bflagged\s+(?:in\s+)?([a-z]+)\b").expect("valid flagged regex"));

static PORT_FIELD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?im)^\s*port(?:\s+name)?\s*[:\-]\s*(.+?)\s*$").expect("valid port field regex")
});

static PORT_OF: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?im)\bport\s+of\s+([a-z][a-z ]*?)(?:\s*,\s*([a-z][a-z ]*?))?\s*(?:[.;()]|$)")
        .expect("valid port-of regex")
});

static COUNTRY_FIELD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?im)^\s*country\s*[:\-]\s*([A-Za-z][A-Za-z ]*?)\s*$")
        .expect("valid country field regex")
});

fn cleaned(raw: &str) -> Option<String> {
    let value = raw.trim().trim_end_matches([':', ',', '.', ';']).trim();
    (!value.is_empty()).then(|| title_case(value))
}

fn capture(re: &Regex, text: &str, group: usize) -> Option<String> {
    re.captures(text)
        .and_then(|caps| caps.get(group).and_then(|m| cleaned(m.as_str())))
}

/// Name, IMO number and flag of the vessel.
pub fn vessel_info(text: &str) -> VesselInfo {
    VesselInfo {
        name: capture(&VESSEL_FIELD, text, 1).or_else(|| capture(&PREFIXED_NAME, text, 1)),
        imo: IMO.captures(text).map(|caps| caps[1].to_string()),
        flag: capture(&FLAG_FIELD, text, 1).or_else(|| capture(&FLAGGED, text, 1)),
    }
}

/// Port name and country.
///
/// A `Port: Name, Country` header is split at the comma.
pub fn port_info(text: &str) -> PortInfo {
    let (mut name, mut country) = match PORT_FIELD.captures(text) {
        Some(caps) => match caps[1].split_once(',') {
            Some((name, country)) => (cleaned(name), cleaned(country)),
            None => (cleaned(&caps[1]), None),
        },
        None => (None, None),
    };
    if name.is_none() {
        if let Some(caps) = PORT_OF.captures(text) {
            name = cleaned(&caps[1]);
            country = country.or_else(|| caps.get(2).and_then(|m| cleaned(m.as_str())));
        }
    }
    PortInfo {
        name,
        country: capture(&COUNTRY_FIELD, text, 1).or(country),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "STATEMENT OF FACTS\n\
        Vessel Name: MV Ocean Trader\n\
        IMO: 9876543\n\
        Flag: Panama\n\
        Port: Rotterdam, Netherlands\n\
        10 Jan 2024 08:30 - Vessel arrived at port limits";

    #[test]
    fn reads_header_fields() {
        let vessel = vessel_info(HEADER);
        assert_eq!(vessel.name.as_deref(), Some("MV Ocean Trader"));
        assert_eq!(vessel.imo.as_deref(), Some("9876543"));
        assert_eq!(vessel.flag.as_deref(), Some("Panama"));

        let port = port_info(HEADER);
        assert_eq!(port.name.as_deref(), Some("Rotterdam"));
        assert_eq!(port.country.as_deref(), Some("Netherlands"));
    }

    #[test]
    fn falls_back_to_prose_mentions() {
        let text = "The MV Nordic Star, flagged in liberia, arrived at the port of santos, brazil.";
        let vessel = vessel_info(text);
        assert_eq!(vessel.name.as_deref(), Some("Nordic Star"));
        assert_eq!(vessel.flag.as_deref(), Some("Liberia"));
        assert_eq!(vessel.imo, None);

        let port = port_info(text);
        assert_eq!(port.name.as_deref(), Some("Santos"));
        assert_eq!(port.country.as_deref(), Some("Brazil"));
    }

    #[test]
    fn missing_fields_stay_empty() {
        assert_eq!(vessel_info("nothing here"), VesselInfo::default());
        assert_eq!(port_info("nothing here"), PortInfo::default());
    }

    #[test]
    fn imo_number_variants() {
        assert_eq!(vessel_info("IMO No. 1234567").imo.as_deref(), Some("1234567"));
        assert_eq!(vessel_info("imo number: 7654321").imo.as_deref(), Some("7654321"));
    }
}
