//! Per-event annotation from the lines around a candidate: cargo,
//! quantity, weather, location, the synthesized description and the
//! confidence score.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::domain::{EventContext, EventType};

/// Location used when neither the text nor the port header names one.
pub const DEFAULT_LOCATION: &str = "Unknown";

static CARGO_MENTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(?:cargo|load|discharg)").expect("valid cargo mention regex"));

static CARGO_KIND: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(iron\s+ore|coal|grain|wheat|corn|soya(?:\s+beans)?|sugar|crude\s+oil|oil|gasoil|diesel|containers?|bulk|fertili[sz]er|cement|steel)\b",
    )
    .expect("valid cargo kind regex")
});

static QUANTITY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(\d{1,3}(?:,\d{3})+(?:\.\d+)?|\d+(?:\.\d+)?)\s*(mt|metric\s+tons?|tons?|tonnes?|m3|cbm|cubic\s+met(?:er|re)s?)\b",
    )
    .expect("valid quantity regex")
});

static WEATHER_STATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bweather\b[^.]*?\b(good|fine|fair|clear|calm|moderate|bad|poor|rough|stormy)\b")
        .expect("valid weather state regex")
});

static WEATHER_EVENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(heavy\s+rain|rain|wind|storm|fog|swell)\b[^.]*?\b(?:condition|weather|stopp|suspend|delay)")
        .expect("valid weather event regex")
});

static NAMED_PLACE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?i:berth|anchorage|terminal|wharf|pier|jetty|quay)\s+(?:(?i:no)\.?\s*)?([A-Z0-9][A-Za-z0-9-]*)\b")
        .expect("valid named place regex")
});

static QUALIFIED_PLACE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?:outer|inner|eastern|western|northern|southern|quarantine|main|oil|container|bulk)\s+(?:anchorage|terminal|berth|jetty|wharf)\b",
    )
    .expect("valid qualified place regex")
});

/// Line indices of the window around `index`, nearest first.
pub(crate) fn window(len: usize, index: usize, radius: usize) -> Vec<usize> {
    let mut out = vec![index];
    for d in 1..=radius {
        if let Some(before) = index.checked_sub(d) {
            out.push(before);
        }
        if index + d < len {
            out.push(index + d);
        }
    }
    out.retain(|i| *i < len);
    out
}

fn first_in_window<S, T>(lines: &[S], index: usize, radius: usize, f: impl Fn(&str) -> Option<T>) -> Option<T>
where
    S: AsRef<str>,
{
    window(lines.len(), index, radius)
        .into_iter()
        .find_map(|i| f(lines[i].as_ref()))
}

/// Capitalize the first letter of every word, leaving the rest as written.
pub fn title_case(text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn squash(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}

fn cargo_on(line: &str) -> Option<String> {
    if !CARGO_MENTION.is_match(line) {
        return None;
    }
    let kind = squash(CARGO_KIND.captures(line)?.get(1)?.as_str());
    Some(match kind.as_str() {
        "containers" => "container".to_string(),
        _ => kind,
    })
}

fn quantity_on(line: &str) -> Option<String> {
    let caps = QUANTITY.captures(line)?;
    let unit = squash(&caps[2]);
    let unit = if unit == "m3" || unit == "cbm" || unit.starts_with("cubic") {
        "m3"
    } else {
        "MT"
    };
    Some(format!("{} {}", &caps[1], unit))
}

fn weather_on(line: &str) -> Option<String> {
    WEATHER_STATE
        .captures(line)
        .or_else(|| WEATHER_EVENT.captures(line))
        .map(|caps| squash(&caps[1]))
}

/// Cargo, quantity and weather from the lines within `radius` of `index`.
pub fn capture_context<S: AsRef<str>>(lines: &[S], index: usize, radius: usize) -> EventContext {
    EventContext {
        cargo_type: first_in_window(lines, index, radius, cargo_on),
        quantity: first_in_window(lines, index, radius, quantity_on),
        weather: first_in_window(lines, index, radius, weather_on),
    }
}

/// Location named near `index`, title-cased. `None` when nothing is named.
pub fn find_location<S: AsRef<str>>(lines: &[S], index: usize, radius: usize) -> Option<String> {
    first_in_window(lines, index, radius, |line| {
        NAMED_PLACE
            .find(line)
            .or_else(|| QUALIFIED_PLACE.find(line))
            .map(|m| title_case(m.as_str()))
    })
}

/// Human-readable description: a base phrase per type plus any context.
pub fn describe(event_type: EventType, context: &EventContext) -> String {
    let base = match event_type {
        EventType::Anchored => "Vessel anchored",
        EventType::Arrived => "Vessel arrived",
        EventType::Berthed => "Vessel berthed",
        EventType::Unberthed => "Vessel unberthed",
        EventType::CargoLoading => "Cargo loading operations",
        EventType::CargoDischarge => "Cargo discharge operations",
        EventType::CompletedLoading => "Loading operations completed",
        EventType::CompletedDischarge => "Discharge operations completed",
        EventType::Shifting => "Vessel shifting",
        EventType::Departed => "Vessel departed",
        EventType::Survey => "Survey conducted",
        EventType::HosesConnected => "Cargo hoses connected",
        EventType::HosesDisconnected => "Cargo hoses disconnected",
        EventType::PilotBoarded => "Pilot boarded",
        EventType::TugsMadeFast => "Tugs made fast",
        EventType::NorTendered => "Notice of readiness tendered",
        EventType::Unknown => "Port event",
    };
    let mut out = base.to_string();
    if let Some(cargo) = &context.cargo_type {
        out.push_str(&format!(" - {cargo}"));
    }
    if let Some(quantity) = &context.quantity {
        out.push_str(&format!(" ({quantity})"));
    }
    if let Some(weather) = &context.weather {
        out.push_str(&format!(" - Weather: {weather}"));
    }
    out
}

/// Which signals were independently found for an event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Evidence {
    pub time: bool,
    pub date: bool,
    pub location: bool,
    pub context: bool,
}

/// Confidence in `[0, 1]`: 0.5 base, +0.3 time, +0.1 each for date,
/// location and context.
pub fn confidence(evidence: Evidence) -> f64 {
    let mut score: f64 = 0.5;
    if evidence.time {
        score += 0.3;
    }
    if evidence.date {
        score += 0.1;
    }
    if evidence.location {
        score += 0.1;
    }
    if evidence.context {
        score += 0.1;
    }
    (score.min(1.0) * 100.0).round() / 100.0
}
