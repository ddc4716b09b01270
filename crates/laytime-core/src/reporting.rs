//! Extraction artifacts and the markdown timeline.
//!
//! Artifacts are written to `<dir>/<stem>.json` with a companion
//! `<dir>/<stem>.json.sha256` holding the SHA-256 hex digest of the JSON
//! bytes, so a stored extraction can be verified before it is reused.

use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::domain::timefmt::to_wire;
use crate::domain::{DocumentExtraction, Result, SofError};

/// SHA-256 hex digest of `bytes`.
pub fn digest_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

fn artifact_paths(dir: &Path, stem: &str) -> (PathBuf, PathBuf) {
    (
        dir.join(format!("{stem}.json")),
        dir.join(format!("{stem}.json.sha256")),
    )
}

/// Write `<dir>/<stem>.json` and its digest file.
///
/// Returns the path to the JSON file.
pub fn write_extraction_artifact(
    dir: &Path,
    stem: &str,
    extraction: &DocumentExtraction,
) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let (json_path, digest_path) = artifact_paths(dir, stem);

    let json = serde_json::to_vec_pretty(extraction)?;
    std::fs::write(&json_path, &json)?;
    std::fs::write(&digest_path, digest_hex(&json))?;

    tracing::debug!(path = %json_path.display(), bytes = json.len(), "extraction artifact written");
    Ok(json_path)
}

/// Read `<dir>/<stem>.json` after checking it against its digest file.
///
/// Returns [`SofError::DigestMismatch`] when the JSON bytes were changed.
pub fn read_extraction_artifact(dir: &Path, stem: &str) -> Result<DocumentExtraction> {
    let (json_path, digest_path) = artifact_paths(dir, stem);
    let json = std::fs::read(&json_path)?;
    let expected = std::fs::read_to_string(&digest_path)?.trim().to_string();

    let actual = digest_hex(&json);
    if actual != expected {
        return Err(SofError::DigestMismatch { expected, actual });
    }
    Ok(serde_json::from_slice(&json)?)
}

fn or_dash(value: Option<&str>) -> &str {
    value.unwrap_or("-")
}

/// Render a markdown timeline with a per-type statistics table.
pub fn render_timeline_md(extraction: &DocumentExtraction) -> String {
    let mut out = String::new();
    out.push_str(&format!("# Statement of Facts: {}\n\n", extraction.extracted_from));

    let vessel = &extraction.vessel_info;
    let port = &extraction.port_info;
    out.push_str(&format!(
        "- vessel: {} (IMO {}, flag {})\n- port: {}, {}\n- document date: {}\n- method: {}\n- total laytime: {}\n\n",
        or_dash(vessel.name.as_deref()),
        or_dash(vessel.imo.as_deref()),
        or_dash(vessel.flag.as_deref()),
        or_dash(port.name.as_deref()),
        or_dash(port.country.as_deref()),
        extraction.document_date,
        extraction.extraction_method,
        extraction.total_laytime,
    ));

    out.push_str("## Timeline\n\n");
    if extraction.events.is_empty() {
        out.push_str("No events extracted.\n");
    } else {
        out.push_str("| # | Event | Start | End | Hours | Location | Confidence |\n");
        out.push_str("|---|---|---|---|---|---|---|\n");
        for (i, event) in extraction.events.iter().enumerate() {
            let end = event
                .end_time
                .and_then(|e| to_wire(&e))
                .unwrap_or_else(|| "-".to_string());
            let start = to_wire(&event.start_time).unwrap_or_else(|| "-".to_string());
            out.push_str(&format!(
                "| {} | {} | {} | {} | {:.2} | {} | {:.2} |\n",
                i + 1,
                event.event_type,
                start,
                end,
                event.duration_hours,
                event.location,
                event.confidence,
            ));
        }
    }

    let flagged: Vec<_> = extraction
        .events
        .iter()
        .enumerate()
        .filter(|(_, e)| !e.anomalies.is_empty())
        .collect();
    if !flagged.is_empty() {
        out.push_str("\n## Anomalies\n\n");
        for (i, event) in flagged {
            for note in &event.anomalies {
                out.push_str(&format!("- #{} {}: {}\n", i + 1, event.event_type, note));
            }
        }
    }

    let stats = &extraction.statistics;
    out.push_str("\n## Statistics\n\n");
    out.push_str(&format!(
        "- events: {}\n- total hours: {:.2}\n- average hours: {:.2}\n",
        stats.total_events, stats.total_duration_hours, stats.average_event_duration
    ));
    if !stats.event_types.is_empty() {
        out.push_str("\n| Type | Count | Hours |\n|---|---|---|\n");
        for (label, entry) in &stats.event_types {
            out.push_str(&format!(
                "| {} | {} | {:.2} |\n",
                label, entry.count, entry.total_duration
            ));
        }
    }
    out
}
