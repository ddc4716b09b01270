//! Structured observability hooks for the extraction lifecycle.
//!
//! This module provides:
//! - Extraction-scoped tracing spans, either entered via the `ExtractionSpan`
//!   RAII guard or attached to a future with [`extraction_span`]
//! - Emission functions with a stable `event` field for each stage
//!
//! Lifecycle events are emitted at `info!`, per-candidate detail at
//! `debug!`, fallbacks and repairs at `warn!`. Filter with `LAYTIME_LOG`.

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::domain::{EventType, ExtractionMethod};
use crate::matcher::PatternFamily;

/// A span tagged with a fresh extraction id.
///
/// Use with `tracing::Instrument` on async paths, where an entered
/// guard must not be held across `.await`.
pub fn extraction_span(document: &str) -> tracing::Span {
    let id = Uuid::new_v4();
    tracing::info_span!("laytime.extract", extraction_id = %id, document = %document)
}

/// RAII guard that enters an extraction-scoped span.
///
/// # Example
///
/// ```ignore
/// let _span = ExtractionSpan::enter("sof_mv_trader.txt");
/// // every tracing call now carries extraction_id and document
/// ```
pub struct ExtractionSpan {
    _span: tracing::span::EnteredSpan,
}

impl ExtractionSpan {
    /// Create and enter a span tagged with a fresh extraction id.
    pub fn enter(document: &str) -> Self {
        Self {
            _span: extraction_span(document).entered(),
        }
    }
}

/// Emit event: extraction started.
pub fn emit_extraction_started(document: &str, text_bytes: usize, augmented: bool) {
    info!(
        event = "extraction.started",
        document = %document,
        text_bytes = text_bytes,
        augmented = augmented,
    );
}

/// Emit event: extraction finished.
pub fn emit_extraction_finished(
    document: &str,
    total_events: usize,
    anomalies: usize,
    method: ExtractionMethod,
    duration_ms: u64,
) {
    info!(
        event = "extraction.finished",
        document = %document,
        total_events = total_events,
        anomalies = anomalies,
        method = %method,
        duration_ms = duration_ms,
    );
}

/// Emit event: a pattern family produced a candidate.
pub fn emit_candidate_matched(family: PatternFamily, event_type: EventType, line_index: usize) {
    debug!(
        event = "candidate.matched",
        family = %family,
        event_type = %event_type,
        line = line_index,
    );
}

/// Emit event: an anomaly note was attached to an event.
pub fn emit_anomaly_flagged(index: usize, event_type: EventType, note: &str) {
    debug!(
        event = "anomaly.flagged",
        index = index,
        event_type = %event_type,
        note = %note,
    );
}

/// Emit event: a broken event invariant was repaired (warning level).
pub fn emit_invariant_repaired(event_type: EventType, detail: &str) {
    warn!(event = "invariant.repaired", event_type = %event_type, detail = %detail);
}

/// Emit event: the augmentation collaborator failed and the rule-based
/// path was used instead (warning level).
pub fn emit_augmentation_fallback(stage: &str, collaborator: &str, error: &dyn std::fmt::Display) {
    warn!(
        event = "augmentation.fallback",
        stage = %stage,
        collaborator = %collaborator,
        error = %error,
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emitters_do_not_panic_without_subscriber() {
        emit_extraction_started("sof.txt", 120, false);
        emit_candidate_matched(PatternFamily::Keyword, EventType::Berthed, 3);
        emit_anomaly_flagged(0, EventType::Berthed, "overlap");
        emit_invariant_repaired(EventType::Berthed, "end before start");
        emit_augmentation_fallback("events", "static", &"timeout");
        emit_extraction_finished("sof.txt", 1, 0, ExtractionMethod::RuleBased, 5);
    }
}
