//! Structured tracing for the extraction lifecycle.

use laytime_core::obs::{
    emit_augmentation_fallback, emit_extraction_finished, emit_extraction_started,
    emit_invariant_repaired,
};
use laytime_core::{Engine, EventType, ExtractionMethod, ExtractionSpan, METRICS};
use tracing_test::traced_test;

#[traced_test]
#[test]
fn lifecycle_events_are_logged() {
    emit_extraction_started("sof.txt", 120, false);
    emit_extraction_finished("sof.txt", 3, 1, ExtractionMethod::RuleBased, 4);
    assert!(logs_contain("extraction.started"));
    assert!(logs_contain("extraction.finished"));
    assert!(logs_contain("rule-based"));
}

#[traced_test]
#[test]
fn repairs_and_fallbacks_are_warnings() {
    emit_invariant_repaired(EventType::Berthed, "end time before start time");
    emit_augmentation_fallback("events", "sof-nlp", &"collaborator timed out");
    assert!(logs_contain("invariant.repaired"));
    assert!(logs_contain("augmentation.fallback"));
    assert!(logs_contain("sof-nlp"));
}

#[traced_test]
#[test]
fn extraction_runs_inside_a_span() {
    {
        let _span = ExtractionSpan::enter("span-test.txt");
        tracing::info!("inside the guard");
    }
    assert!(logs_contain("span-test.txt"));
    assert!(logs_contain("extraction_id="));

    let before = METRICS.documents_processed();
    Engine::default().extract_rule_based("10 Jan 2024 08:30 - Vessel arrived", "spanned.txt");
    assert!(logs_contain("spanned.txt"));
    assert!(METRICS.documents_processed() > before);
}
