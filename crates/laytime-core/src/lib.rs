//! Laytime Core Library
//!
//! Statement of Facts event extraction and temporal reconciliation:
//! free-form SoF text in, an ordered and internally consistent timeline
//! of port-call events out.

pub mod aggregate;
pub mod anomaly;
pub mod augment;
pub mod calendar;
pub mod config;
pub mod context;
pub mod domain;
pub mod duration;
pub mod engine;
pub mod fakes;
pub mod matcher;
pub mod metadata;
pub mod metrics;
pub mod normalize;
pub mod obs;
pub mod provider;
pub mod reconcile;
pub mod reporting;
pub mod structured;
pub mod telemetry;
pub mod temporal;

pub use domain::{
    AugmentError, DocumentExtraction, Event, EventContext, EventType, ExtractionMethod, PortInfo,
    ProviderError, Result, SofError, Statistics, TypeStatistics, VesselInfo, UNPARSABLE_START,
};

pub use aggregate::{statistics, total_laytime, LaytimeBasis};
pub use anomaly::{detect as detect_anomalies, merge_collaborator_findings};
pub use augment::{AugmentationCollaborator, Capability, ProcessCollaborator, SuggestedEvent};
pub use config::EngineConfig;
pub use duration::{compute_timing, explicit_duration, DurationPolicy, Timing};
pub use engine::Engine;
pub use matcher::{Candidate, CandidateId, PatternFamily, PatternMatcher, RuleTable};
pub use normalize::normalize;
pub use provider::{content_type_for_path, PlainTextProvider, TextExtractionProvider};
pub use reconcile::{
    dedup, enforce_consistency, reconcile_overlaps, sort_chronological, OverlapPolicy,
};
pub use reporting::{read_extraction_artifact, render_timeline_md, write_extraction_artifact};
pub use temporal::{Clock, FixedClock, PlaceholderPolicy, SystemClock, TemporalResolver};

pub use metrics::METRICS;
pub use obs::{extraction_span, ExtractionSpan};
pub use telemetry::init_tracing;

/// Laytime version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
