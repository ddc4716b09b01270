//! Pipeline composition.
//!
//! ```text
//! normalize -> match | structured blocks -> resolve time -> annotate
//!   -> duration -> dedup -> sort -> overlaps -> consistency -> anomalies
//!   -> aggregate
//! ```
//!
//! Every stage after annotation is a `Vec<Event> -> Vec<Event>` function.
//! The engine holds no per-document state, so one `Engine` can serve
//! concurrent extractions.

use chrono::NaiveDate;
use std::sync::Arc;
use std::time::Instant;
use tracing::Instrument;

use crate::aggregate::{statistics, total_laytime};
use crate::anomaly;
use crate::augment::{AugmentationCollaborator, Capability};
use crate::calendar;
use crate::config::EngineConfig;
use crate::context::{self, Evidence, DEFAULT_LOCATION};
use crate::domain::{
    AugmentError, DocumentExtraction, Event, ExtractionMethod, PortInfo, Result,
};
use crate::duration::compute_timing;
use crate::matcher::{Candidate, PatternMatcher};
use crate::metadata;
use crate::metrics::METRICS;
use crate::normalize::normalize;
use crate::obs::{self, ExtractionSpan};
use crate::provider::TextExtractionProvider;
use crate::reconcile;
use crate::structured;
use crate::temporal::{Clock, SystemClock, TemporalResolver};

/// Text prepared for the later stages.
struct Detected {
    normalized: String,
    base_date: Option<NaiveDate>,
    port: PortInfo,
    events: Vec<Event>,
}

/// The extraction engine.
#[derive(Clone)]
pub struct Engine {
    config: EngineConfig,
    capability: Capability,
    clock: Arc<dyn Clock>,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("config", &self.config)
            .field("capability", &self.capability)
            .finish_non_exhaustive()
    }
}

impl Engine {
    /// Rule-based engine on the system clock.
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            capability: Capability::RuleBased,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_capability(mut self, capability: Capability) -> Self {
        self.capability = capability;
        self
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn capability(&self) -> &Capability {
        &self.capability
    }

    /// Extract with rule-based stages only. Never fails: text with no
    /// recognisable events yields an empty, well-formed extraction.
    pub fn extract_rule_based(&self, text: &str, filename: &str) -> DocumentExtraction {
        let started = Instant::now();
        let _span = ExtractionSpan::enter(filename);
        obs::emit_extraction_started(filename, text.len(), false);

        let mut detected = self.detect(text);
        let events = std::mem::take(&mut detected.events);
        let events = anomaly::detect(self.reconcile(events), &self.config.overlap);
        self.finish(detected, events, filename, ExtractionMethod::RuleBased, started)
    }

    /// Extract using the configured capability.
    ///
    /// With a collaborator, each call to it is bounded by the configured
    /// timeout. A timeout or error is logged and counted, and that step
    /// continues with rule-based output only.
    pub async fn extract(&self, text: &str, filename: &str) -> DocumentExtraction {
        let Some(collaborator) = self.capability.collaborator().cloned() else {
            return self.extract_rule_based(text, filename);
        };
        let span = obs::extraction_span(filename);
        self.extract_augmented(collaborator.as_ref(), text, filename)
            .instrument(span)
            .await
    }

    /// Run a provider over raw document bytes, then [`Engine::extract`].
    pub async fn extract_document(
        &self,
        provider: &dyn TextExtractionProvider,
        bytes: &[u8],
        content_type: &str,
        filename: &str,
    ) -> Result<DocumentExtraction> {
        let text = provider.extract(bytes, content_type)?;
        Ok(self.extract(&text, filename).await)
    }

    async fn extract_augmented(
        &self,
        collaborator: &dyn AugmentationCollaborator,
        text: &str,
        filename: &str,
    ) -> DocumentExtraction {
        let started = Instant::now();
        obs::emit_extraction_started(filename, text.len(), true);
        let limit = self.config.augmentation_timeout();
        let mut used = false;

        let mut detected = self.detect(text);
        let suggested = tokio::time::timeout(
            limit,
            collaborator.suggest_events(text, detected.base_date),
        )
        .await
        .unwrap_or(Err(AugmentError::Timeout(limit)));
        let mut events = match suggested {
            Ok(suggested) if !suggested.is_empty() => {
                used = true;
                tracing::debug!(count = suggested.len(), "collaborator events received");
                // Suggestions go first so they win deduplication.
                suggested
                    .into_iter()
                    .map(|s| s.into_event(&self.config.duration))
                    .chain(std::mem::take(&mut detected.events))
                    .collect()
            }
            Ok(_) => std::mem::take(&mut detected.events),
            Err(err) => {
                fallback("events", collaborator, &err);
                std::mem::take(&mut detected.events)
            }
        };

        events = anomaly::detect(self.reconcile(events), &self.config.overlap);

        let findings = tokio::time::timeout(limit, collaborator.suggest_anomalies(&events))
            .await
            .unwrap_or(Err(AugmentError::Timeout(limit)));
        match findings {
            Ok(findings) => {
                if findings.values().any(|notes| !notes.is_empty()) {
                    used = true;
                }
                events = anomaly::merge_collaborator_findings(events, findings);
            }
            Err(err) => fallback("anomalies", collaborator, &err),
        }

        let method = if used {
            ExtractionMethod::Augmented
        } else {
            ExtractionMethod::RuleBased
        };
        self.finish(detected, events, filename, method, started)
    }

    fn detect(&self, text: &str) -> Detected {
        let normalized = normalize(text);
        let lines: Vec<&str> = normalized.lines().collect();
        let base_date = calendar::base_date(&lines, self.config.base_date_scan_lines);
        let port = metadata::port_info(&normalized);

        let mut events = structured::parse_event_blocks(text);
        if events.is_empty() {
            let resolver = TemporalResolver::new(
                base_date,
                self.clock.as_ref(),
                &self.config.placeholder,
                self.config.context_window,
            );
            events = PatternMatcher::default()
                .scan(&lines, base_date)
                .iter()
                .map(|candidate| self.build_event(candidate, &lines, &resolver, &port))
                .collect();
        } else {
            tracing::debug!(count = events.len(), "structured event blocks parsed");
        }

        Detected {
            normalized,
            base_date,
            port,
            events,
        }
    }

    fn build_event(
        &self,
        candidate: &Candidate,
        lines: &[&str],
        resolver: &TemporalResolver<'_>,
        port: &PortInfo,
    ) -> Event {
        let index = candidate.line_index();
        let event_type = candidate.event_type();
        let radius = self.config.context_window;

        let resolution = resolver.resolve(candidate, lines);
        let context = context::capture_context(lines, index, radius);
        let location = context::find_location(lines, index, radius).or_else(|| port.name.clone());
        let confidence = context::confidence(Evidence {
            time: resolution.time_found,
            date: resolution.date_found,
            location: location.is_some(),
            context: !context.is_empty(),
        });
        let timing = compute_timing(
            resolution.start,
            &candidate.raw_text,
            event_type,
            &context,
            &self.config.duration,
        );

        Event {
            event_type,
            start_time: timing.start,
            end_time: Some(timing.end),
            duration_hours: timing.duration_hours,
            location: location.unwrap_or_else(|| DEFAULT_LOCATION.to_string()),
            description: context::describe(event_type, &context),
            confidence,
            raw_text: candidate.raw_text.clone(),
            context,
            anomalies: timing.repair.into_iter().collect(),
        }
    }

    fn reconcile(&self, events: Vec<Event>) -> Vec<Event> {
        let events = reconcile::dedup(events);
        let events = reconcile::sort_chronological(events);
        let events = reconcile::reconcile_overlaps(events, &self.config.overlap);
        reconcile::enforce_consistency(events)
    }

    fn finish(
        &self,
        detected: Detected,
        events: Vec<Event>,
        filename: &str,
        method: ExtractionMethod,
        started: Instant,
    ) -> DocumentExtraction {
        let extraction = DocumentExtraction {
            vessel_info: metadata::vessel_info(&detected.normalized),
            port_info: detected.port,
            total_laytime: total_laytime(&events, self.config.laytime_basis),
            statistics: statistics(&events),
            document_date: detected.base_date.unwrap_or_else(|| self.clock.today()),
            base_date: detected.base_date,
            extracted_from: filename.to_string(),
            total_events: events.len(),
            extraction_timestamp: self.clock.now(),
            extraction_method: method,
            events,
        };

        let anomalies = extraction.anomaly_count();
        METRICS.inc_documents_processed();
        METRICS.add_events_extracted(extraction.total_events as u64);
        METRICS.add_anomalies_flagged(anomalies as u64);
        obs::emit_extraction_finished(
            filename,
            extraction.total_events,
            anomalies,
            method,
            started.elapsed().as_millis() as u64,
        );
        extraction
    }
}

fn fallback(stage: &str, collaborator: &dyn AugmentationCollaborator, err: &AugmentError) {
    METRICS.inc_augmentation_fallbacks();
    obs::emit_augmentation_fallback(stage, collaborator.name(), err);
}
