//! Optional augmentation collaborator.
//!
//! The engine is correct without one. A collaborator can only add
//! events and anomaly notes; when it is slow or fails the engine logs
//! the failure and carries on with rule-based output.

pub mod process;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::context::{describe, DEFAULT_LOCATION};
use crate::domain::timefmt::parse_lenient;
use crate::domain::{AugmentError, Event, EventContext, EventType, UNPARSABLE_START};
use crate::duration::{compute_timing, floored_span, DurationPolicy};
use crate::matcher::RuleTable;

pub use process::ProcessCollaborator;

/// Confidence assumed for suggestions that do not carry one.
pub const DEFAULT_SUGGESTION_CONFIDENCE: f64 = 0.7;

/// An event proposed by a collaborator, in loose wire form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestedEvent {
    pub event_type: String,
    pub start_time: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_text: Option<String>,
    #[serde(default, skip_serializing_if = "EventContext::is_empty")]
    pub context: EventContext,
}

impl SuggestedEvent {
    /// Convert into an [`Event`].
    ///
    /// An unreadable start becomes [`UNPARSABLE_START`]. A readable start
    /// without a usable end gets its end from the duration engine.
    pub fn into_event(self, policy: &DurationPolicy) -> Event {
        let event_type = match EventType::from_label(&self.event_type) {
            EventType::Unknown => RuleTable::standard()
                .classify(&self.event_type)
                .unwrap_or(EventType::Unknown),
            known => known,
        };
        let description = self
            .description
            .filter(|d| !d.trim().is_empty())
            .unwrap_or_else(|| describe(event_type, &self.context));
        let raw_text = self.raw_text.unwrap_or_else(|| description.clone());
        let start = parse_lenient(&self.start_time);
        let end = self.end_time.as_deref().and_then(parse_lenient);

        let (start_time, end_time, duration_hours) = match (start, end) {
            (Some(start), Some(end)) => {
                let (end, hours) = floored_span(start, end);
                (start, Some(end), hours)
            }
            (Some(start), None) => {
                let timing = compute_timing(start, &raw_text, event_type, &self.context, policy);
                (timing.start, Some(timing.end), timing.duration_hours)
            }
            (None, _) => (UNPARSABLE_START, None, 0.0),
        };

        Event {
            event_type,
            start_time,
            end_time,
            duration_hours,
            location: self
                .location
                .filter(|l| !l.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_LOCATION.to_string()),
            description,
            confidence: self
                .confidence
                .unwrap_or(DEFAULT_SUGGESTION_CONFIDENCE)
                .clamp(0.0, 1.0),
            raw_text,
            context: self.context,
            anomalies: Vec::new(),
        }
    }
}

/// An external source of extra events and anomaly findings.
#[async_trait]
pub trait AugmentationCollaborator: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    async fn suggest_events(
        &self,
        text: &str,
        base_date: Option<NaiveDate>,
    ) -> Result<Vec<SuggestedEvent>, AugmentError>;

    /// Findings keyed by index into `events`.
    async fn suggest_anomalies(
        &self,
        events: &[Event],
    ) -> Result<BTreeMap<usize, Vec<String>>, AugmentError>;
}

/// What the engine may use, fixed at construction.
#[derive(Clone, Default)]
pub enum Capability {
    #[default]
    RuleBased,
    Augmented(Arc<dyn AugmentationCollaborator>),
}

impl Capability {
    pub fn augmented(collaborator: impl AugmentationCollaborator + 'static) -> Self {
        Capability::Augmented(Arc::new(collaborator))
    }

    pub fn collaborator(&self) -> Option<&Arc<dyn AugmentationCollaborator>> {
        match self {
            Capability::RuleBased => None,
            Capability::Augmented(collaborator) => Some(collaborator),
        }
    }

    pub fn is_augmented(&self) -> bool {
        matches!(self, Capability::Augmented(_))
    }
}

impl fmt::Debug for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Capability::RuleBased => write!(f, "RuleBased"),
            Capability::Augmented(c) => write!(f, "Augmented({})", c.name()),
        }
    }
}
