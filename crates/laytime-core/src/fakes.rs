//! In-memory collaborators (testing only)
//!
//! Provides `StaticCollaborator`, `FailingCollaborator` and
//! `SlowCollaborator`, which satisfy the augmentation trait without
//! any external process.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::augment::{AugmentationCollaborator, SuggestedEvent};
use crate::domain::{AugmentError, Event};

// ---------------------------------------------------------------------------
// StaticCollaborator
// ---------------------------------------------------------------------------

/// Returns canned suggestions and counts calls.
#[derive(Debug, Default)]
pub struct StaticCollaborator {
    events: Vec<SuggestedEvent>,
    anomalies: BTreeMap<usize, Vec<String>>,
    calls: AtomicUsize,
}

impl StaticCollaborator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_events(mut self, events: Vec<SuggestedEvent>) -> Self {
        self.events = events;
        self
    }

    pub fn with_anomaly(mut self, index: usize, note: impl Into<String>) -> Self {
        self.anomalies.entry(index).or_default().push(note.into());
        self
    }

    /// Number of trait calls served so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AugmentationCollaborator for StaticCollaborator {
    fn name(&self) -> &str {
        "static"
    }

    async fn suggest_events(
        &self,
        _text: &str,
        _base_date: Option<NaiveDate>,
    ) -> Result<Vec<SuggestedEvent>, AugmentError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.events.clone())
    }

    async fn suggest_anomalies(
        &self,
        _events: &[Event],
    ) -> Result<BTreeMap<usize, Vec<String>>, AugmentError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.anomalies.clone())
    }
}

// ---------------------------------------------------------------------------
// FailingCollaborator
// ---------------------------------------------------------------------------

/// Fails every call with [`AugmentError::Unavailable`].
#[derive(Debug, Clone, Default)]
pub struct FailingCollaborator;

#[async_trait]
impl AugmentationCollaborator for FailingCollaborator {
    fn name(&self) -> &str {
        "failing"
    }

    async fn suggest_events(
        &self,
        _text: &str,
        _base_date: Option<NaiveDate>,
    ) -> Result<Vec<SuggestedEvent>, AugmentError> {
        Err(AugmentError::Unavailable("model not loaded".to_string()))
    }

    async fn suggest_anomalies(
        &self,
        _events: &[Event],
    ) -> Result<BTreeMap<usize, Vec<String>>, AugmentError> {
        Err(AugmentError::Unavailable("model not loaded".to_string()))
    }
}

// ---------------------------------------------------------------------------
// SlowCollaborator
// ---------------------------------------------------------------------------

/// Sleeps for `delay` before answering with nothing.
#[derive(Debug, Clone)]
pub struct SlowCollaborator {
    pub delay: Duration,
}

impl SlowCollaborator {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

#[async_trait]
impl AugmentationCollaborator for SlowCollaborator {
    fn name(&self) -> &str {
        "slow"
    }

    async fn suggest_events(
        &self,
        _text: &str,
        _base_date: Option<NaiveDate>,
    ) -> Result<Vec<SuggestedEvent>, AugmentError> {
        tokio::time::sleep(self.delay).await;
        Ok(Vec::new())
    }

    async fn suggest_anomalies(
        &self,
        _events: &[Event],
    ) -> Result<BTreeMap<usize, Vec<String>>, AugmentError> {
        tokio::time::sleep(self.delay).await;
        Ok(BTreeMap::new())
    }
}
