//! Domain models for Statement of Facts extraction.
//!
//! Canonical definitions for the core entities:
//! - `Event`: a resolved port-call event with start, end and duration
//! - `DocumentExtraction`: the aggregate returned for one document
//! - `SofError`: the error taxonomy

pub mod error;
pub mod event;
pub mod extraction;
pub mod timefmt;

pub use error::{AugmentError, ProviderError, Result, SofError};
pub use event::{Event, EventContext, EventType, UNPARSABLE_START};
pub use extraction::{
    DocumentExtraction, ExtractionMethod, PortInfo, Statistics, TypeStatistics, VesselInfo,
};
