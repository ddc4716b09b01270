//! Reconciliation stages, each a `Vec<Event> -> Vec<Event>` transformation.
//!
//! Composed in order by the engine:
//!
//! 1. [`dedup`] drops repeated `(event_type, start_time)` occurrences,
//! 2. [`sort_chronological`] orders by start time,
//! 3. [`reconcile_overlaps`] repairs or flags overlaps between neighbours,
//! 4. [`enforce_consistency`] re-derives durations from the final spans.

pub mod dedup;
pub mod overlap;
pub mod sort;

pub use dedup::dedup;
pub use overlap::{enforce_consistency, reconcile_overlaps, significant_overlap_note, OverlapPolicy};
pub use sort::sort_chronological;
