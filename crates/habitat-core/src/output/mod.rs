//! Output Module
//!
//! Statistics collection and world snapshots.

pub mod snapshot;
pub mod stats;

pub use snapshot::{field_snapshot, generate_snapshot, link_owners};
pub use stats::{summarize_tick, StatsCollector, DEFAULT_HISTORY_LIMIT};
