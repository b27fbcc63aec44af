//! Shared event and snapshot types for the habitat simulation.
//!
//! This crate contains pure data structures with no simulation logic.
//! Outer layers (telemetry, renderers, chat) depend on it without pulling in
//! the ECS kernel.

pub mod event;
pub mod snapshot;
pub mod timestamp;

pub use timestamp::SimTime;

pub use event::{EventKind, SimEvent};

pub use snapshot::{
    FieldSnapshot, GraphStats, SimulationTotals, TickSummary, WorldSnapshot,
};
