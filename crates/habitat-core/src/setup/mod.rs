//! World Setup
//!
//! Field registration, population spawning and the initial network.

pub mod agents;
pub mod fields;

pub use agents::{populate, scatter_positions, SpawnSummary};
pub use fields::register_fields;
