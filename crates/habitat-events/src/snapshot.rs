//! World Snapshot Types
//!
//! Read-only views of simulation state handed to outer layers between ticks.

use serde::{Deserialize, Serialize};

use crate::timestamp::SimTime;

/// Topology summary of the cognitive graph.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphStats {
    /// Number of agents considered
    pub node_count: usize,
    /// Edge count; mirrored links count once when the network is bidirectional
    pub edge_count: usize,
    /// Raw number of directed link entries across all agents
    pub link_count: usize,
    /// Mean number of distinct peers per agent
    pub average_degree: f64,
    /// Mean local clustering over agents with degree >= 2
    pub clustering_coefficient: f64,
    /// Mean link strength over all link entries
    pub mean_strength: f64,
}

/// State of one resource field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSnapshot {
    pub field_id: String,
    pub resource_type: String,
    /// "point", "area" or "gradient"
    pub distribution: String,
    pub center: (f32, f32),
    pub intensity: f32,
    pub max_intensity: f32,
    pub total_consumed: f32,
    pub depleted: bool,
}

/// Counters accumulated over the whole run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimulationTotals {
    pub ticks: u64,
    pub links_formed: u64,
    pub links_pruned: u64,
    pub links_severed: u64,
    pub edges_rewired: u64,
    pub rewire_failures: u64,
    pub resource_consumed: f64,
    pub fields_depleted: u64,
}

/// What happened during a single tick.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TickSummary {
    pub time: SimTime,
    pub event_count: usize,
    pub links_formed: usize,
    pub links_pruned: usize,
    pub edges_rewired: usize,
    pub rewire_failures: usize,
    pub resource_consumed: f32,
}

/// Full read-only view of the simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldSnapshot {
    pub time: SimTime,
    pub agent_count: usize,
    pub graph: GraphStats,
    pub fields: Vec<FieldSnapshot>,
    pub totals: SimulationTotals,
}

impl WorldSnapshot {
    /// Serializes the snapshot as pretty JSON.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Looks up a field by id.
    pub fn field(&self, field_id: &str) -> Option<&FieldSnapshot> {
        self.fields.iter().find(|f| f.field_id == field_id)
    }
}
