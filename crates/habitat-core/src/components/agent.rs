//! Agent Components
//!
//! Identity, position and foraging state for individual agents, plus the
//! narrow capability traits the kernel uses to talk about them.

use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::links::CognitiveLinks;

/// Marker component identifying an entity as an agent
#[derive(Component, Debug, Clone, Default)]
pub struct Agent;

/// Stable integer handle for an agent.
///
/// Links and indices refer to agents by handle, never by reference, so a
/// despawned agent leaves at worst a stale id behind.
#[derive(
    Component, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct AgentId(pub u32);

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "agent_{:04}", self.0)
    }
}

/// Component: An agent's current position in the world
#[derive(Component, Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, x: f32, y: f32) -> f32 {
        let dx = self.x - x;
        let dy = self.y - y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// Component: what an agent draws from resource fields each tick
#[derive(Component, Debug, Clone, Serialize, Deserialize)]
pub struct Forager {
    /// Only consume fields of this type; `None` takes the nearest of any type
    pub resource_type: Option<String>,
    /// Requested amount per second of world time
    pub demand_per_second: f32,
}

impl Forager {
    pub fn new(demand_per_second: f32) -> Self {
        Self {
            resource_type: None,
            demand_per_second,
        }
    }

    pub fn seeking(mut self, resource_type: impl Into<String>) -> Self {
        self.resource_type = Some(resource_type.into());
        self
    }
}

/// Component: consumption handed back to the agent.
///
/// The kernel only records amounts; whatever owns the agent's needs applies
/// them.
#[derive(Component, Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResourceIntake {
    /// Amount consumed during the most recent tick
    pub last_amount: f32,
    /// Field the most recent amount came from
    pub last_field: Option<String>,
    /// Total consumed since spawn
    pub total: f32,
}

impl ResourceIntake {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, field_id: Option<&str>, amount: f32) {
        self.last_amount = amount;
        self.last_field = field_id.map(str::to_string);
        self.total += amount;
    }
}

/// Capability: has an identifier and a position.
pub trait Locatable {
    fn agent_id(&self) -> AgentId;
    fn position(&self) -> Position;
}

impl Locatable for (AgentId, Position) {
    fn agent_id(&self) -> AgentId {
        self.0
    }

    fn position(&self) -> Position {
        self.1
    }
}

impl Locatable for (&AgentId, &Position) {
    fn agent_id(&self) -> AgentId {
        *self.0
    }

    fn position(&self) -> Position {
        *self.1
    }
}

/// Capability: has an identifier and a link map to read.
pub trait LinkOwner {
    fn agent_id(&self) -> AgentId;
    fn links(&self) -> &CognitiveLinks;
}

/// Capability: a [`LinkOwner`] whose link map can be rewritten.
pub trait LinkOwnerMut: LinkOwner {
    fn links_mut(&mut self) -> &mut CognitiveLinks;
}

impl LinkOwner for (AgentId, CognitiveLinks) {
    fn agent_id(&self) -> AgentId {
        self.0
    }

    fn links(&self) -> &CognitiveLinks {
        &self.1
    }
}

impl LinkOwnerMut for (AgentId, CognitiveLinks) {
    fn links_mut(&mut self) -> &mut CognitiveLinks {
        &mut self.1
    }
}

impl LinkOwner for (AgentId, &CognitiveLinks) {
    fn agent_id(&self) -> AgentId {
        self.0
    }

    fn links(&self) -> &CognitiveLinks {
        self.1
    }
}

impl LinkOwner for (AgentId, Mut<'_, CognitiveLinks>) {
    fn agent_id(&self) -> AgentId {
        self.0
    }

    fn links(&self) -> &CognitiveLinks {
        &self.1
    }
}

impl LinkOwnerMut for (AgentId, Mut<'_, CognitiveLinks>) {
    fn links_mut(&mut self) -> &mut CognitiveLinks {
        &mut self.1
    }
}
