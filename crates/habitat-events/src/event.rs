//! Event Types
//!
//! Everything the kernel reports about a tick. Agents are referred to by their
//! raw integer handle so this crate stays independent of the ECS.

use serde::{Deserialize, Serialize};

use crate::timestamp::SimTime;

/// What happened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    /// A new cognitive link was created by a proximity contact
    LinkFormed {
        source: u32,
        target: u32,
        strength: f32,
    },
    /// A link decayed below the pruning threshold and was removed
    LinkPruned {
        source: u32,
        target: u32,
    },
    /// A proximity policy explicitly dropped a link
    LinkSevered {
        source: u32,
        target: u32,
    },
    /// A link was moved from one target to another during rewiring
    EdgeRewired {
        source: u32,
        old_target: u32,
        new_target: u32,
    },
    /// Rewiring gave up after exhausting its attempt budget
    RewireFailed {
        source: u32,
        target: u32,
    },
    /// An agent drew from a resource field
    ResourceConsumed {
        agent: u32,
        field_id: String,
        resource_type: String,
        amount: f32,
    },
    /// A field's intensity reached zero
    FieldDepleted { field_id: String },
}

impl EventKind {
    /// Short machine name of the variant, used as a counter key.
    pub fn name(&self) -> &'static str {
        match self {
            EventKind::LinkFormed { .. } => "link_formed",
            EventKind::LinkPruned { .. } => "link_pruned",
            EventKind::LinkSevered { .. } => "link_severed",
            EventKind::EdgeRewired { .. } => "edge_rewired",
            EventKind::RewireFailed { .. } => "rewire_failed",
            EventKind::ResourceConsumed { .. } => "resource_consumed",
            EventKind::FieldDepleted { .. } => "field_depleted",
        }
    }
}

/// A timestamped simulation event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimEvent {
    pub time: SimTime,
    #[serde(flatten)]
    pub kind: EventKind,
}

impl SimEvent {
    pub fn new(time: SimTime, kind: EventKind) -> Self {
        Self { time, kind }
    }
}
