//! Cognitive Link Components
//!
//! Each agent owns a map of weighted, timestamped links to its peers. All
//! mutation goes through [`CognitiveLinks`], which keeps every strength in
//! [0, 1] and never stores two links to the same peer.

use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::agent::AgentId;

/// Constants for link dynamics
pub mod link_constants {
    /// Strength of a freshly formed link
    pub const DEFAULT_STRENGTH: f32 = 0.5;
    /// Strength added when an existing link is connected again
    pub const REINFORCE_INCREMENT: f32 = 0.1;
    /// Upper bound for any link strength
    pub const MAX_STRENGTH: f32 = 1.0;
}

use link_constants::*;

/// A directed relationship from the owning agent to `target`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CognitiveLink {
    pub target: AgentId,
    /// Always within [0, 1]
    pub strength: f32,
    /// World time the link was created
    pub formed_at: f64,
    /// World time of the most recent reinforcement
    pub last_reinforced: f64,
    /// Whether the link was created as half of a mirrored pair
    pub bidirectional: bool,
}

impl CognitiveLink {
    pub fn new(target: AgentId, strength: f32, timestamp: f64) -> Self {
        Self {
            target,
            strength: clamp_strength(strength),
            formed_at: timestamp,
            last_reinforced: timestamp,
            bidirectional: false,
        }
    }

    fn strengthen(&mut self, amount: f32, timestamp: f64) {
        self.strength = clamp_strength(self.strength + amount.max(0.0));
        self.last_reinforced = timestamp;
    }
}

fn clamp_strength(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, MAX_STRENGTH)
    }
}

/// Options for [`CognitiveLinks::connect`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ConnectOptions {
    /// Initial strength for a new link; defaults to 0.5
    pub strength: Option<f32>,
    /// Flags the link as half of a mirrored pair. [`CognitiveLinks`] only
    /// owns one side; `Simulation::connect` and the small-world builder
    /// write the other.
    pub bidirectional: bool,
}

impl ConnectOptions {
    pub fn with_strength(strength: f32) -> Self {
        Self {
            strength: Some(strength),
            bidirectional: false,
        }
    }

    pub fn mirrored(mut self) -> Self {
        self.bidirectional = true;
        self
    }
}

/// Component: the outgoing links an agent owns, keyed by peer.
///
/// Backed by an ordered map so iteration (and everything seeded randomness
/// does with it) is reproducible.
#[derive(Component, Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CognitiveLinks {
    links: BTreeMap<AgentId, CognitiveLink>,
}

impl CognitiveLinks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Connect to `target`, or reinforce the link if it already exists.
    ///
    /// Reinforcement adds the fixed increment and ignores `options.strength`.
    pub fn connect(
        &mut self,
        target: AgentId,
        timestamp: f64,
        options: ConnectOptions,
    ) -> &CognitiveLink {
        self.links
            .entry(target)
            .and_modify(|link| link.strengthen(REINFORCE_INCREMENT, timestamp))
            .or_insert_with(|| {
                let mut link = CognitiveLink::new(
                    target,
                    options.strength.unwrap_or(DEFAULT_STRENGTH),
                    timestamp,
                );
                link.bidirectional = options.bidirectional;
                link
            })
    }

    /// Remove the link to `target`, returning it if there was one.
    pub fn disconnect(&mut self, target: AgentId) -> Option<CognitiveLink> {
        self.links.remove(&target)
    }

    /// Strengthen an existing link. Returns the new strength, or `None` if
    /// there is no link to reinforce.
    pub fn reinforce(
        &mut self,
        target: AgentId,
        timestamp: f64,
        amount: Option<f32>,
    ) -> Option<f32> {
        let link = self.links.get_mut(&target)?;
        link.strengthen(amount.unwrap_or(REINFORCE_INCREMENT), timestamp);
        Some(link.strength)
    }

    /// Weaken every link by `decay_rate * dt` and prune those that end up
    /// below `min_strength`. Returns the pruned targets in id order.
    pub fn decay(&mut self, dt: f32, decay_rate: f32, min_strength: f32) -> Vec<AgentId> {
        let loss = if dt.is_finite() && decay_rate.is_finite() {
            (decay_rate * dt).max(0.0)
        } else {
            0.0
        };

        let mut pruned = Vec::new();
        self.links.retain(|target, link| {
            link.strength = (link.strength - loss).max(0.0);
            if link.strength < min_strength {
                pruned.push(*target);
                false
            } else {
                true
            }
        });
        pruned
    }

    /// Strength of the link to `target`, 0 if absent.
    pub fn strength(&self, target: AgentId) -> f32 {
        self.links.get(&target).map(|l| l.strength).unwrap_or(0.0)
    }

    pub fn is_connected(&self, target: AgentId) -> bool {
        self.links.contains_key(&target)
    }

    pub fn get(&self, target: AgentId) -> Option<&CognitiveLink> {
        self.links.get(&target)
    }

    /// All links, strongest first. Equal strengths keep id order.
    pub fn sorted_by_strength(&self) -> Vec<&CognitiveLink> {
        let mut sorted: Vec<&CognitiveLink> = self.links.values().collect();
        sorted.sort_by(|a, b| b.strength.total_cmp(&a.strength));
        sorted
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    /// Mean strength over all links, 0 when there are none.
    pub fn mean_strength(&self) -> f32 {
        if self.links.is_empty() {
            return 0.0;
        }
        let sum: f32 = self.links.values().map(|l| l.strength).sum();
        sum / self.links.len() as f32
    }

    pub fn iter(&self) -> impl Iterator<Item = &CognitiveLink> {
        self.links.values()
    }

    pub fn targets(&self) -> impl Iterator<Item = AgentId> + '_ {
        self.links.keys().copied()
    }

    /// The `index`-th link in id order.
    pub fn nth(&self, index: usize) -> Option<&CognitiveLink> {
        self.links.values().nth(index)
    }

    pub fn clear(&mut self) {
        self.links.clear();
    }
}
