//! Proximity Interactions and Link Decay
//!
//! Agents that come within the interaction radius of each other get a chance
//! to form or adjust cognitive links. What a contact does is decided by an
//! injected [`InteractionPolicy`]; the kernel only applies the result to the
//! source agent's own link map.

use bevy_ecs::prelude::*;

use habitat_events::{EventKind, SimEvent};

use crate::components::agent::{AgentId, Position};
use crate::components::links::{link_constants, CognitiveLinks, ConnectOptions};
use crate::systems::spatial::SpatialIndex;
use crate::systems::tick::{SimClock, TickEvents};

/// Constants for proximity and decay defaults
pub mod proximity_constants {
    /// Distance within which two agents count as in contact
    pub const DEFAULT_INTERACTION_RADIUS: f32 = 25.0;
    /// Strength lost per second of world time
    pub const DEFAULT_DECAY_RATE: f32 = 0.01;
    /// Links weaker than this are pruned after decay
    pub const DEFAULT_MIN_STRENGTH: f32 = 0.05;
    /// Strength added per tick of sustained contact
    pub const DEFAULT_CONTACT_REINFORCEMENT: f32 = 0.02;
}

use proximity_constants::*;

/// One agent seeing another within the interaction radius.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProximityContact {
    pub source: AgentId,
    pub target: AgentId,
    pub distance: f32,
    /// Strength of the source's existing link to the target
    pub existing_strength: Option<f32>,
    /// World time of the contact
    pub now: f64,
}

/// What to do with the source's link to the contacted agent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LinkAction {
    Ignore,
    /// Create the link (or reinforce it by the fixed increment if present)
    Connect { strength: Option<f32> },
    /// Strengthen an existing link; no-op when there is none
    Reinforce { amount: Option<f32> },
    Disconnect,
}

/// Decides how a proximity contact changes the graph.
pub trait InteractionPolicy: Send + Sync + 'static {
    fn on_contact(&self, contact: &ProximityContact) -> LinkAction;
}

/// Default policy: meeting someone new forms a link, meeting them again
/// reinforces it.
#[derive(Debug, Clone, Copy)]
pub struct ContactBonding {
    pub initial_strength: f32,
    pub reinforce_amount: f32,
}

impl Default for ContactBonding {
    fn default() -> Self {
        Self {
            initial_strength: link_constants::DEFAULT_STRENGTH,
            reinforce_amount: DEFAULT_CONTACT_REINFORCEMENT,
        }
    }
}

impl InteractionPolicy for ContactBonding {
    fn on_contact(&self, contact: &ProximityContact) -> LinkAction {
        match contact.existing_strength {
            Some(_) => LinkAction::Reinforce {
                amount: Some(self.reinforce_amount),
            },
            None => LinkAction::Connect {
                strength: Some(self.initial_strength),
            },
        }
    }
}

/// Resource: the injected interaction policy
#[derive(Resource)]
pub struct ProximityPolicy(pub Box<dyn InteractionPolicy>);

impl ProximityPolicy {
    pub fn new(policy: impl InteractionPolicy) -> Self {
        Self(Box::new(policy))
    }
}

impl Default for ProximityPolicy {
    fn default() -> Self {
        Self::new(ContactBonding::default())
    }
}

/// Resource: proximity query radius
#[derive(Resource, Debug, Clone, Copy)]
pub struct InteractionSettings {
    pub radius: f32,
}

impl Default for InteractionSettings {
    fn default() -> Self {
        Self {
            radius: DEFAULT_INTERACTION_RADIUS,
        }
    }
}

/// Resource: decay parameters applied to every link map each tick
#[derive(Resource, Debug, Clone, Copy)]
pub struct LinkDecaySettings {
    pub decay_rate: f32,
    pub min_strength: f32,
}

impl Default for LinkDecaySettings {
    fn default() -> Self {
        Self {
            decay_rate: DEFAULT_DECAY_RATE,
            min_strength: DEFAULT_MIN_STRENGTH,
        }
    }
}

/// Apply one policy decision to the source's link map, returning the event
/// it produced, if any.
fn apply_action(
    links: &mut CognitiveLinks,
    contact: &ProximityContact,
    action: LinkAction,
) -> Option<EventKind> {
    match action {
        LinkAction::Ignore => None,
        LinkAction::Connect { strength } => {
            let existed = links.is_connected(contact.target);
            let link = links.connect(
                contact.target,
                contact.now,
                ConnectOptions {
                    strength,
                    bidirectional: false,
                },
            );
            (!existed).then(|| EventKind::LinkFormed {
                source: contact.source.0,
                target: contact.target.0,
                strength: link.strength,
            })
        }
        LinkAction::Reinforce { amount } => {
            links.reinforce(contact.target, contact.now, amount);
            None
        }
        LinkAction::Disconnect => links
            .disconnect(contact.target)
            .map(|_| EventKind::LinkSevered {
                source: contact.source.0,
                target: contact.target.0,
            }),
    }
}

/// System: turn this tick's proximity contacts into link changes.
/// Agents are visited in id order and neighbours arrive sorted by id.
pub fn apply_proximity_interactions(
    clock: Res<SimClock>,
    settings: Res<InteractionSettings>,
    policy: Res<ProximityPolicy>,
    index: Res<SpatialIndex>,
    mut events: ResMut<TickEvents>,
    mut query: Query<(&AgentId, &Position, &mut CognitiveLinks)>,
) {
    let mut agents: Vec<(AgentId, Position, Mut<CognitiveLinks>)> = query
        .iter_mut()
        .map(|(id, position, links)| (*id, *position, links))
        .collect();
    agents.sort_by_key(|(id, _, _)| *id);

    for (id, position, links) in agents.iter_mut() {
        let nearby = index.query_with_distance(position.x, position.y, settings.radius, Some(*id));
        for (target, distance) in nearby {
            let contact = ProximityContact {
                source: *id,
                target,
                distance,
                existing_strength: links.get(target).map(|l| l.strength),
                now: clock.now(),
            };
            let action = policy.0.on_contact(&contact);
            if let Some(kind) = apply_action(links, &contact, action) {
                events.push(SimEvent::new(clock.time, kind));
            }
        }
    }
}

/// System: weaken every link by elapsed time and prune the weak ones
pub fn decay_links(
    clock: Res<SimClock>,
    settings: Res<LinkDecaySettings>,
    mut events: ResMut<TickEvents>,
    mut query: Query<(&AgentId, &mut CognitiveLinks)>,
) {
    let mut agents: Vec<(AgentId, Mut<CognitiveLinks>)> =
        query.iter_mut().map(|(id, links)| (*id, links)).collect();
    agents.sort_by_key(|(id, _)| *id);

    for (id, links) in agents.iter_mut() {
        if links.is_empty() {
            continue;
        }
        let pruned = links.decay(clock.dt, settings.decay_rate, settings.min_strength);
        for target in pruned {
            events.push(SimEvent::new(
                clock.time,
                EventKind::LinkPruned {
                    source: id.0,
                    target: target.0,
                },
            ));
        }
    }
}
