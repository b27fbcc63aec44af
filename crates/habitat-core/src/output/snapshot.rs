//! Snapshot Generation
//!
//! Builds read-only [`WorldSnapshot`]s from the ECS world between ticks.

use bevy_ecs::prelude::*;

use habitat_events::{FieldSnapshot, WorldSnapshot};

use crate::components::agent::AgentId;
use crate::components::field::{ResourceField, ResourceFieldSet};
use crate::components::links::CognitiveLinks;
use crate::systems::network::{graph_stats, SmallWorldBuilder};
use crate::systems::tick::SimClock;

use super::stats::StatsCollector;

/// Every agent's link map, in id order.
pub fn link_owners(world: &World) -> Vec<(AgentId, &CognitiveLinks)> {
    let mut owners: Vec<(AgentId, &CognitiveLinks)> = world
        .iter_entities()
        .filter_map(|entity| Some((*entity.get::<AgentId>()?, entity.get::<CognitiveLinks>()?)))
        .collect();
    owners.sort_by_key(|(id, _)| *id);
    owners
}

pub fn field_snapshot(field: &ResourceField) -> FieldSnapshot {
    FieldSnapshot {
        field_id: field.id.clone(),
        resource_type: field.resource_type.clone(),
        distribution: field.distribution.name().to_string(),
        center: field.center(),
        intensity: field.intensity,
        max_intensity: field.max_intensity,
        total_consumed: field.total_consumed,
        depleted: field.is_depleted(),
    }
}

/// Generate a complete world snapshot
pub fn generate_snapshot(world: &World) -> WorldSnapshot {
    let time = world
        .get_resource::<SimClock>()
        .map(|clock| clock.time)
        .unwrap_or_default();

    let bidirectional = world
        .get_resource::<SmallWorldBuilder>()
        .map_or(false, |builder| builder.config().bidirectional());

    let owners = link_owners(world);
    let graph = graph_stats(&owners, bidirectional);

    let agent_count = world
        .iter_entities()
        .filter(|entity| entity.contains::<AgentId>())
        .count();

    let fields = world
        .get_resource::<ResourceFieldSet>()
        .map(|set| set.iter().map(field_snapshot).collect())
        .unwrap_or_default();

    let totals = world
        .get_resource::<StatsCollector>()
        .map(|stats| stats.totals().clone())
        .unwrap_or_default();

    WorldSnapshot {
        time,
        agent_count,
        graph,
        fields,
        totals,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::agent::{Agent, Position};
    use crate::components::links::ConnectOptions;

    #[test]
    fn test_snapshot_of_bare_world() {
        let world = World::new();
        let snapshot = generate_snapshot(&world);

        assert_eq!(snapshot.agent_count, 0);
        assert_eq!(snapshot.graph.edge_count, 0);
        assert!(snapshot.fields.is_empty());
        assert_eq!(snapshot.time.tick, 0);
    }

    #[test]
    fn test_snapshot_collects_graph_and_fields() {
        let mut world = World::new();
        let mut fields = ResourceFieldSet::new();
        fields.insert(ResourceField::point("well", "water", 3.0, 4.0).with_intensity(0.6));
        world.insert_resource(fields);

        let mut a = CognitiveLinks::new();
        a.connect(AgentId(2), 0.0, ConnectOptions::with_strength(0.8));
        world.spawn((Agent, AgentId(1), Position::new(0.0, 0.0), a));
        world.spawn((Agent, AgentId(2), Position::new(1.0, 0.0), CognitiveLinks::new()));

        let snapshot = generate_snapshot(&world);

        assert_eq!(snapshot.agent_count, 2);
        assert_eq!(snapshot.graph.link_count, 1);
        assert!((snapshot.graph.mean_strength - 0.8).abs() < 1e-6);

        let well = snapshot.field("well").unwrap();
        assert_eq!(well.distribution, "point");
        assert_eq!(well.center, (3.0, 4.0));
        assert!((well.intensity - 0.6).abs() < 1e-6);
        assert!(!well.depleted);
    }

    #[test]
    fn test_link_owners_sorted_by_id() {
        let mut world = World::new();
        for id in [5, 1, 3] {
            world.spawn((AgentId(id), CognitiveLinks::new()));
        }
        // Agents without a link map are left out
        world.spawn(AgentId(9));

        let ids: Vec<AgentId> = link_owners(&world).into_iter().map(|(id, _)| id).collect();
        assert_eq!(ids, vec![AgentId(1), AgentId(3), AgentId(5)]);
    }
}
