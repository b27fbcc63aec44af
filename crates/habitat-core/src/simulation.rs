//! Simulation Orchestrator
//!
//! Owns the ECS world and the tick schedule. One call to
//! [`Simulation::step`] is one atomic simulation step; between steps callers
//! only read.

use bevy_ecs::prelude::*;
use rand::rngs::SmallRng;
use rand::SeedableRng;
use std::collections::BTreeMap;

use habitat_events::{GraphStats, SimEvent, SimTime, SimulationTotals, TickSummary, WorldSnapshot};

use crate::components::agent::{Agent, AgentId, Forager, Position, ResourceIntake};
use crate::components::field::{ResourceField, ResourceFieldSet};
use crate::components::links::{CognitiveLinks, ConnectOptions};
use crate::config::Config;
use crate::error::SimError;
use crate::output::{generate_snapshot, link_owners, StatsCollector};
use crate::setup;
use crate::systems::network::{
    average_path_length, graph_stats, BuildReport, RewireSchedule, SmallWorldBuilder,
    SmallWorldConfig,
};
use crate::systems::proximity::{
    ContactBonding, InteractionPolicy, InteractionSettings, LinkDecaySettings, ProximityPolicy,
};
use crate::systems::spatial::SpatialIndex;
use crate::systems::tick::{build_tick_schedule, SimClock, TickEvents};
use crate::SimRng;

pub struct Simulation {
    world: World,
    schedule: Schedule,
    agents: BTreeMap<AgentId, Entity>,
    next_agent_id: u32,
    last_events: Vec<SimEvent>,
}

impl Simulation {
    /// Set up every resource the tick needs. Fields that fail validation
    /// are skipped; no agents are spawned.
    pub fn new(config: &Config) -> Result<Self, SimError> {
        let index = SpatialIndex::new(config.interaction.radius)?;
        let small_world = SmallWorldConfig::new(
            config.small_world.k,
            config.small_world.p,
            config.small_world.bidirectional,
        )?;

        let mut world = World::new();
        world.insert_resource(SimClock::new());
        world.insert_resource(TickEvents::new());
        world.insert_resource(SimRng(SmallRng::seed_from_u64(config.simulation.seed)));
        world.insert_resource(index);
        world.insert_resource(InteractionSettings {
            radius: config.interaction.radius,
        });
        world.insert_resource(ProximityPolicy::new(ContactBonding {
            initial_strength: config.interaction.initial_strength,
            reinforce_amount: config.interaction.reinforce_amount,
        }));
        world.insert_resource(LinkDecaySettings {
            decay_rate: config.links.decay_rate,
            min_strength: config.links.min_strength,
        });
        world.insert_resource(RewireSchedule::every(
            config.small_world.rewire_interval,
            config.small_world.rewire_percentage,
        ));
        world.insert_resource(SmallWorldBuilder::new(small_world));

        let mut fields = ResourceFieldSet::new();
        setup::register_fields(&mut fields, &config.fields);
        world.insert_resource(fields);

        world.insert_resource(StatsCollector::new());

        Ok(Self {
            world,
            schedule: build_tick_schedule(),
            agents: BTreeMap::new(),
            next_agent_id: 0,
            last_events: Vec::new(),
        })
    }

    /// Replace the interaction policy
    pub fn with_policy(mut self, policy: impl InteractionPolicy) -> Self {
        self.world.insert_resource(ProximityPolicy::new(policy));
        self
    }

    pub fn set_rewire_schedule(&mut self, schedule: RewireSchedule) {
        self.world.insert_resource(schedule);
    }

    fn allocate_id(&mut self) -> AgentId {
        let id = AgentId(self.next_agent_id);
        self.next_agent_id += 1;
        id
    }

    /// Spawn an agent with an empty link map
    pub fn spawn_agent(&mut self, position: Position) -> AgentId {
        let id = self.allocate_id();
        let entity = self
            .world
            .spawn((Agent, id, position, CognitiveLinks::new()))
            .id();
        self.agents.insert(id, entity);
        id
    }

    /// Spawn an agent that also forages
    pub fn spawn_forager(&mut self, position: Position, forager: Forager) -> AgentId {
        let id = self.spawn_agent(position);
        if let Some(&entity) = self.agents.get(&id) {
            self.world
                .entity_mut(entity)
                .insert((forager, ResourceIntake::new()));
        }
        id
    }

    /// Remove an agent. Links other agents hold to it stay until they decay
    /// or are rewired.
    pub fn despawn_agent(&mut self, id: AgentId) -> bool {
        match self.agents.remove(&id) {
            Some(entity) => self.world.despawn(entity),
            None => false,
        }
    }

    pub fn agent_count(&self) -> usize {
        self.agents.len()
    }

    pub fn agent_ids(&self) -> impl Iterator<Item = AgentId> + '_ {
        self.agents.keys().copied()
    }

    pub fn position(&self, id: AgentId) -> Option<Position> {
        let entity = *self.agents.get(&id)?;
        self.world.get::<Position>(entity).copied()
    }

    /// Move an agent; takes effect at the next index rebuild.
    pub fn set_position(&mut self, id: AgentId, position: Position) -> bool {
        let Some(&entity) = self.agents.get(&id) else {
            return false;
        };
        match self.world.get_mut::<Position>(entity) {
            Some(mut current) => {
                *current = position;
                true
            }
            None => false,
        }
    }

    pub fn links(&self, id: AgentId) -> Option<&CognitiveLinks> {
        let entity = *self.agents.get(&id)?;
        self.world.get::<CognitiveLinks>(entity)
    }

    pub fn links_mut(&mut self, id: AgentId) -> Option<Mut<'_, CognitiveLinks>> {
        let entity = *self.agents.get(&id)?;
        self.world.get_mut::<CognitiveLinks>(entity)
    }

    /// Connect `source` to `target` at the current world time, or reinforce
    /// the existing link. A bidirectional connect writes the mirror link onto
    /// `target` as well. Returns the strength of `source`'s link, or `None`
    /// if either agent is unknown or both ids are the same.
    pub fn connect(
        &mut self,
        source: AgentId,
        target: AgentId,
        options: ConnectOptions,
    ) -> Option<f32> {
        if source == target
            || !self.agents.contains_key(&source)
            || !self.agents.contains_key(&target)
        {
            return None;
        }
        let now = self.time().seconds;

        if options.bidirectional {
            self.links_mut(target)?.connect(source, now, options);
        }
        let mut links = self.links_mut(source)?;
        let strength = links.connect(target, now, options).strength;
        Some(strength)
    }

    pub fn intake(&self, id: AgentId) -> Option<&ResourceIntake> {
        let entity = *self.agents.get(&id)?;
        self.world.get::<ResourceIntake>(entity)
    }

    /// Validate and register a field, replacing any field with the same id.
    pub fn add_field(&mut self, field: ResourceField) -> Result<Option<ResourceField>, SimError> {
        field.validate()?;
        Ok(self.world.resource_mut::<ResourceFieldSet>().insert(field))
    }

    pub fn fields(&self) -> &ResourceFieldSet {
        self.world.resource::<ResourceFieldSet>()
    }

    pub fn fields_mut(&mut self) -> Mut<'_, ResourceFieldSet> {
        self.world.resource_mut::<ResourceFieldSet>()
    }

    /// Build the small-world network over every agent with a link map, in
    /// id order. Fails before touching any link if the population is too
    /// small.
    pub fn build_network(&mut self, clear_existing: bool) -> Result<BuildReport, SimError> {
        let now = self.time().seconds;

        // Take the builder and RNG out to avoid borrow conflicts with the query
        let Some(mut builder) = self.world.remove_resource::<SmallWorldBuilder>() else {
            return Err(SimError::invalid("no small-world builder registered"));
        };
        let Some(mut rng) = self.world.remove_resource::<SimRng>() else {
            self.world.insert_resource(builder);
            return Err(SimError::invalid("no random number generator registered"));
        };

        let result = {
            let mut query = self.world.query::<(&AgentId, &mut CognitiveLinks)>();
            let mut nodes: Vec<(AgentId, Mut<CognitiveLinks>)> = query
                .iter_mut(&mut self.world)
                .map(|(id, links)| (*id, links))
                .collect();
            nodes.sort_by_key(|(id, _)| *id);
            builder.build(&mut nodes, clear_existing, now, &mut rng.0)
        };

        self.world.insert_resource(builder);
        self.world.insert_resource(rng);

        match &result {
            Ok(report) => tracing::info!(
                "Small-world network ready: {} agents, {} lattice edges, {} rewired",
                report.node_count,
                report.lattice_edges,
                report.rewiring.rewired()
            ),
            Err(e) => tracing::warn!("Small-world build rejected: {}", e),
        }
        result
    }

    /// Advance the clock by `dt` and run one tick.
    pub fn step(&mut self, dt: f32) -> TickSummary {
        self.world.resource_mut::<SimClock>().advance(dt);
        self.schedule.run(&mut self.world);

        let events = self.world.resource_mut::<TickEvents>().drain();
        let time = self.time();
        let summary = self
            .world
            .resource_mut::<StatsCollector>()
            .record_tick(time, &events);

        tracing::trace!("{} finished with {} events", time, events.len());
        self.last_events = events;
        summary
    }

    /// Run `ticks` steps of `dt` seconds each.
    pub fn run(&mut self, ticks: u64, dt: f32) -> SimulationTotals {
        for _ in 0..ticks {
            self.step(dt);
        }
        self.stats().totals().clone()
    }

    /// Events produced by the most recent step
    pub fn last_events(&self) -> &[SimEvent] {
        &self.last_events
    }

    pub fn time(&self) -> SimTime {
        self.world.resource::<SimClock>().time
    }

    pub fn stats(&self) -> &StatsCollector {
        self.world.resource::<StatsCollector>()
    }

    pub fn builder(&self) -> &SmallWorldBuilder {
        self.world.resource::<SmallWorldBuilder>()
    }

    pub fn spatial_index(&self) -> &SpatialIndex {
        self.world.resource::<SpatialIndex>()
    }

    pub fn graph_stats(&self) -> GraphStats {
        let bidirectional = self.builder().config().bidirectional();
        graph_stats(&link_owners(&self.world), bidirectional)
    }

    pub fn average_path_length(&self) -> Option<f64> {
        average_path_length(&link_owners(&self.world))
    }

    pub fn snapshot(&self) -> WorldSnapshot {
        generate_snapshot(&self.world)
    }

    pub fn rng_mut(&mut self) -> Mut<'_, SimRng> {
        self.world.resource_mut::<SimRng>()
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::systems::network::is_symmetric;

    fn quiet_config() -> Config {
        let mut config = Config::default();
        config.small_world.rewire_interval = 0;
        config.links.decay_rate = 0.0;
        config
    }

    #[test]
    fn test_rejects_invalid_small_world_config() {
        let mut config = Config::default();
        config.small_world.k = 3;
        assert!(matches!(Simulation::new(&config), Err(SimError::InvalidConfig(_))));

        // Parsed tuning goes through the same checks
        let config = Config::from_str("[small_world]\nk = 4\np = 7.5").unwrap();
        assert!(matches!(Simulation::new(&config), Err(SimError::InvalidConfig(_))));

        let mut config = Config::default();
        config.interaction.radius = 0.0;
        assert!(matches!(Simulation::new(&config), Err(SimError::InvalidConfig(_))));
    }

    #[test]
    fn test_bidirectional_connect_writes_both_sides() {
        let mut sim = Simulation::new(&quiet_config()).unwrap();
        let a = sim.spawn_agent(Position::new(0.0, 0.0));
        let b = sim.spawn_agent(Position::new(100.0, 0.0));
        let c = sim.spawn_agent(Position::new(200.0, 0.0));

        let strength = sim.connect(a, b, ConnectOptions::with_strength(0.4).mirrored());
        assert_eq!(strength, Some(0.4));
        assert_eq!(sim.links(b).unwrap().strength(a), 0.4);
        assert!(sim.links(a).unwrap().get(b).unwrap().bidirectional);
        assert!(sim.links(b).unwrap().get(a).unwrap().bidirectional);
        assert!(is_symmetric(&link_owners(sim.world())));

        // One-way connects leave the target's map alone
        sim.connect(b, c, ConnectOptions::with_strength(0.6));
        assert!(!sim.links(c).unwrap().is_connected(b));
        assert!(!is_symmetric(&link_owners(sim.world())));
    }

    #[test]
    fn test_connect_rejects_unknown_or_self() {
        let mut sim = Simulation::new(&quiet_config()).unwrap();
        let a = sim.spawn_agent(Position::new(0.0, 0.0));

        assert_eq!(sim.connect(a, a, ConnectOptions::default().mirrored()), None);
        assert_eq!(sim.connect(a, AgentId(99), ConnectOptions::default()), None);
        assert!(sim.links(a).unwrap().is_empty());
    }

    #[test]
    fn test_spawn_and_query_agents() {
        let mut sim = Simulation::new(&quiet_config()).unwrap();
        let a = sim.spawn_agent(Position::new(1.0, 2.0));
        let b = sim.spawn_forager(Position::new(3.0, 4.0), Forager::new(0.1));

        assert_eq!(a, AgentId(0));
        assert_eq!(b, AgentId(1));
        assert_eq!(sim.agent_count(), 2);
        assert_eq!(sim.position(a), Some(Position::new(1.0, 2.0)));
        assert!(sim.intake(a).is_none());
        assert!(sim.intake(b).is_some());

        assert!(sim.set_position(a, Position::new(9.0, 9.0)));
        assert_eq!(sim.position(a), Some(Position::new(9.0, 9.0)));

        assert!(sim.despawn_agent(a));
        assert!(!sim.despawn_agent(a));
        assert_eq!(sim.agent_ids().collect::<Vec<_>>(), vec![b]);
    }

    #[test]
    fn test_build_network_too_small_leaves_links_alone() {
        let mut sim = Simulation::new(&quiet_config()).unwrap();
        for i in 0..3 {
            sim.spawn_agent(Position::new(i as f32 * 1000.0, 0.0));
        }
        sim.links_mut(AgentId(0))
            .unwrap()
            .connect(AgentId(1), 0.0, ConnectOptions::default());

        let result = sim.build_network(true);

        assert_eq!(
            result,
            Err(SimError::InsufficientEntities {
                required: 5,
                available: 3
            })
        );
        assert!(sim.links(AgentId(0)).unwrap().is_connected(AgentId(1)));
        // Builder and RNG are back in place
        assert_eq!(sim.builder().config().k(), 4);
        sim.step(0.1);
    }

    #[test]
    fn test_build_network_over_population() {
        let mut config = quiet_config();
        config.small_world.p = 0.0;
        let mut sim = Simulation::new(&config).unwrap();
        for i in 0..10 {
            sim.spawn_agent(Position::new(i as f32 * 1000.0, 0.0));
        }

        let report = sim.build_network(true).unwrap();
        assert_eq!(report.lattice_edges, 20);

        let stats = sim.graph_stats();
        assert_eq!(stats.node_count, 10);
        assert_eq!(stats.edge_count, 20);
        assert_eq!(stats.link_count, 40);
        assert!((stats.clustering_coefficient - 0.5).abs() < 1e-9);
        assert!(is_symmetric(&link_owners(sim.world())));
        assert!(sim.average_path_length().is_some());
    }

    #[test]
    fn test_add_field_validates() {
        let mut sim = Simulation::new(&quiet_config()).unwrap();
        let bad = ResourceField::gradient("bad", "food", 0.0, 0.0, -1.0, 0.5);
        assert!(sim.add_field(bad).is_err());
        assert!(sim.fields().is_empty());

        let good = ResourceField::point("well", "water", 0.0, 0.0);
        assert_eq!(sim.add_field(good.clone()).unwrap(), None);
        assert_eq!(sim.add_field(good).unwrap().map(|f| f.id), Some("well".to_string()));
        assert_eq!(sim.fields().len(), 1);
    }

    #[test]
    fn test_step_advances_clock_and_records_stats() {
        let mut sim = Simulation::new(&quiet_config()).unwrap();
        sim.spawn_agent(Position::new(0.0, 0.0));
        sim.spawn_agent(Position::new(5.0, 0.0));

        let summary = sim.step(0.5);

        assert_eq!(summary.time.tick, 1);
        assert!((summary.time.seconds - 0.5).abs() < 1e-9);
        assert_eq!(summary.links_formed, 2);
        assert_eq!(sim.last_events().len(), 2);
        assert_eq!(sim.stats().totals().ticks, 1);

        let totals = sim.run(4, 0.5);
        assert_eq!(totals.ticks, 5);
        assert_eq!(totals.links_formed, 2);
        assert_eq!(sim.time().tick, 5);
    }
}
