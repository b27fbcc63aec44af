//! Agent Spawning
//!
//! Scatters a seeded population over the world rectangle and wires up the
//! initial small-world network.

use rand::Rng;
use std::fmt;

use crate::components::agent::{Forager, Position};
use crate::config::Config;
use crate::simulation::Simulation;
use crate::systems::network::BuildReport;

/// Uniformly random positions inside `[0, width) x [0, height)`.
/// A degenerate extent puts everyone on that axis' origin.
pub fn scatter_positions<R: Rng + ?Sized>(
    count: usize,
    width: f32,
    height: f32,
    rng: &mut R,
) -> Vec<Position> {
    let sample = |extent: f32, rng: &mut R| {
        if extent.is_finite() && extent > 0.0 {
            rng.gen_range(0.0..extent)
        } else {
            0.0
        }
    };
    (0..count)
        .map(|_| {
            let x = sample(width, rng);
            let y = sample(height, rng);
            Position::new(x, y)
        })
        .collect()
}

/// Summary of spawned agents
#[derive(Debug)]
pub struct SpawnSummary {
    pub total_agents: usize,
    pub foragers: usize,
    /// `None` when the population was too small for the configured lattice
    pub network: Option<BuildReport>,
}

impl fmt::Display for SpawnSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} agents ({} foraging)", self.total_agents, self.foragers)?;
        match &self.network {
            Some(report) => write!(
                f,
                ", {} lattice edges, {} rewired",
                report.lattice_edges,
                report.rewiring.rewired()
            ),
            None => write!(f, ", no initial network"),
        }
    }
}

/// Spawn the configured population and build the initial network. An
/// undersized population keeps its agents and simply starts unlinked.
pub fn populate(sim: &mut Simulation, config: &Config) -> SpawnSummary {
    let positions = {
        let mut rng = sim.rng_mut();
        scatter_positions(
            config.simulation.agent_count,
            config.simulation.world_width,
            config.simulation.world_height,
            &mut rng.0,
        )
    };

    let forages = config.foraging.demand_per_second > 0.0;
    for position in positions {
        if forages {
            let mut forager = Forager::new(config.foraging.demand_per_second);
            forager.resource_type = config.foraging.resource_type.clone();
            sim.spawn_forager(position, forager);
        } else {
            sim.spawn_agent(position);
        }
    }

    let network = sim.build_network(true).ok();

    SpawnSummary {
        total_agents: sim.agent_count(),
        foragers: if forages { config.simulation.agent_count } else { 0 },
        network,
    }
}
