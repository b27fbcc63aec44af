//! Habitat headless runner
//!
//! Loads tuning, spawns a seeded population over the configured fields,
//! builds the initial small-world network and runs the tick loop, reporting
//! progress through tracing.

use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;

use habitat_core::config::Config;
use habitat_core::setup;
use habitat_core::Simulation;

/// Command line arguments for the simulation
#[derive(Parser, Debug)]
#[command(name = "habitat")]
#[command(about = "Tick-driven multi-agent spatial simulation kernel")]
struct Args {
    /// Tuning file; falls back to ./tuning.toml, then built-in defaults
    #[arg(long)]
    config: Option<PathBuf>,

    /// Random seed for reproducibility
    #[arg(long)]
    seed: Option<u64>,

    /// Number of ticks to simulate
    #[arg(long)]
    ticks: Option<u64>,

    /// Seconds of world time per tick
    #[arg(long)]
    dt: Option<f32>,

    /// Number of agents to spawn
    #[arg(long)]
    agents: Option<usize>,

    /// Ticks between progress reports (0 disables them)
    #[arg(long)]
    report_interval: Option<u64>,

    /// Print the final world snapshot as JSON on stdout
    #[arg(long)]
    json: bool,
}

impl Args {
    fn apply_to(&self, config: &mut Config) {
        let sim = &mut config.simulation;
        if let Some(seed) = self.seed {
            sim.seed = seed;
        }
        if let Some(ticks) = self.ticks {
            sim.ticks = ticks;
        }
        if let Some(dt) = self.dt {
            sim.dt = dt;
        }
        if let Some(agents) = self.agents {
            sim.agent_count = agents;
        }
        if let Some(interval) = self.report_interval {
            sim.report_interval = interval;
        }
    }
}

fn main() -> ExitCode {
    // Logs go to stderr so --json output stays clean
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => match Config::load(path) {
            Ok(config) => config,
            Err(e) => {
                tracing::error!("Could not load {}: {}", path.display(), e);
                return ExitCode::FAILURE;
            }
        },
        None => Config::load_or_default(),
    };
    args.apply_to(&mut config);

    let mut sim = match Simulation::new(&config) {
        Ok(sim) => sim,
        Err(e) => {
            tracing::error!("Could not start simulation: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let sim_config = &config.simulation;
    tracing::info!(
        "Habitat: seed {}, {} ticks of {}s, {} fields",
        sim_config.seed,
        sim_config.ticks,
        sim_config.dt,
        sim.fields().len()
    );

    let summary = setup::populate(&mut sim, &config);
    tracing::info!("Spawned {}", summary);

    for _ in 0..sim_config.ticks {
        let tick = sim.step(sim_config.dt);

        let interval = sim_config.report_interval;
        if interval > 0 && tick.time.tick % interval == 0 {
            let graph = sim.graph_stats();
            tracing::info!(
                "[{}] {} events, {} edges, degree {:.2}, clustering {:.3}",
                tick.time,
                tick.event_count,
                graph.edge_count,
                graph.average_degree,
                graph.clustering_coefficient
            );
        }
    }

    let totals = sim.stats().totals();
    tracing::info!(
        "Simulation complete: {} ticks, {} links formed, {} pruned, {} rewired ({} failed), {:.3} consumed",
        totals.ticks,
        totals.links_formed,
        totals.links_pruned,
        totals.edges_rewired,
        totals.rewire_failures,
        totals.resource_consumed
    );
    if let Some(length) = sim.average_path_length() {
        tracing::info!("Average path length {:.3}", length);
    }

    if args.json {
        match sim.snapshot().to_json() {
            Ok(json) => println!("{}", json),
            Err(e) => {
                tracing::error!("Could not serialize snapshot: {}", e);
                return ExitCode::FAILURE;
            }
        }
    }

    ExitCode::SUCCESS
}
