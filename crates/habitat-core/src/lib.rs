//! Habitat Simulation Kernel
//!
//! A tick-driven kernel for positioned agents: a uniform-grid proximity
//! index, weighted cognitive links between agents, a Watts–Strogatz
//! small-world builder, and depletable resource fields, all stepped in a
//! fixed order by [`Simulation`].

use bevy_ecs::prelude::*;
use rand::rngs::SmallRng;

pub mod components;
pub mod config;
pub mod error;
pub mod output;
pub mod setup;
pub mod simulation;
pub mod systems;

pub use components::*;
pub use config::{Config, ConfigError};
pub use error::SimError;
pub use simulation::Simulation;

/// Seeded random number generator resource
#[derive(Resource)]
pub struct SimRng(pub SmallRng);
