//! ECS Systems
//!
//! Spatial indexing, proximity interactions, network rewiring, link decay
//! and resource fields, plus the tick schedule that runs them in order.

pub mod fields;
pub mod network;
pub mod proximity;
pub mod spatial;
pub mod tick;

// Re-export commonly used systems
pub use fields::{forage_nearest_fields, update_resource_fields};
pub use network::{
    average_path_length, graph_stats, is_symmetric, rewire_network, BuildReport, RewireOutcome,
    RewireReport, RewireSchedule, SmallWorldBuilder, SmallWorldConfig,
};
pub use proximity::{
    apply_proximity_interactions, decay_links, ContactBonding, InteractionPolicy,
    InteractionSettings, LinkAction, LinkDecaySettings, ProximityContact, ProximityPolicy,
};
pub use spatial::{rebuild_spatial_index, SpatialIndex};
pub use tick::{build_tick_schedule, SimClock, TickEvents};
