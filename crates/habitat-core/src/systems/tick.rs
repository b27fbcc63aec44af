//! Tick Resources and Schedule
//!
//! The clock every system reads, the per-tick event buffer, and the fixed
//! system order that makes up one simulation step.

use bevy_ecs::prelude::*;
use bevy_ecs::schedule::ExecutorKind;

use habitat_events::{SimEvent, SimTime};

use super::fields::{forage_nearest_fields, update_resource_fields};
use super::network::rewire_network;
use super::proximity::{apply_proximity_interactions, decay_links};
use super::spatial::rebuild_spatial_index;

/// Resource: world time and the step currently being simulated
#[derive(Resource, Debug, Clone, Copy, Default)]
pub struct SimClock {
    pub time: SimTime,
    /// Elapsed seconds for the current tick; never negative
    pub dt: f32,
}

impl SimClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start the next tick. Non-finite or negative `dt` counts as zero
    /// elapsed time.
    pub fn advance(&mut self, dt: f32) {
        self.dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };
        self.time.advance(self.dt);
    }

    pub fn tick(&self) -> u64 {
        self.time.tick
    }

    pub fn now(&self) -> f64 {
        self.time.seconds
    }
}

/// Resource: events produced during the current tick
#[derive(Resource, Debug, Default)]
pub struct TickEvents {
    pub events: Vec<SimEvent>,
}

impl TickEvents {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: SimEvent) {
        self.events.push(event);
    }

    pub fn drain(&mut self) -> Vec<SimEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Number of buffered events of the given kind name
    pub fn count(&self, name: &str) -> usize {
        self.events.iter().filter(|e| e.kind.name() == name).count()
    }
}

/// One simulation step, in order:
/// index rebuild, proximity contacts, rewiring, link decay, field update,
/// foraging.
pub fn build_tick_schedule() -> Schedule {
    let mut schedule = Schedule::default();
    schedule.set_executor_kind(ExecutorKind::SingleThreaded);
    schedule.add_systems(
        (
            rebuild_spatial_index,
            apply_proximity_interactions,
            rewire_network,
            decay_links,
            update_resource_fields,
            forage_nearest_fields,
        )
            .chain(),
    );
    schedule
}

#[cfg(test)]
mod tests {
    use super::*;
    use habitat_events::EventKind;

    #[test]
    fn test_clock_sanitizes_dt() {
        let mut clock = SimClock::new();
        clock.advance(0.5);
        clock.advance(-1.0);
        assert_eq!(clock.dt, 0.0);
        clock.advance(f32::NAN);
        clock.advance(0.25);

        assert_eq!(clock.tick(), 4);
        assert!((clock.now() - 0.75).abs() < 1e-9);
    }

    #[test]
    fn test_tick_events_count_and_drain() {
        let mut events = TickEvents::new();
        let time = SimTime::new(1, 0.1);
        events.push(SimEvent::new(time, EventKind::LinkPruned { source: 1, target: 2 }));
        events.push(SimEvent::new(time, EventKind::LinkPruned { source: 2, target: 1 }));
        events.push(SimEvent::new(
            time,
            EventKind::FieldDepleted {
                field_id: "well".into(),
            },
        ));

        assert_eq!(events.count("link_pruned"), 2);
        assert_eq!(events.count("field_depleted"), 1);
        assert_eq!(events.drain().len(), 3);
        assert!(events.is_empty());
    }
}
