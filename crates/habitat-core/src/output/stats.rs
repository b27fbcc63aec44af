//! Statistics Output
//!
//! Folds each tick's events into running totals and a bounded history of
//! per-tick summaries.

use bevy_ecs::prelude::*;
use std::collections::{BTreeMap, VecDeque};

use habitat_events::{EventKind, SimEvent, SimTime, SimulationTotals, TickSummary};

/// Ticks of history kept by default
pub const DEFAULT_HISTORY_LIMIT: usize = 1000;

/// Summarize one tick's events.
pub fn summarize_tick(time: SimTime, events: &[SimEvent]) -> TickSummary {
    let mut summary = TickSummary {
        time,
        event_count: events.len(),
        ..Default::default()
    };

    for event in events {
        match &event.kind {
            EventKind::LinkFormed { .. } => summary.links_formed += 1,
            EventKind::LinkPruned { .. } => summary.links_pruned += 1,
            EventKind::EdgeRewired { .. } => summary.edges_rewired += 1,
            EventKind::RewireFailed { .. } => summary.rewire_failures += 1,
            EventKind::ResourceConsumed { amount, .. } => summary.resource_consumed += amount,
            EventKind::LinkSevered { .. } | EventKind::FieldDepleted { .. } => {}
        }
    }
    summary
}

/// Resource to accumulate statistics during simulation
#[derive(Resource, Debug, Clone)]
pub struct StatsCollector {
    totals: SimulationTotals,
    events_by_type: BTreeMap<&'static str, u64>,
    history: VecDeque<TickSummary>,
    history_limit: usize,
}

impl Default for StatsCollector {
    fn default() -> Self {
        Self::with_history_limit(DEFAULT_HISTORY_LIMIT)
    }
}

impl StatsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_history_limit(history_limit: usize) -> Self {
        Self {
            totals: SimulationTotals::default(),
            events_by_type: BTreeMap::new(),
            history: VecDeque::new(),
            history_limit,
        }
    }

    /// Record events from a tick, returning its summary
    pub fn record_tick(&mut self, time: SimTime, events: &[SimEvent]) -> TickSummary {
        for event in events {
            *self.events_by_type.entry(event.kind.name()).or_insert(0) += 1;
            match &event.kind {
                EventKind::LinkSevered { .. } => self.totals.links_severed += 1,
                EventKind::FieldDepleted { .. } => self.totals.fields_depleted += 1,
                _ => {}
            }
        }

        let summary = summarize_tick(time, events);
        self.totals.ticks += 1;
        self.totals.links_formed += summary.links_formed as u64;
        self.totals.links_pruned += summary.links_pruned as u64;
        self.totals.edges_rewired += summary.edges_rewired as u64;
        self.totals.rewire_failures += summary.rewire_failures as u64;
        self.totals.resource_consumed += f64::from(summary.resource_consumed);

        if self.history_limit > 0 {
            if self.history.len() == self.history_limit {
                self.history.pop_front();
            }
            self.history.push_back(summary.clone());
        }
        summary
    }

    pub fn totals(&self) -> &SimulationTotals {
        &self.totals
    }

    /// Most recent tick summaries, oldest first
    pub fn history(&self) -> impl Iterator<Item = &TickSummary> {
        self.history.iter()
    }

    /// Number of recorded events with the given kind name
    pub fn event_count(&self, name: &str) -> u64 {
        self.events_by_type.get(name).copied().unwrap_or(0)
    }

    pub fn total_events(&self) -> u64 {
        self.events_by_type.values().sum()
    }

    pub fn average_events_per_tick(&self) -> f64 {
        if self.totals.ticks == 0 {
            0.0
        } else {
            self.total_events() as f64 / self.totals.ticks as f64
        }
    }
}
