//! Small-World Network
//!
//! Builds the cognitive graph as a Watts–Strogatz small world (ring lattice
//! plus random rewiring) and keeps it from freezing by periodically rewiring
//! a fraction of its edges.
//!
//! Every operation here works over a slice of [`LinkOwner`]s in a fixed
//! order, so the same seed always produces the same graph. In a
//! bidirectional network each edge is stored as two directed links, and all
//! writes and removals touch both of them.

use bevy_ecs::prelude::*;
use rand::Rng;
use std::collections::{BTreeSet, HashMap, VecDeque};

use habitat_events::{EventKind, GraphStats, SimEvent};

use crate::components::agent::{AgentId, LinkOwner, LinkOwnerMut};
use crate::components::links::{CognitiveLinks, ConnectOptions};
use crate::error::SimError;
use crate::systems::tick::{SimClock, TickEvents};
use crate::SimRng;

/// Constants for network maintenance
pub mod network_constants {
    /// Attempts at finding a fresh target before a rewire gives up
    pub const MAX_REWIRE_ATTEMPTS: usize = 10;
    /// Default fraction of edges touched by periodic rewiring
    pub const DEFAULT_REWIRE_PERCENTAGE: f64 = 0.1;
}

use network_constants::*;

/// Validated Watts–Strogatz parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SmallWorldConfig {
    k: usize,
    p: f64,
    bidirectional: bool,
}

impl SmallWorldConfig {
    /// `k` must be even and at least 2; `p` must lie in [0, 1].
    pub fn new(k: usize, p: f64, bidirectional: bool) -> Result<Self, SimError> {
        if k < 2 {
            return Err(SimError::invalid(format!("k must be at least 2, got {}", k)));
        }
        if k % 2 != 0 {
            return Err(SimError::invalid(format!("k must be even, got {}", k)));
        }
        if !(0.0..=1.0).contains(&p) {
            return Err(SimError::invalid(format!("p must be within [0, 1], got {}", p)));
        }
        Ok(Self { k, p, bidirectional })
    }

    /// Target degree before rewiring
    pub fn k(&self) -> usize {
        self.k
    }

    /// Rewiring probability
    pub fn p(&self) -> f64 {
        self.p
    }

    pub fn bidirectional(&self) -> bool {
        self.bidirectional
    }
}

/// Result of a single rewiring attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RewireOutcome {
    Rewired {
        source: AgentId,
        old_target: AgentId,
        new_target: AgentId,
    },
    /// No valid target within the attempt budget; the edge was left alone
    Failed { source: AgentId, target: AgentId },
}

impl RewireOutcome {
    pub fn to_event_kind(self) -> EventKind {
        match self {
            RewireOutcome::Rewired {
                source,
                old_target,
                new_target,
            } => EventKind::EdgeRewired {
                source: source.0,
                old_target: old_target.0,
                new_target: new_target.0,
            },
            RewireOutcome::Failed { source, target } => EventKind::RewireFailed {
                source: source.0,
                target: target.0,
            },
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RewireReport {
    /// Edges selected for rewiring
    pub attempted: usize,
    /// Selections that landed on an agent without links
    pub skipped: usize,
    pub outcomes: Vec<RewireOutcome>,
}

impl RewireReport {
    pub fn rewired(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, RewireOutcome::Rewired { .. }))
            .count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, RewireOutcome::Failed { .. }))
            .count()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildReport {
    pub node_count: usize,
    pub lattice_edges: usize,
    pub rewiring: RewireReport,
}

fn index_by_id<N: LinkOwner>(nodes: &[N]) -> HashMap<AgentId, usize> {
    nodes
        .iter()
        .enumerate()
        .map(|(index, node)| (node.agent_id(), index))
        .collect()
}

fn connected<N: LinkOwner>(nodes: &[N], a: usize, b: usize) -> bool {
    nodes[a].links().is_connected(nodes[b].agent_id())
        || nodes[b].links().is_connected(nodes[a].agent_id())
}

/// Every edge as `(source index, target id)`, in node then target order.
/// Mirrored pairs are listed once when bidirectional; dangling links are left
/// out.
fn existing_edges<N: LinkOwner>(
    nodes: &[N],
    lookup: &HashMap<AgentId, usize>,
    bidirectional: bool,
) -> Vec<(usize, AgentId)> {
    let mut edges = Vec::new();
    for (source, node) in nodes.iter().enumerate() {
        let source_id = node.agent_id();
        for target in node.links().targets() {
            let Some(&target_index) = lookup.get(&target) else {
                continue;
            };
            let mirror = bidirectional && nodes[target_index].links().is_connected(source_id);
            if !mirror || source < target_index {
                edges.push((source, target));
            }
        }
    }
    edges
}

/// Resource: builds and maintains the small-world topology
#[derive(Resource, Debug, Clone)]
pub struct SmallWorldBuilder {
    config: SmallWorldConfig,
    failed_rewires: u64,
}

impl SmallWorldBuilder {
    pub fn new(config: SmallWorldConfig) -> Self {
        Self {
            config,
            failed_rewires: 0,
        }
    }

    pub fn config(&self) -> &SmallWorldConfig {
        &self.config
    }

    /// Rewires abandoned because no valid target turned up, over the
    /// builder's lifetime
    pub fn failed_rewires(&self) -> u64 {
        self.failed_rewires
    }

    /// Build a ring lattice over `nodes` (in slice order) and rewire each
    /// existing edge with probability p.
    ///
    /// Fails without touching any link if there are fewer than k + 1 nodes.
    pub fn build<N, R>(
        &mut self,
        nodes: &mut [N],
        clear_existing: bool,
        now: f64,
        rng: &mut R,
    ) -> Result<BuildReport, SimError>
    where
        N: LinkOwnerMut,
        R: Rng + ?Sized,
    {
        let n = nodes.len();
        let k = self.config.k;
        if n < k + 1 {
            return Err(SimError::InsufficientEntities {
                required: k + 1,
                available: n,
            });
        }

        if clear_existing {
            for node in nodes.iter_mut() {
                node.links_mut().clear();
            }
        }

        // Ring lattice: each node reaches forward to its k/2 index neighbours
        let half = k / 2;
        let mut lattice = Vec::with_capacity(n * half);
        for source in 0..n {
            for step in 1..=half {
                let target = (source + step) % n;
                self.link(nodes, source, target, now);
                lattice.push((source, target));
            }
        }

        // Rewiring covers every edge present after the lattice pass, including
        // links kept from before the build
        let lookup = index_by_id(nodes);
        let edges = existing_edges(nodes, &lookup, self.config.bidirectional);
        let mut rewiring = RewireReport::default();
        for (source, old_target) in edges {
            if rng.gen::<f64>() >= self.config.p {
                continue;
            }
            rewiring.attempted += 1;
            let outcome = self.rewire_edge(nodes, &lookup, source, old_target, now, rng);
            rewiring.outcomes.push(outcome);
        }

        tracing::debug!(
            "Built small-world network: {} nodes, {} lattice edges, {} rewired, {} failed",
            n,
            lattice.len(),
            rewiring.rewired(),
            rewiring.failed()
        );

        Ok(BuildReport {
            node_count: n,
            lattice_edges: lattice.len(),
            rewiring,
        })
    }

    /// Move `floor(edge_count * percentage)` randomly chosen edges to new
    /// random targets. Picks that land on an agent without links, or on a
    /// link to an agent outside `nodes`, are skipped.
    pub fn rewire<N, R>(
        &mut self,
        nodes: &mut [N],
        percentage: f64,
        now: f64,
        rng: &mut R,
    ) -> RewireReport
    where
        N: LinkOwnerMut,
        R: Rng + ?Sized,
    {
        let mut report = RewireReport::default();
        let n = nodes.len();
        if n < 2 || !percentage.is_finite() {
            return report;
        }

        let total = self.edge_count(nodes);
        let count = (total as f64 * percentage.clamp(0.0, 1.0)).floor() as usize;
        let lookup = index_by_id(nodes);

        for _ in 0..count {
            let source = rng.gen_range(0..n);
            let degree = nodes[source].links().len();
            if degree == 0 {
                report.skipped += 1;
                continue;
            }
            let pick = rng.gen_range(0..degree);
            let Some(old_target) = nodes[source].links().nth(pick).map(|l| l.target) else {
                report.skipped += 1;
                continue;
            };
            // Links to agents outside `nodes` are left to decay
            if !lookup.contains_key(&old_target) {
                report.skipped += 1;
                continue;
            }

            report.attempted += 1;
            let outcome = self.rewire_edge(nodes, &lookup, source, old_target, now, rng);
            report.outcomes.push(outcome);
        }

        report
    }

    /// Connect `a` to `b`, mirrored when the network is bidirectional.
    fn link<N: LinkOwnerMut>(&self, nodes: &mut [N], a: usize, b: usize, now: f64) {
        let options = ConnectOptions {
            strength: None,
            bidirectional: self.config.bidirectional,
        };
        let a_id = nodes[a].agent_id();
        let b_id = nodes[b].agent_id();
        nodes[a].links_mut().connect(b_id, now, options);
        if self.config.bidirectional {
            nodes[b].links_mut().connect(a_id, now, options);
        }
    }

    fn rewire_edge<N, R>(
        &mut self,
        nodes: &mut [N],
        lookup: &HashMap<AgentId, usize>,
        source: usize,
        old_target: AgentId,
        now: f64,
        rng: &mut R,
    ) -> RewireOutcome
    where
        N: LinkOwnerMut,
        R: Rng + ?Sized,
    {
        let source_id = nodes[source].agent_id();
        let n = nodes.len();

        let mut candidate = None;
        for _ in 0..MAX_REWIRE_ATTEMPTS {
            let pick = rng.gen_range(0..n);
            if pick != source && !connected(nodes, source, pick) {
                candidate = Some(pick);
                break;
            }
        }

        let Some(new_index) = candidate else {
            self.failed_rewires += 1;
            tracing::trace!("Rewire of {} -> {} found no free target", source_id, old_target);
            return RewireOutcome::Failed {
                source: source_id,
                target: old_target,
            };
        };

        nodes[source].links_mut().disconnect(old_target);
        if self.config.bidirectional {
            if let Some(&old_index) = lookup.get(&old_target) {
                nodes[old_index].links_mut().disconnect(source_id);
            }
        }
        self.link(nodes, source, new_index, now);

        RewireOutcome::Rewired {
            source: source_id,
            old_target,
            new_target: nodes[new_index].agent_id(),
        }
    }

    /// Number of edges; mirrored pairs count once when bidirectional.
    pub fn edge_count<N: LinkOwner>(&self, nodes: &[N]) -> usize {
        let links: usize = nodes.iter().map(|node| node.links().len()).sum();
        if self.config.bidirectional {
            links / 2
        } else {
            links
        }
    }

    /// Snapshot of node/edge counts, degree and clustering.
    pub fn stats<N: LinkOwner>(&self, nodes: &[N]) -> GraphStats {
        graph_stats(nodes, self.config.bidirectional)
    }
}

/// Undirected neighbour sets: a peer counts once whichever side holds the link.
/// Links to ids outside `nodes` are ignored.
fn neighbour_sets<N: LinkOwner>(nodes: &[N]) -> Vec<BTreeSet<usize>> {
    let lookup = index_by_id(nodes);
    let mut sets = vec![BTreeSet::new(); nodes.len()];
    for (index, node) in nodes.iter().enumerate() {
        for target in node.links().targets() {
            if let Some(&other) = lookup.get(&target) {
                if other != index {
                    sets[index].insert(other);
                    sets[other].insert(index);
                }
            }
        }
    }
    sets
}

/// Graph statistics over `nodes`.
///
/// Degree is the number of distinct connected peers. Clustering is averaged
/// over nodes with degree >= 2 only; nodes below that are left out rather
/// than counted as zero.
pub fn graph_stats<N: LinkOwner>(nodes: &[N], bidirectional: bool) -> GraphStats {
    let node_count = nodes.len();
    let link_count: usize = nodes.iter().map(|node| node.links().len()).sum();
    let edge_count = if bidirectional {
        link_count / 2
    } else {
        link_count
    };

    let sets = neighbour_sets(nodes);

    let average_degree = if node_count == 0 {
        0.0
    } else {
        sets.iter().map(|s| s.len()).sum::<usize>() as f64 / node_count as f64
    };

    let mut clustering_sum = 0.0;
    let mut clustered_nodes = 0usize;
    for neighbours in &sets {
        let degree = neighbours.len();
        if degree < 2 {
            continue;
        }
        let members: Vec<usize> = neighbours.iter().copied().collect();
        let mut closed = 0usize;
        for (i, &a) in members.iter().enumerate() {
            for &b in &members[i + 1..] {
                if sets[a].contains(&b) {
                    closed += 1;
                }
            }
        }
        let possible = degree * (degree - 1) / 2;
        clustering_sum += closed as f64 / possible as f64;
        clustered_nodes += 1;
    }
    let clustering_coefficient = if clustered_nodes == 0 {
        0.0
    } else {
        clustering_sum / clustered_nodes as f64
    };

    let strength_sum: f64 = nodes
        .iter()
        .flat_map(|node| node.links().iter())
        .map(|link| f64::from(link.strength))
        .sum();
    let mean_strength = if link_count == 0 {
        0.0
    } else {
        strength_sum / link_count as f64
    };

    GraphStats {
        node_count,
        edge_count,
        link_count,
        average_degree,
        clustering_coefficient,
        mean_strength,
    }
}

/// Mean shortest-path hop count over all ordered pairs that can reach each
/// other. `None` when no such pair exists.
pub fn average_path_length<N: LinkOwner>(nodes: &[N]) -> Option<f64> {
    let sets = neighbour_sets(nodes);
    let n = sets.len();
    let mut total = 0u64;
    let mut pairs = 0u64;

    let mut distance = vec![usize::MAX; n];
    let mut queue = VecDeque::new();
    for start in 0..n {
        distance.iter_mut().for_each(|d| *d = usize::MAX);
        distance[start] = 0;
        queue.push_back(start);
        while let Some(current) = queue.pop_front() {
            for &next in &sets[current] {
                if distance[next] == usize::MAX {
                    distance[next] = distance[current] + 1;
                    total += distance[next] as u64;
                    pairs += 1;
                    queue.push_back(next);
                }
            }
        }
    }

    if pairs == 0 {
        None
    } else {
        Some(total as f64 / pairs as f64)
    }
}

/// True when every link between two agents in `nodes` has its mirror.
pub fn is_symmetric<N: LinkOwner>(nodes: &[N]) -> bool {
    let lookup = index_by_id(nodes);
    nodes.iter().all(|node| {
        node.links().targets().all(|target| match lookup.get(&target) {
            Some(&other) => nodes[other].links().is_connected(node.agent_id()),
            None => true,
        })
    })
}

/// Resource: cadence for periodic rewiring
#[derive(Resource, Debug, Clone)]
pub struct RewireSchedule {
    /// Ticks between rewiring passes; 0 disables rewiring
    pub interval_ticks: u64,
    /// Fraction of edges touched per pass
    pub percentage: f64,
}

impl Default for RewireSchedule {
    fn default() -> Self {
        Self {
            interval_ticks: 0,
            percentage: DEFAULT_REWIRE_PERCENTAGE,
        }
    }
}

impl RewireSchedule {
    pub fn every(interval_ticks: u64, percentage: f64) -> Self {
        Self {
            interval_ticks,
            percentage,
        }
    }

    /// Check if a rewiring pass is due on this tick
    pub fn is_due(&self, tick: u64) -> bool {
        self.interval_ticks > 0 && tick > 0 && tick % self.interval_ticks == 0
    }
}

/// System: periodic rewiring of the cognitive graph
pub fn rewire_network(
    clock: Res<SimClock>,
    schedule: Res<RewireSchedule>,
    mut builder: ResMut<SmallWorldBuilder>,
    mut rng: ResMut<SimRng>,
    mut events: ResMut<TickEvents>,
    mut query: Query<(&AgentId, &mut CognitiveLinks)>,
) {
    if !schedule.is_due(clock.time.tick) {
        return;
    }

    let mut nodes: Vec<(AgentId, Mut<CognitiveLinks>)> =
        query.iter_mut().map(|(id, links)| (*id, links)).collect();
    nodes.sort_by_key(|(id, _)| *id);

    let report = builder.rewire(&mut nodes, schedule.percentage, clock.time.seconds, &mut rng.0);

    if report.failed() > 0 {
        tracing::debug!(
            "Rewire pass at tick {}: {} rewired, {} gave up",
            clock.time.tick,
            report.rewired(),
            report.failed()
        );
    }

    for outcome in report.outcomes {
        events.push(SimEvent::new(clock.time, outcome.to_event_kind()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    fn population(n: u32) -> Vec<(AgentId, CognitiveLinks)> {
        (0..n).map(|i| (AgentId(i), CognitiveLinks::new())).collect()
    }

    fn builder(k: usize, p: f64, bidirectional: bool) -> SmallWorldBuilder {
        SmallWorldBuilder::new(SmallWorldConfig::new(k, p, bidirectional).unwrap())
    }

    fn expected_lattice_clustering(k: usize) -> f64 {
        let k = k as f64;
        3.0 * (k - 2.0) / (4.0 * (k - 1.0))
    }

    #[test]
    fn test_config_validation() {
        assert!(SmallWorldConfig::new(4, 0.1, true).is_ok());
        for (k, p) in [(0, 0.1), (1, 0.1), (3, 0.1), (4, -0.01), (4, 1.01), (4, f64::NAN)] {
            assert!(
                matches!(SmallWorldConfig::new(k, p, true), Err(SimError::InvalidConfig(_))),
                "k={} p={} should be rejected",
                k,
                p
            );
        }
    }

    #[test]
    fn test_insufficient_entities_leaves_state_untouched() {
        let mut nodes = population(4);
        nodes[0].1.connect(AgentId(1), 0.0, ConnectOptions::default());
        let before = nodes.clone();

        let mut rng = SmallRng::seed_from_u64(1);
        let result = builder(4, 0.5, true).build(&mut nodes, true, 0.0, &mut rng);

        assert_eq!(
            result,
            Err(SimError::InsufficientEntities {
                required: 5,
                available: 4
            })
        );
        assert_eq!(nodes, before);
    }

    #[test]
    fn test_ring_lattice_ten_nodes_directed() {
        let mut nodes = population(10);
        let mut rng = SmallRng::seed_from_u64(3);
        let mut b = builder(4, 0.0, false);
        let report = b.build(&mut nodes, true, 0.0, &mut rng).unwrap();

        assert_eq!(report.lattice_edges, 20);
        assert_eq!(report.rewiring.attempted, 0);

        let targets: Vec<AgentId> = nodes[0].1.targets().collect();
        assert_eq!(targets, vec![AgentId(1), AgentId(2)]);

        let sets = neighbour_sets(&nodes);
        assert_eq!(
            sets[0].iter().copied().collect::<Vec<_>>(),
            vec![1, 2, 8, 9]
        );

        let stats = b.stats(&nodes);
        assert_eq!(stats.link_count, 20);
        assert_eq!(stats.edge_count, 20);
        assert!((stats.average_degree - 4.0).abs() < 1e-12);
        assert!((stats.mean_strength - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_ring_lattice_ten_nodes_bidirectional() {
        let mut nodes = population(10);
        let mut rng = SmallRng::seed_from_u64(3);
        let mut b = builder(4, 0.0, true);
        b.build(&mut nodes, true, 0.0, &mut rng).unwrap();

        for (id, links) in &nodes {
            assert_eq!(links.len(), 4, "{} should hold four links", id);
            let i = id.0;
            for offset in [1, 2, 8, 9] {
                assert!(links.is_connected(AgentId((i + offset) % 10)));
            }
            assert!(links.iter().all(|l| l.bidirectional));
        }

        let stats = b.stats(&nodes);
        assert_eq!(stats.link_count, 40);
        assert_eq!(stats.edge_count, 20);
        assert!(is_symmetric(&nodes));
    }

    #[test]
    fn test_lattice_degree_is_k_for_any_valid_size() {
        for k in [2usize, 4, 6] {
            for n in (k as u32 + 1)..(k as u32 + 12) {
                let mut nodes = population(n);
                let mut rng = SmallRng::seed_from_u64(n as u64);
                builder(k, 0.0, true).build(&mut nodes, true, 0.0, &mut rng).unwrap();
                for degree in neighbour_sets(&nodes).iter().map(|s| s.len()) {
                    assert_eq!(degree, k, "n={} k={}", n, k);
                }
            }
        }
    }

    #[test]
    fn test_lattice_clustering_matches_analytic_value() {
        for k in [4usize, 6, 8] {
            let mut nodes = population(60);
            let mut rng = SmallRng::seed_from_u64(11);
            let stats = {
                let mut b = builder(k, 0.0, false);
                b.build(&mut nodes, true, 0.0, &mut rng).unwrap();
                b.stats(&nodes)
            };
            assert!(
                (stats.clustering_coefficient - expected_lattice_clustering(k)).abs() < 1e-9,
                "k={} got {}",
                k,
                stats.clustering_coefficient
            );
        }
        // k = 4 -> 3 * 2 / (4 * 3)
        assert!((expected_lattice_clustering(4) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_full_rewiring_lowers_clustering_and_keeps_symmetry() {
        let mut lattice = population(100);
        let mut rewired = population(100);
        let mut rng = SmallRng::seed_from_u64(5);

        let mut ordered = builder(6, 0.0, true);
        ordered.build(&mut lattice, true, 0.0, &mut rng).unwrap();
        let mut random = builder(6, 1.0, true);
        let report = random.build(&mut rewired, true, 0.0, &mut rng).unwrap();

        assert_eq!(report.rewiring.attempted, 300);
        assert!(report.rewiring.rewired() > 250);
        assert!(is_symmetric(&rewired));

        let c_lattice = ordered.stats(&lattice).clustering_coefficient;
        let c_random = random.stats(&rewired).clustering_coefficient;
        assert!(c_random < c_lattice / 2.0);
        // edges are moved, never duplicated or lost
        assert_eq!(random.stats(&rewired).edge_count, 300);
    }

    #[test]
    fn test_rewire_counts_and_symmetry() {
        let mut nodes = population(30);
        let mut rng = SmallRng::seed_from_u64(8);
        let mut b = builder(4, 0.0, true);
        b.build(&mut nodes, true, 0.0, &mut rng).unwrap();

        let report = b.rewire(&mut nodes, 0.1, 1.0, &mut rng);
        // 60 edges * 0.1
        assert_eq!(report.attempted + report.skipped, 6);
        assert!(is_symmetric(&nodes));
        assert_eq!(b.edge_count(&nodes), 60);
    }

    #[test]
    fn test_rewire_fails_silently_when_graph_is_complete() {
        // Complete graph on 5 nodes: no valid new target exists
        let mut nodes = population(5);
        let mut rng = SmallRng::seed_from_u64(2);
        let mut b = builder(4, 0.0, true);
        b.build(&mut nodes, true, 0.0, &mut rng).unwrap();
        let before = nodes.clone();

        let report = b.rewire(&mut nodes, 0.5, 1.0, &mut rng);

        assert_eq!(report.attempted, 5);
        assert_eq!(report.failed(), 5);
        assert_eq!(b.failed_rewires(), 5);
        assert_eq!(nodes, before);
    }

    #[test]
    fn test_rewire_skips_dangling_links() {
        let mut nodes = population(3);
        for (_, links) in nodes.iter_mut() {
            links.connect(AgentId(99), 0.0, ConnectOptions::default());
        }
        let before = nodes.clone();

        let mut rng = SmallRng::seed_from_u64(6);
        let report = builder(2, 0.0, false).rewire(&mut nodes, 1.0, 1.0, &mut rng);

        assert_eq!(report.attempted, 0);
        assert_eq!(report.skipped, 3);
        assert_eq!(nodes, before);
    }

    #[test]
    fn test_rewire_on_tiny_population_is_noop() {
        let mut nodes = population(1);
        let mut rng = SmallRng::seed_from_u64(2);
        let report = builder(2, 0.0, false).rewire(&mut nodes, 1.0, 0.0, &mut rng);
        assert_eq!(report, RewireReport::default());
    }

    #[test]
    fn test_same_seed_same_graph() {
        let run = |seed: u64| {
            let mut nodes = population(50);
            let mut rng = SmallRng::seed_from_u64(seed);
            let mut b = builder(4, 0.2, true);
            b.build(&mut nodes, true, 0.0, &mut rng).unwrap();
            b.rewire(&mut nodes, 0.1, 1.0, &mut rng);
            nodes
        };

        assert_eq!(run(99), run(99));
        assert_ne!(run(99), run(100));
    }

    #[test]
    fn test_build_without_clearing_keeps_existing_links() {
        let mut nodes = population(6);
        nodes[0].1.connect(AgentId(3), 0.0, ConnectOptions::with_strength(0.9));

        let mut rng = SmallRng::seed_from_u64(4);
        builder(2, 0.0, false).build(&mut nodes, false, 0.0, &mut rng).unwrap();

        assert!(nodes[0].1.is_connected(AgentId(3)));
        assert!(nodes[0].1.is_connected(AgentId(1)));
    }

    #[test]
    fn test_build_rewires_kept_links_too() {
        let mut nodes = population(10);
        nodes[0].1.connect(AgentId(5), 0.0, ConnectOptions::with_strength(0.9));

        let mut rng = SmallRng::seed_from_u64(8);
        let report = builder(2, 1.0, false).build(&mut nodes, false, 0.0, &mut rng).unwrap();

        // 10 lattice edges plus the kept 0 -> 5
        assert_eq!(report.lattice_edges, 10);
        assert_eq!(report.rewiring.attempted, 11);
        let touched_kept_link = report.rewiring.outcomes.iter().any(|outcome| match outcome {
            RewireOutcome::Rewired {
                source, old_target, ..
            } => *source == AgentId(0) && *old_target == AgentId(5),
            RewireOutcome::Failed { source, target } => {
                *source == AgentId(0) && *target == AgentId(5)
            }
        });
        assert!(touched_kept_link);
    }

    #[test]
    fn test_average_path_length() {
        // Directed ring on 4 nodes with k=2: undirected cycle 0-1-2-3-0
        let mut nodes = population(4);
        let mut rng = SmallRng::seed_from_u64(4);
        builder(2, 0.0, false).build(&mut nodes, true, 0.0, &mut rng).unwrap();

        // From any node: two peers at distance 1, one at distance 2
        let apl = average_path_length(&nodes).unwrap();
        assert!((apl - 4.0 / 3.0).abs() < 1e-12);

        assert!(average_path_length(&population(3)).is_none());
    }

    #[test]
    fn test_stats_ignore_dangling_targets() {
        let mut nodes = population(3);
        nodes[0].1.connect(AgentId(1), 0.0, ConnectOptions::default());
        nodes[0].1.connect(AgentId(77), 0.0, ConnectOptions::default());

        let stats = graph_stats(&nodes, false);
        assert_eq!(stats.link_count, 2);
        assert!((stats.average_degree - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(stats.clustering_coefficient, 0.0);
    }

    #[test]
    fn test_rewire_schedule() {
        let schedule = RewireSchedule::every(10, 0.1);
        assert!(!schedule.is_due(0));
        assert!(!schedule.is_due(5));
        assert!(schedule.is_due(10));
        assert!(schedule.is_due(20));
        assert!(!RewireSchedule::default().is_due(10));
    }
}
