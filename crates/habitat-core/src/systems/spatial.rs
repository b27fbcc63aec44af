//! Spatial Index
//!
//! Uniform grid over agent positions, rebuilt from scratch every tick. The
//! index is a cache: positions on the agents are authoritative.

use bevy_ecs::prelude::*;
use std::collections::HashMap;

use crate::components::agent::{AgentId, Locatable, Position};
use crate::error::SimError;

#[derive(Debug, Clone, Copy)]
struct Entry {
    id: AgentId,
    x: f32,
    y: f32,
}

/// Resource: agents bucketed by integer grid cell
#[derive(Resource, Debug, Clone)]
pub struct SpatialIndex {
    cell_size: f32,
    cells: HashMap<(i32, i32), Vec<Entry>>,
    len: usize,
}

impl SpatialIndex {
    /// Create an empty index. `cell_size` should match the usual query radius.
    pub fn new(cell_size: f32) -> Result<Self, SimError> {
        if !(cell_size.is_finite() && cell_size > 0.0) {
            return Err(SimError::invalid(format!(
                "cell_size must be positive and finite, got {}",
                cell_size
            )));
        }
        Ok(Self {
            cell_size,
            cells: HashMap::new(),
            len: 0,
        })
    }

    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    fn cell_of(&self, x: f32, y: f32) -> (i32, i32) {
        (
            (x / self.cell_size).floor() as i32,
            (y / self.cell_size).floor() as i32,
        )
    }

    /// Clear all buckets (called before rebuilding)
    pub fn clear(&mut self) {
        self.cells.clear();
        self.len = 0;
    }

    /// Place an agent in the bucket for its current cell. Non-finite
    /// positions are ignored.
    pub fn insert(&mut self, id: AgentId, x: f32, y: f32) {
        if !(x.is_finite() && y.is_finite()) {
            return;
        }
        let cell = self.cell_of(x, y);
        self.cells.entry(cell).or_default().push(Entry { id, x, y });
        self.len += 1;
    }

    /// Clear and reinsert everything.
    pub fn rebuild<I>(&mut self, agents: I)
    where
        I: IntoIterator,
        I::Item: Locatable,
    {
        self.clear();
        for agent in agents {
            let position = agent.position();
            self.insert(agent.agent_id(), position.x, position.y);
        }
    }

    /// Agents within `radius` of (x, y), excluding `exclude`, with their
    /// distances, sorted by id.
    ///
    /// The scan covers `ceil(radius / cell_size)` cells in each direction, so
    /// any radius is answered without false negatives; a radius equal to the
    /// cell size touches exactly the 3x3 block around the query cell. When
    /// that window is larger than the number of occupied cells, the occupied
    /// buckets are walked directly.
    pub fn query_with_distance(
        &self,
        x: f32,
        y: f32,
        radius: f32,
        exclude: Option<AgentId>,
    ) -> Vec<(AgentId, f32)> {
        if !(radius >= 0.0 && x.is_finite() && y.is_finite()) || self.len == 0 {
            return Vec::new();
        }

        let reach = ((radius / self.cell_size).ceil() as i64).max(1);
        let (cx, cy) = self.cell_of(x, y);
        let r_sq = radius * radius;

        let mut found = Vec::new();
        let mut scan = |bucket: &[Entry]| {
            for entry in bucket {
                if Some(entry.id) == exclude {
                    continue;
                }
                let dx = entry.x - x;
                let dy = entry.y - y;
                let d_sq = dx * dx + dy * dy;
                if d_sq <= r_sq {
                    found.push((entry.id, d_sq.sqrt()));
                }
            }
        };

        let side = reach.saturating_mul(2).saturating_add(1);
        if side.saturating_mul(side) as usize >= self.cells.len() {
            // Window covers more cells than are occupied: walk the buckets instead
            for bucket in self.cells.values() {
                scan(bucket);
            }
        } else {
            let (cx, cy) = (i64::from(cx), i64::from(cy));
            for gx in (cx - reach)..=(cx + reach) {
                for gy in (cy - reach)..=(cy + reach) {
                    let (Ok(gx), Ok(gy)) = (i32::try_from(gx), i32::try_from(gy)) else {
                        continue;
                    };
                    if let Some(bucket) = self.cells.get(&(gx, gy)) {
                        scan(bucket);
                    }
                }
            }
        }
        found.sort_unstable_by_key(|(id, _)| *id);
        found
    }

    /// Agents within `radius` of (x, y), excluding `exclude`, sorted by id.
    pub fn query(&self, x: f32, y: f32, radius: f32, exclude: Option<AgentId>) -> Vec<AgentId> {
        self.query_with_distance(x, y, radius, exclude)
            .into_iter()
            .map(|(id, _)| id)
            .collect()
    }

    /// Number of agents in the index
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of occupied cells
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }
}

/// System: rebuild the spatial index from current positions.
/// Runs first in the tick so every later query sees this tick's positions.
pub fn rebuild_spatial_index(
    mut index: ResMut<SpatialIndex>,
    query: Query<(&AgentId, &Position)>,
) {
    index.rebuild(query.iter());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::agent::Agent;
    use rand::rngs::SmallRng;
    use rand::{Rng, SeedableRng};

    fn brute_force(
        points: &[(AgentId, f32, f32)],
        x: f32,
        y: f32,
        r: f32,
        ex: AgentId,
    ) -> Vec<AgentId> {
        let mut ids: Vec<_> = points
            .iter()
            .filter(|(id, px, py)| {
                let dx = px - x;
                let dy = py - y;
                *id != ex && dx * dx + dy * dy <= r * r
            })
            .map(|(id, _, _)| *id)
            .collect();
        ids.sort();
        ids
    }

    #[test]
    fn test_rejects_bad_cell_size() {
        assert!(SpatialIndex::new(0.0).is_err());
        assert!(SpatialIndex::new(-3.0).is_err());
        assert!(SpatialIndex::new(f32::NAN).is_err());
        assert!(SpatialIndex::new(10.0).is_ok());
    }

    #[test]
    fn test_query_excludes_self_and_far_agents() {
        let mut index = SpatialIndex::new(10.0).unwrap();
        index.insert(AgentId(1), 0.0, 0.0);
        index.insert(AgentId(2), 5.0, 0.0);
        index.insert(AgentId(3), 10.0, 0.0);
        index.insert(AgentId(4), 10.1, 0.0);

        assert_eq!(index.len(), 4);
        assert_eq!(
            index.query(0.0, 0.0, 10.0, Some(AgentId(1))),
            vec![AgentId(2), AgentId(3)]
        );
    }

    #[test]
    fn test_neighbor_across_cell_boundary() {
        let mut index = SpatialIndex::new(10.0).unwrap();
        // Query point near the right edge of cell (0,0); neighbor sits in cell (1,0)
        index.insert(AgentId(1), 9.9, 5.0);
        index.insert(AgentId(2), 12.0, 5.0);
        // And diagonally across a corner into negative cells
        index.insert(AgentId(3), -0.5, -0.5);

        let near = index.query(0.2, 0.2, 10.0, None);
        assert!(near.contains(&AgentId(3)));
        assert_eq!(index.query(9.9, 5.0, 10.0, Some(AgentId(1))), vec![AgentId(2)]);
    }

    #[test]
    fn test_wide_radius_scans_more_cells() {
        let mut index = SpatialIndex::new(5.0).unwrap();
        index.insert(AgentId(1), 0.0, 0.0);
        index.insert(AgentId(2), 24.0, 0.0);

        // 24 units away is four cells over; a 3x3 scan would miss it
        assert_eq!(index.query(0.0, 0.0, 25.0, Some(AgentId(1))), vec![AgentId(2)]);
        assert!(index.query(0.0, 0.0, 5.0, Some(AgentId(1))).is_empty());
    }

    #[test]
    fn test_matches_brute_force() {
        let mut rng = SmallRng::seed_from_u64(7);
        let points: Vec<(AgentId, f32, f32)> = (0..300)
            .map(|i| (AgentId(i), rng.gen_range(-100.0..100.0), rng.gen_range(-100.0..100.0)))
            .collect();

        let mut index = SpatialIndex::new(15.0).unwrap();
        for (id, x, y) in &points {
            index.insert(*id, *x, *y);
        }

        for radius in [7.5, 15.0, 40.0] {
            for (id, x, y) in points.iter().take(40) {
                assert_eq!(
                    index.query(*x, *y, radius, Some(*id)),
                    brute_force(&points, *x, *y, radius, *id),
                );
            }
        }
    }

    #[test]
    fn test_rebuild_replaces_contents() {
        let mut index = SpatialIndex::new(10.0).unwrap();
        index.insert(AgentId(9), 100.0, 100.0);

        let agents = vec![
            (AgentId(1), Position::new(0.0, 0.0)),
            (AgentId(2), Position::new(1.0, 1.0)),
        ];
        index.rebuild(agents);

        assert_eq!(index.len(), 2);
        assert!(index.query(100.0, 100.0, 10.0, None).is_empty());
        assert_eq!(index.query_with_distance(0.0, 0.0, 2.0, Some(AgentId(1))).len(), 1);
    }

    #[test]
    fn test_nan_positions_ignored() {
        let mut index = SpatialIndex::new(10.0).unwrap();
        index.insert(AgentId(1), f32::NAN, 0.0);
        assert!(index.is_empty());
        assert!(index.query(f32::NAN, 0.0, 5.0, None).is_empty());
    }

    #[test]
    fn test_rebuild_system_integration() {
        let mut world = World::new();
        world.insert_resource(SpatialIndex::new(10.0).unwrap());

        world.spawn((Agent, AgentId(1), Position::new(0.0, 0.0)));
        world.spawn((Agent, AgentId(2), Position::new(3.0, 4.0)));
        world.spawn((Agent, AgentId(3), Position::new(50.0, 50.0)));

        let mut schedule = Schedule::default();
        schedule.add_systems(rebuild_spatial_index);
        schedule.run(&mut world);

        let index = world.resource::<SpatialIndex>();
        assert_eq!(index.len(), 3);
        assert_eq!(index.cell_count(), 2);

        let hits = index.query_with_distance(0.0, 0.0, 10.0, Some(AgentId(1)));
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].0, AgentId(2));
        assert!((hits[0].1 - 5.0).abs() < 1e-6);
    }
}
