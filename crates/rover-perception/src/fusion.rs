//! World-Frame Fusion.
//!
//! Folds one frame's worth of projected obstacle and navigable cells into the
//! persistent [`WorldMap`].  Navigable evidence is weighted more heavily than
//! obstacle evidence and, once the frame is accumulated, wins outright: any
//! cell holding navigable evidence has its obstacle count zeroed.
//!
//! ```text
//! obstacle[c]  += w_obstacle    for each distinct obstacle cell c
//! navigable[c] += w_navigable   for each distinct navigable cell c
//! obstacle[c]   = 0             for every c with navigable[c] > 0
//! ```
//!
//! A cell hit by several pixels in the same frame is incremented once.
//!
//! # Example
//!
//! ```rust
//! use rover_perception::fusion::{fuse, FusionWeights};
//! use rover_perception::world_map::{Channel, WorldMap};
//! use rover_types::GridCell;
//!
//! let mut map = WorldMap::new(10);
//! let cell = GridCell::new(4, 4);
//!
//! fuse(&mut map, &[cell], &[], FusionWeights::default());
//! assert_eq!(map.get(Channel::Obstacle, cell), 1);
//!
//! fuse(&mut map, &[], &[cell], FusionWeights::default());
//! assert_eq!(map.get(Channel::Navigable, cell), 10);
//! assert_eq!(map.get(Channel::Obstacle, cell), 0);
//! ```

use serde::{Deserialize, Serialize};

use rover_types::GridCell;

use crate::world_map::{Channel, WorldMap};

/// Per-frame increments applied to each channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FusionWeights {
    #[serde(default = "default_obstacle_weight")]
    pub obstacle: u32,
    #[serde(default = "default_navigable_weight")]
    pub navigable: u32,
}

fn default_obstacle_weight() -> u32 {
    1
}
fn default_navigable_weight() -> u32 {
    10
}

impl Default for FusionWeights {
    fn default() -> Self {
        Self {
            obstacle: default_obstacle_weight(),
            navigable: default_navigable_weight(),
        }
    }
}

/// What a single [`fuse`] call touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FusionSummary {
    /// Distinct cells incremented in the obstacle channel.
    pub obstacle_cells: usize,
    /// Distinct cells incremented in the navigable channel.
    pub navigable_cells: usize,
    /// Cells whose obstacle evidence was cleared by reconciliation.
    pub cleared_cells: usize,
}

/// Accumulate one frame into `map`, then reconcile the whole grid.
///
/// Reconciliation is `O(size²)`: it covers the whole grid, not only the
/// cells touched by this frame.
pub fn fuse(
    map: &mut WorldMap,
    obstacle: &[GridCell],
    navigable: &[GridCell],
    weights: FusionWeights,
) -> FusionSummary {
    let obstacle = distinct(obstacle);
    let navigable = distinct(navigable);

    for &cell in &obstacle {
        map.increment(Channel::Obstacle, cell, weights.obstacle);
    }
    for &cell in &navigable {
        map.increment(Channel::Navigable, cell, weights.navigable);
    }
    let cleared_cells = map.reconcile();

    FusionSummary {
        obstacle_cells: obstacle.len(),
        navigable_cells: navigable.len(),
        cleared_cells,
    }
}

fn distinct(cells: &[GridCell]) -> Vec<GridCell> {
    let mut out = cells.to_vec();
    out.sort_unstable();
    out.dedup();
    out
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_no_overlap(map: &WorldMap) {
        for (cell, _) in map.occupied(Channel::Navigable) {
            assert_eq!(
                map.get(Channel::Obstacle, cell),
                0,
                "cell {cell:?} holds both navigable and obstacle evidence"
            );
        }
    }

    #[test]
    fn single_navigable_hit_weighs_ten() {
        let mut map = WorldMap::new(20);
        let cell = GridCell::new(3, 4);
        let summary = fuse(&mut map, &[], &[cell], FusionWeights::default());
        assert_eq!(map.get(Channel::Navigable, cell), 10);
        assert_eq!(map.get(Channel::Obstacle, cell), 0);
        assert_eq!(summary.navigable_cells, 1);
        assert_eq!(summary.obstacle_cells, 0);
    }

    #[test]
    fn duplicate_cells_increment_once_per_frame() {
        let mut map = WorldMap::new(20);
        let cell = GridCell::new(1, 1);
        let summary = fuse(&mut map, &[cell, cell, cell], &[], FusionWeights::default());
        assert_eq!(map.get(Channel::Obstacle, cell), 1);
        assert_eq!(summary.obstacle_cells, 1);
    }

    #[test]
    fn repeated_frames_accumulate() {
        let mut map = WorldMap::new(20);
        let cell = GridCell::new(5, 5);
        for _ in 0..3 {
            fuse(&mut map, &[], &[cell], FusionWeights::default());
        }
        assert_eq!(map.get(Channel::Navigable, cell), 30);
    }

    #[test]
    fn same_frame_navigable_overrides_obstacle() {
        let mut map = WorldMap::new(20);
        let cell = GridCell::new(2, 2);
        let summary = fuse(&mut map, &[cell], &[cell], FusionWeights::default());
        assert_eq!(map.get(Channel::Obstacle, cell), 0);
        assert_eq!(map.get(Channel::Navigable, cell), 10);
        assert_eq!(summary.cleared_cells, 1);
    }

    #[test]
    fn later_navigable_clears_stale_obstacle() {
        let mut map = WorldMap::new(20);
        let cell = GridCell::new(7, 8);
        for _ in 0..5 {
            fuse(&mut map, &[cell], &[], FusionWeights::default());
        }
        assert_eq!(map.get(Channel::Obstacle, cell), 5);

        fuse(&mut map, &[], &[cell], FusionWeights::default());
        assert_eq!(map.get(Channel::Obstacle, cell), 0);
    }

    #[test]
    fn obstacle_after_navigable_is_cleared_again() {
        let mut map = WorldMap::new(20);
        let cell = GridCell::new(0, 19);
        fuse(&mut map, &[], &[cell], FusionWeights::default());
        fuse(&mut map, &[cell], &[], FusionWeights::default());
        assert_eq!(map.get(Channel::Obstacle, cell), 0);
        assert_eq!(map.get(Channel::Navigable, cell), 10);
    }

    #[test]
    fn invariant_holds_over_mixed_sequence() {
        let mut map = WorldMap::new(16);
        // Deterministic pseudo-random walk over the grid.
        let mut seed: u64 = 0x2545_F491_4F6C_DD1D;
        let mut next = || {
            seed ^= seed << 13;
            seed ^= seed >> 7;
            seed ^= seed << 17;
            (seed % 16) as usize
        };
        for _ in 0..50 {
            let obstacle: Vec<_> = (0..12).map(|_| GridCell::new(next(), next())).collect();
            let navigable: Vec<_> = (0..6).map(|_| GridCell::new(next(), next())).collect();
            fuse(&mut map, &obstacle, &navigable, FusionWeights::default());
            assert_no_overlap(&map);
        }
        assert!(map.stats().obstacle_cells > 0);
        assert!(map.stats().navigable_cells > 0);
    }

    #[test]
    fn custom_weights_apply() {
        let mut map = WorldMap::new(4);
        let weights = FusionWeights {
            obstacle: 3,
            navigable: 7,
        };
        fuse(&mut map, &[GridCell::new(0, 0)], &[GridCell::new(1, 1)], weights);
        assert_eq!(map.get(Channel::Obstacle, GridCell::new(0, 0)), 3);
        assert_eq!(map.get(Channel::Navigable, GridCell::new(1, 1)), 7);
    }
}
