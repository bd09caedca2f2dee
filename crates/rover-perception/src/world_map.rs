//! World Occupancy Map.
//!
//! A square grid of evidence counters with three independent channels, laid
//! out the same way as the debug overlay: obstacle, target, navigable.  The
//! map lives for the whole run; the perception pipeline only ever adds to it,
//! point-writes the target channel, and clears obstacle evidence where
//! navigable evidence exists.

use serde::{Deserialize, Serialize};

use rover_types::GridCell;

/// Map and overlay channel, in storage order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Obstacle = 0,
    Target = 1,
    Navigable = 2,
}

impl Channel {
    pub const ALL: [Channel; 3] = [Channel::Obstacle, Channel::Target, Channel::Navigable];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(match self {
            Channel::Obstacle => "obstacle",
            Channel::Target => "target",
            Channel::Navigable => "navigable",
        })
    }
}

/// Per-channel cell counts, see [`WorldMap::stats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MapStats {
    pub navigable_cells: usize,
    pub obstacle_cells: usize,
    pub target_cells: usize,
}

impl MapStats {
    /// Cell count for one channel.
    pub fn count(&self, channel: Channel) -> usize {
        match channel {
            Channel::Obstacle => self.obstacle_cells,
            Channel::Target => self.target_cells,
            Channel::Navigable => self.navigable_cells,
        }
    }
}

/// Serializable copy of a [`WorldMap`], row-major per channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapSnapshot {
    pub size: usize,
    pub obstacle: Vec<u32>,
    pub target: Vec<u32>,
    pub navigable: Vec<u32>,
}

/// Fixed-size three-channel occupancy grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorldMap {
    size: usize,
    /// `cells[y * size + x][channel]`
    cells: Vec<[u32; 3]>,
}

impl WorldMap {
    /// An empty `size × size` map.
    pub fn new(size: usize) -> Self {
        Self {
            size,
            cells: vec![[0; 3]; size * size],
        }
    }

    /// Cells per side.
    pub fn size(&self) -> usize {
        self.size
    }

    #[inline]
    fn offset(&self, cell: GridCell) -> usize {
        debug_assert!(cell.x < self.size && cell.y < self.size, "cell {cell:?} off the map");
        cell.y * self.size + cell.x
    }

    pub fn get(&self, channel: Channel, cell: GridCell) -> u32 {
        self.cells[self.offset(cell)][channel.index()]
    }

    /// Add `amount` to `channel` at `cell`, saturating at `u32::MAX`.
    pub fn increment(&mut self, channel: Channel, cell: GridCell, amount: u32) {
        let i = self.offset(cell);
        let slot = &mut self.cells[i][channel.index()];
        *slot = slot.saturating_add(amount);
    }

    /// Overwrite `channel` at `cell`.
    pub fn set(&mut self, channel: Channel, cell: GridCell, value: u32) {
        let i = self.offset(cell);
        self.cells[i][channel.index()] = value;
    }

    /// Zero the obstacle channel in every cell whose navigable count is
    /// positive.  Scans the whole grid, so stale obstacle evidence from earlier
    /// frames is cleared too.  Returns how many cells were cleared.
    pub fn reconcile(&mut self) -> usize {
        let mut cleared = 0;
        for cell in &mut self.cells {
            if cell[Channel::Navigable.index()] > 0 && cell[Channel::Obstacle.index()] > 0 {
                cell[Channel::Obstacle.index()] = 0;
                cleared += 1;
            }
        }
        cleared
    }

    /// Reset every channel of every cell to zero.
    pub fn clear(&mut self) {
        self.cells.fill([0; 3]);
    }

    /// Number of cells with positive evidence, per channel.
    pub fn stats(&self) -> MapStats {
        self.cells.iter().fold(MapStats::default(), |mut s, c| {
            s.obstacle_cells += usize::from(c[Channel::Obstacle.index()] > 0);
            s.target_cells += usize::from(c[Channel::Target.index()] > 0);
            s.navigable_cells += usize::from(c[Channel::Navigable.index()] > 0);
            s
        })
    }

    /// Cells of `channel` holding a positive value, in row-major order.
    pub fn occupied(&self, channel: Channel) -> impl Iterator<Item = (GridCell, u32)> + '_ {
        let size = self.size;
        self.cells
            .iter()
            .enumerate()
            .filter(move |(_, c)| c[channel.index()] > 0)
            .map(move |(i, c)| (GridCell::new(i % size, i / size), c[channel.index()]))
    }

    pub fn snapshot(&self) -> MapSnapshot {
        let column = |ch: Channel| -> Vec<u32> { self.cells.iter().map(|c| c[ch.index()]).collect() };
        MapSnapshot {
            size: self.size,
            obstacle: column(Channel::Obstacle),
            target: column(Channel::Target),
            navigable: column(Channel::Navigable),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
