//! Rover-Frame Projector and world-frame conversion.
//!
//! Rectified-image pixels are first expressed relative to the rover: the
//! optical origin sits at the bottom row, centre column of the rectified
//! frame, `x` grows forward (up the image) and `y` grows to the rover's left.
//! Those rover-centric points are then rotated by the rover's yaw, scaled from
//! rectified pixels into world cells, translated by the rover's position and
//! clipped onto the world grid.
//!
//! # Example
//!
//! ```rust
//! use rover_perception::projection::{rover_coords, WorldProjector};
//! use rover_types::{BinaryMask, GridCell, Pose};
//!
//! // A single pixel 60 rows above the bottom edge, dead ahead.
//! let mut mask = BinaryMask::new(320, 160);
//! mask.set(160, 100, true);
//!
//! let points = rover_coords(&mask);
//! assert_eq!(points[0].x, 60.0);
//! assert_eq!(points[0].y, 0.0);
//!
//! let projector = WorldProjector::new(200, 30.0);
//! let cells = projector.to_world(&points, &Pose::new(100.0, 100.0, 0.0));
//! assert_eq!(cells[0], GridCell::new(102, 100));
//! ```

use rover_types::{BinaryMask, GridCell, PolarPoint, Pose, RoverPoint};

// ────────────────────────────────────────────────────────────────────────────
// Image → rover frame
// ────────────────────────────────────────────────────────────────────────────

/// Rover-centric coordinates of every set pixel in `mask`, in row-major order.
///
/// An empty mask yields an empty list.
pub fn rover_coords(mask: &BinaryMask) -> Vec<RoverPoint> {
    let height = mask.height as f64;
    let half_width = mask.width as f64 / 2.0;
    mask.nonzero()
        .map(|(row, col)| RoverPoint::new(-(row as f64 - height), -(col as f64 - half_width)))
        .collect()
}

/// Distance and heading of a rover-centric point.
///
/// The angle is `atan2(y, x)`: zero straight ahead, positive to the left.
#[inline]
pub fn to_polar(p: RoverPoint) -> PolarPoint {
    PolarPoint {
        distance: p.x.hypot(p.y),
        angle: p.y.atan2(p.x),
    }
}

pub fn to_polar_all(points: &[RoverPoint]) -> Vec<PolarPoint> {
    points.iter().copied().map(to_polar).collect()
}

// ────────────────────────────────────────────────────────────────────────────
// Rover frame → world frame
// ────────────────────────────────────────────────────────────────────────────

/// Rotate `p` counter-clockwise by `yaw_deg` degrees.
#[inline]
pub fn rotate(p: RoverPoint, yaw_deg: f64) -> RoverPoint {
    let (sin, cos) = yaw_deg.to_radians().sin_cos();
    RoverPoint::new(p.x * cos - p.y * sin, p.x * sin + p.y * cos)
}

/// Scale `p` from rectified pixels into world cells and offset it by the
/// rover's world position.
#[inline]
pub fn translate(p: RoverPoint, pos_x: f64, pos_y: f64, scale: f64) -> RoverPoint {
    RoverPoint::new(p.x / scale + pos_x, p.y / scale + pos_y)
}

/// Converts rover-centric points into clipped world-grid cells.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorldProjector {
    /// Cells per side of the square world grid.
    world_size: usize,
    /// Rectified pixels per world cell.
    scale: f64,
}

impl WorldProjector {
    /// `world_size` is the side of the map the cells will be written to and
    /// must be non-zero; `scale` must be positive.
    pub fn new(world_size: usize, scale: f64) -> Self {
        debug_assert!(world_size > 0);
        debug_assert!(scale > 0.0);
        Self { world_size, scale }
    }

    /// Rotate, then scale and translate, then truncate and clip a single point.
    ///
    /// The order matters near the grid edges and must not change.
    pub fn to_cell(&self, p: RoverPoint, pose: &Pose) -> GridCell {
        let rotated = rotate(p, pose.yaw);
        let world = translate(rotated, pose.x, pose.y, self.scale);
        GridCell::new(self.clip(world.x), self.clip(world.y))
    }

    /// [`to_cell`](Self::to_cell) over a list of points, order preserved.
    pub fn to_world(&self, points: &[RoverPoint], pose: &Pose) -> Vec<GridCell> {
        points.iter().map(|&p| self.to_cell(p, pose)).collect()
    }

    /// Truncate toward zero, then clamp to `[0, world_size - 1]`.
    #[inline]
    fn clip(&self, v: f64) -> usize {
        // `as` saturates on overflow and maps NaN to 0.
        let truncated = v as i64;
        truncated.clamp(0, self.world_size as i64 - 1) as usize
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
