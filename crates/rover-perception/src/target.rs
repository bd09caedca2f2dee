//! Target Detector.
//!
//! Decides, frame by frame, whether the target mask shows a single sample
//! rock at a plausible range.  The gate is a pixel-count window: a blob that
//! is too small is noise or too far away, one that is too large is a
//! misclassification or too close to be useful.  When the gate passes, the
//! nearest target pixel stands in for the rock's position.
//!
//! There is no state carried between frames.

use serde::{Deserialize, Serialize};

use rover_types::{BinaryMask, GridCell, PolarPoint, Pose};

use crate::projection::{WorldProjector, rover_coords, to_polar_all};

/// Whether the window's bounds are themselves accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WindowBounds {
    /// `lower < n < upper`
    #[default]
    Exclusive,
    /// `lower <= n <= upper`
    Inclusive,
}

/// Accepted range of target-mask pixel counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectionWindow {
    pub lower: usize,
    pub upper: usize,
    #[serde(default)]
    pub bounds: WindowBounds,
}

impl Default for DetectionWindow {
    fn default() -> Self {
        Self {
            lower: 290,
            upper: 330,
            bounds: WindowBounds::Exclusive,
        }
    }
}

impl DetectionWindow {
    pub fn new(lower: usize, upper: usize, bounds: WindowBounds) -> Self {
        Self {
            lower,
            upper,
            bounds,
        }
    }

    pub fn contains(&self, count: usize) -> bool {
        match self.bounds {
            WindowBounds::Exclusive => self.lower < count && count < self.upper,
            WindowBounds::Inclusive => self.lower <= count && count <= self.upper,
        }
    }
}

/// A target seen in the current frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetDetection {
    /// Set pixels in the target mask.
    pub pixel_count: usize,
    /// World cell of the nearest target pixel.
    pub location: GridCell,
    /// Polar position of the nearest target pixel.
    pub nearest: PolarPoint,
    /// Distances of every target pixel, in mask enumeration order.
    pub distances: Vec<f64>,
    /// Angles of every target pixel, in mask enumeration order.
    pub angles: Vec<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TargetDetector {
    window: DetectionWindow,
}

impl TargetDetector {
    pub fn new(window: DetectionWindow) -> Self {
        Self { window }
    }

    /// Run the gate on `mask` and, if it passes, locate the target.
    ///
    /// Ties on the minimum distance go to the first pixel in row-major order.
    pub fn detect(
        &self,
        mask: &BinaryMask,
        pose: &Pose,
        projector: &WorldProjector,
    ) -> Option<TargetDetection> {
        let pixel_count = mask.count_nonzero();
        if !self.window.contains(pixel_count) {
            return None;
        }

        let points = rover_coords(mask);
        let cells = projector.to_world(&points, pose);
        let polar = to_polar_all(&points);

        let nearest_idx = polar
            .iter()
            .enumerate()
            .fold(None::<(usize, f64)>, |best, (i, p)| match best {
                Some((_, d)) if d <= p.distance => best,
                _ => Some((i, p.distance)),
            })
            .map(|(i, _)| i)?;

        Some(TargetDetection {
            pixel_count,
            location: cells[nearest_idx],
            nearest: polar[nearest_idx],
            distances: polar.iter().map(|p| p.distance).collect(),
            angles: polar.iter().map(|p| p.angle).collect(),
        })
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
