//! Fixed perception constants.
//!
//! Everything here is set once when the pipeline is built.  The defaults
//! describe the stock rover camera: a 320×160 frame, a calibration grid
//! whose corners land at the `source` points, and a 200×200 world map.

use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use rover_types::PerceptionError;

use crate::classifier::ColorThresholds;
use crate::fusion::FusionWeights;
use crate::rectify::{Quad, destination_square};
use crate::target::DetectionWindow;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerceptionConfig {
    /// Raw and rectified frame width in pixels.
    #[serde(default = "default_frame_width")]
    pub frame_width: usize,

    /// Raw and rectified frame height in pixels.
    #[serde(default = "default_frame_height")]
    pub frame_height: usize,

    /// Raw-frame corners of one world cell on flat ground, ordered
    /// bottom-left, bottom-right, top-right, top-left.
    #[serde(default = "default_source")]
    pub source: [[f64; 2]; 4],

    /// Half the side of the destination square in rectified pixels.
    #[serde(default = "default_dst_size")]
    pub dst_size: f64,

    /// Gap between the destination square and the bottom of the frame.
    #[serde(default = "default_bottom_offset")]
    pub bottom_offset: f64,

    /// Cells per side of the world map.
    #[serde(default = "default_world_size")]
    pub world_size: usize,

    #[serde(default)]
    pub target_window: DetectionWindow,

    #[serde(default)]
    pub weights: FusionWeights,

    #[serde(default)]
    pub thresholds: ColorThresholds,
}

fn default_frame_width() -> usize {
    320
}
fn default_frame_height() -> usize {
    160
}
fn default_source() -> [[f64; 2]; 4] {
    [[14.0, 140.0], [301.0, 140.0], [200.0, 96.0], [118.0, 96.0]]
}
fn default_dst_size() -> f64 {
    15.0
}
fn default_bottom_offset() -> f64 {
    6.0
}
fn default_world_size() -> usize {
    200
}

impl Default for PerceptionConfig {
    fn default() -> Self {
        Self {
            frame_width: default_frame_width(),
            frame_height: default_frame_height(),
            source: default_source(),
            dst_size: default_dst_size(),
            bottom_offset: default_bottom_offset(),
            world_size: default_world_size(),
            target_window: DetectionWindow::default(),
            weights: FusionWeights::default(),
            thresholds: ColorThresholds::default(),
        }
    }
}

impl PerceptionConfig {
    /// Rectified pixels per world cell: the full side of the destination square.
    pub fn scale(&self) -> f64 {
        2.0 * self.dst_size
    }

    pub fn source_quad(&self) -> Quad {
        self.source.map(|[x, y]| Point2::new(x, y))
    }

    pub fn destination_quad(&self) -> Quad {
        destination_square(
            self.frame_width,
            self.frame_height,
            self.dst_size,
            self.bottom_offset,
        )
    }

    /// Reject settings the pipeline cannot run with.
    ///
    /// Quadrilateral degeneracy is checked separately when the rectifier is
    /// built.
    pub fn validate(&self) -> Result<(), PerceptionError> {
        let invalid = |msg: &str| Err(PerceptionError::InvalidConfig(msg.to_string()));

        if self.frame_width == 0 || self.frame_height == 0 {
            return invalid("frame dimensions must be non-zero");
        }
        if self.world_size == 0 {
            return invalid("world_size must be non-zero");
        }
        if !(self.dst_size.is_finite() && self.dst_size > 0.0) {
            return invalid("dst_size must be a positive number");
        }
        if !self.bottom_offset.is_finite() || self.bottom_offset < 0.0 {
            return invalid("bottom_offset must be a non-negative number");
        }
        if self.bottom_offset + 2.0 * self.dst_size > self.frame_height as f64 {
            return invalid("destination square does not fit inside the frame");
        }
        if self.source.iter().flatten().any(|v| !v.is_finite()) {
            return invalid("source points must be finite");
        }
        if self.target_window.lower > self.target_window.upper {
            return invalid("target_window.lower must not exceed target_window.upper");
        }
        if self.weights.obstacle == 0 || self.weights.navigable == 0 {
            return invalid("fusion weights must be non-zero");
        }
        Ok(())
    }
}
