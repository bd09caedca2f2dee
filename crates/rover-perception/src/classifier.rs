//! Terrain classification seam.
//!
//! The geometric core never looks at pixel colours itself; it consumes three
//! binary masks produced by a [`TerrainClassifier`].  Any classifier works,
//! from colour thresholds to a learned model, as long as it returns masks the
//! same shape as the rectified frame.
//!
//! [`ColorThresholdClassifier`] is the stock implementation for the sandy,
//! well-lit terrain the rover is tuned for: bright ground is navigable,
//! yellow blobs are sample rocks, and anything else still inside the camera's
//! view is an obstacle.

use serde::{Deserialize, Serialize};

use rover_types::{BinaryMask, Frame};

/// The three per-class masks for one rectified frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerrainMasks {
    pub navigable: BinaryMask,
    pub obstacle: BinaryMask,
    pub target: BinaryMask,
}

impl TerrainMasks {
    /// All-empty masks of the given size.
    pub fn empty(width: usize, height: usize) -> Self {
        Self {
            navigable: BinaryMask::new(width, height),
            obstacle: BinaryMask::new(width, height),
            target: BinaryMask::new(width, height),
        }
    }
}

/// Turns a rectified frame into navigable / obstacle / target masks.
///
/// Implementations must be pure: same frame in, same masks out.
pub trait TerrainClassifier {
    fn classify(&self, rectified: &Frame) -> TerrainMasks;
}

impl<F> TerrainClassifier for F
where
    F: Fn(&Frame) -> TerrainMasks,
{
    fn classify(&self, rectified: &Frame) -> TerrainMasks {
        self(rectified)
    }
}

/// Colour thresholds for [`ColorThresholdClassifier`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorThresholds {
    /// A pixel is navigable when every channel is strictly above these.
    #[serde(default = "default_navigable_rgb")]
    pub navigable_rgb: [u8; 3],
    /// Red and green must be strictly above these for a rock pixel.
    #[serde(default = "default_rock_min_rg")]
    pub rock_min_rg: [u8; 2],
    /// Blue must be strictly below this for a rock pixel.
    #[serde(default = "default_rock_max_blue")]
    pub rock_max_blue: u8,
}

fn default_navigable_rgb() -> [u8; 3] {
    [160, 160, 160]
}
fn default_rock_min_rg() -> [u8; 2] {
    [110, 110]
}
fn default_rock_max_blue() -> u8 {
    50
}

impl Default for ColorThresholds {
    fn default() -> Self {
        Self {
            navigable_rgb: default_navigable_rgb(),
            rock_min_rg: default_rock_min_rg(),
            rock_max_blue: default_rock_max_blue(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ColorThresholdClassifier {
    thresholds: ColorThresholds,
}

impl ColorThresholdClassifier {
    pub fn new(thresholds: ColorThresholds) -> Self {
        Self { thresholds }
    }

    fn is_navigable(&self, [r, g, b]: [u8; 3]) -> bool {
        let [tr, tg, tb] = self.thresholds.navigable_rgb;
        r > tr && g > tg && b > tb
    }

    fn is_rock(&self, [r, g, b]: [u8; 3]) -> bool {
        let [tr, tg] = self.thresholds.rock_min_rg;
        r > tr && g > tg && b < self.thresholds.rock_max_blue
    }
}

impl TerrainClassifier for ColorThresholdClassifier {
    fn classify(&self, rectified: &Frame) -> TerrainMasks {
        let (w, h) = (rectified.width, rectified.height);
        let mut masks = TerrainMasks::empty(w, h);

        for (i, px) in rectified.data.chunks_exact(3).enumerate() {
            let rgb = [px[0], px[1], px[2]];
            // Pure black is outside the warped field of view.
            if rgb == [0, 0, 0] {
                continue;
            }
            let slot = if self.is_navigable(rgb) {
                &mut masks.navigable
            } else if self.is_rock(rgb) {
                &mut masks.target
            } else {
                &mut masks.obstacle
            };
            slot.data[i] = 1;
        }
        masks
    }
}
