//! Simulated camera for running the perception stack without hardware.
//!
//! A [`SimCamera`] holds a top-down [`Scene`] expressed in rectified-frame
//! pixels and renders what the real camera would see by projecting it back
//! through the rectifier's homography.  Feeding those frames to the pipeline
//! therefore recovers the scene near the rover, which makes the simulator
//! useful for CI runs and the interactive CLI.
//!
//! # Example
//!
//! ```rust
//! use rover_hal::camera::Camera;
//! use rover_hal::sim::{Scene, SimCamera};
//! use rover_perception::PerceptionConfig;
//! use rover_perception::rectify::PerspectiveRectifier;
//!
//! let config = PerceptionConfig::default();
//! let rectifier =
//!     PerspectiveRectifier::new(config.source_quad(), config.destination_quad()).unwrap();
//!
//! let mut camera = SimCamera::new("front_rgb", rectifier, Scene::terrain(320, 160).into_frame());
//! let frame = camera.capture().expect("sim capture must succeed");
//! assert_eq!((frame.width, frame.height), (320, 160));
//! ```

use std::ops::Range;

use rover_perception::rectify::PerspectiveRectifier;
use rover_types::{Frame, PerceptionError};
use tracing::debug;

use crate::camera::Camera;

pub const SAND: [u8; 3] = [210, 190, 175];
pub const ROCK_WALL: [u8; 3] = [90, 60, 40];
pub const SAMPLE_ROCK: [u8; 3] = [180, 150, 20];

// ────────────────────────────────────────────────────────────────────────────
// Scene
// ────────────────────────────────────────────────────────────────────────────

/// A top-down scene painted in rectified-frame pixel coordinates.
#[derive(Debug, Clone)]
pub struct Scene {
    frame: Frame,
}

impl Scene {
    /// A scene filled with `background`.
    pub fn new(width: usize, height: usize, background: [u8; 3]) -> Self {
        let mut frame = Frame::new(width, height);
        frame.fill(background);
        Self { frame }
    }

    /// A sandy clearing ahead of the rover, walled in by rock.
    pub fn clearing(width: usize, height: usize) -> Self {
        let cx = width / 2;
        Self::new(width, height, ROCK_WALL).rect(cx.saturating_sub(60)..cx + 60, height / 4..height, SAND)
    }

    /// [`Scene::clearing`] with one sample rock ahead and to the left.
    pub fn terrain(width: usize, height: usize) -> Self {
        Self::clearing(width, height).disc(
            width as f64 / 2.0 - 25.0,
            height as f64 - 50.0,
            11.0,
            SAMPLE_ROCK,
        )
    }

    /// Paint the axis-aligned rectangle `cols × rows`, clipped to the frame.
    pub fn rect(mut self, cols: Range<usize>, rows: Range<usize>, rgb: [u8; 3]) -> Self {
        for y in rows.start..rows.end.min(self.frame.height) {
            for x in cols.start..cols.end.min(self.frame.width) {
                self.frame.set_pixel(x, y, rgb);
            }
        }
        self
    }

    /// Paint every pixel within `radius` of `(cx, cy)`.
    pub fn disc(mut self, cx: f64, cy: f64, radius: f64, rgb: [u8; 3]) -> Self {
        for y in 0..self.frame.height {
            for x in 0..self.frame.width {
                let (dx, dy) = (x as f64 - cx, y as f64 - cy);
                if dx * dx + dy * dy <= radius * radius {
                    self.frame.set_pixel(x, y, rgb);
                }
            }
        }
        self
    }

    pub fn into_frame(self) -> Frame {
        self.frame
    }
}

// ────────────────────────────────────────────────────────────────────────────
// SimCamera
// ────────────────────────────────────────────────────────────────────────────

/// A simulated camera that always returns the same rendered view.
pub struct SimCamera {
    id: String,
    rectifier: PerspectiveRectifier,
    view: Frame,
    captures: u64,
}

impl SimCamera {
    /// Render `scene` through `rectifier` and serve it on every capture.
    pub fn new(id: impl Into<String>, rectifier: PerspectiveRectifier, scene: Frame) -> Self {
        let view = rectifier.unwarp(&scene);
        Self {
            id: id.into(),
            rectifier,
            view,
            captures: 0,
        }
    }

    /// Swap in a new top-down scene.
    pub fn set_scene(&mut self, scene: &Frame) {
        self.view = self.rectifier.unwarp(scene);
    }

    /// Number of frames captured so far.
    pub fn captures(&self) -> u64 {
        self.captures
    }
}

impl Camera for SimCamera {
    fn id(&self) -> &str {
        &self.id
    }

    fn capture(&mut self) -> Result<Frame, PerceptionError> {
        self.captures += 1;
        debug!(camera = %self.id, seq = self.captures, "sim capture");
        Ok(self.view.clone())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
