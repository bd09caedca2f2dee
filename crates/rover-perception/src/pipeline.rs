//! Per-frame perception step.
//!
//! [`PerceptionPipeline::step`] chains the whole core for one camera frame:
//!
//! ```text
//! raw frame ─► rectify ─► classify ─┬─ navigable ─► project ─► fuse ─► nav angles
//!                                   ├─ obstacle  ─► project ─► fuse
//!                                   └─ target    ─► detect  ─► target cell / nav override
//! ```
//!
//! All long-lived state sits in a caller-owned [`RoverState`] that is passed
//! in by `&mut` on every call, so frames must be delivered one at a time.
//!
//! # Example
//!
//! ```rust
//! use rover_perception::classifier::ColorThresholdClassifier;
//! use rover_perception::config::PerceptionConfig;
//! use rover_perception::pipeline::{PerceptionPipeline, RoverState};
//! use rover_types::{Frame, Pose};
//!
//! let config = PerceptionConfig::default();
//! let classifier = ColorThresholdClassifier::new(config.thresholds);
//! let pipeline = PerceptionPipeline::new(&config, classifier).unwrap();
//!
//! let mut state = RoverState::for_config(&config, Pose::new(100.0, 100.0, 0.0));
//! let report = pipeline.step(&Frame::new(320, 160), &mut state);
//!
//! assert_eq!(report.navigable_pixels, 0);
//! assert!(!state.target_visible);
//! assert!(!state.near_sample);
//! ```

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use rover_types::{Frame, GridCell, PerceptionError, Pose};

use crate::classifier::{TerrainClassifier, TerrainMasks};
use crate::config::PerceptionConfig;
use crate::fusion::{FusionSummary, FusionWeights, fuse};
use crate::overlay::{DebugOverlay, FULL_INTENSITY};
use crate::projection::{WorldProjector, rover_coords, to_polar_all};
use crate::rectify::PerspectiveRectifier;
use crate::target::{TargetDetection, TargetDetector};
use crate::world_map::{Channel, WorldMap};

// ────────────────────────────────────────────────────────────────────────────
// Caller-owned state
// ────────────────────────────────────────────────────────────────────────────

/// Everything the perception step reads and writes across frames.
#[derive(Debug, Clone)]
pub struct RoverState {
    /// Current pose estimate. Read-only to the pipeline.
    pub pose: Pose,
    /// Accumulated occupancy evidence.
    pub world_map: WorldMap,
    /// Visualisation of the latest frame's masks.
    pub overlay: DebugOverlay,
    /// Candidate headings (radians) from the latest frame.
    pub nav_angles: Vec<f64>,
    /// Distances matching `nav_angles`, in rectified pixels.
    pub nav_dists: Vec<f64>,
    /// A sample rock was detected in the latest frame.
    pub target_visible: bool,
    /// World cell of the latest detected sample rock.
    pub target_location: Option<GridCell>,
    /// Cleared on every step; downstream logic decides when it is set.
    pub near_sample: bool,
}

impl RoverState {
    pub fn new(world_size: usize, frame_width: usize, frame_height: usize, pose: Pose) -> Self {
        Self {
            pose,
            world_map: WorldMap::new(world_size),
            overlay: DebugOverlay::new(frame_width, frame_height),
            nav_angles: Vec::new(),
            nav_dists: Vec::new(),
            target_visible: false,
            target_location: None,
            near_sample: false,
        }
    }

    /// State sized for `config`.
    pub fn for_config(config: &PerceptionConfig, pose: Pose) -> Self {
        Self::new(config.world_size, config.frame_width, config.frame_height, pose)
    }

    /// Mean of `nav_angles` in degrees, `None` when there are none.
    pub fn mean_nav_angle_deg(&self) -> Option<f64> {
        if self.nav_angles.is_empty() {
            return None;
        }
        let sum: f64 = self.nav_angles.iter().sum();
        Some((sum / self.nav_angles.len() as f64).to_degrees())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Report
// ────────────────────────────────────────────────────────────────────────────

/// Summary of a single [`PerceptionPipeline::step`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameReport {
    pub navigable_pixels: usize,
    pub obstacle_pixels: usize,
    pub target_pixels: usize,
    pub fusion: FusionSummary,
    pub detection: Option<TargetDetection>,
    /// Mean of the navigation angles written this frame, in degrees.
    pub mean_nav_angle_deg: Option<f64>,
}

// ────────────────────────────────────────────────────────────────────────────
// Pipeline
// ────────────────────────────────────────────────────────────────────────────

/// The perception core wired to a particular [`TerrainClassifier`].
#[derive(Debug, Clone)]
pub struct PerceptionPipeline<C> {
    rectifier: PerspectiveRectifier,
    /// Rectified pixels per world cell.
    scale: f64,
    weights: FusionWeights,
    detector: TargetDetector,
    classifier: C,
}

impl<C: TerrainClassifier> PerceptionPipeline<C> {
    /// Validate `config` and solve the rectifying homography.
    ///
    /// # Errors
    ///
    /// [`PerceptionError::InvalidConfig`] for out-of-range settings and
    /// [`PerceptionError::DegenerateQuadrilateral`] when the source or
    /// destination corners do not define a perspective transform.
    pub fn new(config: &PerceptionConfig, classifier: C) -> Result<Self, PerceptionError> {
        config.validate()?;
        let rectifier = PerspectiveRectifier::new(config.source_quad(), config.destination_quad())?;
        Ok(Self {
            rectifier,
            scale: config.scale(),
            weights: config.weights,
            detector: TargetDetector::new(config.target_window),
            classifier,
        })
    }

    pub fn rectifier(&self) -> &PerspectiveRectifier {
        &self.rectifier
    }

    /// Run the full pipeline on one raw camera frame.
    #[instrument(skip_all, fields(x = state.pose.x, y = state.pose.y, yaw = state.pose.yaw))]
    pub fn step(&self, raw: &Frame, state: &mut RoverState) -> FrameReport {
        let rectified = self.rectifier.warp(raw);
        let masks = self.classifier.classify(&rectified);
        self.process_masks(&masks, state)
    }

    /// Everything after classification: projection, fusion, detection.
    ///
    /// Exposed so callers with their own rectification can feed masks
    /// directly.
    pub fn process_masks(&self, masks: &TerrainMasks, state: &mut RoverState) -> FrameReport {
        debug_assert_eq!(
            (masks.navigable.width, masks.navigable.height),
            (state.overlay.width, state.overlay.height),
            "mask and overlay sizes differ"
        );

        state.overlay.write_mask(Channel::Obstacle, &masks.obstacle);
        state.overlay.write_mask(Channel::Navigable, &masks.navigable);

        let obstacle_points = rover_coords(&masks.obstacle);
        let navigable_points = rover_coords(&masks.navigable);

        // Clip to the map being written, whatever size the caller allocated.
        let projector = WorldProjector::new(state.world_map.size(), self.scale);
        let obstacle_cells = projector.to_world(&obstacle_points, &state.pose);
        let navigable_cells = projector.to_world(&navigable_points, &state.pose);
        let fusion = fuse(
            &mut state.world_map,
            &obstacle_cells,
            &navigable_cells,
            self.weights,
        );

        let polar = to_polar_all(&navigable_points);
        state.nav_dists = polar.iter().map(|p| p.distance).collect();
        state.nav_angles = polar.iter().map(|p| p.angle).collect();

        let detection = self
            .detector
            .detect(&masks.target, &state.pose, &projector);
        match &detection {
            Some(det) => {
                info!(
                    pixels = det.pixel_count,
                    cell_x = det.location.x,
                    cell_y = det.location.y,
                    distance = det.nearest.distance,
                    "sample rock detected"
                );
                state
                    .world_map
                    .set(Channel::Target, det.location, u32::from(FULL_INTENSITY));
                state.nav_angles = det.angles.clone();
                state.nav_dists = det.distances.clone();
                state.target_visible = true;
                state.target_location = Some(det.location);
                state.overlay.write_mask(Channel::Target, &masks.target);
            }
            None => {
                state.target_visible = false;
                state.target_location = None;
                state.overlay.clear_channel(Channel::Target);
            }
        }

        state.near_sample = false;

        let report = FrameReport {
            navigable_pixels: navigable_points.len(),
            obstacle_pixels: obstacle_points.len(),
            target_pixels: masks.target.count_nonzero(),
            fusion,
            detection,
            mean_nav_angle_deg: state.mean_nav_angle_deg(),
        };
        debug!(
            navigable = report.navigable_pixels,
            obstacle = report.obstacle_pixels,
            target = report.target_pixels,
            cleared = report.fusion.cleared_cells,
            "perception step complete"
        );
        report
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::ColorThresholdClassifier;
    use crate::target::{DetectionWindow, WindowBounds};

    fn pipeline() -> PerceptionPipeline<ColorThresholdClassifier> {
        PerceptionPipeline::new(&PerceptionConfig::default(), ColorThresholdClassifier::default())
            .unwrap()
    }

    #[test]
    fn new_rejects_invalid_config() {
        let cfg = PerceptionConfig {
            world_size: 0,
            ..PerceptionConfig::default()
        };
        let err = PerceptionPipeline::new(&cfg, ColorThresholdClassifier::default()).unwrap_err();
        assert!(matches!(err, PerceptionError::InvalidConfig(_)));
    }

    #[test]
    fn new_rejects_degenerate_source() {
        let cfg = PerceptionConfig {
            source: [[0.0, 0.0], [1.0, 1.0], [2.0, 2.0], [0.0, 5.0]],
            ..PerceptionConfig::default()
        };
        let err = PerceptionPipeline::new(&cfg, ColorThresholdClassifier::default()).unwrap_err();
        assert_eq!(err, PerceptionError::DegenerateQuadrilateral);
    }

    #[test]
    fn empty_masks_produce_empty_outputs() {
        let p = pipeline();
        let mut state = RoverState::for_config(&PerceptionConfig::default(), Pose::default());
        state.nav_angles = vec![1.0, 2.0];
        state.near_sample = true;

        let report = p.process_masks(&TerrainMasks::empty(320, 160), &mut state);
        assert!(state.nav_angles.is_empty());
        assert!(state.nav_dists.is_empty());
        assert!(!state.target_visible);
        assert!(!state.near_sample);
        assert_eq!(report.mean_nav_angle_deg, None);
        assert_eq!(state.world_map.stats().navigable_cells, 0);
    }

    #[test]
    fn missed_target_clears_previous_detection_flags() {
        let cfg = PerceptionConfig {
            target_window: DetectionWindow::new(1, 5, WindowBounds::Inclusive),
            ..PerceptionConfig::default()
        };
        let p = PerceptionPipeline::new(&cfg, ColorThresholdClassifier::default()).unwrap();
        let mut state = RoverState::for_config(&cfg, Pose::new(100.0, 100.0, 0.0));

        let mut masks = TerrainMasks::empty(320, 160);
        masks.target.set(160, 100, true);
        p.process_masks(&masks, &mut state);
        assert!(state.target_visible);
        assert_eq!(state.target_location, Some(GridCell::new(102, 100)));
        assert_eq!(state.overlay.lit_count(Channel::Target), 1);

        p.process_masks(&TerrainMasks::empty(320, 160), &mut state);
        assert!(!state.target_visible);
        assert_eq!(state.target_location, None);
        assert_eq!(state.overlay.lit_count(Channel::Target), 0);
        // The map write persists.
        assert_eq!(
            state.world_map.get(Channel::Target, GridCell::new(102, 100)),
            255
        );
    }

    #[test]
    fn cells_clip_to_the_map_in_state() {
        // Pipeline sized for a 200-cell world, state map only 100 cells.
        let p = pipeline();
        let mut state = RoverState::new(100, 320, 160, Pose::new(150.0, 0.0, 0.0));

        let mut masks = TerrainMasks::empty(320, 160);
        // 60 px straight ahead: world x = 150 + 2, beyond the 100-cell edge.
        masks.navigable.set(160, 100, true);
        let report = p.process_masks(&masks, &mut state);

        let cells: Vec<_> = state.world_map.occupied(Channel::Navigable).collect();
        assert_eq!(cells, vec![(GridCell::new(99, 0), 10)]);
        assert_eq!(report.fusion.navigable_cells, 1);
    }

    #[test]
    fn target_cell_clips_to_the_map_in_state() {
        let cfg = PerceptionConfig {
            target_window: DetectionWindow::new(1, 5, WindowBounds::Inclusive),
            ..PerceptionConfig::default()
        };
        let p = PerceptionPipeline::new(&cfg, ColorThresholdClassifier::default()).unwrap();
        let mut state = RoverState::new(50, 320, 160, Pose::new(120.0, 120.0, 0.0));

        let mut masks = TerrainMasks::empty(320, 160);
        masks.target.set(160, 100, true);
        p.process_masks(&masks, &mut state);

        assert_eq!(state.target_location, Some(GridCell::new(49, 49)));
        assert_eq!(state.world_map.get(Channel::Target, GridCell::new(49, 49)), 255);
    }

    #[test]
    fn mean_nav_angle_is_in_degrees() {
        let mut state = RoverState::new(10, 4, 4, Pose::default());
        state.nav_angles = vec![0.0, std::f64::consts::FRAC_PI_2];
        let mean = state.mean_nav_angle_deg().unwrap();
        assert!((mean - 45.0).abs() < 1e-9);
    }

    #[test]
    fn step_on_black_frame_touches_nothing() {
        let p = pipeline();
        let mut state = RoverState::for_config(&PerceptionConfig::default(), Pose::new(50.0, 50.0, 0.0));
        let report = p.step(&Frame::new(320, 160), &mut state);
        assert_eq!(report.navigable_pixels, 0);
        assert_eq!(report.obstacle_pixels, 0);
        assert_eq!(state.world_map.stats(), Default::default());
    }
}
