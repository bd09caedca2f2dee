//! `rover-perception` – the rover's camera perception core.
//!
//! Turns one camera frame plus the current pose into an updated world
//! occupancy map, a set of candidate headings, and an optional sample-rock
//! detection.
//!
//! # Modules
//!
//! - [`rectify`] – [`PerspectiveRectifier`][rectify::PerspectiveRectifier]:
//!   fixed four-point homography that warps the camera view to top-down.
//! - [`classifier`] – [`TerrainClassifier`][classifier::TerrainClassifier]:
//!   the seam where rectified pixels become navigable / obstacle / target
//!   masks, plus a colour-threshold implementation.
//! - [`projection`] – rover-centric and polar coordinates of mask pixels, and
//!   [`WorldProjector`][projection::WorldProjector] for rotating, scaling,
//!   translating and clipping them onto the world grid.
//! - [`world_map`] – [`WorldMap`][world_map::WorldMap]: the persistent
//!   three-channel evidence grid.
//! - [`overlay`] – [`DebugOverlay`][overlay::DebugOverlay]: per-frame
//!   visualisation of the masks.
//! - [`fusion`] – weighted accumulation with the navigable-overrides-obstacle
//!   reconciliation pass.
//! - [`target`] – [`TargetDetector`][target::TargetDetector]: pixel-count gate
//!   and nearest-pixel localisation of sample rocks.
//! - [`config`] – [`PerceptionConfig`][config::PerceptionConfig]: the fixed
//!   constants, loadable from TOML.
//! - [`pipeline`] – [`PerceptionPipeline`][pipeline::PerceptionPipeline]:
//!   runs all of the above for one frame against a caller-owned
//!   [`RoverState`][pipeline::RoverState].

pub mod classifier;
pub mod config;
pub mod fusion;
pub mod overlay;
pub mod pipeline;
pub mod projection;
pub mod rectify;
pub mod target;
pub mod world_map;

pub use classifier::{ColorThresholdClassifier, TerrainClassifier, TerrainMasks};
pub use config::PerceptionConfig;
pub use pipeline::{FrameReport, PerceptionPipeline, RoverState};
pub use world_map::{Channel, WorldMap};
