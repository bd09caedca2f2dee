//! `rover-hal` – camera abstraction for the perception stack.
//!
//! # Modules
//!
//! - [`camera`] – [`Camera`][camera::Camera]: the driver trait every frame
//!   source implements.
//! - [`sim`] – [`SimCamera`][sim::SimCamera]: renders raw camera frames from
//!   a top-down [`Scene`][sim::Scene] for headless runs.

pub mod camera;
pub mod sim;

pub use camera::{Camera, ensure_frame_size};
pub use sim::{Scene, SimCamera};
