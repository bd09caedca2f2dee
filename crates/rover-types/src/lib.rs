use serde::{Deserialize, Serialize};
use thiserror::Error;

/// World-frame pose of the rover.
///
/// `x` and `y` are expressed in world-grid cell units; `yaw` is the heading in
/// degrees, measured counter-clockwise from the world +X axis.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Pose {
    pub x: f64,
    pub y: f64,
    pub yaw: f64,
}

impl Pose {
    pub fn new(x: f64, y: f64, yaw: f64) -> Self {
        Self { x, y, yaw }
    }
}

/// A packed RGB24 image frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    /// Frame width in pixels.
    pub width: usize,
    /// Frame height in pixels.
    pub height: usize,
    /// Row-major RGB24 pixel data, `width * height * 3` bytes.
    pub data: Vec<u8>,
}

impl Frame {
    /// An all-black frame.
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            data: vec![0; width * height * 3],
        }
    }

    /// Wrap an existing RGB24 buffer.
    ///
    /// # Errors
    ///
    /// Returns [`PerceptionError::BufferLength`] when `data` does not hold
    /// exactly `width * height * 3` bytes.
    pub fn from_raw(width: usize, height: usize, data: Vec<u8>) -> Result<Self, PerceptionError> {
        let expected = width * height * 3;
        if data.len() != expected {
            return Err(PerceptionError::BufferLength {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// RGB value at column `x`, row `y`.
    #[inline]
    pub fn pixel(&self, x: usize, y: usize) -> [u8; 3] {
        let i = (y * self.width + x) * 3;
        [self.data[i], self.data[i + 1], self.data[i + 2]]
    }

    #[inline]
    pub fn set_pixel(&mut self, x: usize, y: usize, rgb: [u8; 3]) {
        let i = (y * self.width + x) * 3;
        self.data[i..i + 3].copy_from_slice(&rgb);
    }

    /// Fill every pixel with `rgb`.
    pub fn fill(&mut self, rgb: [u8; 3]) {
        for px in self.data.chunks_exact_mut(3) {
            px.copy_from_slice(&rgb);
        }
    }
}

/// A single-class binary mask, one byte per pixel holding 0 or 1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryMask {
    pub width: usize,
    pub height: usize,
    pub data: Vec<u8>,
}

impl BinaryMask {
    /// An empty (all-zero) mask.
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            data: vec![0; width * height],
        }
    }

    /// Build a mask by evaluating `f(col, row)` for every pixel.
    pub fn from_fn(width: usize, height: usize, mut f: impl FnMut(usize, usize) -> bool) -> Self {
        let mut data = Vec::with_capacity(width * height);
        for row in 0..height {
            for col in 0..width {
                data.push(u8::from(f(col, row)));
            }
        }
        Self {
            width,
            height,
            data,
        }
    }

    #[inline]
    pub fn get(&self, col: usize, row: usize) -> bool {
        self.data[row * self.width + col] != 0
    }

    #[inline]
    pub fn set(&mut self, col: usize, row: usize, on: bool) {
        self.data[row * self.width + col] = u8::from(on);
    }

    /// Number of set pixels.
    pub fn count_nonzero(&self) -> usize {
        self.data.iter().filter(|&&v| v != 0).count()
    }

    /// `(row, col)` of every set pixel in row-major order.
    pub fn nonzero(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        let width = self.width;
        self.data
            .iter()
            .enumerate()
            .filter(|(_, v)| **v != 0)
            .map(move |(i, _)| (i / width, i % width))
    }
}

/// Cartesian offset from the rover's camera-projected origin, in rectified
/// pixels. `x` points forward, `y` points to the rover's left.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RoverPoint {
    pub x: f64,
    pub y: f64,
}

impl RoverPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Polar form of a [`RoverPoint`]. `angle` is in radians, positive to the left.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PolarPoint {
    pub distance: f64,
    pub angle: f64,
}

/// Integer world-grid cell. The map is indexed `[y][x]` (row, column).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GridCell {
    pub x: usize,
    pub y: usize,
}

impl GridCell {
    pub fn new(x: usize, y: usize) -> Self {
        Self { x, y }
    }
}

/// Errors raised while building or feeding the perception pipeline.
///
/// The per-frame path itself is total; these surface from configuration,
/// camera drivers, and frame loaders.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PerceptionError {
    #[error("Degenerate quadrilateral: perspective transform is undefined")]
    DegenerateQuadrilateral,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Frame size mismatch: expected {expected:?}, got {actual:?}")]
    FrameSizeMismatch {
        expected: (usize, usize),
        actual: (usize, usize),
    },

    #[error("Frame buffer length mismatch: expected {expected} bytes, got {actual}")]
    BufferLength { expected: usize, actual: usize },

    #[error("Camera error: {0}")]
    Camera(String),
}
