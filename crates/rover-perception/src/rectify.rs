//! Perspective Rectifier.
//!
//! Warps the raw, forward-looking camera frame into a top-down ("bird's-eye")
//! view through a fixed four-point homography.  The homography is solved once
//! at construction from a source quadrilateral (raw-frame pixels) and a
//! destination quadrilateral (rectified-frame pixels); every frame after that
//! is a pure resampling pass.
//!
//! The destination quadrilateral is a small square centred horizontally and
//! anchored near the bottom edge of the image (see [`destination_square`]).
//! Its side length, in rectified pixels, is the number of pixels that cover
//! one world-grid cell, which is why the world scale factor is derived from it.
//!
//! # Example
//!
//! ```rust
//! use nalgebra::Point2;
//! use rover_perception::rectify::{destination_square, PerspectiveRectifier};
//!
//! let source = [
//!     Point2::new(14.0, 140.0),
//!     Point2::new(301.0, 140.0),
//!     Point2::new(200.0, 96.0),
//!     Point2::new(118.0, 96.0),
//! ];
//! let destination = destination_square(320, 160, 15.0, 6.0);
//! let rectifier = PerspectiveRectifier::new(source, destination).unwrap();
//!
//! let p = rectifier.transform_point(Point2::new(14.0, 140.0)).unwrap();
//! assert!((p.x - 145.0).abs() < 1e-6);
//! assert!((p.y - 154.0).abs() < 1e-6);
//! ```

use nalgebra::{Matrix3, Point2, SMatrix, SVector, Vector3};
use rover_types::{Frame, PerceptionError};

/// Four corners, ordered bottom-left, bottom-right, top-right, top-left.
pub type Quad = [Point2<f64>; 4];

const COLLINEAR_EPS: f64 = 1e-9;

/// Build the destination square used by the rectifier.
///
/// `half_width` is half the side of the square in rectified pixels and
/// `bottom_offset` is the gap between the square and the bottom edge.  The
/// corner order matches the source quadrilateral: bottom-left, bottom-right,
/// top-right, top-left.
pub fn destination_square(width: usize, height: usize, half_width: f64, bottom_offset: f64) -> Quad {
    let cx = width as f64 / 2.0;
    let bottom = height as f64 - bottom_offset;
    let top = bottom - 2.0 * half_width;
    [
        Point2::new(cx - half_width, bottom),
        Point2::new(cx + half_width, bottom),
        Point2::new(cx + half_width, top),
        Point2::new(cx - half_width, top),
    ]
}

/// Fixed projective transform from raw camera pixels to rectified pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct PerspectiveRectifier {
    /// Maps raw-frame coordinates to rectified-frame coordinates.
    matrix: Matrix3<f64>,
    /// Maps rectified-frame coordinates back to raw-frame coordinates.
    inverse: Matrix3<f64>,
}

impl PerspectiveRectifier {
    /// Solve the homography mapping `source` onto `destination`.
    ///
    /// # Errors
    ///
    /// Returns [`PerceptionError::DegenerateQuadrilateral`] when either
    /// quadrilateral has three collinear corners or the linear system is
    /// otherwise singular.
    pub fn new(source: Quad, destination: Quad) -> Result<Self, PerceptionError> {
        if has_collinear_triple(&source) || has_collinear_triple(&destination) {
            return Err(PerceptionError::DegenerateQuadrilateral);
        }
        let matrix = solve_homography(&source, &destination)
            .ok_or(PerceptionError::DegenerateQuadrilateral)?;
        let inverse = matrix
            .try_inverse()
            .ok_or(PerceptionError::DegenerateQuadrilateral)?;
        Ok(Self { matrix, inverse })
    }

    /// The raw → rectified homography.
    pub fn matrix(&self) -> &Matrix3<f64> {
        &self.matrix
    }

    /// Map a raw-frame point into the rectified frame.
    ///
    /// Returns `None` for points on the homography's line at infinity.
    pub fn transform_point(&self, p: Point2<f64>) -> Option<Point2<f64>> {
        apply(&self.matrix, p)
    }

    /// Map a rectified-frame point back into the raw frame.
    pub fn inverse_transform_point(&self, p: Point2<f64>) -> Option<Point2<f64>> {
        apply(&self.inverse, p)
    }

    /// Rectify `raw` into a top-down frame of the same dimensions.
    ///
    /// Every output pixel is mapped back through the inverse homography and
    /// bilinearly sampled from `raw`; samples that fall outside `raw` are
    /// black.
    pub fn warp(&self, raw: &Frame) -> Frame {
        resample(raw, &self.inverse)
    }

    /// Project a top-down frame back into the camera's perspective.
    ///
    /// This is the reverse of [`warp`](Self::warp) and is what a simulated
    /// camera uses to render a raw view of a known scene.
    pub fn unwarp(&self, top_down: &Frame) -> Frame {
        resample(top_down, &self.matrix)
    }
}

/// Fill an output frame the size of `src` by sampling `src` at `map · p`.
fn resample(src: &Frame, map: &Matrix3<f64>) -> Frame {
    let mut out = Frame::new(src.width, src.height);
    for y in 0..src.height {
        for x in 0..src.width {
            let Some(p) = apply(map, Point2::new(x as f64, y as f64)) else {
                continue;
            };
            let rgb = sample_bilinear(src, p.x, p.y);
            if rgb != [0, 0, 0] {
                out.set_pixel(x, y, rgb);
            }
        }
    }
    out
}

fn apply(m: &Matrix3<f64>, p: Point2<f64>) -> Option<Point2<f64>> {
    let v = m * Vector3::new(p.x, p.y, 1.0);
    if v.z.abs() < 1e-12 {
        return None;
    }
    let q = Point2::new(v.x / v.z, v.y / v.z);
    (q.x.is_finite() && q.y.is_finite()).then_some(q)
}

/// Bilinear sample with a constant black border.
fn sample_bilinear(frame: &Frame, x: f64, y: f64) -> [u8; 3] {
    let (w, h) = (frame.width as i64, frame.height as i64);
    if !(x > -1.0 && y > -1.0 && x < w as f64 && y < h as f64) {
        return [0; 3];
    }

    let x0 = x.floor();
    let y0 = y.floor();
    let fx = x - x0;
    let fy = y - y0;
    let (x0, y0) = (x0 as i64, y0 as i64);

    let fetch = |cx: i64, cy: i64| -> [f64; 3] {
        if cx < 0 || cy < 0 || cx >= w || cy >= h {
            [0.0; 3]
        } else {
            let p = frame.pixel(cx as usize, cy as usize);
            [p[0] as f64, p[1] as f64, p[2] as f64]
        }
    };

    let p00 = fetch(x0, y0);
    let p10 = fetch(x0 + 1, y0);
    let p01 = fetch(x0, y0 + 1);
    let p11 = fetch(x0 + 1, y0 + 1);

    let mut rgb = [0u8; 3];
    for c in 0..3 {
        let v = p00[c] * (1.0 - fx) * (1.0 - fy)
            + p10[c] * fx * (1.0 - fy)
            + p01[c] * (1.0 - fx) * fy
            + p11[c] * fx * fy;
        rgb[c] = v.round().clamp(0.0, 255.0) as u8;
    }
    rgb
}

/// Direct linear transform for exactly four correspondences with h33 = 1.
fn solve_homography(src: &Quad, dst: &Quad) -> Option<Matrix3<f64>> {
    let mut a = SMatrix::<f64, 8, 8>::zeros();
    let mut b = SVector::<f64, 8>::zeros();

    for (i, (s, d)) in src.iter().zip(dst.iter()).enumerate() {
        let r = 2 * i;
        a[(r, 0)] = s.x;
        a[(r, 1)] = s.y;
        a[(r, 2)] = 1.0;
        a[(r, 6)] = -d.x * s.x;
        a[(r, 7)] = -d.x * s.y;
        b[r] = d.x;

        a[(r + 1, 3)] = s.x;
        a[(r + 1, 4)] = s.y;
        a[(r + 1, 5)] = 1.0;
        a[(r + 1, 6)] = -d.y * s.x;
        a[(r + 1, 7)] = -d.y * s.y;
        b[r + 1] = d.y;
    }

    let lu = a.full_piv_lu();
    if !lu.is_invertible() {
        return None;
    }
    let h = lu.solve(&b)?;
    if h.iter().any(|v| !v.is_finite()) {
        return None;
    }

    Some(Matrix3::new(h[0], h[1], h[2], h[3], h[4], h[5], h[6], h[7], 1.0))
}

fn has_collinear_triple(q: &Quad) -> bool {
    const TRIPLES: [(usize, usize, usize); 4] = [(0, 1, 2), (0, 1, 3), (0, 2, 3), (1, 2, 3)];
    TRIPLES.iter().any(|&(i, j, k)| {
        let (a, b, c) = (q[i], q[j], q[k]);
        let cross = (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x);
        cross.abs() < COLLINEAR_EPS
    })
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn source() -> Quad {
        [
            Point2::new(14.0, 140.0),
            Point2::new(301.0, 140.0),
            Point2::new(200.0, 96.0),
            Point2::new(118.0, 96.0),
        ]
    }

    fn identity_quad() -> Quad {
        [
            Point2::new(0.0, 10.0),
            Point2::new(10.0, 10.0),
            Point2::new(10.0, 0.0),
            Point2::new(0.0, 0.0),
        ]
    }

    #[test]
    fn destination_square_is_centred_and_anchored() {
        let dst = destination_square(320, 160, 15.0, 6.0);
        assert_eq!(dst[0], Point2::new(145.0, 154.0));
        assert_eq!(dst[1], Point2::new(175.0, 154.0));
        assert_eq!(dst[2], Point2::new(175.0, 124.0));
        assert_eq!(dst[3], Point2::new(145.0, 124.0));
    }

    #[test]
    fn source_corners_map_onto_destination() {
        let dst = destination_square(320, 160, 15.0, 6.0);
        let r = PerspectiveRectifier::new(source(), dst).unwrap();
        for (s, d) in source().iter().zip(dst.iter()) {
            let p = r.transform_point(*s).unwrap();
            assert!((p.x - d.x).abs() < 1e-6, "x {} vs {}", p.x, d.x);
            assert!((p.y - d.y).abs() < 1e-6, "y {} vs {}", p.y, d.y);
        }
    }

    #[test]
    fn matrix_is_normalised_and_inverts() {
        let dst = destination_square(320, 160, 15.0, 6.0);
        let r = PerspectiveRectifier::new(source(), dst).unwrap();
        let h = r.matrix();
        assert!((h[(2, 2)] - 1.0).abs() < 1e-12);
        let product = h * h.try_inverse().unwrap();
        assert!((product - Matrix3::identity()).amax() < 1e-9);
    }

    #[test]
    fn inverse_undoes_forward() {
        let dst = destination_square(320, 160, 15.0, 6.0);
        let r = PerspectiveRectifier::new(source(), dst).unwrap();
        let p = Point2::new(160.0, 120.0);
        let back = r
            .inverse_transform_point(r.transform_point(p).unwrap())
            .unwrap();
        assert!((back.x - p.x).abs() < 1e-6);
        assert!((back.y - p.y).abs() < 1e-6);
    }

    #[test]
    fn collinear_source_is_rejected() {
        let mut src = source();
        src[2] = Point2::new(100.0, 140.0);
        let dst = destination_square(320, 160, 15.0, 6.0);
        assert_eq!(
            PerspectiveRectifier::new(src, dst),
            Err(PerceptionError::DegenerateQuadrilateral)
        );
    }

    #[test]
    fn identity_warp_preserves_frame() {
        let r = PerspectiveRectifier::new(identity_quad(), identity_quad()).unwrap();
        let mut frame = Frame::new(6, 4);
        frame.set_pixel(1, 2, [200, 100, 50]);
        frame.set_pixel(5, 3, [1, 2, 3]);
        let out = r.warp(&frame);
        assert_eq!(out, frame);
    }

    #[test]
    fn warp_keeps_dimensions_and_blacks_out_of_view() {
        let dst = destination_square(320, 160, 15.0, 6.0);
        let r = PerspectiveRectifier::new(source(), dst).unwrap();
        let mut frame = Frame::new(320, 160);
        frame.fill([255, 255, 255]);
        let out = r.warp(&frame);
        assert_eq!((out.width, out.height), (320, 160));
        // Directly below the destination square is in view.
        assert_eq!(out.pixel(160, 140), [255, 255, 255]);
        // The bottom corners sit beside the rover, outside the camera's view.
        assert_eq!(out.pixel(0, 159), [0, 0, 0]);
        assert_eq!(out.pixel(319, 159), [0, 0, 0]);
    }

    #[test]
    fn translation_warp_shifts_pixels() {
        let src = identity_quad();
        let dst = src.map(|p| Point2::new(p.x + 2.0, p.y + 1.0));
        let r = PerspectiveRectifier::new(src, dst).unwrap();
        let mut frame = Frame::new(8, 8);
        frame.set_pixel(3, 3, [9, 9, 9]);
        let out = r.warp(&frame);
        assert_eq!(out.pixel(5, 4), [9, 9, 9]);
        assert_eq!(out.pixel(3, 3), [0, 0, 0]);

        let back = r.unwarp(&out);
        assert_eq!(back.pixel(3, 3), [9, 9, 9]);
    }
}
