//! Loading camera frames from image files.

use std::path::Path;

use rover_types::{Frame, PerceptionError};

/// Decode a PNG or JPEG into an RGB24 [`Frame`] of exactly `expected`
/// `(width, height)`.
pub fn load_frame(path: &Path, expected: (usize, usize)) -> Result<Frame, PerceptionError> {
    let img = image::open(path)
        .map_err(|e| PerceptionError::Camera(format!("{}: {}", path.display(), e)))?
        .to_rgb8();
    let (w, h) = (img.width() as usize, img.height() as usize);
    let frame = Frame::from_raw(w, h, img.into_raw())?;
    rover_hal::ensure_frame_size(&frame, expected)?;
    Ok(frame)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    #[test]
    fn png_loads_as_rgb_frame() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("frame.png");
        let mut img = RgbImage::from_pixel(4, 2, Rgb([10, 20, 30]));
        img.put_pixel(3, 1, Rgb([200, 190, 180]));
        img.save(&path).expect("save png");

        let frame = load_frame(&path, (4, 2)).expect("load");
        assert_eq!(frame.pixel(0, 0), [10, 20, 30]);
        assert_eq!(frame.pixel(3, 1), [200, 190, 180]);
    }

    #[test]
    fn wrong_size_is_rejected() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("small.png");
        RgbImage::new(8, 8).save(&path).expect("save png");

        let err = load_frame(&path, (320, 160)).unwrap_err();
        assert_eq!(
            err,
            PerceptionError::FrameSizeMismatch {
                expected: (320, 160),
                actual: (8, 8)
            }
        );
    }

    #[test]
    fn missing_file_is_a_camera_error() {
        let err = load_frame(Path::new("/nonexistent/frame.png"), (320, 160)).unwrap_err();
        assert!(matches!(err, PerceptionError::Camera(_)));
    }
}
