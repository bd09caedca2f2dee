//! Frame sources for the perception pipeline.
//!
//! The pipeline's homography is calibrated for one frame size, so every
//! source must deliver frames of exactly
//! `PerceptionConfig::frame_width × frame_height`.  Drivers that cannot
//! guarantee this check with [`ensure_frame_size`] before returning.

use rover_types::{Frame, PerceptionError};

/// The rover's forward-looking RGB camera, real or simulated.
pub trait Camera: Send + Sync {
    /// Name used in logs, e.g. `"front_rgb"`.
    fn id(&self) -> &str;

    /// Grab one raw RGB24 frame at the calibrated size.
    ///
    /// # Errors
    ///
    /// [`PerceptionError::Camera`] when no frame could be read and
    /// [`PerceptionError::FrameSizeMismatch`] when the frame has the wrong
    /// dimensions.
    fn capture(&mut self) -> Result<Frame, PerceptionError>;
}

/// Check that `frame` has the `expected` `(width, height)`.
///
/// # Errors
///
/// Returns [`PerceptionError::FrameSizeMismatch`] otherwise.
pub fn ensure_frame_size(frame: &Frame, expected: (usize, usize)) -> Result<(), PerceptionError> {
    let actual = (frame.width, frame.height);
    if actual != expected {
        return Err(PerceptionError::FrameSizeMismatch { expected, actual });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct MockCamera {
        id: String,
        connected: bool,
        size: (usize, usize),
    }

    impl Camera for MockCamera {
        fn id(&self) -> &str {
            &self.id
        }

        fn capture(&mut self) -> Result<Frame, PerceptionError> {
            if !self.connected {
                return Err(PerceptionError::Camera(format!("{} disconnected", self.id)));
            }
            let frame = Frame::new(self.size.0, self.size.1);
            ensure_frame_size(&frame, (2, 2))?;
            Ok(frame)
        }
    }

    #[test]
    fn mock_camera_capture() {
        let mut cam = MockCamera {
            id: "front_rgb".to_string(),
            connected: true,
            size: (2, 2),
        };
        assert_eq!(cam.id(), "front_rgb");
        let frame = cam.capture().unwrap();
        assert_eq!((frame.width, frame.height), (2, 2));
        assert_eq!(frame.data.len(), 12);
    }

    #[test]
    fn disconnected_camera_reports_error() {
        let mut cam = MockCamera {
            id: "front_rgb".to_string(),
            connected: false,
            size: (2, 2),
        };
        let err = cam.capture().unwrap_err();
        assert!(err.to_string().contains("front_rgb"));
    }

    #[test]
    fn driver_rejects_uncalibrated_frame_size() {
        let mut cam = MockCamera {
            id: "front_rgb".to_string(),
            connected: true,
            size: (4, 2),
        };
        assert_eq!(
            cam.capture(),
            Err(PerceptionError::FrameSizeMismatch {
                expected: (2, 2),
                actual: (4, 2)
            })
        );
    }

    #[test]
    fn ensure_frame_size_flags_mismatch() {
        let frame = Frame::new(640, 480);
        assert!(ensure_frame_size(&frame, (640, 480)).is_ok());
        assert_eq!(
            ensure_frame_size(&frame, (320, 160)),
            Err(PerceptionError::FrameSizeMismatch {
                expected: (320, 160),
                actual: (640, 480)
            })
        );
    }
}
