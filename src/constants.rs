// SPDX-License-Identifier: GPL-3.0-only

//! Application-wide constants

use std::time::Duration;

/// Name of the identity filter pinned at catalog index 0
pub const ORIGINAL_FILTER_NAME: &str = "Original";

/// Lattice points per axis for the built-in colour cubes
pub const BUILTIN_CUBE_SIZE: usize = 17;

/// Filter label timing
pub mod label {
    use super::Duration;

    /// How long the filter name stays up after the last change
    pub const HIDE_DELAY: Duration = Duration::from_secs(3);
}

/// Swipe gesture recognition
pub mod gesture {
    /// Horizontal drag distance (in input units) a swipe must exceed
    pub const SWIPE_THRESHOLD: f32 = 50.0;
}

/// Virtual camera timing and presets
pub mod virtual_camera {
    use super::Duration;
    use crate::backends::camera::types::Resolution;

    /// Frame rate for preview streaming (~30fps)
    pub const FRAME_INTERVAL: Duration = Duration::from_millis(33);

    /// Time between a still request and its delivery
    pub const STILL_LATENCY: Duration = Duration::from_millis(150);

    /// Sensor-native preview size (landscape)
    pub const PREVIEW_RESOLUTION: Resolution = Resolution::new(640, 480);

    /// Largest still-photo preset (landscape, 12 MP)
    pub const MAX_STILL_RESOLUTION: Resolution = Resolution::new(4032, 3024);
}

/// Terminal viewer
pub mod terminal {
    use super::Duration;

    /// Input poll timeout, which also paces redraws
    pub const POLL_INTERVAL: Duration = Duration::from_millis(16);

    /// Gesture units per terminal column when dragging with the mouse
    pub const DRAG_UNITS_PER_CELL: f32 = 10.0;
}

pub mod file_formats {
    /// Image file extensions accepted as a virtual camera source
    pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "bmp", "webp"];

    /// Check if a file extension is a supported image format
    pub fn is_image_extension(ext: &str) -> bool {
        IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str())
    }
}

/// Classify a horizontal drag distance as a swipe
///
/// Dragging left (negative) advances to the next filter, like turning a
/// page; dragging right goes back.
pub fn swipe_from_drag(dx: f32) -> Option<crate::pipelines::filter::SwipeDirection> {
    use crate::pipelines::filter::SwipeDirection;
    if dx < -gesture::SWIPE_THRESHOLD {
        Some(SwipeDirection::Next)
    } else if dx > gesture::SWIPE_THRESHOLD {
        Some(SwipeDirection::Previous)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipelines::filter::SwipeDirection;

    #[test]
    fn test_swipe_threshold() {
        assert_eq!(swipe_from_drag(-50.5), Some(SwipeDirection::Next));
        assert_eq!(swipe_from_drag(-50.0), None);
        assert_eq!(swipe_from_drag(80.0), Some(SwipeDirection::Previous));
        assert_eq!(swipe_from_drag(49.9), None);
        assert_eq!(swipe_from_drag(-10.0), None);
    }

    #[test]
    fn test_image_extensions() {
        assert!(file_formats::is_image_extension("PNG"));
        assert!(!file_formats::is_image_extension("mp4"));
    }
}
