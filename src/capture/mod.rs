//! Capture Layer
//!
//! Photos arrive from the two capture paths as encoded files. This layer
//! decodes them into flat pixel buffers; it never talks to a camera itself.

pub mod frame;

pub use frame::CapturedFrame;

use anyhow::{Context, Result};
use std::path::Path;
use tracing::debug;

/// Load one captured photo from disk, tagged with its capture path
pub fn load_frame(path: &Path, source: &str) -> Result<CapturedFrame> {
    let frame = CapturedFrame::open(path, source)
        .with_context(|| format!("Failed to load {} capture from {:?}", source, path))?;

    let (width, height) = frame.dimensions();
    debug!("Loaded {} capture {:?}: {}x{}", source, path, width, height);

    Ok(frame)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_frame_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("capture.png");

        let image = image::RgbImage::from_pixel(4, 3, image::Rgb([12, 34, 56]));
        image.save(&path).unwrap();

        let frame = load_frame(&path, "Camera Intent").unwrap();
        assert_eq!(frame.dimensions(), (4, 3));
        assert_eq!(frame.rgb(3, 2), [12, 34, 56]);
        assert_eq!(frame.source, "Camera Intent");
    }

    #[test]
    fn test_load_frame_error_names_source() {
        let err = load_frame(Path::new("/nonexistent/a.png"), "CameraX").unwrap_err();
        assert!(err.to_string().contains("CameraX"));
    }
}
