//! Perceptual image quality metrics
//!
//! Measures how suitable a captured frame is for text recognition using four
//! independent metrics computed straight from the pixel buffer:
//! - Sharpness: mean squared Laplacian response (edge energy)
//! - Contrast: normalized luma range
//! - Brightness: mean luma
//! - Noise level: mean local variance over 5x5 windows
//!
//! Frames too small for a metric's neighbourhood report `0` for that metric.

use image::GrayImage;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::capture::CapturedFrame;

/// Divisor mapping mean squared responses and variances into `[0, 1]`
const VARIANCE_SCALE: f64 = 10_000.0;

/// Side of the square window used for local variance
const NOISE_WINDOW: usize = 5;

/// Distance kept from each image edge when placing noise windows
const NOISE_MARGIN: usize = NOISE_WINDOW;

/// Quality metrics for a single captured frame
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct QualityMetrics {
    /// Edge energy (0.0 - 1.0)
    pub sharpness: f32,
    /// Luma range relative to the brightest pixel (0.0 - 1.0)
    pub contrast: f32,
    /// Mean luma (0.0 - 1.0)
    pub brightness: f32,
    /// Mean local variance (0.0 - 1.0)
    pub noise_level: f32,
    /// Pixel count, not normalized
    pub resolution: u64,
}

/// Computes [`QualityMetrics`] for captured frames
#[derive(Debug, Clone, Copy, Default)]
pub struct QualityAnalyzer;

impl QualityAnalyzer {
    pub fn new() -> Self {
        Self
    }

    /// Measure all quality metrics for a frame
    pub fn analyze(&self, frame: &CapturedFrame) -> QualityMetrics {
        let gray = grayscale(frame);

        let metrics = QualityMetrics {
            sharpness: sharpness(&gray),
            contrast: contrast(frame),
            brightness: brightness(frame),
            noise_level: noise_level(&gray),
            resolution: frame.pixel_count(),
        };

        debug!(
            "Quality for {} ({}x{}): sharpness={:.4} contrast={:.4} brightness={:.4} noise={:.4}",
            frame.source,
            frame.width,
            frame.height,
            metrics.sharpness,
            metrics.contrast,
            metrics.brightness,
            metrics.noise_level
        );

        metrics
    }
}

/// Weighted luma of one pixel
#[inline]
fn luma(rgb: [u8; 3]) -> f64 {
    0.299 * rgb[0] as f64 + 0.587 * rgb[1] as f64 + 0.114 * rgb[2] as f64
}

/// Convert a frame into an 8-bit grayscale buffer, truncating luma
pub fn grayscale(frame: &CapturedFrame) -> GrayImage {
    let mut gray = GrayImage::new(frame.width, frame.height);
    let width = frame.width as usize;
    let channels = frame.channels;

    for (y, out_row) in gray.chunks_exact_mut(width).enumerate() {
        let row = frame.row(y as u32);
        for (out, px) in out_row.iter_mut().zip(row.chunks_exact(channels)) {
            *out = luma([px[0], px[1], px[2]]) as u8;
        }
    }

    gray
}

/// Mean squared response of the 4-neighbour Laplacian over interior pixels
pub fn sharpness(gray: &GrayImage) -> f32 {
    let (width, height) = gray.dimensions();
    if width < 3 || height < 3 {
        return 0.0;
    }

    let w = width as usize;
    let h = height as usize;
    let px = gray.as_raw();

    // Kernel: [[0,-1,0],[-1,4,-1],[0,-1,0]]
    let mut sum_squared = 0.0f64;
    for y in 1..h - 1 {
        let row = y * w;
        for x in 1..w - 1 {
            let i = row + x;
            let response = 4 * px[i] as i32
                - px[i - 1] as i32
                - px[i + 1] as i32
                - px[i - w] as i32
                - px[i + w] as i32;
            sum_squared += (response * response) as f64;
        }
    }

    let mean = sum_squared / ((w - 2) * (h - 2)) as f64;
    ((mean / VARIANCE_SCALE) as f32).clamp(0.0, 1.0)
}

/// `(max - min) / max` over the luma of every pixel
pub fn contrast(frame: &CapturedFrame) -> f32 {
    let mut min_luma = 255.0f64;
    let mut max_luma = 0.0f64;

    for y in 0..frame.height {
        for px in frame.row(y).chunks_exact(frame.channels) {
            let l = luma([px[0], px[1], px[2]]);
            min_luma = min_luma.min(l);
            max_luma = max_luma.max(l);
        }
    }

    if max_luma > 0.0 {
        ((max_luma - min_luma) / max_luma) as f32
    } else {
        0.0
    }
}

/// Mean luma scaled into `[0, 1]`
pub fn brightness(frame: &CapturedFrame) -> f32 {
    let mut total = 0.0f64;

    for y in 0..frame.height {
        for px in frame.row(y).chunks_exact(frame.channels) {
            total += luma([px[0], px[1], px[2]]);
        }
    }

    (total / frame.pixel_count() as f64 / 255.0) as f32
}

/// Mean 5x5 local variance, sampled away from the image edges
pub fn noise_level(gray: &GrayImage) -> f32 {
    let (width, height) = gray.dimensions();
    let w = width as usize;
    let h = height as usize;
    if w <= 2 * NOISE_MARGIN || h <= 2 * NOISE_MARGIN {
        return 0.0;
    }

    let px = gray.as_raw();
    let half = NOISE_WINDOW / 2;
    let count = (NOISE_WINDOW * NOISE_WINDOW) as f64;

    let mut total_variance = 0.0f64;
    for y in NOISE_MARGIN..h - NOISE_MARGIN {
        for x in NOISE_MARGIN..w - NOISE_MARGIN {
            let mut sum = 0.0f64;
            let mut sum_squared = 0.0f64;

            for wy in y - half..=y + half {
                let row = wy * w;
                for value in &px[row + x - half..=row + x + half] {
                    let v = *value as f64;
                    sum += v;
                    sum_squared += v * v;
                }
            }

            let mean = sum / count;
            total_variance += sum_squared / count - mean * mean;
        }
    }

    let windows = ((w - 2 * NOISE_MARGIN) * (h - 2 * NOISE_MARGIN)) as f64;
    ((total_variance / windows / VARIANCE_SCALE) as f32).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use imageproc::drawing::draw_filled_rect_mut;
    use imageproc::rect::Rect;

    fn uniform_frame(width: u32, height: u32, rgb: [u8; 3]) -> CapturedFrame {
        let image = image::RgbImage::from_pixel(width, height, image::Rgb(rgb));
        CapturedFrame::from_rgb(image.into_raw(), width, height, "test").unwrap()
    }

    fn checkerboard(width: u32, height: u32) -> CapturedFrame {
        let image = image::RgbImage::from_fn(width, height, |x, y| {
            if (x + y) % 2 == 0 {
                image::Rgb([255, 255, 255])
            } else {
                image::Rgb([0, 0, 0])
            }
        });
        CapturedFrame::from_rgb(image.into_raw(), width, height, "test").unwrap()
    }

    /// Deterministic pseudo-random texture
    fn textured(width: u32, height: u32) -> CapturedFrame {
        let mut state = 0x2545_f491u32;
        let image = image::RgbImage::from_fn(width, height, |_, _| {
            state = state.wrapping_mul(1_103_515_245).wrapping_add(12_345);
            let v = (state >> 16) as u8;
            image::Rgb([v, v.wrapping_mul(3), v / 2])
        });
        CapturedFrame::from_rgb(image.into_raw(), width, height, "test").unwrap()
    }

    #[test]
    fn test_grayscale_weights() {
        let frame = CapturedFrame::from_rgb(vec![255, 0, 0, 0, 255, 0], 2, 1, "test").unwrap();
        let gray = grayscale(&frame);
        // 0.299 * 255 = 76.245, 0.587 * 255 = 149.685
        assert_eq!(gray.get_pixel(0, 0).0[0], 76);
        assert_eq!(gray.get_pixel(1, 0).0[0], 149);
    }

    #[test]
    fn test_uniform_image_has_no_contrast_or_edges() {
        let frame = uniform_frame(32, 24, [90, 120, 200]);
        let metrics = QualityAnalyzer::new().analyze(&frame);

        assert_eq!(metrics.contrast, 0.0);
        assert_eq!(metrics.sharpness, 0.0);
        assert!(metrics.noise_level.abs() < 1e-9);
        assert_eq!(metrics.resolution, 32 * 24);
    }

    #[test]
    fn test_black_image_contrast_is_zero() {
        let frame = uniform_frame(8, 8, [0, 0, 0]);
        assert_eq!(contrast(&frame), 0.0);
        assert_eq!(brightness(&frame), 0.0);
    }

    #[test]
    fn test_brightness_of_mid_gray() {
        let frame = uniform_frame(4, 4, [128, 128, 128]);
        let expected = (128.0 * (0.299 + 0.587 + 0.114) / 255.0) as f32;
        assert!((brightness(&frame) - expected).abs() < 1e-6);
    }

    #[test]
    fn test_contrast_of_dark_text_on_white() {
        let mut image = image::RgbImage::from_pixel(40, 20, image::Rgb([255, 255, 255]));
        draw_filled_rect_mut(&mut image, Rect::at(5, 5).of_size(30, 4), image::Rgb([0, 0, 0]));
        let frame = CapturedFrame::from_rgb(image.into_raw(), 40, 20, "test").unwrap();

        assert!((contrast(&frame) - 1.0).abs() < 1e-6);
        assert!(sharpness(&grayscale(&frame)) > 0.0);
    }

    #[test]
    fn test_single_interior_pixel_sharpness() {
        // 3x3 black frame with one lit centre pixel: only one interior position
        let mut data = vec![0u8; 3 * 3 * 3];
        let centre = (3 + 1) * 3;
        data[centre..centre + 3].copy_from_slice(&[20, 20, 20]);
        let frame = CapturedFrame::from_rgb(data, 3, 3, "test").unwrap();

        let gray = grayscale(&frame);
        let g = gray.get_pixel(1, 1).0[0] as f64;
        let expected = ((4.0 * g) * (4.0 * g) / 10_000.0) as f32;

        assert!((sharpness(&gray) - expected).abs() < 1e-6);
    }

    #[test]
    fn test_sharpness_saturates_on_checkerboard() {
        let gray = grayscale(&checkerboard(16, 16));
        assert_eq!(sharpness(&gray), 1.0);
    }

    #[test]
    fn test_sharpness_needs_three_pixels_each_way() {
        assert_eq!(sharpness(&grayscale(&checkerboard(2, 50))), 0.0);
        assert_eq!(sharpness(&grayscale(&checkerboard(50, 2))), 0.0);
        assert!(sharpness(&grayscale(&checkerboard(3, 3))) > 0.0);
    }

    #[test]
    fn test_noise_needs_more_than_ten_pixels_each_way() {
        assert_eq!(noise_level(&grayscale(&checkerboard(10, 40))), 0.0);
        assert_eq!(noise_level(&grayscale(&checkerboard(40, 10))), 0.0);
        assert!(noise_level(&grayscale(&checkerboard(11, 11))) > 0.0);
    }

    #[test]
    fn test_noise_single_window_variance() {
        // 11x11 leaves exactly one window centre at (5, 5)
        let frame = checkerboard(11, 11);
        let gray = grayscale(&frame);

        let mut sum = 0.0f64;
        let mut sum_squared = 0.0f64;
        for y in 3..=7 {
            for x in 3..=7 {
                let v = gray.get_pixel(x, y).0[0] as f64;
                sum += v;
                sum_squared += v * v;
            }
        }
        let mean = sum / 25.0;
        let variance = sum_squared / 25.0 - mean * mean;
        let expected = ((variance / 10_000.0) as f32).clamp(0.0, 1.0);

        assert!((noise_level(&gray) - expected).abs() < 1e-6);
    }

    #[test]
    fn test_metrics_stay_normalized() {
        for (w, h) in [(1, 1), (3, 7), (11, 11), (64, 48)] {
            let metrics = QualityAnalyzer::new().analyze(&textured(w, h));
            for value in [
                metrics.sharpness,
                metrics.contrast,
                metrics.brightness,
                metrics.noise_level,
            ] {
                assert!((0.0..=1.0).contains(&value), "{value} out of range for {w}x{h}");
            }
            assert_eq!(metrics.resolution, w as u64 * h as u64);
        }
    }

    #[test]
    fn test_rgba_and_rgb_agree() {
        let rgb = textured(20, 20);
        let rgba_data: Vec<u8> = rgb
            .data
            .chunks_exact(3)
            .flat_map(|p| [p[0], p[1], p[2], 17])
            .collect();
        let rgba = CapturedFrame::from_rgba(rgba_data, 20, 20, "test").unwrap();

        let analyzer = QualityAnalyzer::new();
        assert_eq!(analyzer.analyze(&rgb), analyzer.analyze(&rgba));
    }
}
