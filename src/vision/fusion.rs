//! Fusion of image quality and recognizer output
//!
//! Turns a recognizer outcome plus the frame's quality metrics into a single
//! [`OcrResult`] with a readability score. A failed recognition still yields
//! a complete result so two captures can always be compared.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use super::ocr::{RecognitionError, TextDetection};
use super::quality::QualityMetrics;

/// Readability weight of the mean element confidence
const CONFIDENCE_WEIGHT: f32 = 0.4;
/// Readability weight of sharpness
const SHARPNESS_WEIGHT: f32 = 0.3;
/// Readability weight of contrast
const CONTRAST_WEIGHT: f32 = 0.2;
/// Readability weight of text density
const TEXT_DENSITY_WEIGHT: f32 = 0.1;

/// Characters per pixel are scaled by this before capping at 1
const DENSITY_SCALE: f32 = 1_000_000.0;

/// Fused OCR quality of one capture
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcrResult {
    /// Capture path label
    pub source: String,
    /// Mean reported element confidence (0.0 - 1.0)
    pub text_confidence: f32,
    /// Number of top-level text blocks
    pub text_block_count: usize,
    /// Characters in the recognized text
    pub total_characters: usize,
    /// Fused readability (0.0 - 1.0)
    pub readability_score: f32,
    /// Image quality of the capture
    pub quality_metrics: QualityMetrics,
    /// Full recognized text
    pub extracted_text: String,
    /// Wall-clock time for quality measurement plus recognition
    pub processing_time_ms: u64,
    /// Recognition failure, kept for diagnostics only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recognition_error: Option<String>,
}

/// Combines recognizer output with quality metrics
#[derive(Debug, Clone, Copy, Default)]
pub struct OcrScoreFusion;

impl OcrScoreFusion {
    pub fn new() -> Self {
        Self
    }

    /// Build the fused result for one capture
    pub fn fuse(
        &self,
        outcome: Result<TextDetection, RecognitionError>,
        quality_metrics: QualityMetrics,
        source: &str,
        elapsed: Duration,
    ) -> OcrResult {
        let processing_time_ms = elapsed.as_millis() as u64;

        let detection = match outcome {
            Ok(detection) => detection,
            Err(error) => {
                warn!("OCR failed for {}: {}", source, error);
                return OcrResult {
                    source: source.to_string(),
                    text_confidence: 0.0,
                    text_block_count: 0,
                    total_characters: 0,
                    readability_score: 0.0,
                    quality_metrics,
                    extracted_text: String::new(),
                    processing_time_ms,
                    recognition_error: Some(error.to_string()),
                };
            }
        };

        let total_characters = detection.char_count();
        let text_confidence = average_confidence(&detection);
        let readability_score =
            readability_score(text_confidence, &quality_metrics, total_characters);

        debug!(
            "OCR for {}: {} blocks, {} chars, confidence={:.3}, readability={:.3}",
            source,
            detection.blocks.len(),
            total_characters,
            text_confidence,
            readability_score
        );

        OcrResult {
            source: source.to_string(),
            text_confidence,
            text_block_count: detection.blocks.len(),
            total_characters,
            readability_score,
            quality_metrics,
            extracted_text: detection.text,
            processing_time_ms,
            recognition_error: None,
        }
    }
}

/// Mean of every reported element confidence, `0` when none are reported
pub fn average_confidence(detection: &TextDetection) -> f32 {
    let (total, count) = detection
        .elements()
        .filter_map(|e| e.confidence)
        .fold((0.0f32, 0usize), |(total, count), c| (total + c, count + 1));

    if count > 0 {
        total / count as f32
    } else {
        0.0
    }
}

/// Recognized characters per pixel, scaled and capped at 1
pub fn text_density(total_characters: usize, resolution: u64) -> f32 {
    if resolution == 0 {
        return 0.0;
    }
    (total_characters as f32 / resolution as f32 * DENSITY_SCALE).min(1.0)
}

/// Weighted readability of a capture
pub fn readability_score(
    text_confidence: f32,
    quality_metrics: &QualityMetrics,
    total_characters: usize,
) -> f32 {
    let density = text_density(total_characters, quality_metrics.resolution);

    text_confidence * CONFIDENCE_WEIGHT
        + quality_metrics.sharpness.min(1.0) * SHARPNESS_WEIGHT
        + quality_metrics.contrast.min(1.0) * CONTRAST_WEIGHT
        + density * TEXT_DENSITY_WEIGHT
}
