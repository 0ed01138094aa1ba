//! Ranking of two captures of the same scene
//!
//! Scores each fused OCR result with fixed weights and reports the overall
//! winner, per-category winners and short samples of the recognized text.
//! Every comparison uses strict greater-than with the first result on the
//! left, so exact ties go to the second result.

use serde::{Deserialize, Serialize};

use crate::vision::OcrResult;

/// Overall weight of the mean element confidence
const CONFIDENCE_WEIGHT: f32 = 0.3;
/// Overall weight of sharpness
const SHARPNESS_WEIGHT: f32 = 0.25;
/// Overall weight of contrast
const CONTRAST_WEIGHT: f32 = 0.2;
/// Overall weight of the fused readability score
const READABILITY_WEIGHT: f32 = 0.15;
/// Overall weight of the amount of recognized text
const TEXT_DETECTION_WEIGHT: f32 = 0.1;

/// Character count at which text detection saturates
const TEXT_DETECTION_CAP: f32 = 1000.0;

/// Characters kept in a text sample
pub const SAMPLE_CHARS: usize = 100;

/// Marker appended to shortened samples
pub const ELLIPSIS: &str = "...";

/// Headline numbers for one capture
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceSummary {
    pub source: String,
    pub overall_score: f32,
    pub text_block_count: usize,
    pub total_characters: usize,
    pub text_confidence: f32,
    pub sharpness: f32,
    pub contrast: f32,
    pub readability_score: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recognition_error: Option<String>,
}

impl SourceSummary {
    fn from_result(result: &OcrResult) -> Self {
        Self {
            source: result.source.clone(),
            overall_score: overall_score(result),
            text_block_count: result.text_block_count,
            total_characters: result.total_characters,
            text_confidence: result.text_confidence,
            sharpness: result.quality_metrics.sharpness,
            contrast: result.quality_metrics.contrast,
            readability_score: result.readability_score,
            recognition_error: result.recognition_error.clone(),
        }
    }
}

/// Winner label of each category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryWinners {
    /// More characters recognized
    pub text_detection: String,
    pub confidence: String,
    pub sharpness: String,
    pub contrast: String,
    pub readability: String,
}

/// Start of one capture's recognized text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextSample {
    pub source: String,
    /// First characters of the text, with the ellipsis marker when shortened
    pub text: String,
    pub truncated: bool,
}

/// Ranked comparison of two captures
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonReport {
    /// Label of the capture with the higher overall score
    pub winner: String,
    pub runner_up: String,
    /// Absolute difference between the two overall scores
    pub score_gap: f32,
    /// Both captures in the order they were compared
    pub sources: Vec<SourceSummary>,
    /// Both captures, winner first
    pub ranking: Vec<SourceSummary>,
    pub categories: CategoryWinners,
    pub samples: Vec<TextSample>,
    pub recommendations: Vec<String>,
}

/// Weighted overall OCR suitability of one capture
pub fn overall_score(result: &OcrResult) -> f32 {
    let text_detection = (result.total_characters as f32 / TEXT_DETECTION_CAP).min(1.0);

    result.text_confidence * CONFIDENCE_WEIGHT
        + result.quality_metrics.sharpness.min(1.0) * SHARPNESS_WEIGHT
        + result.quality_metrics.contrast.min(1.0) * CONTRAST_WEIGHT
        + result.readability_score * READABILITY_WEIGHT
        + text_detection * TEXT_DETECTION_WEIGHT
}

/// Shorten recognized text to a sample, `None` when there is no text
pub fn text_sample(result: &OcrResult) -> Option<TextSample> {
    if result.extracted_text.is_empty() {
        return None;
    }

    let mut text: String = result.extracted_text.chars().take(SAMPLE_CHARS).collect();
    let truncated = result.extracted_text.chars().nth(SAMPLE_CHARS).is_some();
    if truncated {
        text.push_str(ELLIPSIS);
    }

    Some(TextSample {
        source: result.source.clone(),
        text,
        truncated,
    })
}

/// Compares two fused OCR results
#[derive(Debug, Clone, Copy, Default)]
pub struct ComparisonEngine;

impl ComparisonEngine {
    pub fn new() -> Self {
        Self
    }

    /// Rank `first` against `second`
    pub fn compare(&self, first: &OcrResult, second: &OcrResult) -> ComparisonReport {
        let first_summary = SourceSummary::from_result(first);
        let second_summary = SourceSummary::from_result(second);

        let first_wins = first_summary.overall_score > second_summary.overall_score;
        let label = |first_better: bool| {
            if first_better {
                first.source.clone()
            } else {
                second.source.clone()
            }
        };

        let categories = CategoryWinners {
            text_detection: label(first.total_characters > second.total_characters),
            confidence: label(first.text_confidence > second.text_confidence),
            sharpness: label(first.quality_metrics.sharpness > second.quality_metrics.sharpness),
            contrast: label(first.quality_metrics.contrast > second.quality_metrics.contrast),
            readability: label(first.readability_score > second.readability_score),
        };

        let (winner, runner_up) = if first_wins {
            (&first_summary, &second_summary)
        } else {
            (&second_summary, &first_summary)
        };

        let recommendations = recommendations(winner, runner_up, first_wins);

        ComparisonReport {
            winner: winner.source.clone(),
            runner_up: runner_up.source.clone(),
            score_gap: (first_summary.overall_score - second_summary.overall_score).abs(),
            ranking: vec![winner.clone(), runner_up.clone()],
            sources: vec![first_summary.clone(), second_summary.clone()],
            categories,
            samples: [first, second].into_iter().filter_map(text_sample).collect(),
            recommendations,
        }
    }
}

/// Advice for the winning capture path
///
/// The first capture is the custom pipeline with manual control, the second
/// the device camera app.
fn recommendations(
    winner: &SourceSummary,
    runner_up: &SourceSummary,
    first_wins: bool,
) -> Vec<String> {
    let mut lines = if first_wins {
        vec![
            format!("Use {} for better OCR results", winner.source),
            format!("{} provides more consistent image quality", winner.source),
            "Better manual control leads to optimal OCR conditions".to_string(),
        ]
    } else {
        vec![
            format!("{} produced better OCR results", winner.source),
            "Device's camera app may have better auto-optimization".to_string(),
            format!("Consider using {} for text capture scenarios", winner.source),
        ]
    };

    for summary in [winner, runner_up] {
        if summary.recognition_error.is_some() {
            lines.push(format!(
                "Recognition failed for {}; its score reflects image quality only",
                summary.source
            ));
        }
    }

    lines
}
