//! Vision/OCR Layer
//!
//! Measures image quality and runs text recognition on captured frames, then
//! fuses both into one OCR quality result per capture.
//! Supports multiple OCR backends:
//! - Tesseract command line tool
//! - Replay of detections recorded by another engine

pub mod fusion;
pub mod ocr;
pub mod quality;
pub mod replay;
pub mod tesseract;

#[cfg(test)]
pub mod stub;

pub use fusion::{OcrResult, OcrScoreFusion};
pub use ocr::TextRecognizer;
pub use quality::{QualityAnalyzer, QualityMetrics};
pub use replay::ReplayRecognizer;
pub use tesseract::TesseractRecognizer;

use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::capture::CapturedFrame;
use crate::config::RecognizerSettings;

/// OCR backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OcrBackend {
    /// Tesseract command line tool
    #[default]
    Tesseract,
    /// Recorded detections loaded from JSON files
    Replay,
}

/// Create the recognizer selected in the settings
pub fn create_recognizer(settings: &RecognizerSettings) -> Arc<dyn TextRecognizer> {
    info!("Initializing {:?} OCR backend", settings.backend);
    match settings.backend {
        OcrBackend::Tesseract => Arc::new(TesseractRecognizer::new(
            settings.tesseract_binary.clone(),
            settings.language.clone(),
        )),
        OcrBackend::Replay => Arc::new(ReplayRecognizer::new(settings.recordings.clone())),
    }
}

/// Vision processing pipeline: quality, then recognition, then fusion
pub struct VisionPipeline {
    analyzer: QualityAnalyzer,
    fusion: OcrScoreFusion,
    recognizer: Arc<dyn TextRecognizer>,
}

impl VisionPipeline {
    /// Create a new vision pipeline around a recognizer
    pub fn new(recognizer: Arc<dyn TextRecognizer>) -> Self {
        Self {
            analyzer: QualityAnalyzer::new(),
            fusion: OcrScoreFusion::new(),
            recognizer,
        }
    }

    /// The recognizer this pipeline calls
    pub fn recognizer(&self) -> &Arc<dyn TextRecognizer> {
        &self.recognizer
    }

    /// Analyze one captured frame
    ///
    /// Quality is measured on the blocking pool; recognition is the only
    /// suspension point. Recognition failures come back as degraded results.
    pub async fn analyze(&self, frame: Arc<CapturedFrame>) -> OcrResult {
        let start = Instant::now();
        let quality_metrics = self.measure_quality(&frame).await;
        self.recognize_and_fuse(&frame, quality_metrics, start).await
    }

    /// Measure image quality on the blocking pool
    pub async fn measure_quality(&self, frame: &Arc<CapturedFrame>) -> QualityMetrics {
        let start = Instant::now();
        let analyzer = self.analyzer;
        let quality_frame = frame.clone();

        let metrics =
            match tokio::task::spawn_blocking(move || analyzer.analyze(&quality_frame)).await {
                Ok(metrics) => metrics,
                Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
                Err(e) => {
                    warn!("Quality worker for {} did not finish: {}", frame.source, e);
                    analyzer.analyze(frame)
                }
            };

        debug!("Quality measured for {} in {:?}", frame.source, start.elapsed());
        metrics
    }

    /// Run the recognizer and fuse its outcome with measured quality
    ///
    /// `start` marks the beginning of the whole analysis so the processing
    /// time covers both stages.
    pub async fn recognize_and_fuse(
        &self,
        frame: &CapturedFrame,
        quality_metrics: QualityMetrics,
        start: Instant,
    ) -> OcrResult {
        debug!("Running {} recognizer on {}", self.recognizer.name(), frame.source);
        let outcome = self.recognizer.recognize(frame).await;

        self.fusion
            .fuse(outcome, quality_metrics, &frame.source, start.elapsed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ocr::RecognitionError;
    use stub::{single_line, StubRecognizer};

    fn frame(source: &str) -> Arc<CapturedFrame> {
        let image = image::RgbImage::from_fn(24, 24, |x, _| {
            if x % 4 < 2 {
                image::Rgb([250, 250, 250])
            } else {
                image::Rgb([10, 10, 10])
            }
        });
        Arc::new(CapturedFrame::from_rgb(image.into_raw(), 24, 24, source).unwrap())
    }

    #[tokio::test]
    async fn test_pipeline_fuses_quality_and_text() {
        let stub = StubRecognizer::new().detect(
            "CameraX",
            single_line(&[("RECEIPT", Some(0.9)), ("#42", Some(0.7))]),
        );
        let pipeline = VisionPipeline::new(Arc::new(stub));

        let result = pipeline.analyze(frame("CameraX")).await;
        assert_eq!(result.source, "CameraX");
        assert_eq!(result.extracted_text, "RECEIPT #42");
        assert_eq!(result.total_characters, 11);
        assert!((result.text_confidence - 0.8).abs() < 1e-6);
        assert_eq!(result.quality_metrics.resolution, 24 * 24);
        assert!(result.quality_metrics.sharpness > 0.0);
        assert!(result.readability_score > 0.0);
    }

    #[tokio::test]
    async fn test_pipeline_failure_keeps_quality() {
        let stub = StubRecognizer::new()
            .fail("Camera Intent", RecognitionError::Failed("no engine".to_string()));
        let pipeline = VisionPipeline::new(Arc::new(stub));

        let frame = frame("Camera Intent");
        let expected_quality = QualityAnalyzer::new().analyze(&frame);
        let result = pipeline.analyze(frame).await;

        assert_eq!(result.quality_metrics, expected_quality);
        assert_eq!(result.total_characters, 0);
        assert_eq!(result.readability_score, 0.0);
        assert!(result.recognition_error.is_some());
    }

    #[tokio::test]
    async fn test_silent_engine_is_abandoned() {
        let stub = StubRecognizer::new().respond("CameraX", stub::StubResponse::Silent);
        let pipeline = VisionPipeline::new(Arc::new(stub));

        let result = pipeline.analyze(frame("CameraX")).await;
        assert_eq!(
            result.recognition_error.as_deref(),
            Some("recognizer dropped the request without answering")
        );
    }

    #[test]
    fn test_backend_serde_names() {
        assert_eq!(serde_json::to_string(&OcrBackend::Tesseract).unwrap(), "\"tesseract\"");
        let backend: OcrBackend = serde_json::from_str("\"replay\"").unwrap();
        assert_eq!(backend, OcrBackend::Replay);
    }

    #[test]
    fn test_create_recognizer_by_backend() {
        let mut settings = RecognizerSettings::default();
        assert_eq!(create_recognizer(&settings).name(), "tesseract");

        settings.backend = OcrBackend::Replay;
        assert_eq!(create_recognizer(&settings).name(), "replay");
    }
}
