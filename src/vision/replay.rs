//! Replay OCR backend
//!
//! Plays back detections recorded earlier from another engine, one JSON file
//! per capture path. Useful for ranking captures whose recognition ran
//! elsewhere (for example on the phone that took them).

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::debug;

use super::ocr::{RecognitionError, TextBlock, TextDetection, TextLine, TextRecognizer};
use crate::capture::CapturedFrame;

/// Recognizer that returns recorded detections keyed by capture path
#[derive(Debug, Clone, Default)]
pub struct ReplayRecognizer {
    recordings: HashMap<String, PathBuf>,
}

impl ReplayRecognizer {
    pub fn new(recordings: HashMap<String, PathBuf>) -> Self {
        Self { recordings }
    }

}

#[async_trait]
impl TextRecognizer for ReplayRecognizer {
    fn name(&self) -> &str {
        "replay"
    }

    async fn recognize(&self, frame: &CapturedFrame) -> Result<TextDetection, RecognitionError> {
        let path = self
            .recordings
            .get(&frame.source)
            .ok_or_else(|| RecognitionError::NoRecording(frame.source.clone()))?;

        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| RecognitionError::Failed(format!("reading {:?}: {}", path, e)))?;

        let recorded: TextDetection = serde_json::from_str(&content)
            .map_err(|e| RecognitionError::MalformedOutput(format!("{:?}: {}", path, e)))?;
        let detection = fill_missing_text(recorded);

        debug!(
            "replay: {} blocks for {} from {:?}",
            detection.blocks.len(),
            frame.source,
            path
        );
        Ok(detection)
    }
}

/// Rebuild text left empty in a recording from the level below, bottom-up
fn fill_missing_text(detection: TextDetection) -> TextDetection {
    let blocks: Vec<TextBlock> = detection
        .blocks
        .into_iter()
        .map(|block| {
            let lines: Vec<TextLine> = block
                .lines
                .into_iter()
                .map(|line| {
                    if line.text.is_empty() {
                        TextLine::from_elements(line.elements)
                    } else {
                        line
                    }
                })
                .collect();

            if block.text.is_empty() {
                TextBlock::from_lines(lines)
            } else {
                TextBlock {
                    text: block.text,
                    lines,
                }
            }
        })
        .collect();

    if detection.text.is_empty() {
        TextDetection::from_blocks(blocks)
    } else {
        TextDetection {
            text: detection.text,
            blocks,
        }
    }
}
