//! OCR (Optical Character Recognition) module
//!
//! Defines the text recognizer capability the engine consumes and the
//! block/line/element structure every backend reports. Recognizers are
//! asynchronous; engines that answer through callbacks are bridged with
//! [`completion`], which delivers exactly one outcome per request.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::oneshot;
use tracing::debug;

use crate::capture::CapturedFrame;

/// Smallest recognized unit, usually a word
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextElement {
    /// Recognized text
    pub text: String,
    /// Recognition confidence (0.0 - 1.0), `None` when the engine reports none
    #[serde(default)]
    pub confidence: Option<f32>,
}

impl TextElement {
    pub fn new(text: impl Into<String>, confidence: Option<f32>) -> Self {
        Self {
            text: text.into(),
            confidence,
        }
    }
}

/// A line of elements
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextLine {
    pub text: String,
    pub elements: Vec<TextElement>,
}

impl TextLine {
    /// Build a line whose text is its elements separated by spaces
    pub fn from_elements(elements: Vec<TextElement>) -> Self {
        let text = elements
            .iter()
            .map(|e| e.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        Self { text, elements }
    }
}

/// A block of lines (a paragraph or column)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextBlock {
    pub text: String,
    pub lines: Vec<TextLine>,
}

impl TextBlock {
    /// Build a block whose text is its lines separated by newlines
    pub fn from_lines(lines: Vec<TextLine>) -> Self {
        let text = lines
            .iter()
            .map(|l| l.text.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        Self { text, lines }
    }
}

/// Everything a recognizer found in one image
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextDetection {
    /// Full recognized text
    pub text: String,
    /// Top-level blocks in reading order
    pub blocks: Vec<TextBlock>,
}

impl TextDetection {
    /// Build a detection whose text is its blocks separated by newlines
    pub fn from_blocks(blocks: Vec<TextBlock>) -> Self {
        let text = blocks
            .iter()
            .map(|b| b.text.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        Self { text, blocks }
    }

    /// All elements across all blocks and lines, in order
    pub fn elements(&self) -> impl Iterator<Item = &TextElement> {
        self.blocks
            .iter()
            .flat_map(|b| b.lines.iter())
            .flat_map(|l| l.elements.iter())
    }

    /// Number of Unicode scalar values in the full text
    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }
}

/// Why a recognizer could not produce a detection
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RecognitionError {
    #[error("recognition engine unavailable: {0}")]
    Unavailable(String),

    #[error("recognition failed: {0}")]
    Failed(String),

    #[error("malformed recognizer output: {0}")]
    MalformedOutput(String),

    #[error("no recorded detection for source '{0}'")]
    NoRecording(String),

    #[error("recognizer dropped the request without answering")]
    Abandoned,

    #[error("recognition cancelled")]
    Cancelled,
}

/// Asynchronous text recognition engine
#[async_trait]
pub trait TextRecognizer: Send + Sync {
    /// Engine name for logs
    fn name(&self) -> &str;

    /// Recognize text in a captured frame
    async fn recognize(&self, frame: &CapturedFrame) -> Result<TextDetection, RecognitionError>;

    /// Release engine resources; called once when the session ends
    async fn close(&self) {}
}

/// Sending half of a single recognition request
///
/// Consumed by [`Completion::resolve`], so a request can only be answered once.
#[derive(Debug)]
pub struct Completion {
    tx: oneshot::Sender<Result<TextDetection, RecognitionError>>,
}

impl Completion {
    /// Deliver the outcome of the request
    pub fn resolve(self, outcome: Result<TextDetection, RecognitionError>) {
        if self.tx.send(outcome).is_err() {
            debug!("Recognition outcome arrived after the request was dropped");
        }
    }

    pub fn succeed(self, detection: TextDetection) {
        self.resolve(Ok(detection));
    }

    pub fn fail(self, error: RecognitionError) {
        self.resolve(Err(error));
    }
}

/// Receiving half of a single recognition request
#[derive(Debug)]
pub struct PendingRecognition {
    rx: oneshot::Receiver<Result<TextDetection, RecognitionError>>,
}

impl PendingRecognition {
    /// Wait for the outcome; a completion dropped unanswered yields `Abandoned`
    pub async fn wait(self) -> Result<TextDetection, RecognitionError> {
        self.rx.await.unwrap_or(Err(RecognitionError::Abandoned))
    }
}

/// Create a linked completion/pending pair for callback-style engines
pub fn completion() -> (Completion, PendingRecognition) {
    let (tx, rx) = oneshot::channel();
    (Completion { tx }, PendingRecognition { rx })
}
