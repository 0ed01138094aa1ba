//! Deterministic recognizer for tests
//!
//! Answers from canned responses keyed by capture path, through the same
//! callback bridge a real callback-style engine would use.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use super::ocr::{
    completion, RecognitionError, TextBlock, TextDetection, TextElement, TextLine, TextRecognizer,
};
use crate::capture::CapturedFrame;

/// What the stub answers for one capture path
#[derive(Debug, Clone)]
pub enum StubResponse {
    Detect(TextDetection),
    Fail(RecognitionError),
    /// Drop the callback without answering
    Silent,
}

#[derive(Debug, Default)]
pub struct StubRecognizer {
    responses: HashMap<String, StubResponse>,
    delays: HashMap<String, Duration>,
    calls: AtomicUsize,
    closes: Arc<AtomicUsize>,
}

impl StubRecognizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(mut self, source: &str, response: StubResponse) -> Self {
        self.responses.insert(source.to_string(), response);
        self
    }

    pub fn detect(self, source: &str, detection: TextDetection) -> Self {
        self.respond(source, StubResponse::Detect(detection))
    }

    pub fn fail(self, source: &str, error: RecognitionError) -> Self {
        self.respond(source, StubResponse::Fail(error))
    }

    /// Delay the answer for one capture path
    pub fn delay(mut self, source: &str, delay: Duration) -> Self {
        self.delays.insert(source.to_string(), delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Shared counter of `close` calls, readable after the stub is moved
    pub fn close_counter(&self) -> Arc<AtomicUsize> {
        self.closes.clone()
    }
}

#[async_trait]
impl TextRecognizer for StubRecognizer {
    fn name(&self) -> &str {
        "stub"
    }

    async fn recognize(&self, frame: &CapturedFrame) -> Result<TextDetection, RecognitionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let (completion, pending) = completion();
        let response = self.responses.get(&frame.source).cloned();
        let delay = self.delays.get(&frame.source).copied().unwrap_or_default();
        let source = frame.source.clone();

        tokio::spawn(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            match response {
                Some(StubResponse::Detect(detection)) => completion.succeed(detection),
                Some(StubResponse::Fail(error)) => completion.fail(error),
                Some(StubResponse::Silent) => drop(completion),
                None => completion.fail(RecognitionError::NoRecording(source)),
            }
        });

        pending.wait().await
    }

    async fn close(&self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
    }
}

/// One block holding one line of words
pub fn single_line(words: &[(&str, Option<f32>)]) -> TextDetection {
    let elements = words
        .iter()
        .map(|(text, confidence)| TextElement::new(*text, *confidence))
        .collect();
    TextDetection::from_blocks(vec![TextBlock::from_lines(vec![TextLine::from_elements(
        elements,
    )])])
}
