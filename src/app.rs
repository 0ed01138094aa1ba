//! Application Coordinator
//!
//! Runs the two analyses of a comparison session concurrently, joins their
//! results exactly once and hands the ranking to the caller.

use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument, Span};
use uuid::Uuid;

use crate::analysis::{ComparisonEngine, ComparisonReport};
use crate::capture::CapturedFrame;
use crate::shared::{AnalysisSlots, SessionEvent, Slot};
use crate::vision::{OcrResult, TextRecognizer, VisionPipeline};

/// One comparison of two captures of the same subject
pub struct ComparisonSession {
    id: Uuid,
    span: Span,
    pipeline: Arc<VisionPipeline>,
    engine: ComparisonEngine,
    slots: Arc<AnalysisSlots>,
    cancel: CancellationToken,
    events: Sender<SessionEvent>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl ComparisonSession {
    /// Create a session around a recognizer
    ///
    /// Returns the session and the receiving end of its event channel.
    pub fn new(recognizer: Arc<dyn TextRecognizer>) -> (Self, Receiver<SessionEvent>) {
        let (events, event_rx) = unbounded();
        let id = Uuid::new_v4();
        let span = info_span!("session", id = %id);

        let session = Self {
            id,
            span,
            pipeline: Arc::new(VisionPipeline::new(recognizer)),
            engine: ComparisonEngine::new(),
            slots: Arc::new(AnalysisSlots::new()),
            cancel: CancellationToken::new(),
            events,
            tasks: Mutex::new(Vec::new()),
        };
        (session, event_rx)
    }

    /// The span every task of this session runs in
    pub fn span(&self) -> &Span {
        &self.span
    }

    /// Spawn both analyses
    ///
    /// `on_complete` runs once, after both results are in, unless the session
    /// is cancelled first. It runs with the result slots locked and must not
    /// call back into the session. Must be called from within a tokio runtime.
    pub fn start<F>(&self, first: Arc<CapturedFrame>, second: Arc<CapturedFrame>, on_complete: F)
    where
        F: FnOnce(ComparisonReport) + Send + 'static,
    {
        let mut tasks = self.tasks.lock();
        if !tasks.is_empty() {
            warn!(parent: &self.span, "Session {} already started", self.id);
            return;
        }
        if self.cancel.is_cancelled() {
            warn!(parent: &self.span, "Session {} was cancelled before start", self.id);
            return;
        }

        info!(
            parent: &self.span,
            "Comparing {} against {}", first.source, second.source
        );
        let _ = self.events.send(SessionEvent::Started { session_id: self.id });

        self.slots.arm(Box::new(on_complete));

        for (slot, frame) in [(Slot::First, first), (Slot::Second, second)] {
            let task = AnalysisTask {
                slot,
                frame,
                pipeline: self.pipeline.clone(),
                engine: self.engine,
                slots: self.slots.clone(),
                cancel: self.cancel.clone(),
                events: self.events.clone(),
            };
            tasks.push(tokio::spawn(task.run().instrument(self.span.clone())));
        }
    }

    /// Start both analyses and wait for the report
    ///
    /// Returns `None` if the session is cancelled before the join.
    pub async fn run(
        &self,
        first: Arc<CapturedFrame>,
        second: Arc<CapturedFrame>,
    ) -> Option<ComparisonReport> {
        let (tx, rx) = oneshot::channel();
        self.start(first, second, move |report| {
            let _ = tx.send(report);
        });

        tokio::select! {
            _ = self.cancel.cancelled() => None,
            report = rx => report.ok(),
        }
    }

    /// Cancel the session; the join callback will not run after this
    pub fn cancel(&self) {
        if self.cancel.is_cancelled() {
            return;
        }
        self.cancel.cancel();
        if self.slots.seal() {
            info!(parent: &self.span, "Session {} cancelled", self.id);
            let _ = self.events.send(SessionEvent::Cancelled);
        } else {
            debug!(parent: &self.span, "Session {} cancelled after delivery", self.id);
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Cancel, wait for the analysis tasks, then release the recognizer
    pub async fn close(self) {
        self.cancel();

        let tasks = std::mem::take(&mut *self.tasks.lock());
        for task in tasks {
            if let Err(e) = task.await {
                if e.is_panic() {
                    warn!(parent: &self.span, "Analysis task panicked: {}", e);
                }
            }
        }

        self.pipeline.recognizer().close().await;
        debug!(parent: &self.span, "Session {} closed", self.id);
    }
}

impl Drop for ComparisonSession {
    fn drop(&mut self) {
        // Stop any analysis still running
        self.cancel.cancel();
        self.slots.seal();
    }
}

/// One of the two concurrent analyses of a session
struct AnalysisTask {
    slot: Slot,
    frame: Arc<CapturedFrame>,
    pipeline: Arc<VisionPipeline>,
    engine: ComparisonEngine,
    slots: Arc<AnalysisSlots>,
    cancel: CancellationToken,
    events: Sender<SessionEvent>,
}

impl AnalysisTask {
    async fn run(self) {
        let result = tokio::select! {
            _ = self.cancel.cancelled() => {
                debug!("{:?} analysis of {} cancelled", self.slot, self.frame.source);
                return;
            }
            result = self.analyze() => result,
        };

        let Some([first, second]) = self.slots.fill(self.slot, result) else {
            return;
        };

        let report = self.engine.compare(&first, &second);
        let winner = report.winner.clone();
        let score_gap = report.score_gap;

        if !self.slots.deliver(report) {
            debug!("Comparison dropped: session cancelled");
            return;
        }
        info!("Winner: {} (score gap {:.3})", winner, score_gap);
        let _ = self
            .events
            .send(SessionEvent::ComparisonReady { winner, score_gap });
    }

    async fn analyze(&self) -> OcrResult {
        let start = Instant::now();
        let source = self.frame.source.clone();
        debug!(
            "{:?} analysis of {} starting, frame loaded {:?} ago",
            self.slot,
            source,
            self.frame.timestamp.elapsed()
        );

        let metrics = self.pipeline.measure_quality(&self.frame).await;
        let _ = self.events.send(SessionEvent::QualityMeasured {
            slot: self.slot,
            source: source.clone(),
            metrics,
        });

        let result = self
            .pipeline
            .recognize_and_fuse(&self.frame, metrics, start)
            .await;

        if let Some(error) = &result.recognition_error {
            let _ = self.events.send(SessionEvent::RecognitionFailed {
                slot: self.slot,
                source: source.clone(),
                error: error.clone(),
            });
        }
        info!(
            "{} analyzed: {} chars, confidence {:.2}, readability {:.2} in {} ms",
            source,
            result.total_characters,
            result.text_confidence,
            result.readability_score,
            result.processing_time_ms
        );
        let _ = self.events.send(SessionEvent::AnalysisCompleted {
            slot: self.slot,
            source,
            processing_time_ms: result.processing_time_ms,
        });

        result
    }
}
