//! Progress events published by a comparison session

use uuid::Uuid;

use super::state::Slot;
use crate::vision::QualityMetrics;

/// Messages sent from a running session to whoever listens
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// Both analyses were spawned
    Started { session_id: Uuid },
    /// Image quality finished for one capture
    QualityMeasured { slot: Slot, source: String, metrics: QualityMetrics },
    /// The recognizer failed; the result for this capture is degraded
    RecognitionFailed { slot: Slot, source: String, error: String },
    /// One analysis landed in its slot
    AnalysisCompleted {
        slot: Slot,
        source: String,
        processing_time_ms: u64,
    },
    /// Both slots filled and the report was built
    ComparisonReady { winner: String, score_gap: f32 },
    /// The session was cancelled before the join
    Cancelled,
}

impl SessionEvent {
    /// Short label used in logs
    pub fn kind(&self) -> &'static str {
        match self {
            SessionEvent::Started { .. } => "started",
            SessionEvent::QualityMeasured { .. } => "quality_measured",
            SessionEvent::RecognitionFailed { .. } => "recognition_failed",
            SessionEvent::AnalysisCompleted { .. } => "analysis_completed",
            SessionEvent::ComparisonReady { .. } => "comparison_ready",
            SessionEvent::Cancelled => "cancelled",
        }
    }
}
