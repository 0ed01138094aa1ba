//! Two-slot rendezvous for the concurrent analyses of one session

use parking_lot::Mutex;
use tracing::warn;

use crate::analysis::ComparisonReport;
use crate::vision::OcrResult;

/// Callback receiving the finished comparison
pub type JoinCallback = Box<dyn FnOnce(ComparisonReport) + Send>;

/// Which capture a result belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    First,
    Second,
}

impl Slot {
    fn index(self) -> usize {
        match self {
            Slot::First => 0,
            Slot::Second => 1,
        }
    }
}

#[derive(Default)]
struct SlotState {
    results: [Option<OcrResult>; 2],
    /// Set once the pair has been handed out
    joined: bool,
    sealed: bool,
    delivered: bool,
    on_join: Option<JoinCallback>,
}

/// Write-once result slots
///
/// The write that completes the pair receives both results. Every other write
/// gets `None`, so exactly one caller ever observes completion. The join
/// callback is delivered and sealed under the same lock, so it never runs once
/// `seal` has returned.
#[derive(Default)]
pub struct AnalysisSlots {
    state: Mutex<SlotState>,
}

impl AnalysisSlots {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install the callback that receives the report
    pub fn arm(&self, on_join: JoinCallback) {
        let mut state = self.state.lock();
        if state.sealed {
            warn!("Not arming sealed slots");
            return;
        }
        state.on_join = Some(on_join);
    }

    /// Store a result; returns `[first, second]` to the writer completing the pair
    pub fn fill(&self, slot: Slot, result: OcrResult) -> Option<[OcrResult; 2]> {
        let mut state = self.state.lock();

        if state.joined || state.sealed {
            warn!("Ignoring {:?} result for {}: session already closed", slot, result.source);
            return None;
        }
        if state.results[slot.index()].is_some() {
            warn!("Ignoring duplicate {:?} result for {}", slot, result.source);
            return None;
        }

        state.results[slot.index()] = Some(result);

        if state.results.iter().all(Option::is_some) {
            let [first, second] = std::mem::take(&mut state.results);
            state.joined = true;
            return first.zip(second).map(|(a, b)| [a, b]);
        }
        None
    }

    /// Hand the report to the join callback unless the slots were sealed
    ///
    /// The callback runs with the slots locked and must not call back into
    /// them. Returns true if it ran.
    pub fn deliver(&self, report: ComparisonReport) -> bool {
        let mut state = self.state.lock();
        if state.sealed {
            return false;
        }
        let Some(on_join) = state.on_join.take() else {
            return false;
        };
        state.delivered = true;
        on_join(report);
        true
    }

    /// Prevent any later join or delivery and drop the callback.
    /// Returns false if the report was already delivered.
    pub fn seal(&self) -> bool {
        let mut state = self.state.lock();
        state.sealed = true;
        state.on_join = None;
        !state.delivered
    }

    #[cfg(test)]
    pub fn is_filled(&self, slot: Slot) -> bool {
        self.state.lock().results[slot.index()].is_some()
    }

    #[cfg(test)]
    pub fn is_joined(&self) -> bool {
        self.state.lock().joined
    }
}
