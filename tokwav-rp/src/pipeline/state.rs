//! Pipeline run states

use std::fmt;

/// Where a run currently is
///
/// `Resampling`/`Writing` carry `None` for the single whole-buffer pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Validating,
    Demuxing,
    Decoding(usize),
    Resampling(Option<usize>),
    Writing(Option<usize>),
    Finalizing,
    Done,
    Aborted,
}

impl PipelineState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineState::Done | PipelineState::Aborted)
    }

    /// Legal transitions. Any non-terminal state may abort.
    pub fn can_transition_to(&self, next: PipelineState) -> bool {
        use PipelineState::*;

        if next == Aborted {
            return !self.is_terminal();
        }

        match (*self, next) {
            (Validating, Demuxing) => true,
            (Demuxing, Decoding(0)) | (Demuxing, Finalizing) => true,
            // Per-segment: resample the batch just decoded, or write an empty one directly
            (Decoding(i), Resampling(Some(j))) | (Decoding(i), Writing(Some(j))) => i == j,
            // Whole-buffer: keep decoding, then one resample/write pass
            (Decoding(i), Decoding(j)) => j == i + 1,
            (Decoding(_), Resampling(None)) | (Decoding(_), Finalizing) => true,
            (Resampling(a), Writing(b)) => a == b,
            (Writing(Some(i)), Decoding(j)) => j == i + 1,
            (Writing(_), Finalizing) => true,
            (Finalizing, Done) => true,
            _ => false,
        }
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineState::Validating => write!(f, "validating"),
            PipelineState::Demuxing => write!(f, "demuxing"),
            PipelineState::Decoding(i) => write!(f, "decoding(batch {})", i),
            PipelineState::Resampling(Some(i)) => write!(f, "resampling(batch {})", i),
            PipelineState::Resampling(None) => write!(f, "resampling(whole buffer)"),
            PipelineState::Writing(Some(i)) => write!(f, "writing(batch {})", i),
            PipelineState::Writing(None) => write!(f, "writing(whole buffer)"),
            PipelineState::Finalizing => write!(f, "finalizing"),
            PipelineState::Done => write!(f, "done"),
            PipelineState::Aborted => write!(f, "aborted"),
        }
    }
}
