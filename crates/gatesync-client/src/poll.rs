//! Editor hand-off polling states
//!
//! After the panel opens the editor it cannot be called back; it watches the
//! key's timestamp instead. One loop per client:
//!
//! ```text
//! Idle -> Polling -> Converged        (timestamp advanced, one full pull)
//!                 -> TimedOut         (attempts exhausted, one late pull)
//!                 -> Superseded       (a newer context or poll took over)
//! ```

use gatesync_store::Timestamp;
use serde::Serialize;
use std::fmt;
use tokio::task::JoinHandle;

/// Sync state of the panel for its active key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PollState {
    /// No poll running
    #[default]
    Idle,
    /// Waiting for the editor's write
    Polling,
    /// Editor write observed and pulled
    Converged,
    /// No write observed within the attempt budget
    TimedOut,
    /// Replaced by a newer poll or context
    Superseded,
}

impl PollState {
    /// True once the loop has stopped for any reason
    #[inline]
    #[must_use]
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Idle | Self::Polling)
    }
}

impl fmt::Display for PollState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Idle => "idle",
            Self::Polling => "polling",
            Self::Converged => "converged",
            Self::TimedOut => "timed out",
            Self::Superseded => "superseded",
        };
        f.write_str(label)
    }
}

/// How a poll loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollOutcome {
    /// Final state
    pub state: PollState,
    /// Timestamp checks performed (excluding the baseline read)
    pub attempts: u32,
    /// Baseline timestamp read before the editor opened
    pub baseline: Timestamp,
    /// Timestamp observed at convergence, if any
    pub observed: Option<Timestamp>,
}

impl PollOutcome {
    /// Outcome of a loop that was replaced before finishing
    #[inline]
    #[must_use]
    pub fn superseded(baseline: Timestamp, attempts: u32) -> Self {
        Self {
            state: PollState::Superseded,
            attempts,
            baseline,
            observed: None,
        }
    }

    /// True if the editor's write was observed
    #[inline]
    #[must_use]
    pub fn converged(&self) -> bool {
        self.state == PollState::Converged
    }
}

/// Handle to a running poll loop
#[derive(Debug)]
pub struct PollHandle {
    baseline: Timestamp,
    task: JoinHandle<PollOutcome>,
}

impl PollHandle {
    pub(crate) fn new(baseline: Timestamp, task: JoinHandle<PollOutcome>) -> Self {
        Self { baseline, task }
    }

    /// Baseline timestamp of this loop
    #[inline]
    #[must_use]
    pub fn baseline(&self) -> Timestamp {
        self.baseline
    }

    /// Wait for the loop to end; an aborted loop reports [`PollState::Superseded`]
    pub async fn outcome(self) -> PollOutcome {
        let baseline = self.baseline;
        self.task
            .await
            .unwrap_or_else(|_| PollOutcome::superseded(baseline, 0))
    }
}
