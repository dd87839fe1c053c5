/// Run state definitions for a harvest
///
/// A harvester moves through these states exactly once, in order.
use std::fmt;

/// Lifecycle of a harvest run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunState {
    /// Constructed; no tasks or channels exist yet
    Idle,

    /// Search and fetch drivers are running and results are being collected
    Running,

    /// The objective was met or the producers finished; workers are told to stop
    Stopping,

    /// Output closed and every driver joined
    Done,
}

impl RunState {
    /// Returns true if the run can move from this state to `next`
    pub fn can_transition_to(&self, next: RunState) -> bool {
        matches!(
            (self, next),
            (Self::Idle, Self::Running)
                | (Self::Running, Self::Stopping)
                | (Self::Stopping, Self::Done)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Stopping => "stopping",
            Self::Done => "done",
        }
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Why the collection loop stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The requested number of distinct matches was collected
    ObjectiveReached,

    /// Search finished and every queued result was fetched and parsed
    Exhausted,

    /// The run was cancelled from outside (e.g. Ctrl-C)
    Interrupted,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::ObjectiveReached => "objective reached",
            Self::Exhausted => "search results exhausted",
            Self::Interrupted => "interrupted",
        };
        f.write_str(text)
    }
}
