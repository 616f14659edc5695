/// Job state definitions for tracking crawl lifecycle
///
/// This module defines all possible states a crawl job can be in.
use std::fmt;

/// Represents the current lifecycle state of a crawl job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobState {
    /// Job has been built but no workers were started
    Idle,

    /// The seed page is being fetched
    Starting,

    /// At least one worker is executing the crawl loop
    Running,

    /// A stop was requested and workers are draining
    Stopping,

    /// The last worker has run the close sequence
    Closed,
}

impl JobState {
    /// Returns true if this is a terminal state
    ///
    /// A closed job cannot be started again without re-seeding.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Closed)
    }

    /// Returns true if workers may still be alive in this state
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Running | Self::Stopping)
    }

    /// Checks whether moving from this state to `next` is allowed
    ///
    /// Valid transitions:
    /// - Idle -> Starting
    /// - Starting -> Running | Idle (seed could not be used)
    /// - Running -> Stopping | Closed
    /// - Stopping -> Closed
    pub fn can_transition_to(&self, next: JobState) -> bool {
        matches!(
            (self, next),
            (Self::Idle, Self::Starting)
                | (Self::Starting, Self::Running)
                | (Self::Starting, Self::Idle)
                | (Self::Running, Self::Stopping)
                | (Self::Running, Self::Closed)
                | (Self::Stopping, Self::Closed)
        )
    }

    /// Returns the lowercase label used in reports
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Starting => "starting",
            Self::Running => "running",
            Self::Stopping => "stopping",
            Self::Closed => "closed",
        }
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
