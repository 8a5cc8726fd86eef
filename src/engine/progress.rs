use std::fmt;

/// Checkpoints of a single invocation, in the order they are reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    Starting,
    Installing,
    Running,
    Finished,
}

impl Stage {
    pub fn percent(self) -> u8 {
        match self {
            Stage::Starting => 0,
            Stage::Installing => 50,
            Stage::Running => 70,
            Stage::Finished => 100,
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            Stage::Starting => "starting",
            Stage::Installing => "installing",
            Stage::Running => "running",
            Stage::Finished => "finished",
        }
    }
}

/// One progress event. Percentages never decrease within an invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub percent: u8,
    pub message: &'static str,
}

impl From<Stage> for Progress {
    fn from(stage: Stage) -> Self {
        Self {
            percent: stage.percent(),
            message: stage.message(),
        }
    }
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:>3}% {}", self.percent, self.message)
    }
}

/// Receives the progress of one invocation.
pub trait ProgressSink {
    fn report(&mut self, progress: Progress);
}

impl<F> ProgressSink for F
where
    F: FnMut(Progress),
{
    fn report(&mut self, progress: Progress) {
        self(progress)
    }
}

/// Sink that drops every event.
pub struct Silent;

impl ProgressSink for Silent {
    fn report(&mut self, _: Progress) {}
}
