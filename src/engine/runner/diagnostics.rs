use std::fmt::{Display, Formatter};
use std::time::Duration;

use crate::engine::{Outcome, TaskExecution};

/// Execution metrics for spawned invocations.
///
/// Returned by [`Runtime::diagnostics`](crate::Runtime::diagnostics), in the
/// order the invocations finished.
#[derive(Debug, Default, Clone)]
pub struct Diagnostics {
    pub executions: Vec<TaskExecution>,
}

impl Diagnostics {
    pub fn count(&self, outcome: Outcome) -> usize {
        self.executions
            .iter()
            .filter(|e| e.outcome == outcome)
            .count()
    }

    pub fn total_duration(&self) -> Duration {
        self.executions.iter().map(|e| e.duration).sum()
    }

    /// The longest invocation so far.
    pub fn slowest(&self) -> Option<&TaskExecution> {
        self.executions.iter().max_by_key(|e| e.duration)
    }
}

impl Display for Diagnostics {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let width = self
            .executions
            .iter()
            .map(|e| e.task.len())
            .max()
            .unwrap_or(0)
            .max("task".len());

        writeln!(f, "{:<width$}  {:>10}  outcome", "task", "duration")?;
        for e in &self.executions {
            let outcome = match e.outcome {
                Outcome::Finished => "finished",
                Outcome::UnknownTask => "unknown task",
                Outcome::InstallFailure => "install failed",
                Outcome::ExecutionFailure => "run failed",
                Outcome::Abandoned => "abandoned",
            };
            writeln!(
                f,
                "{:<width$}  {:>10}  {outcome}",
                e.task,
                format!("{:.2?}", e.duration)
            )?;
        }

        write!(
            f,
            "{} invocations, {} finished, {:.2?} total",
            self.executions.len(),
            self.count(Outcome::Finished),
            self.total_duration()
        )
    }
}
