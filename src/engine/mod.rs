//! The per-invocation install-then-run state machine.
//!
//! ```text
//! Idle -> CheckingInstall -> [Installing ->] Running -> ReportingResult -> Done
//!   \            \                 \            \
//!    +------------+-----------------+------------+--> Failed
//! ```
//!
//! A [`Dispatcher`] is shared by every worker. It blocks on the collection
//! for install and run and never yields in between. Nothing here can be
//! cancelled: a host that kills the worker abandons whatever call is in
//! flight.

mod install;
mod progress;
mod runner;

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use serde_json::Value;

use crate::catalog::Collection;
use crate::core::{Arguments, TaskId};
use crate::error::{CollaboratorError, DispatchError};
use crate::registry::TaskRegistry;

pub use crate::engine::install::InstallCache;
pub use crate::engine::progress::{Progress, ProgressSink, Silent, Stage};
pub use crate::engine::runner::{Diagnostics, Event, Invocation, Outcome, Runtime, TaskExecution};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum State {
    Idle,
    CheckingInstall,
    Installing,
    Running,
    ReportingResult,
    Done,
    Failed,
}

pub struct Dispatcher {
    registry: Arc<TaskRegistry>,
    collection: Arc<dyn Collection>,
    installed: InstallCache,
}

impl Dispatcher {
    pub fn new(registry: Arc<TaskRegistry>, collection: Arc<dyn Collection>) -> Self {
        Self {
            registry,
            collection,
            installed: InstallCache::new(),
        }
    }

    pub fn registry(&self) -> &Arc<TaskRegistry> {
        &self.registry
    }

    pub fn install_cache(&self) -> &InstallCache {
        &self.installed
    }

    /// Runs one invocation to completion on the calling thread.
    ///
    /// Progress goes to `sink` strictly before this returns. Arguments are
    /// handed to the collection as they are; checking them against the task's
    /// ports is the collection's business.
    ///
    /// A first call reports `0, 50, 70, 100`. When the collection already
    /// reports the solution installed, install is skipped and so is the `50`
    /// event, exactly as on later calls.
    pub fn dispatch(
        &self,
        id: &str,
        args: &Arguments,
        sink: &mut dyn ProgressSink,
    ) -> Result<Value, DispatchError> {
        let mut invocation = Step {
            state: State::Idle,
            sink,
        };

        let result = self.drive(&mut invocation, id, args);
        if let Err(e) = &result {
            invocation.enter(State::Failed);
            if e.is_client_error() {
                tracing::warn!(task = id, "{e}");
            } else {
                tracing::error!(task = id, "{e}");
            }
        }

        result
    }

    fn drive(&self, step: &mut Step<'_>, id: &str, args: &Arguments) -> Result<Value, DispatchError> {
        let definition = self.registry.lookup(id)?;
        let id = &definition.id;
        step.enter(State::CheckingInstall);
        step.report(Stage::Starting);

        if !self.is_installed(id) {
            step.enter(State::Installing);
            guarded(|| self.collection.install(id))
                .map_err(|e| DispatchError::InstallFailure(id.clone(), e))?;
            self.installed.mark(id);
            step.report(Stage::Installing);
        }

        step.report(Stage::Running);
        step.enter(State::Running);
        let output = guarded(|| self.collection.run(id, args))
            .map_err(|e| DispatchError::ExecutionFailure(id.clone(), e))?;

        step.enter(State::ReportingResult);
        step.report(Stage::Finished);
        step.enter(State::Done);

        Ok(output)
    }

    fn is_installed(&self, id: &TaskId) -> bool {
        if self.installed.contains(id) {
            return true;
        }

        match guarded(|| self.collection.is_installed(id)) {
            Ok(true) => {
                self.installed.mark(id);
                true
            }
            Ok(false) => false,
            Err(e) => {
                tracing::warn!(task = %id, "couldn't check install state, installing: {e}");
                false
            }
        }
    }
}

struct Step<'a> {
    state: State,
    sink: &'a mut dyn ProgressSink,
}

impl Step<'_> {
    fn enter(&mut self, next: State) {
        tracing::debug!(from = ?self.state, to = ?next, "dispatch transition");
        self.state = next;
    }

    fn report(&mut self, stage: Stage) {
        self.sink.report(stage.into());
    }
}

/// Calls into the collection, turning a panic into an ordinary error.
fn guarded<T>(call: impl FnOnce() -> anyhow::Result<T>) -> Result<T, CollaboratorError> {
    match catch_unwind(AssertUnwindSafe(call)) {
        Ok(result) => result.map_err(CollaboratorError::from),
        Err(panic) => {
            let msg = if let Some(s) = panic.downcast_ref::<&str>() {
                format!("collection panicked: {s}")
            } else if let Some(s) = panic.downcast_ref::<String>() {
                format!("collection panicked: {s}")
            } else {
                String::from("collection panicked with unknown payload")
            };

            Err(CollaboratorError::new(anyhow::anyhow!(msg)))
        }
    }
}
