mod diagnostics;

use std::sync::mpsc::{Receiver, channel};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use console::style;
use indicatif::ProgressStyle;
use serde_json::Value;
use tracing::Level;
use tracing_indicatif::span_ext::IndicatifSpanExt;

use crate::catalog::Collection;
use crate::catalog::album::AlbumCli;
use crate::config::Config;
use crate::core::Arguments;
use crate::definition::TaskDefinition;
use crate::engine::{Dispatcher, Progress, ProgressSink};
use crate::error::{CatalogError, DispatchError, RunnerError};
use crate::registry::{Refreshed, TaskRegistry};

pub use diagnostics::Diagnostics;

/// How an invocation ended, as kept in diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Finished,
    UnknownTask,
    InstallFailure,
    ExecutionFailure,
    /// The worker went away before the invocation ended.
    Abandoned,
}

impl Outcome {
    fn of(result: &Result<Value, DispatchError>) -> Self {
        match result {
            Ok(_) => Outcome::Finished,
            Err(DispatchError::UnknownTask(_)) => Outcome::UnknownTask,
            Err(DispatchError::InstallFailure(..)) => Outcome::InstallFailure,
            Err(DispatchError::ExecutionFailure(..)) => Outcome::ExecutionFailure,
            Err(DispatchError::Abandoned(_)) => Outcome::Abandoned,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TaskExecution {
    pub task: String,
    pub start: Instant,
    pub duration: Duration,
    pub outcome: Outcome,
}

/// Something that happened during a spawned invocation.
#[derive(Debug, Clone)]
pub enum Event {
    Progress(Progress),
    /// Always the last event.
    Done(Result<Value, DispatchError>),
}

/// Handle to an invocation running on the worker pool.
///
/// Yields progress events followed by exactly one [`Event::Done`].
pub struct Invocation {
    task: String,
    events: Receiver<Event>,
}

impl Invocation {
    pub fn task(&self) -> &str {
        &self.task
    }

    /// Blocks for the next event. `None` once the terminal event was taken
    /// or the worker went away.
    pub fn next_event(&self) -> Option<Event> {
        self.events.recv().ok()
    }

    /// Blocks until the invocation ends, passing progress to `sink`.
    pub fn wait_with(self, sink: &mut dyn ProgressSink) -> Result<Value, DispatchError> {
        while let Some(event) = self.next_event() {
            match event {
                Event::Progress(progress) => sink.report(progress),
                Event::Done(result) => return result,
            }
        }

        Err(DispatchError::Abandoned(self.task))
    }

    /// Blocks until the invocation ends, discarding progress.
    pub fn wait(self) -> Result<Value, DispatchError> {
        self.wait_with(&mut crate::engine::Silent)
    }
}

impl Iterator for Invocation {
    type Item = Event;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_event()
    }
}

/// The surface a host task runtime talks to.
///
/// Owns the registry, the dispatcher and a worker pool. Every spawned
/// invocation gets its own worker and its own progress bar.
pub struct Runtime {
    collection: Arc<dyn Collection>,
    dispatcher: Arc<Dispatcher>,
    pool: rayon::ThreadPool,
    executions: Arc<Mutex<Vec<TaskExecution>>>,
    pb_style: ProgressStyle,
}

impl Runtime {
    /// Refreshes the catalog and starts the worker pool.
    ///
    /// A catalog that can't be loaded is fatal here.
    pub fn new(collection: Arc<dyn Collection>, config: &Config) -> Result<Self, RunnerError> {
        let pb_style = crate::utils::get_style_invocation()?;

        let registry = Arc::new(TaskRegistry::new());
        let refreshed = registry.refresh(collection.as_ref())?;

        tracing::info!(
            tasks = %style(refreshed.registered).bold(),
            skipped = refreshed.skipped,
            "catalog loaded"
        );

        let mut builder =
            rayon::ThreadPoolBuilder::new().thread_name(|i| format!("album-worker-{i}"));
        if let Some(workers) = config.workers {
            builder = builder.num_threads(workers.get());
        }
        let pool = builder.build()?;

        Ok(Self {
            dispatcher: Arc::new(Dispatcher::new(registry, collection.clone())),
            collection,
            pool,
            executions: Arc::default(),
            pb_style,
        })
    }

    /// Starts a runtime over the `album` command line, configured from the
    /// environment (see [`Config::from_env`]).
    pub fn from_env() -> Result<Self, RunnerError> {
        Self::from_lookup(|key| std::env::var_os(key).map(|value| value.into_string()))
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self, RunnerError>
    where
        F: Fn(&str) -> Option<Result<String, std::ffi::OsString>>,
    {
        let config = Config::from_lookup(lookup)?;
        Self::new(Arc::new(AlbumCli::from_config(&config)), &config)
    }

    /// Rebuilds every task definition from the collection.
    ///
    /// Install state survives a refresh.
    pub fn refresh(&self) -> Result<Refreshed, CatalogError> {
        self.dispatcher.registry().refresh(self.collection.as_ref())
    }

    pub fn registry(&self) -> &TaskRegistry {
        self.dispatcher.registry()
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn list_available_tasks(&self) -> Vec<Arc<TaskDefinition>> {
        self.dispatcher.registry().list()
    }

    /// Runs an invocation on the calling thread.
    pub fn invoke(
        &self,
        task: &str,
        args: &Arguments,
        sink: &mut dyn ProgressSink,
    ) -> Result<Value, DispatchError> {
        self.dispatcher.dispatch(task, args, sink)
    }

    /// Queues an invocation on the worker pool and returns right away.
    pub fn spawn_invocation(&self, task: impl Into<String>, args: Arguments) -> Invocation {
        let task = task.into();
        let (sender, receiver) = channel();

        let dispatcher = self.dispatcher.clone();
        let executions = self.executions.clone();
        let pb_style = self.pb_style.clone();
        let name = task.clone();

        self.pool.spawn(move || {
            let span = tracing::span!(Level::INFO, "invocation", task = %name);
            span.pb_set_style(&pb_style);
            span.pb_set_length(100);
            span.pb_set_message(&name);
            let _enter = span.enter();

            let start = Instant::now();

            let mut sink = |progress: Progress| {
                span.pb_set_position(u64::from(progress.percent));
                span.pb_set_message(&format!("{name} {}", progress.message));
                // the handle may have been dropped, the work goes on regardless
                let _ = sender.send(Event::Progress(progress));
            };
            let result = dispatcher.dispatch(&name, &args, &mut sink);

            let duration = start.elapsed();
            executions
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(TaskExecution {
                    task: name.clone(),
                    start,
                    duration,
                    outcome: Outcome::of(&result),
                });

            let _ = sender.send(Event::Done(result));
        });

        Invocation {
            task,
            events: receiver,
        }
    }

    /// Timings of every spawned invocation that has finished so far.
    pub fn diagnostics(&self) -> Diagnostics {
        Diagnostics {
            executions: self
                .executions
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone(),
        }
    }
}
