#![forbid(unsafe_code)]
#![doc = include_str!("../README.md")]

pub mod catalog;
mod config;
mod core;
pub mod definition;
mod engine;
mod error;
mod registry;
mod utils;

#[cfg(test)]
mod testing;

pub use crate::catalog::album::AlbumCli;
pub use crate::catalog::{Argument, Catalog, CatalogIndex, Collection, Solution};
pub use crate::config::Config;
pub use crate::core::{Arguments, DEFAULT_GROUP, TaskId};
pub use crate::definition::{ArgumentPort, PortKind, PortScope, TaskDefinition, TaskKind};
pub use crate::engine::{
    Diagnostics, Dispatcher, Event, InstallCache, Invocation, Outcome, Progress, ProgressSink,
    Runtime, Silent, Stage, TaskExecution,
};
pub use crate::error::*;
pub use crate::registry::{Refreshed, TaskRegistry};

/// Installs a `tracing` subscriber that keeps log lines and invocation
/// progress bars from overwriting each other.
///
/// Filtering follows `RUST_LOG` and defaults to `info`.
#[cfg(feature = "logging")]
pub fn init_logging() -> Result<(), tracing_subscriber::util::TryInitError> {
    use tracing_indicatif::IndicatifLayer;
    use tracing_subscriber::EnvFilter;
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let indicatif = IndicatifLayer::new();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(indicatif.get_stderr_writer()))
        .with(indicatif)
        .try_init()
}
