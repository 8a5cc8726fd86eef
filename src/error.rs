use std::sync::Arc;

use thiserror::Error;

use crate::core::TaskId;

/// Failure reported by the package manager collaborator.
///
/// Shared behind an `Arc` so that dispatch errors stay `Clone` and can be
/// sent through invocation channels and kept in diagnostics.
#[derive(Debug, Error, Clone)]
#[error(transparent)]
pub struct CollaboratorError(#[from] pub(crate) Arc<anyhow::Error>);

impl CollaboratorError {
    pub fn new(err: impl Into<anyhow::Error>) -> Self {
        Self(Arc::new(err.into()))
    }

    pub fn inner(&self) -> &anyhow::Error {
        &self.0
    }
}

impl From<anyhow::Error> for CollaboratorError {
    fn from(e: anyhow::Error) -> Self {
        CollaboratorError(Arc::new(e))
    }
}

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("Catalog unavailable:\n{0}")]
    CatalogUnavailable(#[from] CatalogError),

    #[error("Failed to build the worker pool")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),

    #[error("Invalid progress bar template: {0}")]
    Style(#[from] indicatif::style::TemplateError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Every variant means the catalog could not be refreshed. None of them are
/// retried automatically.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Couldn't load or create the solution collection.\n{0}")]
    Collection(anyhow::Error),

    #[error("Couldn't read the collection index.\n{0}")]
    Index(anyhow::Error),

    #[error("Collection index has an unexpected shape.\n{0}")]
    Shape(#[from] serde_json::Error),
}

#[derive(Debug, Error, Clone)]
pub enum DispatchError {
    #[error("Unknown task '{0}'")]
    UnknownTask(String),

    #[error("Task '{0}' failed to install:\n{1}")]
    InstallFailure(TaskId, CollaboratorError),

    #[error("Task '{0}' failed to run:\n{1}")]
    ExecutionFailure(TaskId, CollaboratorError),

    #[error("Invocation of '{0}' ended without a result")]
    Abandoned(String),
}

impl DispatchError {
    /// Whether the failure was caused by the caller rather than the system.
    pub fn is_client_error(&self) -> bool {
        matches!(self, DispatchError::UnknownTask(_))
    }
}

impl From<NotFound> for DispatchError {
    fn from(e: NotFound) -> Self {
        DispatchError::UnknownTask(e.0)
    }
}

/// Registry lookup miss.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Task '{0}' not found")]
pub struct NotFound(pub String);

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}: '{1}'")]
    Invalid(&'static str, String),

    #[error("Path in {0} is not valid UTF-8")]
    PathFormat(&'static str),
}
