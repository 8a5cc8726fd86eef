//! Catalog discovery.
//!
//! A [`Collection`] is the package manager seen from this crate: something
//! that can describe its catalogs and install or run a solution by id. The
//! [`CatalogIndex`] is the validated, read-only snapshot of what it
//! describes, produced by [`refresh`].
//!
//! Index records are loosely structured. The top level has to be an object,
//! but a catalog or solution that doesn't fit the schema is dropped on the
//! floor instead of failing the whole refresh.

pub mod album;

use serde::Deserialize;
use serde_json::Value;

use crate::core::{Arguments, DEFAULT_GROUP, TaskId};
use crate::error::CatalogError;

/// Capabilities the engine needs from the package manager.
///
/// Implementations are shared between worker threads and may be called
/// concurrently, including `install` for the same id.
pub trait Collection: Send + Sync {
    /// Loads the collection, creating its persistent state on first use.
    /// Must be safe to call more than once.
    fn load_or_create(&self) -> anyhow::Result<()>;

    /// Describes every catalog and solution as structured data.
    fn index(&self) -> anyhow::Result<Value>;

    fn is_installed(&self, id: &TaskId) -> anyhow::Result<bool>;

    /// Installs the solution's payload. Expected to be idempotent.
    fn install(&self, id: &TaskId) -> anyhow::Result<()>;

    /// Runs an installed solution with keyword arguments.
    fn run(&self, id: &TaskId, args: &Arguments) -> anyhow::Result<Value>;
}

/// Loads the collection and snapshots its index.
pub fn refresh(collection: &dyn Collection) -> Result<CatalogIndex, CatalogError> {
    collection
        .load_or_create()
        .map_err(CatalogError::Collection)?;

    let raw = collection.index().map_err(CatalogError::Index)?;
    let index = CatalogIndex::from_value(raw)?;

    tracing::debug!(
        catalogs = index.catalogs().len(),
        solutions = index.solutions().count(),
        "catalog index loaded"
    );

    Ok(index)
}

/// Ordered, immutable snapshot of every catalog in a collection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CatalogIndex {
    catalogs: Vec<Catalog>,
}

impl CatalogIndex {
    pub fn new(catalogs: Vec<Catalog>) -> Self {
        Self { catalogs }
    }

    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        Self::from_value(serde_json::from_str(json)?)
    }

    pub fn from_value(value: Value) -> Result<Self, CatalogError> {
        let raw: RawIndex = serde_json::from_value(value)?;

        let catalogs = raw
            .catalogs
            .into_iter()
            .enumerate()
            .filter_map(|(i, value)| match serde_json::from_value::<RawCatalog>(value) {
                Ok(catalog) => Some(catalog.into()),
                Err(e) => {
                    tracing::debug!("skipping catalog #{i}: {e}");
                    None
                }
            })
            .collect();

        Ok(Self { catalogs })
    }

    pub fn catalogs(&self) -> &[Catalog] {
        &self.catalogs
    }

    /// All solutions, in catalog order.
    pub fn solutions(&self) -> impl Iterator<Item = &Solution> {
        self.catalogs.iter().flat_map(|c| c.solutions.iter())
    }

    /// Looks up a solution by id, ignoring ones without a name or version.
    pub fn solution(&self, id: &TaskId) -> Option<&Solution> {
        self.solutions()
            .filter(|s| s.id().as_ref() == Some(id))
            .last()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Catalog {
    pub name: Option<String>,
    pub solutions: Vec<Solution>,
}

impl Catalog {
    pub fn new(name: impl Into<String>, solutions: Vec<Solution>) -> Self {
        Self {
            name: Some(name.into()),
            solutions,
        }
    }
}

/// A solution as discovered. May lack the fields needed to dispatch it.
#[derive(Debug, Clone, PartialEq)]
pub struct Solution {
    pub group: String,
    pub name: Option<String>,
    pub version: Option<String>,
    pub arguments: Vec<Argument>,
    /// Install flag reported by the collection's own bookkeeping, if any.
    pub installed: Option<bool>,
}

impl Solution {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            group: DEFAULT_GROUP.into(),
            name: Some(name.into()),
            version: Some(version.into()),
            arguments: Vec::new(),
            installed: None,
        }
    }

    pub fn group(mut self, group: impl Into<String>) -> Self {
        self.group = group.into();
        self
    }

    pub fn argument(mut self, name: impl Into<String>, description: impl Into<String>) -> Self {
        self.arguments.push(Argument {
            name: name.into(),
            description: description.into(),
        });
        self
    }

    /// `None` when the name or version is missing or empty.
    pub fn id(&self) -> Option<TaskId> {
        let name = self.name.as_deref().filter(|s| !s.is_empty())?;
        let version = self.version.as_deref().filter(|s| !s.is_empty())?;
        Some(TaskId::new(&self.group, name, version))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Argument {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Deserialize)]
struct RawIndex {
    #[serde(default)]
    catalogs: Vec<Value>,
}

#[derive(Deserialize)]
struct RawCatalog {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    solutions: Vec<Value>,
}

#[derive(Deserialize)]
struct RawSolution {
    #[serde(default)]
    setup: RawSetup,
    #[serde(default)]
    internal: Option<RawInternal>,
}

#[derive(Deserialize, Default)]
struct RawSetup {
    #[serde(default = "default_group")]
    group: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    version: Option<String>,
    #[serde(default, alias = "arguments")]
    args: Vec<Argument>,
}

#[derive(Deserialize)]
struct RawInternal {
    #[serde(default)]
    installed: Option<Value>,
}

fn default_group() -> String {
    DEFAULT_GROUP.into()
}

impl From<RawCatalog> for Catalog {
    fn from(raw: RawCatalog) -> Self {
        let solutions = raw
            .solutions
            .into_iter()
            .enumerate()
            .filter_map(|(i, value)| match serde_json::from_value::<RawSolution>(value) {
                Ok(solution) => Some(solution.into()),
                Err(e) => {
                    tracing::debug!(
                        catalog = raw.name.as_deref().unwrap_or("?"),
                        "skipping solution #{i}: {e}"
                    );
                    None
                }
            })
            .collect();

        Catalog {
            name: raw.name,
            solutions,
        }
    }
}

impl From<RawSolution> for Solution {
    fn from(raw: RawSolution) -> Self {
        // album stores the flag as 0/1 in some versions and as a bool in others
        let installed = raw
            .internal
            .and_then(|internal| internal.installed)
            .and_then(|value| match value {
                Value::Bool(flag) => Some(flag),
                Value::Number(n) => n.as_i64().map(|n| n != 0),
                _ => None,
            });

        Solution {
            group: raw.setup.group,
            name: raw.setup.name,
            version: raw.setup.version,
            arguments: raw.setup.args,
            installed,
        }
    }
}
