//! Turning catalog solutions into task definitions.
//!
//! [`build`] is a pure function of the index: same input, same output, no
//! I/O. Solutions without a name or version are not faults, they are simply
//! left out.

use serde::Serialize;

use crate::catalog::{Argument, CatalogIndex, Solution};
use crate::core::TaskId;

/// The only argument kind modelled so far.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PortKind {
    String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PortScope {
    Local,
}

/// Plain call-and-return; no generator or long-running semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskKind {
    Function,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArgumentPort {
    pub key: String,
    pub description: String,
    pub kind: PortKind,
    pub scope: PortScope,
    pub nullable: bool,
}

impl From<&Argument> for ArgumentPort {
    fn from(arg: &Argument) -> Self {
        Self {
            key: arg.name.clone(),
            description: arg.description.clone(),
            kind: PortKind::String,
            scope: PortScope::Local,
            nullable: false,
        }
    }
}

/// Schema advertised to the host for one dispatchable task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDefinition {
    #[serde(rename = "name")]
    pub id: TaskId,
    pub args: Vec<ArgumentPort>,
    pub returns: Vec<ArgumentPort>,
    pub stateful: bool,
    pub kind: TaskKind,
    pub is_dev: bool,
}

impl TaskDefinition {
    /// `None` for solutions that can't be identified.
    pub fn from_solution(solution: &Solution) -> Option<Self> {
        let id = solution.id()?;

        Some(Self {
            id,
            args: solution.arguments.iter().map(ArgumentPort::from).collect(),
            returns: Vec::new(),
            stateful: false,
            kind: TaskKind::Function,
            is_dev: true,
        })
    }

    pub fn port(&self, key: &str) -> Option<&ArgumentPort> {
        self.args.iter().find(|port| port.key == key)
    }
}

/// Builds one definition per identifiable solution, in catalog order.
///
/// Duplicate identifiers are kept here; the registry resolves them.
pub fn build(index: &CatalogIndex) -> Vec<(TaskId, TaskDefinition)> {
    let mut definitions = Vec::new();

    for catalog in index.catalogs() {
        for solution in &catalog.solutions {
            match TaskDefinition::from_solution(solution) {
                Some(definition) => definitions.push((definition.id.clone(), definition)),
                None => tracing::debug!(
                    catalog = catalog.name.as_deref().unwrap_or("?"),
                    group = %solution.group,
                    "skipping solution without name or version"
                ),
            }
        }
    }

    definitions
}
