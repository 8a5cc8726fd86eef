use std::collections::HashSet;
use std::sync::{PoisonError, RwLock};

use crate::core::TaskId;

/// Which tasks have their payload installed in this process.
///
/// Entries are only ever added. Checking and marking are separate steps with
/// no lock held in between, so two first invocations of the same task can
/// both see it as missing and both install it. Collections are expected to
/// tolerate that.
#[derive(Debug, Default)]
pub struct InstallCache {
    installed: RwLock<HashSet<TaskId>>,
}

impl InstallCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: &TaskId) -> bool {
        self.installed
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(id)
    }

    /// Returns `false` if the task was already marked.
    pub fn mark(&self, id: &TaskId) -> bool {
        self.installed
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id.clone())
    }

    pub fn len(&self) -> usize {
        self.installed
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
