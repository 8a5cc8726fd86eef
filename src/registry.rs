use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use crate::catalog::{self, CatalogIndex, Collection};
use crate::core::TaskId;
use crate::definition::{self, TaskDefinition};
use crate::error::{CatalogError, NotFound};

/// Outcome of a registry refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Refreshed {
    /// Distinct identifiers now registered.
    pub registered: usize,
    /// Solutions left out for lacking a name or version.
    pub skipped: usize,
}

#[derive(Default)]
struct Snapshot {
    order: Vec<Arc<TaskDefinition>>,
    by_id: HashMap<TaskId, usize>,
}

impl Snapshot {
    fn build(definitions: Vec<(TaskId, TaskDefinition)>) -> Self {
        let mut snapshot = Snapshot::default();

        for (id, definition) in definitions {
            let definition = Arc::new(definition);
            match snapshot.by_id.get(&id) {
                // last write wins, but the task keeps its first position
                Some(&slot) => snapshot.order[slot] = definition,
                None => {
                    snapshot.by_id.insert(id, snapshot.order.len());
                    snapshot.order.push(definition);
                }
            }
        }

        snapshot
    }
}

/// Task definitions keyed by identifier.
///
/// Contents are swapped wholesale on refresh. Readers holding a definition
/// keep it alive even after it disappears from the registry.
#[derive(Default)]
pub struct TaskRegistry {
    snapshot: RwLock<Arc<Snapshot>>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_index(index: &CatalogIndex) -> Self {
        let registry = Self::new();
        registry.replace(definition::build(index));
        registry
    }

    /// Re-reads the collection and rebuilds every definition.
    ///
    /// On failure the previous contents stay in place.
    pub fn refresh(&self, collection: &dyn Collection) -> Result<Refreshed, CatalogError> {
        let index = catalog::refresh(collection)?;
        let total = index.solutions().count();
        let definitions = definition::build(&index);
        let skipped = total - definitions.len();

        let registered = self.replace(definitions);
        tracing::info!(registered, skipped, "task registry refreshed");

        Ok(Refreshed {
            registered,
            skipped,
        })
    }

    /// Replaces the contents with the given definitions, returning how many
    /// distinct identifiers they contain.
    pub fn replace(&self, definitions: Vec<(TaskId, TaskDefinition)>) -> usize {
        let snapshot = Arc::new(Snapshot::build(definitions));
        let count = snapshot.order.len();

        *self
            .snapshot
            .write()
            .unwrap_or_else(PoisonError::into_inner) = snapshot;

        count
    }

    /// Every registered definition in catalog order.
    pub fn list(&self) -> Vec<Arc<TaskDefinition>> {
        self.current().order.clone()
    }

    pub fn lookup(&self, id: &str) -> Result<Arc<TaskDefinition>, NotFound> {
        let snapshot = self.current();
        snapshot
            .by_id
            .get(id)
            .map(|&slot| snapshot.order[slot].clone())
            .ok_or_else(|| NotFound(id.to_string()))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.current().by_id.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.current().order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn current(&self) -> Arc<Snapshot> {
        self.snapshot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[cfg(test)]
mod test {
    use serde_json::json;

    use super::*;
    use crate::catalog::{Catalog, Solution};
    use crate::testing::MockCollection;

    #[test]
    fn test_lookup_and_list() {
        let registry = TaskRegistry::from_index(&CatalogIndex::new(vec![Catalog::new(
            "default",
            vec![
                Solution::new("denoise", "1.0").argument("input_image_path", "path"),
                Solution::new("segment", "0.1"),
            ],
        )]));

        let listed: Vec<_> = registry.list().iter().map(|d| d.id.to_string()).collect();
        assert_eq!(listed, ["album:denoise:1.0", "album:segment:0.1"]);

        let denoise = registry.lookup("album:denoise:1.0").unwrap();
        assert_eq!(denoise.args[0].key, "input_image_path");

        assert_eq!(
            registry.lookup("album:denoise:2.0").unwrap_err(),
            NotFound("album:denoise:2.0".into())
        );
    }

    #[test]
    fn test_duplicates_last_write_wins() {
        let registry = TaskRegistry::from_index(&CatalogIndex::new(vec![
            Catalog::new(
                "first",
                vec![
                    Solution::new("denoise", "1.0").argument("old", ""),
                    Solution::new("segment", "0.1"),
                ],
            ),
            Catalog::new("second", vec![Solution::new("denoise", "1.0").argument("new", "")]),
        ]));

        assert_eq!(registry.len(), 2);
        let listed = registry.list();
        assert_eq!(listed[0].id.as_str(), "album:denoise:1.0");
        assert_eq!(listed[0].args[0].key, "new");
    }

    #[test]
    fn test_refresh_counts_skipped() {
        let collection = MockCollection::with_index(json!({
            "catalogs": [{
                "solutions": [
                    { "setup": { "name": "denoise", "version": "1.0" } },
                    { "setup": { "name": "broken" } },
                    { "setup": { "version": "1.0" } }
                ]
            }]
        }));

        let registry = TaskRegistry::new();
        let refreshed = registry.refresh(&collection).unwrap();

        assert_eq!(
            refreshed,
            Refreshed {
                registered: 1,
                skipped: 2
            }
        );
        assert_eq!(registry.len(), 1);
        assert!(registry.contains("album:denoise:1.0"));
    }

    #[test]
    fn test_failed_refresh_keeps_previous_contents() {
        let registry =
            TaskRegistry::from_index(&CatalogIndex::new(vec![Catalog::new(
                "default",
                vec![Solution::new("denoise", "1.0")],
            )]));

        let collection = MockCollection::default().fail_index();
        assert!(registry.refresh(&collection).is_err());
        assert!(registry.contains("album:denoise:1.0"));
    }

    #[test]
    fn test_refresh_replaces_wholesale() {
        let registry =
            TaskRegistry::from_index(&CatalogIndex::new(vec![Catalog::new(
                "default",
                vec![Solution::new("denoise", "1.0")],
            )]));
        let held = registry.lookup("album:denoise:1.0").unwrap();

        let collection = MockCollection::with_index(json!({
            "catalogs": [{ "solutions": [{ "setup": { "name": "segment", "version": "0.1" } }] }]
        }));
        registry.refresh(&collection).unwrap();

        assert!(!registry.contains("album:denoise:1.0"));
        assert!(registry.contains("album:segment:0.1"));
        assert_eq!(held.id.as_str(), "album:denoise:1.0");
    }
}
