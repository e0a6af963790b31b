// Wed Feb 04 2026 - Alex

use crate::catalog::{CatalogError, CategoryPath, Layout, LayoutKey};
use indexmap::IndexMap;
use parking_lot::RwLock;
use std::sync::Arc;

/// What `resolve` does when the catalog already holds a layout with the
/// same key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictPolicy {
    /// Last write wins; the previous definition is replaced.
    Replace,
    /// The existing canonical instance is returned unchanged.
    KeepExisting,
    /// The incoming layout is committed under `name_1`, `name_2`, ...
    Rename,
}

/// Shared, deduplicating store of named layouts.
///
/// Committed layouts are immutable (`Arc<Layout>`); editing always happens
/// on an owned copy which is then re-resolved. Iteration order is insertion
/// order, which keeps exports deterministic.
pub struct TypeCatalog {
    inner: RwLock<IndexMap<LayoutKey, Arc<Layout>>>,
}

/// Rename suffixes tried before `resolve` gives up on a conflicted key.
const MAX_RENAME_ATTEMPTS: usize = 1000;

impl TypeCatalog {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(IndexMap::new()),
        }
    }

    /// Commit a layout, returning the catalog's canonical instance.
    pub fn resolve(&self, layout: Layout, policy: ConflictPolicy) -> Result<Arc<Layout>, CatalogError> {
        if layout.name().is_empty() {
            return Err(CatalogError::InvalidName(layout.name().to_string()));
        }
        let mut inner = self.inner.write();
        let key = layout.key().clone();
        if let Some(existing) = inner.get(&key) {
            match policy {
                ConflictPolicy::KeepExisting => return Ok(Arc::clone(existing)),
                ConflictPolicy::Replace => {
                    log::debug!("replacing layout {}", key);
                    let committed = Arc::new(layout);
                    inner.insert(key, Arc::clone(&committed));
                    return Ok(committed);
                }
                ConflictPolicy::Rename => {
                    let mut renamed = layout;
                    for counter in 1..=MAX_RENAME_ATTEMPTS {
                        let candidate =
                            LayoutKey::new(key.category.clone(), format!("{}_{}", key.name, counter));
                        if !inner.contains_key(&candidate) {
                            renamed.set_name(candidate.name.clone());
                            let committed = Arc::new(renamed);
                            inner.insert(candidate, Arc::clone(&committed));
                            return Ok(committed);
                        }
                    }
                    return Err(CatalogError::NamingConflict(key.to_string()));
                }
            }
        }
        let committed = Arc::new(layout);
        inner.insert(key, Arc::clone(&committed));
        Ok(committed)
    }

    pub fn get(&self, key: &LayoutKey) -> Option<Arc<Layout>> {
        self.inner.read().get(key).map(Arc::clone)
    }

    pub fn get_by_name(&self, category: &CategoryPath, name: &str) -> Option<Arc<Layout>> {
        self.get(&LayoutKey::new(category.clone(), name))
    }

    pub fn contains(&self, key: &LayoutKey) -> bool {
        self.inner.read().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    /// All committed layouts as a JSON object keyed by full path.
    pub fn export_json(&self) -> serde_json::Value {
        let inner = self.inner.read();
        let map: serde_json::Map<String, serde_json::Value> = inner
            .iter()
            .map(|(key, layout)| {
                (
                    key.to_string(),
                    serde_json::to_value(layout.as_ref()).unwrap_or(serde_json::Value::Null),
                )
            })
            .collect();
        serde_json::Value::Object(map)
    }
}

impl Default for TypeCatalog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::TypeRef;

    fn layout(name: &str, len: usize) -> Layout {
        let mut l = Layout::new(LayoutKey::new(CategoryPath::root(), name));
        l.grow_to(len);
        l
    }

    #[test]
    fn test_replace_policy_last_write_wins() {
        let catalog = TypeCatalog::new();
        catalog.resolve(layout("S", 8), ConflictPolicy::Replace).unwrap();
        let second = catalog.resolve(layout("S", 16), ConflictPolicy::Replace).unwrap();
        assert_eq!(second.length(), 16);
        let fetched = catalog
            .get_by_name(&CategoryPath::root(), "S")
            .unwrap();
        assert_eq!(fetched.length(), 16);
        assert_eq!(catalog.len(), 1);
    }

    #[test]
    fn test_keep_existing_returns_canonical() {
        let catalog = TypeCatalog::new();
        let first = catalog.resolve(layout("S", 8), ConflictPolicy::Replace).unwrap();
        let kept = catalog.resolve(layout("S", 32), ConflictPolicy::KeepExisting).unwrap();
        assert!(Arc::ptr_eq(&first, &kept));
    }

    #[test]
    fn test_rename_policy() {
        let catalog = TypeCatalog::new();
        catalog.resolve(layout("S", 8), ConflictPolicy::Replace).unwrap();
        let renamed = catalog.resolve(layout("S", 16), ConflictPolicy::Rename).unwrap();
        assert_eq!(renamed.name(), "S_1");
        assert_eq!(catalog.len(), 2);
    }

    #[test]
    fn test_rename_exhaustion_is_a_conflict() {
        let catalog = TypeCatalog::new();
        catalog.resolve(layout("S", 8), ConflictPolicy::Replace).unwrap();
        for _ in 0..MAX_RENAME_ATTEMPTS {
            catalog.resolve(layout("S", 8), ConflictPolicy::Rename).unwrap();
        }
        assert!(matches!(
            catalog.resolve(layout("S", 8), ConflictPolicy::Rename),
            Err(CatalogError::NamingConflict(_))
        ));
    }

    #[test]
    fn test_empty_name_rejected() {
        let catalog = TypeCatalog::new();
        let mut bad = layout("x", 8);
        bad.set_name("");
        assert!(matches!(
            catalog.resolve(bad, ConflictPolicy::Replace),
            Err(CatalogError::InvalidName(_))
        ));
    }

    #[test]
    fn test_export_json_shape() {
        let catalog = TypeCatalog::new();
        let mut l = layout("S", 8);
        l.insert_at_offset(0, TypeRef::Undefined, 8, Some("pad".into()));
        catalog.resolve(l, ConflictPolicy::Replace).unwrap();
        let json = catalog.export_json();
        assert!(json.get("//S").is_some());
    }
}
