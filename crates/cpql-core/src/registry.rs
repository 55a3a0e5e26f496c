//! Explicit metadata registry.
//!
//! The engine never consults a process-wide singleton; callers construct
//! a [`MetadataRegistry`] and pass it into the generator and augmenter.
//! Metadata for an entity is computed at most once and is read-only
//! afterward.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::error::{Error, Result};
use crate::metadata::EntityMetadata;

/// Registry of per-entity metadata.
///
/// Concurrent first-population races resolve with a double-checked
/// insert: the first writer wins and later computations for the same
/// entity are discarded. No lock is held while caller-supplied metadata
/// is being computed.
#[derive(Debug, Default)]
pub struct MetadataRegistry {
    entries: RwLock<HashMap<String, Arc<EntityMetadata>>>,
}

impl MetadataRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register metadata for an entity. Returns the stored instance;
    /// if the entity was already registered the existing metadata is
    /// kept and returned (first writer wins).
    pub fn register(&self, metadata: EntityMetadata) -> Arc<EntityMetadata> {
        let entity = metadata.entity.clone();
        if let Some(existing) = self.get(&entity) {
            tracing::debug!(entity = %entity, "metadata already registered, keeping first");
            return existing;
        }
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries
            .entry(entity)
            .or_insert_with(|| Arc::new(metadata))
            .clone()
    }

    /// Register metadata computed by a closure, unless already present.
    ///
    /// The closure runs outside the registry lock; a concurrent winner
    /// makes the loser's computation dead weight, never a conflict.
    pub fn get_or_compute(
        &self,
        entity: &str,
        compute: impl FnOnce() -> EntityMetadata,
    ) -> Arc<EntityMetadata> {
        if let Some(existing) = self.get(entity) {
            return existing;
        }
        self.register(compute())
    }

    /// Look up metadata for an entity.
    pub fn get(&self, entity: &str) -> Option<Arc<EntityMetadata>> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries.get(entity).cloned()
    }

    /// Look up metadata, failing with [`Error::UnknownEntity`] when absent.
    pub fn expect(&self, entity: &str) -> Result<Arc<EntityMetadata>> {
        self.get(entity).ok_or_else(|| Error::UnknownEntity {
            entity: entity.to_string(),
        })
    }

    /// Number of registered entities.
    pub fn len(&self) -> usize {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries.len()
    }

    /// Check whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::PropertyMeta;
    use crate::types::SqlType;

    fn meta(entity: &str) -> EntityMetadata {
        EntityMetadata::new(entity, "t").property(
            PropertyMeta::new("Id", SqlType::BigInt).primary_key(true),
        )
    }

    #[test]
    fn test_register_and_get() {
        let registry = MetadataRegistry::new();
        registry.register(meta("User"));
        assert!(registry.get("User").is_some());
        assert!(registry.get("Order").is_none());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_first_writer_wins() {
        let registry = MetadataRegistry::new();
        let first = EntityMetadata::new("User", "users_v1");
        let second = EntityMetadata::new("User", "users_v2");
        registry.register(first);
        let stored = registry.register(second);
        assert_eq!(stored.table, "users_v1");
        assert_eq!(registry.get("User").unwrap().table, "users_v1");
    }

    #[test]
    fn test_get_or_compute_runs_once() {
        let registry = MetadataRegistry::new();
        let mut calls = 0;
        registry.get_or_compute("User", || {
            calls += 1;
            meta("User")
        });
        registry.get_or_compute("User", || {
            calls += 1;
            meta("User")
        });
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_expect_unknown_entity() {
        let registry = MetadataRegistry::new();
        let err = registry.expect("Ghost").unwrap_err();
        assert_eq!(
            err,
            Error::UnknownEntity {
                entity: "Ghost".to_string()
            }
        );
    }

    #[test]
    fn test_concurrent_population_yields_single_instance() {
        let registry = std::sync::Arc::new(MetadataRegistry::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = std::sync::Arc::clone(&registry);
                std::thread::spawn(move || registry.get_or_compute("User", || meta("User")))
            })
            .collect();
        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        for r in &results {
            assert!(Arc::ptr_eq(r, &results[0]));
        }
        assert_eq!(registry.len(), 1);
    }
}
