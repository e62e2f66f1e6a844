//! Bidirectional cache registry.
//!
//! Tracks which cache entries depend on which entities, enabling exact
//! invalidation when rows change. This is the invalidation-subscription
//! interface the persistence write path talks to via the trigger.

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use super::keys::{CacheKey, EntityKey};

/// Tracks entity → cache_keys and cache_key → entities mappings.
pub struct CacheRegistry {
    /// Maps entities to all cache keys that depend on them.
    entity_to_keys: RwLock<HashMap<EntityKey, HashSet<CacheKey>>>,
    /// Maps cache keys to all entities they depend on.
    key_to_entities: RwLock<HashMap<CacheKey, HashSet<EntityKey>>>,
}

impl CacheRegistry {
    pub fn new() -> Self {
        Self {
            entity_to_keys: RwLock::new(HashMap::new()),
            key_to_entities: RwLock::new(HashMap::new()),
        }
    }

    /// Register a cache entry with the entities it depends on.
    pub fn register(&self, cache_key: CacheKey, entities: HashSet<EntityKey>) {
        let mut e2k = self.entity_to_keys.write().unwrap();
        let mut k2e = self.key_to_entities.write().unwrap();

        for entity in &entities {
            e2k.entry(*entity).or_default().insert(cache_key.clone());
        }
        k2e.insert(cache_key, entities);
    }

    /// All cache keys affected by a change to `entity`.
    pub fn keys_for_entity(&self, entity: &EntityKey) -> HashSet<CacheKey> {
        self.entity_to_keys
            .read()
            .unwrap()
            .get(entity)
            .cloned()
            .unwrap_or_default()
    }

    /// Remove a cache key and clean up its entity mappings. Called when an
    /// entry is evicted or invalidated.
    pub fn unregister(&self, cache_key: &CacheKey) {
        let mut e2k = self.entity_to_keys.write().unwrap();
        let mut k2e = self.key_to_entities.write().unwrap();

        if let Some(entities) = k2e.remove(cache_key) {
            for entity in entities {
                if let Some(keys) = e2k.get_mut(&entity) {
                    keys.remove(cache_key);
                    if keys.is_empty() {
                        e2k.remove(&entity);
                    }
                }
            }
        }
    }

    /// Clear all mappings.
    pub fn clear(&self) {
        self.entity_to_keys.write().unwrap().clear();
        self.key_to_entities.write().unwrap().clear();
    }

    pub fn entity_count(&self) -> usize {
        self.entity_to_keys.read().unwrap().len()
    }

    pub fn key_count(&self) -> usize {
        self.key_to_entities.read().unwrap().len()
    }
}

impl Default for CacheRegistry {
    fn default() -> Self {
        Self::new()
    }
}
