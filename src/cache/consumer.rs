//! Cache consumer.
//!
//! Drains the event queue and applies the invalidation policy:
//! type+id-scoped eviction for single-object keys, type-scoped eviction for
//! list, filtered-lookup, and memo keys, and predicate evaluation for
//! render-box entries.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use tracing::debug;

use super::config::CacheConfig;
use super::events::{CacheEvent, EventKind, EventQueue};
use super::keys::{CacheKey, EntityKey};
use super::registry::CacheRegistry;
use super::store::CacheStore;

pub struct CacheConsumer {
    config: CacheConfig,
    store: Arc<CacheStore>,
    registry: Arc<CacheRegistry>,
    queue: Arc<EventQueue>,
}

impl CacheConsumer {
    pub fn new(
        config: CacheConfig,
        store: Arc<CacheStore>,
        registry: Arc<CacheRegistry>,
        queue: Arc<EventQueue>,
    ) -> Self {
        Self {
            config,
            store,
            registry,
            queue,
        }
    }

    /// Drain pending events and apply their evictions. Invoked inline by
    /// the trigger after each write, so within one process a read issued
    /// after a save never observes the pre-save cache entry.
    pub async fn consume(&self) {
        if !self.config.is_enabled() {
            return;
        }

        let started = Instant::now();
        let batch = self.config.consume_batch_non_zero();

        loop {
            let events = self.queue.drain(batch);
            if events.is_empty() {
                break;
            }
            for event in &events {
                self.apply(event);
            }
        }

        histogram!("rubrika_cache_consume_ms").record(started.elapsed().as_secs_f64() * 1000.0);
        gauge!("rubrika_cache_event_queue_len").set(self.queue.len() as f64);
    }

    fn apply(&self, event: &CacheEvent) {
        match &event.kind {
            EventKind::Flush => {
                self.store.clear();
                self.registry.clear();
                debug!(event_id = %event.id, "Cache flushed");
            }
            EventKind::RowSaved(row) | EventKind::RowDeleted(row) => {
                let mut affected: HashSet<CacheKey> = self
                    .registry
                    .keys_for_entity(&EntityKey::Rows(row.row_kind()));

                if let Some(target) = row.content_ref() {
                    affected.extend(self.registry.keys_for_entity(&EntityKey::Object(target)));
                    // The object entry itself is evicted even when no read
                    // registered it yet.
                    affected.insert(CacheKey::Object(target));
                }

                let mut evicted = 0u64;
                for key in &affected {
                    self.store.evict(key);
                    self.registry.unregister(key);
                    evicted += 1;
                }

                for key in self.store.evict_boxes_matching(row) {
                    self.registry.unregister(&key);
                    evicted += 1;
                }

                counter!("rubrika_cache_evict_total").increment(evicted);
                debug!(
                    event_id = %event.id,
                    event_epoch = event.epoch,
                    row_kind = ?row.row_kind(),
                    evicted,
                    "Cache event consumed"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use time::OffsetDateTime;
    use uuid::Uuid;

    use crate::cache::events::ChangedRow;
    use crate::domain::entities::{CategoryRecord, Entity, ListingRecord};
    use crate::domain::types::{ContentKind, ContentRef, RowKind};

    use super::*;

    fn consumer_parts() -> (CacheConsumer, Arc<CacheStore>, Arc<CacheRegistry>, Arc<EventQueue>)
    {
        let config = CacheConfig::default();
        let store = Arc::new(CacheStore::new(&config));
        let registry = Arc::new(CacheRegistry::new());
        let queue = Arc::new(EventQueue::new());
        let consumer = CacheConsumer::new(
            config,
            store.clone(),
            registry.clone(),
            queue.clone(),
        );
        (consumer, store, registry, queue)
    }

    fn sample_category(site_id: Uuid) -> CategoryRecord {
        let now = OffsetDateTime::now_utc();
        CategoryRecord {
            id: Uuid::new_v4(),
            title: "News".into(),
            slug: "news".into(),
            tree_parent_id: None,
            tree_path: String::new(),
            description: String::new(),
            site_id,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn saving_a_row_evicts_its_object_entry() {
        let (consumer, store, _registry, queue) = consumer_parts();

        let category = sample_category(Uuid::new_v4());
        store.set_object(Entity::Category(category.clone()));

        queue.publish(EventKind::RowSaved(ChangedRow::Category(category.clone())));
        consumer.consume().await;

        assert!(store.get_object(category.content_ref()).is_none());
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn type_scoped_entries_evicted_for_any_row_of_kind() {
        let (consumer, store, registry, queue) = consumer_parts();

        let category_id = Uuid::new_v4();
        let listing = ListingRecord {
            id: Uuid::new_v4(),
            target: ContentRef::new(ContentKind::Article, Uuid::new_v4()),
            category_id,
            publish_from: OffsetDateTime::now_utc(),
            priority_from: None,
            priority_to: None,
            priority_value: None,
            remove: false,
            commercial: false,
            hidden: false,
        };

        store.set_category_listings(category_id, vec![listing.clone()]);
        registry.register(
            CacheKey::CategoryListings(category_id),
            HashSet::from([EntityKey::Rows(RowKind::Listing)]),
        );

        // A different listing row changing still drops the cached list.
        let other = ListingRecord {
            id: Uuid::new_v4(),
            category_id: Uuid::new_v4(),
            ..listing
        };
        queue.publish(EventKind::RowSaved(ChangedRow::Listing(other)));
        consumer.consume().await;

        assert!(store.get_category_listings(category_id).is_none());
        assert_eq!(registry.key_count(), 0);
    }

    #[tokio::test]
    async fn flush_clears_everything() {
        let (consumer, store, registry, queue) = consumer_parts();

        let category = sample_category(Uuid::new_v4());
        store.set_object(Entity::Category(category.clone()));
        registry.register(
            CacheKey::Object(category.content_ref()),
            HashSet::from([EntityKey::Object(category.content_ref())]),
        );

        queue.publish(EventKind::Flush);
        consumer.consume().await;

        assert!(store.get_object(category.content_ref()).is_none());
        assert_eq!(registry.key_count(), 0);
    }
}
