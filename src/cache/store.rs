//! Cache storage.
//!
//! Typed in-memory maps for single objects, unique lookups, cached lists,
//! per-entity memos, and render-box contexts. Uses LRU eviction with
//! configurable limits; access is guarded by poison-recovering locks.

use std::sync::{Arc, RwLock};

use dashmap::DashMap;
use lru::LruCache;
use uuid::Uuid;

use crate::application::boxes::BoxContext;
use crate::domain::entities::{
    CategoryRecord, ChoiceRecord, DependencyRecord, Entity, ListingRecord, RelatedRecord,
};
use crate::domain::types::ContentRef;

use super::config::CacheConfig;
use super::events::ChangedRow;
use super::keys::CacheKey;
use super::lock::rw_write;

const SOURCE: &str = "cache::store";

/// Predicate deciding whether a changed row invalidates a box entry.
pub type BoxTest = Arc<dyn Fn(&ChangedRow) -> bool + Send + Sync>;

/// A cached render-box context together with its invalidation tests.
#[derive(Clone)]
pub struct BoxEntry {
    pub context: BoxContext,
    pub tests: Vec<BoxTest>,
}

/// Object/list cache storage.
pub struct CacheStore {
    // Single objects by polymorphic reference
    objects: RwLock<LruCache<ContentRef, Entity>>,

    // Unique lookups
    categories_by_path: RwLock<LruCache<(Uuid, String), CategoryRecord>>,
    listings_by_pair: RwLock<LruCache<(ContentRef, Uuid), ListingRecord>>,

    // Lists cached as a unit
    category_listings: RwLock<LruCache<Uuid, Vec<ListingRecord>>>,
    target_listings: RwLock<LruCache<ContentRef, Vec<ListingRecord>>>,
    poll_choices: RwLock<LruCache<Uuid, Vec<ChoiceRecord>>>,
    related_by_source: RwLock<LruCache<ContentRef, Vec<RelatedRecord>>>,
    dependencies_by_source: RwLock<LruCache<ContentRef, Vec<DependencyRecord>>>,

    // Memoized per-entity derivations
    memos: DashMap<(ContentRef, &'static str), String>,

    // Render-box contexts with free-form invalidation tests
    boxes: RwLock<LruCache<(ContentRef, String), BoxEntry>>,
}

impl CacheStore {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            objects: RwLock::new(LruCache::new(config.object_limit_non_zero())),
            categories_by_path: RwLock::new(LruCache::new(config.lookup_limit_non_zero())),
            listings_by_pair: RwLock::new(LruCache::new(config.lookup_limit_non_zero())),
            category_listings: RwLock::new(LruCache::new(config.list_limit_non_zero())),
            target_listings: RwLock::new(LruCache::new(config.list_limit_non_zero())),
            poll_choices: RwLock::new(LruCache::new(config.list_limit_non_zero())),
            related_by_source: RwLock::new(LruCache::new(config.list_limit_non_zero())),
            dependencies_by_source: RwLock::new(LruCache::new(config.list_limit_non_zero())),
            memos: DashMap::new(),
            boxes: RwLock::new(LruCache::new(config.box_limit_non_zero())),
        }
    }

    // ========================================================================
    // Single objects
    // ========================================================================

    pub fn get_object(&self, target: ContentRef) -> Option<Entity> {
        rw_write(&self.objects, SOURCE, "get_object")
            .get(&target)
            .cloned()
    }

    pub fn set_object(&self, entity: Entity) {
        rw_write(&self.objects, SOURCE, "set_object").put(entity.content_ref(), entity);
    }

    // ========================================================================
    // Unique lookups
    // ========================================================================

    pub fn get_category_by_path(&self, site_id: Uuid, tree_path: &str) -> Option<CategoryRecord> {
        rw_write(&self.categories_by_path, SOURCE, "get_category_by_path")
            .get(&(site_id, tree_path.to_string()))
            .cloned()
    }

    pub fn set_category_by_path(&self, category: CategoryRecord) {
        rw_write(&self.categories_by_path, SOURCE, "set_category_by_path").put(
            (category.site_id, category.tree_path.clone()),
            category,
        );
    }

    pub fn get_listing_for(&self, target: ContentRef, category_id: Uuid) -> Option<ListingRecord> {
        rw_write(&self.listings_by_pair, SOURCE, "get_listing_for")
            .get(&(target, category_id))
            .cloned()
    }

    pub fn set_listing_for(&self, listing: ListingRecord) {
        rw_write(&self.listings_by_pair, SOURCE, "set_listing_for")
            .put((listing.target, listing.category_id), listing);
    }

    // ========================================================================
    // Cached lists
    // ========================================================================

    pub fn get_category_listings(&self, category_id: Uuid) -> Option<Vec<ListingRecord>> {
        rw_write(&self.category_listings, SOURCE, "get_category_listings")
            .get(&category_id)
            .cloned()
    }

    pub fn set_category_listings(&self, category_id: Uuid, listings: Vec<ListingRecord>) {
        rw_write(&self.category_listings, SOURCE, "set_category_listings")
            .put(category_id, listings);
    }

    pub fn get_target_listings(&self, target: ContentRef) -> Option<Vec<ListingRecord>> {
        rw_write(&self.target_listings, SOURCE, "get_target_listings")
            .get(&target)
            .cloned()
    }

    pub fn set_target_listings(&self, target: ContentRef, listings: Vec<ListingRecord>) {
        rw_write(&self.target_listings, SOURCE, "set_target_listings").put(target, listings);
    }

    pub fn get_poll_choices(&self, poll_id: Uuid) -> Option<Vec<ChoiceRecord>> {
        rw_write(&self.poll_choices, SOURCE, "get_poll_choices")
            .get(&poll_id)
            .cloned()
    }

    pub fn set_poll_choices(&self, poll_id: Uuid, choices: Vec<ChoiceRecord>) {
        rw_write(&self.poll_choices, SOURCE, "set_poll_choices").put(poll_id, choices);
    }

    pub fn get_related_for(&self, source: ContentRef) -> Option<Vec<RelatedRecord>> {
        rw_write(&self.related_by_source, SOURCE, "get_related_for")
            .get(&source)
            .cloned()
    }

    pub fn set_related_for(&self, source: ContentRef, rows: Vec<RelatedRecord>) {
        rw_write(&self.related_by_source, SOURCE, "set_related_for").put(source, rows);
    }

    pub fn get_dependencies_for(&self, source: ContentRef) -> Option<Vec<DependencyRecord>> {
        rw_write(&self.dependencies_by_source, SOURCE, "get_dependencies_for")
            .get(&source)
            .cloned()
    }

    pub fn set_dependencies_for(&self, source: ContentRef, rows: Vec<DependencyRecord>) {
        rw_write(&self.dependencies_by_source, SOURCE, "set_dependencies_for").put(source, rows);
    }

    // ========================================================================
    // Memos
    // ========================================================================

    pub fn get_memo(&self, target: ContentRef, tag: &'static str) -> Option<String> {
        self.memos.get(&(target, tag)).map(|v| v.clone())
    }

    pub fn set_memo(&self, target: ContentRef, tag: &'static str, value: String) {
        self.memos.insert((target, tag), value);
    }

    // ========================================================================
    // Render boxes
    // ========================================================================

    pub fn get_box(&self, target: ContentRef, box_type: &str) -> Option<BoxEntry> {
        rw_write(&self.boxes, SOURCE, "get_box")
            .get(&(target, box_type.to_string()))
            .cloned()
    }

    pub fn set_box(&self, target: ContentRef, box_type: String, entry: BoxEntry) {
        rw_write(&self.boxes, SOURCE, "set_box").put((target, box_type), entry);
    }

    /// Evict every box whose invalidation tests match the changed row.
    /// Returns the keys of the evicted entries.
    pub fn evict_boxes_matching(&self, row: &ChangedRow) -> Vec<CacheKey> {
        let mut boxes = rw_write(&self.boxes, SOURCE, "evict_boxes_matching");
        let matched: Vec<(ContentRef, String)> = boxes
            .iter()
            .filter(|(_, entry)| entry.tests.iter().any(|test| test(row)))
            .map(|(key, _)| key.clone())
            .collect();

        matched
            .into_iter()
            .map(|key| {
                boxes.pop(&key);
                CacheKey::RenderBox {
                    target: key.0,
                    box_type: key.1,
                }
            })
            .collect()
    }

    // ========================================================================
    // Eviction
    // ========================================================================

    /// Evict a single entry.
    pub fn evict(&self, key: &CacheKey) {
        match key {
            CacheKey::Object(target) => {
                rw_write(&self.objects, SOURCE, "evict.object").pop(target);
            }
            CacheKey::CategoryByPath { site_id, tree_path } => {
                rw_write(&self.categories_by_path, SOURCE, "evict.category_by_path")
                    .pop(&(*site_id, tree_path.clone()));
            }
            CacheKey::ListingFor {
                target,
                category_id,
            } => {
                rw_write(&self.listings_by_pair, SOURCE, "evict.listing_for")
                    .pop(&(*target, *category_id));
            }
            CacheKey::CategoryListings(category_id) => {
                rw_write(&self.category_listings, SOURCE, "evict.category_listings")
                    .pop(category_id);
            }
            CacheKey::TargetListings(target) => {
                rw_write(&self.target_listings, SOURCE, "evict.target_listings").pop(target);
            }
            CacheKey::PollChoices(poll_id) => {
                rw_write(&self.poll_choices, SOURCE, "evict.poll_choices").pop(poll_id);
            }
            CacheKey::RelatedFor(source) => {
                rw_write(&self.related_by_source, SOURCE, "evict.related_for").pop(source);
            }
            CacheKey::DependenciesFor(source) => {
                rw_write(&self.dependencies_by_source, SOURCE, "evict.dependencies_for")
                    .pop(source);
            }
            CacheKey::Memo { target, tag } => {
                self.memos.remove(&(*target, *tag));
            }
            CacheKey::RenderBox { target, box_type } => {
                rw_write(&self.boxes, SOURCE, "evict.render_box")
                    .pop(&(*target, box_type.clone()));
            }
        }
    }

    /// Clear all cached data.
    pub fn clear(&self) {
        rw_write(&self.objects, SOURCE, "clear.objects").clear();
        rw_write(&self.categories_by_path, SOURCE, "clear.categories_by_path").clear();
        rw_write(&self.listings_by_pair, SOURCE, "clear.listings_by_pair").clear();
        rw_write(&self.category_listings, SOURCE, "clear.category_listings").clear();
        rw_write(&self.target_listings, SOURCE, "clear.target_listings").clear();
        rw_write(&self.poll_choices, SOURCE, "clear.poll_choices").clear();
        rw_write(&self.related_by_source, SOURCE, "clear.related_by_source").clear();
        rw_write(&self.dependencies_by_source, SOURCE, "clear.dependencies_by_source").clear();
        self.memos.clear();
        rw_write(&self.boxes, SOURCE, "clear.boxes").clear();
    }
}

#[cfg(test)]
mod tests {
    use std::panic::{AssertUnwindSafe, catch_unwind};

    use time::OffsetDateTime;

    use crate::domain::types::ContentKind;

    use super::*;

    fn sample_category(site_id: Uuid, slug: &str, path: &str) -> CategoryRecord {
        let now = OffsetDateTime::now_utc();
        CategoryRecord {
            id: Uuid::new_v4(),
            title: slug.to_string(),
            slug: slug.to_string(),
            tree_parent_id: None,
            tree_path: path.to_string(),
            description: String::new(),
            site_id,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn object_cache_roundtrip() {
        let store = CacheStore::new(&CacheConfig::default());
        let category = sample_category(Uuid::new_v4(), "news", "news");
        let target = category.content_ref();

        assert!(store.get_object(target).is_none());

        store.set_object(Entity::Category(category.clone()));
        let cached = store.get_object(target).expect("cached entity");
        assert_eq!(cached, Entity::Category(category));

        store.evict(&CacheKey::Object(target));
        assert!(store.get_object(target).is_none());
    }

    #[test]
    fn lookup_cache_roundtrip() {
        let store = CacheStore::new(&CacheConfig::default());
        let site = Uuid::new_v4();
        let category = sample_category(site, "sports", "news/sports");

        store.set_category_by_path(category.clone());
        let cached = store
            .get_category_by_path(site, "news/sports")
            .expect("cached lookup");
        assert_eq!(cached.id, category.id);

        store.evict(&CacheKey::CategoryByPath {
            site_id: site,
            tree_path: "news/sports".into(),
        });
        assert!(store.get_category_by_path(site, "news/sports").is_none());
    }

    #[test]
    fn lru_eviction_on_objects() {
        let config = CacheConfig {
            object_limit: 2,
            ..Default::default()
        };
        let store = CacheStore::new(&config);

        let c1 = sample_category(Uuid::new_v4(), "a", "a");
        let c2 = sample_category(Uuid::new_v4(), "b", "b");
        let c3 = sample_category(Uuid::new_v4(), "c", "c");
        let r1 = c1.content_ref();

        store.set_object(Entity::Category(c1));
        store.set_object(Entity::Category(c2.clone()));
        store.set_object(Entity::Category(c3.clone()));

        assert!(store.get_object(r1).is_none());
        assert!(store.get_object(c2.content_ref()).is_some());
        assert!(store.get_object(c3.content_ref()).is_some());
    }

    #[test]
    fn box_predicate_eviction() {
        let store = CacheStore::new(&CacheConfig::default());
        let poll_id = Uuid::new_v4();
        let target = ContentRef::new(ContentKind::Poll, poll_id);

        let test: BoxTest = Arc::new(move |row| {
            matches!(row, ChangedRow::Choice(c) if c.poll_id == poll_id)
        });
        store.set_box(
            target,
            "main".to_string(),
            BoxEntry {
                context: BoxContext::new(),
                tests: vec![test],
            },
        );
        assert!(store.get_box(target, "main").is_some());

        let unrelated = ChangedRow::Choice(ChoiceRecord {
            id: Uuid::new_v4(),
            poll_id: Uuid::new_v4(),
            choice: "no".into(),
            points: 0,
            votes: 0,
        });
        assert!(store.evict_boxes_matching(&unrelated).is_empty());
        assert!(store.get_box(target, "main").is_some());

        let matching = ChangedRow::Choice(ChoiceRecord {
            id: Uuid::new_v4(),
            poll_id,
            choice: "yes".into(),
            points: 1,
            votes: 3,
        });
        let evicted = store.evict_boxes_matching(&matching);
        assert_eq!(evicted.len(), 1);
        assert!(store.get_box(target, "main").is_none());
    }

    #[test]
    fn store_recovers_from_poisoned_lock() {
        let store = CacheStore::new(&CacheConfig::default());

        let _ = catch_unwind(AssertUnwindSafe(|| {
            let _guard = store.objects.write().expect("objects lock should be acquired");
            panic!("poison objects lock");
        }));

        let category = sample_category(Uuid::new_v4(), "x", "x");
        store.set_object(Entity::Category(category.clone()));
        assert!(store.get_object(category.content_ref()).is_some());
    }
}
