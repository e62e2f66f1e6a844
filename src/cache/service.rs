//! Read-through object cache.
//!
//! `ObjectCache` resolves polymorphic references through a typed loader
//! registry (kind → repository call), stores the results, and records each
//! entry's dependencies in the registry so the consumer can evict exactly
//! what a write touched. It is an explicit service instance handed to any
//! component needing cached reads, not process-global state.

use std::collections::HashSet;
use std::sync::Arc;

use metrics::counter;
use uuid::Uuid;

use crate::application::error::AppError;
use crate::application::repos::Repos;
use crate::domain::entities::{
    ArticleRecord, CategoryRecord, ChoiceRecord, DependencyRecord, Entity, ListingRecord,
    PollRecord, RelatedRecord, SiteRecord,
};
use crate::domain::error::DomainError;
use crate::domain::types::{ContentKind, ContentRef, RowKind};

use super::config::CacheConfig;
use super::events::{Epoch, EventQueue};
use super::keys::{CacheKey, EntityKey};
use super::registry::CacheRegistry;
use super::store::{BoxEntry, CacheStore};

pub struct ObjectCache {
    config: CacheConfig,
    store: Arc<CacheStore>,
    registry: Arc<CacheRegistry>,
    queue: Arc<EventQueue>,
    repos: Repos,
}

impl ObjectCache {
    pub fn new(
        config: CacheConfig,
        store: Arc<CacheStore>,
        registry: Arc<CacheRegistry>,
        queue: Arc<EventQueue>,
        repos: Repos,
    ) -> Self {
        Self {
            config,
            store,
            registry,
            queue,
            repos,
        }
    }

    fn enabled(&self) -> bool {
        self.config.is_enabled()
    }

    /// Epoch fence for miss-loads. A load that overlaps a write could
    /// otherwise re-insert the pre-write row after its eviction already
    /// ran, pinning stale data until the next event. Capture the epoch
    /// before the repository read; a changed epoch at insert time means a
    /// write raced the load, so the result is returned but not cached.
    fn read_fence(&self) -> Epoch {
        self.queue.current_epoch()
    }

    fn cacheable(&self, fence: Epoch) -> bool {
        self.enabled() && self.queue.current_epoch() == fence
    }

    fn hit(&self) {
        counter!("rubrika_cache_hit_total").increment(1);
    }

    fn miss(&self) {
        counter!("rubrika_cache_miss_total").increment(1);
    }

    fn register(&self, key: CacheKey, deps: impl IntoIterator<Item = EntityKey>) {
        self.registry.register(key, HashSet::from_iter(deps));
    }

    // ========================================================================
    // Single objects
    // ========================================================================

    /// Resolve a polymorphic reference, fetching from the store on a miss.
    ///
    /// Fails with [`AppError::NotFound`] when the row no longer exists.
    pub async fn get_object(&self, target: ContentRef) -> Result<Entity, AppError> {
        if self.enabled() {
            if let Some(entity) = self.store.get_object(target) {
                self.hit();
                return Ok(entity);
            }
        }
        self.miss();
        let fence = self.read_fence();

        let entity = self.load(target).await?;
        if self.cacheable(fence) {
            self.store.set_object(entity.clone());
            self.register(CacheKey::Object(target), [EntityKey::Object(target)]);
        }
        Ok(entity)
    }

    /// Typed loader registry: maps a kind tag to the repository call that
    /// materializes it.
    async fn load(&self, target: ContentRef) -> Result<Entity, AppError> {
        let entity = match target.kind {
            ContentKind::Site => self
                .repos
                .sites
                .find_by_id(target.id)
                .await
                .map_err(|e| AppError::repo("site", e))?
                .map(Entity::Site),
            ContentKind::Category => self
                .repos
                .categories
                .find_by_id(target.id)
                .await
                .map_err(|e| AppError::repo("category", e))?
                .map(Entity::Category),
            ContentKind::Article => self
                .repos
                .articles
                .find_by_id(target.id)
                .await
                .map_err(|e| AppError::repo("article", e))?
                .map(Entity::Article),
            ContentKind::Poll => self
                .repos
                .polls
                .find_poll(target.id)
                .await
                .map_err(|e| AppError::repo("poll", e))?
                .map(Entity::Poll),
            ContentKind::Choice => self
                .repos
                .polls
                .find_choice(target.id)
                .await
                .map_err(|e| AppError::repo("choice", e))?
                .map(Entity::Choice),
        };

        entity.ok_or_else(|| AppError::not_found(entity_name(target.kind)))
    }

    pub async fn site(&self, id: Uuid) -> Result<SiteRecord, AppError> {
        match self.get_object(ContentRef::new(ContentKind::Site, id)).await? {
            Entity::Site(record) => Ok(record),
            _ => Err(mismatched_kind()),
        }
    }

    pub async fn category(&self, id: Uuid) -> Result<CategoryRecord, AppError> {
        match self
            .get_object(ContentRef::new(ContentKind::Category, id))
            .await?
        {
            Entity::Category(record) => Ok(record),
            _ => Err(mismatched_kind()),
        }
    }

    pub async fn article(&self, id: Uuid) -> Result<ArticleRecord, AppError> {
        match self
            .get_object(ContentRef::new(ContentKind::Article, id))
            .await?
        {
            Entity::Article(record) => Ok(record),
            _ => Err(mismatched_kind()),
        }
    }

    pub async fn poll(&self, id: Uuid) -> Result<PollRecord, AppError> {
        match self.get_object(ContentRef::new(ContentKind::Poll, id)).await? {
            Entity::Poll(record) => Ok(record),
            _ => Err(mismatched_kind()),
        }
    }

    pub async fn choice(&self, id: Uuid) -> Result<ChoiceRecord, AppError> {
        match self
            .get_object(ContentRef::new(ContentKind::Choice, id))
            .await?
        {
            Entity::Choice(record) => Ok(record),
            _ => Err(mismatched_kind()),
        }
    }

    // ========================================================================
    // Unique lookups
    // ========================================================================

    /// The unique category addressed by `(site, tree_path)`.
    ///
    /// Fails with [`AppError::AmbiguousLookup`] if the uniqueness index is
    /// violated and more than one row matches.
    pub async fn category_by_path(
        &self,
        site_id: Uuid,
        tree_path: &str,
    ) -> Result<CategoryRecord, AppError> {
        if self.enabled() {
            if let Some(category) = self.store.get_category_by_path(site_id, tree_path) {
                self.hit();
                return Ok(category);
            }
        }
        self.miss();
        let fence = self.read_fence();

        let mut rows = self
            .repos
            .categories
            .find_by_path(site_id, tree_path)
            .await
            .map_err(|e| AppError::repo("category", e))?;

        let category = match rows.len() {
            0 => return Err(AppError::not_found("category")),
            1 => rows.remove(0),
            _ => {
                return Err(AppError::ambiguous(format!(
                    "category site={site_id} tree_path={tree_path}"
                )));
            }
        };

        if self.cacheable(fence) {
            self.store.set_category_by_path(category.clone());
            self.register(
                CacheKey::CategoryByPath {
                    site_id,
                    tree_path: tree_path.to_string(),
                },
                [EntityKey::Rows(RowKind::Category)],
            );
        }
        Ok(category)
    }

    /// The unique listing pairing `target` with `category_id`, if any.
    pub async fn listing_for(
        &self,
        target: ContentRef,
        category_id: Uuid,
    ) -> Result<Option<ListingRecord>, AppError> {
        if self.enabled() {
            if let Some(listing) = self.store.get_listing_for(target, category_id) {
                self.hit();
                return Ok(Some(listing));
            }
        }
        self.miss();
        let fence = self.read_fence();

        let listing = self
            .repos
            .listings
            .find_for_target_in_category(target, category_id)
            .await
            .map_err(|e| AppError::repo("listing", e))?;

        if self.cacheable(fence) {
            if let Some(listing) = &listing {
                self.store.set_listing_for(listing.clone());
                self.register(
                    CacheKey::ListingFor {
                        target,
                        category_id,
                    },
                    [EntityKey::Rows(RowKind::Listing)],
                );
            }
        }
        Ok(listing)
    }

    // ========================================================================
    // Cached lists
    // ========================================================================

    pub async fn listings_for_category(
        &self,
        category_id: Uuid,
    ) -> Result<Vec<ListingRecord>, AppError> {
        if self.enabled() {
            if let Some(listings) = self.store.get_category_listings(category_id) {
                self.hit();
                return Ok(listings);
            }
        }
        self.miss();
        let fence = self.read_fence();

        let listings = self
            .repos
            .listings
            .list_for_category(category_id)
            .await
            .map_err(|e| AppError::repo("listing", e))?;

        if self.cacheable(fence) {
            self.store
                .set_category_listings(category_id, listings.clone());
            self.register(
                CacheKey::CategoryListings(category_id),
                [EntityKey::Rows(RowKind::Listing)],
            );
        }
        Ok(listings)
    }

    pub async fn listings_for_target(
        &self,
        target: ContentRef,
    ) -> Result<Vec<ListingRecord>, AppError> {
        if self.enabled() {
            if let Some(listings) = self.store.get_target_listings(target) {
                self.hit();
                return Ok(listings);
            }
        }
        self.miss();
        let fence = self.read_fence();

        let listings = self
            .repos
            .listings
            .list_for_target(target)
            .await
            .map_err(|e| AppError::repo("listing", e))?;

        if self.cacheable(fence) {
            self.store.set_target_listings(target, listings.clone());
            self.register(
                CacheKey::TargetListings(target),
                [EntityKey::Rows(RowKind::Listing)],
            );
        }
        Ok(listings)
    }

    pub async fn choices_for_poll(&self, poll_id: Uuid) -> Result<Vec<ChoiceRecord>, AppError> {
        if self.enabled() {
            if let Some(choices) = self.store.get_poll_choices(poll_id) {
                self.hit();
                return Ok(choices);
            }
        }
        self.miss();
        let fence = self.read_fence();

        let choices = self
            .repos
            .polls
            .list_choices(poll_id)
            .await
            .map_err(|e| AppError::repo("choice", e))?;

        if self.cacheable(fence) {
            self.store.set_poll_choices(poll_id, choices.clone());
            self.register(
                CacheKey::PollChoices(poll_id),
                [EntityKey::Rows(RowKind::Choice)],
            );
        }
        Ok(choices)
    }

    pub async fn related_for(&self, source: ContentRef) -> Result<Vec<RelatedRecord>, AppError> {
        if self.enabled() {
            if let Some(rows) = self.store.get_related_for(source) {
                self.hit();
                return Ok(rows);
            }
        }
        self.miss();
        let fence = self.read_fence();

        let rows = self
            .repos
            .relations
            .list_related_for_source(source)
            .await
            .map_err(|e| AppError::repo("related", e))?;

        if self.cacheable(fence) {
            self.store.set_related_for(source, rows.clone());
            self.register(
                CacheKey::RelatedFor(source),
                [EntityKey::Rows(RowKind::Related)],
            );
        }
        Ok(rows)
    }

    pub async fn dependencies_for(
        &self,
        source: ContentRef,
    ) -> Result<Vec<DependencyRecord>, AppError> {
        if self.enabled() {
            if let Some(rows) = self.store.get_dependencies_for(source) {
                self.hit();
                return Ok(rows);
            }
        }
        self.miss();
        let fence = self.read_fence();

        let rows = self
            .repos
            .relations
            .list_dependencies_for_source(source)
            .await
            .map_err(|e| AppError::repo("dependency", e))?;

        if self.cacheable(fence) {
            self.store.set_dependencies_for(source, rows.clone());
            self.register(
                CacheKey::DependenciesFor(source),
                [EntityKey::Rows(RowKind::Dependency)],
            );
        }
        Ok(rows)
    }

    // ========================================================================
    // Memoized derivations
    // ========================================================================

    /// Memoize a per-entity derivation (e.g. a display name). Repeated
    /// calls with the same `(target, tag)` return the cached result until
    /// any row of the target's kind changes.
    pub fn memo<F>(&self, target: ContentRef, tag: &'static str, compute: F) -> String
    where
        F: FnOnce() -> String,
    {
        if !self.enabled() {
            return compute();
        }

        if let Some(value) = self.store.get_memo(target, tag) {
            self.hit();
            return value;
        }
        self.miss();

        let value = compute();
        self.store.set_memo(target, tag, value.clone());
        self.register(
            CacheKey::Memo { target, tag },
            [EntityKey::Rows(target.kind.into())],
        );
        value
    }

    // ========================================================================
    // Render boxes
    // ========================================================================

    pub fn box_entry(&self, target: ContentRef, box_type: &str) -> Option<BoxEntry> {
        if !self.enabled() {
            return None;
        }
        let entry = self.store.get_box(target, box_type);
        if entry.is_some() {
            self.hit();
        } else {
            self.miss();
        }
        entry
    }

    pub fn store_box(&self, target: ContentRef, box_type: String, entry: BoxEntry) {
        if !self.enabled() {
            return;
        }
        self.store.set_box(target, box_type.clone(), entry);
        self.register(
            CacheKey::RenderBox { target, box_type },
            [EntityKey::Object(target)],
        );
    }

    pub fn repos(&self) -> &Repos {
        &self.repos
    }
}

fn entity_name(kind: ContentKind) -> &'static str {
    match kind {
        ContentKind::Site => "site",
        ContentKind::Category => "category",
        ContentKind::Article => "article",
        ContentKind::Poll => "poll",
        ContentKind::Choice => "choice",
    }
}

fn mismatched_kind() -> AppError {
    DomainError::invariant("loader returned a mismatched entity kind").into()
}
