//! Generic relation registry.
//!
//! `Related` and `Dependency` rows link arbitrary objects by polymorphic
//! reference. Their endpoints resolve through the object cache and
//! memoize on the in-memory instance, so one row resolved twice hits the
//! loader once.

use std::sync::Arc;

use tokio::sync::OnceCell;

use crate::cache::service::ObjectCache;
use crate::cache::trigger::CacheTrigger;
use crate::domain::entities::{DependencyRecord, Entity, RelatedRecord};
use crate::domain::types::ContentRef;
use uuid::Uuid;

use super::error::AppError;
use super::repos::Repos;

/// A polymorphic reference that resolves once per instance lifetime.
pub struct LazyRef {
    target: ContentRef,
    cell: OnceCell<Entity>,
}

impl LazyRef {
    pub fn new(target: ContentRef) -> Self {
        Self {
            target,
            cell: OnceCell::new(),
        }
    }

    pub fn target(&self) -> ContentRef {
        self.target
    }

    /// Resolve through the cache; subsequent calls return the memoized
    /// entity even if the cache entry was evicted in the meantime.
    pub async fn resolve(&self, cache: &ObjectCache) -> Result<&Entity, AppError> {
        self.cell
            .get_or_try_init(|| async { cache.get_object(self.target).await })
            .await
    }
}

/// A related-content row with lazily resolved endpoints.
pub struct Related {
    pub record: RelatedRecord,
    pub source: LazyRef,
    pub target: LazyRef,
}

impl From<RelatedRecord> for Related {
    fn from(record: RelatedRecord) -> Self {
        let source = LazyRef::new(record.source);
        let target = LazyRef::new(record.target);
        Self {
            record,
            source,
            target,
        }
    }
}

/// A dependency row with lazily resolved endpoints.
pub struct Dependency {
    pub record: DependencyRecord,
    pub source: LazyRef,
    pub target: LazyRef,
}

impl From<DependencyRecord> for Dependency {
    fn from(record: DependencyRecord) -> Self {
        let source = LazyRef::new(record.source);
        let target = LazyRef::new(record.target);
        Self {
            record,
            source,
            target,
        }
    }
}

pub struct RelationService {
    cache: Arc<ObjectCache>,
    repos: Repos,
    trigger: Arc<CacheTrigger>,
}

impl RelationService {
    pub fn new(cache: Arc<ObjectCache>, repos: Repos, trigger: Arc<CacheTrigger>) -> Self {
        Self {
            cache,
            repos,
            trigger,
        }
    }

    pub fn cache(&self) -> &Arc<ObjectCache> {
        &self.cache
    }

    pub async fn add_related(
        &self,
        source: ContentRef,
        target: ContentRef,
    ) -> Result<RelatedRecord, AppError> {
        let saved = self
            .repos
            .relations
            .insert_related(RelatedRecord {
                id: Uuid::new_v4(),
                source,
                target,
            })
            .await
            .map_err(|e| AppError::repo("related", e))?;
        self.trigger.related_saved(&saved).await;
        Ok(saved)
    }

    /// Record that `source` depends on `target`. The `(target_key,
    /// source_key)` pair is unique; inserting it twice fails with
    /// [`AppError::ConstraintViolation`].
    pub async fn add_dependency(
        &self,
        source: ContentRef,
        target: ContentRef,
    ) -> Result<DependencyRecord, AppError> {
        let saved = self
            .repos
            .relations
            .insert_dependency(DependencyRecord {
                id: Uuid::new_v4(),
                source,
                source_key: source.to_string(),
                target,
                target_key: target.to_string(),
            })
            .await
            .map_err(|e| AppError::repo("dependency", e))?;
        self.trigger.dependency_saved(&saved).await;
        Ok(saved)
    }

    pub async fn related_for(&self, source: ContentRef) -> Result<Vec<Related>, AppError> {
        let rows = self.cache.related_for(source).await?;
        Ok(rows.into_iter().map(Related::from).collect())
    }

    pub async fn dependencies_for(&self, source: ContentRef) -> Result<Vec<Dependency>, AppError> {
        let rows = self.cache.dependencies_for(source).await?;
        Ok(rows.into_iter().map(Dependency::from).collect())
    }
}
