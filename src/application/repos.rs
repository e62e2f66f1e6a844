//! Repository traits describing persistence adapters.
//!
//! The store behind these traits is a generic relational engine supporting
//! filter-by-field, prefix filters, uniqueness constraints, and
//! transactions. Entities are addressable by primary key and by a
//! polymorphic `(kind, id)` pair.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::entities::{
    ArticleRecord, CategoryRecord, ChoiceRecord, DependencyRecord, HitCountRecord, ListingRecord,
    PollRecord, RelatedRecord, SiteRecord,
};
use crate::domain::types::ContentRef;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("duplicate record violates unique constraint `{constraint}`")]
    Duplicate { constraint: String },
    #[error("resource not found")]
    NotFound,
    #[error("transaction aborted: {reason}")]
    TransactionAbort { reason: String },
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }

    pub fn duplicate(constraint: impl Into<String>) -> Self {
        Self::Duplicate {
            constraint: constraint.into(),
        }
    }

    pub fn aborted(reason: impl Into<String>) -> Self {
        Self::TransactionAbort {
            reason: reason.into(),
        }
    }
}

#[async_trait]
pub trait SitesRepo: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<SiteRecord>, RepoError>;

    async fn upsert(&self, site: SiteRecord) -> Result<SiteRecord, RepoError>;
}

#[async_trait]
pub trait CategoriesRepo: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<CategoryRecord>, RepoError>;

    /// All rows matching `(site_id, tree_path)`. The pair is unique, so more
    /// than one row signals a corrupted index to the caller.
    async fn find_by_path(
        &self,
        site_id: Uuid,
        tree_path: &str,
    ) -> Result<Vec<CategoryRecord>, RepoError>;

    /// Rows of the site whose stored `tree_path` starts with `prefix`.
    async fn list_by_path_prefix(
        &self,
        site_id: Uuid,
        prefix: &str,
    ) -> Result<Vec<CategoryRecord>, RepoError>;

    /// Persist a node together with its rewritten descendants in a single
    /// transaction. Either every row lands or none does; the
    /// `(site_id, tree_path)` constraint is checked against the staged state.
    async fn upsert_tree(
        &self,
        node: CategoryRecord,
        descendants: Vec<CategoryRecord>,
    ) -> Result<CategoryRecord, RepoError>;

    async fn delete(&self, id: Uuid) -> Result<CategoryRecord, RepoError>;
}

#[async_trait]
pub trait ArticlesRepo: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<ArticleRecord>, RepoError>;

    async fn upsert(&self, article: ArticleRecord) -> Result<ArticleRecord, RepoError>;

    async fn delete(&self, id: Uuid) -> Result<ArticleRecord, RepoError>;
}

#[async_trait]
pub trait ListingsRepo: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<ListingRecord>, RepoError>;

    /// The unique listing pairing `target` with `category_id`, if any.
    async fn find_for_target_in_category(
        &self,
        target: ContentRef,
        category_id: Uuid,
    ) -> Result<Option<ListingRecord>, RepoError>;

    async fn list_for_category(&self, category_id: Uuid)
    -> Result<Vec<ListingRecord>, RepoError>;

    async fn list_for_target(&self, target: ContentRef) -> Result<Vec<ListingRecord>, RepoError>;

    /// Insert or update; a `(category_id, target)` pair may appear at most
    /// once.
    async fn upsert(&self, listing: ListingRecord) -> Result<ListingRecord, RepoError>;

    async fn delete(&self, id: Uuid) -> Result<ListingRecord, RepoError>;
}

#[async_trait]
pub trait PollsRepo: Send + Sync {
    async fn find_poll(&self, id: Uuid) -> Result<Option<PollRecord>, RepoError>;

    async fn find_choice(&self, id: Uuid) -> Result<Option<ChoiceRecord>, RepoError>;

    async fn list_choices(&self, poll_id: Uuid) -> Result<Vec<ChoiceRecord>, RepoError>;

    async fn upsert_poll(&self, poll: PollRecord) -> Result<PollRecord, RepoError>;

    async fn upsert_choice(&self, choice: ChoiceRecord) -> Result<ChoiceRecord, RepoError>;

    /// Atomic single-row vote increment, the one hot write path of the
    /// polls app.
    async fn add_vote(&self, choice_id: Uuid) -> Result<ChoiceRecord, RepoError>;
}

#[async_trait]
pub trait RelationsRepo: Send + Sync {
    async fn insert_related(&self, related: RelatedRecord) -> Result<RelatedRecord, RepoError>;

    async fn list_related_for_source(
        &self,
        source: ContentRef,
    ) -> Result<Vec<RelatedRecord>, RepoError>;

    /// Insert a dependency; `(target_key, source_key)` pairs are unique.
    async fn insert_dependency(
        &self,
        dependency: DependencyRecord,
    ) -> Result<DependencyRecord, RepoError>;

    async fn list_dependencies_for_source(
        &self,
        source: ContentRef,
    ) -> Result<Vec<DependencyRecord>, RepoError>;
}

#[async_trait]
pub trait HitCountsRepo: Send + Sync {
    async fn find_for_target(
        &self,
        target: ContentRef,
        site_id: Uuid,
    ) -> Result<Option<HitCountRecord>, RepoError>;

    async fn upsert(&self, hit: HitCountRecord) -> Result<HitCountRecord, RepoError>;
}

/// Bundle of repository handles threaded through the services and the
/// object cache's loader registry.
#[derive(Clone)]
pub struct Repos {
    pub sites: Arc<dyn SitesRepo>,
    pub categories: Arc<dyn CategoriesRepo>,
    pub articles: Arc<dyn ArticlesRepo>,
    pub listings: Arc<dyn ListingsRepo>,
    pub polls: Arc<dyn PollsRepo>,
    pub relations: Arc<dyn RelationsRepo>,
    pub hits: Arc<dyn HitCountsRepo>,
}
