//! Category tree service.
//!
//! Categories form a tree materialized into `tree_path`: the `/`-joined
//! slugs from the root down, empty only for a site's root category. Saving
//! a node recomputes its path and, when the path changed, rewrites every
//! descendant's stored path by flat prefix substitution in one
//! transaction.

use std::sync::Arc;

use time::OffsetDateTime;
use tokio::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

use crate::cache::service::ObjectCache;
use crate::cache::trigger::CacheTrigger;
use crate::domain::entities::CategoryRecord;
use crate::domain::error::DomainError;
use crate::domain::slug::{derive_slug, is_slug};

use super::error::AppError;
use super::repos::Repos;
use super::routing::{Route, UrlRouter};

pub struct CategoryService {
    cache: Arc<ObjectCache>,
    repos: Repos,
    trigger: Arc<CacheTrigger>,
    router: Arc<dyn UrlRouter>,
    // Concurrent renames of overlapping subtrees must not interleave, or a
    // reader could observe a half-rewritten prefix across siblings.
    rename_lock: Mutex<()>,
}

impl CategoryService {
    pub fn new(
        cache: Arc<ObjectCache>,
        repos: Repos,
        trigger: Arc<CacheTrigger>,
        router: Arc<dyn UrlRouter>,
    ) -> Self {
        Self {
            cache,
            repos,
            trigger,
            router,
            rename_lock: Mutex::new(()),
        }
    }

    /// Persist a category, deriving its materialized path.
    ///
    /// `tree_path` on the input is ignored; it is recomputed from the
    /// parent chain. When the computed path differs from the stored one,
    /// every descendant whose path starts with the old prefix is rewritten
    /// in the same transaction. On [`AppError::TransactionAbort`] the store
    /// is unchanged.
    pub async fn save(&self, mut category: CategoryRecord) -> Result<CategoryRecord, AppError> {
        category.slug = normalize_slug(&category.slug, &category.title)?;

        // The parent must be read under the same lock that serializes
        // renames: a parent fetched outside it can be renamed before this
        // save commits, persisting a stale path prefix.
        let _serialized = self.rename_lock.lock().await;

        let parent = match category.tree_parent_id {
            Some(parent_id) => Some(self.cache.category(parent_id).await?),
            None => None,
        };
        if let Some(parent) = &parent {
            if parent.site_id != category.site_id {
                return Err(DomainError::validation(
                    "category parent belongs to a different site",
                )
                .into());
            }
        }

        let new_tree_path = match &parent {
            Some(parent) if !parent.tree_path.is_empty() => {
                format!("{}/{}", parent.tree_path, category.slug)
            }
            Some(_) => category.slug.clone(),
            None => String::new(),
        };

        let stored = self
            .repos
            .categories
            .find_by_id(category.id)
            .await
            .map_err(|e| AppError::repo("category", e))?;

        let now = OffsetDateTime::now_utc();
        let old_tree_path = stored.as_ref().map(|s| s.tree_path.clone());
        category.tree_path = new_tree_path.clone();
        category.updated_at = now;
        if stored.is_none() {
            category.created_at = now;
        }

        let descendants = match &old_tree_path {
            Some(old_path) if *old_path != new_tree_path => {
                self.rewritten_descendants(category.site_id, old_path, &new_tree_path, now)
                    .await?
            }
            _ => Vec::new(),
        };

        let saved = self
            .repos
            .categories
            .upsert_tree(category, descendants.clone())
            .await
            .map_err(|e| AppError::repo("category", e))?;

        // Events fire only after the transaction committed.
        self.trigger.category_saved(&saved).await;
        for descendant in &descendants {
            self.trigger.category_saved(descendant).await;
        }

        if !descendants.is_empty() {
            info!(
                category_id = %saved.id,
                old_path = old_tree_path.as_deref().unwrap_or(""),
                new_path = %saved.tree_path,
                descendants = descendants.len(),
                "Category subtree renamed"
            );
        } else {
            debug!(category_id = %saved.id, path = %saved.tree_path, "Category saved");
        }

        Ok(saved)
    }

    /// Load the subtree below `old_path` and substitute the prefix. The
    /// rewrite is flat: each descendant keeps its remainder verbatim, no
    /// recursive re-derivation.
    async fn rewritten_descendants(
        &self,
        site_id: Uuid,
        old_path: &str,
        new_path: &str,
        now: OffsetDateTime,
    ) -> Result<Vec<CategoryRecord>, AppError> {
        if old_path.is_empty() {
            // Root paths are empty, so no descendant embeds them.
            return Ok(Vec::new());
        }

        let prefix = format!("{old_path}/");
        let rows = self
            .repos
            .categories
            .list_by_path_prefix(site_id, &prefix)
            .await
            .map_err(|e| AppError::repo("category", e))?;

        Ok(rows
            .into_iter()
            .map(|mut descendant| {
                let remainder = descendant.tree_path[old_path.len()..].to_string();
                descendant.tree_path = format!("{new_path}{remainder}");
                descendant.updated_at = now;
                descendant
            })
            .collect())
    }

    /// Cached parent lookup; `None` for a root.
    pub async fn get_parent(
        &self,
        category: &CategoryRecord,
    ) -> Result<Option<CategoryRecord>, AppError> {
        match category.tree_parent_id {
            Some(parent_id) => Ok(Some(self.cache.category(parent_id).await?)),
            None => Ok(None),
        }
    }

    pub async fn get(&self, id: Uuid) -> Result<CategoryRecord, AppError> {
        self.cache.category(id).await
    }

    /// The unique category addressed by `(site, tree_path)`.
    pub async fn by_path(
        &self,
        site_id: Uuid,
        tree_path: &str,
    ) -> Result<CategoryRecord, AppError> {
        self.cache.category_by_path(site_id, tree_path).await
    }

    /// Site-relative URL of the category's listing page; the root maps to
    /// the homepage route.
    pub fn absolute_url(&self, category: &CategoryRecord) -> String {
        let route = if category.tree_parent_id.is_none() {
            Route::Homepage
        } else {
            Route::CategoryDetail {
                tree_path: category.tree_path.clone(),
            }
        };
        self.router.url_for(&route)
    }

    /// Memoized `site name/path` label used across admin-facing output.
    pub async fn display_name(&self, category: &CategoryRecord) -> Result<String, AppError> {
        let site = self.cache.site(category.site_id).await?;
        Ok(self
            .cache
            .memo(category.content_ref(), "display_name", || {
                format!("{}/{}", site.name, category.path())
            }))
    }

    pub async fn delete(&self, id: Uuid) -> Result<CategoryRecord, AppError> {
        let removed = self
            .repos
            .categories
            .delete(id)
            .await
            .map_err(|e| AppError::repo("category", e))?;
        self.trigger.category_deleted(&removed).await;
        Ok(removed)
    }
}

fn normalize_slug(slug: &str, title: &str) -> Result<String, AppError> {
    if slug.is_empty() {
        return Ok(derive_slug(title)?);
    }
    if !is_slug(slug) {
        return Err(DomainError::validation(format!("`{slug}` is not a valid slug")).into());
    }
    Ok(slug.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_slug_derives_from_title_when_empty() {
        assert_eq!(normalize_slug("", "Local News").expect("slug"), "local-news");
    }

    #[test]
    fn normalize_slug_rejects_non_canonical_input() {
        assert!(normalize_slug("Not A Slug", "ignored").is_err());
        assert_eq!(normalize_slug("news", "ignored").expect("slug"), "news");
    }
}
