//! Listing resolver.
//!
//! A listing places a publishable object in a category. The object's
//! detail URL is always derived from its main listing (the one in the
//! object's own category): a secondary listing borrows the main listing's
//! publish date and the object's own category path.

use std::sync::Arc;

use time::OffsetDateTime;
use url::Url;
use uuid::Uuid;

use crate::cache::service::ObjectCache;
use crate::cache::trigger::CacheTrigger;
use crate::domain::entities::{ArticleRecord, ListingRecord};
use crate::domain::error::DomainError;
use crate::domain::types::ContentRef;

use super::error::AppError;
use super::repos::Repos;
use super::routing::{Route, UrlRouter};

pub struct ListingService {
    cache: Arc<ObjectCache>,
    repos: Repos,
    trigger: Arc<CacheTrigger>,
    router: Arc<dyn UrlRouter>,
}

impl ListingService {
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
        }
    }

    /// The listing in the object's own category, if any.
    pub async fn main_listing(
        &self,
        article: &ArticleRecord,
    ) -> Result<Option<ListingRecord>, AppError> {
        self.cache
            .listing_for(article.content_ref(), article.category_id)
            .await
    }

    /// Canonical URL of the listing's target, relative to `current_site_id`.
    ///
    /// Secondary listings resolve through the main listing: its
    /// `publish_from` supplies the date segments and the object's own
    /// category supplies the path. When the category lives on another site
    /// the result is absolute, built from that site's registered domain.
    pub async fn resolve_url(
        &self,
        listing: &ListingRecord,
        current_site_id: Uuid,
    ) -> Result<String, AppError> {
        let entity = self.cache.get_object(listing.target).await?;
        let article = entity.as_article().ok_or_else(|| {
            DomainError::invariant(format!(
                "listing target {} is not a publishable object",
                listing.target
            ))
        })?;

        let publish_from = if article.category_id == listing.category_id {
            listing.publish_from
        } else {
            let main = self
                .cache
                .listing_for(listing.target, article.category_id)
                .await?
                .ok_or_else(|| AppError::not_found("listing"))?;
            main.publish_from
        };

        let category = self.cache.category(article.category_id).await?;
        let date = publish_from.date();
        let content_type = listing.target.kind.type_slug();
        let slug = article.slug.clone();

        let route = if category.tree_parent_id.is_some() {
            Route::ObjectDetail {
                category_path: category.tree_path.clone(),
                year: date.year(),
                month: date.month() as u8,
                day: date.day(),
                content_type,
                slug,
            }
        } else {
            Route::HomeObjectDetail {
                year: date.year(),
                month: date.month() as u8,
                day: date.day(),
                content_type,
                slug,
            }
        };
        let path = self.router.url_for(&route);

        if category.site_id == current_site_id {
            return Ok(path);
        }

        let site = self.cache.site(category.site_id).await?;
        let mut absolute = Url::parse(&format!("http://{}", site.domain)).map_err(|e| {
            DomainError::validation(format!("site `{}` has an invalid domain: {e}", site.domain))
        })?;
        absolute.set_path(&path);
        Ok(absolute.to_string())
    }

    /// Human-readable label for the listing. A listing whose target was
    /// deleted is described in degraded form instead of failing, so one
    /// broken row cannot take down a whole page of listings.
    pub async fn describe(&self, listing: &ListingRecord) -> Result<String, AppError> {
        match self.cache.get_object(listing.target).await {
            Ok(entity) => {
                let category = self.cache.category(listing.category_id).await?;
                Ok(format!("{} in {}", entity.display_name(), category.title))
            }
            Err(AppError::NotFound { .. }) => Ok(format!("{} (no longer exists)", listing.target)),
            Err(err) => Err(err),
        }
    }

    pub async fn listings_for_category(
        &self,
        category_id: Uuid,
        now: OffsetDateTime,
    ) -> Result<Vec<ListingRecord>, AppError> {
        let listings = self.cache.listings_for_category(category_id).await?;
        Ok(listings
            .into_iter()
            .filter(|l| !l.hidden && l.is_active(now) && l.is_published(now))
            .collect())
    }

    /// Every listing placing `target`, newest first. This is the full
    /// placement set of one object across categories, main listing
    /// included.
    pub async fn listings_for_target(
        &self,
        target: ContentRef,
    ) -> Result<Vec<ListingRecord>, AppError> {
        self.cache.listings_for_target(target).await
    }

    /// Insert or update; a `(category, target)` pair may appear at most
    /// once.
    pub async fn upsert(&self, listing: ListingRecord) -> Result<ListingRecord, AppError> {
        let saved = self
            .repos
            .listings
            .upsert(listing)
            .await
            .map_err(|e| AppError::repo("listing", e))?;
        self.trigger.listing_saved(&saved).await;
        Ok(saved)
    }

    pub async fn delete(&self, id: Uuid) -> Result<ListingRecord, AppError> {
        let removed = self
            .repos
            .listings
            .delete(id)
            .await
            .map_err(|e| AppError::repo("listing", e))?;
        self.trigger.row_deleted(crate::cache::events::ChangedRow::Listing(removed.clone()))
            .await;
        Ok(removed)
    }
}
