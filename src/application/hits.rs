//! Per-site hit counters for polymorphic targets.

use std::sync::Arc;

use time::OffsetDateTime;
use uuid::Uuid;

use crate::cache::service::ObjectCache;
use crate::cache::trigger::CacheTrigger;
use crate::domain::entities::HitCountRecord;
use crate::domain::types::ContentRef;

use super::error::AppError;
use super::repos::Repos;

pub struct HitCountService {
    cache: Arc<ObjectCache>,
    repos: Repos,
    trigger: Arc<CacheTrigger>,
}

impl HitCountService {
    pub fn new(cache: Arc<ObjectCache>, repos: Repos, trigger: Arc<CacheTrigger>) -> Self {
        Self {
            cache,
            repos,
            trigger,
        }
    }

    /// Count one hit on `target` for `site_id`, creating the counter row on
    /// first sight. Fails with [`AppError::NotFound`] when the target no
    /// longer resolves.
    pub async fn hit(
        &self,
        target: ContentRef,
        site_id: Uuid,
    ) -> Result<HitCountRecord, AppError> {
        self.cache.get_object(target).await?;

        let now = OffsetDateTime::now_utc();
        let existing = self
            .repos
            .hits
            .find_for_target(target, site_id)
            .await
            .map_err(|e| AppError::repo("hit count", e))?;

        let record = match existing {
            Some(mut hit) => {
                hit.hits += 1;
                hit.last_seen = now;
                hit
            }
            None => HitCountRecord {
                id: Uuid::new_v4(),
                target,
                site_id,
                hits: 1,
                last_seen: now,
            },
        };

        let saved = self
            .repos
            .hits
            .upsert(record)
            .await
            .map_err(|e| AppError::repo("hit count", e))?;
        self.trigger.hit_recorded(&saved).await;
        Ok(saved)
    }

    pub async fn hits_for(
        &self,
        target: ContentRef,
        site_id: Uuid,
    ) -> Result<Option<HitCountRecord>, AppError> {
        self.repos
            .hits
            .find_for_target(target, site_id)
            .await
            .map_err(|e| AppError::repo("hit count", e))
    }
}
