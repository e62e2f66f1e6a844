//! Poll voting built on the cache: vote totals read through the cached
//! choice list, so a box rendered after a vote sees fresh counts.

use std::sync::Arc;

use uuid::Uuid;

use crate::cache::service::ObjectCache;
use crate::cache::trigger::CacheTrigger;
use crate::domain::entities::{ChoiceRecord, PollRecord};

use super::error::AppError;
use super::repos::Repos;

pub struct PollService {
    cache: Arc<ObjectCache>,
    repos: Repos,
    trigger: Arc<CacheTrigger>,
}

impl PollService {
    pub fn new(cache: Arc<ObjectCache>, repos: Repos, trigger: Arc<CacheTrigger>) -> Self {
        Self {
            cache,
            repos,
            trigger,
        }
    }

    /// Atomic single-row vote increment; publishes the changed choice so
    /// poll boxes and the cached choice list are evicted before the call
    /// returns.
    pub async fn add_vote(&self, choice_id: Uuid) -> Result<ChoiceRecord, AppError> {
        let choice = self
            .repos
            .polls
            .add_vote(choice_id)
            .await
            .map_err(|e| AppError::repo("choice", e))?;
        self.trigger.choice_saved(&choice).await;
        Ok(choice)
    }

    pub async fn total_votes(&self, poll_id: Uuid) -> Result<i64, AppError> {
        let choices = self.cache.choices_for_poll(poll_id).await?;
        Ok(choices.iter().map(|c| c.votes).sum())
    }

    /// Share of the poll's votes this choice holds, in percent.
    pub async fn vote_share(&self, choice: &ChoiceRecord) -> Result<f64, AppError> {
        let total = self.total_votes(choice.poll_id).await?;
        if total == 0 {
            return Ok(0.0);
        }
        Ok(choice.votes as f64 / total as f64 * 100.0)
    }

    pub async fn upsert_poll(&self, poll: PollRecord) -> Result<PollRecord, AppError> {
        let saved = self
            .repos
            .polls
            .upsert_poll(poll)
            .await
            .map_err(|e| AppError::repo("poll", e))?;
        self.trigger.poll_saved(&saved).await;
        Ok(saved)
    }

    pub async fn upsert_choice(&self, choice: ChoiceRecord) -> Result<ChoiceRecord, AppError> {
        let saved = self
            .repos
            .polls
            .upsert_choice(choice)
            .await
            .map_err(|e| AppError::repo("choice", e))?;
        self.trigger.choice_saved(&saved).await;
        Ok(saved)
    }
}
