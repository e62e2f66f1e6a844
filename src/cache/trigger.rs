//! Cache trigger service.
//!
//! High-level API the write paths use to publish cache events. Events are
//! consumed immediately so invalidation lands before the write call
//! returns.

use std::sync::Arc;

use tracing::debug;

use crate::domain::entities::{
    ArticleRecord, CategoryRecord, ChoiceRecord, DependencyRecord, HitCountRecord, ListingRecord,
    PollRecord, RelatedRecord, SiteRecord,
};

use super::config::CacheConfig;
use super::consumer::CacheConsumer;
use super::events::{ChangedRow, EventKind, EventQueue};

pub struct CacheTrigger {
    config: CacheConfig,
    queue: Arc<EventQueue>,
    consumer: Arc<CacheConsumer>,
}

impl CacheTrigger {
    pub fn new(config: CacheConfig, queue: Arc<EventQueue>, consumer: Arc<CacheConsumer>) -> Self {
        Self {
            config,
            queue,
            consumer,
        }
    }

    /// Publish an event and optionally consume immediately.
    pub async fn trigger(&self, kind: EventKind, consume_now: bool) {
        if !self.config.is_enabled() {
            debug!(event_kind = ?kind, "Cache trigger skipped: cache disabled");
            return;
        }

        self.queue.publish(kind);

        if consume_now {
            self.consumer.consume().await;
        }
    }

    pub async fn row_saved(&self, row: ChangedRow) {
        self.trigger(EventKind::RowSaved(row), true).await;
    }

    pub async fn row_deleted(&self, row: ChangedRow) {
        self.trigger(EventKind::RowDeleted(row), true).await;
    }

    pub async fn site_saved(&self, site: &SiteRecord) {
        self.row_saved(ChangedRow::Site(site.clone())).await;
    }

    pub async fn category_saved(&self, category: &CategoryRecord) {
        self.row_saved(ChangedRow::Category(category.clone())).await;
    }

    pub async fn category_deleted(&self, category: &CategoryRecord) {
        self.row_deleted(ChangedRow::Category(category.clone())).await;
    }

    pub async fn article_saved(&self, article: &ArticleRecord) {
        self.row_saved(ChangedRow::Article(article.clone())).await;
    }

    pub async fn listing_saved(&self, listing: &ListingRecord) {
        self.row_saved(ChangedRow::Listing(listing.clone())).await;
    }

    pub async fn poll_saved(&self, poll: &PollRecord) {
        self.row_saved(ChangedRow::Poll(poll.clone())).await;
    }

    pub async fn choice_saved(&self, choice: &ChoiceRecord) {
        self.row_saved(ChangedRow::Choice(choice.clone())).await;
    }

    pub async fn related_saved(&self, related: &RelatedRecord) {
        self.row_saved(ChangedRow::Related(related.clone())).await;
    }

    pub async fn dependency_saved(&self, dependency: &DependencyRecord) {
        self.row_saved(ChangedRow::Dependency(dependency.clone())).await;
    }

    pub async fn hit_recorded(&self, hit: &HitCountRecord) {
        self.row_saved(ChangedRow::HitCount(hit.clone())).await;
    }

    /// Drop every cache entry.
    pub async fn flush(&self) {
        self.trigger(EventKind::Flush, true).await;
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn queue(&self) -> &Arc<EventQueue> {
        &self.queue
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use crate::cache::registry::CacheRegistry;
    use crate::cache::store::CacheStore;

    use super::*;

    fn create_trigger(config: CacheConfig) -> CacheTrigger {
        let store = Arc::new(CacheStore::new(&config));
        let registry = Arc::new(CacheRegistry::new());
        let queue = Arc::new(EventQueue::new());
        let consumer = Arc::new(CacheConsumer::new(
            config.clone(),
            store,
            registry,
            queue.clone(),
        ));
        CacheTrigger::new(config, queue, consumer)
    }

    fn sample_site() -> SiteRecord {
        SiteRecord {
            id: Uuid::new_v4(),
            name: "Example".into(),
            domain: "example.com".into(),
        }
    }

    #[tokio::test]
    async fn trigger_publishes_event() {
        let trigger = create_trigger(CacheConfig::default());

        assert!(trigger.queue.is_empty());
        trigger
            .trigger(EventKind::RowSaved(ChangedRow::Site(sample_site())), false)
            .await;
        assert_eq!(trigger.queue.len(), 1);
    }

    #[tokio::test]
    async fn trigger_respects_disabled_config() {
        let trigger = create_trigger(CacheConfig {
            enabled: false,
            ..Default::default()
        });

        trigger.site_saved(&sample_site()).await;
        assert!(trigger.queue.is_empty());
    }

    #[tokio::test]
    async fn trigger_consumes_immediately_when_requested() {
        let trigger = create_trigger(CacheConfig::default());

        trigger.site_saved(&sample_site()).await;
        assert!(trigger.queue.is_empty());
    }
}
