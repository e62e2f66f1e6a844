//! Wiring facade: builds the cache plumbing and the services on top of a
//! repository bundle.

use std::sync::Arc;

use crate::application::boxes::BoxService;
use crate::application::categories::CategoryService;
use crate::application::hits::HitCountService;
use crate::application::listings::ListingService;
use crate::application::polls::PollService;
use crate::application::relations::RelationService;
use crate::application::repos::Repos;
use crate::application::routing::{PathRouter, UrlRouter};
use crate::cache::config::CacheConfig;
use crate::cache::consumer::CacheConsumer;
use crate::cache::events::EventQueue;
use crate::cache::registry::CacheRegistry;
use crate::cache::service::ObjectCache;
use crate::cache::store::CacheStore;
use crate::cache::trigger::CacheTrigger;
use crate::infra::db::{MemoryStore, memory_repos};

/// The assembled content core: one shared cache and the services that use
/// it.
pub struct Core {
    pub cache: Arc<ObjectCache>,
    pub trigger: Arc<CacheTrigger>,
    pub categories: CategoryService,
    pub listings: ListingService,
    pub relations: RelationService,
    pub hits: HitCountService,
    pub polls: PollService,
    pub boxes: BoxService,
}

impl Core {
    pub fn new(config: CacheConfig, repos: Repos, router: Arc<dyn UrlRouter>) -> Self {
        let store = Arc::new(CacheStore::new(&config));
        let registry = Arc::new(CacheRegistry::new());
        let queue = Arc::new(EventQueue::new());
        let consumer = Arc::new(CacheConsumer::new(
            config.clone(),
            store.clone(),
            registry.clone(),
            queue.clone(),
        ));
        let trigger = Arc::new(CacheTrigger::new(config.clone(), queue.clone(), consumer));
        let cache = Arc::new(ObjectCache::new(config, store, registry, queue, repos.clone()));

        Self {
            categories: CategoryService::new(
                cache.clone(),
                repos.clone(),
                trigger.clone(),
                router.clone(),
            ),
            listings: ListingService::new(
                cache.clone(),
                repos.clone(),
                trigger.clone(),
                router,
            ),
            relations: RelationService::new(cache.clone(), repos.clone(), trigger.clone()),
            hits: HitCountService::new(cache.clone(), repos.clone(), trigger.clone()),
            polls: PollService::new(cache.clone(), repos, trigger.clone()),
            boxes: BoxService::new(cache.clone()),
            cache,
            trigger,
        }
    }

    /// Core over a fresh in-memory store with the default path router.
    pub fn with_memory_store(config: CacheConfig) -> Self {
        let repos = memory_repos(Arc::new(MemoryStore::new()));
        Self::new(config, repos, Arc::new(PathRouter))
    }
}
