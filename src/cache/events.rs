//! Cache event system.
//!
//! Writes publish a `CacheEvent` describing the changed row; the consumer
//! drains the queue and applies the invalidation policy.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use time::OffsetDateTime;
use tracing::debug;
use uuid::Uuid;

use crate::domain::entities::{
    ArticleRecord, CategoryRecord, ChoiceRecord, DependencyRecord, HitCountRecord, ListingRecord,
    PollRecord, RelatedRecord, SiteRecord,
};
use crate::domain::types::{ContentKind, ContentRef, RowKind};

use super::lock::mutex_lock;

const SOURCE: &str = "cache::events";

/// Monotonic epoch for ordering events within this process.
pub type Epoch = u64;

/// Snapshot of the row a write touched. Carrying the full record lets
/// render-box invalidation tests inspect the changed instance.
#[derive(Debug, Clone, PartialEq)]
pub enum ChangedRow {
    Site(SiteRecord),
    Category(CategoryRecord),
    Article(ArticleRecord),
    Poll(PollRecord),
    Choice(ChoiceRecord),
    Listing(ListingRecord),
    Related(RelatedRecord),
    Dependency(DependencyRecord),
    HitCount(HitCountRecord),
}

impl ChangedRow {
    pub fn row_kind(&self) -> RowKind {
        match self {
            ChangedRow::Site(_) => RowKind::Site,
            ChangedRow::Category(_) => RowKind::Category,
            ChangedRow::Article(_) => RowKind::Article,
            ChangedRow::Poll(_) => RowKind::Poll,
            ChangedRow::Choice(_) => RowKind::Choice,
            ChangedRow::Listing(_) => RowKind::Listing,
            ChangedRow::Related(_) => RowKind::Related,
            ChangedRow::Dependency(_) => RowKind::Dependency,
            ChangedRow::HitCount(_) => RowKind::HitCount,
        }
    }

    /// Polymorphic reference for rows that are referencable targets; link
    /// rows (listings, relations, hit counts) return `None`.
    pub fn content_ref(&self) -> Option<ContentRef> {
        match self {
            ChangedRow::Site(r) => Some(ContentRef::new(ContentKind::Site, r.id)),
            ChangedRow::Category(r) => Some(ContentRef::new(ContentKind::Category, r.id)),
            ChangedRow::Article(r) => Some(ContentRef::new(ContentKind::Article, r.id)),
            ChangedRow::Poll(r) => Some(ContentRef::new(ContentKind::Poll, r.id)),
            ChangedRow::Choice(r) => Some(ContentRef::new(ContentKind::Choice, r.id)),
            ChangedRow::Listing(_)
            | ChangedRow::Related(_)
            | ChangedRow::Dependency(_)
            | ChangedRow::HitCount(_) => None,
        }
    }
}

/// Types of cache events that trigger invalidation.
#[derive(Debug, Clone, PartialEq)]
pub enum EventKind {
    /// A row was created or updated.
    RowSaved(ChangedRow),
    /// A row was deleted.
    RowDeleted(ChangedRow),
    /// Drop every cache entry.
    Flush,
}

/// Cache event with idempotency and ordering support.
#[derive(Debug, Clone)]
pub struct CacheEvent {
    /// Unique identifier for idempotency.
    pub id: Uuid,
    /// Monotonic epoch for ordering within this process.
    pub epoch: Epoch,
    pub kind: EventKind,
    pub timestamp: OffsetDateTime,
}

impl CacheEvent {
    pub fn new(kind: EventKind, epoch: Epoch) -> Self {
        Self {
            id: Uuid::new_v4(),
            epoch,
            kind,
            timestamp: OffsetDateTime::now_utc(),
        }
    }
}

/// In-memory event queue for cache invalidation.
///
/// Uses a mutex for simplicity since contention is expected to be low.
pub struct EventQueue {
    queue: Mutex<VecDeque<CacheEvent>>,
    epoch_counter: AtomicU64,
}

impl EventQueue {
    pub fn new() -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            epoch_counter: AtomicU64::new(0),
        }
    }

    pub fn next_epoch(&self) -> Epoch {
        self.epoch_counter.fetch_add(1, Ordering::SeqCst)
    }

    /// Current epoch without advancing it. Readers capture this before a
    /// miss-load and compare it again before inserting: an advance in
    /// between means a write raced the load and the result may be stale.
    pub fn current_epoch(&self) -> Epoch {
        self.epoch_counter.load(Ordering::SeqCst)
    }

    /// Publish an event to the queue.
    pub fn publish(&self, kind: EventKind) {
        let epoch = self.next_epoch();
        let event = CacheEvent::new(kind, epoch);

        debug!(
            event_id = %event.id,
            event_epoch = event.epoch,
            event_kind = ?event.kind,
            "Cache event enqueued"
        );

        mutex_lock(&self.queue, SOURCE, "publish").push_back(event);
    }

    /// Drain up to `limit` events in FIFO order.
    pub fn drain(&self, limit: usize) -> Vec<CacheEvent> {
        let mut queue = mutex_lock(&self.queue, SOURCE, "drain");
        let count = limit.min(queue.len());
        queue.drain(..count).collect()
    }

    pub fn len(&self) -> usize {
        mutex_lock(&self.queue, SOURCE, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        mutex_lock(&self.queue, SOURCE, "clear").clear();
    }
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::panic::{AssertUnwindSafe, catch_unwind};

    use super::*;

    fn sample_site() -> SiteRecord {
        SiteRecord {
            id: Uuid::new_v4(),
            name: "Example".into(),
            domain: "example.com".into(),
        }
    }

    #[test]
    fn epoch_monotonicity() {
        let queue = EventQueue::new();

        let e1 = queue.next_epoch();
        let e2 = queue.next_epoch();
        assert!(e1 < e2);
    }

    #[test]
    fn current_epoch_advances_on_publish() {
        let queue = EventQueue::new();

        let before = queue.current_epoch();
        queue.publish(EventKind::Flush);
        assert!(queue.current_epoch() > before);
        // Reading never advances.
        assert_eq!(queue.current_epoch(), queue.current_epoch());
    }

    #[test]
    fn publish_and_drain_fifo() {
        let queue = EventQueue::new();

        queue.publish(EventKind::Flush);
        queue.publish(EventKind::RowSaved(ChangedRow::Site(sample_site())));
        assert_eq!(queue.len(), 2);

        let events = queue.drain(1);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, EventKind::Flush);
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn drain_more_than_available() {
        let queue = EventQueue::new();
        queue.publish(EventKind::Flush);

        let events = queue.drain(100);
        assert_eq!(events.len(), 1);
        assert!(queue.is_empty());
    }

    #[test]
    fn changed_row_refs() {
        let site = sample_site();
        let row = ChangedRow::Site(site.clone());
        assert_eq!(row.row_kind(), RowKind::Site);
        assert_eq!(
            row.content_ref(),
            Some(ContentRef::new(ContentKind::Site, site.id))
        );
    }

    #[test]
    fn event_queue_recovers_from_poisoned_lock() {
        let queue = EventQueue::new();

        let _ = catch_unwind(AssertUnwindSafe(|| {
            let _guard = queue.queue.lock().expect("queue lock should be acquired");
            panic!("poison queue lock");
        }));

        queue.publish(EventKind::Flush);
        assert_eq!(queue.len(), 1);
    }
}
