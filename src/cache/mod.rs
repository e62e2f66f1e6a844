//! Cache-coherent object cache.
//!
//! The cache is organized around three cooperating pieces:
//!
//! - [`ObjectCache`] is the read side: read-through resolution of
//!   polymorphic references, unique lookups, cached lists, memoized
//!   derivations, and render-box contexts. Every entry it stores is
//!   registered in the [`CacheRegistry`] with the entity keys it depends
//!   on.
//! - [`CacheTrigger`] is the write side: services publish a `ChangedRow`
//!   event after each successful write.
//! - [`CacheConsumer`] drains the [`EventQueue`] and evicts exactly the
//!   entries whose registered dependencies intersect the changed row.

pub mod config;
pub mod consumer;
pub mod events;
pub mod keys;
mod lock;
pub mod registry;
pub mod service;
pub mod store;
pub mod trigger;

pub use config::CacheConfig;
pub use consumer::CacheConsumer;
pub use events::{CacheEvent, ChangedRow, Epoch, EventKind, EventQueue};
pub use keys::{CacheKey, EntityKey};
pub use registry::CacheRegistry;
pub use service::ObjectCache;
pub use store::{BoxEntry, BoxTest, CacheStore};
pub use trigger::CacheTrigger;
