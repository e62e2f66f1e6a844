//! Cache configuration.

use std::num::NonZeroUsize;

use serde::Deserialize;

const DEFAULT_OBJECT_LIMIT: usize = 512;
const DEFAULT_LOOKUP_LIMIT: usize = 256;
const DEFAULT_LIST_LIMIT: usize = 128;
const DEFAULT_BOX_LIMIT: usize = 256;
const DEFAULT_CONSUME_BATCH: usize = 64;

/// Behavior knobs for the object cache, loaded from the `[cache]` section
/// of the configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Master switch; when off, reads go straight to the store and the
    /// trigger drops events.
    pub enabled: bool,
    /// LRU capacity for single-object entries.
    pub object_limit: usize,
    /// LRU capacity for unique-lookup entries (e.g. category by path).
    pub lookup_limit: usize,
    /// LRU capacity for cached lists.
    pub list_limit: usize,
    /// Capacity for render-box entries.
    pub box_limit: usize,
    /// Maximum events drained per consumption pass.
    pub consume_batch: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            object_limit: DEFAULT_OBJECT_LIMIT,
            lookup_limit: DEFAULT_LOOKUP_LIMIT,
            list_limit: DEFAULT_LIST_LIMIT,
            box_limit: DEFAULT_BOX_LIMIT,
            consume_batch: DEFAULT_CONSUME_BATCH,
        }
    }
}

impl CacheConfig {
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn object_limit_non_zero(&self) -> NonZeroUsize {
        non_zero(self.object_limit, DEFAULT_OBJECT_LIMIT)
    }

    pub fn lookup_limit_non_zero(&self) -> NonZeroUsize {
        non_zero(self.lookup_limit, DEFAULT_LOOKUP_LIMIT)
    }

    pub fn list_limit_non_zero(&self) -> NonZeroUsize {
        non_zero(self.list_limit, DEFAULT_LIST_LIMIT)
    }

    pub fn box_limit_non_zero(&self) -> NonZeroUsize {
        non_zero(self.box_limit, DEFAULT_BOX_LIMIT)
    }

    pub fn consume_batch_non_zero(&self) -> usize {
        if self.consume_batch == 0 {
            DEFAULT_CONSUME_BATCH
        } else {
            self.consume_batch
        }
    }
}

fn non_zero(value: usize, fallback: usize) -> NonZeroUsize {
    NonZeroUsize::new(value)
        .or_else(|| NonZeroUsize::new(fallback))
        .expect("fallback capacity is non-zero")
}
