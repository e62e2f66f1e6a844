//! Cache key definitions.
//!
//! `EntityKey` identifies what changed (a single row, or any row of a
//! table); `CacheKey` identifies a stored cache entry. The registry maps
//! between the two for invalidation.

use uuid::Uuid;

use crate::domain::types::{ContentRef, RowKind};

/// Identifies a dependency of a cache entry for invalidation purposes.
///
/// Single-object entries depend on `Object(ref)`; list, filtered-lookup,
/// and memo entries depend on `Rows(kind)` so that any write to the table
/// evicts them (type-scoped policy).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKey {
    /// One row of a referencable kind.
    Object(ContentRef),
    /// Any row of the given table.
    Rows(RowKind),
}

/// Identifies one entry in the cache store.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// Single entity by polymorphic reference.
    Object(ContentRef),
    /// Unique category lookup by `(site, tree_path)`.
    CategoryByPath { site_id: Uuid, tree_path: String },
    /// The unique listing pairing a target with a category.
    ListingFor {
        target: ContentRef,
        category_id: Uuid,
    },
    /// All listings placed in a category.
    CategoryListings(Uuid),
    /// All listings placing a target anywhere.
    TargetListings(ContentRef),
    /// All choices of a poll.
    PollChoices(Uuid),
    /// Related links outgoing from a source.
    RelatedFor(ContentRef),
    /// Dependency links outgoing from a source.
    DependenciesFor(ContentRef),
    /// Memoized per-entity derivation (e.g. a display name).
    Memo {
        target: ContentRef,
        tag: &'static str,
    },
    /// Cached render-box context.
    RenderBox {
        target: ContentRef,
        box_type: String,
    },
}

#[cfg(test)]
mod tests {
    use crate::domain::types::ContentKind;

    use super::*;

    #[test]
    fn entity_key_equality() {
        let id = Uuid::new_v4();
        let a = EntityKey::Object(ContentRef::new(ContentKind::Category, id));
        let b = EntityKey::Object(ContentRef::new(ContentKind::Category, id));
        assert_eq!(a, b);
        assert_ne!(a, EntityKey::Rows(RowKind::Category));
    }

    #[test]
    fn cache_key_distinguishes_lookup_parameters() {
        let site = Uuid::new_v4();
        let a = CacheKey::CategoryByPath {
            site_id: site,
            tree_path: "news".into(),
        };
        let b = CacheKey::CategoryByPath {
            site_id: site,
            tree_path: "news/sports".into(),
        };
        assert_ne!(a, b);
    }
}
