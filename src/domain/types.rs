//! Value types shared across the domain: content kinds, polymorphic
//! references, and activity windows.

use serde::Serialize;
use slug::slugify;
use time::OffsetDateTime;
use uuid::Uuid;

/// The finite set of entity kinds a polymorphic reference can address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    Site,
    Category,
    Article,
    Poll,
    Choice,
}

impl ContentKind {
    /// Human-readable plural name, mirrored into URL content-type segments.
    pub fn verbose_name_plural(&self) -> &'static str {
        match self {
            ContentKind::Site => "Sites",
            ContentKind::Category => "Categories",
            ContentKind::Article => "Articles",
            ContentKind::Poll => "Polls",
            ContentKind::Choice => "Choices",
        }
    }

    /// Slugified content-type segment used in object-detail URLs.
    pub fn type_slug(&self) -> String {
        slugify(self.verbose_name_plural())
    }
}

/// A `(kind, id)` pair addressing an entity whose concrete type is only
/// known at runtime. Resolved through the object cache's loader registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ContentRef {
    pub kind: ContentKind,
    pub id: Uuid,
}

impl ContentRef {
    pub fn new(kind: ContentKind, id: Uuid) -> Self {
        Self { kind, id }
    }
}

impl std::fmt::Display for ContentRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.kind.type_slug(), self.id)
    }
}

/// Every persisted table, including link rows that are not themselves
/// referencable targets. Type-scoped cache invalidation operates on this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RowKind {
    Site,
    Category,
    Article,
    Poll,
    Choice,
    Listing,
    Related,
    Dependency,
    HitCount,
}

impl From<ContentKind> for RowKind {
    fn from(kind: ContentKind) -> Self {
        match kind {
            ContentKind::Site => RowKind::Site,
            ContentKind::Category => RowKind::Category,
            ContentKind::Article => RowKind::Article,
            ContentKind::Poll => RowKind::Poll,
            ContentKind::Choice => RowKind::Choice,
        }
    }
}

/// Life-cycle stage of an object with an activity window.
///
/// ```text
///             | NotYetActive
/// active_from +-------------
///             | Active
/// active_till +-------------
///             | Closed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityState {
    NotYetActive,
    Active,
    Closed,
}

/// Classify `now` against an optional activity window.
pub fn activity_state(
    active_from: Option<OffsetDateTime>,
    active_till: Option<OffsetDateTime>,
    now: OffsetDateTime,
) -> ActivityState {
    if let Some(till) = active_till {
        if till < now {
            return ActivityState::Closed;
        }
    }
    if let Some(from) = active_from {
        if from > now {
            return ActivityState::NotYetActive;
        }
    }
    ActivityState::Active
}

#[cfg(test)]
mod tests {
    use time::Duration;

    use super::*;

    #[test]
    fn type_slug_is_lowercase_plural() {
        assert_eq!(ContentKind::Article.type_slug(), "articles");
        assert_eq!(ContentKind::Category.type_slug(), "categories");
    }

    #[test]
    fn activity_window_classification() {
        let now = OffsetDateTime::now_utc();
        let earlier = now - Duration::hours(1);
        let later = now + Duration::hours(1);

        assert_eq!(
            activity_state(Some(earlier), Some(later), now),
            ActivityState::Active
        );
        assert_eq!(
            activity_state(Some(later), None, now),
            ActivityState::NotYetActive
        );
        assert_eq!(
            activity_state(None, Some(earlier), now),
            ActivityState::Closed
        );
        assert_eq!(activity_state(None, None, now), ActivityState::Active);
    }

    #[test]
    fn content_ref_display() {
        let id = Uuid::nil();
        let r = ContentRef::new(ContentKind::Poll, id);
        assert_eq!(r.to_string(), format!("polls:{id}"));
    }
}
