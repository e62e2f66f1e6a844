//! Domain entities mirrored from persistent storage.

use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::types::{ActivityState, ContentKind, ContentRef, activity_state};

/// A site registered with the platform; categories and hit counters are
/// scoped to one site, and cross-site URLs are built from its domain.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SiteRecord {
    pub id: Uuid,
    pub name: String,
    pub domain: String,
}

impl SiteRecord {
    pub fn content_ref(&self) -> ContentRef {
        ContentRef::new(ContentKind::Site, self.id)
    }
}

/// A node in the hierarchical category tree.
///
/// `tree_path` is derived, not authoritative: it is always the `/`-joined
/// slugs from the root to this node, empty only for a site's root category.
/// `(site_id, tree_path)` is unique.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryRecord {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub tree_parent_id: Option<Uuid>,
    pub tree_path: String,
    pub description: String,
    pub site_id: Uuid,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl CategoryRecord {
    pub fn content_ref(&self) -> ContentRef {
        ContentRef::new(ContentKind::Category, self.id)
    }

    /// Addressable path of this node. Roots are addressed by slug even
    /// though their stored `tree_path` is the empty string.
    pub fn path(&self) -> &str {
        if self.tree_parent_id.is_some() {
            &self.tree_path
        } else {
            &self.slug
        }
    }

    /// Nesting depth derived from the materialized path.
    pub fn depth(&self) -> usize {
        self.tree_path.matches('/').count()
    }
}

/// A publishable content object. `category_id` names its main category;
/// the detail URL is always derived from the main listing in that category.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArticleRecord {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub category_id: Uuid,
    pub description: String,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl ArticleRecord {
    pub fn content_ref(&self) -> ContentRef {
        ContentRef::new(ContentKind::Article, self.id)
    }
}

/// Placement of a publishable object in a category.
///
/// An object may be listed in any number of categories, but only once per
/// category; the listing in the object's own category is its main listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListingRecord {
    pub id: Uuid,
    pub target: ContentRef,
    pub category_id: Uuid,
    pub publish_from: OffsetDateTime,
    pub priority_from: Option<OffsetDateTime>,
    pub priority_to: Option<OffsetDateTime>,
    pub priority_value: Option<i32>,
    /// Remove the object from listings after the priority wears off?
    pub remove: bool,
    pub commercial: bool,
    /// Create the object's URL, but do not list it in listings.
    pub hidden: bool,
}

impl ListingRecord {
    /// A listing only expires when it has a priority window, the window is
    /// over, and `remove` is set. Without `priority_to` it never retires.
    pub fn is_active(&self, now: OffsetDateTime) -> bool {
        !(self.priority_to.is_some_and(|to| now > to) && self.remove)
    }

    pub fn is_published(&self, now: OffsetDateTime) -> bool {
        now > self.publish_from
    }
}

/// Per-site hit counter for a polymorphic target.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HitCountRecord {
    pub id: Uuid,
    pub target: ContentRef,
    pub site_id: Uuid,
    pub hits: u64,
    pub last_seen: OffsetDateTime,
}

/// Source-to-target link between two arbitrary objects, e.g. related
/// articles.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RelatedRecord {
    pub id: Uuid,
    pub source: ContentRef,
    pub target: ContentRef,
}

/// Dependency link, e.g. a photo used by an article. The
/// `(target_key, source_key)` pair uniquely identifies the variant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DependencyRecord {
    pub id: Uuid,
    pub source: ContentRef,
    pub source_key: String,
    pub target: ContentRef,
    pub target_key: String,
}

/// Poll with an optional activity window. The question text lives on the
/// poll; choices reference it by `poll_id`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PollRecord {
    pub id: Uuid,
    pub title: String,
    pub question: String,
    pub text_announcement: String,
    pub text: String,
    pub text_results: String,
    pub active_from: Option<OffsetDateTime>,
    pub active_till: Option<OffsetDateTime>,
}

impl PollRecord {
    pub fn content_ref(&self) -> ContentRef {
        ContentRef::new(ContentKind::Poll, self.id)
    }

    pub fn activity_state(&self, now: OffsetDateTime) -> ActivityState {
        activity_state(self.active_from, self.active_till, now)
    }

    pub fn is_active(&self, now: OffsetDateTime) -> bool {
        self.activity_state(now) == ActivityState::Active
    }

    /// Text content for the poll's current life-cycle stage.
    pub fn current_text(&self, now: OffsetDateTime) -> &str {
        match self.activity_state(now) {
            ActivityState::NotYetActive => &self.text_announcement,
            ActivityState::Active => &self.text,
            ActivityState::Closed => &self.text_results,
        }
    }
}

/// A single poll choice with its accumulated votes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChoiceRecord {
    pub id: Uuid,
    pub poll_id: Uuid,
    pub choice: String,
    pub points: i32,
    pub votes: i64,
}

impl ChoiceRecord {
    pub fn content_ref(&self) -> ContentRef {
        ContentRef::new(ContentKind::Choice, self.id)
    }
}

/// A resolved polymorphic reference: tagged union over the referencable
/// entity kinds.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Entity {
    Site(SiteRecord),
    Category(CategoryRecord),
    Article(ArticleRecord),
    Poll(PollRecord),
    Choice(ChoiceRecord),
}

impl Entity {
    pub fn kind(&self) -> ContentKind {
        match self {
            Entity::Site(_) => ContentKind::Site,
            Entity::Category(_) => ContentKind::Category,
            Entity::Article(_) => ContentKind::Article,
            Entity::Poll(_) => ContentKind::Poll,
            Entity::Choice(_) => ContentKind::Choice,
        }
    }

    pub fn id(&self) -> Uuid {
        match self {
            Entity::Site(r) => r.id,
            Entity::Category(r) => r.id,
            Entity::Article(r) => r.id,
            Entity::Poll(r) => r.id,
            Entity::Choice(r) => r.id,
        }
    }

    pub fn content_ref(&self) -> ContentRef {
        ContentRef::new(self.kind(), self.id())
    }

    pub fn display_name(&self) -> &str {
        match self {
            Entity::Site(r) => &r.name,
            Entity::Category(r) => &r.title,
            Entity::Article(r) => &r.title,
            Entity::Poll(r) => &r.title,
            Entity::Choice(r) => &r.choice,
        }
    }

    pub fn as_article(&self) -> Option<&ArticleRecord> {
        match self {
            Entity::Article(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_category(&self) -> Option<&CategoryRecord> {
        match self {
            Entity::Category(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_site(&self) -> Option<&SiteRecord> {
        match self {
            Entity::Site(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_poll(&self) -> Option<&PollRecord> {
        match self {
            Entity::Poll(r) => Some(r),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use time::Duration;

    use super::*;

    fn category(parent: Option<Uuid>, slug: &str, path: &str) -> CategoryRecord {
        let now = OffsetDateTime::now_utc();
        CategoryRecord {
            id: Uuid::new_v4(),
            title: slug.to_string(),
            slug: slug.to_string(),
            tree_parent_id: parent,
            tree_path: path.to_string(),
            description: String::new(),
            site_id: Uuid::new_v4(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn root_category_is_addressed_by_slug() {
        let root = category(None, "home", "");
        assert_eq!(root.path(), "home");
        assert_eq!(root.depth(), 0);
    }

    #[test]
    fn nested_category_is_addressed_by_tree_path() {
        let nested = category(Some(Uuid::new_v4()), "sports", "news/sports");
        assert_eq!(nested.path(), "news/sports");
        assert_eq!(nested.depth(), 1);
    }

    fn listing(
        priority_to: Option<OffsetDateTime>,
        remove: bool,
        publish_from: OffsetDateTime,
    ) -> ListingRecord {
        ListingRecord {
            id: Uuid::new_v4(),
            target: ContentRef::new(ContentKind::Article, Uuid::new_v4()),
            category_id: Uuid::new_v4(),
            publish_from,
            priority_from: None,
            priority_to,
            priority_value: None,
            remove,
            commercial: false,
            hidden: false,
        }
    }

    #[test]
    fn expired_listing_without_remove_stays_active() {
        let now = OffsetDateTime::now_utc();
        let past = now - Duration::days(7);

        assert!(listing(Some(past), false, past).is_active(now));
        assert!(!listing(Some(past), true, past).is_active(now));
        // No priority window: `remove` alone never retires a listing.
        assert!(listing(None, true, past).is_active(now));
    }

    #[test]
    fn publication_follows_publish_from() {
        let now = OffsetDateTime::now_utc();
        let past = now - Duration::hours(1);
        let future = now + Duration::hours(1);

        assert!(listing(None, false, past).is_published(now));
        assert!(!listing(None, false, future).is_published(now));
    }

    #[test]
    fn poll_current_text_tracks_activity() {
        let now = OffsetDateTime::now_utc();
        let poll = PollRecord {
            id: Uuid::new_v4(),
            title: "t".into(),
            question: "q".into(),
            text_announcement: "soon".into(),
            text: "vote now".into(),
            text_results: "done".into(),
            active_from: Some(now - Duration::hours(1)),
            active_till: Some(now + Duration::hours(1)),
        };
        assert_eq!(poll.current_text(now), "vote now");
        assert_eq!(poll.current_text(now + Duration::hours(2)), "done");
        assert_eq!(poll.current_text(now - Duration::hours(2)), "soon");
    }
}
