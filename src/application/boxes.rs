//! Render boxes.
//!
//! A box is the render-context mapping handed to the presentation layer
//! for one entity and one box type. Entities that know how to present
//! themselves implement [`Renderable`]; everything else gets the default
//! wrapper. Built contexts are cached together with predicate tests that
//! decide which row changes invalidate them.

use std::sync::Arc;

use serde_json::{Value, json};

use crate::cache::events::ChangedRow;
use crate::cache::service::ObjectCache;
use crate::cache::store::{BoxEntry, BoxTest};
use crate::domain::entities::{CategoryRecord, Entity, ListingRecord, PollRecord};
use crate::domain::types::ContentRef;

use super::error::AppError;

/// Render-context mapping produced for a box.
pub type BoxContext = serde_json::Map<String, Value>;

/// Caller-supplied box parameters, passed through to the entity's context
/// builder.
pub type BoxParams = serde_json::Map<String, Value>;

/// Capability interface for entities that build their own render context.
pub trait Renderable {
    fn box_context(&self, box_type: &str, params: &BoxParams) -> BoxContext;

    /// Predicates deciding which row changes invalidate a cached box of
    /// this entity beyond the entity's own row.
    fn box_tests(&self) -> Vec<BoxTest> {
        Vec::new()
    }
}

impl Renderable for CategoryRecord {
    fn box_context(&self, box_type: &str, params: &BoxParams) -> BoxContext {
        let mut context = BoxContext::new();
        context.insert("box_type".into(), json!(box_type));
        context.insert("title".into(), json!(self.title));
        context.insert("slug".into(), json!(self.slug));
        context.insert("path".into(), json!(self.path()));
        context.insert("description".into(), json!(self.description));
        // Category boxes accept an optional photo override.
        if let Some(photo_slug) = params.get("photo_slug") {
            context.insert("photo_slug".into(), photo_slug.clone());
        }
        context
    }
}

impl Renderable for PollRecord {
    fn box_context(&self, box_type: &str, _params: &BoxParams) -> BoxContext {
        let now = time::OffsetDateTime::now_utc();
        let mut context = BoxContext::new();
        context.insert("box_type".into(), json!(box_type));
        context.insert("title".into(), json!(self.title));
        context.insert("question".into(), json!(self.question));
        context.insert("state".into(), json!(format!("{:?}", self.activity_state(now))));
        context.insert("text".into(), json!(self.current_text(now)));
        context
    }

    fn box_tests(&self) -> Vec<BoxTest> {
        // Vote counts live on the choices, so a poll box goes stale when
        // any choice of this poll changes.
        let poll_id = self.id;
        vec![Arc::new(move |row: &ChangedRow| {
            matches!(row, ChangedRow::Choice(choice) if choice.poll_id == poll_id)
        })]
    }
}

/// Explicit capability check replacing duck-typed dispatch.
pub fn as_renderable(entity: &Entity) -> Option<&dyn Renderable> {
    match entity {
        Entity::Category(category) => Some(category),
        Entity::Poll(poll) => Some(poll),
        Entity::Site(_) | Entity::Article(_) | Entity::Choice(_) => None,
    }
}

/// Fallback wrapper for entities without a [`Renderable`] implementation.
pub fn default_box(entity: &Entity, box_type: &str) -> BoxContext {
    let mut context = BoxContext::new();
    context.insert("box_type".into(), json!(box_type));
    context.insert("kind".into(), json!(entity.kind().type_slug()));
    context.insert("name".into(), json!(entity.display_name()));
    context
}

/// Builds and caches render boxes.
pub struct BoxService {
    cache: Arc<ObjectCache>,
}

impl BoxService {
    pub fn new(cache: Arc<ObjectCache>) -> Self {
        Self { cache }
    }

    /// Box for an arbitrary entity without extra parameters. Renderable
    /// entities build their own context; the rest get the default wrapper.
    pub async fn entity_box(
        &self,
        target: ContentRef,
        box_type: &str,
    ) -> Result<BoxContext, AppError> {
        self.entity_box_with(target, box_type, &BoxParams::new())
            .await
    }

    /// Box for an entity with caller-supplied parameters. Cached entries
    /// are keyed by `(target, box_type)` only, so parameterized boxes are
    /// built per call and never cached.
    pub async fn entity_box_with(
        &self,
        target: ContentRef,
        box_type: &str,
        params: &BoxParams,
    ) -> Result<BoxContext, AppError> {
        let cacheable = params.is_empty();
        if cacheable {
            if let Some(entry) = self.cache.box_entry(target, box_type) {
                return Ok(entry.context);
            }
        }

        let entity = self.cache.get_object(target).await?;
        let (context, tests) = match as_renderable(&entity) {
            Some(renderable) => (
                renderable.box_context(box_type, params),
                renderable.box_tests(),
            ),
            None => (default_box(&entity, box_type), Vec::new()),
        };

        if cacheable {
            self.cache.store_box(
                target,
                box_type.to_string(),
                BoxEntry {
                    context: context.clone(),
                    tests,
                },
            );
        }
        Ok(context)
    }

    /// Box for a listing: delegates to the target's own box and annotates
    /// it with the listing's placement flags.
    pub async fn listing_box(
        &self,
        listing: &ListingRecord,
        box_type: &str,
    ) -> Result<BoxContext, AppError> {
        let mut context = self.entity_box(listing.target, box_type).await?;
        context.insert("commercial".into(), json!(listing.commercial));
        context.insert("hidden".into(), json!(listing.hidden));
        Ok(context)
    }
}
