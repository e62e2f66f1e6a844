use rubrika::Core;
use rubrika::application::error::AppError;
use rubrika::cache::config::CacheConfig;
use rubrika::domain::entities::{ArticleRecord, CategoryRecord, PollRecord, SiteRecord};
use rubrika::domain::types::{ContentKind, ContentRef};
use time::OffsetDateTime;
use uuid::Uuid;

fn core() -> Core {
    Core::with_memory_store(CacheConfig::default())
}

async fn seed_site(core: &Core) -> SiteRecord {
    let site = SiteRecord {
        id: Uuid::new_v4(),
        name: "Example".into(),
        domain: "example.com".into(),
    };
    core.cache
        .repos()
        .sites
        .upsert(site.clone())
        .await
        .expect("seed site")
}

async fn seed_root(core: &Core, site_id: Uuid) -> CategoryRecord {
    let now = OffsetDateTime::now_utc();
    core.categories
        .save(CategoryRecord {
            id: Uuid::new_v4(),
            title: "Home".into(),
            slug: "home".into(),
            tree_parent_id: None,
            tree_path: String::new(),
            description: String::new(),
            site_id,
            created_at: now,
            updated_at: now,
        })
        .await
        .expect("save root")
}

async fn seed_article(core: &Core, category_id: Uuid, slug: &str) -> ArticleRecord {
    let now = OffsetDateTime::now_utc();
    core.cache
        .repos()
        .articles
        .upsert(ArticleRecord {
            id: Uuid::new_v4(),
            title: slug.to_string(),
            slug: slug.to_string(),
            category_id,
            description: String::new(),
            created_at: now,
            updated_at: now,
        })
        .await
        .expect("seed article")
}

async fn seed_poll(core: &Core, title: &str) -> PollRecord {
    core.polls
        .upsert_poll(PollRecord {
            id: Uuid::new_v4(),
            title: title.to_string(),
            question: "?".into(),
            text_announcement: String::new(),
            text: String::new(),
            text_results: String::new(),
            active_from: None,
            active_till: None,
        })
        .await
        .expect("seed poll")
}

#[tokio::test]
async fn related_rows_resolve_lazily_through_the_cache() {
    let core = core();
    let site = seed_site(&core).await;
    let root = seed_root(&core, site.id).await;
    let article = seed_article(&core, root.id, "story").await;
    let poll = seed_poll(&core, "Season").await;

    core.relations
        .add_related(article.content_ref(), poll.content_ref())
        .await
        .expect("add related");

    let related = core
        .relations
        .related_for(article.content_ref())
        .await
        .expect("related rows");
    assert_eq!(related.len(), 1);

    let entry = &related[0];
    assert_eq!(entry.record.target, poll.content_ref());

    let target = entry
        .target
        .resolve(core.relations.cache())
        .await
        .expect("resolve target");
    assert_eq!(target.display_name(), "Season");

    // Second resolution is answered by the instance memo.
    let again = entry
        .target
        .resolve(core.relations.cache())
        .await
        .expect("resolve target again");
    assert_eq!(again.content_ref(), poll.content_ref());
}

#[tokio::test]
async fn duplicate_dependency_pairs_are_rejected() {
    let core = core();
    let site = seed_site(&core).await;
    let root = seed_root(&core, site.id).await;
    let article = seed_article(&core, root.id, "story").await;
    let poll = seed_poll(&core, "Season").await;

    core.relations
        .add_dependency(article.content_ref(), poll.content_ref())
        .await
        .expect("add dependency");

    let err = core
        .relations
        .add_dependency(article.content_ref(), poll.content_ref())
        .await
        .expect_err("duplicate pair");
    assert!(matches!(err, AppError::ConstraintViolation { .. }));

    let dependencies = core
        .relations
        .dependencies_for(article.content_ref())
        .await
        .expect("dependency rows");
    assert_eq!(dependencies.len(), 1);
    assert_eq!(
        dependencies[0].record.target_key,
        format!("polls:{}", poll.id)
    );
}

#[tokio::test]
async fn hit_counter_accumulates_per_site() {
    let core = core();
    let site = seed_site(&core).await;
    let other_site = core
        .cache
        .repos()
        .sites
        .upsert(SiteRecord {
            id: Uuid::new_v4(),
            name: "Other".into(),
            domain: "other.example.com".into(),
        })
        .await
        .expect("seed other site");
    let root = seed_root(&core, site.id).await;
    let article = seed_article(&core, root.id, "story").await;

    let first = core
        .hits
        .hit(article.content_ref(), site.id)
        .await
        .expect("first hit");
    assert_eq!(first.hits, 1);

    let second = core
        .hits
        .hit(article.content_ref(), site.id)
        .await
        .expect("second hit");
    assert_eq!(second.hits, 2);
    assert_eq!(second.id, first.id);

    // Counters are per site.
    let elsewhere = core
        .hits
        .hit(article.content_ref(), other_site.id)
        .await
        .expect("hit on other site");
    assert_eq!(elsewhere.hits, 1);

    let stored = core
        .hits
        .hits_for(article.content_ref(), site.id)
        .await
        .expect("lookup")
        .expect("counter exists");
    assert_eq!(stored.hits, 2);
}

#[tokio::test]
async fn hits_on_missing_targets_fail() {
    let core = core();
    let site = seed_site(&core).await;

    let missing = ContentRef::new(ContentKind::Article, Uuid::new_v4());
    let err = core
        .hits
        .hit(missing, site.id)
        .await
        .expect_err("missing target");
    assert!(matches!(err, AppError::NotFound { .. }));
}

#[tokio::test]
async fn box_for_a_listing_annotates_the_target_box() {
    let core = core();
    let site = seed_site(&core).await;
    let root = seed_root(&core, site.id).await;
    let article = seed_article(&core, root.id, "story").await;

    let listing = rubrika::domain::entities::ListingRecord {
        id: Uuid::new_v4(),
        target: article.content_ref(),
        category_id: root.id,
        publish_from: OffsetDateTime::now_utc(),
        priority_from: None,
        priority_to: None,
        priority_value: None,
        remove: false,
        commercial: true,
        hidden: false,
    };

    let context = core
        .boxes
        .listing_box(&listing, "teaser")
        .await
        .expect("listing box");
    // Articles fall back to the default wrapper.
    assert_eq!(context["kind"], serde_json::json!("articles"));
    assert_eq!(context["name"], serde_json::json!("story"));
    assert_eq!(context["commercial"], serde_json::json!(true));
}

#[tokio::test]
async fn category_box_parameters_reach_the_context_and_skip_the_cache() {
    use rubrika::application::boxes::BoxParams;

    let core = core();
    let site = seed_site(&core).await;
    let root = seed_root(&core, site.id).await;

    let mut params = BoxParams::new();
    params.insert("photo_slug".into(), serde_json::json!("front-page"));
    let context = core
        .boxes
        .entity_box_with(root.content_ref(), "main", &params)
        .await
        .expect("parameterized box");
    assert_eq!(context["photo_slug"], serde_json::json!("front-page"));

    // Cached entries are keyed by box type alone, so a parameterized box
    // is never stored.
    assert!(core.cache.box_entry(root.content_ref(), "main").is_none());

    let plain = core
        .boxes
        .entity_box(root.content_ref(), "main")
        .await
        .expect("plain box");
    assert!(!plain.contains_key("photo_slug"));
    assert!(core.cache.box_entry(root.content_ref(), "main").is_some());
}
