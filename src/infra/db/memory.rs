//! In-memory persistence adapter.
//!
//! Backs the repository traits with hash tables behind one `RwLock`, which
//! doubles as the transaction boundary: `upsert_tree` stages a copy of the
//! category table and swaps it in only when every constraint holds.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use uuid::Uuid;

use crate::application::repos::{
    ArticlesRepo, CategoriesRepo, HitCountsRepo, ListingsRepo, PollsRepo, RelationsRepo,
    RepoError, Repos, SitesRepo,
};
use crate::domain::entities::{
    ArticleRecord, CategoryRecord, ChoiceRecord, DependencyRecord, HitCountRecord, ListingRecord,
    PollRecord, RelatedRecord, SiteRecord,
};
use crate::domain::types::ContentRef;

#[derive(Default)]
struct Tables {
    sites: HashMap<Uuid, SiteRecord>,
    categories: HashMap<Uuid, CategoryRecord>,
    articles: HashMap<Uuid, ArticleRecord>,
    listings: HashMap<Uuid, ListingRecord>,
    polls: HashMap<Uuid, PollRecord>,
    choices: HashMap<Uuid, ChoiceRecord>,
    related: HashMap<Uuid, RelatedRecord>,
    dependencies: HashMap<Uuid, DependencyRecord>,
    hits: HashMap<Uuid, HitCountRecord>,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>, RepoError> {
        self.tables
            .read()
            .map_err(|_| RepoError::Persistence("store lock poisoned".into()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>, RepoError> {
        self.tables
            .write()
            .map_err(|_| RepoError::Persistence("store lock poisoned".into()))
    }
}

/// Wire a repository bundle onto one shared in-memory store.
pub fn memory_repos(store: Arc<MemoryStore>) -> Repos {
    Repos {
        sites: store.clone(),
        categories: store.clone(),
        articles: store.clone(),
        listings: store.clone(),
        polls: store.clone(),
        relations: store.clone(),
        hits: store,
    }
}

#[async_trait]
impl SitesRepo for MemoryStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<SiteRecord>, RepoError> {
        Ok(self.read()?.sites.get(&id).cloned())
    }

    async fn upsert(&self, site: SiteRecord) -> Result<SiteRecord, RepoError> {
        self.write()?.sites.insert(site.id, site.clone());
        Ok(site)
    }
}

#[async_trait]
impl CategoriesRepo for MemoryStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<CategoryRecord>, RepoError> {
        Ok(self.read()?.categories.get(&id).cloned())
    }

    async fn find_by_path(
        &self,
        site_id: Uuid,
        tree_path: &str,
    ) -> Result<Vec<CategoryRecord>, RepoError> {
        Ok(self
            .read()?
            .categories
            .values()
            .filter(|c| c.site_id == site_id && c.tree_path == tree_path)
            .cloned()
            .collect())
    }

    async fn list_by_path_prefix(
        &self,
        site_id: Uuid,
        prefix: &str,
    ) -> Result<Vec<CategoryRecord>, RepoError> {
        Ok(self
            .read()?
            .categories
            .values()
            .filter(|c| c.site_id == site_id && c.tree_path.starts_with(prefix))
            .cloned()
            .collect())
    }

    async fn upsert_tree(
        &self,
        node: CategoryRecord,
        descendants: Vec<CategoryRecord>,
    ) -> Result<CategoryRecord, RepoError> {
        let mut tables = self.write()?;

        let mut staged = tables.categories.clone();
        staged.insert(node.id, node.clone());
        for descendant in descendants {
            if !staged.contains_key(&descendant.id) {
                return Err(RepoError::aborted(format!(
                    "descendant {} does not exist",
                    descendant.id
                )));
            }
            staged.insert(descendant.id, descendant);
        }

        let mut seen: HashSet<(Uuid, &str)> = HashSet::new();
        for category in staged.values() {
            if !seen.insert((category.site_id, category.tree_path.as_str())) {
                return Err(RepoError::duplicate("categories.site_id_tree_path"));
            }
        }

        tables.categories = staged;
        Ok(node)
    }

    async fn delete(&self, id: Uuid) -> Result<CategoryRecord, RepoError> {
        self.write()?.categories.remove(&id).ok_or(RepoError::NotFound)
    }
}

#[async_trait]
impl ArticlesRepo for MemoryStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<ArticleRecord>, RepoError> {
        Ok(self.read()?.articles.get(&id).cloned())
    }

    async fn upsert(&self, article: ArticleRecord) -> Result<ArticleRecord, RepoError> {
        self.write()?.articles.insert(article.id, article.clone());
        Ok(article)
    }

    async fn delete(&self, id: Uuid) -> Result<ArticleRecord, RepoError> {
        self.write()?.articles.remove(&id).ok_or(RepoError::NotFound)
    }
}

#[async_trait]
impl ListingsRepo for MemoryStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<ListingRecord>, RepoError> {
        Ok(self.read()?.listings.get(&id).cloned())
    }

    async fn find_for_target_in_category(
        &self,
        target: ContentRef,
        category_id: Uuid,
    ) -> Result<Option<ListingRecord>, RepoError> {
        Ok(self
            .read()?
            .listings
            .values()
            .find(|l| l.target == target && l.category_id == category_id)
            .cloned())
    }

    async fn list_for_category(
        &self,
        category_id: Uuid,
    ) -> Result<Vec<ListingRecord>, RepoError> {
        let mut listings: Vec<ListingRecord> = self
            .read()?
            .listings
            .values()
            .filter(|l| l.category_id == category_id)
            .cloned()
            .collect();
        listings.sort_by_key(|l| std::cmp::Reverse(l.publish_from));
        Ok(listings)
    }

    async fn list_for_target(&self, target: ContentRef) -> Result<Vec<ListingRecord>, RepoError> {
        let mut listings: Vec<ListingRecord> = self
            .read()?
            .listings
            .values()
            .filter(|l| l.target == target)
            .cloned()
            .collect();
        listings.sort_by_key(|l| std::cmp::Reverse(l.publish_from));
        Ok(listings)
    }

    async fn upsert(&self, listing: ListingRecord) -> Result<ListingRecord, RepoError> {
        let mut tables = self.write()?;
        let duplicate = tables.listings.values().any(|l| {
            l.id != listing.id
                && l.category_id == listing.category_id
                && l.target == listing.target
        });
        if duplicate {
            return Err(RepoError::duplicate("listings.category_id_target"));
        }
        tables.listings.insert(listing.id, listing.clone());
        Ok(listing)
    }

    async fn delete(&self, id: Uuid) -> Result<ListingRecord, RepoError> {
        self.write()?.listings.remove(&id).ok_or(RepoError::NotFound)
    }
}

#[async_trait]
impl PollsRepo for MemoryStore {
    async fn find_poll(&self, id: Uuid) -> Result<Option<PollRecord>, RepoError> {
        Ok(self.read()?.polls.get(&id).cloned())
    }

    async fn find_choice(&self, id: Uuid) -> Result<Option<ChoiceRecord>, RepoError> {
        Ok(self.read()?.choices.get(&id).cloned())
    }

    async fn list_choices(&self, poll_id: Uuid) -> Result<Vec<ChoiceRecord>, RepoError> {
        let mut choices: Vec<ChoiceRecord> = self
            .read()?
            .choices
            .values()
            .filter(|c| c.poll_id == poll_id)
            .cloned()
            .collect();
        choices.sort_by_key(|c| c.points);
        Ok(choices)
    }

    async fn upsert_poll(&self, poll: PollRecord) -> Result<PollRecord, RepoError> {
        self.write()?.polls.insert(poll.id, poll.clone());
        Ok(poll)
    }

    async fn upsert_choice(&self, choice: ChoiceRecord) -> Result<ChoiceRecord, RepoError> {
        self.write()?.choices.insert(choice.id, choice.clone());
        Ok(choice)
    }

    async fn add_vote(&self, choice_id: Uuid) -> Result<ChoiceRecord, RepoError> {
        let mut tables = self.write()?;
        let choice = tables.choices.get_mut(&choice_id).ok_or(RepoError::NotFound)?;
        choice.votes += 1;
        Ok(choice.clone())
    }
}

#[async_trait]
impl RelationsRepo for MemoryStore {
    async fn insert_related(&self, related: RelatedRecord) -> Result<RelatedRecord, RepoError> {
        self.write()?.related.insert(related.id, related.clone());
        Ok(related)
    }

    async fn list_related_for_source(
        &self,
        source: ContentRef,
    ) -> Result<Vec<RelatedRecord>, RepoError> {
        Ok(self
            .read()?
            .related
            .values()
            .filter(|r| r.source == source)
            .cloned()
            .collect())
    }

    async fn insert_dependency(
        &self,
        dependency: DependencyRecord,
    ) -> Result<DependencyRecord, RepoError> {
        let mut tables = self.write()?;
        let duplicate = tables.dependencies.values().any(|d| {
            d.target_key == dependency.target_key && d.source_key == dependency.source_key
        });
        if duplicate {
            return Err(RepoError::duplicate("dependencies.target_key_source_key"));
        }
        tables.dependencies.insert(dependency.id, dependency.clone());
        Ok(dependency)
    }

    async fn list_dependencies_for_source(
        &self,
        source: ContentRef,
    ) -> Result<Vec<DependencyRecord>, RepoError> {
        Ok(self
            .read()?
            .dependencies
            .values()
            .filter(|d| d.source == source)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl HitCountsRepo for MemoryStore {
    async fn find_for_target(
        &self,
        target: ContentRef,
        site_id: Uuid,
    ) -> Result<Option<HitCountRecord>, RepoError> {
        Ok(self
            .read()?
            .hits
            .values()
            .find(|h| h.target == target && h.site_id == site_id)
            .cloned())
    }

    async fn upsert(&self, hit: HitCountRecord) -> Result<HitCountRecord, RepoError> {
        self.write()?.hits.insert(hit.id, hit.clone());
        Ok(hit)
    }
}

#[cfg(test)]
mod tests {
    use time::OffsetDateTime;

    use crate::domain::types::ContentKind;

    use super::*;

    fn category(site_id: Uuid, slug: &str, path: &str) -> CategoryRecord {
        let now = OffsetDateTime::now_utc();
        CategoryRecord {
            id: Uuid::new_v4(),
            title: slug.to_string(),
            slug: slug.to_string(),
            tree_parent_id: Some(Uuid::new_v4()),
            tree_path: path.to_string(),
            description: String::new(),
            site_id,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn upsert_tree_rejects_duplicate_paths_and_keeps_store_unchanged() {
        let store = MemoryStore::new();
        let site = Uuid::new_v4();

        let first = category(site, "news", "news");
        store
            .upsert_tree(first.clone(), Vec::new())
            .await
            .expect("first insert");

        let clash = category(site, "news", "news");
        let err = store
            .upsert_tree(clash.clone(), Vec::new())
            .await
            .expect_err("duplicate path");
        assert!(matches!(err, RepoError::Duplicate { .. }));

        assert!(
            CategoriesRepo::find_by_id(&store, clash.id)
                .await
                .expect("read")
                .is_none()
        );
        assert!(
            CategoriesRepo::find_by_id(&store, first.id)
                .await
                .expect("read")
                .is_some()
        );
    }

    #[tokio::test]
    async fn listings_unique_per_category_target_pair() {
        let store = MemoryStore::new();
        let target = ContentRef::new(ContentKind::Article, Uuid::new_v4());
        let category_id = Uuid::new_v4();

        let listing = ListingRecord {
            id: Uuid::new_v4(),
            target,
            category_id,
            publish_from: OffsetDateTime::now_utc(),
            priority_from: None,
            priority_to: None,
            priority_value: None,
            remove: false,
            commercial: false,
            hidden: false,
        };
        ListingsRepo::upsert(&store, listing.clone())
            .await
            .expect("insert");

        // Same pair under a fresh id is rejected; re-saving the row is not.
        let second = ListingRecord {
            id: Uuid::new_v4(),
            ..listing.clone()
        };
        let err = ListingsRepo::upsert(&store, second).await.expect_err("duplicate pair");
        assert!(matches!(err, RepoError::Duplicate { .. }));
        ListingsRepo::upsert(&store, listing).await.expect("resave");
    }

    #[tokio::test]
    async fn dependency_pairs_are_unique() {
        let store = MemoryStore::new();
        let source = ContentRef::new(ContentKind::Article, Uuid::new_v4());
        let target = ContentRef::new(ContentKind::Poll, Uuid::new_v4());

        let dependency = DependencyRecord {
            id: Uuid::new_v4(),
            source,
            source_key: source.to_string(),
            target,
            target_key: target.to_string(),
        };
        store
            .insert_dependency(dependency.clone())
            .await
            .expect("insert");

        let duplicate = DependencyRecord {
            id: Uuid::new_v4(),
            ..dependency
        };
        let err = store
            .insert_dependency(duplicate)
            .await
            .expect_err("duplicate pair");
        assert!(matches!(err, RepoError::Duplicate { .. }));
    }

    #[tokio::test]
    async fn add_vote_increments_one_row() {
        let store = MemoryStore::new();
        let choice = ChoiceRecord {
            id: Uuid::new_v4(),
            poll_id: Uuid::new_v4(),
            choice: "yes".into(),
            points: 1,
            votes: 0,
        };
        store.upsert_choice(choice.clone()).await.expect("insert");

        let updated = store.add_vote(choice.id).await.expect("vote");
        assert_eq!(updated.votes, 1);

        let missing = store.add_vote(Uuid::new_v4()).await;
        assert!(matches!(missing, Err(RepoError::NotFound)));
    }
}
