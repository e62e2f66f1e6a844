//! Application services: the operations the content core exposes, built
//! on the repositories and the object cache.

pub mod boxes;
pub mod categories;
pub mod error;
pub mod hits;
pub mod listings;
pub mod polls;
pub mod relations;
pub mod repos;
pub mod routing;

pub use boxes::{BoxContext, BoxParams, BoxService, Renderable};
pub use categories::CategoryService;
pub use error::AppError;
pub use hits::HitCountService;
pub use listings::ListingService;
pub use polls::PollService;
pub use relations::{Dependency, LazyRef, Related, RelationService};
pub use repos::{
    ArticlesRepo, CategoriesRepo, HitCountsRepo, ListingsRepo, PollsRepo, RelationsRepo,
    RepoError, Repos, SitesRepo,
};
pub use routing::{PathRouter, Route, UrlRouter};
