//! URL routing collaborator.
//!
//! Services only name a [`Route`] and its parameters; turning that into a
//! URL string belongs to a [`UrlRouter`]. [`PathRouter`] is the built-in
//! path-only implementation.

/// Named routes the core resolves URLs against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// The site root, served by the root category.
    Homepage,
    /// Listing page of a non-root category.
    CategoryDetail { tree_path: String },
    /// Object detail under a non-root category.
    ObjectDetail {
        category_path: String,
        year: i32,
        month: u8,
        day: u8,
        content_type: String,
        slug: String,
    },
    /// Object detail whose main category is the site root; the category
    /// path segment is omitted.
    HomeObjectDetail {
        year: i32,
        month: u8,
        day: u8,
        content_type: String,
        slug: String,
    },
}

pub trait UrlRouter: Send + Sync {
    fn url_for(&self, route: &Route) -> String;
}

/// Default router emitting site-relative paths with a trailing slash.
#[derive(Debug, Default, Clone, Copy)]
pub struct PathRouter;

impl UrlRouter for PathRouter {
    fn url_for(&self, route: &Route) -> String {
        match route {
            Route::Homepage => "/".to_string(),
            Route::CategoryDetail { tree_path } => format!("/{tree_path}/"),
            Route::ObjectDetail {
                category_path,
                year,
                month,
                day,
                content_type,
                slug,
            } => format!("/{category_path}/{year}/{month:02}/{day:02}/{content_type}/{slug}/"),
            Route::HomeObjectDetail {
                year,
                month,
                day,
                content_type,
                slug,
            } => format!("/{year}/{month:02}/{day:02}/{content_type}/{slug}/"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_detail_zero_pads_dates() {
        let url = PathRouter.url_for(&Route::ObjectDetail {
            category_path: "news/sports".into(),
            year: 2026,
            month: 3,
            day: 7,
            content_type: "articles".into(),
            slug: "derby-report".into(),
        });
        assert_eq!(url, "/news/sports/2026/03/07/articles/derby-report/");
    }

    #[test]
    fn home_object_detail_omits_category_segment() {
        let url = PathRouter.url_for(&Route::HomeObjectDetail {
            year: 2026,
            month: 11,
            day: 23,
            content_type: "articles".into(),
            slug: "welcome".into(),
        });
        assert_eq!(url, "/2026/11/23/articles/welcome/");
    }

    #[test]
    fn category_routes() {
        assert_eq!(PathRouter.url_for(&Route::Homepage), "/");
        assert_eq!(
            PathRouter.url_for(&Route::CategoryDetail {
                tree_path: "news".into()
            }),
            "/news/"
        );
    }
}
