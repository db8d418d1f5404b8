mod forms;
mod middleware;
mod public;
mod viewer;

pub use public::build_router;
pub use viewer::{CurrentViewer, RequiredViewer, login_redirect};

use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use sqlx::Error as SqlxError;

use crate::application::error::ErrorReport;
use crate::application::feed::FeedService;
use crate::application::follow::FollowService;
use crate::application::posts::PostService;
use crate::application::repos::AuthorsRepo;
use crate::cache::PageCache;
use crate::config::AuthSettings;
use crate::infra::db::PostgresRepositories;

#[derive(Clone)]
pub struct HttpState {
    pub feed: Arc<FeedService>,
    pub follows: Arc<FollowService>,
    pub posts: Arc<PostService>,
    /// Resolves the viewer header to an author.
    pub authors: Arc<dyn AuthorsRepo>,
    pub auth: Arc<AuthSettings>,
    pub db: Arc<PostgresRepositories>,
    /// Home timeline cache; `None` when disabled.
    pub cache: Option<Arc<PageCache>>,
}

fn db_health_response(result: Result<(), SqlxError>) -> Response {
    match result {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => {
            let mut response = StatusCode::SERVICE_UNAVAILABLE.into_response();
            ErrorReport::from_error(
                "infra::http::db_health",
                StatusCode::SERVICE_UNAVAILABLE,
                &err,
            )
            .attach(&mut response);
            response
        }
    }
}
