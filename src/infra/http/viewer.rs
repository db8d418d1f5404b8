//! Viewer resolution from the header set by the upstream auth proxy.

use axum::{
    extract::FromRequestParts,
    http::request::Parts,
    response::{IntoResponse, Redirect, Response},
};
use tracing::{debug, warn};

use crate::application::error::repo_error_to_http;
use crate::domain::entities::AuthorRecord;

use super::HttpState;

const SOURCE: &str = "yatube::http::viewer";

/// The signed-in author, if any. Unknown usernames resolve to anonymous.
#[derive(Debug, Clone)]
pub struct CurrentViewer(pub Option<AuthorRecord>);

/// A signed-in author; anonymous requests are redirected to the login page.
#[derive(Debug, Clone)]
pub struct RequiredViewer(pub AuthorRecord);

impl FromRequestParts<HttpState> for CurrentViewer {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &HttpState,
    ) -> Result<Self, Self::Rejection> {
        if let Some(viewer) = parts.extensions.get::<CurrentViewer>() {
            return Ok(viewer.clone());
        }

        let username = parts
            .headers
            .get(&state.auth.viewer_header)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty());

        let viewer = match username {
            Some(username) => match state.authors.find_by_username(username).await {
                Ok(Some(author)) => Some(author),
                Ok(None) => {
                    debug!(target = SOURCE, username, "viewer header names an unknown author");
                    None
                }
                Err(err) => {
                    warn!(target = SOURCE, error = %err, "failed to resolve viewer");
                    return Err(repo_error_to_http(SOURCE, &err).into_response());
                }
            },
            None => None,
        };

        let viewer = CurrentViewer(viewer);
        parts.extensions.insert(viewer.clone());
        Ok(viewer)
    }
}

impl FromRequestParts<HttpState> for RequiredViewer {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &HttpState,
    ) -> Result<Self, Self::Rejection> {
        let CurrentViewer(viewer) = CurrentViewer::from_request_parts(parts, state).await?;
        match viewer {
            Some(author) => Ok(RequiredViewer(author)),
            None => {
                let next = parts
                    .uri
                    .path_and_query()
                    .map(|value| value.as_str())
                    .unwrap_or("/");
                Err(Redirect::to(&login_redirect(&state.auth.login_url, next)).into_response())
            }
        }
    }
}

/// Build `login_url?next=<path>`, appending to an existing query if present.
pub fn login_redirect(login_url: &str, next: &str) -> String {
    let query = url::form_urlencoded::Serializer::new(String::new())
        .append_pair("next", next)
        .finish();
    let separator = if login_url.contains('?') { '&' } else { '?' };
    format!("{login_url}{separator}{query}")
}
