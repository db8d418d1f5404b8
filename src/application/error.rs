use std::error::Error as StdError;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::{
    application::{
        authors::AuthorError, feed::FeedError, follow::FollowError, groups::GroupError,
        posts::PostError, repos::RepoError,
    },
    infra::error::InfraError,
};

#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub source: &'static str,
    pub status: StatusCode,
    pub messages: Vec<String>,
}

impl ErrorReport {
    pub fn from_error(source: &'static str, status: StatusCode, error: &dyn StdError) -> Self {
        let mut messages = Vec::new();
        messages.push(error.to_string());
        let mut current = error.source();
        while let Some(inner) = current {
            messages.push(inner.to_string());
            current = inner.source();
        }
        Self {
            source,
            status,
            messages,
        }
    }

    pub fn from_message(
        source: &'static str,
        status: StatusCode,
        message: impl Into<String>,
    ) -> Self {
        Self {
            source,
            status,
            messages: vec![message.into()],
        }
    }

    pub fn attach(self, response: &mut Response) {
        response.extensions_mut().insert(self);
    }
}

#[derive(Debug)]
pub struct HttpError {
    status: StatusCode,
    public_message: &'static str,
    report: ErrorReport,
}

impl HttpError {
    pub fn from_error(
        source: &'static str,
        status: StatusCode,
        public_message: &'static str,
        error: &dyn StdError,
    ) -> Self {
        let report = ErrorReport::from_error(source, status, error);
        Self {
            status,
            public_message,
            report,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn public_message(&self) -> &'static str {
        self.public_message
    }

    pub fn into_report(self) -> ErrorReport {
        self.report
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let mut response = (self.status, self.public_message).into_response();
        self.report.attach(&mut response);
        response
    }
}

/// Map a repository error to a consistent HTTP error.
pub fn repo_error_to_http(source: &'static str, err: &RepoError) -> HttpError {
    let (status, message) = match err {
        RepoError::Timeout => (StatusCode::SERVICE_UNAVAILABLE, "Database timeout"),
        RepoError::NotFound => (StatusCode::NOT_FOUND, "Resource not found"),
        RepoError::Duplicate { .. } | RepoError::Integrity { .. } => {
            (StatusCode::CONFLICT, "Conflicting change")
        }
        RepoError::InvalidInput { .. } => (StatusCode::BAD_REQUEST, "Invalid input"),
        RepoError::Persistence(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error"),
    };
    HttpError::from_error(source, status, message, err)
}

impl From<FeedError> for HttpError {
    fn from(error: FeedError) -> Self {
        const SOURCE: &str = "application::error::feed_error_to_http_error";
        match error {
            FeedError::UnknownGroup(_) => HttpError::from_error(
                SOURCE,
                StatusCode::NOT_FOUND,
                "Unknown group",
                &error,
            ),
            FeedError::UnknownAuthor(_) => HttpError::from_error(
                SOURCE,
                StatusCode::NOT_FOUND,
                "Unknown author",
                &error,
            ),
            FeedError::Repo(err) => repo_error_to_http(SOURCE, &err),
        }
    }
}

impl From<FollowError> for HttpError {
    fn from(error: FollowError) -> Self {
        const SOURCE: &str = "application::error::follow_error_to_http_error";
        match error {
            FollowError::SelfFollow => HttpError::from_error(
                SOURCE,
                StatusCode::BAD_REQUEST,
                "You cannot follow yourself",
                &error,
            ),
            FollowError::UnknownAuthor(_) => HttpError::from_error(
                SOURCE,
                StatusCode::NOT_FOUND,
                "Unknown author",
                &error,
            ),
            FollowError::Repo(err) => repo_error_to_http(SOURCE, &err),
        }
    }
}

impl From<PostError> for HttpError {
    fn from(error: PostError) -> Self {
        const SOURCE: &str = "application::error::post_error_to_http_error";
        match error {
            PostError::NotFound { .. } => HttpError::from_error(
                SOURCE,
                StatusCode::NOT_FOUND,
                "Resource not found",
                &error,
            ),
            PostError::NotOwner { .. } => HttpError::from_error(
                SOURCE,
                StatusCode::FORBIDDEN,
                "Only the author may change this",
                &error,
            ),
            PostError::Validation(_) | PostError::UnknownGroup => HttpError::from_error(
                SOURCE,
                StatusCode::UNPROCESSABLE_ENTITY,
                "Request could not be processed",
                &error,
            ),
            PostError::Repo(err) => repo_error_to_http(SOURCE, &err),
        }
    }
}

/// Failure surfaced by the binary before it exits non-zero.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error(transparent)]
    Author(#[from] AuthorError),
    #[error(transparent)]
    Group(#[from] GroupError),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn self_follow_maps_to_bad_request() {
        let error = HttpError::from(FollowError::SelfFollow);
        assert_eq!(error.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn report_collects_error_chain() {
        let error = FeedError::Repo(RepoError::Timeout);
        let http = HttpError::from(error);
        assert_eq!(http.status(), StatusCode::SERVICE_UNAVAILABLE);
        let report = http.into_report();
        assert_eq!(report.messages, vec!["database timeout".to_string()]);
    }

    #[test]
    fn attached_report_travels_with_response() {
        let response = HttpError::from(PostError::Validation("empty".into())).into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let report = response
            .extensions()
            .get::<ErrorReport>()
            .expect("report attached");
        assert_eq!(report.messages, vec!["empty".to_string()]);
    }

    #[test]
    fn app_error_shows_service_message_unchanged() {
        let error = AppError::from(GroupError::DuplicateSlug("travel".into()));
        assert_eq!(
            error.to_string(),
            GroupError::DuplicateSlug("travel".into()).to_string()
        );
        assert_eq!(
            AppError::unexpected("boom").to_string(),
            "unexpected error: boom"
        );
    }
}
