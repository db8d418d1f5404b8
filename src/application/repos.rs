//! Repository traits describing persistence adapters.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::application::pagination::PageWindow;
use crate::domain::entities::{
    AuthorRecord, CommentRecord, FollowRecord, GroupRecord, PostRecord,
};

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("duplicate record violates unique constraint `{constraint}`")]
    Duplicate { constraint: String },
    #[error("resource not found")]
    NotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("integrity error: {message}")]
    Integrity { message: String },
    #[error("database timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

/// Which posts a listing covers. Every scope is ordered newest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostListScope {
    All,
    Group(Uuid),
    Author(Uuid),
    /// Posts written by anyone the given author follows.
    FollowedBy(Uuid),
}

#[async_trait]
pub trait AuthorsRepo: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<AuthorRecord>, RepoError>;

    async fn find_by_username(&self, username: &str) -> Result<Option<AuthorRecord>, RepoError>;
}

#[async_trait]
pub trait AuthorsWriteRepo: Send + Sync {
    async fn create_author(&self, username: &str) -> Result<AuthorRecord, RepoError>;

    /// Removing an author also removes their posts, comments and follow edges.
    async fn delete_author(&self, id: Uuid) -> Result<(), RepoError>;
}

#[derive(Debug, Clone)]
pub struct CreateGroupParams {
    pub slug: String,
    pub title: String,
    pub description: String,
}

#[async_trait]
pub trait GroupsRepo: Send + Sync {
    async fn list_groups(&self) -> Result<Vec<GroupRecord>, RepoError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<GroupRecord>, RepoError>;

    async fn find_by_slug(&self, slug: &str) -> Result<Option<GroupRecord>, RepoError>;
}

#[async_trait]
pub trait GroupsWriteRepo: Send + Sync {
    async fn create_group(&self, params: CreateGroupParams) -> Result<GroupRecord, RepoError>;

    /// Posts filed under the group survive with their group cleared.
    async fn delete_group(&self, id: Uuid) -> Result<(), RepoError>;
}

#[derive(Debug, Clone)]
pub struct CreatePostParams {
    pub author_id: Uuid,
    pub text: String,
    pub group_id: Option<Uuid>,
    pub image: Option<String>,
}

#[derive(Debug, Clone)]
pub struct UpdatePostParams {
    pub id: Uuid,
    pub text: String,
    pub group_id: Option<Uuid>,
    pub image: Option<String>,
}

#[async_trait]
pub trait PostsRepo: Send + Sync {
    async fn list_posts(
        &self,
        scope: PostListScope,
        window: PageWindow,
    ) -> Result<Vec<PostRecord>, RepoError>;

    async fn count_posts(&self, scope: PostListScope) -> Result<u64, RepoError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<PostRecord>, RepoError>;
}

#[async_trait]
pub trait PostsWriteRepo: Send + Sync {
    async fn create_post(&self, params: CreatePostParams) -> Result<PostRecord, RepoError>;

    async fn update_post(&self, params: UpdatePostParams) -> Result<PostRecord, RepoError>;

    /// Comments on the post are removed with it.
    async fn delete_post(&self, id: Uuid) -> Result<(), RepoError>;
}

#[derive(Debug, Clone)]
pub struct CreateCommentParams {
    pub post_id: Uuid,
    pub author_id: Uuid,
    pub text: String,
}

#[async_trait]
pub trait CommentsRepo: Send + Sync {
    /// Comments of a post, newest first.
    async fn list_for_post(&self, post_id: Uuid) -> Result<Vec<CommentRecord>, RepoError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<CommentRecord>, RepoError>;
}

#[async_trait]
pub trait CommentsWriteRepo: Send + Sync {
    async fn create_comment(&self, params: CreateCommentParams)
    -> Result<CommentRecord, RepoError>;

    async fn update_comment(&self, id: Uuid, text: &str) -> Result<CommentRecord, RepoError>;

    async fn delete_comment(&self, id: Uuid) -> Result<(), RepoError>;
}

#[async_trait]
pub trait FollowsRepo: Send + Sync {
    async fn find_follow(
        &self,
        follower_id: Uuid,
        author_id: Uuid,
    ) -> Result<Option<FollowRecord>, RepoError>;

    async fn count_following(&self, follower_id: Uuid) -> Result<u64, RepoError>;

    async fn count_followers(&self, author_id: Uuid) -> Result<u64, RepoError>;
}

#[async_trait]
pub trait FollowsWriteRepo: Send + Sync {
    /// Insert the edge unless it already exists and return the surviving row.
    ///
    /// Implementations must stay correct under concurrent calls for the same
    /// pair: exactly one edge is stored and every caller receives it.
    async fn insert_follow(
        &self,
        follower_id: Uuid,
        author_id: Uuid,
    ) -> Result<FollowRecord, RepoError>;

    /// Remove the edge if present. Returns whether a row was deleted.
    async fn delete_follow(&self, follower_id: Uuid, author_id: Uuid) -> Result<bool, RepoError>;
}
