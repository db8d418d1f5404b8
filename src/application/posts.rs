//! Post detail pages and owner-scoped writes for posts and comments.

use std::sync::Arc;

use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::application::repos::{
    CommentsRepo, CommentsWriteRepo, CreateCommentParams, CreatePostParams, GroupsRepo,
    PostListScope, PostsRepo, PostsWriteRepo, RepoError, UpdatePostParams,
};
use crate::domain::entities::{AuthorRecord, CommentRecord, GroupRecord, PostRecord};
use crate::domain::error::DomainError;
use crate::domain::posts::{PostDraft, normalize_text};

const SOURCE: &str = "yatube::application::posts";

#[derive(Debug, Error)]
pub enum PostError {
    #[error("{entity} not found")]
    NotFound { entity: &'static str },
    /// The viewer tried to change content written by someone else.
    #[error("only the author may change this {entity}")]
    NotOwner { entity: &'static str, post_id: Uuid },
    #[error("{0}")]
    Validation(String),
    #[error("selected group does not exist")]
    UnknownGroup,
    #[error(transparent)]
    Repo(#[from] RepoError),
}

impl From<DomainError> for PostError {
    fn from(error: DomainError) -> Self {
        match error {
            DomainError::NotFound { entity } => PostError::NotFound { entity },
            DomainError::Validation { message } | DomainError::InvalidOperation { message } => {
                PostError::Validation(message)
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct PostDetail {
    pub post: PostRecord,
    /// Newest first.
    pub comments: Vec<CommentRecord>,
    pub author_post_count: u64,
}

#[derive(Clone)]
pub struct PostService {
    posts: Arc<dyn PostsRepo>,
    posts_writer: Arc<dyn PostsWriteRepo>,
    comments: Arc<dyn CommentsRepo>,
    comments_writer: Arc<dyn CommentsWriteRepo>,
    groups: Arc<dyn GroupsRepo>,
}

impl PostService {
    pub fn new(
        posts: Arc<dyn PostsRepo>,
        posts_writer: Arc<dyn PostsWriteRepo>,
        comments: Arc<dyn CommentsRepo>,
        comments_writer: Arc<dyn CommentsWriteRepo>,
        groups: Arc<dyn GroupsRepo>,
    ) -> Self {
        Self {
            posts,
            posts_writer,
            comments,
            comments_writer,
            groups,
        }
    }

    pub async fn post_detail(&self, id: Uuid) -> Result<PostDetail, PostError> {
        let post = self.find_post(id).await?;
        let comments = self.comments.list_for_post(post.id).await?;
        let author_post_count = self
            .posts
            .count_posts(PostListScope::Author(post.author_id))
            .await?;
        Ok(PostDetail {
            post,
            comments,
            author_post_count,
        })
    }

    /// Groups offered by the post form.
    pub async fn list_groups(&self) -> Result<Vec<GroupRecord>, PostError> {
        Ok(self.groups.list_groups().await?)
    }

    pub async fn create_post(
        &self,
        viewer: &AuthorRecord,
        draft: PostDraft,
    ) -> Result<PostRecord, PostError> {
        let draft = draft.normalize()?;
        self.ensure_group(draft.group_id).await?;

        let post = self
            .posts_writer
            .create_post(CreatePostParams {
                author_id: viewer.id,
                text: draft.text,
                group_id: draft.group_id,
                image: draft.image,
            })
            .await?;
        info!(
            target = SOURCE,
            post_id = %post.id,
            author = %viewer.username,
            "post created"
        );
        Ok(post)
    }

    /// Load a post the viewer is allowed to edit.
    pub async fn load_for_edit(
        &self,
        viewer: &AuthorRecord,
        id: Uuid,
    ) -> Result<PostRecord, PostError> {
        let post = self.find_post(id).await?;
        ensure_post_owner(viewer, &post)?;
        Ok(post)
    }

    pub async fn edit_post(
        &self,
        viewer: &AuthorRecord,
        id: Uuid,
        draft: PostDraft,
    ) -> Result<PostRecord, PostError> {
        let existing = self.load_for_edit(viewer, id).await?;
        let draft = draft.normalize()?;
        self.ensure_group(draft.group_id).await?;

        let post = self
            .posts_writer
            .update_post(UpdatePostParams {
                id: existing.id,
                text: draft.text,
                group_id: draft.group_id,
                image: draft.image,
            })
            .await?;
        info!(target = SOURCE, post_id = %post.id, "post updated");
        Ok(post)
    }

    pub async fn delete_post(&self, viewer: &AuthorRecord, id: Uuid) -> Result<(), PostError> {
        let existing = self.load_for_edit(viewer, id).await?;
        self.posts_writer.delete_post(existing.id).await?;
        info!(target = SOURCE, post_id = %existing.id, "post deleted");
        Ok(())
    }

    pub async fn add_comment(
        &self,
        viewer: &AuthorRecord,
        post_id: Uuid,
        text: &str,
    ) -> Result<CommentRecord, PostError> {
        let post = self.find_post(post_id).await?;
        let text = normalize_text(text, "comment text")?;
        let comment = self
            .comments_writer
            .create_comment(CreateCommentParams {
                post_id: post.id,
                author_id: viewer.id,
                text,
            })
            .await?;
        info!(
            target = SOURCE,
            post_id = %post.id,
            comment_id = %comment.id,
            "comment added"
        );
        Ok(comment)
    }

    pub async fn edit_comment(
        &self,
        viewer: &AuthorRecord,
        comment_id: Uuid,
        text: &str,
    ) -> Result<CommentRecord, PostError> {
        let comment = self.find_owned_comment(viewer, comment_id).await?;
        let text = normalize_text(text, "comment text")?;
        let updated = self.comments_writer.update_comment(comment.id, &text).await?;
        info!(target = SOURCE, comment_id = %updated.id, "comment updated");
        Ok(updated)
    }

    /// Delete a comment and return the post it belonged to.
    pub async fn delete_comment(
        &self,
        viewer: &AuthorRecord,
        comment_id: Uuid,
    ) -> Result<Uuid, PostError> {
        let comment = self.find_owned_comment(viewer, comment_id).await?;
        self.comments_writer.delete_comment(comment.id).await?;
        info!(target = SOURCE, comment_id = %comment.id, "comment deleted");
        Ok(comment.post_id)
    }

    async fn find_post(&self, id: Uuid) -> Result<PostRecord, PostError> {
        self.posts
            .find_by_id(id)
            .await?
            .ok_or(PostError::NotFound { entity: "post" })
    }

    async fn find_owned_comment(
        &self,
        viewer: &AuthorRecord,
        comment_id: Uuid,
    ) -> Result<CommentRecord, PostError> {
        let comment = self
            .comments
            .find_by_id(comment_id)
            .await?
            .ok_or(PostError::NotFound { entity: "comment" })?;
        if comment.author_id != viewer.id {
            return Err(PostError::NotOwner {
                entity: "comment",
                post_id: comment.post_id,
            });
        }
        Ok(comment)
    }

    async fn ensure_group(&self, group_id: Option<Uuid>) -> Result<(), PostError> {
        match group_id {
            Some(id) => match self.groups.find_by_id(id).await? {
                Some(_) => Ok(()),
                None => Err(PostError::UnknownGroup),
            },
            None => Ok(()),
        }
    }
}

fn ensure_post_owner(viewer: &AuthorRecord, post: &PostRecord) -> Result<(), PostError> {
    if post.author_id != viewer.id {
        return Err(PostError::NotOwner {
            entity: "post",
            post_id: post.id,
        });
    }
    Ok(())
}
