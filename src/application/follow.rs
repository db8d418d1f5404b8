//! Follow graph management: directed author-to-author subscriptions.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

use crate::application::repos::{AuthorsRepo, FollowsRepo, FollowsWriteRepo, RepoError};
use crate::domain::entities::{AuthorRecord, FollowRecord};
use crate::domain::follows::ensure_not_self;

const SOURCE: &str = "yatube::application::follow";

#[derive(Debug, Error)]
pub enum FollowError {
    #[error("an author cannot follow themselves")]
    SelfFollow,
    #[error("author `{0}` does not exist")]
    UnknownAuthor(String),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

/// Follower and following totals for a profile.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FollowCounts {
    pub followers: u64,
    pub following: u64,
}

#[derive(Clone)]
pub struct FollowService {
    authors: Arc<dyn AuthorsRepo>,
    reader: Arc<dyn FollowsRepo>,
    writer: Arc<dyn FollowsWriteRepo>,
}

impl FollowService {
    pub fn new(
        authors: Arc<dyn AuthorsRepo>,
        reader: Arc<dyn FollowsRepo>,
        writer: Arc<dyn FollowsWriteRepo>,
    ) -> Self {
        Self {
            authors,
            reader,
            writer,
        }
    }

    /// Subscribe `viewer` to the author named `username`.
    ///
    /// Following an author twice returns the existing edge.
    pub async fn follow(
        &self,
        viewer: &AuthorRecord,
        username: &str,
    ) -> Result<FollowRecord, FollowError> {
        let target = self.resolve(username).await?;
        ensure_not_self(viewer.id, target.id).map_err(|_| FollowError::SelfFollow)?;

        if let Some(existing) = self.reader.find_follow(viewer.id, target.id).await? {
            debug!(
                target = SOURCE,
                follower = %viewer.username,
                author = %target.username,
                "follow edge already present"
            );
            return Ok(existing);
        }

        let edge = self.writer.insert_follow(viewer.id, target.id).await?;
        info!(
            target = SOURCE,
            follower = %viewer.username,
            author = %target.username,
            "author followed"
        );
        Ok(edge)
    }

    /// Remove the subscription if it exists. Unfollowing twice is not an error.
    pub async fn unfollow(&self, viewer: &AuthorRecord, username: &str) -> Result<(), FollowError> {
        let target = self.resolve(username).await?;
        let removed = self.writer.delete_follow(viewer.id, target.id).await?;
        if removed {
            info!(
                target = SOURCE,
                follower = %viewer.username,
                author = %target.username,
                "author unfollowed"
            );
        }
        Ok(())
    }

    pub async fn is_following(&self, follower_id: Uuid, author_id: Uuid) -> Result<bool, FollowError> {
        Ok(self
            .reader
            .find_follow(follower_id, author_id)
            .await?
            .is_some())
    }

    pub async fn counts(&self, author_id: Uuid) -> Result<FollowCounts, FollowError> {
        let followers = self.reader.count_followers(author_id).await?;
        let following = self.reader.count_following(author_id).await?;
        Ok(FollowCounts {
            followers,
            following,
        })
    }

    async fn resolve(&self, username: &str) -> Result<AuthorRecord, FollowError> {
        self.authors
            .find_by_username(username)
            .await?
            .ok_or_else(|| FollowError::UnknownAuthor(username.to_string()))
    }
}
