//! Group registration and removal.

use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use crate::application::repos::{CreateGroupParams, GroupsRepo, GroupsWriteRepo, RepoError};
use crate::domain::entities::GroupRecord;
use crate::domain::posts::normalize_text;
use crate::domain::slug::{SlugAsyncError, SlugError, generate_unique_slug_async, is_canonical};

const SOURCE: &str = "yatube::application::groups";

#[derive(Debug, Error)]
pub enum GroupError {
    #[error("{0}")]
    Validation(String),
    #[error("group slug `{0}` is already taken")]
    DuplicateSlug(String),
    #[error("group `{0}` does not exist")]
    UnknownGroup(String),
    #[error(transparent)]
    Slug(#[from] SlugError),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

impl From<SlugAsyncError<RepoError>> for GroupError {
    fn from(error: SlugAsyncError<RepoError>) -> Self {
        match error {
            SlugAsyncError::Slug(err) => GroupError::Slug(err),
            SlugAsyncError::Predicate(err) => GroupError::Repo(err),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct GroupDraft {
    pub title: String,
    /// Derived from the title when absent.
    pub slug: Option<String>,
    pub description: String,
}

#[derive(Clone)]
pub struct GroupService {
    reader: Arc<dyn GroupsRepo>,
    writer: Arc<dyn GroupsWriteRepo>,
}

impl GroupService {
    pub fn new(reader: Arc<dyn GroupsRepo>, writer: Arc<dyn GroupsWriteRepo>) -> Self {
        Self { reader, writer }
    }

    pub async fn list_groups(&self) -> Result<Vec<GroupRecord>, GroupError> {
        Ok(self.reader.list_groups().await?)
    }

    pub async fn create_group(&self, draft: GroupDraft) -> Result<GroupRecord, GroupError> {
        let title = normalize_text(&draft.title, "group title")
            .map_err(|err| GroupError::Validation(err.to_string()))?;

        let slug = match draft.slug.map(|slug| slug.trim().to_string()) {
            Some(slug) if !slug.is_empty() => {
                if !is_canonical(&slug) {
                    return Err(GroupError::Validation(format!(
                        "`{slug}` is not a valid slug"
                    )));
                }
                if self.reader.find_by_slug(&slug).await?.is_some() {
                    return Err(GroupError::DuplicateSlug(slug));
                }
                slug
            }
            _ => {
                let reader = self.reader.clone();
                generate_unique_slug_async(&title, move |candidate| {
                    let reader = reader.clone();
                    let candidate = candidate.to_string();
                    async move {
                        let existing = reader.find_by_slug(&candidate).await?;
                        Ok::<bool, RepoError>(existing.is_none())
                    }
                })
                .await?
            }
        };

        let group = self
            .writer
            .create_group(CreateGroupParams {
                slug: slug.clone(),
                title,
                description: draft.description.trim().to_string(),
            })
            .await
            .map_err(|err| match err {
                RepoError::Duplicate { .. } => GroupError::DuplicateSlug(slug),
                other => GroupError::Repo(other),
            })?;
        info!(target = SOURCE, slug = %group.slug, "group created");
        Ok(group)
    }

    /// Delete a group; its posts stay published without a group.
    pub async fn delete_group(&self, slug: &str) -> Result<GroupRecord, GroupError> {
        let group = self
            .reader
            .find_by_slug(slug)
            .await?
            .ok_or_else(|| GroupError::UnknownGroup(slug.to_string()))?;
        self.writer.delete_group(group.id).await?;
        info!(target = SOURCE, slug = %group.slug, "group deleted");
        Ok(group)
    }
}
