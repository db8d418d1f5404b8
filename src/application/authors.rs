//! Author registration on behalf of the external identity provider.

use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use crate::application::repos::{AuthorsRepo, AuthorsWriteRepo, RepoError};
use crate::domain::entities::AuthorRecord;

const SOURCE: &str = "yatube::application::authors";
const MAX_USERNAME_LEN: usize = 150;

#[derive(Debug, Error)]
pub enum AuthorError {
    #[error("{0}")]
    Validation(String),
    #[error("username `{0}` is already taken")]
    DuplicateUsername(String),
    #[error("author `{0}` does not exist")]
    UnknownAuthor(String),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Clone)]
pub struct AuthorService {
    reader: Arc<dyn AuthorsRepo>,
    writer: Arc<dyn AuthorsWriteRepo>,
}

impl AuthorService {
    pub fn new(reader: Arc<dyn AuthorsRepo>, writer: Arc<dyn AuthorsWriteRepo>) -> Self {
        Self { reader, writer }
    }

    pub async fn find(&self, username: &str) -> Result<Option<AuthorRecord>, AuthorError> {
        Ok(self.reader.find_by_username(username).await?)
    }

    pub async fn register(&self, username: &str) -> Result<AuthorRecord, AuthorError> {
        let username = validate_username(username)?;
        if self.reader.find_by_username(&username).await?.is_some() {
            return Err(AuthorError::DuplicateUsername(username));
        }
        let author = self
            .writer
            .create_author(&username)
            .await
            .map_err(|err| match err {
                RepoError::Duplicate { .. } => AuthorError::DuplicateUsername(username.clone()),
                other => AuthorError::Repo(other),
            })?;
        info!(target = SOURCE, username = %author.username, "author registered");
        Ok(author)
    }

    /// Remove an author with everything they wrote and every follow edge
    /// touching them.
    pub async fn remove(&self, username: &str) -> Result<AuthorRecord, AuthorError> {
        let author = self
            .reader
            .find_by_username(username.trim())
            .await?
            .ok_or_else(|| AuthorError::UnknownAuthor(username.to_string()))?;
        self.writer.delete_author(author.id).await?;
        info!(target = SOURCE, username = %author.username, "author removed");
        Ok(author)
    }
}

fn validate_username(raw: &str) -> Result<String, AuthorError> {
    let username = raw.trim();
    if username.is_empty() {
        return Err(AuthorError::Validation("username must not be empty".into()));
    }
    if username.chars().count() > MAX_USERNAME_LEN {
        return Err(AuthorError::Validation(format!(
            "username exceeds {MAX_USERNAME_LEN} characters"
        )));
    }
    if !username
        .chars()
        .all(|ch| ch.is_alphanumeric() || matches!(ch, '.' | '@' | '+' | '-' | '_'))
    {
        return Err(AuthorError::Validation(
            "username may contain only letters, digits and @.+-_".into(),
        ));
    }
    Ok(username.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::memory::MemoryStore;
    use crate::application::repos::{PostListScope, PostsRepo};

    fn service(store: &MemoryStore) -> AuthorService {
        let store = Arc::new(store.clone());
        AuthorService::new(store.clone(), store)
    }

    #[tokio::test]
    async fn register_trims_and_rejects_duplicates() {
        let store = MemoryStore::new();
        let authors = service(&store);

        let alice = authors.register("  alice ").await.expect("registered");
        assert_eq!(alice.username, "alice");

        let err = authors.register("alice").await.expect_err("duplicate");
        assert!(matches!(err, AuthorError::DuplicateUsername(_)));
    }

    #[tokio::test]
    async fn register_validates_characters() {
        let store = MemoryStore::new();
        let authors = service(&store);

        assert!(matches!(
            authors.register("   ").await,
            Err(AuthorError::Validation(_))
        ));
        assert!(matches!(
            authors.register("bad name").await,
            Err(AuthorError::Validation(_))
        ));
        assert!(authors.register("leo.tolstoy").await.is_ok());
    }

    #[tokio::test]
    async fn removing_an_author_cascades() {
        let store = MemoryStore::new();
        let alice = store.add_author("alice");
        let bob = store.add_author("bob");
        store.add_post(&alice, "hello", None);
        store.add_follow(&bob, &alice);
        store.add_follow(&alice, &bob);

        service(&store).remove("alice").await.expect("removed");

        assert_eq!(store.follow_count(), 0);
        assert_eq!(
            store.count_posts(PostListScope::Author(alice.id)).await.unwrap(),
            0
        );
    }
}
