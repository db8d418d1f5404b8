//! Paginated post listings: home timeline, group and profile pages, and the
//! personalised feed built from the viewer's follow set.

use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use crate::application::follow::FollowCounts;
use crate::application::pagination::{Page, PageNumber, Paginator};
use crate::application::repos::{
    AuthorsRepo, FollowsRepo, GroupsRepo, PostListScope, PostsRepo, RepoError,
};
use crate::domain::entities::{AuthorRecord, GroupRecord, PostRecord};

const SOURCE: &str = "yatube::application::feed";

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("group `{0}` does not exist")]
    UnknownGroup(String),
    #[error("author `{0}` does not exist")]
    UnknownAuthor(String),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Debug, Clone)]
pub struct GroupPage {
    pub group: GroupRecord,
    pub posts: Page<PostRecord>,
}

#[derive(Debug, Clone)]
pub struct ProfilePage {
    pub author: AuthorRecord,
    pub posts: Page<PostRecord>,
    pub counts: FollowCounts,
    /// Whether the viewer follows this author. Always false for anonymous viewers.
    pub following: bool,
}

#[derive(Clone)]
pub struct FeedService {
    posts: Arc<dyn PostsRepo>,
    groups: Arc<dyn GroupsRepo>,
    authors: Arc<dyn AuthorsRepo>,
    follows: Arc<dyn FollowsRepo>,
    paginator: Paginator,
}

impl FeedService {
    pub fn new(
        posts: Arc<dyn PostsRepo>,
        groups: Arc<dyn GroupsRepo>,
        authors: Arc<dyn AuthorsRepo>,
        follows: Arc<dyn FollowsRepo>,
        paginator: Paginator,
    ) -> Self {
        Self {
            posts,
            groups,
            authors,
            follows,
            paginator,
        }
    }

    pub fn paginator(&self) -> Paginator {
        self.paginator
    }

    /// Every post, newest first.
    pub async fn home_timeline(&self, page: PageNumber) -> Result<Page<PostRecord>, FeedError> {
        self.list(PostListScope::All, page).await
    }

    /// Posts by the authors `viewer` follows, newest first.
    ///
    /// A viewer who follows nobody gets an empty first page.
    pub async fn get_feed(
        &self,
        viewer: &AuthorRecord,
        page: PageNumber,
    ) -> Result<Page<PostRecord>, FeedError> {
        if self.follows.count_following(viewer.id).await? == 0 {
            debug!(
                target = SOURCE,
                viewer = %viewer.username,
                "viewer follows nobody; returning empty feed"
            );
            return Ok(Page::empty());
        }
        self.list(PostListScope::FollowedBy(viewer.id), page).await
    }

    pub async fn group_page(&self, slug: &str, page: PageNumber) -> Result<GroupPage, FeedError> {
        let group = self
            .groups
            .find_by_slug(slug)
            .await?
            .ok_or_else(|| FeedError::UnknownGroup(slug.to_string()))?;
        let posts = self.list(PostListScope::Group(group.id), page).await?;
        Ok(GroupPage { group, posts })
    }

    pub async fn profile_page(
        &self,
        username: &str,
        page: PageNumber,
        viewer: Option<&AuthorRecord>,
    ) -> Result<ProfilePage, FeedError> {
        let author = self
            .authors
            .find_by_username(username)
            .await?
            .ok_or_else(|| FeedError::UnknownAuthor(username.to_string()))?;
        let posts = self.list(PostListScope::Author(author.id), page).await?;
        let counts = FollowCounts {
            followers: self.follows.count_followers(author.id).await?,
            following: self.follows.count_following(author.id).await?,
        };
        let following = match viewer {
            Some(viewer) if viewer.id != author.id => self
                .follows
                .find_follow(viewer.id, author.id)
                .await?
                .is_some(),
            _ => false,
        };
        Ok(ProfilePage {
            author,
            posts,
            counts,
            following,
        })
    }

    async fn list(
        &self,
        scope: PostListScope,
        page: PageNumber,
    ) -> Result<Page<PostRecord>, FeedError> {
        let total = self.posts.count_posts(scope).await?;
        let window = self.paginator.window(total, page);
        let items = if total == 0 {
            Vec::new()
        } else {
            self.posts.list_posts(scope, window).await?
        };
        Ok(Page::new(items, window))
    }
}
