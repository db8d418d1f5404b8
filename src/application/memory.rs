//! In-memory repositories backing service and router tests.
//!
//! Foreign-key actions are emulated: deleting an author drops their posts,
//! comments and follow edges, deleting a post drops its comments, deleting a
//! group clears the group of its posts.

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use time::{Duration, OffsetDateTime, macros::datetime};
use uuid::Uuid;

use crate::application::pagination::PageWindow;
use crate::application::repos::{
    AuthorsRepo, AuthorsWriteRepo, CommentsRepo, CommentsWriteRepo, CreateCommentParams,
    CreateGroupParams, CreatePostParams, FollowsRepo, FollowsWriteRepo, GroupsRepo,
    GroupsWriteRepo, PostListScope, PostsRepo, PostsWriteRepo, RepoError, UpdatePostParams,
};
use crate::domain::entities::{
    AuthorRecord, CommentRecord, FollowRecord, GroupRecord, PostRecord,
};

#[derive(Debug, Clone)]
struct StoredPost {
    id: Uuid,
    author_id: Uuid,
    group_id: Option<Uuid>,
    text: String,
    image: Option<String>,
    created_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
struct StoredComment {
    id: Uuid,
    post_id: Uuid,
    author_id: Uuid,
    text: String,
    created_at: OffsetDateTime,
}

#[derive(Default)]
struct State {
    authors: Vec<AuthorRecord>,
    groups: Vec<GroupRecord>,
    posts: Vec<StoredPost>,
    comments: Vec<StoredComment>,
    follows: Vec<FollowRecord>,
    ticks: i64,
}

impl State {
    /// Strictly increasing timestamps keep newest-first ordering deterministic.
    fn next_timestamp(&mut self) -> OffsetDateTime {
        self.ticks += 1;
        datetime!(2024-01-01 00:00 UTC) + Duration::seconds(self.ticks)
    }

    fn author(&self, id: Uuid) -> Option<&AuthorRecord> {
        self.authors.iter().find(|author| author.id == id)
    }

    fn materialize_post(&self, post: &StoredPost) -> PostRecord {
        let group = post
            .group_id
            .and_then(|id| self.groups.iter().find(|group| group.id == id));
        PostRecord {
            id: post.id,
            author_id: post.author_id,
            author_username: self
                .author(post.author_id)
                .map(|author| author.username.clone())
                .unwrap_or_default(),
            group_id: group.map(|group| group.id),
            group_slug: group.map(|group| group.slug.clone()),
            group_title: group.map(|group| group.title.clone()),
            text: post.text.clone(),
            image: post.image.clone(),
            created_at: post.created_at,
        }
    }

    fn materialize_comment(&self, comment: &StoredComment) -> CommentRecord {
        CommentRecord {
            id: comment.id,
            post_id: comment.post_id,
            author_id: comment.author_id,
            author_username: self
                .author(comment.author_id)
                .map(|author| author.username.clone())
                .unwrap_or_default(),
            text: comment.text.clone(),
            created_at: comment.created_at,
        }
    }

    fn in_scope(&self, post: &StoredPost, scope: PostListScope) -> bool {
        match scope {
            PostListScope::All => true,
            PostListScope::Group(id) => post.group_id == Some(id),
            PostListScope::Author(id) => post.author_id == id,
            PostListScope::FollowedBy(follower) => self
                .follows
                .iter()
                .any(|edge| edge.follower_id == follower && edge.author_id == post.author_id),
        }
    }
}

#[derive(Default, Clone)]
pub(crate) struct MemoryStore {
    state: Arc<Mutex<State>>,
}

impl MemoryStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    pub(crate) fn add_author(&self, username: &str) -> AuthorRecord {
        let mut state = self.lock();
        let record = AuthorRecord {
            id: Uuid::new_v4(),
            username: username.to_string(),
            created_at: state.next_timestamp(),
        };
        state.authors.push(record.clone());
        record
    }

    pub(crate) fn add_group(&self, slug: &str, title: &str) -> GroupRecord {
        let record = GroupRecord {
            id: Uuid::new_v4(),
            slug: slug.to_string(),
            title: title.to_string(),
            description: String::new(),
        };
        self.lock().groups.push(record.clone());
        record
    }

    pub(crate) fn add_post(
        &self,
        author: &AuthorRecord,
        text: &str,
        group: Option<&GroupRecord>,
    ) -> PostRecord {
        let mut state = self.lock();
        let post = StoredPost {
            id: Uuid::now_v7(),
            author_id: author.id,
            group_id: group.map(|group| group.id),
            text: text.to_string(),
            image: None,
            created_at: state.next_timestamp(),
        };
        state.posts.push(post.clone());
        state.materialize_post(&post)
    }

    pub(crate) fn add_follow(&self, follower: &AuthorRecord, author: &AuthorRecord) {
        let mut state = self.lock();
        let edge = FollowRecord {
            id: Uuid::new_v4(),
            follower_id: follower.id,
            author_id: author.id,
            created_at: state.next_timestamp(),
        };
        state.follows.push(edge);
    }

    pub(crate) fn follow_count(&self) -> usize {
        self.lock().follows.len()
    }

    pub(crate) fn comment_count(&self) -> usize {
        self.lock().comments.len()
    }

    pub(crate) fn post_text(&self, id: Uuid) -> Option<String> {
        self.lock()
            .posts
            .iter()
            .find(|post| post.id == id)
            .map(|post| post.text.clone())
    }
}

#[async_trait]
impl AuthorsRepo for MemoryStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<AuthorRecord>, RepoError> {
        Ok(self.lock().author(id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<AuthorRecord>, RepoError> {
        Ok(self
            .lock()
            .authors
            .iter()
            .find(|author| author.username == username)
            .cloned())
    }
}

#[async_trait]
impl AuthorsWriteRepo for MemoryStore {
    async fn create_author(&self, username: &str) -> Result<AuthorRecord, RepoError> {
        if self
            .lock()
            .authors
            .iter()
            .any(|author| author.username == username)
        {
            return Err(RepoError::Duplicate {
                constraint: "authors_username_key".into(),
            });
        }
        Ok(self.add_author(username))
    }

    async fn delete_author(&self, id: Uuid) -> Result<(), RepoError> {
        let mut state = self.lock();
        let before = state.authors.len();
        state.authors.retain(|author| author.id != id);
        if state.authors.len() == before {
            return Err(RepoError::NotFound);
        }
        let removed_posts: Vec<Uuid> = state
            .posts
            .iter()
            .filter(|post| post.author_id == id)
            .map(|post| post.id)
            .collect();
        state.posts.retain(|post| post.author_id != id);
        state.comments.retain(|comment| {
            comment.author_id != id && !removed_posts.contains(&comment.post_id)
        });
        state
            .follows
            .retain(|edge| edge.follower_id != id && edge.author_id != id);
        Ok(())
    }
}

#[async_trait]
impl GroupsRepo for MemoryStore {
    async fn list_groups(&self) -> Result<Vec<GroupRecord>, RepoError> {
        let mut groups = self.lock().groups.clone();
        groups.sort_by(|a, b| a.title.cmp(&b.title));
        Ok(groups)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<GroupRecord>, RepoError> {
        Ok(self.lock().groups.iter().find(|group| group.id == id).cloned())
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<GroupRecord>, RepoError> {
        Ok(self
            .lock()
            .groups
            .iter()
            .find(|group| group.slug == slug)
            .cloned())
    }
}

#[async_trait]
impl GroupsWriteRepo for MemoryStore {
    async fn create_group(&self, params: CreateGroupParams) -> Result<GroupRecord, RepoError> {
        let mut state = self.lock();
        if state.groups.iter().any(|group| group.slug == params.slug) {
            return Err(RepoError::Duplicate {
                constraint: "groups_slug_key".into(),
            });
        }
        let record = GroupRecord {
            id: Uuid::new_v4(),
            slug: params.slug,
            title: params.title,
            description: params.description,
        };
        state.groups.push(record.clone());
        Ok(record)
    }

    async fn delete_group(&self, id: Uuid) -> Result<(), RepoError> {
        let mut state = self.lock();
        let before = state.groups.len();
        state.groups.retain(|group| group.id != id);
        if state.groups.len() == before {
            return Err(RepoError::NotFound);
        }
        for post in state.posts.iter_mut() {
            if post.group_id == Some(id) {
                post.group_id = None;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl PostsRepo for MemoryStore {
    async fn list_posts(
        &self,
        scope: PostListScope,
        window: PageWindow,
    ) -> Result<Vec<PostRecord>, RepoError> {
        let state = self.lock();
        let mut posts: Vec<&StoredPost> = state
            .posts
            .iter()
            .filter(|post| state.in_scope(post, scope))
            .collect();
        posts.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(posts
            .into_iter()
            .skip(window.offset as usize)
            .take(window.limit as usize)
            .map(|post| state.materialize_post(post))
            .collect())
    }

    async fn count_posts(&self, scope: PostListScope) -> Result<u64, RepoError> {
        let state = self.lock();
        Ok(state
            .posts
            .iter()
            .filter(|post| state.in_scope(post, scope))
            .count() as u64)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<PostRecord>, RepoError> {
        let state = self.lock();
        Ok(state
            .posts
            .iter()
            .find(|post| post.id == id)
            .map(|post| state.materialize_post(post)))
    }
}

#[async_trait]
impl PostsWriteRepo for MemoryStore {
    async fn create_post(&self, params: CreatePostParams) -> Result<PostRecord, RepoError> {
        let mut state = self.lock();
        if state.author(params.author_id).is_none() {
            return Err(RepoError::Integrity {
                message: "post author does not exist".into(),
            });
        }
        let post = StoredPost {
            id: Uuid::now_v7(),
            author_id: params.author_id,
            group_id: params.group_id,
            text: params.text,
            image: params.image,
            created_at: state.next_timestamp(),
        };
        state.posts.push(post.clone());
        Ok(state.materialize_post(&post))
    }

    async fn update_post(&self, params: UpdatePostParams) -> Result<PostRecord, RepoError> {
        let mut state = self.lock();
        let post = state
            .posts
            .iter_mut()
            .find(|post| post.id == params.id)
            .ok_or(RepoError::NotFound)?;
        post.text = params.text;
        post.group_id = params.group_id;
        post.image = params.image;
        let post = post.clone();
        Ok(state.materialize_post(&post))
    }

    async fn delete_post(&self, id: Uuid) -> Result<(), RepoError> {
        let mut state = self.lock();
        let before = state.posts.len();
        state.posts.retain(|post| post.id != id);
        if state.posts.len() == before {
            return Err(RepoError::NotFound);
        }
        state.comments.retain(|comment| comment.post_id != id);
        Ok(())
    }
}

#[async_trait]
impl CommentsRepo for MemoryStore {
    async fn list_for_post(&self, post_id: Uuid) -> Result<Vec<CommentRecord>, RepoError> {
        let state = self.lock();
        let mut comments: Vec<&StoredComment> = state
            .comments
            .iter()
            .filter(|comment| comment.post_id == post_id)
            .collect();
        comments.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(comments
            .into_iter()
            .map(|comment| state.materialize_comment(comment))
            .collect())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<CommentRecord>, RepoError> {
        let state = self.lock();
        Ok(state
            .comments
            .iter()
            .find(|comment| comment.id == id)
            .map(|comment| state.materialize_comment(comment)))
    }
}

#[async_trait]
impl CommentsWriteRepo for MemoryStore {
    async fn create_comment(
        &self,
        params: CreateCommentParams,
    ) -> Result<CommentRecord, RepoError> {
        let mut state = self.lock();
        if !state.posts.iter().any(|post| post.id == params.post_id) {
            return Err(RepoError::Integrity {
                message: "comment post does not exist".into(),
            });
        }
        let comment = StoredComment {
            id: Uuid::now_v7(),
            post_id: params.post_id,
            author_id: params.author_id,
            text: params.text,
            created_at: state.next_timestamp(),
        };
        state.comments.push(comment.clone());
        Ok(state.materialize_comment(&comment))
    }

    async fn update_comment(&self, id: Uuid, text: &str) -> Result<CommentRecord, RepoError> {
        let mut state = self.lock();
        let comment = state
            .comments
            .iter_mut()
            .find(|comment| comment.id == id)
            .ok_or(RepoError::NotFound)?;
        comment.text = text.to_string();
        let comment = comment.clone();
        Ok(state.materialize_comment(&comment))
    }

    async fn delete_comment(&self, id: Uuid) -> Result<(), RepoError> {
        let mut state = self.lock();
        let before = state.comments.len();
        state.comments.retain(|comment| comment.id != id);
        if state.comments.len() == before {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }
}

#[async_trait]
impl FollowsRepo for MemoryStore {
    async fn find_follow(
        &self,
        follower_id: Uuid,
        author_id: Uuid,
    ) -> Result<Option<FollowRecord>, RepoError> {
        Ok(self
            .lock()
            .follows
            .iter()
            .find(|edge| edge.follower_id == follower_id && edge.author_id == author_id)
            .cloned())
    }

    async fn count_following(&self, follower_id: Uuid) -> Result<u64, RepoError> {
        Ok(self
            .lock()
            .follows
            .iter()
            .filter(|edge| edge.follower_id == follower_id)
            .count() as u64)
    }

    async fn count_followers(&self, author_id: Uuid) -> Result<u64, RepoError> {
        Ok(self
            .lock()
            .follows
            .iter()
            .filter(|edge| edge.author_id == author_id)
            .count() as u64)
    }
}

#[async_trait]
impl FollowsWriteRepo for MemoryStore {
    async fn insert_follow(
        &self,
        follower_id: Uuid,
        author_id: Uuid,
    ) -> Result<FollowRecord, RepoError> {
        if follower_id == author_id {
            return Err(RepoError::Integrity {
                message: "follows_no_self_follow".into(),
            });
        }
        let mut state = self.lock();
        if let Some(existing) = state
            .follows
            .iter()
            .find(|edge| edge.follower_id == follower_id && edge.author_id == author_id)
        {
            return Ok(existing.clone());
        }
        let edge = FollowRecord {
            id: Uuid::new_v4(),
            follower_id,
            author_id,
            created_at: state.next_timestamp(),
        };
        state.follows.push(edge.clone());
        Ok(edge)
    }

    async fn delete_follow(&self, follower_id: Uuid, author_id: Uuid) -> Result<bool, RepoError> {
        let mut state = self.lock();
        let before = state.follows.len();
        state
            .follows
            .retain(|edge| !(edge.follower_id == follower_id && edge.author_id == author_id));
        Ok(state.follows.len() != before)
    }
}
