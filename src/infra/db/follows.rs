use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    application::repos::{FollowsRepo, FollowsWriteRepo, RepoError},
    domain::entities::FollowRecord,
};

use super::{PostgresRepositories, map_sqlx_error};

#[derive(sqlx::FromRow)]
struct FollowRow {
    id: Uuid,
    follower_id: Uuid,
    author_id: Uuid,
    created_at: OffsetDateTime,
}

impl From<FollowRow> for FollowRecord {
    fn from(row: FollowRow) -> Self {
        Self {
            id: row.id,
            follower_id: row.follower_id,
            author_id: row.author_id,
            created_at: row.created_at,
        }
    }
}

#[async_trait]
impl FollowsRepo for PostgresRepositories {
    async fn find_follow(
        &self,
        follower_id: Uuid,
        author_id: Uuid,
    ) -> Result<Option<FollowRecord>, RepoError> {
        let row = sqlx::query_as::<_, FollowRow>(
            r#"
            SELECT id, follower_id, author_id, created_at
            FROM follows
            WHERE follower_id = $1 AND author_id = $2
            "#,
        )
        .bind(follower_id)
        .bind(author_id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(FollowRecord::from))
    }

    async fn count_following(&self, follower_id: Uuid) -> Result<u64, RepoError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM follows WHERE follower_id = $1")
            .bind(follower_id)
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Self::convert_count(count)
    }

    async fn count_followers(&self, author_id: Uuid) -> Result<u64, RepoError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM follows WHERE author_id = $1")
            .bind(author_id)
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Self::convert_count(count)
    }
}

#[async_trait]
impl FollowsWriteRepo for PostgresRepositories {
    async fn insert_follow(
        &self,
        follower_id: Uuid,
        author_id: Uuid,
    ) -> Result<FollowRecord, RepoError> {
        let inserted = sqlx::query_as::<_, FollowRow>(
            r#"
            INSERT INTO follows (id, follower_id, author_id)
            VALUES ($1, $2, $3)
            ON CONFLICT (follower_id, author_id) DO NOTHING
            RETURNING id, follower_id, author_id, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(follower_id)
        .bind(author_id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        if let Some(row) = inserted {
            return Ok(row.into());
        }

        // A concurrent follow won the race; return its row.
        self.find_follow(follower_id, author_id)
            .await?
            .ok_or(RepoError::NotFound)
    }

    async fn delete_follow(&self, follower_id: Uuid, author_id: Uuid) -> Result<bool, RepoError> {
        let result = sqlx::query("DELETE FROM follows WHERE follower_id = $1 AND author_id = $2")
            .bind(follower_id)
            .bind(author_id)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(result.rows_affected() > 0)
    }
}
