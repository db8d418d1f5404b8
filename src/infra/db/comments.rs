use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    application::repos::{CommentsRepo, CommentsWriteRepo, CreateCommentParams, RepoError},
    domain::entities::CommentRecord,
};

use super::{PostgresRepositories, map_sqlx_error};

const COMMENT_SELECT: &str = "SELECT c.id, c.post_id, c.author_id, a.username AS author_username, \
     c.text, c.created_at \
     FROM comments c JOIN authors a ON a.id = c.author_id";

#[derive(sqlx::FromRow)]
struct CommentRow {
    id: Uuid,
    post_id: Uuid,
    author_id: Uuid,
    author_username: String,
    text: String,
    created_at: OffsetDateTime,
}

impl From<CommentRow> for CommentRecord {
    fn from(row: CommentRow) -> Self {
        Self {
            id: row.id,
            post_id: row.post_id,
            author_id: row.author_id,
            author_username: row.author_username,
            text: row.text,
            created_at: row.created_at,
        }
    }
}

impl PostgresRepositories {
    async fn fetch_comment(&self, id: Uuid) -> Result<Option<CommentRecord>, RepoError> {
        let sql = format!("{COMMENT_SELECT} WHERE c.id = $1");
        let row = sqlx::query_as::<_, CommentRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.map(CommentRecord::from))
    }
}

#[async_trait]
impl CommentsRepo for PostgresRepositories {
    async fn list_for_post(&self, post_id: Uuid) -> Result<Vec<CommentRecord>, RepoError> {
        let sql =
            format!("{COMMENT_SELECT} WHERE c.post_id = $1 ORDER BY c.created_at DESC, c.id DESC");
        let rows = sqlx::query_as::<_, CommentRow>(&sql)
            .bind(post_id)
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(CommentRecord::from).collect())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<CommentRecord>, RepoError> {
        self.fetch_comment(id).await
    }
}

#[async_trait]
impl CommentsWriteRepo for PostgresRepositories {
    async fn create_comment(
        &self,
        params: CreateCommentParams,
    ) -> Result<CommentRecord, RepoError> {
        let id = Uuid::now_v7();
        sqlx::query(
            r#"
            INSERT INTO comments (id, post_id, author_id, text)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(id)
        .bind(params.post_id)
        .bind(params.author_id)
        .bind(&params.text)
        .execute(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        self.fetch_comment(id).await?.ok_or(RepoError::NotFound)
    }

    async fn update_comment(&self, id: Uuid, text: &str) -> Result<CommentRecord, RepoError> {
        let result = sqlx::query("UPDATE comments SET text = $2 WHERE id = $1")
            .bind(id)
            .bind(text)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        self.fetch_comment(id).await?.ok_or(RepoError::NotFound)
    }

    async fn delete_comment(&self, id: Uuid) -> Result<(), RepoError> {
        let result = sqlx::query("DELETE FROM comments WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }
}
