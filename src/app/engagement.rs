use anyhow::Result;
use sqlx::postgres::PgRow;
use sqlx::Row;
use uuid::Uuid;

use crate::domain::engagement::{Comment, LikeState};
use crate::domain::user::AuthorBrief;
use crate::infra::db::Db;

#[derive(Clone)]
pub struct EngagementService {
    db: Db,
}

impl EngagementService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// Record a like. Liking a post twice is a no-op; the returned state
    /// always reflects what is in the database afterwards.
    pub async fn like_post(&self, user_id: Uuid, post_id: Uuid) -> Result<Option<LikeState>> {
        if !self.post_visible(post_id).await? {
            return Ok(None);
        }

        sqlx::query(
            "INSERT INTO likes (user_id, post_id) VALUES ($1, $2) \
             ON CONFLICT ON CONSTRAINT likes_user_post_key DO NOTHING",
        )
        .bind(user_id)
        .bind(post_id)
        .execute(self.db.pool())
        .await?;

        let likes_count = self.count_likes(post_id).await?;
        Ok(Some(LikeState {
            liked: true,
            likes_count,
        }))
    }

    /// Remove a like. Unliking a post that was never liked succeeds and
    /// leaves the count untouched.
    pub async fn unlike_post(&self, user_id: Uuid, post_id: Uuid) -> Result<Option<LikeState>> {
        if !self.post_visible(post_id).await? {
            return Ok(None);
        }

        sqlx::query("DELETE FROM likes WHERE user_id = $1 AND post_id = $2")
            .bind(user_id)
            .bind(post_id)
            .execute(self.db.pool())
            .await?;

        let likes_count = self.count_likes(post_id).await?;
        Ok(Some(LikeState {
            liked: false,
            likes_count,
        }))
    }

    pub async fn list_comments(&self, post_id: Uuid) -> Result<Option<Vec<Comment>>> {
        if !self.post_visible(post_id).await? {
            return Ok(None);
        }

        let rows = sqlx::query(
            "SELECT cm.id, cm.content, cm.post_id, cm.created_at, \
                    u.id AS user_id, u.username, u.nickname, u.avatar_path \
             FROM comments cm \
             JOIN users u ON u.id = cm.user_id \
             WHERE cm.post_id = $1 \
             ORDER BY cm.created_at DESC, cm.id DESC",
        )
        .bind(post_id)
        .fetch_all(self.db.pool())
        .await?;

        let comments = rows
            .iter()
            .map(comment_from_row)
            .collect::<Result<Vec<_>>>()?;
        Ok(Some(comments))
    }

    pub async fn create_comment(
        &self,
        user_id: Uuid,
        post_id: Uuid,
        content: String,
    ) -> Result<Option<Comment>> {
        if !self.post_visible(post_id).await? {
            return Ok(None);
        }

        let row = sqlx::query(
            "WITH inserted AS ( \
                INSERT INTO comments (user_id, post_id, content) \
                VALUES ($1, $2, $3) \
                RETURNING id, content, post_id, user_id, created_at \
             ) \
             SELECT i.id, i.content, i.post_id, i.created_at, \
                    u.id AS user_id, u.username, u.nickname, u.avatar_path \
             FROM inserted i \
             JOIN users u ON u.id = i.user_id",
        )
        .bind(user_id)
        .bind(post_id)
        .bind(content)
        .fetch_one(self.db.pool())
        .await?;

        Ok(Some(comment_from_row(&row)?))
    }

    /// Comment deletion is restricted to the comment's own author.
    pub async fn delete_comment(
        &self,
        comment_id: Uuid,
        post_id: Uuid,
        user_id: Uuid,
    ) -> Result<bool> {
        let result =
            sqlx::query("DELETE FROM comments WHERE id = $1 AND post_id = $2 AND user_id = $3")
                .bind(comment_id)
                .bind(post_id)
                .bind(user_id)
                .execute(self.db.pool())
                .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn post_visible(&self, post_id: Uuid) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM posts WHERE id = $1 AND status = 'approved')",
        )
        .bind(post_id)
        .fetch_one(self.db.pool())
        .await?;
        Ok(exists)
    }

    async fn count_likes(&self, post_id: Uuid) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM likes WHERE post_id = $1")
            .bind(post_id)
            .fetch_one(self.db.pool())
            .await?;
        Ok(count)
    }
}

fn comment_from_row(row: &PgRow) -> Result<Comment> {
    Ok(Comment {
        id: row.get("id"),
        content: row.get("content"),
        post_id: row.get("post_id"),
        user: AuthorBrief {
            id: row.get("user_id"),
            username: row.get("username"),
            nickname: row.get("nickname"),
            avatar: row.get("avatar_path"),
        },
        created_at: row.get("created_at"),
    })
}
