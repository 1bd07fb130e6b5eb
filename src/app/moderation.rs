use anyhow::Result;
use uuid::Uuid;

use crate::app::posts::post_from_row;
use crate::domain::post::{Post, PostStatus};
use crate::infra::db::Db;

/// Outcome of a moderation decision. `pending` is the only state a decision
/// can be applied to; decided posts stay decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionOutcome {
    Applied,
    AlreadyDecided,
    NotFound,
}

#[derive(Clone)]
pub struct ModerationService {
    db: Db,
}

impl ModerationService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// The review queue: pending posts, oldest submissions last.
    pub async fn list_pending(&self, page: i64, per_page: i64) -> Result<(Vec<Post>, i64)> {
        let rows = sqlx::query(
            "SELECT p.id, p.title, p.description, p.media_type::text AS media_type, \
                    p.media_path, p.status::text AS status, p.reject_reason, \
                    p.created_at, p.updated_at, \
                    u.id AS author_id, u.username AS author_username, \
                    u.nickname AS author_nickname, u.avatar_path AS author_avatar, \
                    c.id AS category_id, c.name AS category_name, \
                    c.slug AS category_slug, c.created_at AS category_created_at, \
                    (SELECT COUNT(*) FROM likes l WHERE l.post_id = p.id) AS likes_count, \
                    FALSE AS is_liked \
             FROM posts p \
             JOIN users u ON u.id = p.author_id \
             JOIN categories c ON c.id = p.category_id \
             WHERE p.status = 'pending' \
             ORDER BY p.created_at DESC, p.id DESC \
             LIMIT $1 OFFSET $2",
        )
        .bind(per_page)
        .bind((page - 1) * per_page)
        .fetch_all(self.db.pool())
        .await?;

        let posts = rows
            .iter()
            .map(post_from_row)
            .collect::<Result<Vec<_>>>()?;

        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM posts WHERE status = 'pending'")
                .fetch_one(self.db.pool())
                .await?;

        Ok((posts, total))
    }

    /// Apply an approve or reject decision to a pending post. The guard in
    /// the WHERE clause makes concurrent decisions race safely: exactly one
    /// wins, the rest see `AlreadyDecided`.
    pub async fn decide(
        &self,
        post_id: Uuid,
        status: PostStatus,
        reason: Option<String>,
    ) -> Result<DecisionOutcome> {
        let result = sqlx::query(
            "UPDATE posts \
             SET status = $2::post_status, reject_reason = $3, updated_at = now() \
             WHERE id = $1 AND status = 'pending'",
        )
        .bind(post_id)
        .bind(status.as_db())
        .bind(reason)
        .execute(self.db.pool())
        .await?;

        if result.rows_affected() > 0 {
            return Ok(DecisionOutcome::Applied);
        }

        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM posts WHERE id = $1)")
            .bind(post_id)
            .fetch_one(self.db.pool())
            .await?;

        if exists {
            Ok(DecisionOutcome::AlreadyDecided)
        } else {
            Ok(DecisionOutcome::NotFound)
        }
    }
}
