use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::user::AuthorBrief;

#[derive(Debug, Clone, Serialize)]
pub struct Comment {
    pub id: Uuid,
    pub content: String,
    pub user: AuthorBrief,
    pub post_id: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Like state for a (viewer, post) pair after a toggle, with the fresh count.
#[derive(Debug, Clone, Serialize)]
pub struct LikeState {
    pub liked: bool,
    pub likes_count: i64,
}
