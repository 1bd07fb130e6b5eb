use anyhow::{anyhow, Result};
use sqlx::postgres::PgRow;
use sqlx::Row;
use uuid::Uuid;

use crate::domain::user::{Role, User};
use crate::infra::db::Db;

#[derive(Debug, Default)]
pub struct ProfileUpdate {
    pub username: Option<String>,
    pub nickname: Option<String>,
    pub description: Option<String>,
    pub vk_link: Option<String>,
    pub telegram_link: Option<String>,
}

#[derive(Clone)]
pub struct UserService {
    db: Db,
}

impl UserService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    pub async fn get_user(&self, user_id: Uuid) -> Result<Option<User>> {
        let row = sqlx::query(
            "SELECT id, username, nickname, email, avatar_path, description, \
                    vk_link, telegram_link, role::text AS role, created_at \
             FROM users WHERE id = $1",
        )
        .bind(user_id)
        .fetch_optional(self.db.pool())
        .await?;

        row.map(|row| user_from_row(&row)).transpose()
    }

    /// Partial profile update. Empty strings are treated as "not provided"
    /// so a form that round-trips blank fields cannot wipe data.
    pub async fn update_profile(
        &self,
        user_id: Uuid,
        update: ProfileUpdate,
    ) -> Result<Option<User>> {
        let row = sqlx::query(
            "UPDATE users \
             SET username = COALESCE(NULLIF($2, ''), username), \
                 nickname = COALESCE(NULLIF($3, ''), nickname), \
                 description = COALESCE(NULLIF($4, ''), description), \
                 vk_link = COALESCE(NULLIF($5, ''), vk_link), \
                 telegram_link = COALESCE(NULLIF($6, ''), telegram_link), \
                 updated_at = now() \
             WHERE id = $1 \
             RETURNING id, username, nickname, email, avatar_path, description, \
                       vk_link, telegram_link, role::text AS role, created_at",
        )
        .bind(user_id)
        .bind(update.username.unwrap_or_default())
        .bind(update.nickname.unwrap_or_default())
        .bind(update.description.unwrap_or_default())
        .bind(update.vk_link.unwrap_or_default())
        .bind(update.telegram_link.unwrap_or_default())
        .fetch_optional(self.db.pool())
        .await?;

        row.map(|row| user_from_row(&row)).transpose()
    }

    /// Point the profile at a freshly stored avatar. Returns the updated user
    /// together with the previous avatar path so the caller can clean it up.
    pub async fn update_avatar(
        &self,
        user_id: Uuid,
        avatar_path: &str,
    ) -> Result<Option<(User, Option<String>)>> {
        let row = sqlx::query(
            "UPDATE users u \
             SET avatar_path = $2, updated_at = now() \
             FROM (SELECT id, avatar_path AS old_avatar FROM users WHERE id = $1) prev \
             WHERE u.id = prev.id \
             RETURNING u.id, u.username, u.nickname, u.email, u.avatar_path, \
                       u.description, u.vk_link, u.telegram_link, \
                       u.role::text AS role, u.created_at, prev.old_avatar",
        )
        .bind(user_id)
        .bind(avatar_path)
        .fetch_optional(self.db.pool())
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let old_avatar: Option<String> = row.get("old_avatar");
        Ok(Some((user_from_row(&row)?, old_avatar)))
    }
}

pub(crate) fn user_from_row(row: &PgRow) -> Result<User> {
    let role: String = row.get("role");
    let role = Role::from_db(&role).ok_or_else(|| anyhow!("unknown user role: {}", role))?;
    Ok(User {
        id: row.get("id"),
        username: row.get("username"),
        nickname: row.get("nickname"),
        email: row.get("email"),
        avatar: row.get("avatar_path"),
        description: row.get("description"),
        vk_link: row.get("vk_link"),
        telegram_link: row.get("telegram_link"),
        role,
        created_at: row.get("created_at"),
    })
}
