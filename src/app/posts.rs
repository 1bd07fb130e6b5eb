use anyhow::{anyhow, Result};
use sqlx::postgres::PgRow;
use sqlx::{Postgres, QueryBuilder, Row};
use uuid::Uuid;

use crate::domain::category::Category;
use crate::domain::post::{MediaType, Post, PostStatus};
use crate::domain::user::AuthorBrief;
use crate::infra::db::Db;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostSort {
    Date,
    Popularity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

/// Gallery filter. Pages are 1-based; offsets are derived from page size.
#[derive(Debug, Clone)]
pub struct PostFilter {
    pub category_id: Option<Uuid>,
    pub search: Option<String>,
    pub sort_by: PostSort,
    pub sort_order: SortOrder,
    pub page: i64,
    pub per_page: i64,
}

impl Default for PostFilter {
    fn default() -> Self {
        Self {
            category_id: None,
            search: None,
            sort_by: PostSort::Date,
            sort_order: SortOrder::Desc,
            page: 1,
            per_page: 12,
        }
    }
}

impl PostFilter {
    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.per_page
    }
}

#[derive(Clone)]
pub struct PostService {
    db: Db,
}

impl PostService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// Store a freshly submitted post. Everything enters the moderation
    /// pipeline as `pending`; only a moderator decision makes it public.
    pub async fn create_post(
        &self,
        author_id: Uuid,
        category_id: Uuid,
        title: String,
        description: String,
        media_path: String,
        media_type: MediaType,
    ) -> Result<Post> {
        let category_exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM categories WHERE id = $1)")
                .bind(category_id)
                .fetch_one(self.db.pool())
                .await?;
        if !category_exists {
            return Err(anyhow!("category not found"));
        }

        let post_id: Uuid = sqlx::query_scalar(
            "INSERT INTO posts (author_id, category_id, title, description, media_path, media_type) \
             VALUES ($1, $2, $3, $4, $5, $6::media_type) \
             RETURNING id",
        )
        .bind(author_id)
        .bind(category_id)
        .bind(title)
        .bind(description)
        .bind(media_path)
        .bind(media_type.as_db())
        .fetch_one(self.db.pool())
        .await?;

        let post = self
            .fetch_post(post_id, Some(author_id))
            .await?
            .ok_or_else(|| anyhow!("post vanished after insert"))?;
        Ok(post)
    }

    /// Post detail behind the visibility gate: approved posts are public,
    /// anything else is only shown to its author or a moderator. A hidden
    /// post looks exactly like a missing one to everyone else.
    pub async fn get_post(
        &self,
        post_id: Uuid,
        viewer_id: Option<Uuid>,
        viewer_can_moderate: bool,
    ) -> Result<Option<Post>> {
        let post = match self.fetch_post(post_id, viewer_id).await? {
            Some(post) => post,
            None => return Ok(None),
        };

        if post.status != PostStatus::Approved {
            let is_author = viewer_id == Some(post.author.id);
            if !is_author && !viewer_can_moderate {
                return Ok(None);
            }
        }

        Ok(Some(post))
    }

    /// Public gallery: approved posts only, filtered, sorted and paged.
    /// Returns the page plus the total match count for pagination controls.
    pub async fn list_public(
        &self,
        viewer_id: Option<Uuid>,
        filter: &PostFilter,
    ) -> Result<(Vec<Post>, i64)> {
        let mut qb = select_posts(viewer_id);
        qb.push(" WHERE p.status = 'approved'");
        push_filters(&mut qb, filter);
        push_order_and_page(&mut qb, filter);

        let rows = qb.build().fetch_all(self.db.pool()).await?;
        let posts = rows
            .iter()
            .map(post_from_row)
            .collect::<Result<Vec<_>>>()?;

        let mut count = QueryBuilder::<Postgres>::new(
            "SELECT COUNT(*) FROM posts p WHERE p.status = 'approved'",
        );
        push_filters(&mut count, filter);
        let total: i64 = count.build_query_scalar().fetch_one(self.db.pool()).await?;

        Ok((posts, total))
    }

    /// Posts by one author. `include_hidden` is true when the viewer is the
    /// author themselves or a moderator; everyone else gets approved only.
    pub async fn list_by_author(
        &self,
        author_id: Uuid,
        viewer_id: Option<Uuid>,
        include_hidden: bool,
        filter: &PostFilter,
    ) -> Result<(Vec<Post>, i64)> {
        let mut qb = select_posts(viewer_id);
        qb.push(" WHERE p.author_id = ");
        qb.push_bind(author_id);
        if !include_hidden {
            qb.push(" AND p.status = 'approved'");
        }
        push_filters(&mut qb, filter);
        push_order_and_page(&mut qb, filter);

        let rows = qb.build().fetch_all(self.db.pool()).await?;
        let posts = rows
            .iter()
            .map(post_from_row)
            .collect::<Result<Vec<_>>>()?;

        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM posts p WHERE p.author_id = ");
        count.push_bind(author_id);
        if !include_hidden {
            count.push(" AND p.status = 'approved'");
        }
        push_filters(&mut count, filter);
        let total: i64 = count.build_query_scalar().fetch_one(self.db.pool()).await?;

        Ok((posts, total))
    }

    /// Approved posts the user has liked.
    pub async fn list_liked_by(
        &self,
        user_id: Uuid,
        filter: &PostFilter,
    ) -> Result<(Vec<Post>, i64)> {
        let mut qb = select_posts(Some(user_id));
        qb.push(" JOIN likes lk ON lk.post_id = p.id AND lk.user_id = ");
        qb.push_bind(user_id);
        qb.push(" WHERE p.status = 'approved'");
        push_filters(&mut qb, filter);
        push_order_and_page(&mut qb, filter);

        let rows = qb.build().fetch_all(self.db.pool()).await?;
        let posts = rows
            .iter()
            .map(post_from_row)
            .collect::<Result<Vec<_>>>()?;

        let mut count = QueryBuilder::<Postgres>::new(
            "SELECT COUNT(*) FROM posts p JOIN likes lk ON lk.post_id = p.id AND lk.user_id = ",
        );
        count.push_bind(user_id);
        count.push(" WHERE p.status = 'approved'");
        push_filters(&mut count, filter);
        let total: i64 = count.build_query_scalar().fetch_one(self.db.pool()).await?;

        Ok((posts, total))
    }

    /// Partial update by the author (or a moderator). Returns `None` when the
    /// post does not exist or the actor has no claim to it.
    pub async fn update_post(
        &self,
        post_id: Uuid,
        actor_id: Uuid,
        actor_can_moderate: bool,
        title: Option<String>,
        description: Option<String>,
        category_id: Option<Uuid>,
    ) -> Result<Option<Post>> {
        if let Some(category_id) = category_id {
            let exists: bool =
                sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM categories WHERE id = $1)")
                    .bind(category_id)
                    .fetch_one(self.db.pool())
                    .await?;
            if !exists {
                return Err(anyhow!("category not found"));
            }
        }

        let updated: Option<Uuid> = sqlx::query_scalar(
            "UPDATE posts \
             SET title = COALESCE(NULLIF($4, ''), title), \
                 description = COALESCE(NULLIF($5, ''), description), \
                 category_id = COALESCE($6, category_id), \
                 updated_at = now() \
             WHERE id = $1 AND (author_id = $2 OR $3) \
             RETURNING id",
        )
        .bind(post_id)
        .bind(actor_id)
        .bind(actor_can_moderate)
        .bind(title.unwrap_or_default())
        .bind(description.unwrap_or_default())
        .bind(category_id)
        .fetch_optional(self.db.pool())
        .await?;

        match updated {
            Some(id) => self.fetch_post(id, Some(actor_id)).await,
            None => Ok(None),
        }
    }

    /// Delete by the author (or a moderator). Returns the media path for
    /// file cleanup, or `None` when nothing was deleted.
    pub async fn delete_post(
        &self,
        post_id: Uuid,
        actor_id: Uuid,
        actor_can_moderate: bool,
    ) -> Result<Option<String>> {
        let media_path: Option<String> = sqlx::query_scalar(
            "DELETE FROM posts \
             WHERE id = $1 AND (author_id = $2 OR $3) \
             RETURNING media_path",
        )
        .bind(post_id)
        .bind(actor_id)
        .bind(actor_can_moderate)
        .fetch_optional(self.db.pool())
        .await?;

        Ok(media_path)
    }

    /// Raw fetch with no visibility gate; callers apply their own.
    async fn fetch_post(&self, post_id: Uuid, viewer_id: Option<Uuid>) -> Result<Option<Post>> {
        let mut qb = select_posts(viewer_id);
        qb.push(" WHERE p.id = ");
        qb.push_bind(post_id);

        let row = qb.build().fetch_optional(self.db.pool()).await?;
        row.as_ref().map(post_from_row).transpose()
    }
}

/// Shared SELECT for post detail rows: author and category joined in, the
/// like count and the viewer's own like derived in place.
fn select_posts(viewer_id: Option<Uuid>) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new(
        "SELECT p.id, p.title, p.description, p.media_type::text AS media_type, \
                p.media_path, p.status::text AS status, p.reject_reason, \
                p.created_at, p.updated_at, \
                u.id AS author_id, u.username AS author_username, \
                u.nickname AS author_nickname, u.avatar_path AS author_avatar, \
                c.id AS category_id, c.name AS category_name, \
                c.slug AS category_slug, c.created_at AS category_created_at, \
                (SELECT COUNT(*) FROM likes l WHERE l.post_id = p.id) AS likes_count, \
                EXISTS(SELECT 1 FROM likes l WHERE l.post_id = p.id AND l.user_id = ",
    );
    qb.push_bind(viewer_id);
    qb.push(
        ") AS is_liked \
         FROM posts p \
         JOIN users u ON u.id = p.author_id \
         JOIN categories c ON c.id = p.category_id",
    );
    qb
}

fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, filter: &PostFilter) {
    if let Some(category_id) = filter.category_id {
        qb.push(" AND p.category_id = ");
        qb.push_bind(category_id);
    }
    if let Some(search) = &filter.search {
        let pattern = format!("%{}%", search);
        qb.push(" AND (p.title ILIKE ");
        qb.push_bind(pattern.clone());
        qb.push(" OR p.description ILIKE ");
        qb.push_bind(pattern);
        qb.push(")");
    }
}

fn push_order_and_page(qb: &mut QueryBuilder<'_, Postgres>, filter: &PostFilter) {
    qb.push(" ORDER BY ");
    match filter.sort_by {
        PostSort::Popularity => qb.push("likes_count"),
        PostSort::Date => qb.push("p.created_at"),
    };
    match filter.sort_order {
        SortOrder::Asc => qb.push(" ASC"),
        SortOrder::Desc => qb.push(" DESC"),
    };
    // stable tie-break so pages never overlap
    qb.push(", p.id DESC LIMIT ");
    qb.push_bind(filter.per_page);
    qb.push(" OFFSET ");
    qb.push_bind(filter.offset());
}

pub(crate) fn post_from_row(row: &PgRow) -> Result<Post> {
    let status: String = row.get("status");
    let status =
        PostStatus::from_db(&status).ok_or_else(|| anyhow!("unknown post status: {}", status))?;
    let media_type: String = row.get("media_type");
    let media_type = MediaType::from_db(&media_type)
        .ok_or_else(|| anyhow!("unknown media type: {}", media_type))?;

    Ok(Post {
        id: row.get("id"),
        title: row.get("title"),
        description: row.get("description"),
        media_type,
        media_url: row.get("media_path"),
        author: AuthorBrief {
            id: row.get("author_id"),
            username: row.get("author_username"),
            nickname: row.get("author_nickname"),
            avatar: row.get("author_avatar"),
        },
        category: Category {
            id: row.get("category_id"),
            name: row.get("category_name"),
            slug: row.get("category_slug"),
            created_at: row.get("category_created_at"),
        },
        status,
        reject_reason: row.get("reject_reason"),
        likes_count: row.get("likes_count"),
        is_liked: row.get("is_liked"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}
