use anyhow::Result;
use sqlx::postgres::PgRow;
use sqlx::Row;
use uuid::Uuid;

use crate::domain::category::Category;
use crate::infra::db::Db;

#[derive(Clone)]
pub struct CategoryService {
    db: Db,
}

impl CategoryService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    pub async fn list(&self) -> Result<Vec<Category>> {
        let rows = sqlx::query("SELECT id, name, slug, created_at FROM categories ORDER BY name")
            .fetch_all(self.db.pool())
            .await?;
        rows.iter().map(category_from_row).collect()
    }

    pub async fn get(&self, category_id: Uuid) -> Result<Option<Category>> {
        let row = sqlx::query("SELECT id, name, slug, created_at FROM categories WHERE id = $1")
            .bind(category_id)
            .fetch_optional(self.db.pool())
            .await?;
        row.as_ref().map(category_from_row).transpose()
    }

    /// Unique-slug violations bubble up as database errors so the handler
    /// can map them to a conflict response.
    pub async fn create(&self, name: String) -> Result<Category> {
        let slug = slugify(&name);
        let row = sqlx::query(
            "INSERT INTO categories (name, slug) VALUES ($1, $2) \
             RETURNING id, name, slug, created_at",
        )
        .bind(name)
        .bind(slug)
        .fetch_one(self.db.pool())
        .await?;
        category_from_row(&row)
    }

    pub async fn update(&self, category_id: Uuid, name: String) -> Result<Option<Category>> {
        let slug = slugify(&name);
        let row = sqlx::query(
            "UPDATE categories SET name = $2, slug = $3 WHERE id = $1 \
             RETURNING id, name, slug, created_at",
        )
        .bind(category_id)
        .bind(name)
        .bind(slug)
        .fetch_optional(self.db.pool())
        .await?;
        row.as_ref().map(category_from_row).transpose()
    }

    /// Fails while posts still reference the category; the restrict foreign
    /// key keeps the gallery filter consistent.
    pub async fn delete(&self, category_id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(category_id)
            .execute(self.db.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

/// Lowercase ASCII slug: alphanumerics kept, runs of anything else collapse
/// to a single dash.
fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut last_dash = true;
    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch.to_ascii_lowercase());
            last_dash = false;
        } else if !last_dash {
            slug.push('-');
            last_dash = true;
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

fn category_from_row(row: &PgRow) -> Result<Category> {
    Ok(Category {
        id: row.get("id"),
        name: row.get("name"),
        slug: row.get("slug"),
        created_at: row.get("created_at"),
    })
}
