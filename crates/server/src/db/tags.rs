//! Repository for the `tags` table.

use std::collections::BTreeSet;

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};

use super::models::{DbId, Tag};
use crate::error::{AppError, Result};
use crate::validation::{CreateTag, UpdateTag, DEFAULT_TAG_COLOR};

const COLUMNS: &str =
    "id, name, color, description, category, is_system_tag, usage_count, created_by, created_at";

pub struct TagRepo;

impl TagRepo {
    /// Inserts a user tag. System tags only come from [`TagRepo::seed_system_tags`].
    pub async fn create(pool: &SqlitePool, created_by: DbId, input: &CreateTag) -> Result<Tag> {
        let name = input.name.trim();
        if Self::find_by_name(pool, name).await?.is_some() {
            return Err(AppError::Conflict(format!("Tag '{name}' already exists")));
        }

        let query = format!(
            "INSERT INTO tags (name, color, description, category, is_system_tag, usage_count, created_by, created_at)
             VALUES (?, ?, ?, ?, 0, 0, ?, ?)
             RETURNING {COLUMNS}"
        );
        let tag = sqlx::query_as::<_, Tag>(&query)
            .bind(name)
            .bind(input.color.as_deref().unwrap_or(DEFAULT_TAG_COLOR))
            .bind(&input.description)
            .bind(&input.category)
            .bind(created_by)
            .bind(Utc::now())
            .fetch_one(pool)
            .await?;
        Ok(tag)
    }

    pub async fn find_by_id(pool: &SqlitePool, id: DbId) -> Result<Option<Tag>> {
        let query = format!("SELECT {COLUMNS} FROM tags WHERE id = ?");
        Ok(sqlx::query_as::<_, Tag>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await?)
    }

    pub async fn find_by_name(pool: &SqlitePool, name: &str) -> Result<Option<Tag>> {
        let query = format!("SELECT {COLUMNS} FROM tags WHERE name = ?");
        Ok(sqlx::query_as::<_, Tag>(&query)
            .bind(name)
            .fetch_optional(pool)
            .await?)
    }

    /// Most used first.
    pub async fn list(pool: &SqlitePool, category: Option<&str>) -> Result<Vec<Tag>> {
        let query = format!(
            "SELECT {COLUMNS} FROM tags
             WHERE (? IS NULL OR category = ?)
             ORDER BY usage_count DESC, name ASC"
        );
        Ok(sqlx::query_as::<_, Tag>(&query)
            .bind(category)
            .bind(category)
            .fetch_all(pool)
            .await?)
    }

    pub async fn update(pool: &SqlitePool, id: DbId, input: &UpdateTag) -> Result<Tag> {
        let query = format!(
            "UPDATE tags SET
                color = COALESCE(?, color),
                description = COALESCE(?, description),
                category = COALESCE(?, category)
             WHERE id = ?
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Tag>(&query)
            .bind(&input.color)
            .bind(&input.description)
            .bind(&input.category)
            .bind(id)
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Tag not found".to_string()))
    }

    /// Bumps `usage_count` once per distinct name. Names with no tag row are
    /// free-form labels and are ignored. Returns how many tags were counted.
    pub async fn increment_usage(conn: &mut SqliteConnection, names: &[String]) -> Result<u64> {
        let distinct: BTreeSet<&str> = names.iter().map(|n| n.trim()).collect();
        let mut counted = 0;
        for name in distinct {
            counted += sqlx::query("UPDATE tags SET usage_count = usage_count + 1 WHERE name = ?")
                .bind(name)
                .execute(&mut *conn)
                .await?
                .rows_affected();
        }
        Ok(counted)
    }

    pub async fn seed_system_tags(pool: &SqlitePool) -> Result<()> {
        let defaults = [
            ("urgent", "#EF4444", "priority", "Needs attention before the next hearing"),
            ("needs-review", "#F59E0B", "status", "Waiting for a second reader"),
            ("verified", "#10B981", "status", "Checked against the source record"),
            ("contradiction", "#8B5CF6", "legal", "Conflicts with another statement"),
        ];

        for (name, color, category, description) in defaults {
            sqlx::query(
                "INSERT INTO tags (name, color, description, category, is_system_tag, usage_count, created_by, created_at)
                 VALUES (?, ?, ?, ?, 1, 0, NULL, ?)
                 ON CONFLICT(name) DO NOTHING",
            )
            .bind(name)
            .bind(color)
            .bind(description)
            .bind(category)
            .bind(Utc::now())
            .execute(pool)
            .await?;
        }
        Ok(())
    }
}
