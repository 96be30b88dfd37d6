//! Repository for the `timeline_events` table.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use sqlx::SqlitePool;

use super::models::{DbId, TimelineEvent};
use crate::error::{AppError, Result};
use crate::validation::{CreateTimelineEvent, UpdateTimelineEvent};

const COLUMNS: &str =
    "id, title, date, description, category, institution, user_id, created_at, deleted_at";

#[derive(Debug, Default, Deserialize)]
pub struct TimelineFilter {
    pub category: Option<String>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

pub struct TimelineRepo;

impl TimelineRepo {
    pub async fn create(
        pool: &SqlitePool,
        user_id: DbId,
        input: &CreateTimelineEvent,
    ) -> Result<TimelineEvent> {
        let query = format!(
            "INSERT INTO timeline_events (title, date, description, category, institution, user_id, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)
             RETURNING {COLUMNS}"
        );
        Ok(sqlx::query_as::<_, TimelineEvent>(&query)
            .bind(input.title.trim())
            .bind(input.date)
            .bind(&input.description)
            .bind(input.category.trim())
            .bind(&input.institution)
            .bind(user_id)
            .bind(Utc::now())
            .fetch_one(pool)
            .await?)
    }

    /// Finds one of `user_id`'s events.
    pub async fn find_for_user(
        pool: &SqlitePool,
        id: DbId,
        user_id: DbId,
    ) -> Result<Option<TimelineEvent>> {
        let query = format!(
            "SELECT {COLUMNS} FROM timeline_events
             WHERE id = ? AND user_id = ? AND deleted_at IS NULL"
        );
        Ok(sqlx::query_as::<_, TimelineEvent>(&query)
            .bind(id)
            .bind(user_id)
            .fetch_optional(pool)
            .await?)
    }

    /// Chronological listing, optionally narrowed by category and date range.
    pub async fn list_for_user(
        pool: &SqlitePool,
        user_id: DbId,
        filter: &TimelineFilter,
    ) -> Result<Vec<TimelineEvent>> {
        let query = format!(
            "SELECT {COLUMNS} FROM timeline_events
             WHERE user_id = ? AND deleted_at IS NULL
               AND (? IS NULL OR category = ?)
               AND (? IS NULL OR date >= ?)
               AND (? IS NULL OR date <= ?)
             ORDER BY date ASC, id ASC"
        );
        Ok(sqlx::query_as::<_, TimelineEvent>(&query)
            .bind(user_id)
            .bind(&filter.category)
            .bind(&filter.category)
            .bind(filter.from)
            .bind(filter.from)
            .bind(filter.to)
            .bind(filter.to)
            .fetch_all(pool)
            .await?)
    }

    pub async fn update(
        pool: &SqlitePool,
        id: DbId,
        user_id: DbId,
        input: &UpdateTimelineEvent,
    ) -> Result<TimelineEvent> {
        let query = format!(
            "UPDATE timeline_events SET
                title = COALESCE(?, title),
                date = COALESCE(?, date),
                description = COALESCE(?, description),
                category = COALESCE(?, category),
                institution = COALESCE(?, institution)
             WHERE id = ? AND user_id = ? AND deleted_at IS NULL
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, TimelineEvent>(&query)
            .bind(input.title.as_deref().map(str::trim))
            .bind(input.date)
            .bind(&input.description)
            .bind(input.category.as_deref().map(str::trim))
            .bind(&input.institution)
            .bind(id)
            .bind(user_id)
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Timeline event not found".to_string()))
    }

    pub async fn soft_delete(pool: &SqlitePool, id: DbId, user_id: DbId) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE timeline_events SET deleted_at = ?
             WHERE id = ? AND user_id = ? AND deleted_at IS NULL",
        )
        .bind(Utc::now())
        .bind(id)
        .bind(user_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
