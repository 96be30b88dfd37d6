//! Repository for the `annotation_mentions` table.
//!
//! `is_read` and `read_at` only ever change together, so a mention is either
//! unread with no timestamp or read with one.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};

use super::models::{AnnotationMention, DbId, MentionDetail};
use crate::error::{AppError, Result};

const COLUMNS: &str = "id, annotation_id, user_id, is_read, read_at, created_at";

/// A mention `m` is shown to its recipient only while the annotation `a` and
/// document `d` are live, the annotation is not someone else's private note,
/// and the recipient can still see the document.
const VISIBLE: &str = "a.deleted_at IS NULL AND d.deleted_at IS NULL
    AND (a.is_private = 0 OR a.author_id = m.user_id)
    AND (d.user_id = m.user_id
         OR EXISTS (SELECT 1 FROM collaborators c
                    WHERE c.owner_id = d.user_id AND c.collaborator_id = m.user_id))";

/// Ids of the mentions visible to the user bound in place of `?`.
fn visible_ids() -> String {
    format!(
        "SELECT m.id FROM annotation_mentions m
         JOIN annotations a ON a.id = m.annotation_id
         JOIN documents d ON d.id = a.document_id
         WHERE m.user_id = ? AND {VISIBLE}"
    )
}

pub struct MentionRepo;

impl MentionRepo {
    /// Records a mention of each user on `annotation_id`. Users already
    /// mentioned on that annotation are skipped.
    pub async fn create_many(
        conn: &mut SqliteConnection,
        annotation_id: DbId,
        user_ids: &[DbId],
    ) -> Result<Vec<AnnotationMention>> {
        let query = format!(
            "INSERT INTO annotation_mentions (annotation_id, user_id, is_read, read_at, created_at)
             VALUES (?, ?, 0, NULL, ?)
             ON CONFLICT(annotation_id, user_id) DO NOTHING
             RETURNING {COLUMNS}"
        );

        let mut created = Vec::with_capacity(user_ids.len());
        for &user_id in user_ids {
            let mention = sqlx::query_as::<_, AnnotationMention>(&query)
                .bind(annotation_id)
                .bind(user_id)
                .bind(Utc::now())
                .fetch_optional(&mut *conn)
                .await?;
            created.extend(mention);
        }
        Ok(created)
    }

    pub async fn for_annotation(pool: &SqlitePool, annotation_id: DbId) -> Result<Vec<AnnotationMention>> {
        let query = format!(
            "SELECT {COLUMNS} FROM annotation_mentions WHERE annotation_id = ? ORDER BY id ASC"
        );
        Ok(sqlx::query_as::<_, AnnotationMention>(&query)
            .bind(annotation_id)
            .fetch_all(pool)
            .await?)
    }

    /// A user's mention inbox, newest first.
    pub async fn list_for_user(
        pool: &SqlitePool,
        user_id: DbId,
        unread_only: bool,
    ) -> Result<Vec<MentionDetail>> {
        let query = format!(
            r#"
            SELECT m.id, m.annotation_id, a.document_id, u.username AS author_username,
                   a.content, m.is_read, m.read_at, m.created_at
            FROM annotation_mentions m
            JOIN annotations a ON a.id = m.annotation_id
            JOIN documents d ON d.id = a.document_id
            JOIN users u ON u.id = a.author_id
            WHERE m.user_id = ? AND {VISIBLE}
              AND (? = 0 OR m.is_read = 0)
            ORDER BY m.created_at DESC, m.id DESC
            "#
        );
        Ok(sqlx::query_as::<_, MentionDetail>(&query)
            .bind(user_id)
            .bind(unread_only)
            .fetch_all(pool)
            .await?)
    }

    /// Unread mentions counted over the same rows the inbox shows.
    pub async fn unread_count(pool: &SqlitePool, user_id: DbId) -> Result<i64> {
        let query = format!(
            "SELECT COUNT(*) FROM annotation_mentions m
             JOIN annotations a ON a.id = m.annotation_id
             JOIN documents d ON d.id = a.document_id
             WHERE m.user_id = ? AND m.is_read = 0 AND {VISIBLE}"
        );
        Ok(sqlx::query_scalar::<_, i64>(&query)
            .bind(user_id)
            .fetch_one(pool)
            .await?)
    }

    /// Marks one of `user_id`'s visible mentions as read. Reading twice keeps
    /// the first `read_at`.
    pub async fn mark_read(pool: &SqlitePool, id: DbId, user_id: DbId) -> Result<AnnotationMention> {
        let query = format!(
            "UPDATE annotation_mentions SET is_read = 1, read_at = COALESCE(read_at, ?)
             WHERE id = ? AND id IN ({})
             RETURNING {COLUMNS}",
            visible_ids()
        );
        sqlx::query_as::<_, AnnotationMention>(&query)
            .bind(Utc::now())
            .bind(id)
            .bind(user_id)
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Mention not found".to_string()))
    }

    /// Marks every visible unread mention of `user_id` as read, returning how
    /// many changed.
    pub async fn mark_all_read(pool: &SqlitePool, user_id: DbId) -> Result<u64> {
        let query = format!(
            "UPDATE annotation_mentions SET is_read = 1, read_at = ?
             WHERE is_read = 0 AND id IN ({})",
            visible_ids()
        );
        let result = sqlx::query(&query)
            .bind(Utc::now())
            .bind(user_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}
