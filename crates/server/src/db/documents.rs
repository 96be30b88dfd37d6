//! Repository for the `documents` table. Soft-deleted rows are invisible to
//! every query here and do not count toward the owner's quota.

use chrono::Utc;
use serde::Deserialize;
use sqlx::{types::Json, SqlitePool};

use super::models::{DbId, Document, NewDocument};
use super::plans::PlanRepo;
use crate::error::{AppError, Result};
use crate::services::quota::{self, QuotaExceeded, QuotaLimit};
use crate::validation::UpdateDocument;

const COLUMNS: &str = "id, filename, original_name, file_type, file_size, upload_date, category, \
                       institution, document_date, metadata, user_id, deleted_at";

#[derive(Debug, Default, Deserialize)]
pub struct DocumentFilter {
    pub category: Option<String>,
    /// Only documents the caller owns, not ones shared with them.
    #[serde(default)]
    pub owned: bool,
}

pub struct DocumentRepo;

impl DocumentRepo {
    /// Inserts a document if the owner's plan allows it.
    ///
    /// The size and count limits are part of the `INSERT ... SELECT` guard, so
    /// two concurrent uploads cannot both take the last slot. When the guard
    /// rejects the row the limits are re-read to report which one was hit.
    pub async fn create(pool: &SqlitePool, input: &NewDocument) -> Result<Document> {
        let query = format!(
            r#"
            INSERT INTO documents (filename, original_name, file_type, file_size, upload_date,
                                   category, institution, document_date, metadata, user_id)
            SELECT ?, ?, ?, ?, ?, ?, ?, ?, ?, u.id
            FROM users u
            JOIN plans p ON p.id = u.plan_id
            WHERE u.id = ?
              AND ? <= p.max_file_size
              AND (SELECT COUNT(*) FROM documents d
                   WHERE d.user_id = u.id AND d.deleted_at IS NULL) < p.max_documents
            RETURNING {COLUMNS}
            "#
        );

        let inserted = sqlx::query_as::<_, Document>(&query)
            .bind(&input.filename)
            .bind(&input.original_name)
            .bind(&input.file_type)
            .bind(input.file_size)
            .bind(Utc::now())
            .bind(&input.category)
            .bind(&input.institution)
            .bind(input.document_date)
            .bind(input.metadata.as_ref().map(Json))
            .bind(input.user_id)
            .bind(input.file_size)
            .fetch_optional(pool)
            .await?;

        match inserted {
            Some(document) => Ok(document),
            None => {
                let plan = PlanRepo::for_user(pool, input.user_id).await?;
                let usage = PlanRepo::usage_for_user(pool, input.user_id).await?;
                quota::check_new_document(&plan, &usage, input.file_size)?;
                // Limits look fine now; another upload won the race for the last slot.
                Err(QuotaExceeded {
                    limit: QuotaLimit::Documents,
                    max: plan.max_documents,
                    actual: plan.max_documents + 1,
                }
                .into())
            }
        }
    }

    pub async fn find_by_id(pool: &SqlitePool, id: DbId) -> Result<Option<Document>> {
        let query = format!("SELECT {COLUMNS} FROM documents WHERE id = ? AND deleted_at IS NULL");
        Ok(sqlx::query_as::<_, Document>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await?)
    }

    /// Documents the user owns plus those of owners who granted them access,
    /// newest upload first.
    pub async fn list_accessible(
        pool: &SqlitePool,
        user_id: DbId,
        filter: &DocumentFilter,
    ) -> Result<Vec<Document>> {
        let query = format!(
            r#"
            SELECT {COLUMNS} FROM documents
            WHERE deleted_at IS NULL
              AND (user_id = ?
                   OR (? = 0 AND user_id IN (SELECT owner_id FROM collaborators WHERE collaborator_id = ?)))
              AND (? IS NULL OR category = ?)
            ORDER BY upload_date DESC, id DESC
            "#
        );
        Ok(sqlx::query_as::<_, Document>(&query)
            .bind(user_id)
            .bind(filter.owned)
            .bind(user_id)
            .bind(&filter.category)
            .bind(&filter.category)
            .fetch_all(pool)
            .await?)
    }

    /// Partial update of the descriptive fields.
    pub async fn update(pool: &SqlitePool, id: DbId, input: &UpdateDocument) -> Result<Document> {
        let query = format!(
            "UPDATE documents SET
                category = COALESCE(?, category),
                institution = COALESCE(?, institution),
                document_date = COALESCE(?, document_date),
                metadata = COALESCE(?, metadata)
             WHERE id = ? AND deleted_at IS NULL
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Document>(&query)
            .bind(input.category.as_deref().map(str::trim))
            .bind(&input.institution)
            .bind(input.document_date)
            .bind(input.metadata.as_ref().map(Json))
            .bind(id)
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Document not found".to_string()))
    }

    /// Marks a document deleted. Returns `false` if it was already gone.
    pub async fn soft_delete(pool: &SqlitePool, id: DbId) -> Result<bool> {
        let result =
            sqlx::query("UPDATE documents SET deleted_at = ? WHERE id = ? AND deleted_at IS NULL")
                .bind(Utc::now())
                .bind(id)
                .execute(pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }
}
