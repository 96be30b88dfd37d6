//! Accepting an uploaded document: size caps, plan quota, payload storage,
//! and the metadata row.

use axum::body::Bytes;
use sqlx::SqlitePool;

use super::quota;
use super::storage::{base_name, file_extension, StorageService};
use crate::db::models::{DbId, Document, NewDocument};
use crate::db::{DocumentRepo, PlanRepo};
use crate::error::{AppError, Result};
use crate::validation::{validated, DocumentFields};

#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub original_name: String,
    pub content_type: Option<String>,
    pub data: Bytes,
}

/// Short type label for a file: its extension, else the MIME subtype.
pub fn file_type(original_name: &str, content_type: Option<&str>) -> String {
    if let Some(ext) = file_extension(original_name) {
        return ext;
    }
    content_type
        .and_then(|ct| ct.split('/').nth(1))
        .map(|sub| sub.split(';').next().unwrap_or(sub).trim().to_ascii_lowercase())
        .filter(|sub| !sub.is_empty())
        .unwrap_or_else(|| "bin".to_string())
}

/// Stores `file` for `user_id` and records it as a document.
///
/// Rejections, in order: invalid fields, payload above the upload layer's
/// `upload_cap`, then the owner's plan limits. The payload is written before
/// the row is inserted and removed again if the insert is refused.
pub async fn accept_upload(
    pool: &SqlitePool,
    storage: &StorageService,
    upload_cap: usize,
    user_id: DbId,
    file: UploadedFile,
    fields: DocumentFields,
) -> Result<Document> {
    let fields = validated(fields)?;

    if file.data.len() > upload_cap {
        return Err(AppError::PayloadTooLarge(upload_cap));
    }
    let file_size = i64::try_from(file.data.len())
        .map_err(|_| AppError::PayloadTooLarge(upload_cap))?;

    let plan = PlanRepo::for_user(pool, user_id).await?;
    let usage = PlanRepo::usage_for_user(pool, user_id).await?;
    if let Err(exceeded) = quota::check_new_document(&plan, &usage, file_size) {
        tracing::warn!(user_id, plan = %plan.name, limit = %exceeded.limit, "Upload rejected by plan quota");
        return Err(exceeded.into());
    }

    let original_name = base_name(&file.original_name);
    let stored = StorageService::stored_name(&original_name);
    storage.write(user_id, &stored, &file.data).await?;

    let new_document = NewDocument {
        filename: stored.clone(),
        file_type: file_type(&original_name, file.content_type.as_deref()),
        original_name,
        file_size,
        category: fields.category.trim().to_string(),
        institution: fields.institution,
        document_date: fields.document_date,
        metadata: fields.metadata,
        user_id,
    };

    match DocumentRepo::create(pool, &new_document).await {
        Ok(document) => {
            tracing::info!(
                document_id = document.id,
                user_id,
                file_size,
                file_type = %document.file_type,
                "Document uploaded"
            );
            Ok(document)
        }
        Err(e) => {
            if let Err(cleanup) = storage.delete(user_id, &stored).await {
                tracing::error!(error = %cleanup, "Failed to remove rejected upload");
            }
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_type_prefers_extension() {
        assert_eq!(file_type("bilirkişi raporu.PDF", Some("application/octet-stream")), "pdf");
        assert_eq!(file_type("scan", Some("image/jpeg")), "jpeg");
        assert_eq!(file_type("scan", Some("text/plain; charset=utf-8")), "plain");
        assert_eq!(file_type("scan", None), "bin");
    }
}
