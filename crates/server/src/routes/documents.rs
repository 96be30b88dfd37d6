use axum::{
    extract::{multipart::MultipartError, Multipart, Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, NaiveDate, Utc};
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use serde::{Deserialize, Serialize};

use crate::{
    db::{
        annotations::{build_forest, AnnotationNode},
        documents::DocumentFilter,
        models::{Annotation, DbId, Document, DocumentMetadata},
        AnnotationRepo, DocumentRepo,
    },
    error::{AppError, Result},
    middleware::auth::AuthUser,
    services::{
        access::{self, document_access},
        uploads::{self, UploadedFile},
    },
    validation::{validated, DocumentFields, UpdateDocument},
    AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_documents).post(upload_document))
        .route(
            "/:id",
            get(get_document)
                .patch(update_document)
                .delete(delete_document),
        )
        .route("/:id/content", get(get_document_content))
        .route("/:id/annotations", get(list_document_annotations))
}

#[derive(Debug, Serialize)]
pub struct DocumentListResponse {
    pub documents: Vec<Document>,
}

#[derive(Debug, Deserialize)]
pub struct AnnotationsQuery {
    #[serde(default)]
    pub threaded: bool,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum AnnotationsListResponse {
    Flat { annotations: Vec<Annotation> },
    Threaded { threads: Vec<AnnotationNode> },
}

async fn list_documents(
    State(state): State<AppState>,
    user: AuthUser,
    Query(filter): Query<DocumentFilter>,
) -> Result<Json<DocumentListResponse>> {
    let documents = DocumentRepo::list_accessible(&state.db.pool, user.id, &filter).await?;
    Ok(Json(DocumentListResponse { documents }))
}

fn multipart_error(e: MultipartError, limit: usize) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(limit)
    } else {
        AppError::BadRequest(format!("Failed to read multipart field: {e}"))
    }
}

/// Accepts RFC 3339 timestamps or plain `YYYY-MM-DD` dates (midnight UTC).
pub fn parse_date(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

async fn upload_document(
    State(state): State<AppState>,
    user: AuthUser,
    mut multipart: Multipart,
) -> Result<Json<Document>> {
    let limit = state.config.max_upload_bytes;
    let mut file: Option<UploadedFile> = None;
    let mut fields = DocumentFields::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, limit))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let original_name = field
                    .file_name()
                    .map(str::to_string)
                    .ok_or_else(|| AppError::invalid("file", "File field missing filename"))?;
                let content_type = field.content_type().map(str::to_string);
                let data = field.bytes().await.map_err(|e| multipart_error(e, limit))?;
                file = Some(UploadedFile {
                    original_name,
                    content_type,
                    data,
                });
            }
            "category" => {
                fields.category = field.text().await.map_err(|e| multipart_error(e, limit))?;
            }
            "institution" => {
                let text = field.text().await.map_err(|e| multipart_error(e, limit))?;
                fields.institution = Some(text).filter(|t| !t.trim().is_empty());
            }
            "document_date" => {
                let text = field.text().await.map_err(|e| multipart_error(e, limit))?;
                if !text.trim().is_empty() {
                    let date = parse_date(&text).ok_or_else(|| {
                        AppError::invalid("document_date", "Expected YYYY-MM-DD or an RFC 3339 timestamp")
                    })?;
                    fields.document_date = Some(date);
                }
            }
            "metadata" => {
                let text = field.text().await.map_err(|e| multipart_error(e, limit))?;
                if !text.trim().is_empty() {
                    let metadata: DocumentMetadata = serde_json::from_str(&text).map_err(|e| {
                        AppError::invalid("metadata", format!("Invalid metadata JSON: {e}"))
                    })?;
                    fields.metadata = Some(metadata);
                }
            }
            other => {
                tracing::debug!(field = other, "Ignoring unknown upload field");
            }
        }
    }

    let file = file.ok_or_else(|| AppError::invalid("file", "A file is required"))?;

    let document = uploads::accept_upload(
        &state.db.pool,
        &state.storage,
        limit,
        user.id,
        file,
        fields,
    )
    .await?;

    Ok(Json(document))
}

async fn get_document(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<DbId>,
) -> Result<Json<Document>> {
    let (document, _) = document_access(&state.db.pool, id, user.id).await?;
    Ok(Json(document))
}

async fn update_document(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<DbId>,
    Json(body): Json<UpdateDocument>,
) -> Result<Json<Document>> {
    let (_, access) = document_access(&state.db.pool, id, user.id).await?;
    access::require_owner(access, "edit")?;

    let body = validated(body)?;
    let document = DocumentRepo::update(&state.db.pool, id, &body).await?;
    Ok(Json(document))
}

async fn delete_document(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<DbId>,
) -> Result<Json<()>> {
    let (_, access) = document_access(&state.db.pool, id, user.id).await?;
    access::require_owner(access, "delete")?;

    DocumentRepo::soft_delete(&state.db.pool, id).await?;
    tracing::info!(document_id = id, user_id = user.id, "Document deleted");
    Ok(Json(()))
}

fn content_type_for(file_type: &str) -> &'static str {
    match file_type {
        "pdf" => "application/pdf",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "xls" => "application/vnd.ms-excel",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "tif" | "tiff" => "image/tiff",
        "txt" => "text/plain; charset=utf-8",
        _ => "application/octet-stream",
    }
}

/// `attachment` disposition carrying the uploaded name: an ASCII fallback in
/// `filename` and the exact UTF-8 name in `filename*` (RFC 5987).
pub fn content_disposition(original_name: &str) -> String {
    let fallback: String = original_name
        .chars()
        .filter(|c| c.is_ascii_graphic() || *c == ' ')
        .filter(|c| !matches!(c, '"' | '\\'))
        .take(128)
        .collect();
    let fallback = match fallback.trim() {
        "" => "document",
        name => name,
    };
    let encoded = utf8_percent_encode(original_name, NON_ALPHANUMERIC);
    format!("attachment; filename=\"{fallback}\"; filename*=UTF-8''{encoded}")
}

async fn get_document_content(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<DbId>,
) -> Result<Response> {
    let (document, _) = document_access(&state.db.pool, id, user.id).await?;
    let data = state
        .storage
        .read(document.user_id, &document.filename)
        .await?;

    Ok((
        [
            (header::CONTENT_TYPE, content_type_for(&document.file_type).to_string()),
            (
                header::CONTENT_DISPOSITION,
                content_disposition(&document.original_name),
            ),
        ],
        data,
    )
        .into_response())
}

async fn list_document_annotations(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<DbId>,
    Query(query): Query<AnnotationsQuery>,
) -> Result<Json<AnnotationsListResponse>> {
    let (document, _) = document_access(&state.db.pool, id, user.id).await?;
    let annotations = AnnotationRepo::list_for_document(&state.db.pool, document.id, user.id).await?;

    let response = if query.threaded {
        AnnotationsListResponse::Threaded {
            threads: build_forest(&annotations),
        }
    } else {
        AnnotationsListResponse::Flat { annotations }
    };
    Ok(Json(response))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dates_in_both_forms() {
        let d = parse_date("2024-03-05").unwrap();
        assert_eq!(d.to_rfc3339(), "2024-03-05T00:00:00+00:00");
        let t = parse_date("2024-03-05T10:30:00+03:00").unwrap();
        assert_eq!(t.to_rfc3339(), "2024-03-05T07:30:00+00:00");
        assert!(parse_date("05.03.2024").is_none());
    }

    #[test]
    fn disposition_keeps_uploaded_name() {
        let value = content_disposition("bilirkişi raporu.pdf");
        assert!(value.starts_with("attachment; filename=\"bilirkii raporu.pdf\";"));
        assert!(value.ends_with("filename*=UTF-8''bilirki%C5%9Fi%20raporu%2Epdf"));

        let value = content_disposition("a\"b.pdf");
        assert!(value.contains("filename=\"ab.pdf\""));
        assert!(!value.contains("a\"b"));

        assert!(content_disposition("şğ").contains("filename=\"document\""));
    }

    #[test]
    fn known_content_types() {
        assert_eq!(content_type_for("pdf"), "application/pdf");
        assert_eq!(content_type_for("zzz"), "application/octet-stream");
    }
}
