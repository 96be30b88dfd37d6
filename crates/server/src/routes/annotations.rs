use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use sqlx::SqlitePool;

use crate::{
    db::{
        annotations::{build_thread, AnnotationNode},
        models::{Annotation, AnnotationMention, DbId, Document},
        AnnotationRepo, MentionRepo, UserRepo,
    },
    error::{AppError, Result},
    middleware::auth::AuthUser,
    services::{
        access::{self, annotatable_document, document_access, Access},
        annotations::{self, AnnotationWithMentions},
    },
    validation::{validated, AssignAnnotation, CreateAnnotation, UpdateAnnotation},
    AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_annotation))
        .route("/assigned", get(list_assigned))
        .route(
            "/:id",
            get(get_annotation)
                .patch(update_annotation)
                .delete(delete_annotation),
        )
        .route("/:id/thread", get(get_thread))
        .route("/:id/mentions", get(list_annotation_mentions))
        .route("/:id/resolve", post(resolve_annotation))
        .route("/:id/reopen", post(reopen_annotation))
        .route("/:id/assign", post(assign_annotation))
}

#[derive(Debug, Serialize)]
pub struct AnnotationsListResponse {
    pub annotations: Vec<Annotation>,
}

#[derive(Debug, Serialize)]
pub struct MentionsListResponse {
    pub mentions: Vec<AnnotationMention>,
}

/// Loads an annotation the caller can see, with its document and the
/// caller's access. Someone else's private annotation is reported as missing.
async fn load_annotation(
    pool: &SqlitePool,
    id: DbId,
    user_id: DbId,
) -> Result<(Annotation, Document, Access)> {
    let annotation = AnnotationRepo::find_by_id(pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Annotation not found".to_string()))?;

    let (document, access) = document_access(pool, annotation.document_id, user_id).await?;

    if annotation.is_private && annotation.author_id != user_id {
        return Err(AppError::NotFound("Annotation not found".to_string()));
    }
    Ok((annotation, document, access))
}

fn require_annotate(access: Access) -> Result<()> {
    if !access.can_annotate() {
        return Err(AppError::Forbidden(
            "Viewers cannot change annotations".to_string(),
        ));
    }
    Ok(())
}

async fn create_annotation(
    State(state): State<AppState>,
    user: AuthUser,
    Json(body): Json<CreateAnnotation>,
) -> Result<Json<AnnotationWithMentions>> {
    let (document, _) = annotatable_document(&state.db.pool, body.document_id, user.id).await?;
    let body = validated(body)?;

    let created = annotations::create(&state.db.pool, &document, user.id, &body).await?;
    Ok(Json(created))
}

async fn get_annotation(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<DbId>,
) -> Result<Json<Annotation>> {
    let (annotation, _, _) = load_annotation(&state.db.pool, id, user.id).await?;
    Ok(Json(annotation))
}

async fn update_annotation(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<DbId>,
    Json(body): Json<UpdateAnnotation>,
) -> Result<Json<AnnotationWithMentions>> {
    let (existing, document, access) = load_annotation(&state.db.pool, id, user.id).await?;
    require_annotate(access)?;
    if existing.author_id != user.id {
        return Err(AppError::Forbidden(
            "Only the author can edit this annotation".to_string(),
        ));
    }

    let body = validated(body)?;
    let updated = annotations::update(&state.db.pool, &document, &existing, user.id, &body).await?;
    Ok(Json(updated))
}

async fn delete_annotation(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<DbId>,
) -> Result<Json<()>> {
    let (annotation, _, access) = load_annotation(&state.db.pool, id, user.id).await?;

    // Only author or document owner can delete
    if annotation.author_id != user.id && !access.is_owner() {
        return Err(AppError::Forbidden(
            "Cannot delete this annotation".to_string(),
        ));
    }

    AnnotationRepo::soft_delete(&state.db.pool, id).await?;
    tracing::info!(annotation_id = id, user_id = user.id, "Annotation deleted");
    Ok(Json(()))
}

async fn get_thread(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<DbId>,
) -> Result<Json<AnnotationNode>> {
    let (annotation, document, _) = load_annotation(&state.db.pool, id, user.id).await?;
    let all = AnnotationRepo::list_for_document(&state.db.pool, document.id, user.id).await?;

    let thread = build_thread(annotation.id, &all)
        .ok_or_else(|| AppError::NotFound("Annotation not found".to_string()))?;
    Ok(Json(thread))
}

async fn list_annotation_mentions(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<DbId>,
) -> Result<Json<MentionsListResponse>> {
    let (annotation, _, _) = load_annotation(&state.db.pool, id, user.id).await?;
    let mentions = MentionRepo::for_annotation(&state.db.pool, annotation.id).await?;
    Ok(Json(MentionsListResponse { mentions }))
}

async fn resolve_annotation(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<DbId>,
) -> Result<Json<Annotation>> {
    let (_, _, access) = load_annotation(&state.db.pool, id, user.id).await?;
    require_annotate(access)?;

    let annotation = AnnotationRepo::resolve(&state.db.pool, id, user.id).await?;
    tracing::info!(annotation_id = id, resolved_by = user.id, "Annotation resolved");
    Ok(Json(annotation))
}

async fn reopen_annotation(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<DbId>,
) -> Result<Json<Annotation>> {
    let (_, _, access) = load_annotation(&state.db.pool, id, user.id).await?;
    require_annotate(access)?;

    let annotation = AnnotationRepo::reopen(&state.db.pool, id).await?;
    Ok(Json(annotation))
}

async fn assign_annotation(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<DbId>,
    Json(body): Json<AssignAnnotation>,
) -> Result<Json<Annotation>> {
    let (_, document, access) = load_annotation(&state.db.pool, id, user.id).await?;
    require_annotate(access)?;

    if let Some(assignee) = body.assigned_to {
        UserRepo::require(&state.db.pool, assignee, "Assigned").await?;
        if !access::can_view_owner(&state.db.pool, document.user_id, assignee).await? {
            return Err(AppError::invalid(
                "assigned_to",
                "Assignee cannot see this document",
            ));
        }
    }

    let annotation =
        AnnotationRepo::assign(&state.db.pool, id, body.assigned_to, body.due_date).await?;
    Ok(Json(annotation))
}

async fn list_assigned(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<AnnotationsListResponse>> {
    let annotations = AnnotationRepo::list_assigned(&state.db.pool, user.id).await?;
    Ok(Json(AnnotationsListResponse { annotations }))
}
