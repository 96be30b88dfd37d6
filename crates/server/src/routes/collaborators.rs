use axum::{
    extract::{Path, State},
    routing::{delete, get},
    Json, Router,
};
use serde::Serialize;

use crate::{
    db::{
        models::{Collaborator, DbId},
        CollaboratorRepo, UserRepo,
    },
    error::{AppError, Result},
    middleware::auth::AuthUser,
    validation::{validated, AddCollaborator},
    AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_collaborators).post(add_collaborator))
        .route("/:user_id", delete(remove_collaborator))
}

#[derive(Debug, Serialize)]
pub struct CollaboratorsListResponse {
    pub collaborators: Vec<Collaborator>,
}

async fn list_collaborators(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<CollaboratorsListResponse>> {
    let collaborators = CollaboratorRepo::list_for_owner(&state.db.pool, user.id).await?;
    Ok(Json(CollaboratorsListResponse { collaborators }))
}

async fn add_collaborator(
    State(state): State<AppState>,
    user: AuthUser,
    Json(body): Json<AddCollaborator>,
) -> Result<Json<Collaborator>> {
    let body = validated(body)?;

    let target = UserRepo::find_by_email(&state.db.pool, &body.email)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    let collaborator =
        CollaboratorRepo::grant(&state.db.pool, user.id, target.id, body.role).await?;

    Ok(Json(collaborator))
}

async fn remove_collaborator(
    State(state): State<AppState>,
    user: AuthUser,
    Path(user_id): Path<DbId>,
) -> Result<Json<()>> {
    if !CollaboratorRepo::revoke(&state.db.pool, user.id, user_id).await? {
        return Err(AppError::NotFound("Collaborator not found".to_string()));
    }
    tracing::info!(owner_id = user.id, collaborator_id = user_id, "Collaborator removed");
    Ok(Json(()))
}
