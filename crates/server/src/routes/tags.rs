use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::{
    db::{
        models::{DbId, Tag},
        TagRepo,
    },
    error::{AppError, Result},
    middleware::auth::AuthUser,
    validation::{validated, CreateTag, UpdateTag},
    AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_tags).post(create_tag))
        .route("/:id", get(get_tag).patch(update_tag))
}

#[derive(Debug, Deserialize)]
pub struct TagsQuery {
    pub category: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TagsListResponse {
    pub tags: Vec<Tag>,
}

async fn list_tags(
    State(state): State<AppState>,
    _user: AuthUser,
    Query(query): Query<TagsQuery>,
) -> Result<Json<TagsListResponse>> {
    let tags = TagRepo::list(&state.db.pool, query.category.as_deref()).await?;
    Ok(Json(TagsListResponse { tags }))
}

async fn create_tag(
    State(state): State<AppState>,
    user: AuthUser,
    Json(body): Json<CreateTag>,
) -> Result<Json<Tag>> {
    let body = validated(body)?;
    let tag = TagRepo::create(&state.db.pool, user.id, &body).await?;
    Ok(Json(tag))
}

async fn get_tag(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<DbId>,
) -> Result<Json<Tag>> {
    let tag = TagRepo::find_by_id(&state.db.pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Tag not found".to_string()))?;
    Ok(Json(tag))
}

async fn update_tag(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<DbId>,
    Json(body): Json<UpdateTag>,
) -> Result<Json<Tag>> {
    let tag = TagRepo::find_by_id(&state.db.pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Tag not found".to_string()))?;

    if tag.is_system_tag || tag.created_by != Some(user.id) {
        return Err(AppError::Forbidden(
            "Only the creator can edit this tag".to_string(),
        ));
    }

    let body = validated(body)?;
    let tag = TagRepo::update(&state.db.pool, id, &body).await?;
    Ok(Json(tag))
}
