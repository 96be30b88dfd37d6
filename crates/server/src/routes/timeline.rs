use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::Serialize;

use crate::{
    db::{
        models::{DbId, TimelineEvent},
        timeline::TimelineFilter,
        TimelineRepo,
    },
    error::{AppError, Result},
    middleware::auth::AuthUser,
    validation::{validated, CreateTimelineEvent, UpdateTimelineEvent},
    AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_events).post(create_event))
        .route(
            "/:id",
            get(get_event).patch(update_event).delete(delete_event),
        )
}

#[derive(Debug, Serialize)]
pub struct TimelineResponse {
    pub events: Vec<TimelineEvent>,
}

async fn list_events(
    State(state): State<AppState>,
    user: AuthUser,
    Query(filter): Query<TimelineFilter>,
) -> Result<Json<TimelineResponse>> {
    let events = TimelineRepo::list_for_user(&state.db.pool, user.id, &filter).await?;
    Ok(Json(TimelineResponse { events }))
}

async fn create_event(
    State(state): State<AppState>,
    user: AuthUser,
    Json(body): Json<CreateTimelineEvent>,
) -> Result<Json<TimelineEvent>> {
    let body = validated(body)?;
    let event = TimelineRepo::create(&state.db.pool, user.id, &body).await?;
    Ok(Json(event))
}

async fn get_event(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<DbId>,
) -> Result<Json<TimelineEvent>> {
    let event = TimelineRepo::find_for_user(&state.db.pool, id, user.id)
        .await?
        .ok_or_else(|| AppError::NotFound("Timeline event not found".to_string()))?;
    Ok(Json(event))
}

async fn update_event(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<DbId>,
    Json(body): Json<UpdateTimelineEvent>,
) -> Result<Json<TimelineEvent>> {
    let body = validated(body)?;
    let event = TimelineRepo::update(&state.db.pool, id, user.id, &body).await?;
    Ok(Json(event))
}

async fn delete_event(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<DbId>,
) -> Result<Json<()>> {
    if !TimelineRepo::soft_delete(&state.db.pool, id, user.id).await? {
        return Err(AppError::NotFound("Timeline event not found".to_string()));
    }
    Ok(Json(()))
}
