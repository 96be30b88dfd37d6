use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::{
    db::{
        models::{AnnotationMention, DbId, MentionDetail},
        MentionRepo,
    },
    error::Result,
    middleware::auth::AuthUser,
    AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_mentions))
        .route("/unread-count", get(unread_count))
        .route("/read-all", post(mark_all_read))
        .route("/:id/read", post(mark_read))
}

#[derive(Debug, Deserialize)]
pub struct MentionsQuery {
    #[serde(default)]
    pub unread: bool,
}

#[derive(Debug, Serialize)]
pub struct MentionsListResponse {
    pub mentions: Vec<MentionDetail>,
}

#[derive(Debug, Serialize)]
pub struct CountResponse {
    pub count: i64,
}

#[derive(Debug, Serialize)]
pub struct MarkedResponse {
    pub marked: u64,
}

async fn list_mentions(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<MentionsQuery>,
) -> Result<Json<MentionsListResponse>> {
    let mentions = MentionRepo::list_for_user(&state.db.pool, user.id, query.unread).await?;
    Ok(Json(MentionsListResponse { mentions }))
}

async fn unread_count(State(state): State<AppState>, user: AuthUser) -> Result<Json<CountResponse>> {
    let count = MentionRepo::unread_count(&state.db.pool, user.id).await?;
    Ok(Json(CountResponse { count }))
}

async fn mark_read(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<DbId>,
) -> Result<Json<AnnotationMention>> {
    let mention = MentionRepo::mark_read(&state.db.pool, id, user.id).await?;
    Ok(Json(mention))
}

async fn mark_all_read(State(state): State<AppState>, user: AuthUser) -> Result<Json<MarkedResponse>> {
    let marked = MentionRepo::mark_all_read(&state.db.pool, user.id).await?;
    Ok(Json(MarkedResponse { marked }))
}
