use axum::{
    extract::State,
    routing::{get, put},
    Json, Router,
};
use serde::Serialize;

use crate::{
    db::{
        models::{Plan, User, UserSummary},
        UserRepo,
    },
    error::{AppError, Result},
    middleware::auth::AuthUser,
    validation::{validated, ChangePlan, UpdateProfile},
    AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_users))
        .route("/me", get(get_me).patch(update_me))
        .route("/me/plan", put(change_plan))
}

#[derive(Debug, Serialize)]
pub struct UsersListResponse {
    pub users: Vec<UserSummary>,
}

#[derive(Debug, Serialize)]
pub struct PlanChangeResponse {
    pub user: User,
    pub plan: Plan,
}

async fn list_users(State(state): State<AppState>, _user: AuthUser) -> Result<Json<UsersListResponse>> {
    let users = UserRepo::list_summaries(&state.db.pool).await?;
    Ok(Json(UsersListResponse { users }))
}

async fn get_me(State(state): State<AppState>, user: AuthUser) -> Result<Json<User>> {
    let user = UserRepo::find_by_id(&state.db.pool, user.id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
    Ok(Json(user))
}

async fn update_me(
    State(state): State<AppState>,
    user: AuthUser,
    Json(body): Json<UpdateProfile>,
) -> Result<Json<User>> {
    let body = validated(body)?;
    let user = UserRepo::update_profile(&state.db.pool, user.id, &body).await?;
    Ok(Json(user))
}

async fn change_plan(
    State(state): State<AppState>,
    user: AuthUser,
    Json(body): Json<ChangePlan>,
) -> Result<Json<PlanChangeResponse>> {
    let (user, plan) = UserRepo::change_plan(&state.db.pool, user.id, body.plan_id).await?;
    Ok(Json(PlanChangeResponse { user, plan }))
}
