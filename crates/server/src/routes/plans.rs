use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use serde::Serialize;

use crate::{
    db::{
        models::{DbId, Plan},
        PlanRepo,
    },
    error::{AppError, Result},
    middleware::auth::AuthUser,
    services::quota::{self, Usage},
    validation::{validated, CreatePlan},
    AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_plans).post(create_plan))
        .route("/usage", get(get_usage))
        .route("/:id", get(get_plan))
}

#[derive(Debug, Serialize)]
pub struct PlansListResponse {
    pub plans: Vec<Plan>,
}

#[derive(Debug, Serialize)]
pub struct UsageResponse {
    pub plan: Plan,
    pub usage: Usage,
    /// Largest upload currently accepted for this user, in bytes.
    pub upload_limit: i64,
}

async fn list_plans(State(state): State<AppState>, _user: AuthUser) -> Result<Json<PlansListResponse>> {
    let plans = PlanRepo::list(&state.db.pool).await?;
    Ok(Json(PlansListResponse { plans }))
}

async fn create_plan(
    State(state): State<AppState>,
    user: AuthUser,
    Json(body): Json<CreatePlan>,
) -> Result<Json<Plan>> {
    let body = validated(body)?;
    let plan = PlanRepo::create(&state.db.pool, &body).await?;
    tracing::info!(plan_id = plan.id, name = %plan.name, created_by = user.id, "Plan created");
    Ok(Json(plan))
}

async fn get_plan(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<DbId>,
) -> Result<Json<Plan>> {
    let plan = PlanRepo::find_by_id(&state.db.pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Plan not found".to_string()))?;
    Ok(Json(plan))
}

async fn get_usage(State(state): State<AppState>, user: AuthUser) -> Result<Json<UsageResponse>> {
    let plan = PlanRepo::for_user(&state.db.pool, user.id).await?;
    let usage = PlanRepo::usage_for_user(&state.db.pool, user.id).await?;
    let upload_limit = quota::effective_upload_limit(&plan, state.config.max_upload_bytes);
    Ok(Json(UsageResponse {
        plan,
        usage,
        upload_limit,
    }))
}
