use axum::{
    extract::DefaultBodyLimit, middleware as axum_middleware, routing::get, Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod services;
pub mod validation;

use services::storage::StorageService;

/// Room for multipart boundaries and the text fields sent with a file.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub db: db::Database,
    pub config: config::Config,
    pub storage: StorageService,
}

pub fn build_router(state: AppState) -> Router {
    // Build protected routes (require authentication)
    let protected_routes = Router::new()
        .nest("/users", routes::users::router())
        .nest("/plans", routes::plans::router())
        .nest("/collaborators", routes::collaborators::router())
        .nest("/documents", routes::documents::router())
        .nest("/annotations", routes::annotations::router())
        .nest("/mentions", routes::mentions::router())
        .nest("/tags", routes::tags::router())
        .nest("/timeline", routes::timeline::router())
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::auth_middleware,
        ));

    // Build API router
    let api_router = Router::new()
        .nest("/auth", routes::auth::router())
        .nest("/certificates", routes::certificates::router())
        .merge(protected_routes);

    let body_limit = state.config.max_upload_bytes + MULTIPART_OVERHEAD;

    Router::new()
        .route("/health", get(health_check))
        .nest("/api", api_router)
        .with_state(state)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
}

async fn health_check() -> &'static str {
    "OK"
}
