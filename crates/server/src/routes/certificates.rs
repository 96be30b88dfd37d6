use axum::{extract::Path, routing::get, Json, Router};

use crate::{
    error::{AppError, Result},
    services::certificates::{self, Certificate},
    AppState,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/:code", get(verify_certificate))
}

async fn verify_certificate(Path(code): Path<String>) -> Result<Json<&'static Certificate>> {
    match certificates::lookup(&code) {
        Some(cert) => Ok(Json(cert)),
        None => {
            tracing::debug!(code = %code, "Certificate lookup miss");
            Err(AppError::NotFound(format!("Certificate {code} not found")))
        }
    }
}
