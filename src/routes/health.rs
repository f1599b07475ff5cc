use axum::{extract::State, routing::get, Json, Router};
use serde_json::{json, Value};
use tracing::{error, info};

use crate::errors::AppError;
use crate::state::AppState;

const SERVICE_NAME: &str = "bank-backend";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(liveness))
        .route("/ready", get(readiness))
}

async fn liveness() -> Json<Value> {
    info!("GET /health - Liveness check");
    Json(json!({ "status": "ok", "service": SERVICE_NAME }))
}

/// 200 once the account store answers, otherwise the store's own error status.
async fn readiness(State(state): State<AppState>) -> Result<Json<Value>, AppError> {
    info!("GET /health/ready - Checking account store");
    state.store.ping().await.map_err(|e| {
        error!("Account store is not ready: {}", e);
        e
    })?;
    Ok(Json(json!({ "status": "ready", "service": SERVICE_NAME })))
}
