use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use tracing::{error, info};

use crate::errors::AppError;
use crate::extract::AppJson;
use crate::models::{LoginRequest, LoginResponse};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/login", post(login))
}

pub async fn login(
    State(state): State<AppState>,
    AppJson(data): AppJson<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    info!("POST /login - Login attempt for account number {}", data.number);
    let account = state.auth.authenticate(data.number, &data.password).await?;

    let token = state.tokens.issue(&account).map_err(|e| {
        error!("Failed to issue token for account {}: {}", account.number, e);
        AppError::Internal(e.to_string())
    })?;

    Ok(Json(LoginResponse {
        number: account.number,
        token,
    }))
}
