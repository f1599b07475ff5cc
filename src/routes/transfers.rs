use axum::extract::State;
use axum::middleware;
use axum::routing::post;
use axum::{Extension, Json, Router};
use tracing::{error, info};

use crate::errors::AppError;
use crate::extract::AppJson;
use crate::middleware::require_token;
use crate::models::{AuthenticatedAccount, TransferReceipt, TransferRequest};
use crate::state::AppState;

pub fn router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/transfer", post(transfer))
        .route_layer(middleware::from_fn_with_state(state, require_token))
}

/// The caller's own account is always the source.
pub async fn transfer(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthenticatedAccount>,
    AppJson(data): AppJson<TransferRequest>,
) -> Result<Json<TransferReceipt>, AppError> {
    info!(
        "POST /transfer - {} -> {} amount {}",
        caller.number, data.to_account, data.amount
    );
    let receipt = state
        .ledger
        .transfer(caller.number, data.to_account, data.amount)
        .await
        .map_err(|e| {
            error!("Transfer from {} failed: {}", caller.number, e);
            e
        })?;
    Ok(Json(receipt))
}
