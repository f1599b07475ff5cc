use axum::extract::State;
use axum::middleware;
use axum::routing::get;
use axum::{Json, Router};
use http::StatusCode;
use tracing::{error, info};

use crate::errors::AppError;
use crate::extract::{AppJson, AppPath};
use crate::middleware::require_owner;
use crate::models::{Account, CreateAccountRequest, DeletedAccount, UpdateAccountRequest};
use crate::services::account_service;
use crate::state::AppState;

pub fn router(state: AppState) -> Router<AppState> {
    let owned = Router::new()
        .route(
            "/account/:id",
            get(get_account).put(update_account).delete(delete_account),
        )
        .route_layer(middleware::from_fn_with_state(state, require_owner));

    Router::new()
        .route("/account", get(list_accounts).post(create_account))
        .route("/accounts", get(list_accounts))
        .merge(owned)
}

pub async fn create_account(
    State(state): State<AppState>,
    AppJson(data): AppJson<CreateAccountRequest>,
) -> Result<(StatusCode, Json<Account>), AppError> {
    info!("POST /account - Registering new account");
    let account = state
        .auth
        .register(&data.first_name, &data.last_name, &data.password)
        .await
        .map_err(|e| {
            error!("Failed to register account: {}", e);
            e
        })?;
    Ok((StatusCode::CREATED, Json(account)))
}

pub async fn list_accounts(
    State(state): State<AppState>,
) -> Result<Json<Vec<Account>>, AppError> {
    info!("GET /accounts - Fetching all accounts");
    let accounts = account_service::fetch_all(&state.store).await.map_err(|e| {
        error!("Failed to fetch accounts: {}", e);
        e
    })?;
    Ok(Json(accounts))
}

pub async fn get_account(
    State(state): State<AppState>,
    AppPath(id): AppPath<i64>,
) -> Result<Json<Account>, AppError> {
    info!("GET /account/{} - Fetching account", id);
    let account = account_service::fetch_one(&state.store, id).await.map_err(|e| {
        error!("Failed to fetch account {}: {}", id, e);
        e
    })?;
    Ok(Json(account))
}

pub async fn update_account(
    State(state): State<AppState>,
    AppPath(id): AppPath<i64>,
    AppJson(data): AppJson<UpdateAccountRequest>,
) -> Result<Json<&'static str>, AppError> {
    info!("PUT /account/{} - Updating profile", id);
    account_service::update_profile(&state.store, id, data)
        .await
        .map_err(|e| {
            error!("Failed to update account {}: {}", id, e);
            e
        })?;
    Ok(Json("updated"))
}

pub async fn delete_account(
    State(state): State<AppState>,
    AppPath(id): AppPath<i64>,
) -> Result<Json<DeletedAccount>, AppError> {
    info!("DELETE /account/{} - Deleting account", id);
    account_service::delete(&state.store, id).await.map_err(|e| {
        error!("Failed to delete account {}: {}", id, e);
        e
    })?;
    Ok(Json(DeletedAccount { deleted: id }))
}
