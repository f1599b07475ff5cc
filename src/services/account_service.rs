use std::sync::Arc;

use tracing::info;

use crate::errors::AppError;
use crate::models::{Account, UpdateAccountRequest};
use crate::services::auth_service::validate_profile;
use crate::store::AccountStore;

pub async fn fetch_all(store: &Arc<dyn AccountStore>) -> Result<Vec<Account>, AppError> {
    store.list().await
}

pub async fn fetch_one(store: &Arc<dyn AccountStore>, id: i64) -> Result<Account, AppError> {
    store.get_by_id(id).await
}

pub async fn update_profile(
    store: &Arc<dyn AccountStore>,
    id: i64,
    input: UpdateAccountRequest,
) -> Result<Account, AppError> {
    let (first_name, last_name) = validate_profile(&input.first_name, &input.last_name)?;
    let mut account = store.get_by_id(id).await?;
    account.first_name = first_name;
    account.last_name = last_name;
    let updated = store.update_profile(&account).await?;
    info!("Updated profile of account {}", id);
    Ok(updated)
}

pub async fn delete(store: &Arc<dyn AccountStore>, id: i64) -> Result<(), AppError> {
    store.delete(id).await?;
    info!("Deleted account {}", id);
    Ok(())
}
