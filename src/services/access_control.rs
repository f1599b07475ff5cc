use std::sync::Arc;

use tracing::warn;

use crate::errors::AppError;
use crate::models::Account;
use crate::services::token_service::TokenService;
use crate::store::AccountStore;

/// Ownership checks for protected routes.
///
/// A token only authorizes actions on the account it was issued for. Every failure is
/// reported as `Forbidden`, except a store outage which stays `StoreUnavailable` so the
/// caller knows it may retry; either way the protected operation never runs.
#[derive(Clone)]
pub struct AccessControl {
    tokens: Arc<TokenService>,
    store: Arc<dyn AccountStore>,
}

impl AccessControl {
    pub fn new(tokens: Arc<TokenService>, store: Arc<dyn AccountStore>) -> Self {
        Self { tokens, store }
    }

    /// Verify the token and return the account number it carries.
    pub fn authenticate(&self, token: Option<&str>) -> Result<i64, AppError> {
        let token = token.filter(|t| !t.is_empty()).ok_or_else(|| {
            warn!("Request without token");
            AppError::Forbidden
        })?;
        self.tokens.verify(token).map_err(|e| {
            warn!("Token rejected: {}", e);
            AppError::Forbidden
        })
    }

    /// Verify the token and check it belongs to the account identified by `path_id`.
    pub async fn authorize(&self, token: Option<&str>, path_id: i64) -> Result<Account, AppError> {
        let token_number = self.authenticate(token)?;

        let account = match self.store.get_by_id(path_id).await {
            Ok(account) => account,
            Err(AppError::StoreUnavailable(reason)) => return Err(AppError::StoreUnavailable(reason)),
            Err(e) => {
                warn!("Access to account {} denied: {}", path_id, e);
                return Err(AppError::Forbidden);
            }
        };

        if account.number != token_number {
            warn!(
                "Token for account number {} used on account {}",
                token_number, path_id
            );
            return Err(AppError::Forbidden);
        }
        Ok(account)
    }
}
