use std::sync::Arc;
use std::time::Duration;

use crate::services::access_control::AccessControl;
use crate::services::auth_service::AuthService;
use crate::services::ledger_service::LedgerService;
use crate::services::token_service::TokenService;
use crate::store::AccountStore;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn AccountStore>,
    pub tokens: Arc<TokenService>,
    pub auth: AuthService,
    pub access: AccessControl,
    pub ledger: LedgerService,
}

impl AppState {
    pub fn new(
        store: Arc<dyn AccountStore>,
        tokens: Arc<TokenService>,
        auth: AuthService,
        store_timeout: Duration,
    ) -> Self {
        Self {
            access: AccessControl::new(tokens.clone(), store.clone()),
            ledger: LedgerService::new(store.clone(), store_timeout),
            store,
            tokens,
            auth,
        }
    }
}
