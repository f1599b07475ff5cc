use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::error;

use crate::db::account_queries;
use crate::errors::AppError;
use crate::models::{Account, NewAccount};

use super::{account_id_not_found, account_number_not_found, ensure_non_negative, AccountStore, AccountTx};

#[derive(Clone)]
pub struct PgAccountStore {
    pool: PgPool,
}

impl PgAccountStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

#[async_trait]
impl AccountStore for PgAccountStore {
    async fn create(&self, account: NewAccount) -> Result<Account, AppError> {
        ensure_non_negative(account.balance)?;
        let created = account_queries::insert(&self.pool, &account).await?;
        Ok(created)
    }

    async fn delete(&self, id: i64) -> Result<(), AppError> {
        match account_queries::delete(&self.pool, id).await? {
            0 => Err(account_id_not_found(id)),
            _ => Ok(()),
        }
    }

    async fn update_profile(&self, account: &Account) -> Result<Account, AppError> {
        account_queries::update_profile(&self.pool, account.id, &account.first_name, &account.last_name)
            .await?
            .ok_or_else(|| account_id_not_found(account.id))
    }

    async fn set_balance(&self, number: i64, balance: i64) -> Result<(), AppError> {
        ensure_non_negative(balance)?;
        match account_queries::set_balance(&self.pool, number, balance).await? {
            0 => Err(account_number_not_found(number)),
            _ => Ok(()),
        }
    }

    async fn list(&self) -> Result<Vec<Account>, AppError> {
        Ok(account_queries::fetch_all(&self.pool).await?)
    }

    async fn get_by_id(&self, id: i64) -> Result<Account, AppError> {
        account_queries::fetch_by_id(&self.pool, id)
            .await?
            .ok_or_else(|| account_id_not_found(id))
    }

    async fn get_by_number(&self, number: i64) -> Result<Account, AppError> {
        account_queries::fetch_by_number(&self.pool, number)
            .await?
            .ok_or_else(|| account_number_not_found(number))
    }

    async fn ping(&self) -> Result<(), AppError> {
        Ok(account_queries::ping(&self.pool).await?)
    }

    async fn begin(&self) -> Result<Box<dyn AccountTx>, AppError> {
        let tx = self.pool.begin().await.map_err(|e| {
            error!("Failed to begin transaction: {}", e);
            AppError::from(e)
        })?;
        Ok(Box::new(PgAccountTx { tx }))
    }
}

/// Postgres transaction; `sqlx` rolls it back when dropped uncommitted.
struct PgAccountTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl AccountTx for PgAccountTx {
    async fn lock_by_number(&mut self, number: i64) -> Result<Account, AppError> {
        account_queries::lock_by_number(&mut *self.tx, number)
            .await?
            .ok_or_else(|| account_number_not_found(number))
    }

    async fn set_balance(&mut self, number: i64, balance: i64) -> Result<(), AppError> {
        ensure_non_negative(balance)?;
        match account_queries::set_balance(&mut *self.tx, number, balance).await? {
            0 => Err(account_number_not_found(number)),
            _ => Ok(()),
        }
    }

    async fn commit(self: Box<Self>) -> Result<(), AppError> {
        self.tx.commit().await.map_err(|e| {
            error!("Failed to commit transaction: {}", e);
            AppError::from(e)
        })
    }
}
