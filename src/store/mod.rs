//! Account persistence port.
//!
//! `AccountStore` is the capability set the services rely on; `PgAccountStore`
//! backs it with Postgres and `MemoryAccountStore` keeps everything in process.

use async_trait::async_trait;

use crate::errors::AppError;
use crate::models::{Account, NewAccount};

mod memory;
mod postgres;

pub use memory::MemoryAccountStore;
pub use postgres::PgAccountStore;

#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Persist a new account. Fails with `Constraint` when the number is taken.
    async fn create(&self, account: NewAccount) -> Result<Account, AppError>;

    async fn delete(&self, id: i64) -> Result<(), AppError>;

    /// Overwrite first and last name of the row matching `account.id`.
    async fn update_profile(&self, account: &Account) -> Result<Account, AppError>;

    /// Overwrite the balance with an absolute value, outside of any transfer.
    async fn set_balance(&self, number: i64, balance: i64) -> Result<(), AppError>;

    async fn list(&self) -> Result<Vec<Account>, AppError>;

    async fn get_by_id(&self, id: i64) -> Result<Account, AppError>;

    async fn get_by_number(&self, number: i64) -> Result<Account, AppError>;

    /// Checks that the backing store answers. In-process stores always do.
    async fn ping(&self) -> Result<(), AppError> {
        Ok(())
    }

    /// Open a transaction for a read-modify-write of balances.
    ///
    /// Dropping the returned handle without calling `commit` rolls everything back.
    async fn begin(&self) -> Result<Box<dyn AccountTx>, AppError>;
}

/// A unit of work over account balances.
#[async_trait]
pub trait AccountTx: Send {
    /// Read the account and hold a write lock on it until commit or rollback.
    async fn lock_by_number(&mut self, number: i64) -> Result<Account, AppError>;

    async fn set_balance(&mut self, number: i64, balance: i64) -> Result<(), AppError>;

    async fn commit(self: Box<Self>) -> Result<(), AppError>;
}

pub(crate) fn ensure_non_negative(balance: i64) -> Result<(), AppError> {
    if balance < 0 {
        return Err(AppError::Validation(format!(
            "Balance cannot be negative: {}",
            balance
        )));
    }
    Ok(())
}

pub(crate) fn account_number_not_found(number: i64) -> AppError {
    AppError::NotFound(format!("Account with number {} not found", number))
}

pub(crate) fn account_id_not_found(id: i64) -> AppError {
    AppError::NotFound(format!("Account {} not found", id))
}
