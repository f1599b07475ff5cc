use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::errors::AppError;
use crate::models::{Account, NewAccount};

use super::{account_id_not_found, account_number_not_found, ensure_non_negative, AccountStore, AccountTx};

#[derive(Debug, Default)]
struct Accounts {
    rows: BTreeMap<i64, Account>,
    next_id: i64,
}

impl Accounts {
    fn find_by_number(&self, number: i64) -> Option<&Account> {
        self.rows.values().find(|a| a.number == number)
    }

    fn find_by_number_mut(&mut self, number: i64) -> Option<&mut Account> {
        self.rows.values_mut().find(|a| a.number == number)
    }
}

/// In-process store. A transaction holds the store lock until it commits or is dropped.
#[derive(Clone, Default)]
pub struct MemoryAccountStore {
    inner: Arc<Mutex<Accounts>>,
    latency: Option<Duration>,
}

impl MemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every transactional step, for exercising timeouts and cancellation.
    pub fn with_latency(latency: Duration) -> Self {
        Self {
            inner: Arc::default(),
            latency: Some(latency),
        }
    }
}

#[async_trait]
impl AccountStore for MemoryAccountStore {
    async fn create(&self, account: NewAccount) -> Result<Account, AppError> {
        ensure_non_negative(account.balance)?;
        let mut accounts = self.inner.lock().await;
        if accounts.find_by_number(account.number).is_some() {
            return Err(AppError::Constraint(format!(
                "Account number {} already exists",
                account.number
            )));
        }
        accounts.next_id += 1;
        let id = accounts.next_id;
        let account = account.into_account(id);
        accounts.rows.insert(id, account.clone());
        Ok(account)
    }

    async fn delete(&self, id: i64) -> Result<(), AppError> {
        self.inner
            .lock()
            .await
            .rows
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| account_id_not_found(id))
    }

    async fn update_profile(&self, account: &Account) -> Result<Account, AppError> {
        let mut accounts = self.inner.lock().await;
        let row = accounts
            .rows
            .get_mut(&account.id)
            .ok_or_else(|| account_id_not_found(account.id))?;
        row.first_name = account.first_name.clone();
        row.last_name = account.last_name.clone();
        Ok(row.clone())
    }

    async fn set_balance(&self, number: i64, balance: i64) -> Result<(), AppError> {
        ensure_non_negative(balance)?;
        let mut accounts = self.inner.lock().await;
        let row = accounts
            .find_by_number_mut(number)
            .ok_or_else(|| account_number_not_found(number))?;
        row.balance = balance;
        Ok(())
    }

    async fn list(&self) -> Result<Vec<Account>, AppError> {
        Ok(self.inner.lock().await.rows.values().cloned().collect())
    }

    async fn get_by_id(&self, id: i64) -> Result<Account, AppError> {
        self.inner
            .lock()
            .await
            .rows
            .get(&id)
            .cloned()
            .ok_or_else(|| account_id_not_found(id))
    }

    async fn get_by_number(&self, number: i64) -> Result<Account, AppError> {
        self.inner
            .lock()
            .await
            .find_by_number(number)
            .cloned()
            .ok_or_else(|| account_number_not_found(number))
    }

    async fn begin(&self) -> Result<Box<dyn AccountTx>, AppError> {
        let guard = self.inner.clone().lock_owned().await;
        Ok(Box::new(MemoryAccountTx {
            guard,
            staged: HashMap::new(),
            latency: self.latency,
        }))
    }
}

struct MemoryAccountTx {
    guard: OwnedMutexGuard<Accounts>,
    // number -> balance, applied on commit
    staged: HashMap<i64, i64>,
    latency: Option<Duration>,
}

impl MemoryAccountTx {
    async fn pause(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }
}

#[async_trait]
impl AccountTx for MemoryAccountTx {
    async fn lock_by_number(&mut self, number: i64) -> Result<Account, AppError> {
        self.pause().await;
        let mut account = self
            .guard
            .find_by_number(number)
            .cloned()
            .ok_or_else(|| account_number_not_found(number))?;
        if let Some(balance) = self.staged.get(&number) {
            account.balance = *balance;
        }
        Ok(account)
    }

    async fn set_balance(&mut self, number: i64, balance: i64) -> Result<(), AppError> {
        self.pause().await;
        ensure_non_negative(balance)?;
        if self.guard.find_by_number(number).is_none() {
            return Err(account_number_not_found(number));
        }
        self.staged.insert(number, balance);
        Ok(())
    }

    async fn commit(mut self: Box<Self>) -> Result<(), AppError> {
        self.pause().await;
        let staged = std::mem::take(&mut self.staged);
        for (number, balance) in staged {
            if let Some(row) = self.guard.find_by_number_mut(number) {
                row.balance = balance;
            }
        }
        Ok(())
    }
}
