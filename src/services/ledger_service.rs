use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::errors::AppError;
use crate::models::TransferReceipt;
use crate::store::{AccountStore, AccountTx};

pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(5);

/// Moves funds between two accounts.
#[derive(Clone)]
pub struct LedgerService {
    store: Arc<dyn AccountStore>,
    timeout: Duration,
}

impl LedgerService {
    pub fn new(store: Arc<dyn AccountStore>, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    /// Debit `from_number` and credit `to_number` in one transaction.
    ///
    /// Both rows are locked in ascending number order whatever the direction of the
    /// transfer, so two opposite transfers can't deadlock. The deadline covers everything
    /// up to commit; if it passes, or the caller drops the future first, the transaction
    /// is rolled back and `StoreUnavailable` is safe to retry. Commit itself is never cut
    /// short, since the store may already have applied it.
    pub async fn transfer(
        &self,
        from_number: i64,
        to_number: i64,
        amount: i64,
    ) -> Result<TransferReceipt, AppError> {
        if amount <= 0 {
            return Err(AppError::Validation("Transfer amount must be positive".into()));
        }
        if from_number == to_number {
            return Err(AppError::Validation(
                "Source and destination accounts must differ".into(),
            ));
        }

        let (tx, receipt) = tokio::time::timeout(self.timeout, self.stage(from_number, to_number, amount))
            .await
            .map_err(|_| {
                warn!(
                    "Transfer {} -> {} timed out after {:?}",
                    from_number, to_number, self.timeout
                );
                AppError::StoreUnavailable("Transfer timed out".into())
            })??;

        tx.commit().await.map_err(|e| match e {
            // Outcome unknown once COMMIT was sent; a retry could move the funds twice.
            AppError::StoreUnavailable(reason) => {
                AppError::Internal(format!("Transfer commit outcome unknown: {}", reason))
            }
            other => other,
        })?;

        info!(
            "Transferred {} from {} to {} (balances {} / {})",
            amount, from_number, to_number, receipt.from_balance, receipt.to_balance
        );
        Ok(receipt)
    }

    /// Lock both rows, check funds and write the new balances, leaving the commit to the caller.
    async fn stage(
        &self,
        from_number: i64,
        to_number: i64,
        amount: i64,
    ) -> Result<(Box<dyn AccountTx>, TransferReceipt), AppError> {
        let mut tx = self.store.begin().await?;

        let (low, high) = if from_number < to_number {
            (from_number, to_number)
        } else {
            (to_number, from_number)
        };
        let low_account = tx.lock_by_number(low).await?;
        let high_account = tx.lock_by_number(high).await?;
        let (source, destination) = if low == from_number {
            (low_account, high_account)
        } else {
            (high_account, low_account)
        };

        if source.balance < amount {
            return Err(AppError::InsufficientFunds {
                balance: source.balance,
                requested: amount,
            });
        }
        let from_balance = source.balance - amount;
        let to_balance = destination
            .balance
            .checked_add(amount)
            .ok_or_else(|| AppError::Validation("Destination balance would overflow".into()))?;

        tx.set_balance(from_number, from_balance).await?;
        tx.set_balance(to_number, to_balance).await?;

        Ok((
            tx,
            TransferReceipt {
                from_account: from_number,
                to_account: to_number,
                amount,
                from_balance,
                to_balance,
            },
        ))
    }
}
