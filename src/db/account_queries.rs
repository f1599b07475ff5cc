use sqlx::{Executor, Postgres};

use crate::models::{Account, NewAccount};

const ACCOUNT_COLUMNS: &str =
    "id, first_name, last_name, number, password_hash, balance, created_at";

pub async fn insert<'e, E>(executor: E, account: &NewAccount) -> Result<Account, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as::<_, Account>(&format!(
        "INSERT INTO account (first_name, last_name, number, password_hash, balance, created_at)
         VALUES ($1, $2, $3, $4, $5, $6)
         RETURNING {ACCOUNT_COLUMNS}"
    ))
    .bind(&account.first_name)
    .bind(&account.last_name)
    .bind(account.number)
    .bind(&account.password_hash)
    .bind(account.balance)
    .bind(account.created_at)
    .fetch_one(executor)
    .await
}

pub async fn fetch_all<'e, E>(executor: E) -> Result<Vec<Account>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as::<_, Account>(&format!(
        "SELECT {ACCOUNT_COLUMNS} FROM account ORDER BY id ASC"
    ))
    .fetch_all(executor)
    .await
}

pub async fn fetch_by_id<'e, E>(executor: E, id: i64) -> Result<Option<Account>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as::<_, Account>(&format!(
        "SELECT {ACCOUNT_COLUMNS} FROM account WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(executor)
    .await
}

pub async fn fetch_by_number<'e, E>(executor: E, number: i64) -> Result<Option<Account>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as::<_, Account>(&format!(
        "SELECT {ACCOUNT_COLUMNS} FROM account WHERE number = $1"
    ))
    .bind(number)
    .fetch_optional(executor)
    .await
}

/// Row-locks the account for the rest of the enclosing transaction.
pub async fn lock_by_number<'e, E>(executor: E, number: i64) -> Result<Option<Account>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as::<_, Account>(&format!(
        "SELECT {ACCOUNT_COLUMNS} FROM account WHERE number = $1 FOR UPDATE"
    ))
    .bind(number)
    .fetch_optional(executor)
    .await
}

pub async fn update_profile<'e, E>(
    executor: E,
    id: i64,
    first_name: &str,
    last_name: &str,
) -> Result<Option<Account>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as::<_, Account>(&format!(
        "UPDATE account SET first_name = $1, last_name = $2
         WHERE id = $3
         RETURNING {ACCOUNT_COLUMNS}"
    ))
    .bind(first_name)
    .bind(last_name)
    .bind(id)
    .fetch_optional(executor)
    .await
}

pub async fn set_balance<'e, E>(executor: E, number: i64, balance: i64) -> Result<u64, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let result = sqlx::query("UPDATE account SET balance = $1 WHERE number = $2")
        .bind(balance)
        .bind(number)
        .execute(executor)
        .await?;
    Ok(result.rows_affected())
}

pub async fn delete<'e, E>(executor: E, id: i64) -> Result<u64, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let result = sqlx::query("DELETE FROM account WHERE id = $1")
        .bind(id)
        .execute(executor)
        .await?;
    Ok(result.rows_affected())
}

/// Round trip to the server without touching the `account` table.
pub async fn ping<'e, E>(executor: E) -> Result<(), sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query("SELECT 1").execute(executor).await?;
    Ok(())
}
