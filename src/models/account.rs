use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

// A bank account. `number` is the public identifier used for login and transfers,
// `id` is the row key assigned by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub number: i64,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub balance: i64,
    pub created_at: DateTime<Utc>,
}

/// An account that has not been persisted yet.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub first_name: String,
    pub last_name: String,
    pub number: i64,
    pub password_hash: String,
    pub balance: i64,
    pub created_at: DateTime<Utc>,
}

impl NewAccount {
    pub fn new(first_name: String, last_name: String, number: i64, password_hash: String) -> Self {
        Self {
            first_name,
            last_name,
            number,
            password_hash,
            balance: 0,
            created_at: Utc::now(),
        }
    }

    pub fn into_account(self, id: i64) -> Account {
        Account {
            id,
            first_name: self.first_name,
            last_name: self.last_name,
            number: self.number,
            password_hash: self.password_hash,
            balance: self.balance,
            created_at: self.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAccountRequest {
    pub first_name: String,
    pub last_name: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAccountRequest {
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Serialize)]
pub struct DeletedAccount {
    pub deleted: i64,
}
