use std::ops::RangeInclusive;
use std::sync::Arc;

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use rand::Rng;
use tracing::{info, warn};

use crate::errors::AppError;
use crate::models::{Account, NewAccount};
use crate::store::AccountStore;

/// Argon2id memory cost in KiB.
pub const ARGON2_MEMORY_KIB: u32 = 19_456;
/// Argon2id iteration count.
pub const ARGON2_ITERATIONS: u32 = 2;
/// Argon2id lanes.
pub const ARGON2_PARALLELISM: u32 = 1;

pub const MAX_ALLOCATION_ATTEMPTS: usize = 10;
pub const MAX_NAME_LEN: usize = 50;

/// Range account numbers are drawn from.
pub const DEFAULT_NUMBER_RANGE: RangeInclusive<i64> = 10_000_000..=99_999_999;

/// Registration and password checks.
#[derive(Clone)]
pub struct AuthService {
    store: Arc<dyn AccountStore>,
    params: Params,
    numbers: RangeInclusive<i64>,
}

impl AuthService {
    pub fn new(store: Arc<dyn AccountStore>) -> Self {
        Self::with_params(store, default_params())
    }

    /// Use a different Argon2 cost. Tests use this to keep hashing cheap.
    pub fn with_params(store: Arc<dyn AccountStore>, params: Params) -> Self {
        Self {
            store,
            params,
            numbers: DEFAULT_NUMBER_RANGE,
        }
    }

    pub fn with_number_range(mut self, numbers: RangeInclusive<i64>) -> Self {
        self.numbers = numbers;
        self
    }

    pub async fn register(
        &self,
        first_name: &str,
        last_name: &str,
        password: &str,
    ) -> Result<Account, AppError> {
        let first_name = validate_name("First name", first_name)?;
        let last_name = validate_name("Last name", last_name)?;
        if password.is_empty() {
            return Err(AppError::Validation("Password cannot be empty".into()));
        }

        let password_hash = self.hash_password(password).await?;

        for attempt in 1..=MAX_ALLOCATION_ATTEMPTS {
            let number = rand::rng().random_range(self.numbers.clone());

            match self.store.get_by_number(number).await {
                Ok(_) => {
                    warn!("Account number {} already taken (attempt {})", number, attempt);
                    continue;
                }
                Err(AppError::NotFound(_)) => {}
                Err(e) => return Err(e),
            }

            let new_account = NewAccount::new(
                first_name.clone(),
                last_name.clone(),
                number,
                password_hash.clone(),
            );
            // A concurrent registration can still claim the number between the
            // lookup and the insert; the store's uniqueness constraint catches it.
            match self.store.create(new_account).await {
                Ok(account) => {
                    info!("Registered account {} (number {})", account.id, account.number);
                    return Ok(account);
                }
                Err(AppError::Constraint(_)) => {
                    warn!("Account number {} claimed concurrently (attempt {})", number, attempt);
                }
                Err(e) => return Err(e),
            }
        }

        Err(AppError::Allocation(MAX_ALLOCATION_ATTEMPTS))
    }

    /// Checks `candidate` against the stored hash.
    ///
    /// A mismatch is `Ok(false)`; only an unreadable stored hash is an error.
    pub fn verify_password(&self, account: &Account, candidate: &str) -> Result<bool, AppError> {
        let parsed = PasswordHash::new(&account.password_hash).map_err(|e| {
            AppError::CorruptData(format!("Stored hash for account {} is unreadable: {}", account.id, e))
        })?;
        // The verifier takes its parameters from the stored hash, not from `self.params`.
        Ok(Argon2::default()
            .verify_password(candidate.as_bytes(), &parsed)
            .is_ok())
    }

    /// Resolve a login attempt to an account.
    ///
    /// Unknown numbers and wrong passwords both report `Auth`.
    pub async fn authenticate(&self, number: i64, password: &str) -> Result<Account, AppError> {
        let account = match self.store.get_by_number(number).await {
            Ok(account) => account,
            Err(AppError::NotFound(_)) => {
                warn!("Login attempt for unknown account number {}", number);
                return Err(AppError::Auth);
            }
            Err(e) => return Err(e),
        };

        let stored = account.clone();
        let candidate = password.to_string();
        let this = self.clone();
        let valid = tokio::task::spawn_blocking(move || this.verify_password(&stored, &candidate))
            .await
            .map_err(|e| AppError::Internal(format!("Password verification task failed: {}", e)))??;

        if !valid {
            warn!("Wrong password for account number {}", number);
            return Err(AppError::Auth);
        }
        Ok(account)
    }

    async fn hash_password(&self, password: &str) -> Result<String, AppError> {
        let params = self.params.clone();
        let password = password.to_string();
        tokio::task::spawn_blocking(move || {
            let salt_bytes: [u8; 16] = rand::random();
            let salt = SaltString::encode_b64(&salt_bytes)
                .map_err(|e| AppError::Internal(format!("Failed to encode salt: {}", e)))?;
            Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
                .hash_password(password.as_bytes(), &salt)
                .map(|hash| hash.to_string())
                .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))
        })
        .await
        .map_err(|e| AppError::Internal(format!("Password hashing task failed: {}", e)))?
    }
}

fn default_params() -> Params {
    Params::new(ARGON2_MEMORY_KIB, ARGON2_ITERATIONS, ARGON2_PARALLELISM, None)
        .unwrap_or_default()
}

fn validate_name(field: &str, value: &str) -> Result<String, AppError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::Validation(format!("{} cannot be empty", field)));
    }
    if trimmed.chars().count() > MAX_NAME_LEN {
        return Err(AppError::Validation(format!(
            "{} cannot be longer than {} characters",
            field, MAX_NAME_LEN
        )));
    }
    Ok(trimmed.to_string())
}

pub(crate) fn validate_profile(first_name: &str, last_name: &str) -> Result<(String, String), AppError> {
    Ok((
        validate_name("First name", first_name)?,
        validate_name("Last name", last_name)?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use crate::store::{AccountTx, MemoryAccountStore};

    fn cheap_params() -> Params {
        Params::new(1024, 1, 1, None).unwrap()
    }

    fn service() -> (AuthService, Arc<MemoryAccountStore>) {
        let store = Arc::new(MemoryAccountStore::new());
        (AuthService::with_params(store.clone(), cheap_params()), store)
    }

    #[tokio::test]
    async fn test_register_then_verify_password() {
        let (auth, _) = service();
        let account = auth.register("Ada", "Lovelace", "correct horse").await.unwrap();

        assert!(auth.verify_password(&account, "correct horse").unwrap());
        assert!(!auth.verify_password(&account, "wrong horse").unwrap());
    }

    #[tokio::test]
    async fn test_registered_account_starts_at_zero() {
        let (auth, store) = service();
        let account = auth.register("  Ada ", "Lovelace", "pw").await.unwrap();

        assert_eq!(account.balance, 0);
        assert_eq!(account.first_name, "Ada");
        assert!(DEFAULT_NUMBER_RANGE.contains(&account.number));
        assert_ne!(account.password_hash, "pw");
        assert_eq!(store.get_by_id(account.id).await.unwrap(), account);
    }

    #[tokio::test]
    async fn test_register_rejects_empty_input() {
        let (auth, _) = service();

        assert!(matches!(auth.register("", "Lovelace", "pw").await, Err(AppError::Validation(_))));
        assert!(matches!(auth.register("Ada", "   ", "pw").await, Err(AppError::Validation(_))));
        assert!(matches!(auth.register("Ada", "Lovelace", "").await, Err(AppError::Validation(_))));
        let long_name = "x".repeat(MAX_NAME_LEN + 1);
        assert!(matches!(auth.register(&long_name, "Lovelace", "pw").await, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_allocation_gives_up_when_numbers_run_out() {
        let (auth, _) = service();
        let auth = auth.with_number_range(5000..=5000);

        let first = auth.register("Ada", "Lovelace", "pw").await.unwrap();
        assert_eq!(first.number, 5000);

        let second = auth.register("Grace", "Hopper", "pw").await;
        assert!(matches!(second, Err(AppError::Allocation(MAX_ALLOCATION_ATTEMPTS))));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_registrations_get_distinct_numbers() {
        let (auth, store) = service();
        let auth = auth.with_number_range(1..=12);

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let auth = auth.clone();
                tokio::spawn(async move { auth.register(&format!("User{}", i), "Test", "pw").await })
            })
            .collect();

        let mut numbers = HashSet::new();
        for handle in handles {
            match handle.await.unwrap() {
                Ok(account) => assert!(numbers.insert(account.number), "duplicate {}", account.number),
                // Losing every draw to the other registrations is the only acceptable failure.
                Err(e) => assert!(matches!(e, AppError::Allocation(MAX_ALLOCATION_ATTEMPTS)), "{:?}", e),
            }
        }

        assert!(!numbers.is_empty());
        assert_eq!(store.list().await.unwrap().len(), numbers.len());
    }

    /// Hides existing numbers from the lookup, so every clash is only seen by `create`,
    /// the way a registration racing another one between lookup and insert would.
    struct StaleLookupStore {
        inner: MemoryAccountStore,
        creates: AtomicUsize,
    }

    #[async_trait]
    impl AccountStore for StaleLookupStore {
        async fn create(&self, account: NewAccount) -> Result<Account, AppError> {
            self.creates.fetch_add(1, Ordering::SeqCst);
            self.inner.create(account).await
        }

        async fn delete(&self, id: i64) -> Result<(), AppError> {
            self.inner.delete(id).await
        }

        async fn update_profile(&self, account: &Account) -> Result<Account, AppError> {
            self.inner.update_profile(account).await
        }

        async fn set_balance(&self, number: i64, balance: i64) -> Result<(), AppError> {
            self.inner.set_balance(number, balance).await
        }

        async fn list(&self) -> Result<Vec<Account>, AppError> {
            self.inner.list().await
        }

        async fn get_by_id(&self, id: i64) -> Result<Account, AppError> {
            self.inner.get_by_id(id).await
        }

        async fn get_by_number(&self, number: i64) -> Result<Account, AppError> {
            Err(AppError::NotFound(format!("Account with number {} not found", number)))
        }

        async fn begin(&self) -> Result<Box<dyn AccountTx>, AppError> {
            self.inner.begin().await
        }
    }

    #[tokio::test]
    async fn test_number_claimed_between_lookup_and_insert_is_retried() {
        let store = Arc::new(StaleLookupStore {
            inner: MemoryAccountStore::new(),
            creates: AtomicUsize::new(0),
        });
        store
            .inner
            .create(NewAccount::new("Ada".into(), "Lovelace".into(), 5000, "hash".into()))
            .await
            .unwrap();
        let auth = AuthService::with_params(store.clone(), cheap_params()).with_number_range(5000..=5000);

        let result = auth.register("Grace", "Hopper", "pw").await;

        assert!(matches!(result, Err(AppError::Allocation(MAX_ALLOCATION_ATTEMPTS))));
        assert_eq!(store.creates.load(Ordering::SeqCst), MAX_ALLOCATION_ATTEMPTS);
        assert_eq!(store.inner.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_corrupt_hash_is_reported() {
        let (auth, _) = service();
        let mut account = auth.register("Ada", "Lovelace", "pw").await.unwrap();
        account.password_hash = "not-a-phc-string".into();

        assert!(matches!(auth.verify_password(&account, "pw"), Err(AppError::CorruptData(_))));
    }

    #[tokio::test]
    async fn test_authenticate() {
        let (auth, _) = service();
        let account = auth.register("Ada", "Lovelace", "pw").await.unwrap();

        assert_eq!(auth.authenticate(account.number, "pw").await.unwrap().id, account.id);
        assert!(matches!(auth.authenticate(account.number, "nope").await, Err(AppError::Auth)));
        assert!(matches!(auth.authenticate(account.number + 1, "pw").await, Err(AppError::Auth)));
    }

    #[test]
    fn test_default_work_factor() {
        let params = default_params();
        assert_eq!(params.m_cost(), ARGON2_MEMORY_KIB);
        assert_eq!(params.t_cost(), ARGON2_ITERATIONS);
        assert_eq!(params.p_cost(), ARGON2_PARALLELISM);
    }
}
