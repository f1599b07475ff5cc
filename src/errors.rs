use axum::http::{HeaderMap, HeaderValue};
use axum::response::IntoResponse;
use axum::Json;
use http::StatusCode;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Not authenticated")]
    Auth,
    #[error("Permission denied")]
    Forbidden,
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Constraint violation: {0}")]
    Constraint(String),
    #[error("Insufficient funds: balance {balance}, requested {requested}")]
    InsufficientFunds { balance: i64, requested: i64 },
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),
    #[error("Corrupt data: {0}")]
    CorruptData(String),
    #[error("Could not allocate a unique account number after {0} attempts")]
    Allocation(usize),
    #[error("Database error: {0}")]
    Db(sqlx::Error),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Auth => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Constraint(_) => StatusCode::CONFLICT,
            AppError::InsufficientFunds { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::CorruptData(_)
            | AppError::Allocation(_)
            | AppError::Db(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Only transient store failures may be retried by the caller.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::StoreUnavailable(_))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();
        let message = match &self {
            AppError::Forbidden => "permission denied".to_string(),
            AppError::StoreUnavailable(_) => "Service temporarily unavailable".to_string(),
            AppError::CorruptData(_)
            | AppError::Allocation(_)
            | AppError::Db(_)
            | AppError::Internal(_) => "Internal server error".to_string(),
            other => other.to_string(),
        };
        let body = Json(json!({ "error": message }));

        if self.is_retryable() {
            let mut headers = HeaderMap::new();
            headers.insert("Retry-After", HeaderValue::from_static("1"));
            return (status, headers, body).into_response();
        }
        (status, body).into_response()
    }
}

/// query_canceled (statement_timeout) and lock_not_available (lock_timeout).
const TIMEOUT_SQLSTATES: [&str; 2] = ["57014", "55P03"];

impl From<sqlx::Error> for AppError {
    fn from(value: sqlx::Error) -> Self {
        match value {
            sqlx::Error::RowNotFound => AppError::NotFound("Row not found".to_string()),
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                AppError::StoreUnavailable(value.to_string())
            }
            sqlx::Error::Database(ref db)
                if db
                    .code()
                    .is_some_and(|code| TIMEOUT_SQLSTATES.contains(&&*code)) =>
            {
                AppError::StoreUnavailable(db.message().to_string())
            }
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                AppError::Constraint(db.message().to_string())
            }
            sqlx::Error::Database(ref db) if db.is_check_violation() => {
                AppError::Validation(db.message().to_string())
            }
            other => AppError::Db(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_each_kind_maps_to_its_own_status() {
        assert_eq!(AppError::Validation("x".into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::Auth.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::Forbidden.status(), StatusCode::FORBIDDEN);
        assert_eq!(AppError::NotFound("x".into()).status(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::Constraint("x".into()).status(), StatusCode::CONFLICT);
        assert_eq!(
            AppError::InsufficientFunds { balance: 1, requested: 2 }.status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            AppError::StoreUnavailable("x".into()).status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            AppError::CorruptData("x".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_only_store_unavailable_is_retryable() {
        assert!(AppError::StoreUnavailable("timeout".into()).is_retryable());
        assert!(!AppError::Forbidden.is_retryable());
        assert!(!AppError::InsufficientFunds { balance: 0, requested: 1 }.is_retryable());
    }

    #[test]
    fn test_pool_timeout_is_store_unavailable() {
        let err = AppError::from(sqlx::Error::PoolTimedOut);
        assert!(matches!(err, AppError::StoreUnavailable(_)));
    }

    #[derive(Debug)]
    struct PgError {
        code: &'static str,
    }

    impl std::fmt::Display for PgError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "SQLSTATE {}", self.code)
        }
    }

    impl std::error::Error for PgError {}

    impl sqlx::error::DatabaseError for PgError {
        fn message(&self) -> &str {
            "canceling statement"
        }

        fn code(&self) -> Option<std::borrow::Cow<'_, str>> {
            Some(std::borrow::Cow::Borrowed(self.code))
        }

        fn as_error(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn std::error::Error + Send + Sync + 'static> {
            self
        }

        fn kind(&self) -> sqlx::error::ErrorKind {
            match self.code {
                "23505" => sqlx::error::ErrorKind::UniqueViolation,
                "23514" => sqlx::error::ErrorKind::CheckViolation,
                _ => sqlx::error::ErrorKind::Other,
            }
        }
    }

    fn db_error(code: &'static str) -> sqlx::Error {
        sqlx::Error::Database(Box::new(PgError { code }))
    }

    #[test]
    fn test_statement_and_lock_timeouts_are_store_unavailable() {
        for code in ["57014", "55P03"] {
            let err = AppError::from(db_error(code));
            assert!(matches!(err, AppError::StoreUnavailable(_)), "{}", code);
            assert!(err.is_retryable());
        }
    }

    #[test]
    fn test_constraint_violations_keep_their_kinds() {
        let err = AppError::from(db_error("23505"));
        assert!(matches!(err, AppError::Constraint(_)));
        let err = AppError::from(db_error("23514"));
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn test_other_database_errors_stay_internal() {
        let err = AppError::from(db_error("42P01"));
        assert!(matches!(err, AppError::Db(_)));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_unavailable_response_carries_retry_after() {
        let response = AppError::StoreUnavailable("timeout".into()).into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert!(response.headers().contains_key("Retry-After"));
    }
}
