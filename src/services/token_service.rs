use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use thiserror::Error;

use crate::models::{Account, SessionClaims};

/// Default validity window of an issued token, in seconds.
pub const DEFAULT_TOKEN_TTL_SECS: i64 = 15_000;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("token has expired")]
    Expired,

    #[error("invalid token: {0}")]
    Invalid(String),

    #[error("failed to sign token: {0}")]
    Signing(String),
}

/// Issues and verifies HS256 bearer tokens naming an account number.
///
/// Tokens are stateless: there is no server-side session table, so a token stays
/// valid until it expires.
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl: Duration,
}

impl TokenService {
    pub fn new(secret: &[u8], ttl: Duration) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            ttl,
        }
    }

    pub fn issue(&self, account: &Account) -> Result<String, TokenError> {
        self.issue_at(account, Utc::now())
    }

    pub fn issue_at(&self, account: &Account, now: DateTime<Utc>) -> Result<String, TokenError> {
        let expires_at = now
            .checked_add_signed(self.ttl)
            .ok_or_else(|| TokenError::Signing("token expiry is out of range".to_string()))?;
        let claims = SessionClaims {
            account_number: account.number,
            exp: expires_at.timestamp(),
            iat: now.timestamp(),
        };
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    /// Returns the account number the token was issued for.
    pub fn verify(&self, token: &str) -> Result<i64, TokenError> {
        self.verify_at(token, Utc::now())
    }

    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<i64, TokenError> {
        let claims = self.decode(token)?;
        if now.timestamp() >= claims.exp {
            return Err(TokenError::Expired);
        }
        Ok(claims.account_number)
    }

    fn decode(&self, token: &str) -> Result<SessionClaims, TokenError> {
        // Expiry is compared against the caller's clock in `verify_at`; only presence is
        // enforced here.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);

        jsonwebtoken::decode::<SessionClaims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid(e.to_string()),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewAccount;
    use serde_json::json;

    fn account(number: i64) -> Account {
        NewAccount::new("Ada".into(), "Lovelace".into(), number, "hash".into()).into_account(1)
    }

    fn service() -> TokenService {
        TokenService::new(b"test-secret", Duration::seconds(DEFAULT_TOKEN_TTL_SECS))
    }

    #[test]
    fn test_issue_then_verify_returns_account_number() {
        let tokens = service();
        let token = tokens.issue(&account(1001)).unwrap();
        assert_eq!(tokens.verify(&token).unwrap(), 1001);
    }

    #[test]
    fn test_token_expires_after_window() {
        let tokens = service();
        let issued_at = Utc::now();
        let token = tokens.issue_at(&account(1001), issued_at).unwrap();

        let just_before = issued_at + Duration::seconds(DEFAULT_TOKEN_TTL_SECS - 1);
        assert_eq!(tokens.verify_at(&token, just_before).unwrap(), 1001);

        let after = issued_at + Duration::seconds(DEFAULT_TOKEN_TTL_SECS + 1);
        assert_eq!(tokens.verify_at(&token, after), Err(TokenError::Expired));
    }

    #[test]
    fn test_expiry_past_the_calendar_is_a_signing_error() {
        let tokens = TokenService::new(b"test-secret", Duration::MAX);
        let result = tokens.issue_at(&account(1001), Utc::now());
        assert!(matches!(result, Err(TokenError::Signing(_))));
    }

    #[test]
    fn test_token_signed_with_other_secret_is_invalid() {
        let other =
            TokenService::new(b"another-secret", Duration::seconds(DEFAULT_TOKEN_TTL_SECS));
        let token = other.issue(&account(1001)).unwrap();

        assert!(matches!(service().verify(&token), Err(TokenError::Invalid(_))));
    }

    #[test]
    fn test_garbage_is_invalid() {
        assert!(matches!(service().verify("not-a-token"), Err(TokenError::Invalid(_))));
        assert!(matches!(service().verify(""), Err(TokenError::Invalid(_))));
    }

    #[test]
    fn test_other_algorithm_is_rejected() {
        let key = EncodingKey::from_secret(b"test-secret");
        let claims = json!({ "accountNumber": 1001, "exp": Utc::now().timestamp() + 60, "iat": 0 });
        let token = jsonwebtoken::encode(&Header::new(Algorithm::HS512), &claims, &key).unwrap();

        assert!(matches!(service().verify(&token), Err(TokenError::Invalid(_))));
    }

    #[test]
    fn test_payload_without_account_number_is_rejected() {
        let key = EncodingKey::from_secret(b"test-secret");
        let claims = json!({ "exp": Utc::now().timestamp() + 60, "iat": 0 });
        let token = jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &key).unwrap();

        assert!(matches!(service().verify(&token), Err(TokenError::Invalid(_))));
    }

    #[test]
    fn test_payload_without_expiry_is_rejected() {
        let key = EncodingKey::from_secret(b"test-secret");
        // Custom expiry field instead of the registered `exp` claim.
        let claims = json!({ "ExpiresAt": 15000, "accountNumber": 1001 });
        let token = jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &key).unwrap();

        assert!(matches!(service().verify(&token), Err(TokenError::Invalid(_))));
    }
}
