use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub number: i64,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub number: i64,
    pub token: String,
}

/// Claims carried by a bearer token.
///
/// Both fields are required; a token missing either one fails to decode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    #[serde(rename = "accountNumber")]
    pub account_number: i64,
    /// Expiry as seconds since the Unix epoch.
    pub exp: i64,
    /// Issued-at as seconds since the Unix epoch.
    pub iat: i64,
}

/// The account a verified token speaks for, attached to the request by the auth middleware.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthenticatedAccount {
    pub number: i64,
}
