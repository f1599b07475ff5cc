use axum::extract::{Request, State};
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;

use crate::errors::AppError;
use crate::extract::AppPath;
use crate::models::AuthenticatedAccount;
use crate::state::AppState;

pub const TOKEN_HEADER: &str = "x-jwt-token";

/// Runs in front of `/account/:id` routes: the token must belong to that account.
pub async fn require_owner(
    State(state): State<AppState>,
    AppPath(id): AppPath<i64>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    // Owned copy: the request body isn't `Sync`, so no borrow of `req` may live across the await.
    let token = extract_token(req.headers()).map(str::to_owned);
    let account = state.access.authorize(token.as_deref(), id).await?;
    req.extensions_mut().insert(AuthenticatedAccount {
        number: account.number,
    });
    Ok(next.run(req).await)
}

/// Runs in front of routes that act on the caller's own account.
pub async fn require_token(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let number = state.access.authenticate(extract_token(req.headers()))?;
    req.extensions_mut().insert(AuthenticatedAccount { number });
    Ok(next.run(req).await)
}

/// `x-jwt-token` first, then `Authorization: Bearer`.
fn extract_token(headers: &HeaderMap) -> Option<&str> {
    if let Some(value) = headers.get(TOKEN_HEADER) {
        return value.to_str().ok().map(str::trim);
    }
    headers
        .get(axum::http::header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_extract_token_from_custom_header() {
        let mut headers = HeaderMap::new();
        headers.insert(TOKEN_HEADER, HeaderValue::from_static("abc"));
        assert_eq!(extract_token(&headers), Some("abc"));
    }

    #[test]
    fn test_extract_token_from_bearer() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_static("Bearer abc"));
        assert_eq!(extract_token(&headers), Some("abc"));

        headers.insert("authorization", HeaderValue::from_static("Basic abc"));
        assert_eq!(extract_token(&headers), None);
    }

    #[test]
    fn test_no_token() {
        assert_eq!(extract_token(&HeaderMap::new()), None);
    }
}
