use axum::http::{header, HeaderName, Method};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};

use crate::middleware::TOKEN_HEADER;
use crate::routes::{accounts, auth, health, transfers};
use crate::state::AppState;

pub fn create_app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static(TOKEN_HEADER),
        ]);

    Router::<AppState>::new()
        .nest("/health", health::router())
        .merge(auth::router())
        .merge(accounts::router(state.clone()))
        .merge(transfers::router(state.clone()))
        .layer(cors)
        .with_state(state)
}
