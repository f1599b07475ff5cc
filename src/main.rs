use std::sync::Arc;

use anyhow::{anyhow, Context};
use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;
use tracing::info;

use bank_backend::app;
use bank_backend::config::{AppConfig, StoreBackend};
use bank_backend::logging::{init_logging, LoggingConfig};
use bank_backend::services::auth_service::AuthService;
use bank_backend::services::token_service::TokenService;
use bank_backend::state::AppState;
use bank_backend::store::{AccountStore, MemoryAccountStore, PgAccountStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize logging FIRST
    init_logging(LoggingConfig::from_env())
        .map_err(|e| anyhow!("failed to initialize logging: {}", e))?;

    let config = AppConfig::from_env().context("invalid configuration")?;

    let store: Arc<dyn AccountStore> = match config.store_backend {
        StoreBackend::Postgres => {
            let pool = PgPoolOptions::new()
                .max_connections(config.database.max_connections)
                .acquire_timeout(config.store_timeout)
                .connect_with(config.database.connect_options())
                .await
                .context("failed to connect to database")?;
            info!("🗄️  Connected to database {} at {}", config.database.name, config.database.host);

            let store = PgAccountStore::new(pool);
            store.migrate().await.context("failed to run migrations")?;
            Arc::new(store)
        }
        StoreBackend::Memory => {
            info!("🗄️  Using in-memory account store");
            Arc::new(MemoryAccountStore::new())
        }
    };

    let tokens = Arc::new(TokenService::new(
        config.jwt_secret.expose().as_bytes(),
        config.token_ttl,
    ));
    let auth = AuthService::new(store.clone());

    if std::env::args().any(|arg| arg == "--seed") {
        seed_account(&auth).await?;
    }

    let state = AppState::new(store, tokens, auth, config.store_timeout);
    let app = app::create_app(state);

    let listener = TcpListener::bind(config.listen_addr).await?;
    info!("🚀 Bank backend running at http://{}/", config.listen_addr);
    axum::serve(listener, app).await?;

    Ok(())
}

/// `--seed`: create a demo account using the password in `SEED_PASSWORD`.
async fn seed_account(auth: &AuthService) -> anyhow::Result<()> {
    let password = std::env::var("SEED_PASSWORD").context("--seed requires SEED_PASSWORD")?;
    info!("🌱 Seeding the database");
    let account = auth
        .register("Demo", "Account", &password)
        .await
        .context("failed to seed account")?;
    info!("🌱 New account => {}", account.number);
    Ok(())
}
