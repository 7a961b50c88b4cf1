use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use summarist_gate::{
    AppState, FixedTierSource, PostgresTierSource, TierState,
    config::{AppConfig, Env},
    create_router,
};
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// main
///
/// Loads configuration, sets up logging, picks the tier source and serves the gate API.
#[tokio::main]
async fn main() {
    // 1. Configuration (fail-fast in production).
    dotenv::dotenv().ok();
    let config = AppConfig::load();

    // 2. Logging: RUST_LOG wins, otherwise sensible local defaults.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "summarist_gate=debug,tower_http=info".into());

    match config.env {
        Env::Local => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        Env::Production => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
    }

    tracing::info!("Gate service starting in {:?} mode", config.env);

    // 3. Tier source: the profile database when configured, otherwise everyone is basic.
    let tiers: TierState = match &config.db_url {
        Some(db_url) => {
            let pool = PgPoolOptions::new()
                .max_connections(5)
                .connect(db_url)
                .await
                .expect("FATAL: Failed to connect to Postgres. Check DATABASE_URL.");
            tracing::info!("Subscription tiers read from profiles table");
            Arc::new(PostgresTierSource::new(pool))
        }
        None => {
            tracing::warn!("DATABASE_URL not set; every viewer is treated as basic");
            Arc::new(FixedTierSource::default())
        }
    };

    let bind_addr = config.bind_addr.clone();
    let app = create_router(AppState { tiers, config });

    // 4. Serve.
    let listener = TcpListener::bind(&bind_addr)
        .await
        .expect("FATAL: Failed to bind BIND_ADDR.");

    tracing::info!("Listening on {}", bind_addr);
    tracing::info!("API Documentation (Swagger UI) available at /swagger-ui");

    axum::serve(listener, app)
        .await
        .expect("FATAL: HTTP server terminated unexpectedly.");
}
