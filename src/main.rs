use sqlx::postgres::PgPoolOptions;
use std::net::TcpListener;
use std::sync::Arc;

use tokenward::auth::{TokenCodec, TokenEngine, TokenTtls};
use tokenward::configuration::get_configuration;
use tokenward::session_cache::build_session_cache;
use tokenward::startup::run;
use tokenward::telemetry::init_telemetry;
use tokenward::user_store::PostgresUserStore;

fn startup_error(kind: std::io::ErrorKind, what: &str, err: impl std::fmt::Display) -> std::io::Error {
    tracing::error!(error = %err, "{}", what);
    std::io::Error::new(kind, what.to_string())
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    init_telemetry("info");

    tracing::info!("Starting application");

    let configuration = get_configuration()
        .map_err(|e| startup_error(std::io::ErrorKind::InvalidInput, "Failed to read configuration", e))?;
    tracing::info!("Configuration loaded successfully");

    let ttls = TokenTtls {
        access: configuration
            .jwt
            .access_ttl()
            .map_err(|e| startup_error(std::io::ErrorKind::InvalidInput, "Invalid token lifetime", e))?,
        refresh: configuration
            .jwt
            .refresh_ttl()
            .map_err(|e| startup_error(std::io::ErrorKind::InvalidInput, "Invalid token lifetime", e))?,
    };
    let codec = TokenCodec::from_settings(&configuration.jwt)
        .map_err(|e| startup_error(std::io::ErrorKind::InvalidInput, "Invalid signing key", e))?;

    tracing::info!("Attempting to connect to database");
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&configuration.database.connection_string())
        .await
        .map_err(|e| {
            startup_error(std::io::ErrorKind::ConnectionRefused, "Database connection error", e)
        })?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .map_err(|e| startup_error(std::io::ErrorKind::Other, "Failed to migrate the database", e))?;
    tracing::info!("Database ready");

    let sessions = build_session_cache(&configuration)
        .await
        .map_err(|e| startup_error(std::io::ErrorKind::ConnectionRefused, "Session cache error", e))?;

    let engine = TokenEngine::new(codec, Arc::new(PostgresUserStore::new(pool)), sessions, ttls);

    let address = format!(
        "{}:{}",
        configuration.application.host, configuration.application.port
    );
    let listener = TcpListener::bind(&address)?;
    tracing::info!(address = %address, "Server listening");

    run(listener, engine)?.await
}
