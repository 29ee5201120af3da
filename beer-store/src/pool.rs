use beer_core::{DatabaseConfig, ExporterError};
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use tracing::info;

/// Open a connection pool. One connection is established eagerly so an
/// unreachable host fails here, bounded by `connect_timeout_secs`.
pub async fn connect(config: &DatabaseConfig) -> Result<PgPool, ExporterError> {
    let options = PgConnectOptions::new()
        .host(&config.host)
        .port(config.port)
        .username(&config.user)
        .password(&config.password)
        .database(&config.database);

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections.max(1))
        .acquire_timeout(config.connect_timeout())
        .connect_with(options)
        .await
        .map_err(|e| {
            ExporterError::Database(format!("connect to {} failed: {e}", config.redacted_url()))
        })?;

    info!(url = %config.redacted_url(), "Successfully connected to database");
    Ok(pool)
}
