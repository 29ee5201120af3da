use beer_core::ExporterError;
use sqlx::PgPool;
use tracing::{debug, info};

pub const CREATE_PERSONS: &str = r#"
CREATE TABLE IF NOT EXISTS persons (
    username varchar(32) NOT NULL,
    fullname varchar(256) NOT NULL,
    PRIMARY KEY (username)
)"#;

pub const CREATE_CONSUMPTIONS: &str = r#"
CREATE TABLE IF NOT EXISTS consumptions (
    id BIGSERIAL PRIMARY KEY,
    username varchar(32) NOT NULL REFERENCES persons (username),
    beer_type varchar(64) NOT NULL,
    consumed_at timestamptz NOT NULL DEFAULT now()
)"#;

/// Statements run by [`bootstrap`], in dependency order.
pub const BOOTSTRAP_STATEMENTS: &[&str] = &[CREATE_PERSONS, CREATE_CONSUMPTIONS];

/// Create the exporter's tables. Safe to run against an already bootstrapped
/// database.
pub async fn bootstrap(pool: &PgPool) -> Result<(), ExporterError> {
    for statement in BOOTSTRAP_STATEMENTS {
        debug!(statement = statement.trim(), "Executing bootstrap statement");
        sqlx::query(statement).execute(pool).await.map_err(|e| {
            ExporterError::Database(format!("an error occurred while executing query: {e}"))
        })?;
    }
    info!(statements = BOOTSTRAP_STATEMENTS.len(), "Database schema ready");
    Ok(())
}
