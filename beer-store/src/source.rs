use async_trait::async_trait;
use beer_core::{Consumption, ConsumptionSource, ExporterError, TimeWindow};
use chrono::{DateTime, Utc};
use sqlx::PgPool;

const CONSUMPTION_QUERY: &str = r#"
SELECT beer_type, username, COUNT(*) AS consumed
FROM consumptions
WHERE consumed_at >= $1 AND consumed_at < $2
GROUP BY beer_type, username
ORDER BY beer_type, username"#;

/// Reads consumption counts from the `consumptions` table.
#[derive(Debug, Clone)]
pub struct PgConsumptionSource {
    pool: PgPool,
}

impl PgConsumptionSource {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ConsumptionSource for PgConsumptionSource {
    fn name(&self) -> &'static str {
        "postgres"
    }

    async fn consumption(&self, window: TimeWindow) -> Result<Vec<Consumption>, ExporterError> {
        let rows: Vec<(String, String, i64)> = sqlx::query_as(CONSUMPTION_QUERY)
            .bind::<DateTime<Utc>>(window.start)
            .bind::<DateTime<Utc>>(window.end)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| ExporterError::Source(e.to_string()))?;

        Ok(rows
            .into_iter()
            .map(|(beer_type, person, consumed)| {
                Consumption::new(beer_type, person, u64::try_from(consumed).unwrap_or(0))
            })
            .collect())
    }
}
