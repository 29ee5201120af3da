//! Database tests.
//!
//! The unreachable-host test runs everywhere. The rest need a live Postgres
//! and are ignored unless run with `--ignored` and `BEER_TEST_DB_HOST` set
//! (optionally `BEER_TEST_DB_PORT`, `BEER_TEST_DB_USER`,
//! `BEER_TEST_DB_PASSWORD`, `BEER_TEST_DB_DATABASE`).

use beer_core::{ConsumptionSource, DatabaseConfig, ExporterError, TimeWindow};
use beer_store::{PgConsumptionSource, bootstrap, connect};
use std::time::{Duration, Instant};

// ── Helper ────────────────────────────────────────────────────

fn live_config() -> Option<DatabaseConfig> {
    let host = std::env::var("BEER_TEST_DB_HOST").ok()?;
    let mut cfg = DatabaseConfig::new(host);
    if let Some(port) = std::env::var("BEER_TEST_DB_PORT").ok().and_then(|p| p.parse().ok()) {
        cfg.port = port;
    }
    if let Ok(user) = std::env::var("BEER_TEST_DB_USER") {
        cfg.user = user;
    }
    if let Ok(password) = std::env::var("BEER_TEST_DB_PASSWORD") {
        cfg.password = password;
    }
    if let Ok(database) = std::env::var("BEER_TEST_DB_DATABASE") {
        cfg.database = database;
    }
    Some(cfg)
}

// ── Connect ───────────────────────────────────────────────────

#[tokio::test]
async fn unreachable_host_fails_fast() {
    let mut cfg = DatabaseConfig::new("127.0.0.1");
    // Nothing listens on port 1.
    cfg.port = 1;
    cfg.connect_timeout_secs = 2;

    let started = Instant::now();
    let err = connect(&cfg).await.unwrap_err();
    assert!(matches!(err, ExporterError::Database(_)), "got {err:?}");
    assert!(
        started.elapsed() < Duration::from_secs(10),
        "connect should give up quickly, took {:?}",
        started.elapsed()
    );
}

#[tokio::test]
async fn connect_error_does_not_leak_password() {
    let mut cfg = DatabaseConfig::new("127.0.0.1");
    cfg.port = 1;
    cfg.password = "hunter2".into();
    cfg.connect_timeout_secs = 1;

    let err = connect(&cfg).await.unwrap_err();
    assert!(!err.to_string().contains("hunter2"));
}

// ── Bootstrap ─────────────────────────────────────────────────

#[tokio::test]
#[ignore = "requires a running postgres (BEER_TEST_DB_HOST)"]
async fn bootstrap_is_idempotent() {
    let Some(cfg) = live_config() else { return };
    let pool = connect(&cfg).await.unwrap();

    bootstrap(&pool).await.unwrap();
    // Second run against the already created tables is a no-op.
    bootstrap(&pool).await.unwrap();

    let (count,): (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM information_schema.tables WHERE table_name IN ('persons', 'consumptions')",
    )
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(count, 2);
}

// ── Source ────────────────────────────────────────────────────

#[tokio::test]
#[ignore = "requires a running postgres (BEER_TEST_DB_HOST)"]
async fn source_groups_consumption_by_type_and_person() {
    let Some(cfg) = live_config() else { return };
    let pool = connect(&cfg).await.unwrap();
    bootstrap(&pool).await.unwrap();

    sqlx::query(
        "INSERT INTO persons (username, fullname) VALUES ('mike-it', 'Mike Test') ON CONFLICT DO NOTHING",
    )
    .execute(&pool)
    .await
    .unwrap();
    sqlx::query("DELETE FROM consumptions WHERE username = 'mike-it'")
        .execute(&pool)
        .await
        .unwrap();
    for _ in 0..2 {
        sqlx::query("INSERT INTO consumptions (username, beer_type) VALUES ('mike-it', 'schwarzbier')")
            .execute(&pool)
            .await
            .unwrap();
    }

    let source = PgConsumptionSource::new(pool.clone());
    let rows = source
        .consumption(TimeWindow::ending_now(Duration::from_secs(3600)))
        .await
        .unwrap();
    let mine: Vec<_> = rows.iter().filter(|r| r.person == "mike-it").collect();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0].beer_type, "schwarzbier");
    assert_eq!(mine[0].count, 2);

    // A window in the past sees nothing.
    let past = TimeWindow::trailing(
        Duration::from_secs(60),
        chrono::Utc::now() - chrono::TimeDelta::days(365),
    );
    let rows = source.consumption(past).await.unwrap();
    assert!(rows.iter().all(|r| r.person != "mike-it"));

    sqlx::query("DELETE FROM consumptions WHERE username = 'mike-it'")
        .execute(&pool)
        .await
        .unwrap();
}
