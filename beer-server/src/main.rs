// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Beer Exporter: Prometheus exporter for beer consumption
//
//  Config:   file → .env → BEER_* env → flags (figment)
//  Data:     static rows, or Postgres when a database is configured
//  Serving:  axum on tokio, one collector pulled per scrape
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

use beer_core::config::DatabaseOverrides;
use beer_core::{ConfigOverrides, ConfigSources, ConsumptionSource, ExporterConfig, StaticSource};
use beer_observability::metrics::register_process_metrics;
use beer_observability::{BeerCollector, ScrapeRegistry};
use beer_store::PgConsumptionSource;
use beer_web::server::{self, AppState};
use clap::{Parser, ValueEnum};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(
    name = "beer-exporter",
    version,
    about = "Beer Exporter: Prometheus exporter for beer consumption"
)]
struct Cli {
    /// Path to a YAML or TOML configuration file
    #[arg(short, long, env = "BEER_CONFIG_FILE")]
    config: Option<PathBuf>,

    /// dotenv file with BEER_* variables (defaults to ./.env when present)
    #[arg(long)]
    env_file: Option<PathBuf>,

    /// Address to listen on, e.g. 0.0.0.0:9141 or :9141
    #[arg(long)]
    listen_address: Option<String>,

    /// Path under which to expose metrics
    #[arg(long)]
    metrics_path: Option<String>,

    #[arg(long)]
    db_host: Option<String>,

    #[arg(long)]
    db_port: Option<u16>,

    #[arg(long)]
    db_user: Option<String>,

    #[arg(long)]
    db_password: Option<String>,

    #[arg(long)]
    db_database: Option<String>,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

impl Cli {
    fn config_sources(&self) -> ConfigSources {
        let env_file = self.env_file.clone().or_else(|| {
            let default = Path::new(".env");
            default.exists().then(|| default.to_path_buf())
        });

        ConfigSources {
            file: self.config.clone(),
            env_file,
            overrides: ConfigOverrides {
                listen_address: self.listen_address.clone(),
                metrics_path: self.metrics_path.clone(),
                database: DatabaseOverrides {
                    host: self.db_host.clone(),
                    port: self.db_port,
                    user: self.db_user.clone(),
                    password: self.db_password.clone(),
                    database: self.db_database.clone(),
                },
            },
        }
    }
}

fn init_tracing(level: &str, format: LogFormat) {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .with_target(false);

    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(&cli.log_level, cli.log_format);

    if let Err(e) = run(cli).await {
        error!(error = %format!("{e:#}"), "Beer Exporter failed");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    info!(version = env!("CARGO_PKG_VERSION"), "Beer Exporter starting");

    // ── Config ──
    let sources = cli.config_sources();
    if let Some(path) = &sources.file {
        info!(path = %path.display(), "Loading config file");
    }
    if let Some(path) = &sources.env_file {
        info!(path = %path.display(), "Loading env file");
    }
    let config = ExporterConfig::load(&sources)?;
    let addr = config.listen_addr()?;

    // ── Data source (database must be ready before we listen) ──
    let source: Arc<dyn ConsumptionSource> = match &config.database {
        Some(db) => {
            let pool = beer_store::connect(db).await?;
            beer_store::bootstrap(&pool).await?;
            Arc::new(PgConsumptionSource::new(pool))
        }
        None => {
            info!(
                rows = config.static_consumption.len(),
                "No database configured, serving static consumption"
            );
            Arc::new(StaticSource::new(config.static_consumption.clone()))
        }
    };

    // ── Registry ──
    let registry = prometheus::Registry::new();
    register_process_metrics(&registry)?;
    let mut scrape_registry = ScrapeRegistry::new(registry)?;
    let collector = BeerCollector::new(source, config.consumption_window())?
        .with_failure_counter(scrape_registry.metrics().scrape_failures_total.clone());
    scrape_registry.register(Arc::new(collector))?;

    // ── HTTP ──
    let state = Arc::new(AppState::new(scrape_registry, &config));
    let listener = server::bind(addr).await?;

    info!(
        addr = %addr,
        metrics_path = %config.metrics_path,
        "Beer Exporter is ready, serving scrapes"
    );

    server::serve(listener, state, server::shutdown_signal()).await?;

    info!("Beer Exporter stopped");
    Ok(())
}
