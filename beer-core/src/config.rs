use crate::consumption::Consumption;
use crate::error::ExporterError;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml, Yaml},
    value::Value,
};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashSet;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Prefix shared by every environment (and `.env`) variable the exporter reads.
pub const ENV_PREFIX: &str = "BEER_";

/// Route served by the liveness handler; the metrics path may not shadow it.
pub const HEALTH_PATH: &str = "/health";

/// Longest accepted consumption window (ten years).
pub const MAX_CONSUMPTION_WINDOW_SECS: u64 = 10 * 365 * 86_400;

/// Keys whose values are kept as text when read from the environment or `.env`.
const TEXT_KEYS: &[&str] = &[
    "listen_address",
    "metrics_path",
    "database.host",
    "database.user",
    "database.password",
    "database.database",
];

/// Top-level exporter configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExporterConfig {
    #[serde(default = "default_listen_address", deserialize_with = "text")]
    pub listen_address: String,
    #[serde(default = "default_metrics_path", deserialize_with = "text")]
    pub metrics_path: String,
    /// Upper bound for a single scrape, also used when the scraper sends no deadline.
    #[serde(default = "default_scrape_timeout")]
    pub scrape_timeout_secs: f64,
    /// Subtracted from the scraper's advertised deadline to leave room for encoding.
    #[serde(default = "default_scrape_timeout_offset")]
    pub scrape_timeout_offset_secs: f64,
    #[serde(default = "default_consumption_window")]
    pub consumption_window_secs: u64,
    /// Rows served when no database is configured.
    #[serde(default = "default_static_consumption")]
    pub static_consumption: Vec<Consumption>,
    #[serde(default)]
    pub database: Option<DatabaseConfig>,
}

/// Postgres connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(deserialize_with = "text")]
    pub host: String,
    #[serde(default = "default_db_port")]
    pub port: u16,
    #[serde(default = "default_db_user", deserialize_with = "text")]
    pub user: String,
    #[serde(default, deserialize_with = "text")]
    pub password: String,
    #[serde(default = "default_db_database", deserialize_with = "text")]
    pub database: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

/// Values supplied on the command line. Unset fields leave lower layers untouched.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ConfigOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub listen_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics_path: Option<String>,
    #[serde(skip_serializing_if = "DatabaseOverrides::is_empty")]
    pub database: DatabaseOverrides,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DatabaseOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
}

impl DatabaseOverrides {
    pub fn is_empty(&self) -> bool {
        self.host.is_none()
            && self.port.is_none()
            && self.user.is_none()
            && self.password.is_none()
            && self.database.is_none()
    }
}

/// Where configuration is read from. Layers apply in this order, later wins:
/// defaults, `file`, `env_file`, process environment, `overrides`.
#[derive(Debug, Clone, Default)]
pub struct ConfigSources {
    /// YAML (`.yaml`/`.yml`) or TOML (`.toml`) file.
    pub file: Option<PathBuf>,
    /// dotenv-style file; only `BEER_`-prefixed keys are read.
    pub env_file: Option<PathBuf>,
    pub overrides: ConfigOverrides,
}

// ── Defaults ──────────────────────────────────────────────────

fn default_listen_address() -> String { "0.0.0.0:9141".into() }
fn default_metrics_path() -> String { "/metrics".into() }
fn default_scrape_timeout() -> f64 { 10.0 }
fn default_scrape_timeout_offset() -> f64 { 0.5 }
fn default_consumption_window() -> u64 { 86_400 }
fn default_static_consumption() -> Vec<Consumption> {
    vec![Consumption::new("schwarzbier", "mike", 2)]
}
fn default_db_port() -> u16 { 5432 }
fn default_db_user() -> String { "api".into() }
fn default_db_database() -> String { "beer_exporter".into() }
fn default_max_connections() -> u32 { 5 }
fn default_connect_timeout() -> u64 { 5 }

/// A string setting that also accepts a bare number or bool, so
/// `password: 123456` in a file reads as the text `"123456"`.
fn text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Text {
        Str(String),
        Int(i64),
        UInt(u64),
        Float(f64),
        Bool(bool),
    }

    Ok(match Text::deserialize(deserializer)? {
        Text::Str(s) => s,
        Text::Int(n) => n.to_string(),
        Text::UInt(n) => n.to_string(),
        Text::Float(n) => n.to_string(),
        Text::Bool(b) => b.to_string(),
    })
}

// ── Impls ─────────────────────────────────────────────────────

impl Default for ExporterConfig {
    fn default() -> Self {
        Self {
            listen_address: default_listen_address(),
            metrics_path: default_metrics_path(),
            scrape_timeout_secs: default_scrape_timeout(),
            scrape_timeout_offset_secs: default_scrape_timeout_offset(),
            consumption_window_secs: default_consumption_window(),
            static_consumption: default_static_consumption(),
            database: None,
        }
    }
}

impl DatabaseConfig {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: default_db_port(),
            user: default_db_user(),
            password: String::new(),
            database: default_db_database(),
            max_connections: default_max_connections(),
            connect_timeout_secs: default_connect_timeout(),
        }
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Connection URL with the password masked, for logs.
    pub fn redacted_url(&self) -> String {
        format!(
            "postgresql://{}:***@{}:{}/{}",
            self.user, self.host, self.port, self.database
        )
    }
}

impl ExporterConfig {
    /// Load configuration from every layer in `sources`, then validate it.
    pub fn load(sources: &ConfigSources) -> Result<Self, ExporterError> {
        let config: ExporterConfig = Self::figment(sources)?.extract()?;
        config.validate()?;
        Ok(config)
    }

    fn figment(sources: &ConfigSources) -> Result<Figment, ExporterError> {
        let mut figment = Figment::new();

        if let Some(path) = &sources.file {
            if !path.exists() {
                return Err(ExporterError::Config(format!(
                    "config file not found: {}",
                    path.display()
                )));
            }
            figment = match path.extension().and_then(|e| e.to_str()) {
                Some("toml") => figment.merge(Toml::file(path)),
                Some("yaml") | Some("yml") => figment.merge(Yaml::file(path)),
                _ => {
                    return Err(ExporterError::Config(format!(
                        "unsupported config format (expected .yaml, .yml or .toml): {}",
                        path.display()
                    )));
                }
            };
        }

        if let Some(path) = &sources.env_file {
            figment = figment.merge(dotenv_layer(path)?);
        }

        let env = Env::prefixed(ENV_PREFIX);
        let process_env: Vec<(String, String)> = env
            .iter()
            .map(|(key, raw)| (key.as_str().to_string(), raw))
            .collect();

        Ok(figment
            .merge(env_layer(process_env))
            .merge(Serialized::defaults(&sources.overrides)))
    }

    pub fn validate(&self) -> Result<(), ExporterError> {
        self.listen_addr()?;

        if !self.metrics_path.starts_with('/')
            || self.metrics_path == "/"
            || self.metrics_path == HEALTH_PATH
            || self
                .metrics_path
                .contains(|c: char| matches!(c, '{' | '}' | '*' | ':') || c.is_whitespace())
        {
            return Err(ExporterError::Config(format!(
                "metrics_path must be a plain absolute path other than '/' and '{HEALTH_PATH}': {:?}",
                self.metrics_path
            )));
        }
        if !(self.scrape_timeout_secs.is_finite() && self.scrape_timeout_secs > 0.0) {
            return Err(ExporterError::Config(format!(
                "scrape_timeout_secs must be positive, got {}",
                self.scrape_timeout_secs
            )));
        }
        if !(self.scrape_timeout_offset_secs.is_finite() && self.scrape_timeout_offset_secs >= 0.0) {
            return Err(ExporterError::Config(format!(
                "scrape_timeout_offset_secs must not be negative, got {}",
                self.scrape_timeout_offset_secs
            )));
        }
        if let Some(db) = &self.database
            && db.host.trim().is_empty()
        {
            return Err(ExporterError::Config("database.host must not be empty".into()));
        }
        if !(1..=MAX_CONSUMPTION_WINDOW_SECS).contains(&self.consumption_window_secs) {
            return Err(ExporterError::Config(format!(
                "consumption_window_secs must be between 1 and {MAX_CONSUMPTION_WINDOW_SECS}, got {}",
                self.consumption_window_secs
            )));
        }

        let mut series = HashSet::new();
        for row in &self.static_consumption {
            if !series.insert((row.beer_type.as_str(), row.person.as_str())) {
                return Err(ExporterError::Config(format!(
                    "static_consumption lists type={:?} person={:?} more than once",
                    row.beer_type, row.person
                )));
            }
        }
        Ok(())
    }

    /// Parsed bind address. A bare `:port` binds every interface.
    pub fn listen_addr(&self) -> Result<SocketAddr, ExporterError> {
        let raw = self.listen_address.trim();
        let full = if raw.starts_with(':') {
            format!("0.0.0.0{raw}")
        } else {
            raw.to_string()
        };
        full.parse()
            .map_err(|_| ExporterError::InvalidAddress(raw.to_string()))
    }

    pub fn scrape_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.scrape_timeout_secs)
    }

    pub fn scrape_timeout_offset(&self) -> Duration {
        Duration::from_secs_f64(self.scrape_timeout_offset_secs)
    }

    pub fn consumption_window(&self) -> Duration {
        Duration::from_secs(self.consumption_window_secs)
    }
}

/// Map a prefix-stripped variable name to a config key. The flat legacy names
/// are kept; anything else nests on `__`.
fn env_key(name: &str) -> String {
    let name = name.to_ascii_lowercase();
    let key = match name.as_str() {
        "applistenaddress" => "listen_address",
        "appmetricspath" => "metrics_path",
        "dbhost" => "database.host",
        "dbport" => "database.port",
        "dbuser" => "database.user",
        "dbpassword" => "database.password",
        "dbdatabase" => "database.database",
        _ => return name.replace("__", "."),
    };
    key.to_string()
}

/// Build a figment layer from prefix-stripped `(name, value)` pairs. Values of
/// [`TEXT_KEYS`] stay text verbatim (`007` keeps its zeros); the rest are parsed
/// the way figment parses environment values.
fn env_layer(pairs: impl IntoIterator<Item = (String, String)>) -> Figment {
    pairs.into_iter().fold(Figment::new(), |layer, (name, raw)| {
        let key = env_key(&name);
        let value = if TEXT_KEYS.contains(&key.as_str()) {
            Value::from(raw)
        } else {
            raw.parse().unwrap_or_else(|never| match never {})
        };
        layer.merge(Serialized::default(&key, value))
    })
}

/// Read a dotenv file into a figment layer using the same key mapping as the
/// process environment. The process environment itself is left untouched.
fn dotenv_layer(path: &Path) -> Result<Figment, ExporterError> {
    let entries = dotenvy::from_path_iter(path)
        .map_err(|e| ExporterError::Config(format!("{}: {e}", path.display())))?;

    let mut pairs = Vec::new();
    for entry in entries {
        let (name, raw) =
            entry.map_err(|e| ExporterError::Config(format!("{}: {e}", path.display())))?;
        if let Some(stripped) = strip_env_prefix(&name) {
            pairs.push((stripped.to_string(), raw));
        }
    }
    Ok(env_layer(pairs))
}

fn strip_env_prefix(name: &str) -> Option<&str> {
    let head = name.get(..ENV_PREFIX.len())?;
    if head.eq_ignore_ascii_case(ENV_PREFIX) {
        Some(&name[ENV_PREFIX.len()..])
    } else {
        None
    }
}
