pub mod config;
pub mod consumption;
pub mod error;

pub use config::{ConfigOverrides, ConfigSources, DatabaseConfig, ExporterConfig};
pub use consumption::{Consumption, ConsumptionSource, StaticSource, TimeWindow};
pub use error::ExporterError;
