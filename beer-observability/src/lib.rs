pub mod collector;
pub mod exposition;
pub mod metrics;
pub mod registry;
pub mod sample;

pub use collector::{BeerCollector, NAMESPACE, ScrapeCollector};
pub use exposition::{CONTENT_TYPE, encode_text};
pub use metrics::ScrapeMetrics;
pub use registry::ScrapeRegistry;
pub use sample::MetricSample;
