use crate::collector::NAMESPACE;
use prometheus::{Histogram, HistogramOpts, IntCounter, Opts, Registry};

const SUBSYSTEM: &str = "exporter";

/// The exporter's own operational metrics, registered on the long-lived registry.
#[derive(Clone)]
pub struct ScrapeMetrics {
    pub scrapes_total: IntCounter,
    pub scrape_failures_total: IntCounter,
    pub scrape_duration_seconds: Histogram,
}

impl ScrapeMetrics {
    pub fn new(registry: &Registry) -> prometheus::Result<Self> {
        let scrapes_total = IntCounter::with_opts(
            Opts::new("scrapes_total", "Total scrapes served.")
                .namespace(NAMESPACE)
                .subsystem(SUBSYSTEM),
        )?;

        let scrape_failures_total = IntCounter::with_opts(
            Opts::new(
                "scrape_failures_total",
                "Scrapes where the consumption source failed or timed out.",
            )
            .namespace(NAMESPACE)
            .subsystem(SUBSYSTEM),
        )?;

        let scrape_duration_seconds = Histogram::with_opts(
            HistogramOpts::new("scrape_duration_seconds", "Time spent collecting a scrape.")
                .namespace(NAMESPACE)
                .subsystem(SUBSYSTEM)
                .buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]),
        )?;

        registry.register(Box::new(scrapes_total.clone()))?;
        registry.register(Box::new(scrape_failures_total.clone()))?;
        registry.register(Box::new(scrape_duration_seconds.clone()))?;

        Ok(Self {
            scrapes_total,
            scrape_failures_total,
            scrape_duration_seconds,
        })
    }
}

/// Add process metrics (cpu, memory, fds) where the platform supports them.
#[cfg(target_os = "linux")]
pub fn register_process_metrics(registry: &Registry) -> prometheus::Result<()> {
    registry.register(Box::new(
        prometheus::process_collector::ProcessCollector::for_self(),
    ))
}

#[cfg(not(target_os = "linux"))]
pub fn register_process_metrics(_registry: &Registry) -> prometheus::Result<()> {
    Ok(())
}
