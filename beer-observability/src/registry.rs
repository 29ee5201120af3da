use crate::collector::ScrapeCollector;
use crate::exposition::encode_text;
use crate::metrics::ScrapeMetrics;
use crate::sample::gauge_families;
use prometheus::Registry;
use prometheus::proto::MetricFamily;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::warn;

/// Explicit registry handed to the HTTP layer.
///
/// Holds the scrape collectors alongside a plain prometheus [`Registry`] for
/// the exporter's own metrics. Collectors are registered at startup; after
/// that the registry is only read, so gathering takes no locks.
pub struct ScrapeRegistry {
    registry: Registry,
    collectors: Vec<Arc<dyn ScrapeCollector>>,
    claimed: HashSet<String>,
    metrics: ScrapeMetrics,
}

impl ScrapeRegistry {
    pub fn new(registry: Registry) -> prometheus::Result<Self> {
        let metrics = ScrapeMetrics::new(&registry)?;
        Ok(Self {
            registry,
            collectors: Vec::new(),
            claimed: HashSet::new(),
            metrics,
        })
    }

    /// Add a collector. Fails if it has no descriptors, repeats a name, or
    /// claims a name already taken by another collector or the inner registry.
    ///
    /// The inner registry is only visible through what it currently gathers,
    /// so a vector with no children yet is not seen here; [`gather`](Self::gather)
    /// drops any inner family that shadows a claimed name.
    pub fn register(&mut self, collector: Arc<dyn ScrapeCollector>) -> prometheus::Result<()> {
        let descs = collector.describe();
        if descs.is_empty() {
            return Err(prometheus::Error::Msg(
                "collector has no descriptors".to_string(),
            ));
        }

        let taken: HashSet<String> = self
            .registry
            .gather()
            .iter()
            .map(|mf| mf.get_name().to_string())
            .collect();

        let mut names = HashSet::new();
        for desc in &descs {
            let name = desc.fq_name.as_str();
            if !names.insert(name) || self.claimed.contains(name) || taken.contains(name) {
                return Err(prometheus::Error::AlreadyReg);
            }
        }

        self.claimed.extend(names.into_iter().map(str::to_string));
        self.collectors.push(collector);
        Ok(())
    }

    pub fn metrics(&self) -> &ScrapeMetrics {
        &self.metrics
    }

    pub fn len(&self) -> usize {
        self.collectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.collectors.is_empty()
    }

    /// Run every collector within a shared `deadline`, then append the inner
    /// registry's families, skipping any whose name a collector owns. Families
    /// are sorted by name.
    pub async fn gather(&self, deadline: Duration) -> Vec<MetricFamily> {
        let started = Instant::now();
        let timer = self.metrics.scrape_duration_seconds.start_timer();
        self.metrics.scrapes_total.inc();

        let mut families = Vec::new();
        for collector in &self.collectors {
            let remaining = deadline.saturating_sub(started.elapsed());
            families.extend(gauge_families(&collector.collect(remaining).await));
        }
        timer.observe_duration();

        for family in self.registry.gather() {
            if self.claimed.contains(family.get_name()) {
                warn!(metric = family.get_name(), "Dropping inner family that shadows a collector");
                continue;
            }
            families.push(family);
        }
        families.sort_by(|a, b| a.get_name().cmp(b.get_name()));
        families
    }

    /// Gather and encode in the text exposition format.
    pub async fn render(&self, deadline: Duration) -> prometheus::Result<String> {
        encode_text(&self.gather(deadline).await)
    }
}
