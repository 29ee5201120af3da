use crate::sample::MetricSample;
use async_trait::async_trait;
use beer_core::{ConsumptionSource, ExporterError, TimeWindow};
use prometheus::core::Desc;
use prometheus::{IntCounter, Opts};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Namespace prefixed to every metric the exporter emits.
pub const NAMESPACE: &str = "beer";

/// Pull-based collector: a fixed descriptor set, and fresh samples on demand.
#[async_trait]
pub trait ScrapeCollector: Send + Sync {
    /// Every descriptor this collector can ever emit.
    fn describe(&self) -> Vec<&Desc>;

    /// Produce this scrape's samples. Must finish within `deadline` and must
    /// not fail; problems are reported through the samples themselves.
    async fn collect(&self, deadline: Duration) -> Vec<MetricSample>;
}

/// Exposes `beer_up` and `beer_beers_consumed_total`.
///
/// `up` is 1 when the consumption source answered within the deadline. On a
/// source error or timeout it is 0 and the consumption family is omitted.
pub struct BeerCollector {
    up: Arc<Desc>,
    beers_consumed: Arc<Desc>,
    source: Arc<dyn ConsumptionSource>,
    window: Duration,
    failures: Option<IntCounter>,
}

impl BeerCollector {
    pub fn new(source: Arc<dyn ConsumptionSource>, window: Duration) -> prometheus::Result<Self> {
        let up = descriptor("up", "Was the last beer query successful.", &[])?;
        let beers_consumed = descriptor(
            "beers_consumed_total",
            "How many beers have been consumed (per person).",
            &["type", "person"],
        )?;
        Ok(Self {
            up: Arc::new(up),
            beers_consumed: Arc::new(beers_consumed),
            source,
            window,
            failures: None,
        })
    }

    /// Count source failures and timeouts on `counter`.
    pub fn with_failure_counter(mut self, counter: IntCounter) -> Self {
        self.failures = Some(counter);
        self
    }

    fn push(samples: &mut Vec<MetricSample>, desc: &Arc<Desc>, value: f64, labels: Vec<String>) {
        match MetricSample::new(Arc::clone(desc), value, labels) {
            Ok(sample) => samples.push(sample),
            Err(e) => warn!(metric = %desc.fq_name, error = %e, "Dropping malformed sample"),
        }
    }
}

fn descriptor(name: &str, help: &str, labels: &[&str]) -> prometheus::Result<Desc> {
    let opts = Opts::new(name, help).namespace(NAMESPACE);
    Desc::new(
        opts.fq_name(),
        opts.help,
        labels.iter().map(|l| l.to_string()).collect(),
        HashMap::new(),
    )
}

#[async_trait]
impl ScrapeCollector for BeerCollector {
    fn describe(&self) -> Vec<&Desc> {
        vec![self.up.as_ref(), self.beers_consumed.as_ref()]
    }

    async fn collect(&self, deadline: Duration) -> Vec<MetricSample> {
        let window = TimeWindow::ending_now(self.window);
        let result = match tokio::time::timeout(deadline, self.source.consumption(window)).await {
            Ok(result) => result,
            Err(_) => Err(ExporterError::Timeout(deadline)),
        };

        let mut samples = Vec::with_capacity(2);
        match result {
            Ok(rows) => {
                Self::push(&mut samples, &self.up, 1.0, Vec::new());
                for row in rows {
                    Self::push(
                        &mut samples,
                        &self.beers_consumed,
                        row.count as f64,
                        vec![row.beer_type, row.person],
                    );
                }
            }
            Err(e) => {
                warn!(source = self.source.name(), error = %e, "Consumption source unavailable, reporting up=0");
                if let Some(ref failures) = self.failures {
                    failures.inc();
                }
                Self::push(&mut samples, &self.up, 0.0, Vec::new());
            }
        }

        info!(source = self.source.name(), samples = samples.len(), "Endpoint scraped");
        samples
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use beer_core::{Consumption, StaticSource};

    const DEADLINE: Duration = Duration::from_secs(5);

    struct FailingSource;

    #[async_trait]
    impl ConsumptionSource for FailingSource {
        fn name(&self) -> &'static str {
            "failing"
        }

        async fn consumption(&self, _window: TimeWindow) -> Result<Vec<Consumption>, ExporterError> {
            Err(ExporterError::Source("connection reset".into()))
        }
    }

    struct SlowSource(Duration);

    #[async_trait]
    impl ConsumptionSource for SlowSource {
        fn name(&self) -> &'static str {
            "slow"
        }

        async fn consumption(&self, _window: TimeWindow) -> Result<Vec<Consumption>, ExporterError> {
            tokio::time::sleep(self.0).await;
            Ok(vec![Consumption::new("pils", "late", 1)])
        }
    }

    fn collector(source: impl ConsumptionSource + 'static) -> BeerCollector {
        BeerCollector::new(Arc::new(source), Duration::from_secs(3600)).unwrap()
    }

    fn assert_default_samples(samples: &[MetricSample]) {
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].name(), "beer_up");
        assert_eq!(samples[0].value(), 1.0);
        assert!(samples[0].label_values().is_empty());
        assert_eq!(samples[1].name(), "beer_beers_consumed_total");
        assert_eq!(samples[1].value(), 2.0);
        assert_eq!(samples[1].label_values(), ["schwarzbier", "mike"]);
    }

    // ── describe() ───────────────────────────────────────────────

    #[test]
    fn describe_returns_both_descriptors_in_order() {
        let c = collector(StaticSource::sample());
        let descs = c.describe();
        assert_eq!(descs.len(), 2);
        assert_eq!(descs[0].fq_name, "beer_up");
        assert!(descs[0].variable_labels.is_empty());
        assert_eq!(descs[1].fq_name, "beer_beers_consumed_total");
        assert_eq!(descs[1].variable_labels, ["type", "person"]);
        assert_eq!(descs[0].help, "Was the last beer query successful.");
    }

    #[test]
    fn describe_is_stable_across_calls() {
        let c = collector(StaticSource::sample());
        let first: Vec<_> = c.describe().iter().map(|d| d.id).collect();
        let second: Vec<_> = c.describe().iter().map(|d| d.id).collect();
        assert_eq!(first, second);
    }

    // ── collect() ────────────────────────────────────────────────

    #[tokio::test]
    async fn collect_emits_up_and_sample_consumption() {
        let c = collector(StaticSource::sample());
        assert_default_samples(&c.collect(DEADLINE).await);
    }

    #[tokio::test]
    async fn repeated_collects_are_identical() {
        let c = collector(StaticSource::sample());
        for _ in 0..10 {
            assert_default_samples(&c.collect(DEADLINE).await);
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_collects_are_identical() {
        let c = Arc::new(collector(StaticSource::sample()));
        let handles: Vec<_> = (0..32)
            .map(|_| {
                let c = Arc::clone(&c);
                tokio::spawn(async move { c.collect(DEADLINE).await })
            })
            .collect();
        for handle in handles {
            assert_default_samples(&handle.await.unwrap());
        }
    }

    #[tokio::test]
    async fn one_sample_per_source_row() {
        let c = collector(StaticSource::new(vec![
            Consumption::new("pils", "anna", 1),
            Consumption::new("weizen", "bob", 4),
        ]));
        let samples = c.collect(DEADLINE).await;
        assert_eq!(samples.len(), 3);
        assert_eq!(samples[2].label("person"), Some("bob"));
        assert_eq!(samples[2].value(), 4.0);
    }

    #[tokio::test]
    async fn source_error_reports_up_zero_and_omits_consumption() {
        let failures = IntCounter::new("failures", "test failures").unwrap();
        let c = collector(FailingSource).with_failure_counter(failures.clone());
        let samples = c.collect(DEADLINE).await;
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].name(), "beer_up");
        assert_eq!(samples[0].value(), 0.0);
        assert_eq!(failures.get(), 1);
    }

    #[tokio::test]
    async fn slow_source_times_out_with_up_zero() {
        let c = collector(SlowSource(Duration::from_secs(30)));
        let started = std::time::Instant::now();
        let samples = c.collect(Duration::from_millis(50)).await;
        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].value(), 0.0);
    }
}
