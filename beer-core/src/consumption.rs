use crate::error::ExporterError;
use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Beers of one type consumed by one person within a window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Consumption {
    pub beer_type: String,
    pub person: String,
    pub count: u64,
}

impl Consumption {
    pub fn new(beer_type: impl Into<String>, person: impl Into<String>, count: u64) -> Self {
        Self {
            beer_type: beer_type.into(),
            person: person.into(),
            count,
        }
    }
}

/// Half-open `[start, end)` interval in UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    /// Build a window, swapping the bounds if they arrive reversed.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        if end < start {
            Self { start: end, end: start }
        } else {
            Self { start, end }
        }
    }

    /// The `length` immediately preceding `end`. Saturates at the earliest
    /// representable instant.
    pub fn trailing(length: Duration, end: DateTime<Utc>) -> Self {
        let start = TimeDelta::from_std(length)
            .ok()
            .and_then(|delta| end.checked_sub_signed(delta))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        Self { start, end }
    }

    pub fn ending_now(length: Duration) -> Self {
        Self::trailing(length, Utc::now())
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start <= at && at < self.end
    }
}

/// Provider of consumption counts per person and beer type.
///
/// Implementations are shared across concurrent scrapes and must treat every
/// call as an independent read.
#[async_trait]
pub trait ConsumptionSource: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    async fn consumption(&self, window: TimeWindow) -> Result<Vec<Consumption>, ExporterError>;
}

/// Fixed rows, independent of the window. Used when no database is configured.
#[derive(Debug, Clone)]
pub struct StaticSource {
    rows: Vec<Consumption>,
}

impl StaticSource {
    pub fn new(rows: Vec<Consumption>) -> Self {
        Self { rows }
    }

    /// The placeholder data served out of the box: two schwarzbiers for mike.
    pub fn sample() -> Self {
        Self::new(vec![Consumption::new("schwarzbier", "mike", 2)])
    }

    pub fn rows(&self) -> &[Consumption] {
        &self.rows
    }
}

impl Default for StaticSource {
    fn default() -> Self {
        Self::sample()
    }
}

#[async_trait]
impl ConsumptionSource for StaticSource {
    fn name(&self) -> &'static str {
        "static"
    }

    async fn consumption(&self, _window: TimeWindow) -> Result<Vec<Consumption>, ExporterError> {
        Ok(self.rows.clone())
    }
}
