use prometheus::core::Desc;
use prometheus::proto::{Gauge, LabelPair, Metric, MetricFamily, MetricType};
use std::sync::Arc;

/// One label-bound value produced during a scrape.
///
/// Label values are stored in the descriptor's declared label order; the
/// constructor rejects a count mismatch.
#[derive(Debug, Clone)]
pub struct MetricSample {
    desc: Arc<Desc>,
    value: f64,
    label_values: Vec<String>,
}

impl MetricSample {
    pub fn new(desc: Arc<Desc>, value: f64, label_values: Vec<String>) -> prometheus::Result<Self> {
        if desc.variable_labels.len() != label_values.len() {
            return Err(prometheus::Error::InconsistentCardinality {
                expect: desc.variable_labels.len(),
                got: label_values.len(),
            });
        }
        Ok(Self {
            desc,
            value,
            label_values,
        })
    }

    pub fn desc(&self) -> &Desc {
        &self.desc
    }

    pub fn name(&self) -> &str {
        &self.desc.fq_name
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn label_values(&self) -> &[String] {
        &self.label_values
    }

    /// Value of the label called `name`, if the descriptor declares it.
    pub fn label(&self, name: &str) -> Option<&str> {
        self.desc
            .variable_labels
            .iter()
            .position(|l| l == name)
            .map(|i| self.label_values[i].as_str())
    }

    fn to_metric(&self) -> Metric {
        let mut metric = Metric::default();
        for pair in &self.desc.const_label_pairs {
            metric.mut_label().push(pair.clone());
        }
        for (name, value) in self.desc.variable_labels.iter().zip(&self.label_values) {
            let mut pair = LabelPair::default();
            pair.set_name(name.clone());
            pair.set_value(value.clone());
            metric.mut_label().push(pair);
        }
        let mut gauge = Gauge::default();
        gauge.set_value(self.value);
        metric.set_gauge(gauge);
        metric
    }
}

/// Group samples into gauge families, one per descriptor, in first-seen order.
/// Families are only created for descriptors that have at least one sample.
pub fn gauge_families(samples: &[MetricSample]) -> Vec<MetricFamily> {
    let mut families: Vec<MetricFamily> = Vec::new();
    for sample in samples {
        let idx = match families.iter().position(|f| f.get_name() == sample.name()) {
            Some(idx) => idx,
            None => {
                let mut family = MetricFamily::default();
                family.set_name(sample.desc.fq_name.clone());
                family.set_help(sample.desc.help.clone());
                family.set_field_type(MetricType::GAUGE);
                families.push(family);
                families.len() - 1
            }
        };
        families[idx].mut_metric().push(sample.to_metric());
    }
    families
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn desc(name: &str, labels: &[&str]) -> Arc<Desc> {
        Arc::new(
            Desc::new(
                name.to_string(),
                format!("{name} help"),
                labels.iter().map(|l| l.to_string()).collect(),
                HashMap::new(),
            )
            .unwrap(),
        )
    }

    #[test]
    fn label_count_must_match_descriptor() {
        let d = desc("beer_test", &["type", "person"]);
        let err = MetricSample::new(d.clone(), 1.0, vec!["pils".into()]).unwrap_err();
        assert!(matches!(
            err,
            prometheus::Error::InconsistentCardinality { expect: 2, got: 1 }
        ));
        assert!(MetricSample::new(d, 1.0, vec!["pils".into(), "anna".into()]).is_ok());
    }

    #[test]
    fn label_lookup_follows_declared_order() {
        let d = desc("beer_test", &["type", "person"]);
        let s = MetricSample::new(d, 3.0, vec!["weizen".into(), "bob".into()]).unwrap();
        assert_eq!(s.label("type"), Some("weizen"));
        assert_eq!(s.label("person"), Some("bob"));
        assert_eq!(s.label("missing"), None);
        assert_eq!(s.name(), "beer_test");
        assert_eq!(s.value(), 3.0);
    }

    #[test]
    fn samples_group_into_one_family_per_descriptor() {
        let up = desc("beer_up", &[]);
        let consumed = desc("beer_consumed", &["type", "person"]);
        let samples = vec![
            MetricSample::new(up, 1.0, vec![]).unwrap(),
            MetricSample::new(consumed.clone(), 2.0, vec!["a".into(), "x".into()]).unwrap(),
            MetricSample::new(consumed, 5.0, vec!["b".into(), "y".into()]).unwrap(),
        ];

        let families = gauge_families(&samples);
        assert_eq!(families.len(), 2);
        assert_eq!(families[0].get_name(), "beer_up");
        assert_eq!(families[0].get_field_type(), MetricType::GAUGE);
        assert_eq!(families[1].get_metric().len(), 2);

        let second = &families[1].get_metric()[1];
        let labels: Vec<_> = second
            .get_label()
            .iter()
            .map(|l| (l.get_name(), l.get_value()))
            .collect();
        assert_eq!(labels, vec![("type", "b"), ("person", "y")]);
        assert_eq!(second.get_gauge().get_value(), 5.0);
    }

    #[test]
    fn no_samples_means_no_families() {
        assert!(gauge_families(&[]).is_empty());
    }
}
