use chrono::{DateTime, Utc};
use promock_core::{Sample, SeriesKey};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub at: DateTime<Utc>,
    pub value: f64,
}

/// Every observation of one series across the corpus, oldest first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesObservations {
    pub key: SeriesKey,
    pub points: Vec<Observation>,
}

impl SeriesObservations {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.points.iter().map(|p| p.value)
    }

    /// True when there are at least two points and none of them decreases.
    pub fn is_non_decreasing(&self) -> bool {
        self.points.len() >= 2 && self.points.windows(2).all(|w| w[1].value >= w[0].value)
    }
}

pub struct SeriesAggregator;

impl SeriesAggregator {
    /// Group samples by exact series identity and order each group by time.
    ///
    /// Ties keep input order. Non-finite values are dropped, and a series left
    /// with no points does not appear in the result.
    pub fn aggregate<'a, I>(samples: I) -> BTreeMap<SeriesKey, SeriesObservations>
    where
        I: IntoIterator<Item = &'a Sample>,
    {
        let mut series: BTreeMap<SeriesKey, SeriesObservations> = BTreeMap::new();

        for sample in samples {
            if !sample.value.is_finite() {
                trace!("Dropping non-finite observation for {}", sample.key);
                continue;
            }

            series
                .entry(sample.key.clone())
                .or_insert_with(|| SeriesObservations {
                    key: sample.key.clone(),
                    points: Vec::new(),
                })
                .points
                .push(Observation {
                    at: sample.observed_at,
                    value: sample.value,
                });
        }

        for observations in series.values_mut() {
            observations.points.sort_by_key(|p| p.at);
        }

        series
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use promock_core::LabelSet;

    fn sample(name: &str, labels: &[(&str, &str)], value: f64, minute: i64) -> Sample {
        let base = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let labels: LabelSet = labels.iter().copied().collect();
        Sample::new(SeriesKey::new(name, labels), value, base + Duration::minutes(minute))
    }

    #[test]
    fn test_aggregation_orders_by_time() {
        let samples = vec![
            sample("reqs", &[("code", "200")], 30.0, 10),
            sample("reqs", &[("code", "200")], 10.0, 0),
            sample("reqs", &[("code", "200")], 20.0, 5),
        ];

        let series = SeriesAggregator::aggregate(&samples);

        assert_eq!(series.len(), 1);
        let values: Vec<f64> = series.values().next().unwrap().values().collect();
        assert_eq!(values, vec![10.0, 20.0, 30.0]);
    }

    #[test]
    fn test_aggregation_is_label_exact() {
        let samples = vec![
            sample("reqs", &[("code", "200"), ("method", "GET")], 1.0, 0),
            sample("reqs", &[("code", "500"), ("method", "GET")], 2.0, 0),
            sample("reqs", &[("method", "GET"), ("code", "200")], 3.0, 1),
        ];

        let series = SeriesAggregator::aggregate(&samples);

        assert_eq!(series.len(), 2);
        let ok: LabelSet = [("code", "200"), ("method", "GET")].into_iter().collect();
        assert_eq!(series[&SeriesKey::new("reqs", ok)].len(), 2);
    }

    #[test]
    fn test_equal_timestamps_keep_input_order() {
        let samples = vec![
            sample("g", &[], 5.0, 0),
            sample("g", &[], 7.0, 0),
            sample("g", &[], 6.0, 0),
        ];

        let series = SeriesAggregator::aggregate(&samples);
        let values: Vec<f64> = series[&SeriesKey::bare("g")].values().collect();
        assert_eq!(values, vec![5.0, 7.0, 6.0]);
    }

    #[test]
    fn test_non_finite_values_are_dropped() {
        let samples = vec![
            sample("g", &[], f64::NAN, 0),
            sample("g", &[], 4.0, 1),
            sample("h", &[], f64::INFINITY, 0),
        ];

        let series = SeriesAggregator::aggregate(&samples);

        assert_eq!(series.len(), 1);
        assert_eq!(series[&SeriesKey::bare("g")].len(), 1);
    }
}
