use crate::aggregator::{Observation, SeriesObservations};
use promock_core::{resolve_family, MetricFamily, SeriesKey, SeriesKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Learned increment-per-minute distribution of a counter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RateStats {
    pub mean_per_minute: f64,
    pub std_dev_per_minute: f64,
    pub samples: usize,
}

/// Statistical summary of one series, fixed for a refresh cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesModel {
    pub key: SeriesKey,
    pub kind: SeriesKind,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
    /// Highest value observed; where a counter resumes from.
    pub seed_value: f64,
    pub observations: usize,
    /// Only present for counters with at least two usable rate samples.
    pub rate: Option<RateStats>,
}

pub struct ModelBuilder;

impl ModelBuilder {
    /// Build models for every series, taking declared kinds from `families`.
    pub fn build_all(
        series: &BTreeMap<SeriesKey, SeriesObservations>,
        families: &BTreeMap<String, MetricFamily>,
    ) -> BTreeMap<SeriesKey, SeriesModel> {
        series
            .iter()
            .filter_map(|(key, observations)| {
                let declared = resolve_family(families, &key.name)
                    .and_then(|f| f.kind)
                    .and_then(|k| k.declared_series_kind());
                Self::build(observations, declared).map(|model| (key.clone(), model))
            })
            .collect()
    }

    /// Reduce one series to its model. Returns `None` for an empty series.
    pub fn build(observations: &SeriesObservations, declared: Option<SeriesKind>) -> Option<SeriesModel> {
        let values: Vec<f64> = observations.values().collect();
        let (mean, std_dev) = mean_and_std_dev(&values)?;
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        let kind = declared.unwrap_or(if observations.is_non_decreasing() {
            SeriesKind::Counter
        } else {
            SeriesKind::Gauge
        });

        let rate = match kind {
            SeriesKind::Counter => learn_rate(&observations.points),
            SeriesKind::Gauge => None,
        };

        if kind == SeriesKind::Counter && rate.is_none() {
            debug!(
                "No learnable rate for counter {} ({} observations)",
                observations.key,
                values.len()
            );
        }

        Some(SeriesModel {
            key: observations.key.clone(),
            kind,
            min,
            max,
            // Rounding can push the mean a hair outside the observed range.
            mean: mean.clamp(min, max),
            std_dev,
            seed_value: max,
            observations: values.len(),
            rate,
        })
    }
}

/// Increment-per-minute samples between consecutive observations.
///
/// A negative delta is a counter reset and is left out, as are pairs with no
/// elapsed time between them.
pub fn rate_samples(points: &[Observation]) -> Vec<f64> {
    points
        .windows(2)
        .filter_map(|pair| {
            let minutes = (pair[1].at - pair[0].at).num_milliseconds() as f64 / 60_000.0;
            let delta = pair[1].value - pair[0].value;
            if minutes <= 0.0 {
                return None;
            }
            if delta < 0.0 {
                debug!("Counter reset at {}, excluding delta {}", pair[1].at, delta);
                return None;
            }
            Some(delta / minutes)
        })
        .collect()
}

fn learn_rate(points: &[Observation]) -> Option<RateStats> {
    let samples = rate_samples(points);
    if samples.len() < 2 {
        return None;
    }
    let (mean, std_dev) = mean_and_std_dev(&samples)?;
    Some(RateStats {
        mean_per_minute: mean,
        std_dev_per_minute: std_dev,
        samples: samples.len(),
    })
}

/// Mean and population standard deviation.
pub fn mean_and_std_dev(values: &[f64]) -> Option<(f64, f64)> {
    if values.is_empty() {
        return None;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    Some((mean, variance.sqrt()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::SeriesAggregator;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use promock_core::{LabelSet, MetricKind, Sample};

    fn t0() -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000, 0).unwrap()
    }

    fn series(values: &[(i64, f64)]) -> SeriesObservations {
        let key = SeriesKey::new(
            "http_requests_total",
            [("endpoint", "/login")].into_iter().collect::<LabelSet>(),
        );
        SeriesObservations {
            key,
            points: values
                .iter()
                .map(|(minute, value)| Observation {
                    at: t0() + Duration::minutes(*minute),
                    value: *value,
                })
                .collect(),
        }
    }

    #[test]
    fn test_rate_learning_from_three_snapshots() {
        let obs = series(&[(0, 1000.0), (5, 1240.0), (10, 1510.0)]);

        let samples = rate_samples(&obs.points);
        assert_eq!(samples.len(), 2);
        assert!((samples[0] - 48.0).abs() < 1e-9);
        assert!((samples[1] - 54.0).abs() < 1e-9);

        let model = ModelBuilder::build(&obs, Some(SeriesKind::Counter)).unwrap();
        let rate = model.rate.unwrap();
        assert!((rate.mean_per_minute - 51.0).abs() < 1e-9);
        assert!((rate.std_dev_per_minute - 3.0).abs() < 1e-9);
        assert_eq!(model.seed_value, 1510.0);
    }

    #[test]
    fn test_counter_reset_is_excluded() {
        let obs = series(&[(0, 1000.0), (5, 1240.0), (10, 40.0), (15, 340.0), (20, 640.0)]);

        let samples = rate_samples(&obs.points);
        assert_eq!(samples.len(), 3);
        assert!(samples.iter().all(|s| *s >= 0.0));

        let model = ModelBuilder::build(&obs, Some(SeriesKind::Counter)).unwrap();
        let rate = model.rate.unwrap();
        assert!(rate.mean_per_minute > 0.0);
        assert_eq!(rate.samples, 3);
    }

    #[test]
    fn test_too_few_rate_samples_leave_rate_undefined() {
        let single = series(&[(0, 10.0)]);
        let pair = series(&[(0, 10.0), (1, 20.0)]);
        let reset = series(&[(0, 10.0), (1, 5.0), (2, 8.0)]);

        assert!(ModelBuilder::build(&single, Some(SeriesKind::Counter)).unwrap().rate.is_none());
        assert!(ModelBuilder::build(&pair, Some(SeriesKind::Counter)).unwrap().rate.is_none());
        assert!(ModelBuilder::build(&reset, Some(SeriesKind::Counter)).unwrap().rate.is_none());
    }

    #[test]
    fn test_kind_inference() {
        let rising = series(&[(0, 1.0), (1, 2.0), (2, 2.0)]);
        let falling = series(&[(0, 3.0), (1, 2.0)]);
        let single = series(&[(0, 3.0)]);

        assert_eq!(ModelBuilder::build(&rising, None).unwrap().kind, SeriesKind::Counter);
        assert_eq!(ModelBuilder::build(&falling, None).unwrap().kind, SeriesKind::Gauge);
        assert_eq!(ModelBuilder::build(&single, None).unwrap().kind, SeriesKind::Gauge);
        assert_eq!(
            ModelBuilder::build(&rising, Some(SeriesKind::Gauge)).unwrap().kind,
            SeriesKind::Gauge
        );
    }

    #[test]
    fn test_gauge_statistics() {
        let obs = series(&[(0, 2.0), (1, 4.0), (2, 4.0), (3, 4.0), (4, 5.0), (5, 5.0), (6, 7.0), (7, 9.0)]);

        let model = ModelBuilder::build(&obs, Some(SeriesKind::Gauge)).unwrap();

        assert_eq!(model.min, 2.0);
        assert_eq!(model.max, 9.0);
        assert_eq!(model.mean, 5.0);
        assert_eq!(model.std_dev, 2.0);
        assert!(model.rate.is_none());
        assert!(model.min <= model.mean && model.mean <= model.max);
    }

    #[test]
    fn test_build_all_uses_declared_kind() {
        let key = SeriesKey::bare("temperature");
        let samples = vec![
            Sample::new(key.clone(), 1.0, t0()),
            Sample::new(key.clone(), 2.0, t0() + Duration::minutes(1)),
            Sample::new(key.clone(), 3.0, t0() + Duration::minutes(2)),
        ];
        let mut families = BTreeMap::new();
        let mut family = MetricFamily::new("temperature");
        family.kind = Some(MetricKind::Gauge);
        families.insert(family.name.clone(), family);

        let models = ModelBuilder::build_all(&SeriesAggregator::aggregate(&samples), &families);
        assert_eq!(models[&key].kind, SeriesKind::Gauge);

        let models = ModelBuilder::build_all(&SeriesAggregator::aggregate(&samples), &BTreeMap::new());
        assert_eq!(models[&key].kind, SeriesKind::Counter);
    }
}
