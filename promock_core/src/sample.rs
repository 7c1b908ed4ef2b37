use crate::error::ParseError;
use crate::labels::{LabelSet, SeriesKey};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Metric type as declared by a `# TYPE` line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
    Counter,
    Gauge,
    Histogram,
    Summary,
    Untyped,
}

impl MetricKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKind::Counter => "counter",
            MetricKind::Gauge => "gauge",
            MetricKind::Histogram => "histogram",
            MetricKind::Summary => "summary",
            MetricKind::Untyped => "untyped",
        }
    }

    /// Only counter and gauge declarations are authoritative for modeling;
    /// everything else is classified from the observed data.
    pub fn declared_series_kind(&self) -> Option<SeriesKind> {
        match self {
            MetricKind::Counter => Some(SeriesKind::Counter),
            MetricKind::Gauge => Some(SeriesKind::Gauge),
            _ => None,
        }
    }

    fn owns_suffixes(&self) -> bool {
        matches!(self, MetricKind::Histogram | MetricKind::Summary)
    }
}

impl FromStr for MetricKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "counter" => Ok(Self::Counter),
            "gauge" => Ok(Self::Gauge),
            "histogram" => Ok(Self::Histogram),
            "summary" => Ok(Self::Summary),
            "untyped" => Ok(Self::Untyped),
            other => Err(format!("unknown metric type '{}'", other)),
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a series is modeled and generated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeriesKind {
    Counter,
    Gauge,
}

impl fmt::Display for SeriesKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SeriesKind::Counter => f.write_str("counter"),
            SeriesKind::Gauge => f.write_str("gauge"),
        }
    }
}

/// HELP/TYPE metadata for one metric name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricFamily {
    pub name: String,
    pub kind: Option<MetricKind>,
    pub help: Option<String>,
}

impl MetricFamily {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: None,
            help: None,
        }
    }

    /// Whether a sample named `series_name` belongs to this family.
    ///
    /// Histograms and summaries also own their `_bucket`, `_sum` and
    /// `_count` series.
    pub fn owns(&self, series_name: &str) -> bool {
        if series_name == self.name {
            return true;
        }
        if !self.kind.map(|k| k.owns_suffixes()).unwrap_or(false) {
            return false;
        }
        series_name
            .strip_prefix(self.name.as_str())
            .map(|suffix| matches!(suffix, "_bucket" | "_sum" | "_count"))
            .unwrap_or(false)
    }

    /// Overlay metadata from a later occurrence of the same family.
    pub fn merge_from(&mut self, later: &MetricFamily) {
        if later.kind.is_some() {
            self.kind = later.kind;
        }
        if later.help.is_some() {
            self.help = later.help.clone();
        }
    }
}

/// Find the family a series belongs to: an exact name match first, then a
/// histogram or summary claiming it through a suffix.
pub fn resolve_family<'a>(
    families: &'a BTreeMap<String, MetricFamily>,
    series_name: &str,
) -> Option<&'a MetricFamily> {
    if let Some(family) = families.get(series_name) {
        return Some(family);
    }
    ["_bucket", "_sum", "_count"]
        .iter()
        .filter_map(|suffix| series_name.strip_suffix(suffix))
        .filter_map(|base| families.get(base))
        .find(|family| family.owns(series_name))
}

/// One parsed sample line.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub key: SeriesKey,
    pub value: f64,
    pub observed_at: DateTime<Utc>,
}

impl Sample {
    pub fn new(key: SeriesKey, value: f64, observed_at: DateTime<Utc>) -> Self {
        Self {
            key,
            value,
            observed_at,
        }
    }

    pub fn name(&self) -> &str {
        &self.key.name
    }

    pub fn labels(&self) -> &LabelSet {
        &self.key.labels
    }
}

pub(crate) fn parse_kind(raw: &str, line: usize) -> std::result::Result<MetricKind, ParseError> {
    raw.parse()
        .map_err(|reason| ParseError::InvalidMetadata { line, reason })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_histogram_family_owns_suffixes() {
        let mut family = MetricFamily::new("request_duration_seconds");
        family.kind = Some(MetricKind::Histogram);

        assert!(family.owns("request_duration_seconds"));
        assert!(family.owns("request_duration_seconds_bucket"));
        assert!(family.owns("request_duration_seconds_count"));
        assert!(!family.owns("request_duration_seconds_total"));
    }

    #[test]
    fn test_counter_family_owns_only_its_name() {
        let mut family = MetricFamily::new("requests");
        family.kind = Some(MetricKind::Counter);

        assert!(family.owns("requests"));
        assert!(!family.owns("requests_count"));
    }

    #[test]
    fn test_resolve_family() {
        let mut families = BTreeMap::new();
        let mut histogram = MetricFamily::new("latency_seconds");
        histogram.kind = Some(MetricKind::Histogram);
        families.insert(histogram.name.clone(), histogram);
        let mut gauge = MetricFamily::new("queue_depth");
        gauge.kind = Some(MetricKind::Gauge);
        families.insert(gauge.name.clone(), gauge);

        let owner = resolve_family(&families, "latency_seconds_bucket").map(|f| f.name.as_str());
        assert_eq!(owner, Some("latency_seconds"));
        assert!(resolve_family(&families, "queue_depth_count").is_none());
        assert!(resolve_family(&families, "unknown").is_none());
    }

    #[test]
    fn test_declared_series_kind() {
        assert_eq!(MetricKind::Counter.declared_series_kind(), Some(SeriesKind::Counter));
        assert_eq!(MetricKind::Gauge.declared_series_kind(), Some(SeriesKind::Gauge));
        assert_eq!(MetricKind::Summary.declared_series_kind(), None);
        assert!("bogus".parse::<MetricKind>().is_err());
    }
}
