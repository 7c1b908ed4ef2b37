use promock_core::{resolve_family, MetricFamily, SeriesKey};
use std::collections::BTreeMap;
use std::fmt::Write;

pub const EMPTY_EXPOSITION: &str = "# No metrics found\n";

pub struct PrometheusExporter;

impl PrometheusExporter {
    /// Render families and generated series values in text exposition format.
    ///
    /// Groups are ordered by name; within a group series follow the order
    /// of `values`.
    pub fn format(families: &BTreeMap<String, MetricFamily>, values: &[(SeriesKey, f64)]) -> String {
        if families.is_empty() && values.is_empty() {
            return EMPTY_EXPOSITION.to_string();
        }

        let mut groups: BTreeMap<&str, Vec<(&SeriesKey, f64)>> =
            families.keys().map(|name| (name.as_str(), Vec::new())).collect();
        for (key, value) in values {
            let group = resolve_family(families, &key.name)
                .map(|f| f.name.as_str())
                .unwrap_or(key.name.as_str());
            groups.entry(group).or_default().push((key, *value));
        }

        let mut out = String::new();
        for (name, series) in groups {
            if let Some(family) = families.get(name) {
                if let Some(help) = &family.help {
                    let _ = writeln!(out, "# HELP {} {}", name, help);
                }
                if let Some(kind) = family.kind {
                    let _ = writeln!(out, "# TYPE {} {}", name, kind);
                }
            }
            for (key, value) in series {
                let _ = writeln!(out, "{} {}", key, format_value(value));
            }
        }
        out
    }
}

/// Exposition form of a sample value: plain decimal, `NaN`, `+Inf` or `-Inf`.
pub fn format_value(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value == f64::INFINITY {
        "+Inf".to_string()
    } else if value == f64::NEG_INFINITY {
        "-Inf".to_string()
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use promock_core::{parse_snapshot, LabelSet, MetricKind};

    #[test]
    fn test_format_value() {
        assert_eq!(format_value(1510.0), "1510");
        assert_eq!(format_value(0.25), "0.25");
        assert_eq!(format_value(1.0e21), "1000000000000000000000");
        assert_eq!(format_value(f64::INFINITY), "+Inf");
        assert_eq!(format_value(f64::NAN), "NaN");
    }

    #[test]
    fn test_empty_exposition() {
        assert_eq!(PrometheusExporter::format(&BTreeMap::new(), &[]), EMPTY_EXPOSITION);
    }

    #[test]
    fn test_render_groups_series_under_families() {
        let mut families = BTreeMap::new();
        let mut requests = MetricFamily::new("http_requests_total");
        requests.kind = Some(MetricKind::Counter);
        requests.help = Some("Total requests.".to_string());
        families.insert(requests.name.clone(), requests);
        let mut latency = MetricFamily::new("latency_seconds");
        latency.kind = Some(MetricKind::Histogram);
        families.insert(latency.name.clone(), latency);

        let login: LabelSet = [("endpoint", "/login"), ("code", "200")].into_iter().collect();
        let le: LabelSet = [("le", "0.5")].into_iter().collect();
        let values = vec![
            (SeriesKey::new("http_requests_total", login), 1510.0),
            (SeriesKey::new("latency_seconds_bucket", le), 3.0),
            (SeriesKey::bare("latency_seconds_count"), 4.0),
            (SeriesKey::bare("build_info"), 1.0),
        ];

        let text = PrometheusExporter::format(&families, &values);

        let expected = "\
build_info 1
# HELP http_requests_total Total requests.
# TYPE http_requests_total counter
http_requests_total{code=\"200\",endpoint=\"/login\"} 1510
# TYPE latency_seconds histogram
latency_seconds_bucket{le=\"0.5\"} 3
latency_seconds_count 4
";
        assert_eq!(text, expected);
    }

    #[test]
    fn test_rendered_output_parses_back() {
        let mut families = BTreeMap::new();
        let mut family = MetricFamily::new("queue_depth");
        family.kind = Some(MetricKind::Gauge);
        family.help = Some("Items waiting.".to_string());
        families.insert(family.name.clone(), family);
        let labels: LabelSet = [("queue", "a,b")].into_iter().collect();
        let values = vec![(SeriesKey::new("queue_depth", labels), 12.75)];

        let text = PrometheusExporter::format(&families, &values);
        let report = parse_snapshot(&text, Utc::now());

        assert!(report.errors.is_empty());
        assert_eq!(report.samples[0].key, values[0].0);
        assert_eq!(report.samples[0].value, 12.75);
        assert_eq!(report.families["queue_depth"], families["queue_depth"]);
    }
}
