//! Prometheus text exposition parser
//!
//! Turns the text of one snapshot file into typed samples plus the HELP/TYPE
//! metadata seen along the way. Lines that do not parse are recorded and
//! skipped so a damaged file still yields its good lines.

use crate::error::ParseError;
use crate::labels::{LabelSet, SeriesKey};
use crate::sample::{parse_kind, MetricFamily, Sample};
use chrono::{DateTime, TimeZone, Utc};
use std::collections::BTreeMap;
use tracing::trace;

/// Everything recovered from one snapshot.
#[derive(Debug, Clone, Default)]
pub struct ParseReport {
    pub samples: Vec<Sample>,
    pub families: BTreeMap<String, MetricFamily>,
    pub errors: Vec<ParseError>,
}

impl ParseReport {
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Parser for a single snapshot observed at a known time.
#[derive(Debug)]
pub struct ExpositionParser {
    observed_at: DateTime<Utc>,
    report: ParseReport,
}

impl ExpositionParser {
    /// `observed_at` is used for every sample that carries no timestamp of
    /// its own.
    pub fn new(observed_at: DateTime<Utc>) -> Self {
        Self {
            observed_at,
            report: ParseReport::default(),
        }
    }

    pub fn parse(self, text: &str) -> ParseReport {
        self.parse_bytes(text.as_bytes())
    }

    /// Parse raw file contents. Lines that are not valid UTF-8 are recorded
    /// as errors; the rest of the file is still read.
    pub fn parse_bytes(mut self, bytes: &[u8]) -> ParseReport {
        for (idx, raw) in bytes.split(|b| *b == b'\n').enumerate() {
            let line_no = idx + 1;
            let result = match std::str::from_utf8(raw) {
                Ok(line) => self.parse_line(line.trim(), line_no),
                Err(_) => Err(ParseError::InvalidEncoding { line: line_no }),
            };
            if let Err(e) = result {
                trace!("skipping line: {}", e);
                self.report.errors.push(e);
            }
        }
        self.report
    }

    fn parse_line(&mut self, line: &str, line_no: usize) -> Result<(), ParseError> {
        if line.is_empty() {
            return Ok(());
        }

        if let Some(rest) = line.strip_prefix("# HELP ") {
            let (name, help) = split_metadata(rest, line_no)?;
            self.family(name).help = Some(help.to_string());
            return Ok(());
        }

        if let Some(rest) = line.strip_prefix("# TYPE ") {
            let (name, kind) = split_metadata(rest, line_no)?;
            let kind = parse_kind(kind, line_no)?;
            self.family(name).kind = Some(kind);
            return Ok(());
        }

        if line.starts_with('#') {
            return Ok(());
        }

        let sample = self.parse_sample_line(line, line_no)?;
        self.report.samples.push(sample);
        Ok(())
    }

    fn family(&mut self, name: &str) -> &mut MetricFamily {
        self.report
            .families
            .entry(name.to_string())
            .or_insert_with(|| MetricFamily::new(name))
    }

    fn parse_sample_line(&self, line: &str, line_no: usize) -> Result<Sample, ParseError> {
        let name_end = line
            .find(|c: char| c == '{' || c.is_whitespace())
            .ok_or(ParseError::MissingValue { line: line_no })?;
        let name = &line[..name_end];
        if name.is_empty() {
            return Err(ParseError::MissingName { line: line_no });
        }
        if !is_valid_metric_name(name) {
            return Err(ParseError::InvalidName {
                line: line_no,
                name: name.to_string(),
            });
        }

        let rest = &line[name_end..];
        let (labels, rest) = match rest.strip_prefix('{') {
            Some(body) => parse_labels(body, line_no)?,
            None => (LabelSet::new(), rest),
        };

        let mut fields = rest.split_whitespace();
        let raw_value = fields.next().ok_or(ParseError::MissingValue { line: line_no })?;
        let value = parse_value(raw_value).ok_or_else(|| ParseError::InvalidValue {
            line: line_no,
            value: raw_value.to_string(),
        })?;

        let observed_at = match fields.next() {
            Some(raw_ts) => parse_timestamp(raw_ts).ok_or_else(|| ParseError::InvalidTimestamp {
                line: line_no,
                value: raw_ts.to_string(),
            })?,
            None => self.observed_at,
        };

        if let Some(extra) = fields.next() {
            return Err(ParseError::TrailingInput {
                line: line_no,
                rest: extra.to_string(),
            });
        }

        Ok(Sample::new(SeriesKey::new(name, labels), value, observed_at))
    }
}

/// Parse one snapshot's text.
pub fn parse_snapshot(text: &str, observed_at: DateTime<Utc>) -> ParseReport {
    ExpositionParser::new(observed_at).parse(text)
}

/// Parse one snapshot's raw bytes.
pub fn parse_snapshot_bytes(bytes: &[u8], observed_at: DateTime<Utc>) -> ParseReport {
    ExpositionParser::new(observed_at).parse_bytes(bytes)
}

fn split_metadata(rest: &str, line: usize) -> Result<(&str, &str), ParseError> {
    let rest = rest.trim_start();
    let (name, tail) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
    if name.is_empty() {
        return Err(ParseError::InvalidMetadata {
            line,
            reason: "missing metric name".to_string(),
        });
    }
    Ok((name, tail.trim()))
}

fn is_valid_metric_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' || first == ':' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == ':')
        }
        _ => false,
    }
}

fn is_valid_label_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

/// Parse the label body that follows `{`, returning the labels and whatever
/// follows the closing `}`. Values are kept verbatim, escapes included.
fn parse_labels(body: &str, line: usize) -> Result<(LabelSet, &str), ParseError> {
    let mut labels = LabelSet::new();
    let mut rest = body;

    loop {
        rest = rest.trim_start();
        if let Some(after) = rest.strip_prefix('}') {
            return Ok((labels, after));
        }

        let eq = rest.find('=').ok_or(ParseError::UnterminatedLabels { line })?;
        let key = rest[..eq].trim();
        if !is_valid_label_name(key) {
            return Err(ParseError::InvalidLabel {
                line,
                reason: format!("invalid label name '{}'", key),
            });
        }

        let quoted = rest[eq + 1..]
            .trim_start()
            .strip_prefix('"')
            .ok_or_else(|| ParseError::InvalidLabel {
                line,
                reason: format!("value of '{}' is not quoted", key),
            })?;
        let close = closing_quote(quoted).ok_or(ParseError::UnterminatedLabels { line })?;
        labels.insert(key, &quoted[..close]);

        rest = quoted[close + 1..].trim_start();
        if let Some(after) = rest.strip_prefix(',') {
            rest = after;
        } else if rest.is_empty() {
            return Err(ParseError::UnterminatedLabels { line });
        } else if !rest.starts_with('}') {
            return Err(ParseError::InvalidLabel {
                line,
                reason: "expected ',' or '}' after label value".to_string(),
            });
        }
    }
}

fn closing_quote(s: &str) -> Option<usize> {
    let mut escaped = false;
    for (idx, c) in s.char_indices() {
        match c {
            '\\' if !escaped => escaped = true,
            '"' if !escaped => return Some(idx),
            _ => escaped = false,
        }
    }
    None
}

fn parse_value(raw: &str) -> Option<f64> {
    match raw {
        "+Inf" | "Inf" => Some(f64::INFINITY),
        "-Inf" => Some(f64::NEG_INFINITY),
        "NaN" => Some(f64::NAN),
        _ => raw.parse::<f64>().ok(),
    }
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let millis: i64 = raw.parse().ok()?;
    Utc.timestamp_millis_opt(millis).single()
}
