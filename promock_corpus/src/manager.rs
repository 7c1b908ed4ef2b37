use crate::config::ServiceConfig;
use crate::error::RefreshError;
use crate::source::{read_snapshot, scan_directory, SnapshotFile};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use promock_core::{MetricFamily, ParseReport, SeriesKey};
use promock_model::exporters::prometheus::EMPTY_EXPOSITION;
use promock_model::{
    thread_draw, DrawSource, Generator, GeneratorConfig, ModelBuilder, PrometheusExporter,
    SeriesAggregator, SeriesModel,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Models and generator state built from one set of snapshot files.
///
/// Immutable apart from the generator's per-series state; a refresh builds a
/// new one instead of touching this.
#[derive(Debug)]
pub struct CorpusSnapshot {
    pub families: BTreeMap<String, MetricFamily>,
    pub models: BTreeMap<SeriesKey, SeriesModel>,
    pub generator: Generator,
    pub files: Vec<SnapshotFile>,
    pub skipped_lines: usize,
    pub built_at: DateTime<Utc>,
}

impl CorpusSnapshot {
    /// Run aggregation and model building over parsed snapshots, given in
    /// corpus order. Later metadata overrides earlier.
    pub fn build(files: Vec<SnapshotFile>, reports: &[ParseReport], config: GeneratorConfig) -> Self {
        let mut families: BTreeMap<String, MetricFamily> = BTreeMap::new();
        for report in reports {
            for (name, family) in &report.families {
                families
                    .entry(name.clone())
                    .or_insert_with(|| MetricFamily::new(name.clone()))
                    .merge_from(family);
            }
        }

        let series = SeriesAggregator::aggregate(reports.iter().flat_map(|r| r.samples.iter()));
        let models = ModelBuilder::build_all(&series, &families);
        let generator = Generator::new(config, &models);

        Self {
            families,
            models,
            generator,
            files,
            skipped_lines: reports.iter().map(|r| r.errors.len()).sum(),
            built_at: Utc::now(),
        }
    }

    /// Generate one scrape's worth of values and render it.
    pub fn render(&self, now: DateTime<Utc>) -> String {
        self.render_with(now, &mut thread_draw())
    }

    pub fn render_with(&self, now: DateTime<Utc>, draw: &mut impl DrawSource) -> String {
        let values: Vec<(SeriesKey, f64)> = self
            .models
            .values()
            .filter_map(|model| {
                self.generator
                    .generate(model, now, draw)
                    .map(|value| (model.key.clone(), value))
            })
            .collect();
        PrometheusExporter::format(&self.families, &values)
    }

    pub fn summary(&self) -> CorpusSummary {
        CorpusSummary {
            files: self.files.len(),
            families: self.families.len(),
            series: self.models.len(),
            skipped_lines: self.skipped_lines,
            built_at: Some(self.built_at),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CorpusSummary {
    pub files: usize,
    pub families: usize,
    pub series: usize,
    pub skipped_lines: usize,
    pub built_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    Rebuilt { files: usize, series: usize },
    Unchanged,
}

/// Owns the current corpus and keeps it in step with the snapshot directory.
pub struct CorpusManager {
    metrics_dir: PathBuf,
    file_extension: String,
    refresh_interval: Duration,
    generator: GeneratorConfig,
    current: RwLock<Option<Arc<CorpusSnapshot>>>,
    // Held for the whole refresh so overlapping refreshes run one at a time.
    fingerprint: tokio::sync::Mutex<Option<Vec<SnapshotFile>>>,
}

impl CorpusManager {
    pub fn new(config: &ServiceConfig) -> Self {
        Self {
            metrics_dir: config.metrics_dir.clone(),
            file_extension: config.file_extension.clone(),
            refresh_interval: config.refresh_interval,
            generator: config.generator,
            current: RwLock::new(None),
            fingerprint: tokio::sync::Mutex::new(None),
        }
    }

    pub fn metrics_dir(&self) -> &Path {
        &self.metrics_dir
    }

    /// The corpus to serve from, taken once per request.
    pub fn current(&self) -> Option<Arc<CorpusSnapshot>> {
        self.current.read().clone()
    }

    /// Render a scrape from the current corpus.
    pub fn render(&self, now: DateTime<Utc>) -> String {
        match self.current() {
            Some(snapshot) => snapshot.render(now),
            None => EMPTY_EXPOSITION.to_string(),
        }
    }

    pub fn summary(&self) -> CorpusSummary {
        self.current().map(|s| s.summary()).unwrap_or_default()
    }

    /// Rescan the directory and rebuild the corpus if the visible files
    /// changed. On error the previous corpus stays in place.
    pub async fn refresh(&self) -> Result<RefreshOutcome, RefreshError> {
        let mut fingerprint = self.fingerprint.lock().await;
        let start = Instant::now();

        let files = scan_directory(&self.metrics_dir, &self.file_extension)
            .await
            .map_err(|source| RefreshError::DirectoryUnreadable {
                path: self.metrics_dir.clone(),
                source,
            })?;

        if files.is_empty() {
            return Err(RefreshError::NoSnapshots {
                path: self.metrics_dir.clone(),
                extension: self.file_extension.clone(),
            });
        }

        if fingerprint.as_ref() == Some(&files) {
            debug!("Snapshot files unchanged in {}", self.metrics_dir.display());
            return Ok(RefreshOutcome::Unchanged);
        }

        let mut loaded = Vec::with_capacity(files.len());
        let mut reports = Vec::with_capacity(files.len());
        for file in &files {
            match read_snapshot(file).await {
                Ok(report) => {
                    if !report.errors.is_empty() {
                        warn!(
                            "Skipped {} malformed line(s) in {}",
                            report.errors.len(),
                            file.path.display()
                        );
                    }
                    loaded.push(file.clone());
                    reports.push(report);
                }
                Err(e) => warn!("Failed to read {}: {}", file.path.display(), e),
            }
        }

        if reports.iter().all(ParseReport::is_empty) {
            return Err(RefreshError::NoSeries {
                path: self.metrics_dir.clone(),
                files: files.len(),
            });
        }

        let snapshot = CorpusSnapshot::build(loaded, &reports, self.generator);
        if snapshot.models.is_empty() {
            return Err(RefreshError::NoSeries {
                path: self.metrics_dir.clone(),
                files: files.len(),
            });
        }

        let outcome = RefreshOutcome::Rebuilt {
            files: snapshot.files.len(),
            series: snapshot.models.len(),
        };
        // Only what was actually read, so an unreadable file is retried.
        *fingerprint = Some(snapshot.files.clone());
        *self.current.write() = Some(Arc::new(snapshot));

        info!(
            "Loaded corpus from {}: {:?} in {:?}",
            self.metrics_dir.display(),
            outcome,
            start.elapsed()
        );
        Ok(outcome)
    }

    /// Refresh on the configured interval until `shutdown` is cancelled.
    pub async fn run(&self, shutdown: CancellationToken) {
        info!(
            "Corpus refresh running every {:?} over {}",
            self.refresh_interval,
            self.metrics_dir.display()
        );

        let mut poll = tokio::time::interval(self.refresh_interval);
        poll.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = poll.tick() => {
                    if let Err(e) = self.refresh().await {
                        error!("Corpus refresh failed, keeping previous corpus: {}", e);
                    }
                }
                () = shutdown.cancelled() => {
                    info!("shutdown signal received");
                    return;
                }
            }
        }
    }
}
