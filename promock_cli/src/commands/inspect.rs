use crate::ui;
use anyhow::Result;
use promock_core::SeriesKind;
use promock_corpus::{CorpusManager, ServiceConfig};
use promock_model::{exporters::JsonExporter, SeriesModel};
use tabled::{settings::Style, Table, Tabled};

#[derive(Tabled)]
struct ModelRow {
    series: String,
    kind: String,
    points: usize,
    min: String,
    max: String,
    mean: String,
    std_dev: String,
    rate_per_minute: String,
}

impl From<&SeriesModel> for ModelRow {
    fn from(model: &SeriesModel) -> Self {
        let rate_per_minute = match (model.kind, model.rate) {
            (SeriesKind::Counter, Some(rate)) => format!(
                "{:.3} ± {:.3}",
                rate.mean_per_minute, rate.std_dev_per_minute
            ),
            (SeriesKind::Counter, None) => "default".to_string(),
            (SeriesKind::Gauge, _) => "-".to_string(),
        };

        Self {
            series: model.key.to_string(),
            kind: model.kind.to_string(),
            points: model.observations,
            min: format!("{:.3}", model.min),
            max: format!("{:.3}", model.max),
            mean: format!("{:.3}", model.mean),
            std_dev: format!("{:.3}", model.std_dev),
            rate_per_minute,
        }
    }
}

pub async fn execute(config: ServiceConfig, format: String) -> Result<()> {
    let manager = CorpusManager::new(&config);
    manager.refresh().await?;
    let snapshot = manager
        .current()
        .ok_or_else(|| anyhow::anyhow!("No corpus loaded from {}", config.metrics_dir.display()))?;

    match format.as_str() {
        "table" => {
            ui::print_header("Learned Series Models");
            let summary = snapshot.summary();
            ui::print_info(&format!(
                "{} series in {} families from {} file(s)",
                summary.series, summary.families, summary.files
            ));
            let rows: Vec<ModelRow> = snapshot.models.values().map(ModelRow::from).collect();
            println!("{}", Table::new(rows).with(Style::rounded()));
        }
        "json" => {
            println!("{}", JsonExporter::to_string(snapshot.models.values())?);
        }
        _ => {
            anyhow::bail!("Unknown format: {}", format);
        }
    }

    Ok(())
}
