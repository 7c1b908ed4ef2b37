use crate::ui;
use anyhow::Result;
use colored::Colorize;
use promock_corpus::{read_snapshot, scan_directory, ServiceConfig};
use promock_model::SeriesAggregator;

const MAX_ERRORS_SHOWN: usize = 10;

pub async fn execute(config: ServiceConfig) -> Result<()> {
    ui::print_header("Validating Snapshots");
    println!("Directory: {}", config.metrics_dir.display());

    let files = scan_directory(&config.metrics_dir, &config.file_extension).await?;
    if files.is_empty() {
        ui::print_error(&format!("No .{} files found", config.file_extension));
        anyhow::bail!("no snapshot files in {}", config.metrics_dir.display());
    }

    let mut samples = Vec::new();
    let mut skipped = 0;
    for file in &files {
        let report = match read_snapshot(file).await {
            Ok(report) => report,
            Err(e) => {
                ui::print_error(&format!("{}: {}", file.path.display(), e));
                continue;
            }
        };

        println!(
            "\n  {} - samples: {}, families: {}, skipped lines: {}",
            file.path.display().to_string().yellow(),
            report.samples.len(),
            report.families.len(),
            report.errors.len()
        );
        for error in report.errors.iter().take(MAX_ERRORS_SHOWN) {
            println!("    {}", error);
        }
        if report.errors.len() > MAX_ERRORS_SHOWN {
            println!("    ... and {} more", report.errors.len() - MAX_ERRORS_SHOWN);
        }

        skipped += report.errors.len();
        samples.extend(report.samples);
    }

    let series = SeriesAggregator::aggregate(&samples);
    println!();
    if series.is_empty() {
        ui::print_error("No valid samples found");
        anyhow::bail!("no valid samples in {}", config.metrics_dir.display());
    }

    if skipped > 0 {
        ui::print_warning(&format!("{} malformed line(s) skipped", skipped));
    }
    ui::print_success(&format!(
        "{} series from {} sample(s) in {} file(s)",
        series.len(),
        samples.len(),
        files.len()
    ));

    Ok(())
}
