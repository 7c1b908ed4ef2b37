use anyhow::Result;
use chrono::Utc;
use promock_corpus::{CorpusManager, ServiceConfig};
use std::time::Duration;

pub async fn execute(config: ServiceConfig, scrapes: usize, every: Duration) -> Result<()> {
    let manager = CorpusManager::new(&config);
    manager.refresh().await?;
    let snapshot = manager
        .current()
        .ok_or_else(|| anyhow::anyhow!("No corpus loaded from {}", config.metrics_dir.display()))?;

    let step = chrono::Duration::from_std(every)?;
    let mut now = Utc::now();
    for scrape in 0..scrapes {
        if scrape > 0 {
            now += step;
        }
        if scrapes > 1 {
            println!("# scrape {} at {}", scrape + 1, now.to_rfc3339());
        }
        print!("{}", snapshot.render(now));
    }

    Ok(())
}
