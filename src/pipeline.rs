use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use tokio::fs;
use tracing::{info, warn};

use crate::aggregator::Aggregator;
use crate::archive::{ArchiveStore, DATE_FORMAT};
use crate::config::Config;
use crate::fetcher::Fetcher;
use crate::history::update_history;
use crate::models::{AggregatedSources, ArchiveRecord, Report, SourceNews};
use crate::summarizer::Summarizer;

/// Directory under the output dir holding each day's report data.
pub const REPORT_DATA_DIR: &str = "data";

/// One complete build: fetch, brief, archive, trend, write outputs.
pub struct Pipeline<S> {
    aggregator: Aggregator,
    archive: ArchiveStore,
    summarizer: S,
    source_keys: Vec<String>,
    output_dir: PathBuf,
    concurrency: usize,
    min_trend_days: usize,
}

impl<S: Summarizer> Pipeline<S> {
    pub fn new(config: &Config, summarizer: S) -> anyhow::Result<Self> {
        let fetcher = Fetcher::new(config.fetch.clone())?;

        Ok(Self {
            aggregator: Aggregator::new(fetcher, config.sources.clone()),
            archive: ArchiveStore::new(&config.archive_dir),
            summarizer,
            source_keys: config.sources.iter().map(|s| s.key.clone()).collect(),
            output_dir: config.output_dir.clone(),
            concurrency: config.summarizer.concurrency,
            min_trend_days: config.summarizer.min_trend_days,
        })
    }

    pub async fn run(&self, now: DateTime<Utc>) -> anyhow::Result<Report> {
        let today = now.date_naive();

        fs::create_dir_all(&self.output_dir)
            .await
            .with_context(|| format!("creating {}", self.output_dir.display()))?;
        self.archive.initialize().await?;

        info!("Step 1: fetching {} sources", self.source_keys.len());
        let keys: Vec<&str> = self.source_keys.iter().map(String::as_str).collect();
        let sources = self.aggregator.fetch_all(&keys).await;

        info!("Step 2: generating briefings");
        let briefings = generate_briefings(&self.summarizer, &sources, self.concurrency).await;

        info!("Step 3: archiving and trend analysis");
        self.archive.archive(today, &sources.combined()).await?;
        let window = self.archive.load_recent_window().await?;
        let weekly_trend =
            generate_weekly_trend(&self.summarizer, &window, self.min_trend_days).await;

        let report = Report {
            date: today.format(DATE_FORMAT).to_string(),
            timestamp: now.to_rfc3339(),
            sources,
            briefings,
            weekly_trend,
        };

        info!("Step 4: writing outputs");
        write_report_data(&self.output_dir, &report).await?;
        update_history(&self.output_dir, today).await?;

        Ok(report)
    }
}

/// Daily briefings keyed by source, requested `concurrency` at a time.
/// Sources without items or whose briefing fails are left out.
pub async fn generate_briefings<S: Summarizer>(
    summarizer: &S,
    sources: &AggregatedSources,
    concurrency: usize,
) -> BTreeMap<String, String> {
    let tasks: Vec<&SourceNews> = sources
        .iter()
        .filter(|s| {
            if s.items.is_empty() {
                warn!("No items for {}, skipping briefing", s.name);
            }
            !s.items.is_empty()
        })
        .collect();

    let mut briefings = BTreeMap::new();

    for batch in tasks.chunks(concurrency.max(1)) {
        let results = join_all(batch.iter().map(|source| async move {
            info!("Generating briefing for {}", source.name);
            let briefing = summarizer.summarize_daily(&source.name, &source.items).await;
            (*source, briefing)
        }))
        .await;

        for (source, briefing) in results {
            match briefing {
                Some(text) => {
                    briefings.insert(source.key.clone(), text);
                }
                None => warn!("No briefing produced for {}", source.name),
            }
        }
    }

    briefings
}

/// Trend report over the archive window, skipped entirely when fewer than
/// `min_days` days are archived.
pub async fn generate_weekly_trend<S: Summarizer>(
    summarizer: &S,
    window: &[ArchiveRecord],
    min_days: usize,
) -> Option<String> {
    if window.len() < min_days {
        info!(
            "Only {} days of archive, need at least {} for trend analysis",
            window.len(),
            min_days
        );
        return None;
    }

    info!("Generating weekly trend from {} days", window.len());
    summarizer.summarize_weekly(window).await
}

pub async fn write_report_data(output_dir: &Path, report: &Report) -> anyhow::Result<PathBuf> {
    let dir = output_dir.join(REPORT_DATA_DIR);
    fs::create_dir_all(&dir)
        .await
        .with_context(|| format!("creating {}", dir.display()))?;

    let path = dir.join(format!("{}.json", report.date));
    let json = serde_json::to_string_pretty(report)?;
    fs::write(&path, json)
        .await
        .with_context(|| format!("writing {}", path.display()))?;

    info!("Wrote report data to {}", path.display());
    Ok(path)
}
