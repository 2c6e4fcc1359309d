use std::io::ErrorKind;
use std::path::Path;

use anyhow::Context;
use chrono::NaiveDate;
use tokio::fs;
use tracing::info;

use crate::archive::DATE_FORMAT;
use crate::pipeline::REPORT_DATA_DIR;

pub const HISTORY_FILE: &str = "history.json";

pub fn report_filename(date: NaiveDate) -> String {
    format!("{}.html", date.format(DATE_FORMAT))
}

fn date_stem<'a>(name: &'a str, extension: &str) -> Option<&'a str> {
    name.strip_suffix(extension)
        .filter(|stem| stem.len() == 10)
        .filter(|stem| NaiveDate::parse_from_str(stem, DATE_FORMAT).is_ok())
}

fn is_report_filename(name: &str) -> bool {
    date_stem(name, ".html").is_some()
}

async fn file_names(dir: &Path) -> std::io::Result<Vec<String>> {
    let mut entries = fs::read_dir(dir).await?;
    let mut names = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        if let Some(name) = entry.file_name().to_str() {
            names.push(name.to_string());
        }
    }
    Ok(names)
}

/// Daily report filenames, newest first. A day counts once its report
/// data exists under `data/` or its page has been rendered into
/// `output_dir`.
pub async fn list_reports(output_dir: &Path) -> anyhow::Result<Vec<String>> {
    let mut reports: Vec<String> = file_names(output_dir)
        .await
        .with_context(|| format!("reading {}", output_dir.display()))?
        .into_iter()
        .filter(|name| is_report_filename(name))
        .collect();

    let data_dir = output_dir.join(REPORT_DATA_DIR);
    let data_files = match file_names(&data_dir).await {
        Ok(names) => names,
        Err(e) if e.kind() == ErrorKind::NotFound => Vec::new(),
        Err(e) => {
            return Err(e).with_context(|| format!("reading {}", data_dir.display()));
        }
    };
    reports.extend(
        data_files
            .iter()
            .filter_map(|name| date_stem(name, ".json"))
            .map(|stem| format!("{}.html", stem)),
    );

    reports.sort_unstable_by(|a, b| b.cmp(a));
    reports.dedup();
    Ok(reports)
}

/// Rewrite `history.json` from the reports on disk, always listing
/// `today`'s report first even before it has been rendered.
pub async fn update_history(output_dir: &Path, today: NaiveDate) -> anyhow::Result<Vec<String>> {
    let mut history = list_reports(output_dir).await?;

    let todays = report_filename(today);
    if !history.contains(&todays) {
        history.insert(0, todays);
    }

    let path = output_dir.join(HISTORY_FILE);
    let json = serde_json::to_string_pretty(&history)?;
    fs::write(&path, json)
        .await
        .with_context(|| format!("writing {}", path.display()))?;

    info!("Wrote {} with {} entries", path.display(), history.len());
    Ok(history)
}
