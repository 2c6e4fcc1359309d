//! Dated JSON archive of each run's items.
//!
//! One `<YYYY-MM-DD>.json` file per day, written atomically. Only the most
//! recent [`RECENT_WINDOW_DAYS`] files are ever read back.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use tokio::fs;
use tracing::{debug, info};

use crate::error::ArchiveError;
use crate::models::{ArchiveRecord, NewsItem};

pub const ARCHIVE_ITEM_CAP: usize = 50;
pub const RECENT_WINDOW_DAYS: usize = 7;
pub const DATE_FORMAT: &str = "%Y-%m-%d";

pub struct ArchiveStore {
    dir: PathBuf,
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> ArchiveError + '_ {
    move |source| ArchiveError::Io {
        path: path.to_path_buf(),
        source,
    }
}

impl ArchiveStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub async fn initialize(&self) -> Result<(), ArchiveError> {
        fs::create_dir_all(&self.dir)
            .await
            .map_err(io_error(&self.dir))
    }

    pub fn path_for(&self, date: NaiveDate) -> PathBuf {
        self.dir.join(format!("{}.json", date.format(DATE_FORMAT)))
    }

    /// Write the first [`ARCHIVE_ITEM_CAP`] items as the record for `date`,
    /// replacing any existing record for that day.
    pub async fn archive(
        &self,
        date: NaiveDate,
        items: &[NewsItem],
    ) -> Result<PathBuf, ArchiveError> {
        let record = ArchiveRecord {
            date: date.format(DATE_FORMAT).to_string(),
            items: items.iter().take(ARCHIVE_ITEM_CAP).cloned().collect(),
        };
        let json = serde_json::to_string_pretty(&record)?;

        let path = self.path_for(date);
        let tmp_path = path.with_extension("json.tmp");

        fs::write(&tmp_path, json)
            .await
            .map_err(io_error(&tmp_path))?;
        fs::rename(&tmp_path, &path)
            .await
            .map_err(io_error(&path))?;

        info!(
            "Archived {} of {} items to {}",
            record.items.len(),
            items.len(),
            path.display()
        );
        Ok(path)
    }

    /// Dates with an archive file, oldest first. A missing directory has
    /// no dates.
    pub async fn archived_dates(&self) -> Result<Vec<NaiveDate>, ArchiveError> {
        let mut entries = match fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(io_error(&self.dir)(e)),
        };

        let mut dates = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(io_error(&self.dir))? {
            let name = entry.file_name();
            match name.to_str().and_then(parse_archive_filename) {
                Some(date) => dates.push(date),
                None => debug!("Ignoring non-archive file {:?}", name),
            }
        }

        dates.sort();
        Ok(dates)
    }

    pub async fn load(&self, date: NaiveDate) -> Result<ArchiveRecord, ArchiveError> {
        let path = self.path_for(date);
        let content = fs::read_to_string(&path).await.map_err(io_error(&path))?;

        serde_json::from_str(&content).map_err(|source| ArchiveError::Corrupt { path, source })
    }

    /// The most recent [`RECENT_WINDOW_DAYS`] records, oldest first.
    ///
    /// A file that fails to parse is an error rather than a gap in the
    /// window.
    pub async fn load_recent_window(&self) -> Result<Vec<ArchiveRecord>, ArchiveError> {
        let dates = self.archived_dates().await?;
        let start = dates.len().saturating_sub(RECENT_WINDOW_DAYS);

        let mut records = Vec::with_capacity(dates.len() - start);
        for date in &dates[start..] {
            records.push(self.load(*date).await?);
        }

        Ok(records)
    }
}

fn parse_archive_filename(name: &str) -> Option<NaiveDate> {
    let stem = name.strip_suffix(".json")?;
    if stem.len() != 10 {
        return None;
    }
    NaiveDate::parse_from_str(stem, DATE_FORMAT).ok()
}
