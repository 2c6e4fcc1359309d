use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default = "default_archive_dir")]
    pub archive_dir: PathBuf,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default)]
    pub fetch: FetchSettings,
    #[serde(default)]
    pub summarizer: SummarizerSettings,
    /// Sources in orchestration order
    pub sources: Vec<SourceConfig>,
}

fn default_archive_dir() -> PathBuf {
    PathBuf::from("archive")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("docs")
}

/// A named publisher made up of one or more feeds.
#[derive(Debug, Deserialize, Clone)]
pub struct SourceConfig {
    pub key: String,
    pub name: String,
    #[serde(default)]
    pub feeds: Vec<FeedConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct FeedConfig {
    pub name: String,
    pub url: String,
    pub category: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct FetchSettings {
    /// Per-attempt timeout in seconds
    pub timeout_secs: u64,
    pub max_attempts: u32,
    /// Linear backoff unit; attempt `n` waits `n * retry_delay_ms`
    pub retry_delay_ms: u64,
    pub max_items_per_feed: usize,
    pub user_agent: String,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            timeout_secs: 15,
            max_attempts: 3,
            retry_delay_ms: 1000,
            max_items_per_feed: 20,
            user_agent:
                "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36".to_string(),
        }
    }
}

impl FetchSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SummarizerSettings {
    pub base_url: String,
    /// Name of the environment variable holding the API key
    pub api_key_env: String,
    pub daily_model: String,
    pub weekly_model: String,
    pub daily_timeout_secs: u64,
    pub weekly_timeout_secs: u64,
    /// Simultaneous daily briefing calls
    pub concurrency: usize,
    /// Archive days required before a trend report is attempted
    pub min_trend_days: usize,
}

impl Default for SummarizerSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.deepseek.com".to_string(),
            api_key_env: "DEEPSEEK_API_KEY".to_string(),
            daily_model: "deepseek-chat".to_string(),
            weekly_model: "deepseek-reasoner".to_string(),
            daily_timeout_secs: 30,
            weekly_timeout_secs: 120,
            concurrency: 2,
            min_trend_days: 3,
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Parse config from a TOML string (useful for testing)
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> anyhow::Result<Self> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }

    pub fn source(&self, key: &str) -> Option<&SourceConfig> {
        self.sources.iter().find(|s| s.key == key)
    }

    pub fn source_keys(&self) -> Vec<&str> {
        self.sources.iter().map(|s| s.key.as_str()).collect()
    }
}
