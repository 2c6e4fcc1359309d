use anyhow::Context;
use chrono::Utc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use policy_pulse::config::Config;
use policy_pulse::pipeline::Pipeline;
use policy_pulse::summarizer::DeepSeekClient;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "policy_pulse=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config_path =
        std::env::var("POLICY_PULSE_CONFIG").unwrap_or_else(|_| "feeds.toml".to_string());
    let config = Config::load(&config_path)
        .with_context(|| format!("loading configuration from {}", config_path))?;
    info!(
        "Loaded {} sources ({} feeds) from {}",
        config.sources.len(),
        config.sources.iter().map(|s| s.feeds.len()).sum::<usize>(),
        config_path
    );

    let summarizer = DeepSeekClient::from_env(config.summarizer.clone())?;
    let pipeline = Pipeline::new(&config, summarizer)?;

    let report = pipeline.run(Utc::now()).await?;

    info!(
        "Build complete for {}: {} items, {} briefings, weekly trend {}",
        report.date,
        report.sources.combined().len(),
        report.briefings.len(),
        if report.weekly_trend.is_some() { "included" } else { "omitted" }
    );

    Ok(())
}
