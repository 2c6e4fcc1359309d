//! Policy Pulse - a daily digest of Chinese state-media feeds
//!
//! Fetches RSS feeds grouped by source, deduplicates and archives the day's
//! items, and asks an LLM for per-source briefings and a weekly trend report.
//! Each run writes report data and a history index for a static site.

pub mod aggregator;
pub mod archive;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod history;
pub mod models;
pub mod pipeline;
pub mod summarizer;
pub mod tags;
