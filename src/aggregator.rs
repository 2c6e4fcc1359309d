use std::cmp::Reverse;
use std::collections::HashSet;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use futures::future::join_all;
use tracing::{info, warn};

use crate::config::SourceConfig;
use crate::fetcher::Fetcher;
use crate::models::{AggregatedSources, NewsItem, SourceNews};

pub struct Aggregator {
    fetcher: Fetcher,
    sources: Vec<SourceConfig>,
}

impl Aggregator {
    pub fn new(fetcher: Fetcher, sources: Vec<SourceConfig>) -> Self {
        Self { fetcher, sources }
    }

    fn source(&self, key: &str) -> Option<&SourceConfig> {
        self.sources.iter().find(|s| s.key == key)
    }

    /// Fetch every feed of one source concurrently, then deduplicate by
    /// title and sort newest first. Unknown keys yield an empty list.
    pub async fn fetch_source(&self, key: &str) -> Vec<NewsItem> {
        let Some(source) = self.source(key) else {
            warn!("Unknown source: {}", key);
            return Vec::new();
        };

        info!("Fetching {} ({} feeds)", source.name, source.feeds.len());

        // join_all keeps declaration order regardless of completion order
        let results = join_all(
            source
                .feeds
                .iter()
                .map(|feed| self.fetcher.fetch_feed(feed, &source.name)),
        )
        .await;

        let all_items: Vec<NewsItem> = results.into_iter().flatten().collect();
        let total = all_items.len();

        let mut items = dedupe_by_title(all_items);
        sort_by_date_desc(&mut items);

        info!(
            "{}: {} unique items (from {} total)",
            source.name,
            items.len(),
            total
        );
        items
    }

    /// Fetch the given sources one after another.
    pub async fn fetch_all(&self, keys: &[&str]) -> AggregatedSources {
        let mut aggregated = AggregatedSources::default();

        for key in keys {
            let name = self
                .source(key)
                .map(|s| s.name.clone())
                .unwrap_or_else(|| key.to_string());
            let items = self.fetch_source(key).await;

            aggregated.push(SourceNews {
                key: key.to_string(),
                name,
                items,
            });
        }

        aggregated
    }
}

/// Keep the first item for each exact title.
pub fn dedupe_by_title(items: Vec<NewsItem>) -> Vec<NewsItem> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.title.clone()))
        .collect()
}

/// Newest first. The sort is stable; items whose date cannot be parsed
/// go after every dated item.
pub fn sort_by_date_desc(items: &mut [NewsItem]) {
    items.sort_by_cached_key(|item| Reverse(parse_timestamp(&item.date)));
}

/// Parse the date formats seen in feeds: RFC 2822, RFC 3339, and bare
/// `YYYY-MM-DD[ HH:MM:SS]` (taken as UTC).
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();

    if let Ok(dt) = DateTime::parse_from_rfc2822(value) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S") {
        return Some(dt.and_utc());
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FeedConfig, FetchSettings};

    fn item(title: &str, date: &str, feed: &str) -> NewsItem {
        NewsItem {
            title: title.to_string(),
            link: None,
            source: "Source".to_string(),
            feed_name: feed.to_string(),
            category: "world".to_string(),
            date: date.to_string(),
            snippet: String::new(),
            importance: 80,
            plan_tags: vec![],
        }
    }

    fn titles(items: &[NewsItem]) -> Vec<&str> {
        items.iter().map(|i| i.title.as_str()).collect()
    }

    mod parse_timestamp_tests {
        use super::*;

        #[test]
        fn test_rfc2822() {
            let dt = parse_timestamp("Mon, 09 Dec 2024 12:00:00 GMT").unwrap();
            assert_eq!(dt.to_rfc3339(), "2024-12-09T12:00:00+00:00");
        }

        #[test]
        fn test_rfc2822_with_offset() {
            let dt = parse_timestamp("Mon, 09 Dec 2024 20:00:00 +0800").unwrap();
            assert_eq!(dt.to_rfc3339(), "2024-12-09T12:00:00+00:00");
        }

        #[test]
        fn test_rfc3339() {
            let dt = parse_timestamp("2024-01-02T08:00:00+08:00").unwrap();
            assert_eq!(dt.to_rfc3339(), "2024-01-02T00:00:00+00:00");
        }

        #[test]
        fn test_bare_date_and_datetime() {
            assert!(parse_timestamp("2024-01-02").is_some());
            assert!(parse_timestamp("2024-01-02 10:30:00").is_some());
        }

        #[test]
        fn test_garbage() {
            assert!(parse_timestamp("yesterday").is_none());
            assert!(parse_timestamp("").is_none());
        }
    }

    mod dedupe_tests {
        use super::*;

        #[test]
        fn test_first_occurrence_wins() {
            let items = vec![
                item("X", "2024-01-02", "A"),
                item("Y", "2024-01-01", "A"),
                item("Y", "2024-01-03", "B"),
                item("Z", "2024-01-01", "B"),
            ];

            let deduped = dedupe_by_title(items);

            assert_eq!(titles(&deduped), vec!["X", "Y", "Z"]);
            assert_eq!(deduped[1].feed_name, "A");
        }

        #[test]
        fn test_near_duplicates_are_kept() {
            let items = vec![item("Headline", "", "A"), item("Headline.", "", "A")];
            assert_eq!(dedupe_by_title(items).len(), 2);
        }
    }

    mod sort_tests {
        use super::*;

        #[test]
        fn test_sorted_newest_first() {
            let mut items = vec![
                item("old", "Mon, 01 Jan 2024 00:00:00 GMT", "A"),
                item("new", "2024-01-03T00:00:00Z", "A"),
                item("mid", "2024-01-02", "A"),
            ];

            sort_by_date_desc(&mut items);

            assert_eq!(titles(&items), vec!["new", "mid", "old"]);
        }

        #[test]
        fn test_ties_keep_arrival_order() {
            let mut items = vec![
                item("first", "2024-01-01", "A"),
                item("second", "2024-01-01", "B"),
            ];

            sort_by_date_desc(&mut items);

            assert_eq!(titles(&items), vec!["first", "second"]);
        }

        #[test]
        fn test_unparseable_dates_last() {
            let mut items = vec![
                item("undated", "not a date", "A"),
                item("dated", "2024-01-01", "A"),
            ];

            sort_by_date_desc(&mut items);

            assert_eq!(titles(&items), vec!["dated", "undated"]);
        }

        #[test]
        fn test_two_feed_scenario() {
            // Feed A: X, Y; feed B: Y, Z. A is declared first.
            let merged = vec![
                item("X", "2024-01-02", "A"),
                item("Y", "2024-01-01", "A"),
                item("Y", "2024-01-03", "B"),
                item("Z", "2024-01-03", "B"),
            ];

            let mut items = dedupe_by_title(merged);
            sort_by_date_desc(&mut items);

            assert_eq!(titles(&items), vec!["Z", "X", "Y"]);
            assert_eq!(items[2].feed_name, "A");
            assert_eq!(items[2].date, "2024-01-01");
        }
    }

    mod fetch_source_tests {
        use super::*;

        #[tokio::test]
        async fn test_unknown_source_is_empty() {
            let fetcher = Fetcher::new(FetchSettings::default()).unwrap();
            let aggregator = Aggregator::new(fetcher, vec![]);

            assert!(aggregator.fetch_source("nope").await.is_empty());
        }

        #[tokio::test]
        async fn test_fetch_all_keeps_key_order_and_unknown_keys() {
            let fetcher = Fetcher::new(FetchSettings::default()).unwrap();
            let sources = vec![SourceConfig {
                key: "empty".to_string(),
                name: "Empty Source".to_string(),
                feeds: Vec::<FeedConfig>::new(),
            }];
            let aggregator = Aggregator::new(fetcher, sources);

            let all = aggregator.fetch_all(&["empty", "unknown"]).await;

            let keys: Vec<_> = all.iter().map(|s| s.key.as_str()).collect();
            assert_eq!(keys, vec!["empty", "unknown"]);
            assert_eq!(all.iter().next().unwrap().name, "Empty Source");
            assert!(all.combined().is_empty());
        }
    }
}
