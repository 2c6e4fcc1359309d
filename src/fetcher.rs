use chrono::Utc;
use feed_rs::model::{Entry, Text};
use feed_rs::parser;
use reqwest::header::ACCEPT;
use reqwest::Client;
use scraper::Html;
use tracing::{error, info, warn};

use crate::config::{FeedConfig, FetchSettings};
use crate::error::FetchError;
use crate::models::{NewsItem, UNTITLED};
use crate::tags::match_plan_tags;

const ACCEPT_XML: &str = "application/rss+xml, application/xml, text/xml; q=0.1";
const SNIPPET_MAX_CHARS: usize = 300;
const TOP_IMPORTANCE: i32 = 80;

pub struct Fetcher {
    client: Client,
    settings: FetchSettings,
}

impl Fetcher {
    pub fn new(settings: FetchSettings) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(settings.timeout())
            .user_agent(settings.user_agent.as_str())
            .build()
            .map_err(FetchError::Client)?;

        Ok(Self { client, settings })
    }

    /// Fetch and normalize one feed. Any failure is logged and yields an
    /// empty list so one broken feed never affects the others.
    pub async fn fetch_feed(&self, feed: &FeedConfig, source_label: &str) -> Vec<NewsItem> {
        info!("Fetching feed: {} ({})", feed.name, feed.url);

        match self.try_fetch_feed(feed, source_label).await {
            Ok(items) => {
                info!("Got {} items from '{}'", items.len(), feed.name);
                items
            }
            Err(e) => {
                error!(
                    "Failed to fetch feed '{}' for {}: {}",
                    feed.name, source_label, e
                );
                Vec::new()
            }
        }
    }

    async fn try_fetch_feed(
        &self,
        feed: &FeedConfig,
        source_label: &str,
    ) -> Result<Vec<NewsItem>, FetchError> {
        let bytes = self.fetch_with_retry(&feed.url).await?;
        self.parse_items(&bytes, feed, source_label)
    }

    /// GET `url`, retrying transport and HTTP status failures with a linear
    /// backoff of `attempt * retry_delay` between attempts.
    pub async fn fetch_with_retry(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let max_attempts = self.settings.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match self.get(url).await {
                Ok(bytes) => return Ok(bytes),
                Err(source) if attempt >= max_attempts => {
                    return Err(FetchError::Http {
                        url: url.to_string(),
                        attempts: attempt,
                        source,
                    });
                }
                Err(e) => {
                    warn!("Retrying {} ({}/{}): {}", url, attempt, max_attempts, e);
                    tokio::time::sleep(self.settings.retry_delay() * attempt).await;
                    attempt += 1;
                }
            }
        }
    }

    async fn get(&self, url: &str) -> reqwest::Result<Vec<u8>> {
        let response = self
            .client
            .get(url)
            .header(ACCEPT, ACCEPT_XML)
            .send()
            .await?
            .error_for_status()?;
        let bytes = response.bytes().await?;
        Ok(bytes.to_vec())
    }

    /// Parse a feed document into at most `max_items_per_feed` items, in
    /// document order.
    pub fn parse_items(
        &self,
        bytes: &[u8],
        feed: &FeedConfig,
        source_label: &str,
    ) -> Result<Vec<NewsItem>, FetchError> {
        // feed_rs only exposes parsed dates; keep the raw <pubDate> text
        let raw_dates = Self::extract_pub_dates_from_xml(bytes);

        let parsed = parser::parse(bytes)?;

        // Positions only line up when every raw <item> became an entry
        let raw_dates = if raw_dates.len() == parsed.entries.len() {
            raw_dates
        } else {
            if !raw_dates.is_empty() {
                warn!(
                    "Found {} <item> blocks for {} entries in '{}', using parsed dates",
                    raw_dates.len(),
                    parsed.entries.len(),
                    feed.name
                );
            }
            Vec::new()
        };

        let items = parsed
            .entries
            .into_iter()
            .take(self.settings.max_items_per_feed)
            .enumerate()
            .map(|(index, entry)| {
                let raw_date = raw_dates.get(index).cloned().flatten();
                Self::normalize_entry(entry, index, raw_date, feed, source_label)
            })
            .collect();

        Ok(items)
    }

    pub fn normalize_entry(
        entry: Entry,
        index: usize,
        raw_date: Option<String>,
        feed: &FeedConfig,
        source_label: &str,
    ) -> NewsItem {
        let title = entry
            .title
            .as_ref()
            .map(|t| t.content.trim())
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| UNTITLED.to_string());

        let link = entry.links.first().map(|l| l.href.clone());

        let snippet = Self::extract_snippet(&entry);

        let date = raw_date
            .or_else(|| entry.published.or(entry.updated).map(|dt| dt.to_rfc3339()))
            .unwrap_or_else(|| Utc::now().to_rfc3339());

        let plan_tags = match_plan_tags(&title, &snippet);

        NewsItem {
            title,
            link,
            source: source_label.to_string(),
            feed_name: feed.name.clone(),
            category: feed.category.clone(),
            date,
            snippet,
            importance: TOP_IMPORTANCE - 2 * index as i32,
            plan_tags,
        }
    }

    /// Plain-text snippet: a plain-text summary is used as is, otherwise
    /// HTML content (or an HTML summary) is reduced to its text.
    pub fn extract_snippet(entry: &Entry) -> String {
        let text = match &entry.summary {
            Some(summary) if is_plain_text(summary) => summary.content.clone(),
            _ => entry
                .content
                .as_ref()
                .and_then(|c| c.body.as_deref())
                .or(entry.summary.as_ref().map(|s| s.content.as_str()))
                .map(html_to_text)
                .unwrap_or_default(),
        };

        truncate_chars(&collapse_whitespace(&text), SNIPPET_MAX_CHARS)
    }

    /// Raw `<pubDate>` (or `<dc:date>`) text of every `<item>`, in document
    /// order. Atom documents yield an empty list.
    pub fn extract_pub_dates_from_xml(xml_bytes: &[u8]) -> Vec<Option<String>> {
        let xml_str = match std::str::from_utf8(xml_bytes) {
            Ok(s) => s,
            Err(_) => return Vec::new(),
        };

        Self::item_blocks(xml_str)
            .map(|item| {
                Self::extract_xml_element(item, "pubDate")
                    .or_else(|| Self::extract_xml_element(item, "dc:date"))
                    .filter(|d| !d.is_empty())
            })
            .collect()
    }

    fn item_blocks(xml: &str) -> impl Iterator<Item = &str> {
        xml.match_indices("<item")
            .filter(move |(start, tag)| {
                // Skip <items> and similar longer tag names
                xml[start + tag.len()..]
                    .chars()
                    .next()
                    .is_some_and(|c| c == '>' || c.is_whitespace())
            })
            .map(move |(start, _)| {
                let rest = &xml[start..];
                let end = rest.find("</item>").unwrap_or(rest.len());
                &rest[..end]
            })
    }

    pub fn extract_xml_element(xml: &str, tag: &str) -> Option<String> {
        let start_tag = format!("<{}>", tag);
        let end_tag = format!("</{}>", tag);

        let start = xml.find(&start_tag)? + start_tag.len();
        let end = xml[start..].find(&end_tag)? + start;

        let value = xml[start..end].trim();
        let value = value
            .strip_prefix("<![CDATA[")
            .and_then(|v| v.strip_suffix("]]>"))
            .unwrap_or(value);

        Some(value.trim().to_string())
    }
}

fn is_plain_text(text: &Text) -> bool {
    text.content_type.as_str() == "text/plain" && !text.content.contains('<')
}

fn html_to_text(html: &str) -> String {
    let fragment = Html::parse_fragment(html);
    fragment.root_element().text().collect()
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    let truncated: String = text.chars().take(max_chars).collect();
    truncated.trim_end().to_string()
}
