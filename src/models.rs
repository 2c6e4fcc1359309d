use std::collections::BTreeMap;

use serde::{Deserialize, Serialize, Serializer};

/// Substituted when a feed entry has no usable title.
pub const UNTITLED: &str = "无标题";

/// One normalized story.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsItem {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    pub source: String,
    pub feed_name: String,
    pub category: String,
    /// Publication timestamp exactly as the feed delivered it
    pub date: String,
    #[serde(default)]
    pub snippet: String,
    /// Rank score within the originating feed only
    pub importance: i32,
    #[serde(default)]
    pub plan_tags: Vec<PlanTag>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanTag {
    pub id: String,
    pub name: String,
    pub icon: String,
    pub color: String,
}

/// Contents of one `<YYYY-MM-DD>.json` archive file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchiveRecord {
    pub date: String,
    pub items: Vec<NewsItem>,
}

/// Deduplicated, date-sorted items of one source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceNews {
    pub key: String,
    pub name: String,
    pub items: Vec<NewsItem>,
}

/// Per-source results of one run, in source declaration order.
/// Serializes as a map from source key to its items.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregatedSources {
    sources: Vec<SourceNews>,
}

impl Serialize for AggregatedSources {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.sources.iter().map(|s| (&s.key, &s.items)))
    }
}

impl AggregatedSources {
    pub fn push(&mut self, source: SourceNews) {
        self.sources.push(source);
    }

    pub fn get(&self, key: &str) -> Option<&[NewsItem]> {
        self.sources
            .iter()
            .find(|s| s.key == key)
            .map(|s| s.items.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = &SourceNews> {
        self.sources.iter()
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// All items concatenated source by source.
    pub fn combined(&self) -> Vec<NewsItem> {
        self.sources
            .iter()
            .flat_map(|s| s.items.iter().cloned())
            .collect()
    }
}

/// Everything one run produced, handed to the report renderer.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub date: String,
    pub timestamp: String,
    pub sources: AggregatedSources,
    /// Source key to Markdown briefing; sources without one are omitted
    pub briefings: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weekly_trend: Option<String>,
}
