//! LLM-backed briefings and trend reports.
//!
//! Summaries are best-effort: every failure is logged and reported as
//! `None`, and callers omit the section.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::config::SummarizerSettings;
use crate::error::SummarizerError;
use crate::models::{ArchiveRecord, NewsItem};

/// Titles per source sent for a daily briefing.
pub const DAILY_TITLE_LIMIT: usize = 15;
/// Titles per archived day sent for a trend report.
pub const WEEKLY_TITLES_PER_DAY: usize = 5;

const DAILY_SYSTEM_PROMPT: &str = "你是一名专业的中国时政新闻分析师。";
const WEEKLY_SYSTEM_PROMPT: &str =
    "你是一名中国政策研究专家，善于从官方媒体报道中识别政策走向。";

#[allow(async_fn_in_trait)]
pub trait Summarizer {
    /// Markdown digest of one source's items for today.
    async fn summarize_daily(&self, source_label: &str, items: &[NewsItem]) -> Option<String>;

    /// Markdown trend analysis across archived days.
    async fn summarize_weekly(&self, window: &[ArchiveRecord]) -> Option<String>;
}

pub fn daily_prompt(source_label: &str, items: &[NewsItem]) -> String {
    let titles = items
        .iter()
        .take(DAILY_TITLE_LIMIT)
        .map(|i| format!("- {}", i.title))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "以下是{source_label}今天的新闻标题。请归纳其中最重要的3到5个政策信号。\n\
         \n\
         格式要求:\n\
         1. 每个要点以 \"### 🔹 标题\" 开头\n\
         2. 要点下用两三句话说明背景与意义\n\
         3. 相关新闻合并分析\n\
         4. 只输出Markdown正文\n\
         \n\
         来源: {source_label}\n\
         标题:\n\
         {titles}\n"
    )
}

pub fn weekly_prompt(window: &[ArchiveRecord]) -> String {
    let overview = window
        .iter()
        .map(|day| {
            let titles = day
                .items
                .iter()
                .take(WEEKLY_TITLES_PER_DAY)
                .map(|i| format!("  - {}", i.title))
                .collect::<Vec<_>>()
                .join("\n");
            format!("### {}\n{}", day.date, titles)
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        "请根据近一周中国官方媒体的新闻标题撰写政策趋势报告，包含以下章节:\n\
         \n\
         ## 📊 本周核心政策动向\n\
         ## 📈 趋势变化分析\n\
         ## ⚠️ 值得关注的信号\n\
         ## 🔮 下周研判\n\
         \n\
         ---\n\
         一周新闻概览:\n\
         {overview}\n"
    )
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Client for an OpenAI-compatible chat completions endpoint (DeepSeek by
/// default).
pub struct DeepSeekClient {
    client: Client,
    settings: SummarizerSettings,
    api_key: Option<String>,
}

impl DeepSeekClient {
    pub fn new(
        settings: SummarizerSettings,
        api_key: Option<String>,
    ) -> Result<Self, SummarizerError> {
        let client = Client::builder().build()?;
        let api_key = api_key.filter(|k| !k.trim().is_empty());

        Ok(Self {
            client,
            settings,
            api_key,
        })
    }

    /// Read the API key from the environment variable named in settings.
    pub fn from_env(settings: SummarizerSettings) -> Result<Self, SummarizerError> {
        let api_key = std::env::var(&settings.api_key_env).ok();
        if api_key.is_none() {
            warn!(
                "{} is not set; briefings and trend reports will be skipped",
                settings.api_key_env
            );
        }
        Self::new(settings, api_key)
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/chat/completions",
            self.settings.base_url.trim_end_matches('/')
        )
    }

    async fn complete(
        &self,
        model: &str,
        system: &str,
        prompt: &str,
        timeout: Duration,
    ) -> Result<String, SummarizerError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| SummarizerError::MissingApiKey(self.settings.api_key_env.clone()))?;

        let request = ChatRequest {
            model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            stream: false,
        };

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(api_key)
            .timeout(timeout)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SummarizerError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = response.json().await?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or(SummarizerError::EmptyResponse)
    }
}

impl Summarizer for DeepSeekClient {
    async fn summarize_daily(&self, source_label: &str, items: &[NewsItem]) -> Option<String> {
        if items.is_empty() {
            return None;
        }

        let prompt = daily_prompt(source_label, items);
        let timeout = Duration::from_secs(self.settings.daily_timeout_secs);

        match self
            .complete(&self.settings.daily_model, DAILY_SYSTEM_PROMPT, &prompt, timeout)
            .await
        {
            Ok(briefing) => {
                info!("Briefing created for {}", source_label);
                Some(briefing)
            }
            Err(SummarizerError::MissingApiKey(var)) => {
                warn!("Skipping briefing for {}: {} not set", source_label, var);
                None
            }
            Err(e) => {
                error!("Briefing generation failed for {}: {}", source_label, e);
                None
            }
        }
    }

    async fn summarize_weekly(&self, window: &[ArchiveRecord]) -> Option<String> {
        if window.is_empty() {
            return None;
        }

        let prompt = weekly_prompt(window);
        let timeout = Duration::from_secs(self.settings.weekly_timeout_secs);

        match self
            .complete(&self.settings.weekly_model, WEEKLY_SYSTEM_PROMPT, &prompt, timeout)
            .await
        {
            Ok(trend) => Some(trend),
            Err(SummarizerError::MissingApiKey(var)) => {
                warn!("Skipping trend report: {} not set", var);
                None
            }
            Err(e) => {
                error!("Weekly trend generation failed: {}", e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn item(title: &str) -> NewsItem {
        NewsItem {
            title: title.to_string(),
            link: None,
            source: "人民日报".to_string(),
            feed_name: "时政要闻".to_string(),
            category: "politics".to_string(),
            date: "2024-01-01".to_string(),
            snippet: String::new(),
            importance: 80,
            plan_tags: vec![],
        }
    }

    fn items(prefix: &str, count: usize) -> Vec<NewsItem> {
        (0..count).map(|i| item(&format!("{}-{}", prefix, i))).collect()
    }

    fn record(date: &str, count: usize) -> ArchiveRecord {
        ArchiveRecord {
            date: date.to_string(),
            items: items(date, count),
        }
    }

    fn test_client(base_url: &str, api_key: Option<&str>) -> DeepSeekClient {
        let settings = SummarizerSettings {
            base_url: base_url.to_string(),
            daily_timeout_secs: 2,
            weekly_timeout_secs: 2,
            ..SummarizerSettings::default()
        };
        DeepSeekClient::new(settings, api_key.map(str::to_string)).unwrap()
    }

    fn completion(content: &str) -> serde_json::Value {
        json!({
            "id": "cmpl-1",
            "choices": [{ "index": 0, "message": { "role": "assistant", "content": content } }]
        })
    }

    mod prompt_tests {
        use super::*;

        #[test]
        fn test_daily_prompt_caps_titles() {
            let prompt = daily_prompt("人民日报", &items("t", 20));

            assert!(prompt.contains("- t-0\n"));
            assert!(prompt.contains("- t-14\n"));
            assert!(!prompt.contains("t-15"));
            assert!(prompt.contains("人民日报"));
        }

        #[test]
        fn test_weekly_prompt_caps_titles_per_day() {
            let window = vec![record("2024-01-01", 8), record("2024-01-02", 2)];

            let prompt = weekly_prompt(&window);

            assert!(prompt.contains("### 2024-01-01\n  - 2024-01-01-0"));
            assert!(prompt.contains("2024-01-01-4"));
            assert!(!prompt.contains("2024-01-01-5"));
            assert!(prompt.contains("### 2024-01-02\n  - 2024-01-02-0\n  - 2024-01-02-1"));
        }
    }

    mod client_tests {
        use super::*;

        #[tokio::test]
        async fn test_daily_briefing_success() {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .and(path("/chat/completions"))
                .and(header("authorization", "Bearer test-key"))
                .and(body_partial_json(json!({ "model": "deepseek-chat", "stream": false })))
                .respond_with(ResponseTemplate::new(200).set_body_json(completion("### 🔹 要点")))
                .expect(1)
                .mount(&server)
                .await;

            let client = test_client(&server.uri(), Some("test-key"));
            let briefing = client.summarize_daily("人民日报", &items("t", 3)).await;

            assert_eq!(briefing.as_deref(), Some("### 🔹 要点"));
        }

        #[tokio::test]
        async fn test_weekly_uses_reasoning_model() {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .and(path("/chat/completions"))
                .and(body_partial_json(json!({ "model": "deepseek-reasoner" })))
                .respond_with(ResponseTemplate::new(200).set_body_json(completion("## 📊 趋势")))
                .expect(1)
                .mount(&server)
                .await;

            let client = test_client(&server.uri(), Some("test-key"));
            let window = vec![record("2024-01-01", 3); 3];

            let trend = client.summarize_weekly(&window).await;
            assert_eq!(trend.as_deref(), Some("## 📊 趋势"));
        }

        #[tokio::test]
        async fn test_missing_key_skips_request() {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .respond_with(ResponseTemplate::new(200).set_body_json(completion("x")))
                .expect(0)
                .mount(&server)
                .await;

            let client = test_client(&server.uri(), None);

            assert!(client.summarize_daily("src", &items("t", 1)).await.is_none());
            assert!(client.summarize_weekly(&[record("2024-01-01", 1)]).await.is_none());
        }

        #[tokio::test]
        async fn test_blank_key_counts_as_missing() {
            let client = test_client("http://127.0.0.1:9", Some("   "));
            assert!(client.summarize_daily("src", &items("t", 1)).await.is_none());
        }

        #[tokio::test]
        async fn test_http_error_is_absent() {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .respond_with(ResponseTemplate::new(401).set_body_string("invalid key"))
                .mount(&server)
                .await;

            let client = test_client(&server.uri(), Some("bad-key"));
            assert!(client.summarize_daily("src", &items("t", 1)).await.is_none());
        }

        #[tokio::test]
        async fn test_malformed_response_is_absent() {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "choices": [] })))
                .mount(&server)
                .await;

            let client = test_client(&server.uri(), Some("test-key"));
            assert!(client.summarize_weekly(&[record("2024-01-01", 1)]).await.is_none());
        }

        #[tokio::test]
        async fn test_empty_input_is_absent_without_request() {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .respond_with(ResponseTemplate::new(200).set_body_json(completion("x")))
                .expect(0)
                .mount(&server)
                .await;

            let client = test_client(&server.uri(), Some("test-key"));
            assert!(client.summarize_daily("src", &[]).await.is_none());
            assert!(client.summarize_weekly(&[]).await.is_none());
        }
    }
}
