use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

use crate::error::SearchError;

/// One ranked web-search hit.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    pub link: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub display_link: Option<String>,
    #[serde(default)]
    pub snippet: Option<String>,
}

impl SearchResult {
    pub fn from_link(link: impl Into<String>) -> Self {
        Self {
            link: link.into(),
            title: None,
            display_link: None,
            snippet: None,
        }
    }
}

/// Returns raw ranked results; picking a usable hit is the caller's job.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    async fn search(&self, query: &str) -> Result<Vec<SearchResult>, SearchError>;
}

#[derive(Debug, Clone)]
pub struct SearchSettings {
    pub endpoint: String,
    pub api_key: Option<String>,
    pub engine_id: Option<String>,
    pub result_count: u8,
    pub timeout: Duration,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchResult>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    errors: Vec<ErrorDetail>,
}

#[derive(Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    reason: String,
}

/// Google Custom Search JSON API client.
#[derive(Clone)]
pub struct GoogleSearchClient {
    client: reqwest::Client,
    settings: SearchSettings,
}

impl GoogleSearchClient {
    pub fn new(settings: SearchSettings) -> Result<Self, SearchError> {
        let version = env!("CARGO_PKG_VERSION");
        let client = reqwest::Client::builder()
            .timeout(settings.timeout)
            .user_agent(format!("lyricsr/{}", version))
            .build()?;

        Ok(Self { client, settings })
    }

    fn credentials(&self) -> Result<(&str, &str), SearchError> {
        match (self.settings.api_key.as_deref(), self.settings.engine_id.as_deref()) {
            (Some(key), Some(cx)) if !key.is_empty() && !cx.is_empty() => Ok((key, cx)),
            _ => Err(SearchError::NotConfigured),
        }
    }

    fn query_params(&self, key: &str, cx: &str, query: &str) -> Vec<(&'static str, String)> {
        vec![
            ("key", key.to_string()),
            ("cx", cx.to_string()),
            ("q", query.to_string()),
            ("num", self.settings.result_count.to_string()),
        ]
    }
}

#[async_trait]
impl SearchProvider for GoogleSearchClient {
    async fn search(&self, query: &str) -> Result<Vec<SearchResult>, SearchError> {
        let (key, cx) = self.credentials()?;
        info!("Searching web for: {}", query);

        let response = self
            .client
            .get(&self.settings.endpoint)
            .query(&self.query_params(key, cx, query))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(classify_failure(status, &body));
        }

        let results = parse_results(&body)?;
        debug!(
            "Search returned {} results: {:?}",
            results.len(),
            results.iter().map(|r| r.link.as_str()).collect::<Vec<_>>()
        );
        Ok(results)
    }
}

fn parse_results(body: &str) -> Result<Vec<SearchResult>, SearchError> {
    serde_json::from_str::<SearchResponse>(body)
        .map(|response| response.items)
        .map_err(|e| SearchError::InvalidResponse { reason: e.to_string() })
}

fn classify_failure(status: StatusCode, body: &str) -> SearchError {
    if status == StatusCode::TOO_MANY_REQUESTS {
        return SearchError::QuotaExceeded;
    }

    if status == StatusCode::FORBIDDEN {
        if let Ok(error) = serde_json::from_str::<ErrorResponse>(body) {
            let quota = error.error.errors.iter().any(|detail| {
                matches!(detail.reason.as_str(), "dailyLimitExceeded" | "rateLimitExceeded" | "quotaExceeded")
            });
            if quota || error.error.message.to_lowercase().contains("quota") {
                return SearchError::QuotaExceeded;
            }
        }
    }

    SearchError::Status(status.as_u16())
}
