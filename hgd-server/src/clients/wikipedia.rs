//! Wikipedia page-summary client
//!
//! Enrichment is best effort: every failure path degrades to the
//! "No information found" sentinel and is only logged.

use super::Enricher;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// Sentinel summary used whenever no description could be obtained
pub const NO_INFORMATION: &str = "No information found";

const USER_AGENT: &str = concat!("hgd-server/", env!("CARGO_PKG_VERSION"));

/// Outcome of an enrichment lookup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichmentResult {
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl EnrichmentResult {
    /// The sentinel result
    pub fn not_found() -> Self {
        Self {
            summary: NO_INFORMATION.to_string(),
            title: None,
            url: None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.summary == NO_INFORMATION && self.title.is_none()
    }
}

#[derive(Debug, Deserialize)]
struct SummaryResponse {
    #[serde(default, rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    extract: Option<String>,
    #[serde(default)]
    content_urls: Option<ContentUrls>,
}

#[derive(Debug, Deserialize)]
struct ContentUrls {
    #[serde(default)]
    desktop: Option<PageUrl>,
}

#[derive(Debug, Deserialize)]
struct PageUrl {
    page: String,
}

fn interpret_summary(summary: SummaryResponse) -> Option<EnrichmentResult> {
    if summary.kind.as_deref() == Some("disambiguation") {
        return None;
    }
    let extract = summary.extract?.trim().to_string();
    if extract.is_empty() {
        return None;
    }
    Some(EnrichmentResult {
        summary: extract,
        title: summary.title,
        url: summary.content_urls.and_then(|u| u.desktop).map(|d| d.page),
    })
}

/// Article title as Wikipedia expects it in URLs
fn article_title(subject: &str) -> String {
    subject.split_whitespace().collect::<Vec<_>>().join("_")
}

pub struct WikipediaClient {
    http_client: reqwest::Client,
    base_url: String,
    enabled: bool,
}

impl WikipediaClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration, enabled: bool) -> Result<Self, reqwest::Error> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            http_client,
            base_url: base_url.into(),
            enabled,
        })
    }

    /// `<base_url>/<Title_With_Underscores>`, percent-encoded as one path segment
    fn summary_url(&self, subject: &str) -> Option<reqwest::Url> {
        let mut url = reqwest::Url::parse(&self.base_url).ok()?;
        url.path_segments_mut()
            .ok()?
            .pop_if_empty()
            .push(&article_title(subject));
        Some(url)
    }

    async fn fetch(&self, subject: &str) -> Result<Option<EnrichmentResult>, String> {
        let url = self
            .summary_url(subject)
            .ok_or_else(|| format!("invalid enrichment base URL: {}", self.base_url))?;

        debug!(subject = %subject, url = %url, "Querying Wikipedia summary");

        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|e| e.to_string())?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(format!("HTTP {}", status.as_u16()));
        }

        let summary: SummaryResponse = response.json().await.map_err(|e| e.to_string())?;
        Ok(interpret_summary(summary))
    }
}

#[async_trait]
impl Enricher for WikipediaClient {
    async fn enrich(&self, subject: &str) -> EnrichmentResult {
        if !self.enabled || subject.trim().is_empty() {
            return EnrichmentResult::not_found();
        }

        match self.fetch(subject).await {
            Ok(Some(result)) => {
                debug!(subject = %subject, title = ?result.title, "Enrichment found");
                result
            }
            Ok(None) => {
                debug!(subject = %subject, "No encyclopedia page for subject");
                EnrichmentResult::not_found()
            }
            Err(e) => {
                warn!(subject = %subject, error = %e, "Enrichment lookup failed");
                EnrichmentResult::not_found()
            }
        }
    }
}
