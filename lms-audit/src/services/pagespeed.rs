//! PageSpeed Insights API client
//!
//! Fetches Lighthouse lab data (mobile strategy) and normalizes it into a
//! `PageSpeedResult`: the three Core Web Vitals, four category scores, and
//! up to five improvement opportunities. `fetch` never fails: transport,
//! API, and parse errors all come back as an all-null record with `error`
//! set, so a PageSpeed outage degrades scores instead of aborting audits.

use crate::types::{Opportunity, PageSpeedResult};
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

const PAGESPEED_API_URL: &str =
    "https://www.googleapis.com/pagespeedonline/v5/runPagespeed";
const USER_AGENT: &str = "lms-audit/0.1.0 (https://github.com/lms-audit/lms-audit)";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
const MAX_OPPORTUNITIES: usize = 5;

/// PageSpeed client errors
#[derive(Debug, Error)]
pub enum PageSpeedError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("API error {0}: {1}")]
    ApiError(u16, String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Invalid API key")]
    InvalidApiKey,
}

/// PageSpeed API response (subset)
#[derive(Debug, Clone, Deserialize)]
struct PageSpeedResponse {
    #[serde(rename = "lighthouseResult")]
    lighthouse_result: Option<LighthouseResult>,
}

#[derive(Debug, Clone, Deserialize)]
struct LighthouseResult {
    #[serde(default)]
    audits: HashMap<String, LighthouseAudit>,
    #[serde(default)]
    categories: HashMap<String, LighthouseCategory>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct LighthouseAudit {
    title: Option<String>,
    description: Option<String>,
    #[serde(rename = "numericValue")]
    numeric_value: Option<f64>,
    #[serde(rename = "displayValue")]
    display_value: Option<String>,
    details: Option<AuditDetails>,
}

#[derive(Debug, Clone, Deserialize)]
struct AuditDetails {
    #[serde(rename = "type")]
    detail_type: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct LighthouseCategory {
    /// 0.0-1.0 upstream; scaled to 0-100 during normalization
    score: Option<f64>,
}

/// PageSpeed Insights API client
pub struct PageSpeedClient {
    http_client: reqwest::Client,
    api_key: String,
}

impl PageSpeedClient {
    pub fn new(api_key: impl Into<String>) -> Result<Self, PageSpeedError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| PageSpeedError::NetworkError(e.to_string()))?;

        Ok(Self {
            http_client,
            api_key: api_key.into(),
        })
    }

    /// Fetch lab data for `url`, degrading every failure into the record
    pub async fn fetch(&self, url: &str) -> PageSpeedResult {
        match self.lookup(url).await {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "PageSpeed lookup failed");
                PageSpeedResult::unavailable(e.to_string())
            }
        }
    }

    async fn lookup(&self, url: &str) -> Result<PageSpeedResult, PageSpeedError> {
        let params = [
            ("url", url),
            ("key", self.api_key.as_str()),
            ("category", "performance"),
            ("category", "accessibility"),
            ("category", "best-practices"),
            ("category", "seo"),
            ("strategy", "mobile"),
        ];

        tracing::debug!(url = %url, "Querying PageSpeed Insights API");

        let response = self
            .http_client
            .get(PAGESPEED_API_URL)
            .query(&params)
            .send()
            .await
            .map_err(|e| PageSpeedError::NetworkError(e.to_string()))?;

        let status = response.status();

        if status == 400 || status == 403 {
            return Err(PageSpeedError::InvalidApiKey);
        }

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(PageSpeedError::ApiError(status.as_u16(), error_text));
        }

        let payload: PageSpeedResponse = response
            .json()
            .await
            .map_err(|e| PageSpeedError::ParseError(e.to_string()))?;

        let result = normalize(payload);

        tracing::info!(
            url = %url,
            lcp_s = ?result.lcp,
            inp_ms = ?result.inp,
            cls = ?result.cls,
            performance = ?result.performance_score,
            "PageSpeed lab data retrieved"
        );

        Ok(result)
    }
}

/// Normalize the raw Lighthouse payload into the audit record
fn normalize(payload: PageSpeedResponse) -> PageSpeedResult {
    let Some(lighthouse) = payload.lighthouse_result else {
        return PageSpeedResult::unavailable("Response carried no Lighthouse result");
    };

    let audit_value =
        |key: &str| lighthouse.audits.get(key).and_then(|a| a.numeric_value);
    let category_score = |key: &str| {
        lighthouse
            .categories
            .get(key)
            .and_then(|c| c.score)
            .map(|s| s * 100.0)
    };

    // LCP arrives in milliseconds; the scoring thresholds are in seconds
    let lcp = audit_value("largest-contentful-paint").map(|ms| ms / 1000.0);
    let inp = audit_value("interaction-to-next-paint");
    let cls = audit_value("cumulative-layout-shift");

    let mut opportunities: Vec<(String, Opportunity)> = lighthouse
        .audits
        .iter()
        .filter(|(_, audit)| {
            audit
                .details
                .as_ref()
                .and_then(|d| d.detail_type.as_deref())
                == Some("opportunity")
        })
        .map(|(key, audit)| {
            (
                key.clone(),
                Opportunity {
                    title: audit.title.clone().unwrap_or_else(|| key.clone()),
                    description: audit.description.clone().unwrap_or_default(),
                    savings: audit.display_value.clone().unwrap_or_default(),
                },
            )
        })
        .collect();
    // Audit maps are unordered; sort by key so repeated runs list the same five
    opportunities.sort_by(|(a, _), (b, _)| a.cmp(b));
    opportunities.truncate(MAX_OPPORTUNITIES);

    PageSpeedResult {
        lcp,
        inp,
        cls,
        performance_score: category_score("performance"),
        accessibility_score: category_score("accessibility"),
        best_practices_score: category_score("best-practices"),
        seo_score: category_score("seo"),
        opportunities: opportunities.into_iter().map(|(_, o)| o).collect(),
        error: None,
    }
}
