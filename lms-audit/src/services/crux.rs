//! Chrome UX Report API client
//!
//! Fetches real-user field data for a page. URL-level data is attempted
//! first; on a transport or API failure the same query is retried at
//! origin level, since many pages only have population-level statistics.
//! Both levels failing is the expected "insufficient traffic" outcome and
//! is reported as `eligible: false` with a human-readable reason, never as
//! an error out of `fetch`.

use crate::types::{CruxResult, MetricDistribution};
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

const CRUX_API_URL: &str = "https://chromeuxreport.googleapis.com/v1/records:queryRecord";
const USER_AGENT: &str = "lms-audit/0.1.0 (https://github.com/lms-audit/lms-audit)";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const FORM_FACTOR: &str = "PHONE";

const LCP_METRIC: &str = "largest_contentful_paint";
const INP_METRIC: &str = "interaction_to_next_paint";
const CLS_METRIC: &str = "cumulative_layout_shift";

/// CrUX client errors
#[derive(Debug, Error)]
pub enum CruxError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("API error {0}: {1}")]
    ApiError(u16, String),

    #[error("Parse error: {0}")]
    ParseError(String),
}

/// queryRecord response (subset)
#[derive(Debug, Clone, Deserialize)]
struct QueryResponse {
    record: Option<CruxRecord>,
}

#[derive(Debug, Clone, Deserialize)]
struct CruxRecord {
    metrics: Option<HashMap<String, CruxMetric>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct CruxMetric {
    #[serde(default)]
    histogram: Vec<HistogramBin>,
    percentiles: Option<Percentiles>,
}

#[derive(Debug, Clone, Deserialize)]
struct HistogramBin {
    density: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
struct Percentiles {
    /// Reported as a JSON number for CLS and a string for ms-valued metrics
    p75: Option<serde_json::Value>,
}

/// Chrome UX Report API client
pub struct CruxClient {
    http_client: reqwest::Client,
    api_key: String,
}

impl CruxClient {
    pub fn new(api_key: impl Into<String>) -> Result<Self, CruxError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| CruxError::NetworkError(e.to_string()))?;

        Ok(Self {
            http_client,
            api_key: api_key.into(),
        })
    }

    /// Fetch field data for `url`, falling back to its origin
    pub async fn fetch(&self, url: &str) -> CruxResult {
        match self.query(serde_json::json!({ "url": url, "formFactor": FORM_FACTOR })).await {
            Ok(Some(result)) => result,
            Ok(None) => {
                // The API answered but has no metrics for this exact URL.
                // Matches the upstream contract: no origin retry here.
                CruxResult::ineligible("No CrUX data available for this URL")
            }
            Err(e) => {
                tracing::debug!(url = %url, error = %e, "URL-level CrUX lookup failed, trying origin");
                self.fetch_origin(url).await
            }
        }
    }

    async fn fetch_origin(&self, url: &str) -> CruxResult {
        let Some(origin) = origin_of(url) else {
            return CruxResult::ineligible(format!("Cannot derive origin from {url}"));
        };

        match self
            .query(serde_json::json!({ "origin": origin, "formFactor": FORM_FACTOR }))
            .await
        {
            Ok(Some(result)) => result,
            Ok(None) => CruxResult::ineligible("No CrUX data available for this origin"),
            Err(e) => {
                tracing::info!(origin = %origin, error = %e, "CrUX has no data at either level");
                CruxResult::ineligible("CrUX data not available (insufficient traffic)")
            }
        }
    }

    /// Run one queryRecord call; `Ok(None)` means the API had no metrics
    async fn query(&self, body: serde_json::Value) -> Result<Option<CruxResult>, CruxError> {
        let response = self
            .http_client
            .post(CRUX_API_URL)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(|e| CruxError::NetworkError(e.to_string()))?;

        let status = response.status();

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(CruxError::ApiError(status.as_u16(), error_text));
        }

        let payload: QueryResponse = response
            .json()
            .await
            .map_err(|e| CruxError::ParseError(e.to_string()))?;

        let Some(metrics) = payload.record.and_then(|r| r.metrics) else {
            return Ok(None);
        };

        let result = CruxResult {
            lcp: extract_metric(&metrics, LCP_METRIC),
            inp: extract_metric(&metrics, INP_METRIC),
            cls: extract_metric(&metrics, CLS_METRIC),
            eligible: true,
            error: None,
        };

        tracing::info!(
            lcp_p75 = ?result.lcp.p75,
            inp_p75 = ?result.inp.p75,
            cls_p75 = ?result.cls.p75,
            "CrUX field data retrieved"
        );

        Ok(Some(result))
    }
}

/// Pull p75 and the three-bucket histogram for one metric
///
/// Buckets arrive ordered good / needs-improvement / poor; any missing
/// bucket stays `None` (unknown, not zero density).
fn extract_metric(metrics: &HashMap<String, CruxMetric>, key: &str) -> MetricDistribution {
    let Some(metric) = metrics.get(key) else {
        return MetricDistribution::default();
    };

    let bucket = |i: usize| metric.histogram.get(i).and_then(|b| b.density);

    MetricDistribution {
        p75: metric
            .percentiles
            .as_ref()
            .and_then(|p| p.p75.as_ref())
            .and_then(p75_value),
        good: bucket(0),
        needs_improvement: bucket(1),
        poor: bucket(2),
    }
}

/// p75 arrives as a number (CLS) or a numeric string (LCP/INP)
fn p75_value(value: &serde_json::Value) -> Option<f64> {
    match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

/// `scheme://host[:port]` for a URL, as CrUX expects origins
fn origin_of(url: &str) -> Option<String> {
    let parsed = reqwest::Url::parse(url).ok()?;
    let origin = parsed.origin();
    if origin.is_tuple() {
        Some(origin.ascii_serialization())
    } else {
        None
    }
}
