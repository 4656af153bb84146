//! Audit orchestrator
//!
//! The single point that sequences "collect then score": fan out the three
//! data sources concurrently, join on all of them, and hand the combined
//! snapshot to the scoring engine. Each source is non-throwing and bounds
//! its own latency, so the join always completes and needs no source-
//! specific error handling here; a slow or failed source never cancels the
//! others. The only fail-fast path is credential validation, which runs
//! before any source is contacted.

use crate::scoring::compute_scores;
use crate::services::browser::BrowserCheckRunner;
use crate::services::crux::CruxClient;
use crate::services::pagespeed::PageSpeedClient;
use crate::types::{MetricSnapshot, ScoringResult};
use lms_common::config::AuditConfig;
use lms_common::{Error, Result};

/// Run a complete audit: collect from all three sources, then score
pub async fn run_full_audit(url: &str, config: &AuditConfig) -> Result<ScoringResult> {
    let snapshot = collect_metrics(url, config).await?;
    let result = compute_scores(&snapshot);

    tracing::info!(
        url = %url,
        lms = result.lms,
        rri = result.rri,
        pmi = result.pmi,
        "Audit complete"
    );

    Ok(result)
}

/// Collect the raw metric snapshot without scoring it
///
/// Public so callers can persist per-source raw data alongside the scores.
pub async fn collect_metrics(url: &str, config: &AuditConfig) -> Result<MetricSnapshot> {
    if url.trim().is_empty() {
        return Err(Error::InvalidInput("Audit URL is empty".to_string()));
    }
    config.validate()?;

    let pagespeed_client = PageSpeedClient::new(&config.psi_api_key)
        .map_err(|e| Error::Internal(e.to_string()))?;
    let crux_client =
        CruxClient::new(&config.crux_api_key).map_err(|e| Error::Internal(e.to_string()))?;
    let browser_runner = BrowserCheckRunner::new();

    tracing::info!(url = %url, "Starting audit data collection");

    let (pagespeed, crux, browser) = tokio::join!(
        pagespeed_client.fetch(url),
        crux_client.fetch(url),
        browser_runner.run(url),
    );

    let degraded = [
        pagespeed.error.as_deref().map(|e| ("pagespeed", e)),
        crux.error.as_deref().map(|e| ("crux", e)),
        browser.error.as_deref().map(|e| ("browser", e)),
    ];
    for (source, error) in degraded.into_iter().flatten() {
        tracing::warn!(url = %url, source, error, "Source degraded during collection");
    }

    tracing::info!(url = %url, "Audit data collection complete");

    Ok(MetricSnapshot {
        url: url.to_string(),
        pagespeed,
        crux,
        browser,
    })
}
