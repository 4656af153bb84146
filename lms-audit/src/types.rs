//! Audit data model
//!
//! The three source records (`PageSpeedResult`, `CruxResult`,
//! `BrowserCheckResult`) are produced by the service clients and are never
//! errors themselves: a failed source comes back as a record with `None`
//! fields and `error` set, so one unreliable source cannot block scoring
//! from the other two. The orchestrator combines them into a
//! `MetricSnapshot`, consumed once by the scoring engine.

use crate::spec::CategoryKey;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Lab performance data from PageSpeed Insights (Lighthouse, mobile)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PageSpeedResult {
    /// Largest Contentful Paint, seconds
    pub lcp: Option<f64>,
    /// Interaction to Next Paint, milliseconds
    pub inp: Option<f64>,
    /// Cumulative Layout Shift, unitless
    pub cls: Option<f64>,
    /// Lighthouse performance category, 0-100
    pub performance_score: Option<f64>,
    /// Lighthouse accessibility category, 0-100
    pub accessibility_score: Option<f64>,
    /// Lighthouse best-practices category, 0-100
    pub best_practices_score: Option<f64>,
    /// Lighthouse SEO category, 0-100
    pub seo_score: Option<f64>,
    /// Top improvement suggestions (at most 5)
    pub opportunities: Vec<Opportunity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PageSpeedResult {
    /// All-null record for a failed lookup
    pub fn unavailable(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::default()
        }
    }
}

/// One Lighthouse improvement opportunity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Opportunity {
    pub title: String,
    pub description: String,
    /// Estimated savings as reported upstream (e.g. "Potential savings of 1.2 s")
    pub savings: String,
}

/// p75 and good/needs-improvement/poor densities for one Web Vital
///
/// A missing bucket is `None`, meaning unknown rather than zero density.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetricDistribution {
    pub p75: Option<f64>,
    pub good: Option<f64>,
    pub needs_improvement: Option<f64>,
    pub poor: Option<f64>,
}

/// Real-user field data from the Chrome UX Report
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CruxResult {
    pub lcp: MetricDistribution,
    pub inp: MetricDistribution,
    pub cls: MetricDistribution,
    /// Whether the URL or its origin had sufficient traffic for field data
    pub eligible: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CruxResult {
    /// Record for a URL without usable field data
    ///
    /// Ineligibility is an expected outcome, distinct from a transport
    /// failure; the reason is carried for evidence text.
    pub fn ineligible(reason: impl Into<String>) -> Self {
        Self {
            eligible: false,
            error: Some(reason.into()),
            ..Self::default()
        }
    }
}

/// Results of the headless-browser check suite
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BrowserCheckResult {
    /// Clicks needed to reach a payment context (1 or 2), `None` if never reached
    pub clicks_to_pay: Option<u32>,
    pub guest_checkout_available: bool,
    pub wallets_visible: bool,
    pub single_cta_above_fold: bool,
    pub preview_present: bool,
    pub preview_gated: bool,
    pub refund_policy_visible: bool,
    pub privacy_tos_visible: bool,
    pub social_proof_present: bool,
    pub tap_targets_passed: bool,
    pub mobile_responsive: bool,
    pub schema_present: bool,
    pub email_capture_present: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BrowserCheckResult {
    /// All-false record for a session that never yielded a usable page
    pub fn unavailable(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::default()
        }
    }
}

/// Combined output of one collection fan-out, input to the scoring engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricSnapshot {
    pub url: String,
    pub pagespeed: PageSpeedResult,
    pub crux: CruxResult,
    pub browser: BrowserCheckResult,
}

/// One evaluated check, in catalog order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckResult {
    pub name: String,
    pub passed: bool,
}

/// Score breakdown for one category
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryScore {
    pub category: CategoryKey,
    /// 0..=max_score, one decimal place
    pub score: f64,
    pub max_score: f64,
    /// Check outcomes in the catalog's declaration order
    pub checks: Vec<CheckResult>,
    /// Human-readable summaries of the raw values behind the checks
    pub evidence: Vec<String>,
}

impl CategoryScore {
    /// Outcome of a named check, if present
    pub fn check(&self, name: &str) -> Option<bool> {
        self.checks.iter().find(|c| c.name == name).map(|c| c.passed)
    }
}

/// One evaluated gate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateResult {
    pub name: String,
    pub passed: bool,
}

/// Full scoring output for one audit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringResult {
    /// Launch Money Score, 0-100
    pub lms: f64,
    /// Revenue Readiness Index, 0-100
    pub rri: f64,
    /// Popularity Momentum Index, 0-100
    pub pmi: f64,
    pub categories: BTreeMap<CategoryKey, CategoryScore>,
    /// Gate outcomes in evaluation order
    pub gates: Vec<GateResult>,
    /// Prioritized fixes, at most 5
    pub top_fixes: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

impl ScoringResult {
    /// Outcome of a named gate, if present
    pub fn gate(&self, name: &str) -> Option<bool> {
        self.gates.iter().find(|g| g.name == name).map(|g| g.passed)
    }

    /// Whether the score qualifies for the embeddable badge
    pub fn badge_qualified(&self) -> bool {
        self.lms >= crate::spec::LMS_BADGE_THRESHOLD
    }
}
