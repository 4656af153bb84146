//! Scoring specification v1.0
//!
//! Static catalog of weights, checks, thresholds, gates, and formulas for
//! the Launch Money Score (LMS), Revenue Readiness Index (RRI), and
//! Popularity Momentum Index (PMI). Loaded once, immutable for the life of
//! the process.
//!
//! Two policies live here rather than in the engine:
//!
//! - **Missing data fails closed.** Measurements are `Option`s; `below`
//!   is the single comparison used for numeric thresholds, and a `None`
//!   never passes. An unavailable source scores low, it does not abort.
//! - **Unimplemented detections are explicit.** Checks without a real
//!   detector carry `SignalKind::AssumedPass` or `SignalKind::AssumedFail`
//!   in the catalog, so capped categories (G, H) are a visible property of
//!   this catalog instead of constants buried in scoring code.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Spec revision, carried alongside persisted results
pub const SPEC_VERSION: &str = "1.0";

/// LMS score at or above which a site qualifies for the badge
pub const LMS_BADGE_THRESHOLD: f64 = 85.0;

/// Category identifier, ordered A through H
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum CategoryKey {
    /// Frictionless Flow
    A,
    /// Proof→Pay
    B,
    /// Transparent Pricing
    C,
    /// Trust Stack
    D,
    /// Traffic Readiness
    E,
    /// Performance
    F,
    /// Lifecycle & Recovery
    G,
    /// Analytics & Iteration
    H,
}

impl CategoryKey {
    pub const ALL: [CategoryKey; 8] = [
        CategoryKey::A,
        CategoryKey::B,
        CategoryKey::C,
        CategoryKey::D,
        CategoryKey::E,
        CategoryKey::F,
        CategoryKey::G,
        CategoryKey::H,
    ];

    /// Human-readable category title
    pub fn title(&self) -> &'static str {
        match self {
            CategoryKey::A => "Frictionless Flow",
            CategoryKey::B => "Proof→Pay",
            CategoryKey::C => "Transparent Pricing",
            CategoryKey::D => "Trust Stack",
            CategoryKey::E => "Traffic Readiness",
            CategoryKey::F => "Performance",
            CategoryKey::G => "Lifecycle & Recovery",
            CategoryKey::H => "Analytics & Iteration",
        }
    }
}

impl fmt::Display for CategoryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// How a check's outcome is produced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalKind {
    /// Evaluated against collected metrics
    Measured,
    /// No detector yet; counted as passed until one exists
    AssumedPass,
    /// No detector yet; counted as failed until one exists
    AssumedFail,
}

/// One named boolean check within a category
#[derive(Debug, Clone, Copy)]
pub struct CheckDef {
    pub name: &'static str,
    pub kind: SignalKind,
}

const fn measured(name: &'static str) -> CheckDef {
    CheckDef {
        name,
        kind: SignalKind::Measured,
    }
}

const fn assumed_pass(name: &'static str) -> CheckDef {
    CheckDef {
        name,
        kind: SignalKind::AssumedPass,
    }
}

const fn assumed_fail(name: &'static str) -> CheckDef {
    CheckDef {
        name,
        kind: SignalKind::AssumedFail,
    }
}

/// One category: weight plus its fixed ordered check list
#[derive(Debug, Clone, Copy)]
pub struct CategoryDef {
    pub key: CategoryKey,
    pub weight: f64,
    pub checks: &'static [CheckDef],
}

impl CategoryDef {
    /// Checks a category must pass per point of weight
    pub fn checks_per_point(&self) -> f64 {
        self.checks.len() as f64 / self.weight
    }
}

/// The full catalog, in category order. Weights sum to 100.
pub static CATEGORIES: [CategoryDef; 8] = [
    CategoryDef {
        key: CategoryKey::A,
        weight: 20.0,
        checks: &[
            measured("one_page_flow"),
            measured("guest_checkout"),
            measured("wallets_visible"),
            measured("single_cta_above_fold"),
            measured("<=2_clicks_to_payment"),
        ],
    },
    CategoryDef {
        key: CategoryKey::B,
        weight: 15.0,
        checks: &[
            measured("free_preview"),
            measured("full_artifact_gated"),
            measured("watermarked_preview"),
            measured("t2preview_<=10s"),
        ],
    },
    CategoryDef {
        key: CategoryKey::C,
        weight: 10.0,
        checks: &[
            assumed_pass("price_<=49"),
            measured("refund_policy_visible"),
            assumed_fail("timeboxed_promo"),
            assumed_pass("transparent_pricing_page"),
        ],
    },
    CategoryDef {
        key: CategoryKey::D,
        weight: 10.0,
        checks: &[
            measured("social_proof"),
            measured("plain_privacy_tos"),
            assumed_fail("fast_support_channel"),
            assumed_fail("real_contact"),
            measured("basic_a11y"),
        ],
    },
    CategoryDef {
        key: CategoryKey::E,
        weight: 20.0,
        checks: &[
            assumed_fail("3_bofu_pages"),
            assumed_fail("bofu_search_ads_live"),
            assumed_fail("niche_community_plan"),
            assumed_fail("marketplace_listing"),
            measured("email_capture"),
            measured("schema_present"),
        ],
    },
    CategoryDef {
        key: CategoryKey::F,
        weight: 10.0,
        checks: &[
            measured("lcp_<2.5s"),
            measured("inp_<200ms"),
            measured("cls_<0.1"),
            measured("tap_target_min"),
            measured("mobile_friendly"),
        ],
    },
    CategoryDef {
        key: CategoryKey::G,
        weight: 10.0,
        checks: &[
            assumed_fail("abandon_cart_emails"),
            assumed_fail("referral_credit"),
            assumed_fail("retargeting_pixel"),
            assumed_fail("onboarding_emails"),
        ],
    },
    CategoryDef {
        key: CategoryKey::H,
        weight: 5.0,
        checks: &[
            assumed_fail("events_wired"),
            assumed_fail("ab_harness"),
            assumed_fail("kpi_dashboard"),
            assumed_fail("error_monitoring"),
        ],
    },
];

/// Look up a category definition
pub fn category(key: CategoryKey) -> &'static CategoryDef {
    // CATEGORIES is declared in CategoryKey order
    &CATEGORIES[key as usize]
}

/// Gate names, in evaluation order
pub const GATES: [&str; 5] = [
    "payments_on_mobile",
    "has_preview",
    "lcp_<4s",
    "refund_policy_visible",
    "events_wired",
];

/// Numeric thresholds for Core Web Vitals and tap targets
#[derive(Debug, Clone, Copy)]
pub struct Thresholds {
    /// LCP "good" cutoff, seconds
    pub lcp_good: f64,
    /// LCP "poor" cutoff, seconds
    pub lcp_poor: f64,
    /// INP "good" cutoff, milliseconds
    pub inp_good: f64,
    /// INP "poor" cutoff, milliseconds
    pub inp_poor: f64,
    /// CLS "good" cutoff, unitless
    pub cls_good: f64,
    /// CLS "poor" cutoff, unitless
    pub cls_poor: f64,
    /// Minimum tap target dimension, CSS pixels (WCAG 2.2)
    pub tap_target_min: f64,
    /// Comfortable tap target dimension, CSS pixels (iOS HIG / Material)
    pub tap_target_bonus: f64,
}

pub const THRESHOLDS: Thresholds = Thresholds {
    lcp_good: 2.5,
    lcp_poor: 4.0,
    inp_good: 200.0,
    inp_poor: 500.0,
    cls_good: 0.1,
    cls_poor: 0.25,
    tap_target_min: 24.0,
    tap_target_bonus: 44.0,
};

/// Fail-closed threshold comparison: a missing measurement never passes
pub fn below(value: Option<f64>, limit: f64) -> bool {
    matches!(value, Some(v) if v < limit)
}
