//! Scoring engine
//!
//! Pure function from a collected `MetricSnapshot` to a `ScoringResult`.
//! No I/O, deterministic for a given input, and never fails: missing data
//! manifests as failed checks (unknown does not pass), so an audit with
//! degraded sources completes with low scores instead of an error.
//!
//! Per category: evaluate the catalog's fixed ordered check list, then
//! `score = passed / (checks / weight)`, rounded to one decimal and
//! clamped to the category weight. LMS is the sum of category scores; RRI
//! and PMI are weighted blends of category fractions, rounded once at the
//! end rather than per term.

mod fixes;

use crate::spec::{self, CategoryKey, CheckDef, SignalKind, THRESHOLDS};
use crate::types::{
    CategoryScore, CheckResult, GateResult, MetricSnapshot, ScoringResult,
};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// Score a snapshot, stamped with the current time
pub fn compute_scores(input: &MetricSnapshot) -> ScoringResult {
    compute_scores_at(input, Utc::now())
}

/// Score a snapshot with an explicit timestamp
///
/// Identical input and timestamp yield an identical result.
pub fn compute_scores_at(input: &MetricSnapshot, timestamp: DateTime<Utc>) -> ScoringResult {
    let categories: BTreeMap<CategoryKey, CategoryScore> = CategoryKey::ALL
        .iter()
        .map(|&key| (key, score_category(key, input)))
        .collect();

    let lms: f64 = categories.values().map(|c| c.score).sum();

    let fraction = |key: CategoryKey| {
        let category = &categories[&key];
        category.score / category.max_score
    };

    let rri = 100.0
        * (0.35 * fraction(CategoryKey::A)
            + 0.25 * fraction(CategoryKey::B)
            + 0.20 * fraction(CategoryKey::C)
            + 0.20 * fraction(CategoryKey::G));

    let pmi = 100.0
        * (0.40 * fraction(CategoryKey::E)
            + 0.25 * fraction(CategoryKey::F)
            + 0.20 * fraction(CategoryKey::D)
            + 0.15 * fraction(CategoryKey::H));

    let gates = evaluate_gates(input, &categories);
    let top_fixes = fixes::top_fixes(&categories, &gates);

    ScoringResult {
        lms: round1(lms),
        rri: round1(rri),
        pmi: round1(pmi),
        categories,
        gates,
        top_fixes,
        timestamp,
    }
}

fn score_category(key: CategoryKey, input: &MetricSnapshot) -> CategoryScore {
    let def = spec::category(key);

    let checks: Vec<CheckResult> = def
        .checks
        .iter()
        .map(|check| CheckResult {
            name: check.name.to_string(),
            passed: evaluate_check(check, input),
        })
        .collect();

    let passed = checks.iter().filter(|c| c.passed).count();
    let score = round1(passed as f64 / def.checks_per_point()).min(def.weight);

    let evidence = evidence_for(key, input, &checks);

    CategoryScore {
        category: key,
        score,
        max_score: def.weight,
        checks,
        evidence,
    }
}

fn evaluate_check(check: &CheckDef, input: &MetricSnapshot) -> bool {
    match check.kind {
        SignalKind::AssumedPass => true,
        SignalKind::AssumedFail => false,
        SignalKind::Measured => evaluate_measured(check.name, input),
    }
}

/// Outcome of one measured check against the snapshot
///
/// `Option`-valued inputs fail closed: a source that produced no value
/// fails every check that needs it.
fn evaluate_measured(name: &str, input: &MetricSnapshot) -> bool {
    let browser = &input.browser;
    let pagespeed = &input.pagespeed;

    match name {
        "one_page_flow" => matches!(browser.clicks_to_pay, Some(n) if n <= 1),
        "guest_checkout" => browser.guest_checkout_available,
        "wallets_visible" => browser.wallets_visible,
        "single_cta_above_fold" => browser.single_cta_above_fold,
        "<=2_clicks_to_payment" => matches!(browser.clicks_to_pay, Some(n) if n <= 2),

        "free_preview" => browser.preview_present,
        "full_artifact_gated" => browser.preview_gated,
        "watermarked_preview" => browser.preview_present && browser.preview_gated,
        // No independent timing measurement; a present preview is assumed fast
        "t2preview_<=10s" => browser.preview_present,

        "refund_policy_visible" => browser.refund_policy_visible,

        "social_proof" => browser.social_proof_present,
        "plain_privacy_tos" => browser.privacy_tos_visible,
        "basic_a11y" => matches!(pagespeed.accessibility_score, Some(s) if s >= 80.0),

        "email_capture" => browser.email_capture_present,
        "schema_present" => browser.schema_present,

        "lcp_<2.5s" => spec::below(pagespeed.lcp, THRESHOLDS.lcp_good),
        "inp_<200ms" => spec::below(pagespeed.inp, THRESHOLDS.inp_good),
        "cls_<0.1" => spec::below(pagespeed.cls, THRESHOLDS.cls_good),
        "tap_target_min" => browser.tap_targets_passed,
        "mobile_friendly" => browser.mobile_responsive,

        other => {
            tracing::warn!(check = other, "Unmapped measured check treated as failed");
            false
        }
    }
}

fn evidence_for(key: CategoryKey, input: &MetricSnapshot, checks: &[CheckResult]) -> Vec<String> {
    let passed = |name: &str| {
        checks
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.passed)
            .unwrap_or(false)
    };
    let yes_no = |value: bool| if value { "Yes" } else { "No" };
    let browser = &input.browser;
    let pagespeed = &input.pagespeed;

    match key {
        CategoryKey::A => vec![
            format!(
                "Clicks to payment: {}",
                browser
                    .clicks_to_pay
                    .map(|n| n.to_string())
                    .unwrap_or_else(|| "Unknown".to_string())
            ),
            format!(
                "Guest checkout: {}",
                if passed("guest_checkout") { "Available" } else { "Not found" }
            ),
            format!("Wallets visible: {}", yes_no(passed("wallets_visible"))),
            format!(
                "Single CTA above fold: {}",
                yes_no(passed("single_cta_above_fold"))
            ),
        ],
        CategoryKey::B => vec![
            format!("Preview present: {}", yes_no(passed("free_preview"))),
            format!("Gated content: {}", yes_no(passed("full_artifact_gated"))),
        ],
        CategoryKey::C => vec![
            format!(
                "Refund policy visible: {}",
                yes_no(passed("refund_policy_visible"))
            ),
            format!(
                "Transparent pricing: {}",
                yes_no(passed("transparent_pricing_page"))
            ),
        ],
        CategoryKey::D => vec![
            format!(
                "Social proof: {}",
                if passed("social_proof") { "Present" } else { "Missing" }
            ),
            format!("Privacy/ToS visible: {}", yes_no(passed("plain_privacy_tos"))),
            format!(
                "Accessibility score: {}",
                pagespeed
                    .accessibility_score
                    .map(|s| format!("{s:.0}"))
                    .unwrap_or_else(|| "N/A".to_string())
            ),
        ],
        CategoryKey::E => vec![
            format!(
                "Email capture: {}",
                if passed("email_capture") { "Present" } else { "Missing" }
            ),
            format!(
                "Schema markup: {}",
                if passed("schema_present") { "Present" } else { "Missing" }
            ),
        ],
        CategoryKey::F => {
            let mut evidence = vec![
                format!(
                    "LCP: {}",
                    pagespeed
                        .lcp
                        .map(|v| format!("{v:.2}s"))
                        .unwrap_or_else(|| "N/A".to_string())
                ),
                format!(
                    "INP: {}",
                    pagespeed
                        .inp
                        .map(|v| format!("{v:.0}ms"))
                        .unwrap_or_else(|| "N/A".to_string())
                ),
                format!(
                    "CLS: {}",
                    pagespeed
                        .cls
                        .map(|v| format!("{v:.3}"))
                        .unwrap_or_else(|| "N/A".to_string())
                ),
                format!(
                    "Tap targets: {}",
                    if passed("tap_target_min") { "Passed" } else { "Failed" }
                ),
                format!("Mobile responsive: {}", yes_no(passed("mobile_friendly"))),
            ];
            evidence.extend(field_data_evidence(input));
            evidence
        }
        CategoryKey::G => vec![
            "Lifecycle checks require manual verification or snippet integration".to_string(),
        ],
        CategoryKey::H => vec![
            "Analytics checks require manual verification or snippet integration".to_string(),
        ],
    }
}

/// Informational field-data lines for the performance category
///
/// An ineligible CrUX record carries its reason; that wording is kept so
/// "not enough traffic" never reads as a transport failure.
fn field_data_evidence(input: &MetricSnapshot) -> Vec<String> {
    let crux = &input.crux;

    if !crux.eligible {
        let reason = crux
            .error
            .as_deref()
            .unwrap_or("not available")
            .to_string();
        return vec![format!("Field data: {reason}")];
    }

    let mut lines = Vec::new();
    if let Some(p75) = crux.lcp.p75 {
        lines.push(format!("Field LCP p75: {:.2}s", p75 / 1000.0));
    }
    if let Some(p75) = crux.inp.p75 {
        lines.push(format!("Field INP p75: {p75:.0}ms"));
    }
    if let Some(p75) = crux.cls.p75 {
        lines.push(format!("Field CLS p75: {p75:.3}"));
    }
    lines
}

fn evaluate_gates(
    input: &MetricSnapshot,
    categories: &BTreeMap<CategoryKey, CategoryScore>,
) -> Vec<GateResult> {
    let browser = &input.browser;
    let clicks_ok = matches!(browser.clicks_to_pay, Some(n) if n <= 3);
    let events_wired = categories
        .get(&CategoryKey::H)
        .and_then(|c| c.check("events_wired"))
        .unwrap_or(false);

    let gate = |name: &str, passed: bool| GateResult {
        name: name.to_string(),
        passed,
    };

    vec![
        gate("payments_on_mobile", browser.wallets_visible || clicks_ok),
        gate("has_preview", browser.preview_present),
        gate("lcp_<4s", spec::below(input.pagespeed.lcp, THRESHOLDS.lcp_poor)),
        gate("refund_policy_visible", browser.refund_policy_visible),
        gate("events_wired", events_wired),
    ]
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BrowserCheckResult, CruxResult, MetricDistribution, PageSpeedResult};

    fn empty_snapshot() -> MetricSnapshot {
        MetricSnapshot {
            url: "https://example.com".to_string(),
            pagespeed: PageSpeedResult::unavailable("network error"),
            crux: CruxResult::ineligible("CrUX data not available (insufficient traffic)"),
            browser: BrowserCheckResult::unavailable("navigation timed out"),
        }
    }

    fn strong_snapshot() -> MetricSnapshot {
        MetricSnapshot {
            url: "https://example.com".to_string(),
            pagespeed: PageSpeedResult {
                lcp: Some(1.8),
                inp: Some(120.0),
                cls: Some(0.05),
                performance_score: Some(92.0),
                accessibility_score: Some(88.0),
                best_practices_score: Some(100.0),
                seo_score: Some(90.0),
                opportunities: vec![],
                error: None,
            },
            crux: CruxResult {
                lcp: MetricDistribution {
                    p75: Some(2100.0),
                    good: Some(0.8),
                    needs_improvement: Some(0.15),
                    poor: Some(0.05),
                },
                inp: MetricDistribution {
                    p75: Some(160.0),
                    good: Some(0.85),
                    needs_improvement: Some(0.1),
                    poor: Some(0.05),
                },
                cls: MetricDistribution {
                    p75: Some(0.04),
                    good: Some(0.9),
                    needs_improvement: Some(0.07),
                    poor: Some(0.03),
                },
                eligible: true,
                error: None,
            },
            browser: BrowserCheckResult {
                clicks_to_pay: Some(1),
                guest_checkout_available: true,
                wallets_visible: true,
                single_cta_above_fold: true,
                preview_present: true,
                preview_gated: true,
                refund_policy_visible: true,
                privacy_tos_visible: true,
                social_proof_present: true,
                tap_targets_passed: true,
                mobile_responsive: true,
                schema_present: true,
                email_capture_present: true,
                error: None,
            },
        }
    }

    fn timestamp() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2025-06-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn test_lms_is_sum_of_category_scores() {
        let result = compute_scores_at(&strong_snapshot(), timestamp());
        let sum: f64 = result.categories.values().map(|c| c.score).sum();
        assert_eq!(result.lms, round1(sum));
        assert!(result.lms >= 0.0 && result.lms <= 100.0);
    }

    #[test]
    fn test_category_scores_within_bounds() {
        for snapshot in [empty_snapshot(), strong_snapshot()] {
            let result = compute_scores_at(&snapshot, timestamp());
            for category in result.categories.values() {
                assert!(
                    category.score >= 0.0 && category.score <= category.max_score,
                    "{} out of bounds: {}",
                    category.category,
                    category.score
                );
            }
        }
    }

    #[test]
    fn test_indices_within_bounds() {
        for snapshot in [empty_snapshot(), strong_snapshot()] {
            let result = compute_scores_at(&snapshot, timestamp());
            assert!(result.rri >= 0.0 && result.rri <= 100.0);
            assert!(result.pmi >= 0.0 && result.pmi <= 100.0);
        }
    }

    #[test]
    fn test_all_sources_failed_still_scores() {
        let result = compute_scores_at(&empty_snapshot(), timestamp());

        // Only the two assumed-pass placeholders in C contribute:
        // 2 passed / (4 checks / 10 points) = 5.0
        assert_eq!(result.categories[&CategoryKey::C].score, 5.0);
        assert_eq!(result.lms, 5.0);
        assert_eq!(result.categories[&CategoryKey::A].score, 0.0);
        assert_eq!(result.categories[&CategoryKey::F].score, 0.0);
    }

    #[test]
    fn test_idempotent_for_identical_input() {
        let snapshot = strong_snapshot();
        let first = compute_scores_at(&snapshot, timestamp());
        let second = compute_scores_at(&snapshot, timestamp());

        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }

    #[test]
    fn test_category_f_max_scenario() {
        // LCP 1.8s, INP 120ms, CLS 0.05, tap targets pass, responsive:
        // all 5 checks pass, checksPerPoint = 5/10 = 0.5, score = 10
        let mut snapshot = empty_snapshot();
        snapshot.pagespeed = PageSpeedResult {
            lcp: Some(1.8),
            inp: Some(120.0),
            cls: Some(0.05),
            ..Default::default()
        };
        snapshot.browser.tap_targets_passed = true;
        snapshot.browser.mobile_responsive = true;

        let result = compute_scores_at(&snapshot, timestamp());
        let f = &result.categories[&CategoryKey::F];
        assert_eq!(f.score, 10.0);
        assert_eq!(f.max_score, 10.0);
        assert!(f.checks.iter().all(|c| c.passed));
    }

    #[test]
    fn test_missing_lcp_fails_gate_and_checks() {
        let result = compute_scores_at(&empty_snapshot(), timestamp());

        assert_eq!(result.gate("lcp_<4s"), Some(false));
        assert_eq!(
            result.categories[&CategoryKey::F].check("lcp_<2.5s"),
            Some(false)
        );
    }

    #[test]
    fn test_boundary_values_fail_strict_thresholds() {
        let mut snapshot = empty_snapshot();
        snapshot.pagespeed.lcp = Some(2.5);
        snapshot.pagespeed.inp = Some(200.0);
        snapshot.pagespeed.cls = Some(0.1);

        let result = compute_scores_at(&snapshot, timestamp());
        let f = &result.categories[&CategoryKey::F];
        assert_eq!(f.check("lcp_<2.5s"), Some(false));
        assert_eq!(f.check("inp_<200ms"), Some(false));
        assert_eq!(f.check("cls_<0.1"), Some(false));
    }

    #[test]
    fn test_watermarked_preview_derived_from_preview_and_gate() {
        let mut snapshot = empty_snapshot();
        snapshot.browser.preview_present = true;
        snapshot.browser.preview_gated = false;

        let result = compute_scores_at(&snapshot, timestamp());
        let b = &result.categories[&CategoryKey::B];
        assert_eq!(b.check("free_preview"), Some(true));
        assert_eq!(b.check("watermarked_preview"), Some(false));
        // Fast preview is assumed whenever a preview exists
        assert_eq!(b.check("t2preview_<=10s"), Some(true));
    }

    #[test]
    fn test_one_page_flow_requires_single_click() {
        let mut snapshot = empty_snapshot();
        snapshot.browser.clicks_to_pay = Some(2);

        let result = compute_scores_at(&snapshot, timestamp());
        let a = &result.categories[&CategoryKey::A];
        assert_eq!(a.check("one_page_flow"), Some(false));
        assert_eq!(a.check("<=2_clicks_to_payment"), Some(true));
    }

    #[test]
    fn test_unknown_clicks_fail_both_click_checks() {
        let result = compute_scores_at(&empty_snapshot(), timestamp());
        let a = &result.categories[&CategoryKey::A];
        assert_eq!(a.check("one_page_flow"), Some(false));
        assert_eq!(a.check("<=2_clicks_to_payment"), Some(false));
    }

    #[test]
    fn test_basic_a11y_threshold() {
        let mut snapshot = empty_snapshot();
        snapshot.pagespeed.accessibility_score = Some(80.0);
        let result = compute_scores_at(&snapshot, timestamp());
        assert_eq!(
            result.categories[&CategoryKey::D].check("basic_a11y"),
            Some(true)
        );

        snapshot.pagespeed.accessibility_score = Some(79.0);
        let result = compute_scores_at(&snapshot, timestamp());
        assert_eq!(
            result.categories[&CategoryKey::D].check("basic_a11y"),
            Some(false)
        );
    }

    #[test]
    fn test_payments_gate_passes_via_clicks_without_wallets() {
        let mut snapshot = empty_snapshot();
        snapshot.browser.wallets_visible = false;
        snapshot.browser.clicks_to_pay = Some(3);

        let result = compute_scores_at(&snapshot, timestamp());
        assert_eq!(result.gate("payments_on_mobile"), Some(true));
    }

    #[test]
    fn test_payments_gate_fails_closed_on_unknown_clicks() {
        let result = compute_scores_at(&empty_snapshot(), timestamp());
        assert_eq!(result.gate("payments_on_mobile"), Some(false));
    }

    #[test]
    fn test_gate_names_match_catalog_order() {
        let result = compute_scores_at(&empty_snapshot(), timestamp());
        let names: Vec<&str> = result.gates.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, spec::GATES);
    }

    #[test]
    fn test_events_wired_gate_follows_category_h() {
        let result = compute_scores_at(&strong_snapshot(), timestamp());
        assert_eq!(
            result.gate("events_wired"),
            result.categories[&CategoryKey::H].check("events_wired")
        );
    }

    #[test]
    fn test_check_order_matches_catalog() {
        let result = compute_scores_at(&strong_snapshot(), timestamp());
        for def in &spec::CATEGORIES {
            let scored = &result.categories[&def.key];
            let names: Vec<&str> = scored.checks.iter().map(|c| c.name.as_str()).collect();
            let expected: Vec<&str> = def.checks.iter().map(|c| c.name).collect();
            assert_eq!(names, expected, "check order drifted in {}", def.key);
        }
    }

    #[test]
    fn test_evidence_reports_raw_values() {
        let result = compute_scores_at(&strong_snapshot(), timestamp());

        let f = &result.categories[&CategoryKey::F];
        assert!(f.evidence.contains(&"LCP: 1.80s".to_string()));
        assert!(f.evidence.contains(&"INP: 120ms".to_string()));
        assert!(f.evidence.contains(&"Field LCP p75: 2.10s".to_string()));

        let a = &result.categories[&CategoryKey::A];
        assert!(a.evidence.contains(&"Clicks to payment: 1".to_string()));
    }

    #[test]
    fn test_evidence_distinguishes_ineligible_field_data() {
        let result = compute_scores_at(&empty_snapshot(), timestamp());
        let f = &result.categories[&CategoryKey::F];

        assert!(f
            .evidence
            .iter()
            .any(|line| line.contains("insufficient traffic")));
        assert!(f.evidence.contains(&"LCP: N/A".to_string()));
    }

    #[test]
    fn test_perfect_snapshot_rri_reflects_capped_g() {
        let result = compute_scores_at(&strong_snapshot(), timestamp());

        // A, B full; C at 7.5/10 (timeboxed_promo has no detector);
        // G capped at zero: RRI = 100*(0.35 + 0.25 + 0.20*0.75 + 0) = 75.0
        assert_eq!(result.categories[&CategoryKey::A].score, 20.0);
        assert_eq!(result.categories[&CategoryKey::B].score, 15.0);
        assert_eq!(result.categories[&CategoryKey::C].score, 7.5);
        assert_eq!(result.categories[&CategoryKey::G].score, 0.0);
        assert_eq!(result.rri, 75.0);
    }

    #[test]
    fn test_perfect_snapshot_pmi() {
        let result = compute_scores_at(&strong_snapshot(), timestamp());

        // E: 2 of 6 checks have detectors -> 6.7; F full; D: 3 of 5 real
        // checks pass plus nothing assumed -> 6.0; H capped at zero.
        // PMI = 100*(0.40*6.7/20 + 0.25*1.0 + 0.20*0.6 + 0) = 50.4
        assert_eq!(result.categories[&CategoryKey::E].score, 6.7);
        assert_eq!(result.categories[&CategoryKey::F].score, 10.0);
        assert_eq!(result.categories[&CategoryKey::D].score, 6.0);
        assert_eq!(result.pmi, 50.4);
    }

    #[test]
    fn test_round1() {
        assert_eq!(round1(6.66), 6.7);
        assert_eq!(round1(6.64), 6.6);
        assert_eq!(round1(10.0), 10.0);
    }
}
