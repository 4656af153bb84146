//! Prioritized fix derivation
//!
//! Failed gates produce priority-1 fixes, a fixed set of category check
//! failures priority 2, softer improvements priority 3. The candidate list
//! is declared in priority order and stable-sorted, so ties keep their
//! declaration order; the result is capped at five entries.

use crate::spec::CategoryKey;
use crate::types::{CategoryScore, GateResult};
use std::collections::BTreeMap;

const MAX_FIXES: usize = 5;

pub(crate) fn top_fixes(
    categories: &BTreeMap<CategoryKey, CategoryScore>,
    gates: &[GateResult],
) -> Vec<String> {
    let gate_failed = |name: &str| gates.iter().any(|g| g.name == name && !g.passed);
    let check_failed = |key: CategoryKey, name: &str| {
        categories
            .get(&key)
            .and_then(|c| c.check(name))
            .map(|passed| !passed)
            .unwrap_or(false)
    };

    let mut candidates: Vec<(u8, &str)> = Vec::new();

    // Gate failures are highest priority
    if gate_failed("payments_on_mobile") {
        candidates.push((1, "Enable mobile payments (Apple Pay / Google Pay)"));
    }
    if gate_failed("has_preview") {
        candidates.push((1, "Add a free preview or demo of your product"));
    }
    if gate_failed("lcp_<4s") {
        candidates.push((1, "Improve page load speed (LCP > 4s is critical)"));
    }
    if gate_failed("refund_policy_visible") {
        candidates.push((1, "Display refund policy prominently"));
    }

    // Category-specific fixes
    if check_failed(CategoryKey::A, "wallets_visible") {
        candidates.push((2, "Add wallet buttons (Apple Pay / Google Pay) to checkout"));
    }
    if check_failed(CategoryKey::A, "guest_checkout") {
        candidates.push((2, "Enable guest checkout (no account required)"));
    }
    if check_failed(CategoryKey::F, "lcp_<2.5s") {
        candidates.push((2, "Optimize Largest Contentful Paint (target < 2.5s)"));
    }
    if check_failed(CategoryKey::F, "inp_<200ms") {
        candidates.push((2, "Improve Interaction to Next Paint (target < 200ms)"));
    }
    if check_failed(CategoryKey::D, "social_proof") {
        candidates.push((3, "Add testimonials or customer logos"));
    }
    if check_failed(CategoryKey::E, "schema_present") {
        candidates.push((3, "Add structured data (Schema.org markup)"));
    }

    // sort_by_key is stable; declaration order survives within a tier
    candidates.sort_by_key(|(priority, _)| *priority);

    candidates
        .into_iter()
        .take(MAX_FIXES)
        .map(|(_, fix)| fix.to_string())
        .collect()
}
