//! Headless-browser check suite
//!
//! Launches an isolated mobile-emulated Chromium session per call,
//! navigates to the URL, and runs the ~13 page checks concurrently. The
//! checks are deliberately heuristic: English phrase lists and selector
//! scans, not semantic understanding of the page. Every check catches its
//! own failure and defaults to `false`/`None` so one fragile check cannot
//! blank the other twelve. `run` itself never fails: a session that
//! produces no usable page comes back as an all-false record with `error`
//! set.
//!
//! The Chromium process is torn down on every exit path. A leaked browser
//! process under sustained audit load is a defect.

use crate::spec::THRESHOLDS;
use crate::types::BrowserCheckResult;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::handler::viewport::Viewport;
use chromiumoxide::Page;
use futures::StreamExt;
use std::time::Duration;
use thiserror::Error;

const MOBILE_USER_AGENT: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 16_0 like Mac OS X) \
     AppleWebKit/605.1.15 (KHTML, like Gecko) Version/16.0 Mobile/15E148 Safari/604.1";
const VIEWPORT_WIDTH: u32 = 375;
const VIEWPORT_HEIGHT: u32 = 667;
const DEVICE_SCALE_FACTOR: f64 = 2.0;

const NAVIGATION_TIMEOUT: Duration = Duration::from_secs(30);
/// Stands in for a network-idle signal after the load event
const SETTLE_DELAY: Duration = Duration::from_secs(2);
/// Wait after a simulated click before inspecting the page
const CLICK_SETTLE: Duration = Duration::from_secs(2);
/// Upper bound for any single in-page evaluation
const CHECK_TIMEOUT: Duration = Duration::from_secs(10);

const GUEST_CHECKOUT_PHRASES: [&str; 4] = [
    "guest checkout",
    "continue as guest",
    "checkout without account",
    "skip registration",
];
const PREVIEW_PHRASES: [&str; 5] = ["preview", "demo", "try it", "sample", "free trial"];
const GATE_PHRASES: [&str; 5] = [
    "unlock",
    "upgrade to download",
    "premium",
    "pro version",
    "full access",
];
const SOCIAL_PROOF_PHRASES: [&str; 5] =
    ["testimonial", "review", "customer", "trusted by", "used by"];

/// Browser session errors
#[derive(Debug, Error)]
pub enum BrowserCheckError {
    #[error("Browser launch failed: {0}")]
    LaunchFailed(String),

    #[error("Browser session error: {0}")]
    SessionError(String),

    #[error("Navigation failed: {0}")]
    NavigationFailed(String),

    #[error("Navigation timed out after {0}s")]
    NavigationTimeout(u64),
}

/// Headless-browser check runner
///
/// Stateless; each `run` call owns its session from launch to teardown.
#[derive(Debug, Clone, Copy, Default)]
pub struct BrowserCheckRunner;

impl BrowserCheckRunner {
    pub fn new() -> Self {
        Self
    }

    /// Run the full check suite against `url`, degrading every failure
    /// into the record
    pub async fn run(&self, url: &str) -> BrowserCheckResult {
        match self.run_session(url).await {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "Browser check session failed");
                BrowserCheckResult::unavailable(e.to_string())
            }
        }
    }

    async fn run_session(&self, url: &str) -> Result<BrowserCheckResult, BrowserCheckError> {
        let viewport = Viewport {
            width: VIEWPORT_WIDTH,
            height: VIEWPORT_HEIGHT,
            device_scale_factor: Some(DEVICE_SCALE_FACTOR),
            emulating_mobile: true,
            is_landscape: false,
            has_touch: true,
        };

        let config = BrowserConfig::builder()
            .no_sandbox()
            .viewport(viewport)
            .build()
            .map_err(BrowserCheckError::LaunchFailed)?;

        let (mut browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| BrowserCheckError::LaunchFailed(e.to_string()))?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        tracing::debug!(url = %url, "Browser session started");

        let outcome = collect_checks(&browser, url).await;

        // Teardown runs on success and failure alike
        if let Err(e) = browser.close().await {
            tracing::warn!(error = %e, "Browser close failed");
        }
        let _ = browser.wait().await;
        handler_task.abort();

        outcome
    }
}

async fn collect_checks(
    browser: &Browser,
    url: &str,
) -> Result<BrowserCheckResult, BrowserCheckError> {
    let page = browser
        .new_page("about:blank")
        .await
        .map_err(|e| BrowserCheckError::SessionError(e.to_string()))?;

    page.set_user_agent(MOBILE_USER_AGENT)
        .await
        .map_err(|e| BrowserCheckError::SessionError(e.to_string()))?;

    let navigation = async {
        page.goto(url).await?;
        page.wait_for_navigation().await?;
        Ok::<(), chromiumoxide::error::CdpError>(())
    };

    tokio::time::timeout(NAVIGATION_TIMEOUT, navigation)
        .await
        .map_err(|_| BrowserCheckError::NavigationTimeout(NAVIGATION_TIMEOUT.as_secs()))?
        .map_err(|e| BrowserCheckError::NavigationFailed(e.to_string()))?;

    tokio::time::sleep(SETTLE_DELAY).await;

    let (
        guest_checkout_available,
        wallets_visible,
        single_cta_above_fold,
        preview_present,
        preview_gated,
        refund_policy_visible,
        privacy_tos_visible,
        social_proof_present,
        tap_targets_passed,
        mobile_responsive,
        schema_present,
        email_capture_present,
        clicks_to_pay,
    ) = tokio::join!(
        text_contains_any(&page, &GUEST_CHECKOUT_PHRASES),
        check_wallets(&page),
        check_single_cta(&page),
        text_contains_any(&page, &PREVIEW_PHRASES),
        text_contains_any(&page, &GATE_PHRASES),
        check_refund_policy(&page),
        check_privacy_tos(&page),
        text_contains_any(&page, &SOCIAL_PROOF_PHRASES),
        check_tap_targets(&page),
        check_mobile_responsive(&page),
        check_schema(&page),
        check_email_capture(&page),
        check_clicks_to_pay(&page),
    );

    tracing::info!(
        url = %url,
        clicks_to_pay = ?clicks_to_pay,
        wallets_visible,
        mobile_responsive,
        "Browser checks complete"
    );

    Ok(BrowserCheckResult {
        clicks_to_pay,
        guest_checkout_available,
        wallets_visible,
        single_cta_above_fold,
        preview_present,
        preview_gated,
        refund_policy_visible,
        privacy_tos_visible,
        social_proof_present,
        tap_targets_passed,
        mobile_responsive,
        schema_present,
        email_capture_present,
        error: None,
    })
}

/// Evaluate `expr` on the page, defaulting to `None` on any failure
async fn eval<T: serde::de::DeserializeOwned>(page: &Page, expr: &str) -> Option<T> {
    let evaluation = tokio::time::timeout(CHECK_TIMEOUT, page.evaluate(expr))
        .await
        .ok()?
        .ok()?;
    evaluation.into_value::<T>().ok()
}

/// Lowercased visible page text, `None` when the page has no body
async fn page_text(page: &Page) -> Option<String> {
    eval(
        page,
        "document.body ? document.body.innerText.toLowerCase() : ''",
    )
    .await
}

/// Case-insensitive phrase match against the visible page text
async fn text_contains_any(page: &Page, phrases: &[&str]) -> bool {
    match page_text(page).await {
        Some(text) => phrases.iter().any(|phrase| text.contains(phrase)),
        None => false,
    }
}

/// Click through to a payment context, counting clicks
///
/// Best-effort heuristic: scans an ordered candidate list for a primary
/// CTA, clicks it, and looks for payment keywords in the URL or page text;
/// one follow-up click on a Continue/Next/Checkout control is allowed.
/// Returns the click count (1 or 2) when a payment context is reached,
/// `None` otherwise. Pattern-matched CTAs can hit unrelated controls
/// ("Try" in a nav link); callers treat the result as a signal, not proof.
async fn check_clicks_to_pay(page: &Page) -> Option<u32> {
    const FIND_AND_CLICK_CTA: &str = r#"(() => {
        const patterns = [/\bbuy\b/i, /get started/i, /\btry\b/i, /purchase/i];
        const candidates = [];
        for (const el of document.querySelectorAll('button, a')) {
            const text = (el.innerText || '').trim();
            if (text && patterns.some(p => p.test(text))) candidates.push(el);
        }
        const direct = document.querySelector('[data-testid*="cta"], .cta-button, #cta');
        if (direct) candidates.push(direct);
        const visible = candidates.find(el => el.offsetWidth > 0 && el.offsetHeight > 0);
        if (!visible) return false;
        visible.click();
        return true;
    })()"#;

    const FIND_AND_CLICK_CONTINUE: &str = r#"(() => {
        for (const el of document.querySelectorAll('button')) {
            const text = (el.innerText || '').trim().toLowerCase();
            if ((text.includes('continue') || text.includes('next') || text.includes('checkout'))
                && el.offsetWidth > 0 && el.offsetHeight > 0) {
                el.click();
                return true;
            }
        }
        return false;
    })()"#;

    let clicked: bool = eval(page, FIND_AND_CLICK_CTA).await?;
    if !clicked {
        return None;
    }

    tokio::time::sleep(CLICK_SETTLE).await;
    if payment_context_reached(page).await {
        return Some(1);
    }

    let continued: bool = eval(page, FIND_AND_CLICK_CONTINUE).await.unwrap_or(false);
    if !continued {
        return None;
    }

    tokio::time::sleep(CLICK_SETTLE).await;
    if payment_context_reached(page).await {
        return Some(2);
    }

    None
}

async fn payment_context_reached(page: &Page) -> bool {
    const PAYMENT_CONTEXT: &str = r#"(() => {
        const indicators = ['stripe', 'checkout', 'payment', 'cart', '/pay',
                            'paypal', 'apple pay', 'google pay'];
        const url = location.href.toLowerCase();
        const text = document.body ? document.body.innerText.toLowerCase() : '';
        return indicators.some(i => url.includes(i) || text.includes(i));
    })()"#;

    eval(page, PAYMENT_CONTEXT).await.unwrap_or(false)
}

/// Wallet buttons in the DOM, or Payment Request API support as fallback
async fn check_wallets(page: &Page) -> bool {
    const WALLETS: &str = r#"(() => {
        const selectors = ['[aria-label*="Apple Pay"]', '[aria-label*="Google Pay"]',
                           '.apple-pay-button', '.google-pay-button',
                           '[data-testid*="apple-pay"]', '[data-testid*="google-pay"]'];
        for (const s of selectors) {
            const el = document.querySelector(s);
            if (el && el.offsetWidth > 0 && el.offsetHeight > 0) return true;
        }
        for (const el of document.querySelectorAll('button')) {
            const text = (el.innerText || '').toLowerCase();
            if ((text.includes('apple pay') || text.includes('google pay'))
                && el.offsetWidth > 0) return true;
        }
        return typeof window.PaymentRequest !== 'undefined';
    })()"#;

    eval(page, WALLETS).await.unwrap_or(false)
}

/// Exactly one buy/signup control within the first viewport height
async fn check_single_cta(page: &Page) -> bool {
    let script = format!(
        r#"(() => {{
            const viewportHeight = {VIEWPORT_HEIGHT};
            const pattern = /buy|get started|try|purchase|sign up/i;
            let count = 0;
            for (const el of document.querySelectorAll(
                    'button, a[href*="buy"], a[href*="get-started"], a[href*="try"]')) {{
                const rect = el.getBoundingClientRect();
                if (rect.top < viewportHeight && pattern.test(el.innerText || '')) count++;
            }}
            return count === 1;
        }})()"#
    );

    eval(page, &script).await.unwrap_or(false)
}

async fn check_refund_policy(page: &Page) -> bool {
    const REFUND: &str = r#"(() => {
        for (const el of document.querySelectorAll('[href*="refund"], [href*="money-back"]')) {
            if (el.offsetWidth > 0 && el.offsetHeight > 0) return true;
        }
        for (const el of document.querySelectorAll('a')) {
            const text = (el.innerText || '').toLowerCase();
            if ((text.includes('refund') || text.includes('money back')) && el.offsetWidth > 0)
                return true;
        }
        const body = document.body ? document.body.innerText.toLowerCase() : '';
        return /refund policy|money.back guarantee|30.day refund/.test(body);
    })()"#;

    eval(page, REFUND).await.unwrap_or(false)
}

async fn check_privacy_tos(page: &Page) -> bool {
    const PRIVACY_TOS: &str = r#"(() => {
        for (const el of document.querySelectorAll('[href*="privacy"], [href*="terms"]')) {
            if (el.offsetWidth > 0 && el.offsetHeight > 0) return true;
        }
        for (const el of document.querySelectorAll('a')) {
            const text = (el.innerText || '').toLowerCase();
            if ((text.includes('privacy') || text.includes('terms')) && el.offsetWidth > 0)
                return true;
        }
        return false;
    })()"#;

    eval(page, PRIVACY_TOS).await.unwrap_or(false)
}

/// Sample the first 20 interactive elements; pass when fewer than 20%
/// measure under the minimum tap dimension
async fn check_tap_targets(page: &Page) -> bool {
    let script = format!(
        r#"(() => {{
            const min = {min};
            const elements = Array.from(document.querySelectorAll('button, a')).slice(0, 20);
            let failed = 0, total = 0;
            for (const el of elements) {{
                const rect = el.getBoundingClientRect();
                if (rect.width > 0 || rect.height > 0) {{
                    total++;
                    if (rect.width < min || rect.height < min) failed++;
                }}
            }}
            return total > 0 && failed / total < 0.2;
        }})()"#,
        min = THRESHOLDS.tap_target_min
    );

    eval(page, &script).await.unwrap_or(false)
}

/// Viewport meta present and no horizontal overflow
async fn check_mobile_responsive(page: &Page) -> bool {
    const MOBILE_RESPONSIVE: &str = r#"(() => {
        const hasViewportMeta = document.querySelector('meta[name="viewport"]') !== null;
        const overflows = document.body
            ? document.body.scrollWidth > window.innerWidth
            : false;
        return hasViewportMeta && !overflows;
    })()"#;

    eval(page, MOBILE_RESPONSIVE).await.unwrap_or(false)
}

async fn check_schema(page: &Page) -> bool {
    eval(
        page,
        r#"document.querySelectorAll('script[type="application/ld+json"]').length > 0"#,
    )
    .await
    .unwrap_or(false)
}

async fn check_email_capture(page: &Page) -> bool {
    eval(
        page,
        r#"document.querySelector('input[type="email"]') !== null"#,
    )
    .await
    .unwrap_or(false)
}
