//! Page navigation and lazy-content triggering
//!
//! Drives the browser to a target URL, waits for the load to settle within
//! the configured bound, then scrolls progressively to force lazy-loaded
//! sections to render.

use crate::{snapshot, Result, SiftError};
use chromiumoxide::browser::Browser;
use chromiumoxide::Page;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// No new resource fetches for this long counts as network quiescence
const QUIESCENCE_WINDOW_MS: u64 = 500;
/// How often the quiescence wait re-checks the resource count
const QUIESCENCE_POLL_MS: u64 = 100;
/// Hard bound on the quiescence wait; pages that keep polling never go idle
const QUIESCENCE_CAP_MS: u64 = 10_000;

/// One rendered document inside one browser instance.
///
/// Owned by the pipeline for the lifetime of a single request; the document
/// (and any mutation listener installed on it) is discarded when the
/// browser closes.
pub struct PageSession {
    page: Page,
    url: Url,
    title: Option<String>,
    description: Option<String>,
}

impl PageSession {
    pub fn page(&self) -> &Page {
        &self.page
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }
}

/// Navigate to `url` and return a session over the rendered document.
///
/// Navigation and the load wait share one `timeout` bound (default 90s at
/// the pipeline level); exceeding it fails the request. The scroll step is
/// best-effort and never fails the pipeline.
pub async fn render(browser: &Browser, url: &Url, timeout: Duration) -> Result<PageSession> {
    debug!("Navigating to {}", url);

    let navigate = async {
        let page = browser
            .new_page(url.as_str())
            .await
            .map_err(|e| SiftError::Navigation(e.to_string()))?;
        page.wait_for_navigation()
            .await
            .map_err(|e| SiftError::Navigation(e.to_string()))?;
        wait_for_quiescence(&page).await?;
        Ok::<Page, SiftError>(page)
    };

    let page = tokio::time::timeout(timeout, navigate)
        .await
        .map_err(|_| SiftError::NavigationTimeout {
            url: url.to_string(),
            timeout_ms: timeout.as_millis() as u64,
        })??;

    if let Err(e) = auto_scroll(&page).await {
        warn!("Progressive scroll did not complete: {}", e);
    }

    let title = snapshot::read_title(&page).await?;
    let description = snapshot::read_description(&page).await?;

    Ok(PageSession {
        page,
        url: url.clone(),
        title,
        description,
    })
}

#[derive(Debug, Deserialize)]
struct QuiescenceReport {
    idle: bool,
    #[serde(rename = "waitedMs")]
    waited_ms: u64,
}

/// Wait until network activity has stopped for the quiescence window.
///
/// Polls the document's resource-timing entry count; the count holding
/// steady for the window (with the document in readyState complete) is the
/// load-completion signal. Capped so pages that poll forever still proceed.
async fn wait_for_quiescence(page: &Page) -> Result<()> {
    let report = page
        .evaluate(quiescence_script().as_str())
        .await
        .map_err(|e| SiftError::Navigation(e.to_string()))?
        .into_value::<QuiescenceReport>()
        .map_err(|e| SiftError::Navigation(format!("quiescence report malformed: {}", e)))?;

    if report.idle {
        debug!("Network quiescent after {}ms", report.waited_ms);
    } else {
        debug!(
            "Network never went idle, proceeding after {}ms cap",
            report.waited_ms
        );
    }
    Ok(())
}

fn quiescence_script() -> String {
    format!(
        r#"(async () => {{
        const idleMs = {QUIESCENCE_WINDOW_MS};
        const interval = {QUIESCENCE_POLL_MS};
        const capMs = {QUIESCENCE_CAP_MS};
        const start = Date.now();
        let lastCount = performance.getEntriesByType('resource').length;
        let stableMs = 0;
        while (Date.now() - start < capMs) {{
            await new Promise((r) => setTimeout(r, interval));
            const count = performance.getEntriesByType('resource').length;
            if (document.readyState === 'complete' && count === lastCount) {{
                stableMs += interval;
                if (stableMs >= idleMs) {{
                    return {{ idle: true, waitedMs: Date.now() - start }};
                }}
            }} else {{
                stableMs = 0;
            }}
            lastCount = count;
        }}
        return {{ idle: false, waitedMs: Date.now() - start }};
    }})()"#
    )
}

/// Scroll the viewport down in fixed increments to trigger lazy content.
///
/// 600px every 100ms until the accumulated distance reaches the scrollable
/// height minus one viewport minus a 50px margin. A hard step cap keeps
/// true infinite-scroll pages from pinning the session.
async fn auto_scroll(page: &Page) -> Result<()> {
    let total = page
        .evaluate(SCROLL_SCRIPT)
        .await
        .map_err(|e| SiftError::Browser(e.to_string()))?
        .into_value::<i64>()
        .map_err(|e| SiftError::Browser(e.to_string()))?;
    debug!("Scrolled {}px to trigger lazy content", total);
    Ok(())
}

const SCROLL_SCRIPT: &str = r#"
    (() => new Promise((resolve) => {
        const distance = 600;
        const maxSteps = 500;
        let total = 0;
        let steps = 0;
        const timer = setInterval(() => {
            const { scrollHeight } =
                document.scrollingElement || document.documentElement;
            window.scrollBy(0, distance);
            total += distance;
            steps += 1;
            if (total >= scrollHeight - window.innerHeight - 50 || steps >= maxSteps) {
                clearInterval(timer);
                resolve(total);
            }
        }, 100);
    }))()
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quiescence_script_checks_activity_not_just_time() {
        // The wait must observe resource fetches and readiness, bounded by a cap
        let script = quiescence_script();
        assert!(script.contains("performance.getEntriesByType('resource')"));
        assert!(script.contains("document.readyState === 'complete'"));
        assert!(script.contains("capMs"));
    }

    #[test]
    fn test_quiescence_report_deserializes() {
        let report: QuiescenceReport =
            serde_json::from_str(r#"{"idle":true,"waitedMs":740}"#).unwrap();
        assert!(report.idle);
        assert_eq!(report.waited_ms, 740);
    }

    #[test]
    fn test_scroll_script_is_bounded() {
        // The in-page loop must carry both the height check and a step cap
        assert!(SCROLL_SCRIPT.contains("scrollHeight - window.innerHeight - 50"));
        assert!(SCROLL_SCRIPT.contains("maxSteps"));
        assert!(SCROLL_SCRIPT.contains("clearInterval"));
    }
}
