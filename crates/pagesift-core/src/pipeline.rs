//! Extraction pipeline orchestration
//!
//! Sequences Launch -> Navigate -> SnapshotPre -> Clean -> SnapshotPost ->
//! Convert, assembling the result record. The browser instance is scoped to
//! one request and closed on every exit path, success or failure.

use crate::{
    chrome::BrowserHandle, clean::Cleaner, markdown, navigate, snapshot, snapshot::Scope,
    CleaningRules, Extraction, PipelineConfig, Result, SiftError,
};
use tracing::{debug, info};
use url::Url;

/// One-request-at-a-time extraction pipeline.
///
/// Holds only immutable configuration; concurrent requests each get an
/// isolated browser instance, so a single `Pipeline` value can be shared.
pub struct Pipeline {
    config: PipelineConfig,
    rules: CleaningRules,
}

impl Pipeline {
    /// Create a pipeline with the default cleaning rule set
    pub fn new(config: PipelineConfig) -> Self {
        Self::with_rules(config, CleaningRules::default())
    }

    /// Create a pipeline with an explicit rule set
    pub fn with_rules(config: PipelineConfig, rules: CleaningRules) -> Self {
        Self { config, rules }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run one extraction request end to end.
    ///
    /// All-or-nothing: any stage failure fails the request, after the
    /// browser has been closed.
    pub async fn extract(&self, url: &str) -> Result<Extraction> {
        let url = validate_url(url)?;
        info!("Extracting: {}", url);

        let handle = BrowserHandle::launch(&self.config).await?;
        let outcome = self.run_session(&handle, &url).await;
        handle.close().await;
        outcome
    }

    async fn run_session(&self, handle: &BrowserHandle, url: &Url) -> Result<Extraction> {
        let session =
            navigate::render(&handle.browser, url, self.config.navigation_timeout).await?;

        // Pre-clean snapshots
        let html_full = snapshot::snapshot(&session, Scope::Document).await?;
        let mdx_full = markdown::to_markdown(&html_full);

        let mdx_body = if self.config.include_raw_body {
            let body_html = snapshot::snapshot(&session, Scope::BodyOnly).await?;
            Some(markdown::to_markdown(&body_html))
        } else {
            None
        };

        // Clean, then snapshot again off the same rendered page
        let cleaner = Cleaner::new(self.rules.clone());
        let report = cleaner.clean(&session).await?;
        debug!(
            "Cleaned with {} selectors; frames cleaned={} skipped={}",
            report.subscription.selector_count(),
            report.frames.cleaned,
            report.frames.skipped
        );

        let html_cleaned = snapshot::snapshot(&session, Scope::Document).await?;
        let body_cleaned = snapshot::snapshot(&session, Scope::BodyOnly).await?;
        let mdx_cleaned = markdown::to_markdown(&body_cleaned);

        Ok(Extraction {
            url: url.to_string(),
            title: session.title().map(str::to_string),
            description: session.description().map(str::to_string),
            html_full,
            html_cleaned,
            mdx_full,
            mdx_body,
            mdx_cleaned,
        })
    }
}

/// Parse and validate the request URL before any browser launch
fn validate_url(url: &str) -> Result<Url> {
    if url.trim().is_empty() {
        return Err(SiftError::Validation("url must not be empty".to_string()));
    }
    let parsed = Url::parse(url)?;
    match parsed.scheme() {
        "http" | "https" | "data" | "file" => Ok(parsed),
        other => Err(SiftError::Validation(format!(
            "unsupported URL scheme: {}",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_url_fails_before_launch() {
        let result = validate_url("");
        assert!(matches!(result, Err(SiftError::Validation(_))));
        let result = validate_url("   ");
        assert!(matches!(result, Err(SiftError::Validation(_))));
    }

    #[test]
    fn test_malformed_url_fails_before_launch() {
        let result = validate_url("not a url");
        assert!(matches!(result, Err(SiftError::Url(_))));
    }

    #[test]
    fn test_unsupported_scheme_rejected() {
        let result = validate_url("ftp://example.com/file");
        assert!(matches!(result, Err(SiftError::Validation(_))));
    }

    #[test]
    fn test_valid_urls_accepted() {
        assert!(validate_url("https://example.com/page").is_ok());
        assert!(validate_url("data:text/html,<p>hi</p>").is_ok());
    }
}
