//! Pagesift Core Library
//!
//! Core functionality for Pagesift including:
//! - Chrome browser lifecycle management
//! - Page rendering with lazy-content scrolling
//! - Multi-pass DOM cleaning (selectors, mutation-driven re-cleaning,
//!   text heuristics, shadow trees, same-origin frames)
//! - HTML snapshots and HTML to Markdown conversion

pub mod chrome;
pub mod clean;
pub mod markdown;
pub mod navigate;
pub mod pipeline;
pub mod rules;
pub mod snapshot;
pub mod storage;

use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

// Re-export key types
pub use chrome::BrowserHandle;
pub use clean::{CleanReport, Cleaner, FrameSweep, MutationSubscription};
pub use navigate::PageSession;
pub use pipeline::Pipeline;
pub use rules::CleaningRules;
pub use snapshot::Scope;

#[derive(Error, Debug)]
pub enum SiftError {
    #[error("invalid request: {0}")]
    Validation(String),

    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("browser error: {0}")]
    Browser(String),

    #[error("navigation to {url} timed out after {timeout_ms}ms")]
    NavigationTimeout { url: String, timeout_ms: u64 },

    #[error("navigation failed: {0}")]
    Navigation(String),

    /// Malformed fragment input. Not produced by the current converter,
    /// which is total over serialized HTML; part of the request error
    /// surface for callers matching on failure kinds.
    #[error("markdown conversion failed: {0}")]
    Conversion(String),
}

pub type Result<T> = std::result::Result<T, SiftError>;

/// The output record of one extraction request.
///
/// Built once per rendered page; every derived representation comes from the
/// same page instance without re-fetching.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Extraction {
    /// The originating URL
    pub url: String,
    /// Document title, absent if the page has none
    pub title: Option<String>,
    /// Content of the description meta tag, absent if the page has none
    pub description: Option<String>,
    /// Full document HTML before cleaning
    pub html_full: String,
    /// Full document HTML after cleaning
    pub html_cleaned: String,
    /// Markdown of the pre-clean full document
    pub mdx_full: String,
    /// Markdown of the pre-clean body, only produced when the raw-body
    /// variant is enabled
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mdx_body: Option<String>,
    /// Markdown of the post-clean body
    pub mdx_cleaned: String,
}

/// Configuration for the extraction pipeline
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Upper bound on navigation, load wait included
    pub navigation_timeout: Duration,
    /// Also produce markdown of the raw pre-clean body
    pub include_raw_body: bool,
    /// Explicit Chrome binary, otherwise discovered from the system
    pub chrome_path: Option<PathBuf>,
    /// Browser window size
    pub window_size: (u32, u32),
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            navigation_timeout: Duration::from_millis(90_000),
            include_raw_body: false,
            chrome_path: None,
            window_size: (1920, 1080),
        }
    }
}
