//! HTML snapshots and page metadata
//!
//! Serializes the live document at two scopes. Snapshots are taken before
//! and after cleaning; metadata is read once per session since title and
//! description do not change across cleaning passes.

use crate::{PageSession, Result, SiftError};
use chromiumoxide::Page;

/// What part of the document to serialize
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// The entire current document, head included
    Document,
    /// Inner markup of the body subtree only
    BodyOnly,
}

/// Serialize the session's current document state
pub async fn snapshot(session: &PageSession, scope: Scope) -> Result<String> {
    let page = session.page();
    match scope {
        Scope::Document => page
            .content()
            .await
            .map_err(|e| SiftError::Browser(format!("failed to serialize document: {}", e))),
        Scope::BodyOnly => page
            .evaluate("document.body.innerHTML")
            .await
            .map_err(|e| SiftError::Browser(format!("failed to serialize body: {}", e)))?
            .into_value::<String>()
            .map_err(|e| SiftError::Browser(format!("body snapshot not a string: {}", e))),
    }
}

/// Read the document title, `None` when missing or empty
pub(crate) async fn read_title(page: &Page) -> Result<Option<String>> {
    let title = page
        .get_title()
        .await
        .map_err(|e| SiftError::Browser(format!("failed to read title: {}", e)))?;
    Ok(title.filter(|t| !t.trim().is_empty()))
}

/// Read the description meta tag's content attribute, `None` when absent
pub(crate) async fn read_description(page: &Page) -> Result<Option<String>> {
    let script = r#"
        document.querySelector("meta[name='description']")?.getAttribute("content") ?? null
    "#;
    page.evaluate(script)
        .await
        .map_err(|e| SiftError::Browser(format!("failed to read description: {}", e)))?
        .into_value::<Option<String>>()
        .map_err(|e| SiftError::Browser(format!("description not a string: {}", e)))
}
