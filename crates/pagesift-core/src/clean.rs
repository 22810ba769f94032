//! Multi-pass DOM cleaning
//!
//! Removes non-content subtrees from the live document. Pass order is fixed;
//! later passes assume earlier ones ran. Cleaning is idempotent: re-applying
//! the full rule set to an already-cleaned tree removes nothing further,
//! which lets the mutation listener converge instead of looping on its own
//! removals.

use crate::{CleaningRules, PageSession, Result, SiftError};
use serde::Deserialize;
use tracing::debug;

/// Outcome of the same-origin embedded-frame pass.
///
/// Frames whose document could be reached were swept with the selector
/// list; cross-origin frames are counted as skipped rather than raising an
/// error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct FrameSweep {
    pub cleaned: usize,
    pub skipped: usize,
}

/// Marker for the mutation listener installed on the document.
///
/// Fire-and-forget: the listener re-applies the selector sweep on every
/// subtree insertion until the session's document is discarded. There is no
/// explicit cancellation; teardown of the browser ends it.
#[derive(Debug)]
pub struct MutationSubscription {
    selector_count: usize,
}

impl MutationSubscription {
    /// Number of configured selectors the listener re-applies
    pub fn selector_count(&self) -> usize {
        self.selector_count
    }
}

/// What a `clean` call did, beyond mutating the document in place
#[derive(Debug)]
pub struct CleanReport {
    pub frames: FrameSweep,
    pub subscription: MutationSubscription,
}

/// Applies the cleaning rule set to a live page
pub struct Cleaner {
    rules: CleaningRules,
}

impl Cleaner {
    pub fn new(rules: CleaningRules) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &CleaningRules {
        &self.rules
    }

    /// Run all cleaning passes against the session's document.
    ///
    /// Mutates the document in place. Removal itself is best-effort and
    /// never fails; only a broken browser connection surfaces as an error.
    pub async fn clean(&self, session: &PageSession) -> Result<CleanReport> {
        let page = session.page();
        let selectors_json = serde_json::to_string(&self.rules.selectors)
            .map_err(|e| SiftError::Browser(format!("failed to encode selectors: {}", e)))?;
        let hints_json = serde_json::to_string(&self.rules.text_hints)
            .map_err(|e| SiftError::Browser(format!("failed to encode text hints: {}", e)))?;

        // 1) Kill scripts/styles before any content judgment
        self.evaluate(page, PURGE_SCRIPT).await?;

        // 2) Structural selectors, chrome roles, ad attributes
        self.evaluate(page, &selector_sweep_script(&selectors_json))
            .await?;

        // 3) Keep killing nodes that SPA re-renders bring back
        self.evaluate(page, &observer_script(&selectors_json))
            .await?;
        let subscription = MutationSubscription {
            selector_count: self.rules.selectors.len(),
        };

        // 4) Text-based removal for CTAs and cookie prompts
        self.evaluate(page, &text_hint_script(&hints_json)).await?;

        // 5) Shadow trees, best-effort common chrome only
        self.evaluate(page, SHADOW_SCRIPT).await?;

        // 6) Same-origin frames; cross-origin counted as skipped
        let frames = page
            .evaluate(frame_sweep_script(&selectors_json).as_str())
            .await
            .map_err(|e| SiftError::Browser(e.to_string()))?
            .into_value::<FrameSweep>()
            .map_err(|e| SiftError::Browser(format!("frame sweep report malformed: {}", e)))?;
        debug!(
            "Frame sweep: {} cleaned, {} skipped (cross-origin)",
            frames.cleaned, frames.skipped
        );

        // 7) Drop containers the earlier passes emptied out
        self.evaluate(page, EMPTY_SWEEP_SCRIPT).await?;

        Ok(CleanReport {
            frames,
            subscription,
        })
    }

    async fn evaluate(&self, page: &chromiumoxide::Page, script: &str) -> Result<()> {
        page.evaluate(script)
            .await
            .map_err(|e| SiftError::Browser(e.to_string()))?;
        Ok(())
    }
}

const PURGE_SCRIPT: &str = r#"
    document
        .querySelectorAll("script, style, link[rel='preload'], link[rel='preconnect']")
        .forEach((el) => el.remove());
"#;

/// Shared removal routine: configured selectors plus chrome roles and
/// ad-attribute patterns that are stripped independent of configuration.
fn kill_source(selectors_json: &str) -> String {
    format!(
        r#"
        const selectors = {selectors_json};
        const kill = (root) => {{
            selectors.forEach((sel) =>
                root.querySelectorAll(sel).forEach((el) => el.remove())
            );
            root.querySelectorAll(
                "[role='menu'], [role='menubar'], [role='search'], [role='tablist']"
            ).forEach((el) => el.remove());
            root.querySelectorAll(
                "[data-ad], [data-testid*='ad'], [class*='-ad-'], [id*='-ad-']"
            ).forEach((el) => el.remove());
        }};
    "#
    )
}

fn selector_sweep_script(selectors_json: &str) -> String {
    format!(
        r#"(() => {{
        {kill}
        kill(document);
    }})()"#,
        kill = kill_source(selectors_json)
    )
}

fn observer_script(selectors_json: &str) -> String {
    format!(
        r#"(() => {{
        {kill}
        const mo = new MutationObserver(() => kill(document));
        mo.observe(document, {{ childList: true, subtree: true }});
    }})()"#,
        kill = kill_source(selectors_json)
    )
}

fn text_hint_script(hints_json: &str) -> String {
    format!(
        r#"(() => {{
        const hints = {hints_json};
        const els = document.querySelectorAll(
            "a, button, [role='button'], [role='link'], div, p, span"
        );
        els.forEach((el) => {{
            const t = (el.textContent || "").toLowerCase();
            if (hints.some((h) => t.includes(h))) el.remove();
        }});
    }})()"#
    )
}

const SHADOW_SCRIPT: &str = r#"
    (() => {
        const roots = [];
        const walker = document.createTreeWalker(document, NodeFilter.SHOW_ELEMENT);
        let node;
        while ((node = walker.nextNode())) {
            if (node.shadowRoot) roots.push(node.shadowRoot);
        }
        roots.forEach((sr) => {
            sr.querySelectorAll(
                "nav, header, footer, button, .modal, .cookie, .cookie-banner"
            ).forEach((el) => el.remove());
        });
    })()
"#;

fn frame_sweep_script(selectors_json: &str) -> String {
    format!(
        r#"(() => {{
        {kill}
        let cleaned = 0;
        let skipped = 0;
        document.querySelectorAll("iframe").forEach((frame) => {{
            try {{
                const doc = frame.contentDocument;
                if (doc) {{
                    kill(doc);
                    cleaned += 1;
                }} else {{
                    skipped += 1;
                }}
            }} catch (e) {{
                skipped += 1;
            }}
        }});
        return {{ cleaned, skipped }};
    }})()"#,
        kill = kill_source(selectors_json)
    )
}

const EMPTY_SWEEP_SCRIPT: &str = r#"
    document.querySelectorAll("aside, header, footer").forEach((el) => {
        if (!el.textContent?.trim()) el.remove();
    });
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cleaner_exposes_its_rule_set() {
        let rules = CleaningRules::new(vec!["nav".to_string()], vec!["Subscribe".to_string()]);
        let cleaner = Cleaner::new(rules);
        assert_eq!(cleaner.rules().selectors, vec!["nav".to_string()]);
        assert_eq!(cleaner.rules().text_hints, vec!["subscribe".to_string()]);
    }

    #[test]
    fn test_sweep_script_embeds_configured_selectors() {
        let json = serde_json::to_string(&["nav", ".cookie-banner"]).unwrap();
        let script = selector_sweep_script(&json);
        assert!(script.contains(r#"["nav",".cookie-banner"]"#));
        assert!(script.contains("kill(document)"));
        // chrome roles and ad patterns stay independent of the configured list
        assert!(script.contains("[role='menubar']"));
        assert!(script.contains("[class*='-ad-']"));
    }

    #[test]
    fn test_observer_script_installs_subtree_listener() {
        let json = serde_json::to_string(&["nav"]).unwrap();
        let script = observer_script(&json);
        assert!(script.contains("MutationObserver"));
        assert!(script.contains("childList: true, subtree: true"));
    }

    #[test]
    fn test_text_hint_script_targets_interactive_and_text_elements() {
        let json = serde_json::to_string(&["subscribe"]).unwrap();
        let script = text_hint_script(&json);
        assert!(script.contains(r#"a, button, [role='button'], [role='link'], div, p, span"#));
        assert!(script.contains(r#"["subscribe"]"#));
    }

    #[test]
    fn test_frame_script_counts_both_outcomes() {
        let json = serde_json::to_string(&["footer"]).unwrap();
        let script = frame_sweep_script(&json);
        assert!(script.contains("contentDocument"));
        assert!(script.contains("cleaned += 1"));
        assert!(script.contains("skipped += 1"));
    }

    #[test]
    fn test_frame_sweep_deserializes() {
        let sweep: FrameSweep = serde_json::from_str(r#"{"cleaned":2,"skipped":1}"#).unwrap();
        assert_eq!(sweep.cleaned, 2);
        assert_eq!(sweep.skipped, 1);
    }
}
