//! Cleaning rule configuration
//!
//! An ordered, immutable set of structural selectors and text hints. Built
//! once and passed explicitly into the cleaner; never mutated after
//! construction.

/// Selectors and text hints driving noise removal.
///
/// `selectors` match chrome, overlays, ads and interactive controls by
/// structure; `text_hints` match CTA and consent controls by rendered text
/// (lowercase substring).
#[derive(Debug, Clone)]
pub struct CleaningRules {
    pub selectors: Vec<String>,
    pub text_hints: Vec<String>,
}

impl CleaningRules {
    pub fn new(selectors: Vec<String>, text_hints: Vec<String>) -> Self {
        // Hint matching is case-insensitive against lowercased element text
        let text_hints = text_hints.into_iter().map(|h| h.to_lowercase()).collect();
        Self {
            selectors,
            text_hints,
        }
    }
}

impl Default for CleaningRules {
    fn default() -> Self {
        let selectors = [
            // structural/navigation
            "nav",
            "header",
            "footer",
            "aside",
            "[role='navigation']",
            "[role='toolbar']",
            "[role='banner']",
            "[role='complementary']",
            "[data-testid*='nav']",
            "[data-test*='nav']",
            // UI chrome / CTAs
            "button",
            "input[type='button']",
            "input[type='submit']",
            "form",
            "select",
            // overlays / modals / toasts / sticky bars
            ".modal, [role='dialog'], [aria-modal='true']",
            ".toast, .snackbar",
            ".sticky, .is-sticky, [style*='position: sticky']",
            "[class*='sticky-']",
            ".announcement, .banner, .cookie, .cookie-banner",
            // monetization / social
            ".ads, [aria-label='ad'], [id*='ad-'], [class*='ad-']",
            ".share, .social, [class*='share-']",
            // misc clutter
            "noscript",
            "svg[aria-hidden='true']",
        ];

        // Buttons/links carrying these words get removed by text match
        let text_hints = [
            "subscribe",
            "sign in",
            "sign up",
            "log in",
            "start free",
            "try free",
            "get started",
            "cookies",
            "accept all",
            "manage preferences",
            "allow all",
            "install app",
        ];

        Self::new(
            selectors.iter().map(|s| s.to_string()).collect(),
            text_hints.iter().map(|s| s.to_string()).collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_rules_cover_structural_chrome() {
        let rules = CleaningRules::default();
        for sel in ["nav", "header", "footer", "aside", "button", "noscript"] {
            assert!(
                rules.selectors.iter().any(|s| s == sel),
                "missing selector: {}",
                sel
            );
        }
    }

    #[test]
    fn test_default_rules_cover_consent_hints() {
        let rules = CleaningRules::default();
        assert!(rules.text_hints.contains(&"subscribe".to_string()));
        assert!(rules.text_hints.contains(&"accept all".to_string()));
    }

    #[test]
    fn test_hints_lowercased_on_construction() {
        let rules = CleaningRules::new(vec![], vec!["Sign In".to_string()]);
        assert_eq!(rules.text_hints, vec!["sign in".to_string()]);
    }
}
