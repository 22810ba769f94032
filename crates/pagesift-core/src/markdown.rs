//! HTML to Markdown conversion
//!
//! Pure and deterministic: the same fragment always yields the same output.
//! Links render reference-style with definitions appended after the body;
//! strong emphasis is preferred over underscore forms; data-URI images are
//! discarded. Noise removal is the cleaner's job, so chrome elements
//! (nav/header/footer) are converted like any other container.

use regex::Regex;
use scraper::{ElementRef, Html, Node, Selector};
use std::collections::HashMap;

/// Convert an HTML fragment (or full document) to normalized Markdown
pub fn to_markdown(html: &str) -> String {
    let document = parse(html);
    let mut output = String::new();
    let mut refs = LinkRefs::default();

    convert_element(
        document.root_element(),
        &mut output,
        &mut refs,
        &mut Context::default(),
    );
    refs.append_definitions(&mut output);

    post_process(&output)
}

/// Uniform output normalization: strip trailing whitespace before line
/// breaks, collapse 3+ newlines to one blank line, replace NBSP with a
/// plain space, trim, and end with exactly one newline.
pub fn post_process(s: &str) -> String {
    let trailing_ws = Regex::new(r"[ \t]+\n").unwrap();
    let s = trailing_ws.replace_all(s, "\n");

    let blank_runs = Regex::new(r"\n{3,}").unwrap();
    let s = blank_runs.replace_all(&s, "\n\n");

    let s = s.replace('\u{00A0}', " ");

    let mut result = s.trim().to_string();
    result.push('\n');
    result
}

fn parse(html: &str) -> Html {
    let mut end = html.len().min(512);
    while !html.is_char_boundary(end) {
        end -= 1;
    }
    let lower = html[..end].to_ascii_lowercase();
    if lower.contains("<html") || lower.contains("<!doctype") {
        Html::parse_document(html)
    } else {
        Html::parse_fragment(html)
    }
}

/// Reference-style link collection, deduplicated by URL
#[derive(Default)]
struct LinkRefs {
    urls: Vec<String>,
    index: HashMap<String, usize>,
}

impl LinkRefs {
    /// Get the 1-based reference number for a URL, registering it if new
    fn reference(&mut self, url: &str) -> usize {
        if let Some(&n) = self.index.get(url) {
            return n;
        }
        self.urls.push(url.to_string());
        let n = self.urls.len();
        self.index.insert(url.to_string(), n);
        n
    }

    fn append_definitions(&self, output: &mut String) {
        if self.urls.is_empty() {
            return;
        }
        ensure_newlines(output, 2);
        for (i, url) in self.urls.iter().enumerate() {
            output.push_str(&format!("[{}]: {}\n", i + 1, url));
        }
    }
}

#[derive(Default)]
struct Context {
    in_pre: bool,
    in_code: bool,
    list_depth: usize,
    list_counters: Vec<usize>,
}

fn convert_element(element: ElementRef, output: &mut String, refs: &mut LinkRefs, ctx: &mut Context) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => {
                let content = text.text.as_ref();
                if ctx.in_pre || ctx.in_code {
                    output.push_str(content);
                } else {
                    let normalized = normalize_whitespace(content);
                    if !normalized.is_empty() {
                        output.push_str(&normalized);
                    }
                }
            }
            Node::Element(_) => {
                if let Some(elem) = ElementRef::wrap(child) {
                    convert_tag(elem, output, refs, ctx);
                }
            }
            _ => {}
        }
    }
}

fn convert_tag(element: ElementRef, output: &mut String, refs: &mut LinkRefs, ctx: &mut Context) {
    let tag = element.value().name();

    match tag {
        // Non-rendered elements carry no content
        "script" | "style" | "noscript" | "template" | "title" | "meta" | "link" | "base" => {}

        // Headings
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
            let level = tag[1..].parse::<usize>().unwrap_or(1);
            ensure_newlines(output, 2);
            output.push_str(&"#".repeat(level));
            output.push(' ');
            convert_element(element, output, refs, ctx);
            ensure_newlines(output, 2);
        }

        // Paragraphs and blocks
        "p" => {
            ensure_newlines(output, 2);
            convert_element(element, output, refs, ctx);
            ensure_newlines(output, 2);
        }
        "div" | "section" | "article" | "main" | "nav" | "header" | "footer" | "aside"
        | "figure" | "figcaption" => {
            ensure_newlines(output, 1);
            convert_element(element, output, refs, ctx);
            ensure_newlines(output, 1);
        }
        "br" => {
            output.push_str("  \n");
        }
        "hr" => {
            ensure_newlines(output, 2);
            output.push_str("---");
            ensure_newlines(output, 2);
        }

        // Inline formatting, strong syntax preferred
        "strong" | "b" => {
            output.push_str("**");
            convert_element(element, output, refs, ctx);
            output.push_str("**");
        }
        "em" | "i" => {
            output.push('*');
            convert_element(element, output, refs, ctx);
            output.push('*');
        }
        "s" | "strike" | "del" => {
            output.push_str("~~");
            convert_element(element, output, refs, ctx);
            output.push_str("~~");
        }

        // Code
        "code" => {
            if ctx.in_pre {
                convert_element(element, output, refs, ctx);
            } else {
                output.push('`');
                ctx.in_code = true;
                convert_element(element, output, refs, ctx);
                ctx.in_code = false;
                output.push('`');
            }
        }
        "pre" => {
            ensure_newlines(output, 2);
            output.push_str("```\n");
            ctx.in_pre = true;
            convert_element(element, output, refs, ctx);
            ctx.in_pre = false;
            if !output.ends_with('\n') {
                output.push('\n');
            }
            output.push_str("```");
            ensure_newlines(output, 2);
        }

        // Links, reference style
        "a" => {
            let text: String = element.text().collect();
            let text = text.trim();
            if let Some(href) = element.value().attr("href") {
                let n = refs.reference(href);
                output.push('[');
                if text.is_empty() {
                    output.push_str(href);
                } else {
                    output.push_str(text);
                }
                output.push_str(&format!("][{}]", n));
            } else {
                convert_element(element, output, refs, ctx);
            }
        }

        // Images; data-URI payloads are dropped entirely
        "img" => {
            if let Some(src) = element.value().attr("src") {
                if !src.starts_with("data:") {
                    let alt = element.value().attr("alt").unwrap_or("");
                    output.push_str(&format!("![{}]({})", alt, src));
                }
            }
        }

        // Lists
        "ul" => {
            ensure_newlines(output, 2);
            ctx.list_depth += 1;
            ctx.list_counters.push(0);
            convert_element(element, output, refs, ctx);
            ctx.list_counters.pop();
            ctx.list_depth -= 1;
            ensure_newlines(output, 2);
        }
        "ol" => {
            ensure_newlines(output, 2);
            ctx.list_depth += 1;
            ctx.list_counters.push(1);
            convert_element(element, output, refs, ctx);
            ctx.list_counters.pop();
            ctx.list_depth -= 1;
            ensure_newlines(output, 2);
        }
        "li" => {
            ensure_newlines(output, 1);
            let indent = "  ".repeat(ctx.list_depth.saturating_sub(1));
            output.push_str(&indent);

            if let Some(counter) = ctx.list_counters.last_mut() {
                if *counter > 0 {
                    output.push_str(&format!("{}. ", counter));
                    *counter += 1;
                } else {
                    output.push_str("- ");
                }
            } else {
                output.push_str("- ");
            }
            convert_element(element, output, refs, ctx);
        }

        // Blockquotes
        "blockquote" => {
            ensure_newlines(output, 2);
            let inner = element.text().collect::<String>();
            for line in inner.lines() {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                output.push_str("> ");
                output.push_str(line);
                output.push('\n');
            }
            ensure_newlines(output, 1);
        }

        // Tables
        "table" => {
            ensure_newlines(output, 2);
            convert_table(element, output, refs, ctx);
            ensure_newlines(output, 2);
        }

        // Default: just process children
        _ => {
            convert_element(element, output, refs, ctx);
        }
    }
}

fn convert_table(table: ElementRef, output: &mut String, refs: &mut LinkRefs, ctx: &mut Context) {
    let row_selector = Selector::parse("tr").unwrap();
    let th_selector = Selector::parse("th").unwrap();
    let td_selector = Selector::parse("td").unwrap();

    let mut rows: Vec<Vec<String>> = Vec::new();
    let mut has_header = false;

    for row in table.select(&row_selector) {
        let mut cells: Vec<String> = Vec::new();

        let headers: Vec<_> = row.select(&th_selector).collect();
        if !headers.is_empty() {
            has_header = true;
            for th in headers {
                let text: String = th.text().collect();
                cells.push(text.trim().to_string());
            }
        } else {
            for td in row.select(&td_selector) {
                let mut cell_output = String::new();
                convert_element(td, &mut cell_output, refs, ctx);
                cells.push(cell_output.trim().replace('\n', " ").to_string());
            }
        }

        if !cells.is_empty() {
            rows.push(cells);
        }
    }

    if rows.is_empty() {
        return;
    }

    let col_count = rows.iter().map(|r| r.len()).max().unwrap_or(0);
    let mut col_widths: Vec<usize> = vec![3; col_count];

    for row in &rows {
        for (i, cell) in row.iter().enumerate() {
            if i < col_widths.len() {
                col_widths[i] = col_widths[i].max(cell.len());
            }
        }
    }

    for (row_idx, row) in rows.iter().enumerate() {
        output.push('|');
        for (i, width) in col_widths.iter().enumerate() {
            let cell = row.get(i).map(|s| s.as_str()).unwrap_or("");
            output.push_str(&format!(" {:<width$} |", cell, width = width));
        }
        output.push('\n');

        if row_idx == 0 && has_header {
            output.push('|');
            for width in &col_widths {
                output.push_str(&format!(" {} |", "-".repeat(*width)));
            }
            output.push('\n');
        }
    }
}

fn normalize_whitespace(text: &str) -> String {
    let ws_re = Regex::new(r"\s+").unwrap();
    ws_re.replace_all(text, " ").to_string()
}

fn ensure_newlines(output: &mut String, count: usize) {
    if output.is_empty() {
        return;
    }
    let trailing_newlines = output.chars().rev().take_while(|&c| c == '\n').count();
    for _ in trailing_newlines..count {
        output.push('\n');
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heading_conversion() {
        let md = to_markdown("<h1>Title</h1><h3>Sub</h3>");
        assert!(md.contains("# Title"));
        assert!(md.contains("### Sub"));
    }

    #[test]
    fn test_strong_and_emphasis() {
        let md = to_markdown("<p><strong>bold</strong> and <em>italic</em></p>");
        assert!(md.contains("**bold**"));
        assert!(md.contains("*italic*"));
    }

    #[test]
    fn test_links_are_reference_style() {
        let md = to_markdown(r#"<p><a href="https://example.com">Example</a></p>"#);
        assert!(md.contains("[Example][1]"));
        assert!(md.contains("[1]: https://example.com"));
        assert!(!md.contains("[Example](https://example.com)"));
    }

    #[test]
    fn test_repeated_link_urls_share_one_reference() {
        let html = r#"<a href="https://a.test">one</a><a href="https://a.test">two</a>"#;
        let md = to_markdown(html);
        assert!(md.contains("[one][1]"));
        assert!(md.contains("[two][1]"));
        assert_eq!(md.matches("[1]: https://a.test").count(), 1);
    }

    #[test]
    fn test_data_uri_images_are_dropped() {
        let md = to_markdown(r#"<p><img src="data:image/png;base64,AAAA" alt="x">text</p>"#);
        assert!(!md.contains("data:image"));
        assert!(md.contains("text"));
    }

    #[test]
    fn test_regular_images_survive() {
        let md = to_markdown(r#"<img src="/logo.png" alt="logo">"#);
        assert!(md.contains("![logo](/logo.png)"));
    }

    #[test]
    fn test_chrome_elements_are_converted_not_skipped() {
        // The full-document variant must include nav/header/footer text
        let md = to_markdown("<nav>Home</nav><p>Body</p><footer>Legal</footer>");
        assert!(md.contains("Home"));
        assert!(md.contains("Legal"));
    }

    #[test]
    fn test_list_conversion() {
        let md = to_markdown("<ul><li>One</li><li>Two</li></ul>");
        assert!(md.contains("- One"));
        assert!(md.contains("- Two"));
        let md = to_markdown("<ol><li>First</li><li>Second</li></ol>");
        assert!(md.contains("1. First"));
        assert!(md.contains("2. Second"));
    }

    #[test]
    fn test_full_document_head_is_not_rendered() {
        let html = "<html><head><title>Meta Title</title></head><body><p>Content</p></body></html>";
        let md = to_markdown(html);
        assert!(!md.contains("Meta Title"));
        assert!(md.contains("Content"));
    }

    #[test]
    fn test_conversion_is_deterministic() {
        let html = r#"<h2>Head</h2><p>Some <b>text</b> with <a href="/x">a link</a></p>"#;
        assert_eq!(to_markdown(html), to_markdown(html));
    }

    #[test]
    fn test_post_process_collapses_blank_lines() {
        assert_eq!(post_process("a\n\n\n\n\nb"), "a\n\nb\n");
    }

    #[test]
    fn test_post_process_strips_trailing_spaces() {
        assert_eq!(post_process("line one   \nline two\t\n"), "line one\nline two\n");
    }

    #[test]
    fn test_post_process_replaces_nbsp() {
        assert_eq!(post_process("a\u{00A0}b"), "a b\n");
    }

    #[test]
    fn test_post_process_single_trailing_newline() {
        let out = post_process("text\n\n\n");
        assert!(out.ends_with("text\n"));
        assert!(!out.ends_with("\n\n"));
        assert!(!out.trim_end_matches('\n').ends_with(' '));
    }
}
