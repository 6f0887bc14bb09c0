//! penmark-core: untrusted author markdown in, safe styled HTML out.
//!
//! The pipeline runs in three stages: a block scanner that extends the
//! GFM grammar with definition lists, an event-driven renderer that
//! overrides code fence, task-list, and image output, and an allowlist
//! sanitizer that re-validates the rendered fragment and hardens
//! outbound links. Each call is a pure, synchronous computation over its
//! input; the only shared state is the read-only sanitize policy and the
//! language tables.

mod definition_list;
mod highlight;
mod lang;
mod renderer;
mod sanitize;

pub use definition_list::{Block, DefinitionList, Entry};
pub use lang::{label, resolve};
pub use renderer::HtmlRenderer;
pub use sanitize::sanitize;

use std::string::FromUtf8Error;

/// Failures the pipeline can surface to its caller.
///
/// Everything recoverable (highlighting failures, unknown language tags,
/// tokenizer backtracking) is resolved internally; these variants cover
/// only unexpected internal faults. There is no partial-success mode: a
/// call yields a fully sanitized document or an error.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Writing the rendered fragment failed.
    #[error("render buffer error: {0}")]
    Render(#[from] std::io::Error),
    /// The rendered fragment was not valid UTF-8.
    #[error("rendered fragment encoding error: {0}")]
    Encoding(#[from] FromUtf8Error),
    /// The sanitizer's HTML rewriter failed.
    #[error("sanitizer error: {0}")]
    Sanitize(#[from] lol_html::errors::RewritingError),
}

/// Converts author markdown into sanitized HTML safe for direct
/// embedding in a page.
///
/// Empty or whitespace-only input short-circuits to an empty string
/// without tokenizing or sanitizing anything. Callers are responsible
/// for bounding input size; the pipeline itself imposes no limit.
pub fn render(input: &str) -> Result<String, Error> {
    if input.trim().is_empty() {
        return Ok(String::new());
    }

    let blocks = definition_list::scan(input);
    tracing::trace!(blocks = blocks.len(), "tokenized markdown source");

    let buffer = HtmlRenderer::new(Vec::new()).render_blocks(&blocks)?;
    let fragment = String::from_utf8(buffer)?;
    tracing::trace!(bytes = fragment.len(), "rendered html fragment");

    sanitize(&fragment)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render_ok(input: &str) -> String {
        render(input).expect("pipeline should not fail on well-formed input")
    }

    #[test]
    fn empty_and_whitespace_input_render_to_nothing() {
        assert_eq!(render_ok(""), "");
        assert_eq!(render_ok("   \n"), "");
    }

    #[test]
    fn definition_list_round_trip() {
        let html = render_ok("Term\n: First def\n: Second def");
        assert_eq!(html.matches("<dl>").count(), 1);
        assert_eq!(html.matches("<dt>").count(), 1);
        assert_eq!(html.matches("<dd>").count(), 2);
        let term = html.find("Term").unwrap();
        let first = html.find("First def").unwrap();
        let second = html.find("Second def").unwrap();
        assert!(term < first && first < second);
    }

    #[test]
    fn term_without_definition_is_not_a_definition_list() {
        let html = render_ok("Term\nNot a definition");
        assert!(!html.contains("<dl>"));
        assert!(!html.contains("<dt>"));
        assert!(html.contains("Term"));
        assert!(html.contains("Not a definition"));
    }

    #[test]
    fn code_block_is_labeled_with_canonical_language() {
        let html = render_ok("```js\nconst x=1;\n```");
        assert!(html.contains("<figure"));
        assert!(html.contains(r#"data-language="javascript""#));
        assert!(html.contains("<code"));
        assert!(html.contains("code-copy"));
        assert!(html.contains("JavaScript"));
    }

    #[test]
    fn highlighted_output_is_never_double_escaped() {
        let html = render_ok("```rust\nlet ordered = 1 < 2;\n```");
        assert!(html.contains("&lt;"));
        assert!(!html.contains("&amp;lt;"));
    }

    #[test]
    fn highlighted_markup_survives_sanitization() {
        let html = render_ok("```rust\nlet x = 1;\n```");
        // Highlighter capture elements must still be present after the
        // allowlist pass, not stripped down to bare text.
        assert!(html.contains("<a-"));
        assert!(html.contains("</a-"));
    }

    #[test]
    fn javascript_scheme_never_survives() {
        let html = render_ok("[click me](javascript:alert(1))");
        assert!(!html.contains("javascript:"));
    }

    #[test]
    fn absolute_links_are_hardened() {
        let html = render_ok("[out](https://example.com/post)");
        assert!(html.contains("noopener"));
        assert!(html.contains("noreferrer"));
        assert!(html.contains(r#"target="_blank""#));
    }

    #[test]
    fn relative_links_are_untouched() {
        let html = render_ok("[about](/about)");
        assert!(html.contains(r#"href="/about""#));
        assert!(!html.contains("noopener"));
        assert!(!html.contains("target="));
    }

    #[test]
    fn sanitization_is_idempotent_over_rendered_output() {
        let html = render_ok(
            "# Post\n\nTerm\n: def with [link](https://example.com)\n\n```js\nlet a = 1;\n```\n\n- [x] shipped",
        );
        assert_eq!(sanitize(&html).unwrap(), html);
    }

    #[test]
    fn raw_script_blocks_are_removed() {
        let html = render_ok("hello\n\n<script>alert('x')</script>\n\nworld");
        assert!(!html.contains("<script"));
        assert!(!html.contains("alert"));
        assert!(html.contains("hello"));
        assert!(html.contains("world"));
    }

    #[test]
    fn task_list_renders_read_only_glyphs() {
        let html = render_ok("- [x] done\n- [ ] open");
        assert!(html.contains(r#"data-checked="true""#));
        assert!(html.contains(r#"data-checked="false""#));
        assert!(!html.contains("<input"));
    }

    #[test]
    fn images_keep_performance_and_privacy_attributes() {
        let html = render_ok("![a pic](https://example.com/pic.png)");
        assert!(html.contains(r#"loading="lazy""#));
        assert!(html.contains(r#"decoding="async""#));
        assert!(html.contains(r#"referrerpolicy="no-referrer""#));
    }
}
