//! Best-effort syntax highlighting for fenced code blocks.
//!
//! Wraps the tree-sitter based `arborium` highlighter behind a single
//! `Option`-returning call. Highlighting never aborts rendering: any
//! failure, unknown grammar included, falls back to `None` and the
//! caller emits escaped plain text instead.

use std::cell::RefCell;

use arborium::Highlighter;

use crate::lang;

thread_local! {
    // Grammar configurations load lazily, on first use per language.
    static HIGHLIGHTER: RefCell<Highlighter> = RefCell::new(Highlighter::new());
}

/// Returns highlighted markup for `source`, or `None` when highlighting
/// is unavailable: empty source, [`lang::PLAINTEXT`], an unregistered
/// grammar, or a highlighter error.
///
/// The markup wraps captures in the highlighter's attribute-free custom
/// elements (`<a-k>` for keywords, `<a-s>` for strings, and so on),
/// with everything between them already entity-escaped; it must not be
/// escaped again. The sanitize policy admits those elements so the
/// highlighting survives downstream filtering.
pub fn highlight(source: &str, language: &str) -> Option<String> {
    if source.is_empty() || language == lang::PLAINTEXT {
        return None;
    }
    HIGHLIGHTER.with(|cell| {
        match cell.borrow_mut().highlight_to_html(language, source) {
            Ok(markup) => Some(markup),
            Err(error) => {
                tracing::debug!(language, %error, "syntax highlighting unavailable");
                None
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_source_is_not_highlighted() {
        assert_eq!(highlight("", "rust"), None);
    }

    #[test]
    fn plaintext_is_not_highlighted() {
        assert_eq!(highlight("just words", lang::PLAINTEXT), None);
    }

    #[test]
    fn unknown_grammar_falls_back() {
        assert_eq!(highlight("whatever", "no-such-language"), None);
    }

    #[test]
    fn known_grammar_produces_preescaped_markup() {
        let markup = highlight("let x = 1 < 2;", "rust").expect("rust grammar is registered");
        // The literal `<` must be escaped exactly once.
        assert!(markup.contains("&lt;"));
        assert!(!markup.contains("&amp;lt;"));
    }

    #[test]
    fn known_grammar_emits_capture_elements() {
        let markup = highlight("let x = 1;", "rust").expect("rust grammar is registered");
        assert!(markup.contains("<a-"));
        assert!(markup.contains("</a-"));
    }
}
