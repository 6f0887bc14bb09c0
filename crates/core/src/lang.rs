//! Canonicalization of code-fence language tags.
//!
//! Fence info strings arrive as free-form author input (`js`, `TS`,
//! `shell linenos`, …). Everything downstream works with one canonical
//! lowercase identifier per tag, plus a human-readable display label for
//! the code block header.

use std::borrow::Cow;

/// Canonical identifier for unhighlightable or untagged code.
pub const PLAINTEXT: &str = "plaintext";

/// Display label paired with [`PLAINTEXT`].
const PLAINTEXT_LABEL: &str = "Plain text";

/// Normalizes a free-form fence tag to its canonical language identifier.
///
/// Only the first whitespace-delimited token is significant; trailing
/// modifiers are ignored. Known aliases collapse onto one identifier and
/// unknown tags pass through lowercased, so a highlighter that learns a
/// new grammar needs no change here. Empty or whitespace-only input
/// resolves to [`PLAINTEXT`].
pub fn resolve(raw: &str) -> Cow<'static, str> {
    let Some(tag) = raw.split_whitespace().next() else {
        return Cow::Borrowed(PLAINTEXT);
    };
    let tag = tag.to_ascii_lowercase();
    match canonical_alias(&tag) {
        Some(canonical) => Cow::Borrowed(canonical),
        None => Cow::Owned(tag),
    }
}

fn canonical_alias(tag: &str) -> Option<&'static str> {
    Some(match tag {
        "js" | "jsx" | "mjs" | "cjs" | "javascript" => "javascript",
        "ts" | "tsx" | "typescript" => "typescript",
        "sh" | "shell" | "zsh" | "bash" => "bash",
        "py" | "python" => "python",
        "rb" | "ruby" => "ruby",
        "rs" | "rust" => "rust",
        "yml" | "yaml" => "yaml",
        "jsonc" | "json" => "json",
        "golang" | "go" => "go",
        "c++" | "cpp" => "cpp",
        "htm" | "html" => "html",
        "md" | "markdown" => "markdown",
        "text" | "txt" | "plain" | "plaintext" => PLAINTEXT,
        _ => return None,
    })
}

/// Maps a canonical identifier to a human-readable name.
///
/// Falls back to a title-cased form of the identifier (hyphens and
/// underscores become spaces), and to the plain-text label when even
/// that yields nothing.
pub fn label(canonical: &str) -> Cow<'static, str> {
    let known = match canonical {
        "javascript" => "JavaScript",
        "typescript" => "TypeScript",
        "bash" => "Bash",
        "python" => "Python",
        "ruby" => "Ruby",
        "rust" => "Rust",
        "yaml" => "YAML",
        "toml" => "TOML",
        "json" => "JSON",
        "go" => "Go",
        "c" => "C",
        "cpp" => "C++",
        "html" => "HTML",
        "css" => "CSS",
        "sql" => "SQL",
        "markdown" => "Markdown",
        PLAINTEXT => PLAINTEXT_LABEL,
        _ => "",
    };
    if !known.is_empty() {
        return Cow::Borrowed(known);
    }
    let fallback = title_case(canonical);
    if fallback.is_empty() {
        Cow::Borrowed(PLAINTEXT_LABEL)
    } else {
        Cow::Owned(fallback)
    }
}

fn title_case(identifier: &str) -> String {
    identifier
        .split(['-', '_'])
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_and_whitespace_resolve_to_plaintext() {
        assert_eq!(resolve(""), PLAINTEXT);
        assert_eq!(resolve("   "), PLAINTEXT);
    }

    #[test]
    fn aliases_collapse_onto_canonical_identifiers() {
        assert_eq!(resolve("TS"), "typescript");
        assert_eq!(resolve("tsx"), "typescript");
        assert_eq!(resolve("js"), "javascript");
        assert_eq!(resolve("zsh"), "bash");
        assert_eq!(resolve("py"), "python");
        assert_eq!(resolve("jsonc"), "json");
        assert_eq!(resolve("text"), PLAINTEXT);
    }

    #[test]
    fn only_first_token_is_significant() {
        assert_eq!(resolve("js linenos"), "javascript");
        assert_eq!(resolve("  RUST  {highlight=3}"), "rust");
    }

    #[test]
    fn unknown_tags_pass_through_lowercased() {
        assert_eq!(resolve("Kotlin"), "kotlin");
        assert_eq!(resolve("nix"), "nix");
    }

    #[test]
    fn labels_use_fixed_table_then_title_case() {
        assert_eq!(label("javascript"), "JavaScript");
        assert_eq!(label("cpp"), "C++");
        assert_eq!(label(PLAINTEXT), "Plain text");
        assert_eq!(label("objective-c"), "Objective C");
        assert_eq!(label("emacs_lisp"), "Emacs Lisp");
    }

    #[test]
    fn degenerate_label_falls_back_to_plaintext() {
        assert_eq!(label(""), "Plain text");
        assert_eq!(label("___"), "Plain text");
    }
}
