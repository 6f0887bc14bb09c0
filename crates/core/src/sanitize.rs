//! Allowlist sanitization of rendered HTML.
//!
//! This is the pipeline's sole security boundary: everything upstream —
//! author markdown, raw inline HTML, highlighter markup — is treated as
//! attacker-controlled. The rendered fragment is re-parsed and filtered
//! against [`SanitizePolicy`], then absolute anchors are hardened with
//! `rel="noopener noreferrer"` and a new-tab `target`.

use std::borrow::Cow;
use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use lol_html::{RewriteStrSettings, element, rewrite_str};

use crate::Error;

/// The fixed allowlist enforced on every rendered fragment: allowed
/// tags, per-tag attributes, and URL schemes. Built once at startup and
/// never mutated; concurrent sanitize calls share it read-only.
pub struct SanitizePolicy {
    tags: HashSet<&'static str>,
    tag_attributes: HashMap<&'static str, HashSet<&'static str>>,
    url_schemes: HashSet<&'static str>,
    /// Schemes additionally allowed on `img[src]` only.
    image_schemes: HashSet<&'static str>,
}

static POLICY: LazyLock<SanitizePolicy> = LazyLock::new(SanitizePolicy::strict);

/// Attribute-free custom elements the syntax highlighter wraps captures
/// in (`<a-k>` keyword, `<a-s>` string, `<a-co>` comment, ...). One
/// entry per capture kind the highlighter can emit.
const HIGHLIGHTER_TAGS: &[&str] = &[
    "a-at", "a-c", "a-cb", "a-cd", "a-ch", "a-cn", "a-co", "a-cr", "a-cs", "a-da", "a-dd",
    "a-dr", "a-eb", "a-em", "a-er", "a-ex", "a-f", "a-fb", "a-fc", "a-fd", "a-fm", "a-in",
    "a-k", "a-kc", "a-kd", "a-ke", "a-kf", "a-ki", "a-km", "a-ko", "a-kp", "a-kr", "a-kt",
    "a-ky", "a-l", "a-m", "a-n", "a-ns", "a-o", "a-p", "a-pb", "a-pd", "a-pp", "a-pr",
    "a-ps", "a-rp", "a-rx", "a-s", "a-sc", "a-se", "a-sp", "a-ss", "a-st", "a-t", "a-tb",
    "a-td", "a-te", "a-tf", "a-tg", "a-tl", "a-tq", "a-tr", "a-tt", "a-tu", "a-tx", "a-v",
    "a-vb", "a-vm", "a-vp",
];

impl SanitizePolicy {
    fn strict() -> Self {
        let mut tags = HashSet::from([
            "a", "abbr", "b", "blockquote", "br", "button", "code", "dd", "del", "details", "dl",
            "dt", "em", "figcaption", "figure", "h1", "h2", "h3", "h4", "h5", "h6", "hr", "i",
            "img", "kbd", "li", "mark", "ol", "p", "pre", "s", "section", "small", "span",
            "strong", "sub", "summary", "sup", "table", "tbody", "td", "th", "thead", "tr", "u",
            "ul",
        ]);
        tags.extend(HIGHLIGHTER_TAGS.iter().copied());

        let mut tag_attributes: HashMap<&'static str, HashSet<&'static str>> = HashMap::new();
        tag_attributes.insert("a", HashSet::from(["href", "title", "rel", "target", "id"]));
        tag_attributes.insert("abbr", HashSet::from(["title"]));
        tag_attributes.insert("button", HashSet::from(["type", "class", "aria-label"]));
        tag_attributes.insert("code", HashSet::from(["class", "data-language"]));
        tag_attributes.insert("figcaption", HashSet::from(["class"]));
        tag_attributes.insert("figure", HashSet::from(["class", "data-language"]));
        tag_attributes.insert(
            "img",
            HashSet::from([
                "src",
                "alt",
                "title",
                "loading",
                "decoding",
                "referrerpolicy",
                "class",
            ]),
        );
        tag_attributes.insert("ol", HashSet::from(["start"]));
        tag_attributes.insert("pre", HashSet::from(["class"]));
        tag_attributes.insert("section", HashSet::from(["class", "id"]));
        tag_attributes.insert(
            "span",
            HashSet::from(["class", "data-checked", "aria-hidden"]),
        );
        tag_attributes.insert("sup", HashSet::from(["class"]));
        tag_attributes.insert("td", HashSet::from(["class"]));
        tag_attributes.insert("th", HashSet::from(["class"]));

        Self {
            tags,
            tag_attributes,
            url_schemes: HashSet::from(["http", "https", "mailto"]),
            image_schemes: HashSet::from(["data"]),
        }
    }

    fn builder(&'static self) -> ammonia::Builder<'static> {
        let mut builder = ammonia::Builder::default();
        builder
            .tags(self.tags.clone())
            .tag_attributes(self.tag_attributes.clone())
            .generic_attributes(HashSet::new())
            // Union of the general and image-only schemes; the
            // attribute filter below narrows data: back to img[src].
            .url_schemes(self.url_schemes.union(&self.image_schemes).copied().collect())
            // rel handling happens in the anchor pass, conditionally on
            // absolute URLs, instead of ammonia's blanket rewrite.
            .link_rel(None)
            .attribute_filter(|element, attribute, value| {
                if matches!(attribute, "href" | "src") && !POLICY.scheme_allowed(element, value) {
                    return None;
                }
                Some(Cow::Borrowed(value))
            });
        builder
    }

    /// Scheme check for URL-bearing attributes. Relative URLs carry no
    /// scheme and are always allowed.
    fn scheme_allowed(&self, element: &str, value: &str) -> bool {
        let Some(scheme) = scheme_of(value) else {
            return true;
        };
        let scheme = scheme.to_ascii_lowercase();
        self.url_schemes.contains(scheme.as_str())
            || (element == "img" && self.image_schemes.contains(scheme.as_str()))
    }
}

fn scheme_of(value: &str) -> Option<&str> {
    let value = value.trim_start();
    let colon = value.find(':')?;
    let candidate = &value[..colon];
    if candidate.is_empty()
        || !candidate
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
    {
        return None;
    }
    Some(candidate)
}

/// Filters `html` against the policy and hardens outbound anchors.
///
/// Idempotent: sanitizing already-sanitized output is a no-op.
pub fn sanitize(html: &str) -> Result<String, Error> {
    let filtered = POLICY.builder().clean(html).to_string();
    rewrite_anchors(&filtered)
}

/// Rewrites every `<a>` with an absolute http(s) `href` so `rel`
/// contains both `noopener` and `noreferrer` (author tokens kept,
/// duplicates removed) and `target` defaults to a new tab. Relative and
/// local anchors are left untouched.
fn rewrite_anchors(html: &str) -> Result<String, Error> {
    let settings = RewriteStrSettings {
        element_content_handlers: vec![element!("a[href]", |el| {
            let href = el.get_attribute("href").unwrap_or_default();
            if is_absolute_http(&href) {
                let rel = merged_rel(el.get_attribute("rel").as_deref());
                el.set_attribute("rel", &rel)?;
                if el.get_attribute("target").is_none() {
                    el.set_attribute("target", "_blank")?;
                }
            }
            Ok(())
        })],
        ..RewriteStrSettings::default()
    };
    Ok(rewrite_str(html, settings)?)
}

fn is_absolute_http(href: &str) -> bool {
    let href = href.trim_start();
    ["http://", "https://"].iter().any(|prefix| {
        href.get(..prefix.len())
            .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
    })
}

fn merged_rel(existing: Option<&str>) -> String {
    let mut tokens: Vec<&str> = Vec::new();
    for token in existing
        .unwrap_or_default()
        .split_ascii_whitespace()
        .chain(["noopener", "noreferrer"])
    {
        if !tokens.contains(&token) {
            tokens.push(token);
        }
    }
    tokens.join(" ")
}
