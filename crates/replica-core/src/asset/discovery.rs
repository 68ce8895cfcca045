//! Regex-based discovery of image references in markup.
//!
//! Finds `img[src]` and `link[rel~=icon][href]` values together with the
//! byte range of each value, so a caller can rewrite the markup in place
//! without reparsing it. Best-effort: attribute values containing `>` are not
//! supported.

use std::ops::Range;
use std::sync::OnceLock;

use regex::{Captures, Regex};

/// Which attribute a reference was found in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceKind {
    ImageSrc,
    IconHref,
}

/// One asset reference as it appears in the markup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetReference {
    pub kind: ReferenceKind,
    /// Attribute value exactly as written.
    pub raw: String,
    /// Byte range of the value (inside any quotes) in the scanned markup.
    pub span: Range<usize>,
}

impl AssetReference {
    /// Attribute value with `&amp;` decoded, ready for URL resolution.
    pub fn decoded(&self) -> String {
        self.raw.trim().replace("&amp;", "&")
    }

    pub fn is_data_uri(&self) -> bool {
        self.raw.trim_start().to_ascii_lowercase().starts_with("data:")
    }
}

fn regex(pattern: &'static str, desc: &'static str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|err| panic!("invalid {desc} regex: {err}"))
}

fn img_tag() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| regex(r"(?is)<img\b[^>]*>", "img tag"))
}

fn link_tag() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| regex(r"(?is)<link\b[^>]*>", "link tag"))
}

fn attr_src() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        regex(
            r#"(?is)\ssrc\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+))"#,
            "src attr",
        )
    })
}

fn attr_rel() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        regex(
            r#"(?is)\srel\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+))"#,
            "rel attr",
        )
    })
}

fn attr_href() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        regex(
            r#"(?is)\shref\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+))"#,
            "href attr",
        )
    })
}

fn capture_first<'t>(caps: &Captures<'t>, groups: &[usize]) -> Option<regex::Match<'t>> {
    groups.iter().find_map(|idx| caps.get(*idx))
}

fn rel_is_icon(rel: &str) -> bool {
    rel.split_whitespace()
        .any(|token| token.to_ascii_lowercase().contains("icon"))
}

/// Every non-empty image and icon reference, in document order.
pub fn discover_references(markup: &str) -> Vec<AssetReference> {
    let mut out = Vec::new();

    for tag in img_tag().find_iter(markup) {
        let Some(caps) = attr_src().captures(tag.as_str()) else {
            continue;
        };
        let Some(value) = capture_first(&caps, &[1, 2, 3]) else {
            continue;
        };
        if value.as_str().trim().is_empty() {
            continue;
        }
        out.push(AssetReference {
            kind: ReferenceKind::ImageSrc,
            raw: value.as_str().to_string(),
            span: tag.start() + value.start()..tag.start() + value.end(),
        });
    }

    for tag in link_tag().find_iter(markup) {
        let rel = attr_rel()
            .captures(tag.as_str())
            .and_then(|c| capture_first(&c, &[1, 2, 3]).map(|m| m.as_str()))
            .unwrap_or("");
        if !rel_is_icon(rel) {
            continue;
        }
        let Some(caps) = attr_href().captures(tag.as_str()) else {
            continue;
        };
        let Some(value) = capture_first(&caps, &[1, 2, 3]) else {
            continue;
        };
        if value.as_str().trim().is_empty() {
            continue;
        }
        out.push(AssetReference {
            kind: ReferenceKind::IconHref,
            raw: value.as_str().to_string(),
            span: tag.start() + value.start()..tag.start() + value.end(),
        });
    }

    out.sort_by_key(|r| r.span.start);
    out
}

/// Replace reference values in `markup` using `replacement`.
///
/// References for which `replacement` returns `None` are left as written.
/// Spans must come from [`discover_references`] on the same markup.
pub fn rewrite_references<F>(markup: &str, references: &[AssetReference], replacement: F) -> String
where
    F: Fn(&AssetReference) -> Option<String>,
{
    let mut out = String::with_capacity(markup.len());
    let mut cursor = 0;
    for reference in references {
        if reference.span.start < cursor {
            continue;
        }
        let Some(new_value) = replacement(reference) else {
            continue;
        };
        out.push_str(&markup[cursor..reference.span.start]);
        out.push_str(&new_value);
        cursor = reference.span.end;
    }
    out.push_str(&markup[cursor..]);
    out
}
