//! Script stripping for fetched markup.
//!
//! Markup is sanitized before any generation stage sees it: every
//! `<script ...>...</script>` region is removed, case-insensitively and
//! across line breaks. An unterminated script element is removed up to the
//! end of the document.

use std::sync::OnceLock;

use regex::Regex;

fn script_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?is)<script\b[^>]*>.*?(?:</script\s*>|\z)").expect("valid script regex")
    })
}

/// Remove every script element (opening tag, body, closing tag).
pub fn strip_scripts(markup: &str) -> String {
    script_regex().replace_all(markup, "").into_owned()
}
