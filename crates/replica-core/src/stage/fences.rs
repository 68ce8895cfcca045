//! Code-fence stripping for model output that should be a bare document.

use std::sync::OnceLock;

use regex::Regex;

fn wrapped_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?s)\A```[A-Za-z0-9_-]*[ \t]*\r?\n(.*?)\r?\n?```\z").expect("valid fence regex")
    })
}

fn html_block_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)```html\r?\n(.*?)\r?\n```").expect("valid fence regex"))
}

/// Remove markdown code fences around (or inside) a response.
///
/// A response that is entirely one fenced block is unwrapped. Otherwise any
/// embedded ```` ```html ```` blocks are replaced by their contents. The result
/// is trimmed.
pub fn strip_code_fences(text: &str) -> String {
    let trimmed = text.trim();
    if let Some(caps) = wrapped_regex().captures(trimmed) {
        if let Some(body) = caps.get(1) {
            return body.as_str().trim().to_string();
        }
    }
    html_block_regex()
        .replace_all(trimmed, "$1")
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unwraps_html_fence() {
        let text = "```html\n<html><body>hi</body></html>\n```";
        assert_eq!(strip_code_fences(text), "<html><body>hi</body></html>");
    }

    #[test]
    fn unwraps_bare_and_json_fences() {
        assert_eq!(strip_code_fences("```\n<p>x</p>\n```\n"), "<p>x</p>");
        assert_eq!(strip_code_fences("  ```json\n[1]\n```  "), "[1]");
    }

    #[test]
    fn replaces_embedded_html_block() {
        let text = "Here you go:\n```html\n<p>x</p>\n```";
        assert_eq!(strip_code_fences(text), "Here you go:\n<p>x</p>");
    }

    #[test]
    fn unfenced_text_is_only_trimmed() {
        assert_eq!(strip_code_fences("\n  <html></html>\n"), "<html></html>");
    }

    #[test]
    fn keeps_multiline_bodies_intact() {
        let text = "```html\n<html>\n  <body>\n  </body>\n</html>\n```";
        assert_eq!(
            strip_code_fences(text),
            "<html>\n  <body>\n  </body>\n</html>"
        );
    }
}
