//! Browserless page scraper over plain HTTP.
//!
//! Fetches the served markup and derives a textual digest from it. There is
//! no rendering engine behind it, so screenshots are unsupported and the
//! markup is what the server sent rather than a live DOM.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;

use replica_core::asset::discovery::{ReferenceKind, discover_references};
use replica_core::scrape::{PageScraper, ScrapeSession};
use replica_types::config::ScraperConfig;
use replica_types::error::ScrapeError;

/// Element names counted in the page digest.
const COUNTED_ELEMENTS: &[&str] = &[
    "header", "nav", "main", "section", "article", "aside", "footer", "div", "h1", "h2", "h3",
    "p", "a", "img", "button", "form", "input", "ul", "table", "svg",
];

const MAX_COLORS: usize = 12;

fn regex(pattern: &'static str, desc: &'static str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|err| panic!("invalid {desc} regex: {err}"))
}

fn title_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| regex(r"(?is)<title\b[^>]*>(.*?)</title\s*>", "title"))
}

fn meta_description_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        regex(
            r#"(?is)<meta\b[^>]*\bname\s*=\s*["']?description["']?[^>]*\bcontent\s*=\s*["']([^"']*)["']"#,
            "meta description",
        )
    })
}

fn stylesheet_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        regex(
            r#"(?is)<link\b[^>]*\brel\s*=\s*["']?stylesheet["']?[^>]*\bhref\s*=\s*["']([^"']+)["']"#,
            "stylesheet link",
        )
    })
}

fn open_tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| regex(r"<([a-zA-Z][a-zA-Z0-9-]*)\b", "open tag"))
}

fn color_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        regex(
            r"(?i)#(?:[0-9a-f]{6}|[0-9a-f]{3})\b|rgba?\(\s*\d{1,3}\s*,\s*\d{1,3}\s*,\s*\d{1,3}\s*(?:,\s*[\d.]+\s*)?\)",
            "color literal",
        )
    })
}

/// Opens [`HttpScrapeSession`]s sharing one HTTP client.
#[derive(Debug, Clone)]
pub struct HttpPageScraper {
    client: reqwest::Client,
}

impl HttpPageScraper {
    pub fn new(config: &ScraperConfig) -> Result<Self, ScrapeError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| ScrapeError::Connection(e.to_string()))?;
        Ok(Self { client })
    }
}

impl PageScraper for HttpPageScraper {
    type Session = HttpScrapeSession;

    async fn connect(&self) -> Result<Self::Session, ScrapeError> {
        Ok(HttpScrapeSession {
            client: self.client.clone(),
            page: None,
        })
    }
}

/// The page most recently navigated to.
#[derive(Debug)]
struct LoadedPage {
    url: String,
    markup: String,
}

#[derive(Debug)]
pub struct HttpScrapeSession {
    client: reqwest::Client,
    page: Option<LoadedPage>,
}

impl HttpScrapeSession {
    async fn load(&mut self, url: &str) -> Result<&str, ScrapeError> {
        let loaded = self.page.as_ref().is_some_and(|page| page.url == url);
        if !loaded {
            self.navigate(url).await?;
        }
        self.page
            .as_ref()
            .map(|page| page.markup.as_str())
            .ok_or_else(|| ScrapeError::Other("no page loaded".to_string()))
    }
}

impl ScrapeSession for HttpScrapeSession {
    async fn navigate(&mut self, url: &str) -> Result<(), ScrapeError> {
        let navigation = |message: String| ScrapeError::Navigation {
            url: url.to_string(),
            message,
        };

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| navigation(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(navigation(format!("HTTP {status}")));
        }
        let markup = response.text().await.map_err(|e| navigation(e.to_string()))?;

        tracing::debug!(url, chars = markup.len(), "page fetched");
        self.page = Some(LoadedPage {
            url: url.to_string(),
            markup,
        });
        Ok(())
    }

    async fn screenshot(&mut self, _url: &str, _full_page: bool) -> Result<Vec<u8>, ScrapeError> {
        Err(ScrapeError::Unsupported("screenshot"))
    }

    async fn inspect_dom(
        &mut self,
        url: &str,
        selector: &str,
        _include_children: bool,
        _include_styles: bool,
    ) -> Result<String, ScrapeError> {
        let markup = self.load(url).await?;
        select_element(markup, selector)
            .map(str::to_string)
            .ok_or_else(|| ScrapeError::Other(format!("no element matches selector '{selector}'")))
    }

    async fn analyze_page(
        &mut self,
        url: &str,
        map_elements: bool,
        _full_page: bool,
    ) -> Result<String, ScrapeError> {
        let markup = self.load(url).await?;
        Ok(page_digest(url, markup, map_elements))
    }

    async fn disconnect(self) -> Result<(), ScrapeError> {
        Ok(())
    }
}

/// First element named by a bare tag selector, outer markup included.
///
/// `html` (or an empty selector) selects the whole document, since servers
/// may omit the element itself.
pub fn select_element<'a>(markup: &'a str, selector: &str) -> Option<&'a str> {
    let tag = selector.trim().to_ascii_lowercase();
    if tag.is_empty() || tag == "html" {
        return Some(markup);
    }
    if !tag.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
        return None;
    }

    let lower = markup.to_ascii_lowercase();
    let open = format!("<{tag}");
    let close = format!("</{tag}>");
    let mut from = 0;
    while let Some(offset) = lower[from..].find(&open) {
        let start = from + offset;
        let after = lower[start + open.len()..].chars().next();
        if matches!(after, Some(c) if c.is_whitespace() || c == '>' || c == '/') {
            let end = lower[start..]
                .find(&close)
                .map(|i| start + i + close.len())
                .unwrap_or(markup.len());
            return Some(&markup[start..end]);
        }
        from = start + open.len();
    }
    None
}

/// Plain-text summary of a page for the analysis stage.
pub fn page_digest(url: &str, markup: &str, map_elements: bool) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "url: {url}");

    let title = title_re()
        .captures(markup)
        .and_then(|c| c.get(1))
        .map(|m| collapse_whitespace(m.as_str()))
        .unwrap_or_default();
    let _ = writeln!(out, "title: {title}");

    if let Some(description) = meta_description_re().captures(markup).and_then(|c| c.get(1)) {
        let _ = writeln!(out, "description: {}", collapse_whitespace(description.as_str()));
    }

    if map_elements {
        let mut counts: BTreeMap<String, usize> = BTreeMap::new();
        for capture in open_tag_re().captures_iter(markup) {
            let name = capture[1].to_ascii_lowercase();
            if COUNTED_ELEMENTS.contains(&name.as_str()) {
                *counts.entry(name).or_insert(0) += 1;
            }
        }
        let listed: Vec<String> = COUNTED_ELEMENTS
            .iter()
            .filter_map(|name| counts.get(*name).map(|n| format!("{name}={n}")))
            .collect();
        let _ = writeln!(out, "elements: {}", listed.join(", "));
    }

    let stylesheets: Vec<&str> = stylesheet_re()
        .captures_iter(markup)
        .filter_map(|c| c.get(1).map(|m| m.as_str()))
        .collect();
    write_list(&mut out, "stylesheets", &stylesheets);

    let icons: Vec<String> = discover_references(markup)
        .into_iter()
        .filter(|r| r.kind == ReferenceKind::IconHref)
        .map(|r| r.decoded())
        .collect();
    let icon_refs: Vec<&str> = icons.iter().map(String::as_str).collect();
    write_list(&mut out, "icons", &icon_refs);

    let mut colors: BTreeMap<String, usize> = BTreeMap::new();
    for m in color_re().find_iter(markup) {
        let literal: String = m.as_str().chars().filter(|c| !c.is_whitespace()).collect();
        *colors.entry(literal.to_ascii_lowercase()).or_insert(0) += 1;
    }
    let mut ranked: Vec<(String, usize)> = colors.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    let listed: Vec<String> = ranked
        .into_iter()
        .take(MAX_COLORS)
        .map(|(color, n)| format!("{color} ({n})"))
        .collect();
    let _ = writeln!(out, "colors: {}", listed.join(", "));

    out
}

fn write_list(out: &mut String, label: &str, items: &[&str]) {
    if items.is_empty() {
        let _ = writeln!(out, "{label}: none");
        return;
    }
    let _ = writeln!(out, "{label}:");
    for item in items {
        let _ = writeln!(out, "- {item}");
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
