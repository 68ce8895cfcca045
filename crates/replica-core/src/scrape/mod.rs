//! Page-scraping boundary.
//!
//! The orchestrator drives a scraper through one session per run and treats
//! every result as an opaque blob: markup text, a screenshot, an analysis
//! digest. Implementations live in replica-infra (e.g., `HttpPageScraper`).

use replica_types::error::ScrapeError;

/// Opens scrape sessions.
pub trait PageScraper: Send + Sync {
    type Session: ScrapeSession;

    fn connect(
        &self,
    ) -> impl std::future::Future<Output = Result<Self::Session, ScrapeError>> + Send;
}

/// One connected scrape session.
///
/// `disconnect` consumes the session; the orchestrator calls it whether or
/// not the scrape calls succeeded.
pub trait ScrapeSession: Send {
    fn navigate(
        &mut self,
        url: &str,
    ) -> impl std::future::Future<Output = Result<(), ScrapeError>> + Send;

    /// Raw image bytes. `ScrapeError::Unsupported` means "no screenshot".
    fn screenshot(
        &mut self,
        url: &str,
        full_page: bool,
    ) -> impl std::future::Future<Output = Result<Vec<u8>, ScrapeError>> + Send;

    /// Markup of the element(s) matching `selector`.
    fn inspect_dom(
        &mut self,
        url: &str,
        selector: &str,
        include_children: bool,
        include_styles: bool,
    ) -> impl std::future::Future<Output = Result<String, ScrapeError>> + Send;

    /// Free-form textual analysis of the page.
    fn analyze_page(
        &mut self,
        url: &str,
        map_elements: bool,
        full_page: bool,
    ) -> impl std::future::Future<Output = Result<String, ScrapeError>> + Send;

    fn disconnect(self) -> impl std::future::Future<Output = Result<(), ScrapeError>> + Send;
}
