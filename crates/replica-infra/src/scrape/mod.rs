//! Page scraper adapters.

pub mod http;

pub use http::{HttpPageScraper, HttpScrapeSession};
