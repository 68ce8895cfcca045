//! Asset adapters: the HTTP downloader and the placeholder image renderer.

pub mod fetcher;
pub mod label;
pub mod placeholder;

pub use fetcher::HttpAssetFetcher;
pub use placeholder::ImagePlaceholderRenderer;
