//! Asset resolution: discover image references, download each distinct
//! remote asset once per run, and substitute local preview paths.

pub mod discovery;
pub mod fetcher;
pub mod resolver;

pub use fetcher::{AssetFetcher, PlaceholderRenderer};
pub use resolver::{AssetResolver, ResolvePass, ResolverSettings};
