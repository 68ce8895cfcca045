//! Asset resolution records.

use serde::{Deserialize, Serialize};
use std::fmt;

/// How a resolved asset ended up on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetOutcome {
    /// Claimed in the dedup map; the download has not finished yet.
    Pending,
    /// Remote bytes were written verbatim.
    Fetched,
    /// The fetch failed and a synthesized image was written instead.
    Placeholder,
}

impl fmt::Display for AssetOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetOutcome::Pending => write!(f, "pending"),
            AssetOutcome::Fetched => write!(f, "fetched"),
            AssetOutcome::Placeholder => write!(f, "placeholder"),
        }
    }
}

/// One remote asset, keyed by its resolved absolute URL.
///
/// A run holds at most one record per absolute URL; every reference string
/// that resolved to it is collected in `references`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetRecord {
    pub absolute_url: String,
    /// Reference strings as written in markup (possibly relative).
    pub references: Vec<String>,
    /// Hash-derived file name inside the assets directory.
    pub filename: String,
    /// Path the preview mount serves the file under.
    pub preview_path: String,
    pub outcome: AssetOutcome,
}

impl AssetRecord {
    pub fn new(
        absolute_url: impl Into<String>,
        filename: impl Into<String>,
        preview_path: impl Into<String>,
    ) -> Self {
        Self {
            absolute_url: absolute_url.into(),
            references: Vec::new(),
            filename: filename.into(),
            preview_path: preview_path.into(),
            outcome: AssetOutcome::Pending,
        }
    }

    /// Record another reference string for this asset, ignoring repeats.
    pub fn add_reference(&mut self, reference: &str) {
        if !self.references.iter().any(|r| r == reference) {
            self.references.push(reference.to_string());
        }
    }
}
