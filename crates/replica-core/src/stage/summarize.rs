//! Windowed pre-summary of long markup.
//!
//! Long markup is cut into fixed-size character windows, each window is
//! summarized independently, and the summaries are followed by a literal head
//! and tail sample of the original so later stages keep some ground truth.

use replica_types::config::SummarizeConfig;
use replica_types::error::PipelineError;

use super::GenerationStage;
use crate::event::EventChannel;

/// Marker separating the summaries from the raw sample.
pub const RAW_SAMPLE_MARKER: &str = "\n\nRAW_SAMPLE:\n";

/// Whether `markup` is long enough to need summarizing.
pub fn needs_summary(markup: &str, settings: &SummarizeConfig) -> bool {
    markup.chars().count() > settings.threshold_chars
}

/// Split into consecutive windows of at most `window_chars` characters.
pub fn split_windows(text: &str, window_chars: usize) -> Vec<&str> {
    let window = window_chars.max(1);
    let mut windows = Vec::new();
    let mut start = 0;
    let mut count = 0;
    for (idx, _) in text.char_indices() {
        if count == window {
            windows.push(&text[start..idx]);
            start = idx;
            count = 0;
        }
        count += 1;
    }
    if start < text.len() {
        windows.push(&text[start..]);
    }
    windows
}

fn head_chars(text: &str, n: usize) -> &str {
    match text.char_indices().nth(n) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

fn tail_chars(text: &str, n: usize) -> &str {
    if n == 0 {
        return "";
    }
    match text.char_indices().rev().nth(n - 1) {
        Some((idx, _)) => &text[idx..],
        None => text,
    }
}

/// First and last `sample_chars` characters joined by an ellipsis line.
pub fn raw_sample(text: &str, sample_chars: usize) -> String {
    format!(
        "{}\n...\n{}",
        head_chars(text, sample_chars),
        tail_chars(text, sample_chars)
    )
}

/// Join per-window summaries and append the raw sample.
pub fn assemble_summary(summaries: &[String], original: &str, sample_chars: usize) -> String {
    let joined = summaries
        .iter()
        .map(|s| s.trim())
        .collect::<Vec<_>>()
        .join("\n\n");
    format!("{joined}{RAW_SAMPLE_MARKER}{}", raw_sample(original, sample_chars))
}

/// Summarize stage driver.
pub struct Summarizer<'a> {
    stage: GenerationStage<'a>,
    settings: SummarizeConfig,
}

impl<'a> Summarizer<'a> {
    pub fn new(stage: GenerationStage<'a>, settings: SummarizeConfig) -> Self {
        Self { stage, settings }
    }

    /// Summarize `markup` if it exceeds the threshold; otherwise return it
    /// untouched.
    #[tracing::instrument(name = "stage.summarize", skip_all, fields(chars = markup.len()))]
    pub async fn summarize(&self, markup: &str, channel: &EventChannel) -> Result<String, PipelineError> {
        if !needs_summary(markup, &self.settings) {
            tracing::debug!("markup below summary threshold, passing through");
            return Ok(markup.to_string());
        }

        let windows = split_windows(markup, self.settings.window_chars);
        let mut summaries = Vec::with_capacity(windows.len());
        for (index, window) in windows.iter().enumerate() {
            channel
                .log(format!("Summarizing DOM chunk {}/{}...", index + 1, windows.len()))
                .await?;
            summaries.push(self.stage.run(window, channel).await?);
        }
        Ok(assemble_summary(&summaries, markup, self.settings.sample_chars))
    }
}
