//! Clone run lifecycle and the design context threaded through it.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::PipelineError;

/// Lifecycle status of a clone run.
///
/// `Idle -> Generating -> {Ready, Error}`; the last two are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Idle,
    Generating,
    Ready,
    Error,
}

impl RunStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, RunStatus::Ready | RunStatus::Error)
    }

    /// Whether `self -> next` is a legal transition.
    pub fn can_transition_to(self, next: RunStatus) -> bool {
        matches!(
            (self, next),
            (RunStatus::Idle, RunStatus::Generating)
                | (RunStatus::Generating, RunStatus::Ready)
                | (RunStatus::Generating, RunStatus::Error)
        )
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunStatus::Idle => write!(f, "idle"),
            RunStatus::Generating => write!(f, "generating"),
            RunStatus::Ready => write!(f, "ready"),
            RunStatus::Error => write!(f, "error"),
        }
    }
}

impl FromStr for RunStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "idle" => Ok(RunStatus::Idle),
            "generating" => Ok(RunStatus::Generating),
            "ready" => Ok(RunStatus::Ready),
            "error" => Ok(RunStatus::Error),
            other => Err(format!("invalid run status: '{other}'")),
        }
    }
}

/// One clone execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineRun {
    pub id: Uuid,
    pub target_url: String,
    pub status: RunStatus,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    /// Final markup, set once the artifact write succeeded.
    pub final_markup: Option<String>,
}

impl PipelineRun {
    pub fn new(target_url: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7(),
            target_url: target_url.into(),
            status: RunStatus::Idle,
            started_at: Utc::now(),
            finished_at: None,
            final_markup: None,
        }
    }

    /// Move to `next`, rejecting anything the state machine does not allow.
    pub fn transition(&mut self, next: RunStatus) -> Result<(), PipelineError> {
        if !self.status.can_transition_to(next) {
            return Err(PipelineError::InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        if next.is_terminal() {
            self.finished_at = Some(Utc::now());
        }
        Ok(())
    }
}

/// Accumulator threaded through one clone run.
///
/// Serialized (camelCase) into the analysis and generation prompts. Not
/// persisted: it is dropped once the artifact is written.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DesignContext {
    pub page_url: String,
    /// Base64 screenshot, when the scraper could provide one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub viewport_screenshot: Option<String>,
    /// Sanitized markup, later replaced by its summary for long pages.
    pub dom_tree: String,
    pub analysis: String,
    /// Remote reference (absolute or as written) -> local preview path.
    pub assets: BTreeMap<String, String>,
}

/// One node of the section plan produced by the analysis stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionNode {
    pub tag: String,
    pub component_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub children: Vec<SectionNode>,
}

impl SectionNode {
    /// Number of nodes in this subtree, including `self`.
    pub fn count(&self) -> usize {
        1 + self.children.iter().map(SectionNode::count).sum::<usize>()
    }
}

/// Which generation stage is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageKind {
    Summarize,
    Analyze,
    Generate,
    Repair,
    Modify,
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageKind::Summarize => write!(f, "summarize"),
            StageKind::Analyze => write!(f, "analyze"),
            StageKind::Generate => write!(f, "generate"),
            StageKind::Repair => write!(f, "repair"),
            StageKind::Modify => write!(f, "modify"),
        }
    }
}
