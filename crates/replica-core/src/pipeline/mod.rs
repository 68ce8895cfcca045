//! Clone and modify orchestration.

pub mod clone;
pub mod modify;

use std::time::Duration;

use serde_json::{Value, json};

use replica_types::config::{ReplicaConfig, StagesConfig, SummarizeConfig};
use replica_types::error::PipelineError;
use replica_types::pipeline::{DesignContext, SectionNode};

use crate::asset::ResolverSettings;
use crate::stage::fences::strip_code_fences;

pub use clone::CloneOrchestrator;
pub use modify::{ModifyOrchestrator, ModifyOutcome};

/// Knobs shared by both orchestrators, derived from [`ReplicaConfig`].
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub stages: StagesConfig,
    pub summarize: SummarizeConfig,
    pub resolver: ResolverSettings,
    pub stage_timeout: Option<Duration>,
}

impl PipelineSettings {
    pub fn from_config(config: &ReplicaConfig) -> Self {
        Self {
            stages: config.stages.clone(),
            summarize: config.summarize.clone(),
            resolver: ResolverSettings::from_config(&config.output, &config.assets),
            stage_timeout: config.llm.stage_timeout_secs.map(Duration::from_secs),
        }
    }
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self::from_config(&ReplicaConfig::default())
    }
}

/// Parse the analysis stage's output into a section plan.
///
/// Accepts a bare JSON array or an object wrapping it under `sectionPlan`,
/// optionally inside a code fence.
pub fn parse_section_plan(text: &str) -> Result<Vec<SectionNode>, PipelineError> {
    let cleaned = strip_code_fences(text);
    let value: Value = serde_json::from_str(&cleaned)
        .map_err(|e| PipelineError::InvalidSectionPlan(e.to_string()))?;
    let plan = match value {
        Value::Object(mut obj) => obj.remove("sectionPlan").ok_or_else(|| {
            PipelineError::InvalidSectionPlan("expected a JSON array".to_string())
        })?,
        other => other,
    };
    serde_json::from_value(plan).map_err(|e| PipelineError::InvalidSectionPlan(e.to_string()))
}

/// User content for the analysis stage.
pub fn analysis_payload(ctx: &DesignContext) -> String {
    json!({ "designContext": ctx }).to_string()
}

/// User content for the generation stage.
pub fn generation_payload(plan: &[SectionNode], ctx: &DesignContext) -> String {
    json!({ "sectionPlan": plan, "designContext": ctx }).to_string()
}

/// User content for the modification stage.
pub fn modification_payload(instruction: &str, current: &str) -> String {
    format!("USER REQUEST: {instruction}\n\nCURRENT HTML:\n```html\n{current}\n```")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bare_array() {
        let plan = parse_section_plan(
            r#"[{"tag":"main","componentName":"Main","description":"d","children":[]}]"#,
        )
        .unwrap();
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].component_name, "Main");
    }

    #[test]
    fn parses_fenced_and_wrapped_plans() {
        let fenced = "```json\n[{\"tag\":\"footer\",\"componentName\":\"Footer\"}]\n```";
        assert_eq!(parse_section_plan(fenced).unwrap()[0].tag, "footer");

        let wrapped = r#"{"sectionPlan":[{"tag":"nav","componentName":"Nav"}]}"#;
        assert_eq!(parse_section_plan(wrapped).unwrap()[0].tag, "nav");
    }

    #[test]
    fn rejects_prose_and_wrong_shapes() {
        assert!(matches!(
            parse_section_plan("Sure! Here is the plan."),
            Err(PipelineError::InvalidSectionPlan(_))
        ));
        assert!(matches!(
            parse_section_plan(r#"{"sections":[]}"#),
            Err(PipelineError::InvalidSectionPlan(_))
        ));
        assert!(matches!(
            parse_section_plan(r#"[{"tag":"main"}]"#),
            Err(PipelineError::InvalidSectionPlan(_))
        ));
    }

    #[test]
    fn payload_shapes() {
        let ctx = DesignContext {
            page_url: "https://example.com".to_string(),
            ..Default::default()
        };
        let analysis: Value = serde_json::from_str(&analysis_payload(&ctx)).unwrap();
        assert_eq!(analysis["designContext"]["pageUrl"], "https://example.com");

        let plan = vec![SectionNode {
            tag: "main".to_string(),
            component_name: "Main".to_string(),
            description: String::new(),
            children: vec![],
        }];
        let generation: Value = serde_json::from_str(&generation_payload(&plan, &ctx)).unwrap();
        assert_eq!(generation["sectionPlan"][0]["componentName"], "Main");
        assert_eq!(generation["designContext"]["pageUrl"], "https://example.com");

        assert_eq!(
            modification_payload("make it blue", "<p></p>"),
            "USER REQUEST: make it blue\n\nCURRENT HTML:\n```html\n<p></p>\n```"
        );
    }

    #[test]
    fn settings_pick_up_stage_timeout() {
        let mut config = ReplicaConfig::default();
        assert!(PipelineSettings::from_config(&config).stage_timeout.is_none());
        config.llm.stage_timeout_secs = Some(90);
        assert_eq!(
            PipelineSettings::from_config(&config).stage_timeout,
            Some(Duration::from_secs(90))
        );
    }
}
