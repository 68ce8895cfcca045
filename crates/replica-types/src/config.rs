//! Configuration types for Replica.
//!
//! `ReplicaConfig` mirrors `replica.toml`. Every section and field has a
//! default, so an empty (or missing) file yields a working setup.

use serde::{Deserialize, Serialize};

use crate::pipeline::StageKind;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReplicaConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub assets: AssetConfig,
    #[serde(default)]
    pub summarize: SummarizeConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub stages: StagesConfig,
    #[serde(default)]
    pub scraper: ScraperConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Allowed CORS origins. Empty means any origin.
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_cors_origins() -> Vec<String> {
    ["localhost", "127.0.0.1"]
        .iter()
        .flat_map(|host| {
            [3000u16, 3001, 3002, 8000]
                .iter()
                .map(move |port| format!("http://{host}:{port}"))
        })
        .collect()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: default_cors_origins(),
        }
    }
}

/// Where the generated project lives and how it is served.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_dir")]
    pub dir: String,
    /// URL prefix the output directory is mounted under.
    #[serde(default = "default_preview_prefix")]
    pub preview_prefix: String,
    #[serde(default = "default_document_name")]
    pub document_name: String,
}

fn default_output_dir() -> String {
    "cloned_project".to_string()
}

fn default_preview_prefix() -> String {
    "/preview".to_string()
}

fn default_document_name() -> String {
    "index.html".to_string()
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
            preview_prefix: default_preview_prefix(),
            document_name: default_document_name(),
        }
    }
}

impl OutputConfig {
    /// `preview_prefix` as an absolute mount path: one leading slash, no
    /// trailing slash, `/preview` when blank.
    pub fn preview_mount(&self) -> String {
        let trimmed = self.preview_prefix.trim_matches('/');
        if trimmed.is_empty() {
            default_preview_prefix()
        } else {
            format!("/{trimmed}")
        }
    }

    /// Preview URL for a file in the assets directory.
    pub fn asset_preview_path(&self, filename: &str) -> String {
        format!("{}/assets/{filename}", self.preview_mount())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetConfig {
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
    #[serde(default = "default_max_concurrent_fetches")]
    pub max_concurrent_fetches: usize,
    /// Extension used when the URL path carries none.
    #[serde(default = "default_extension")]
    pub default_extension: String,
    #[serde(default = "default_placeholder_width")]
    pub placeholder_width: u32,
    #[serde(default = "default_placeholder_height")]
    pub placeholder_height: u32,
    /// Font file for placeholder labels. Unset means a system sans-serif.
    #[serde(default)]
    pub placeholder_font: Option<String>,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_fetch_timeout_secs() -> u64 {
    10
}

fn default_max_concurrent_fetches() -> usize {
    4
}

fn default_extension() -> String {
    "png".to_string()
}

fn default_placeholder_width() -> u32 {
    800
}

fn default_placeholder_height() -> u32 {
    600
}

fn default_user_agent() -> String {
    concat!("replica/", env!("CARGO_PKG_VERSION")).to_string()
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            fetch_timeout_secs: default_fetch_timeout_secs(),
            max_concurrent_fetches: default_max_concurrent_fetches(),
            default_extension: default_extension(),
            placeholder_width: default_placeholder_width(),
            placeholder_height: default_placeholder_height(),
            placeholder_font: None,
            user_agent: default_user_agent(),
        }
    }
}

/// Windowed pre-summary of long markup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummarizeConfig {
    /// Characters per summarized window (roughly 3k tokens).
    #[serde(default = "default_window_chars")]
    pub window_chars: usize,
    /// Markup longer than this is summarized; shorter passes through.
    #[serde(default = "default_threshold_chars")]
    pub threshold_chars: usize,
    /// Length of the raw head and tail samples appended to the summary.
    #[serde(default = "default_sample_chars")]
    pub sample_chars: usize,
}

fn default_window_chars() -> usize {
    12_000
}

fn default_threshold_chars() -> usize {
    12_000
}

fn default_sample_chars() -> usize {
    2_000
}

impl Default for SummarizeConfig {
    fn default() -> Self {
        Self {
            window_chars: default_window_chars(),
            threshold_chars: default_threshold_chars(),
            sample_chars: default_sample_chars(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Environment variable holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default)]
    pub base_url: Option<String>,
    /// Upper bound on one stage's streaming call. Unset means unbounded.
    #[serde(default)]
    pub stage_timeout_secs: Option<u64>,
}

fn default_api_key_env() -> String {
    "ANTHROPIC_API_KEY".to_string()
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_api_key_env(),
            base_url: None,
            stage_timeout_secs: None,
        }
    }
}

/// Model selector and output budget for one stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageModelConfig {
    pub model: String,
    pub max_tokens: u32,
}

impl StageModelConfig {
    fn new(model: &str, max_tokens: u32) -> Self {
        Self {
            model: model.to_string(),
            max_tokens,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StagesConfig {
    #[serde(default = "default_summarize_stage")]
    pub summarize: StageModelConfig,
    #[serde(default = "default_analyze_stage")]
    pub analyze: StageModelConfig,
    #[serde(default = "default_generate_stage")]
    pub generate: StageModelConfig,
    #[serde(default = "default_repair_stage")]
    pub repair: StageModelConfig,
    #[serde(default = "default_modify_stage")]
    pub modify: StageModelConfig,
}

fn default_summarize_stage() -> StageModelConfig {
    StageModelConfig::new("claude-3-haiku-20240307", 512)
}

fn default_analyze_stage() -> StageModelConfig {
    StageModelConfig::new("claude-sonnet-4-20250514", 4096)
}

fn default_generate_stage() -> StageModelConfig {
    StageModelConfig::new("claude-sonnet-4-20250514", 4096)
}

fn default_repair_stage() -> StageModelConfig {
    StageModelConfig::new("claude-opus-4-20250514", 4096)
}

fn default_modify_stage() -> StageModelConfig {
    StageModelConfig::new("claude-3-opus-20240229", 8192)
}

impl Default for StagesConfig {
    fn default() -> Self {
        Self {
            summarize: default_summarize_stage(),
            analyze: default_analyze_stage(),
            generate: default_generate_stage(),
            repair: default_repair_stage(),
            modify: default_modify_stage(),
        }
    }
}

impl StagesConfig {
    pub fn for_stage(&self, kind: StageKind) -> &StageModelConfig {
        match kind {
            StageKind::Summarize => &self.summarize,
            StageKind::Analyze => &self.analyze,
            StageKind::Generate => &self.generate,
            StageKind::Repair => &self.repair,
            StageKind::Modify => &self.modify,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScraperConfig {
    #[serde(default = "default_scraper_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_scraper_timeout_secs() -> u64 {
    30
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_scraper_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TelemetryConfig {
    #[serde(default)]
    pub json_logs: bool,
    /// Export spans to stdout through OpenTelemetry.
    #[serde(default)]
    pub otel_stdout: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_toml_yields_defaults() {
        let config: ReplicaConfig = toml::from_str("").unwrap();
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.output.dir, "cloned_project");
        assert_eq!(config.assets.fetch_timeout_secs, 10);
        assert_eq!(config.summarize.window_chars, 12_000);
        assert_eq!(config.llm.api_key_env, "ANTHROPIC_API_KEY");
        assert!(config.llm.stage_timeout_secs.is_none());
        assert_eq!(config.stages.summarize.max_tokens, 512);
        assert!(!config.telemetry.json_logs);
    }

    #[test]
    fn test_default_cors_origins() {
        let origins = ServerConfig::default().cors_origins;
        assert_eq!(origins.len(), 8);
        assert!(origins.contains(&"http://localhost:3000".to_string()));
        assert!(origins.contains(&"http://127.0.0.1:8000".to_string()));
    }

    #[test]
    fn test_partial_sections_keep_other_defaults() {
        let toml_str = r#"
[server]
port = 9100

[stages.generate]
model = "claude-opus-4-20250514"
max_tokens = 8000

[llm]
stage_timeout_secs = 120
"#;
        let config: ReplicaConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.server.port, 9100);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.stages.generate.model, "claude-opus-4-20250514");
        assert_eq!(config.stages.generate.max_tokens, 8000);
        assert_eq!(config.stages.repair, default_repair_stage());
        assert_eq!(config.llm.stage_timeout_secs, Some(120));
    }

    #[test]
    fn test_for_stage_selects_section() {
        let stages = StagesConfig::default();
        assert_eq!(stages.for_stage(StageKind::Modify).max_tokens, 8192);
        assert_eq!(
            stages.for_stage(StageKind::Analyze).model,
            "claude-sonnet-4-20250514"
        );
    }

    #[test]
    fn test_asset_preview_path_trims_slash() {
        let mut output = OutputConfig::default();
        assert_eq!(output.asset_preview_path("a.png"), "/preview/assets/a.png");
        output.preview_prefix = "/preview/".to_string();
        assert_eq!(output.asset_preview_path("a.png"), "/preview/assets/a.png");
    }

    #[test]
    fn test_preview_mount_is_absolute() {
        let mut output = OutputConfig::default();
        for (prefix, mount) in [
            ("/preview", "/preview"),
            ("preview", "/preview"),
            ("preview/", "/preview"),
            ("site/out", "/site/out"),
            ("/", "/preview"),
            ("", "/preview"),
        ] {
            output.preview_prefix = prefix.to_string();
            assert_eq!(output.preview_mount(), mount, "prefix {prefix:?}");
        }
    }
}
