//! Configuration loader for Replica.
//!
//! Reads `replica.toml` and deserializes it into [`ReplicaConfig`]. Falls back
//! to defaults when no file is found or the file is malformed.

use std::path::{Path, PathBuf};

use secrecy::SecretString;

use replica_types::config::{LlmConfig, ReplicaConfig};

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "REPLICA_CONFIG";

const LOCAL_CONFIG: &str = "replica.toml";

/// Locate the config file.
///
/// Priority:
/// 1. `explicit` (the `--config` flag)
/// 2. `REPLICA_CONFIG` environment variable
/// 3. `./replica.toml`, if it exists
/// 4. `<platform config dir>/replica/config.toml`, if it exists
pub fn resolve_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    resolve_config_path_from(
        explicit,
        std::env::var(CONFIG_ENV).ok(),
        &cwd,
        dirs::config_dir(),
    )
}

fn resolve_config_path_from(
    explicit: Option<&Path>,
    env_value: Option<String>,
    cwd: &Path,
    platform_dir: Option<PathBuf>,
) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    if let Some(value) = env_value.filter(|v| !v.trim().is_empty()) {
        return Some(PathBuf::from(value));
    }
    let local = cwd.join(LOCAL_CONFIG);
    if local.is_file() {
        return Some(local);
    }
    platform_dir
        .map(|dir| dir.join("replica").join("config.toml"))
        .filter(|path| path.is_file())
}

/// Load configuration from `path`.
///
/// - `None`, or a file that does not exist, returns [`ReplicaConfig::default()`].
/// - A file that exists but fails to parse logs a warning and returns the default.
pub async fn load_config(path: Option<&Path>) -> ReplicaConfig {
    let Some(config_path) = path else {
        tracing::debug!("No config file found, using defaults");
        return ReplicaConfig::default();
    };

    let content = match tokio::fs::read_to_string(config_path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config at {}, using defaults", config_path.display());
            return ReplicaConfig::default();
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {err}, using defaults", config_path.display());
            return ReplicaConfig::default();
        }
    };

    match toml::from_str::<ReplicaConfig>(&content) {
        Ok(config) => {
            tracing::info!(path = %config_path.display(), "configuration loaded");
            config
        }
        Err(err) => {
            tracing::warn!(
                "Failed to parse {}: {err}, using defaults",
                config_path.display()
            );
            ReplicaConfig::default()
        }
    }
}

/// Read the API key from the environment variable named by `[llm].api_key_env`.
///
/// Empty values count as missing. The key never leaves a [`SecretString`].
pub fn resolve_api_key(config: &LlmConfig) -> Option<SecretString> {
    api_key_from(std::env::var(&config.api_key_env).ok())
}

fn api_key_from(value: Option<String>) -> Option<SecretString> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .map(SecretString::from)
}
