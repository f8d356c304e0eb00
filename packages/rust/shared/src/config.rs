//! Application configuration for Transync.
//!
//! User config lives at `~/.transync/transync.toml`.
//! CLI flags override config file values, which override defaults.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, TransyncError};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "transync.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".transync";

// ---------------------------------------------------------------------------
// Config structs (matching transync.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Global defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Anthropic API settings for summarization.
    #[serde(default)]
    pub anthropic: AnthropicConfig,

    /// Memory store settings.
    #[serde(default)]
    pub memory: MemoryConfig,

    /// Owner mapping rules for the classifier.
    #[serde(default)]
    pub mapping: MappingConfig,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Default transcripts directory to scan.
    #[serde(default = "default_transcripts_dir")]
    pub transcripts_dir: String,

    /// Default tracker database path.
    #[serde(default = "default_db_path")]
    pub db_path: String,

    /// Maximum items to process per run. Absent means unlimited.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,

    /// Whether items recorded as `error` are retried on later runs.
    #[serde(default = "default_true")]
    pub retry_errors: bool,

    /// Per-stage timeout for collaborator calls, in seconds.
    #[serde(default = "default_stage_timeout")]
    pub stage_timeout_secs: u64,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            transcripts_dir: default_transcripts_dir(),
            db_path: default_db_path(),
            limit: None,
            retry_errors: default_true(),
            stage_timeout_secs: default_stage_timeout(),
        }
    }
}

fn default_transcripts_dir() -> String {
    "./transcripts".into()
}
fn default_db_path() -> String {
    "./transync.db".into()
}
fn default_true() -> bool {
    true
}
fn default_stage_timeout() -> u64 {
    120
}

/// `[anthropic]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnthropicConfig {
    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Model to use for transcript extraction.
    #[serde(default = "default_model")]
    pub model: String,

    /// Maximum tokens in the extraction response.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Maximum transcript chars sent per request; longer input is truncated.
    #[serde(default = "default_max_input_chars")]
    pub max_input_chars: usize,

    /// HTTP timeout in seconds for summarization calls.
    #[serde(default = "default_anthropic_timeout")]
    pub timeout_secs: u64,
}

impl Default for AnthropicConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_api_key_env(),
            model: default_model(),
            max_tokens: default_max_tokens(),
            max_input_chars: default_max_input_chars(),
            timeout_secs: default_anthropic_timeout(),
        }
    }
}

fn default_api_key_env() -> String {
    "ANTHROPIC_API_KEY".into()
}
fn default_model() -> String {
    "claude-3-haiku-20240307".into()
}
fn default_max_tokens() -> u32 {
    1024
}
fn default_max_input_chars() -> usize {
    50_000
}
fn default_anthropic_timeout() -> u64 {
    60
}

/// `[memory]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// Base URL of the memory service. When absent, publishes go through the
    /// logging placeholder store instead of a real backend.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    /// Entity kind assigned to newly created entities.
    #[serde(default = "default_entity_kind")]
    pub entity_kind: String,

    /// HTTP timeout in seconds for memory store calls.
    #[serde(default = "default_memory_timeout")]
    pub timeout_secs: u64,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            entity_kind: default_entity_kind(),
            timeout_secs: default_memory_timeout(),
        }
    }
}

fn default_entity_kind() -> String {
    "client".into()
}
fn default_memory_timeout() -> u64 {
    30
}

/// `[mapping]` section — classifier rules.
///
/// `groups` maps a meeting-series directory name to an owner exactly;
/// `patterns` is an *ordered* list of case-insensitive substring rules
/// applied to the file name when no group mapping matches. Earlier entries
/// take precedence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MappingConfig {
    /// Owner assigned when no rule matches.
    #[serde(default = "default_owner")]
    pub default_owner: String,

    /// Exact meeting-series → owner mapping.
    #[serde(default)]
    pub groups: HashMap<String, String>,

    /// Ordered substring rules applied to file names.
    #[serde(default)]
    pub patterns: Vec<PatternRule>,
}

impl Default for MappingConfig {
    fn default() -> Self {
        Self {
            default_owner: default_owner(),
            groups: HashMap::new(),
            patterns: Vec::new(),
        }
    }
}

fn default_owner() -> String {
    "Other".into()
}

/// One `[[mapping.patterns]]` entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternRule {
    /// Substring matched case-insensitively against the file name.
    pub pattern: String,
    /// Owner assigned on match.
    pub owner: String,
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.transync/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| TransyncError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.transync/transync.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| TransyncError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| TransyncError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| TransyncError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| TransyncError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| TransyncError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Check that the Anthropic API key env var is set and non-empty.
pub fn validate_api_key(config: &AppConfig) -> Result<()> {
    let var_name = &config.anthropic.api_key_env;
    match std::env::var(var_name) {
        Ok(val) if !val.is_empty() => Ok(()),
        _ => Err(TransyncError::config(format!(
            "Anthropic API key not found. Set the {var_name} environment variable."
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("transcripts_dir"));
        assert!(toml_str.contains("ANTHROPIC_API_KEY"));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.defaults.db_path, "./transync.db");
        assert!(parsed.defaults.retry_errors);
        assert_eq!(parsed.anthropic.api_key_env, "ANTHROPIC_API_KEY");
        assert_eq!(parsed.anthropic.max_input_chars, 50_000);
        assert_eq!(parsed.mapping.default_owner, "Other");
    }

    #[test]
    fn mapping_patterns_preserve_order() {
        let toml_str = r#"
[mapping]
default_owner = "Other"

[mapping.groups]
"Ambient_ Project" = "Asurion"
"AIT Consulting Weekly" = "AIT_Internal"

[[mapping.patterns]]
pattern = "asurion"
owner = "Asurion"

[[mapping.patterns]]
pattern = "weekly"
owner = "AIT_Internal"
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(
            config.mapping.groups.get("Ambient_ Project").map(String::as_str),
            Some("Asurion")
        );
        assert_eq!(config.mapping.patterns.len(), 2);
        assert_eq!(config.mapping.patterns[0].pattern, "asurion");
        assert_eq!(config.mapping.patterns[1].owner, "AIT_Internal");
    }

    #[test]
    fn memory_endpoint_optional() {
        let config: AppConfig = toml::from_str("").expect("parse empty");
        assert!(config.memory.endpoint.is_none());
        assert_eq!(config.memory.entity_kind, "client");
    }

    #[test]
    fn api_key_validation() {
        let mut config = AppConfig::default();
        // Use a unique env var name to avoid interfering with other tests
        config.anthropic.api_key_env = "TS_TEST_NONEXISTENT_KEY_98765".into();
        let result = validate_api_key(&config);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("API key not found"));
    }
}
