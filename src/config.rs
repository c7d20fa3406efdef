//! Configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main dayplan configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// LLM provider configuration
    pub llm: LlmConfig,

    /// Storage locations
    pub storage: StorageConfig,

    /// Planning loop behavior
    pub planning: PlanningConfig,
}

impl Config {
    /// Validate configuration before use
    ///
    /// Checks that the API key environment variable is set. Call this early
    /// in startup to fail fast with a clear message.
    pub fn validate(&self) -> Result<()> {
        if std::env::var(&self.llm.api_key_env).is_err() {
            return Err(eyre::eyre!(
                "LLM API key not found. Set the {} environment variable.",
                self.llm.api_key_env
            ));
        }
        Ok(())
    }

    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try project-local config: .dayplan.yml
        let local_config = PathBuf::from(".dayplan.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        // Try user config: ~/.config/dayplan/dayplan.yml
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("dayplan").join("dayplan.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        // No config file found, use defaults
        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}

/// LLM provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Provider name (currently only "openai" supported; any
    /// OpenAI-compatible endpoint works via base-url)
    pub provider: String,

    /// Model identifier
    pub model: String,

    /// Environment variable containing the API key
    #[serde(rename = "api-key-env")]
    pub api_key_env: String,

    /// API base URL
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Maximum tokens per response
    #[serde(rename = "max-tokens")]
    pub max_tokens: u32,

    /// Request timeout in milliseconds
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: "gpt-4o".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            base_url: "https://api.openai.com".to_string(),
            max_tokens: 8192,
            timeout_ms: 120_000,
        }
    }
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Root directory for sessions, profiles, and logs
    #[serde(rename = "data-dir")]
    pub data_dir: PathBuf,
}

impl StorageConfig {
    pub fn sessions_dir(&self) -> PathBuf {
        self.data_dir.join("sessions")
    }

    pub fn profiles_dir(&self) -> PathBuf {
        self.data_dir.join("profiles")
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.data_dir.join("logs")
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        // XDG data directory (~/.local/share/dayplan on Linux)
        let data_dir = dirs::data_dir()
            .map(|d| d.join("dayplan"))
            .unwrap_or_else(|| PathBuf::from(".dayplan"));

        Self { data_dir }
    }
}

/// Planning loop behavior
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanningConfig {
    /// Feedback phrases that accept the plan (case-insensitive)
    pub affirmations: Vec<String>,

    /// Minimum clarifying answers before a plan is generated
    ///
    /// Lowered to zero at runtime when the profile is rich enough.
    #[serde(rename = "min-answers")]
    pub min_answers: usize,

    /// Maximum priorities kept on a plan; extras from the generator are dropped
    #[serde(rename = "max-priorities")]
    pub max_priorities: usize,

    /// User key for the profile document
    #[serde(rename = "user-id")]
    pub user_id: String,
}

impl Default for PlanningConfig {
    fn default() -> Self {
        Self {
            affirmations: vec![
                "done".to_string(),
                "looks good".to_string(),
                "yes".to_string(),
                "perfect".to_string(),
                "accept".to_string(),
            ],
            min_answers: 1,
            max_priorities: 5,
            user_id: "default".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.llm.provider, "openai");
        assert_eq!(config.llm.api_key_env, "OPENAI_API_KEY");
        assert_eq!(config.planning.min_answers, 1);
        assert!(config.planning.affirmations.iter().any(|a| a == "looks good"));
    }

    #[test]
    fn test_deserialize_config() {
        let yaml = r#"
llm:
  provider: openai
  model: gpt-4o-mini
  api-key-env: MY_API_KEY
  base-url: https://llm.example.com
  max-tokens: 4096
  timeout-ms: 60000

storage:
  data-dir: /tmp/dayplan-test

planning:
  min-answers: 2
  affirmations: ["ship it"]
"#;

        let config: Config = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(config.llm.model, "gpt-4o-mini");
        assert_eq!(config.llm.api_key_env, "MY_API_KEY");
        assert_eq!(config.storage.data_dir, PathBuf::from("/tmp/dayplan-test"));
        assert_eq!(config.planning.min_answers, 2);
        assert_eq!(config.planning.affirmations, vec!["ship it"]);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let yaml = r#"
llm:
  model: gpt-4o-mini
"#;

        let config: Config = serde_yaml::from_str(yaml).unwrap();

        // Specified value
        assert_eq!(config.llm.model, "gpt-4o-mini");

        // Defaults for unspecified
        assert_eq!(config.llm.provider, "openai");
        assert_eq!(config.planning.user_id, "default");
    }

    #[test]
    fn test_storage_subdirs() {
        let storage = StorageConfig {
            data_dir: PathBuf::from("/data/dayplan"),
        };
        assert_eq!(storage.sessions_dir(), PathBuf::from("/data/dayplan/sessions"));
        assert_eq!(storage.profiles_dir(), PathBuf::from("/data/dayplan/profiles"));
    }
}
