//! Configuration settings for Skrive.

use crate::completion::{ControllerConfig, ProviderConfig};
use crate::error::{Result, SkriveError};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub completion: CompletionSettings,
    /// Provider profiles. Tables in the file are merged over the built-in
    /// profiles of the same name.
    #[serde(deserialize_with = "merge_providers")]
    pub providers: BTreeMap<String, ProviderSettings>,
    pub notion: NotionSettings,
    pub prompts: PromptSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            general: GeneralSettings::default(),
            completion: CompletionSettings::default(),
            providers: default_providers(),
            notion: NotionSettings::default(),
            prompts: PromptSettings::default(),
        }
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Directory notes files are written to.
    pub notes_dir: String,
    /// Plain-text work queue, one transcript path or content id per line.
    pub queue_file: String,
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            notes_dir: "~/Notes/transcripts".to_string(),
            queue_file: "~/.skrive/queue.txt".to_string(),
            log_level: "warn".to_string(),
        }
    }
}

/// Chunking and retry behaviour for completion runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompletionSettings {
    /// Provider key into `[providers]`.
    pub provider: String,
    /// Share of the TPM limit one request may spend on input.
    pub safety_factor: f64,
    /// Characters of source text per token.
    pub chars_per_token: f64,
    /// Words repeated across chunk boundaries.
    pub overlap_words: usize,
    /// Rate-limit rejections tolerated per chunk.
    pub max_attempts_per_chunk: u32,
    /// Retries for network errors and unparseable rejections.
    pub max_transient_retries: u32,
    /// Backoff step between transient retries, in milliseconds.
    pub transient_backoff_ms: u64,
    /// Pause after a rate-limit rejection, in seconds.
    pub rate_limit_cooldown_secs: u64,
}

impl Default for CompletionSettings {
    fn default() -> Self {
        Self {
            provider: "groq".to_string(),
            safety_factor: 0.7,
            chars_per_token: 4.0,
            overlap_words: 50,
            max_attempts_per_chunk: 3,
            max_transient_retries: 3,
            transient_backoff_ms: 2_000,
            rate_limit_cooldown_secs: 20,
        }
    }
}

/// An OpenAI-compatible provider profile.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ProviderSettings {
    pub display_name: String,
    /// Environment variable holding the API key.
    pub api_key_env: String,
    pub endpoint_url: String,
    pub model: String,
    /// Published tokens-per-minute limit, used until the provider reports one.
    pub tpm_limit: u64,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub timeout_secs: u64,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            display_name: "OpenAI".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            endpoint_url: "https://api.openai.com/v1/chat/completions".to_string(),
            model: "gpt-4o-mini".to_string(),
            tpm_limit: 200_000,
            temperature: Some(0.3),
            max_tokens: None,
            timeout_secs: 300,
        }
    }
}

impl ProviderSettings {
    /// Connection details handed to the invoker.
    pub fn provider_config(&self) -> ProviderConfig {
        ProviderConfig {
            display_name: self.display_name.clone(),
            api_key_env: self.api_key_env.clone(),
            endpoint_url: self.endpoint_url.clone(),
            model: self.model.clone(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            timeout_secs: self.timeout_secs,
        }
    }
}

fn default_providers() -> BTreeMap<String, ProviderSettings> {
    let mut providers = BTreeMap::new();
    providers.insert(
        "groq".to_string(),
        ProviderSettings {
            display_name: "Groq".to_string(),
            api_key_env: "GROQ_API_KEY".to_string(),
            endpoint_url: "https://api.groq.com/openai/v1/chat/completions".to_string(),
            model: "llama-3.3-70b-versatile".to_string(),
            tpm_limit: 12_000,
            temperature: Some(0.3),
            max_tokens: Some(4_096),
            timeout_secs: 120,
        },
    );
    providers.insert("openai".to_string(), ProviderSettings::default());
    providers
}

/// A `[providers.<key>]` table as written in the config file.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ProviderTable {
    display_name: Option<String>,
    api_key_env: Option<String>,
    endpoint_url: Option<String>,
    model: Option<String>,
    tpm_limit: Option<u64>,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
    timeout_secs: Option<u64>,
}

impl ProviderTable {
    /// Fill the table over a built-in profile, or build a new profile.
    ///
    /// New profiles must name their endpoint, model and key variable.
    fn merge(self, key: &str, base: Option<ProviderSettings>) -> std::result::Result<ProviderSettings, String> {
        let base = match base {
            Some(base) => base,
            None => {
                let missing: Vec<&str> = [
                    ("api_key_env", self.api_key_env.is_none()),
                    ("endpoint_url", self.endpoint_url.is_none()),
                    ("model", self.model.is_none()),
                ]
                .into_iter()
                .filter_map(|(field, absent)| absent.then_some(field))
                .collect();
                if !missing.is_empty() {
                    return Err(format!(
                        "provider '{}' is missing {}",
                        key,
                        missing.join(", ")
                    ));
                }
                ProviderSettings {
                    display_name: key.to_string(),
                    ..ProviderSettings::default()
                }
            }
        };

        Ok(ProviderSettings {
            display_name: self.display_name.unwrap_or(base.display_name),
            api_key_env: self.api_key_env.unwrap_or(base.api_key_env),
            endpoint_url: self.endpoint_url.unwrap_or(base.endpoint_url),
            model: self.model.unwrap_or(base.model),
            tpm_limit: self.tpm_limit.unwrap_or(base.tpm_limit),
            temperature: self.temperature.or(base.temperature),
            max_tokens: self.max_tokens.or(base.max_tokens),
            timeout_secs: self.timeout_secs.unwrap_or(base.timeout_secs),
        })
    }
}

fn merge_providers<'de, D>(deserializer: D) -> std::result::Result<BTreeMap<String, ProviderSettings>, D::Error>
where
    D: Deserializer<'de>,
{
    let tables = BTreeMap::<String, ProviderTable>::deserialize(deserializer)?;
    let mut providers = default_providers();
    for (key, table) in tables {
        let base = providers.remove(&key);
        let merged = table.merge(&key, base).map_err(serde::de::Error::custom)?;
        providers.insert(key, merged);
    }
    Ok(providers)
}

/// Notion publishing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotionSettings {
    /// Environment variable holding the integration token.
    pub api_key_env: String,
    /// Target database id. Falls back to `database_id_env`.
    pub database_id: Option<String>,
    /// Environment variable holding the database id.
    pub database_id_env: String,
    /// Name of the database's title property.
    pub title_property: String,
    /// Also fill Video ID / Channel / Duration / URL / Provider properties.
    pub metadata_properties: bool,
}

impl Default for NotionSettings {
    fn default() -> Self {
        Self {
            api_key_env: "NOTION_API_KEY".to_string(),
            database_id: None,
            database_id_env: "NOTION_DATABASE_ID".to_string(),
            title_property: "Name".to_string(),
            metadata_properties: true,
        }
    }
}

impl NotionSettings {
    /// Database id from config, or from the environment.
    pub fn resolve_database_id(&self) -> Option<String> {
        self.database_id
            .clone()
            .filter(|id| !id.trim().is_empty())
            .or_else(|| std::env::var(&self.database_id_env).ok())
            .filter(|id| !id.trim().is_empty())
    }
}

/// Prompt customization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct PromptSettings {
    /// Directory for custom prompts (overrides defaults).
    pub custom_dir: Option<String>,
    /// Custom variables available in all prompts as {{variable_name}}.
    pub variables: std::collections::HashMap<String, String>,
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&PathBuf>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let settings: Settings = toml::from_str(&content)?;
            Ok(settings)
        } else {
            Ok(Settings::default())
        }
    }

    /// Save settings to the default configuration file.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::default_config_path())
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self).map_err(|e| SkriveError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("skrive")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Get the expanded notes directory path.
    pub fn notes_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.notes_dir)
    }

    /// Get the expanded queue file path.
    pub fn queue_file(&self) -> PathBuf {
        Self::expand_path(&self.general.queue_file)
    }

    /// Look up a provider profile, defaulting to `completion.provider`.
    pub fn provider(&self, key: Option<&str>) -> Result<(&str, &ProviderSettings)> {
        let key = key.unwrap_or(&self.completion.provider);
        self.providers
            .get_key_value(key)
            .map(|(k, v)| (k.as_str(), v))
            .ok_or_else(|| {
                let known: Vec<&str> = self.providers.keys().map(String::as_str).collect();
                SkriveError::Config(format!(
                    "Unknown provider '{}'. Configured providers: {}",
                    key,
                    known.join(", ")
                ))
            })
    }

    /// Controller tuning for a provider.
    pub fn controller_config(&self, provider: &ProviderSettings) -> ControllerConfig {
        ControllerConfig {
            assumed_limit: provider.tpm_limit,
            safety_factor: self.completion.safety_factor,
            chars_per_token: self.completion.chars_per_token,
            max_attempts_per_chunk: self.completion.max_attempts_per_chunk,
            overlap_word_count: self.completion.overlap_words,
            max_transient_retries: self.completion.max_transient_retries,
            transient_backoff: Duration::from_millis(self.completion.transient_backoff_ms),
            rate_limit_cooldown: Duration::from_secs(self.completion.rate_limit_cooldown_secs),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_include_groq_and_openai() {
        let settings = Settings::default();
        let (key, groq) = settings.provider(None).unwrap();

        assert_eq!(key, "groq");
        assert_eq!(groq.tpm_limit, 12_000);
        assert_eq!(groq.api_key_env, "GROQ_API_KEY");
        assert!(settings.provider(Some("openai")).is_ok());
    }

    #[test]
    fn test_unknown_provider_lists_known_keys() {
        let err = Settings::default().provider(Some("nope")).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("nope"));
        assert!(message.contains("groq"));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let settings: Settings = toml::from_str(
            r#"
            [completion]
            provider = "local"
            overlap_words = 20

            [providers.local]
            display_name = "Local"
            api_key_env = "LOCAL_LLM_KEY"
            endpoint_url = "http://localhost:8080/v1/chat/completions"
            model = "llama3"
            tpm_limit = 6000
            "#,
        )
        .unwrap();

        assert_eq!(settings.completion.overlap_words, 20);
        assert_eq!(settings.completion.safety_factor, 0.7);

        let (_, local) = settings.provider(None).unwrap();
        assert_eq!(local.tpm_limit, 6_000);
        assert_eq!(local.api_key_env, "LOCAL_LLM_KEY");

        let config = settings.controller_config(local);
        assert_eq!(config.assumed_limit, 6_000);
        assert_eq!(config.overlap_word_count, 20);
    }

    #[test]
    fn test_partial_builtin_provider_keeps_its_own_values() {
        let settings: Settings = toml::from_str("[providers.groq]\ntpm_limit = 6000\n").unwrap();

        let (_, groq) = settings.provider(Some("groq")).unwrap();
        assert_eq!(groq.tpm_limit, 6_000);
        assert_eq!(groq.api_key_env, "GROQ_API_KEY");
        assert_eq!(groq.endpoint_url, "https://api.groq.com/openai/v1/chat/completions");
        assert_eq!(groq.model, "llama-3.3-70b-versatile");
        assert_eq!(settings.provider(Some("openai")).unwrap().1, &ProviderSettings::default());
    }

    #[test]
    fn test_custom_provider_keeps_builtin_profiles() {
        let settings: Settings = toml::from_str(
            r#"
            [providers.local]
            api_key_env = "LOCAL_LLM_KEY"
            endpoint_url = "http://localhost:8080/v1/chat/completions"
            model = "llama3"
            "#,
        )
        .unwrap();

        let (key, groq) = settings.provider(None).unwrap();
        assert_eq!(key, "groq");
        assert_eq!(groq.api_key_env, "GROQ_API_KEY");
        assert!(settings.provider(Some("openai")).is_ok());
        assert_eq!(settings.provider(Some("local")).unwrap().1.display_name, "local");
    }

    #[test]
    fn test_custom_provider_requires_connection_fields() {
        let err = toml::from_str::<Settings>("[providers.local]\nmodel = \"llama3\"\n").unwrap_err();
        let message = err.to_string();
        assert!(message.contains("provider 'local' is missing api_key_env, endpoint_url"));
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut settings = Settings::default();
        settings.notion.title_property = "Title".to_string();
        settings.save_to(&path).unwrap();

        let loaded = Settings::load_from(Some(&path)).unwrap();
        assert_eq!(loaded.notion.title_property, "Title");
        assert_eq!(loaded.providers, settings.providers);
    }

    #[test]
    fn test_database_id_from_config() {
        let notion = NotionSettings {
            database_id: Some("abc123".to_string()),
            ..NotionSettings::default()
        };
        assert_eq!(notion.resolve_database_id(), Some("abc123".to_string()));
    }
}
