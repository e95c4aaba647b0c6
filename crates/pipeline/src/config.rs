use llm::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use story::ValidationPolicy;

use crate::error::ConfigurationError;

/// Environment variables checked for the API key, in order.
pub const API_KEY_VARS: [&str; 2] = ["GROQ_API_KEY", "groq_api_key"];

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub model: ModelConfig,
    pub retry: RetryConfig,
    /// Responses parsed per structured call before giving up
    pub schema_attempts: usize,
    pub validation: ValidationPolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_retries: usize,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            base_url: llm::groq::DEFAULT_BASE_URL.to_string(),
            model: llm::groq::DEFAULT_MODEL.to_string(),
            temperature: 0.7,
            request_timeout_secs: 60,
        }
    }
}

impl ModelConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff_ms: 1000,
            max_backoff_ms: 10000,
        }
    }
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_retries, self.initial_backoff_ms, self.max_backoff_ms)
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            model: ModelConfig::default(),
            retry: RetryConfig::default(),
            schema_attempts: 3,
            validation: ValidationPolicy::default(),
        }
    }
}

impl PipelineConfig {
    pub fn fast() -> Self {
        Self {
            model: ModelConfig {
                request_timeout_secs: 30,
                ..ModelConfig::default()
            },
            retry: RetryConfig {
                max_retries: 2,
                initial_backoff_ms: 500,
                max_backoff_ms: 5000,
            },
            schema_attempts: 2,
            validation: ValidationPolicy {
                semantic_retries: 0,
                ..ValidationPolicy::default()
            },
        }
    }

    pub fn thorough() -> Self {
        Self {
            model: ModelConfig {
                request_timeout_secs: 120,
                ..ModelConfig::default()
            },
            retry: RetryConfig {
                max_retries: 5,
                initial_backoff_ms: 2000,
                max_backoff_ms: 20000,
            },
            schema_attempts: 4,
            validation: ValidationPolicy {
                semantic_retries: 2,
                ..ValidationPolicy::default()
            },
        }
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigurationError> {
        let config: Self =
            toml::from_str(raw).map_err(|e| ConfigurationError::InvalidConfig(e.to_string()))?;
        config.check()?;
        Ok(config)
    }

    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigurationError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            ConfigurationError::InvalidConfig(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&raw)
    }

    pub fn check(&self) -> Result<(), ConfigurationError> {
        if self.schema_attempts == 0 {
            return Err(ConfigurationError::InvalidConfig(
                "schema_attempts must be at least 1".to_string(),
            ));
        }
        if self.model.request_timeout_secs == 0 {
            return Err(ConfigurationError::InvalidConfig(
                "model.request_timeout_secs must be at least 1".to_string(),
            ));
        }
        if self.model.model.trim().is_empty() {
            return Err(ConfigurationError::InvalidConfig("model.model is empty".to_string()));
        }
        Ok(())
    }
}

/// API key for the model endpoint. Never printed.
#[derive(Clone)]
pub struct Credential(String);

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Credential([REDACTED])")
    }
}

impl Credential {
    pub fn new(key: impl Into<String>) -> Result<Self, ConfigurationError> {
        let key = key.into();
        if key.trim().is_empty() {
            return Err(ConfigurationError::MissingCredential);
        }
        Ok(Self(key.trim().to_string()))
    }

    pub fn from_env() -> Result<Self, ConfigurationError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// An explicit key wins over the environment.
    pub fn resolve(explicit: Option<&str>) -> Result<Self, ConfigurationError> {
        match explicit {
            Some(key) => Self::new(key),
            None => Self::from_env(),
        }
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigurationError>
    where
        F: Fn(&str) -> Option<String>,
    {
        API_KEY_VARS
            .iter()
            .filter_map(|name| lookup(name))
            .find(|value| !value.trim().is_empty())
            .map_or(Err(ConfigurationError::MissingCredential), Self::new)
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use story::ProtagonistRule;

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = PipelineConfig::from_toml_str(
            r#"
            schema_attempts = 5

            [model]
            model = "llama-3.1-8b-instant"

            [validation]
            protagonist = "at_least_one"
            min_words = 800
            "#,
        )
        .unwrap();

        assert_eq!(config.schema_attempts, 5);
        assert_eq!(config.model.model, "llama-3.1-8b-instant");
        assert_eq!(config.model.base_url, llm::groq::DEFAULT_BASE_URL);
        assert_eq!(config.validation.protagonist, ProtagonistRule::AtLeastOne);
        assert_eq!(config.validation.min_words, 800);
        assert_eq!(config.validation.min_plot_beats, 3);
        assert_eq!(config.retry.max_retries, 3);
    }

    #[test]
    fn test_zero_schema_attempts_is_invalid() {
        let err = PipelineConfig::from_toml_str("schema_attempts = 0").unwrap_err();
        assert!(matches!(err, ConfigurationError::InvalidConfig(_)));
    }

    #[test]
    fn test_presets_differ_in_budget() {
        assert!(PipelineConfig::fast().retry.max_retries < PipelineConfig::thorough().retry.max_retries);
        assert_eq!(PipelineConfig::fast().validation.semantic_retries, 0);
    }

    #[test]
    fn test_credential_lookup_order() {
        let credential = Credential::from_lookup(|name| match name {
            "GROQ_API_KEY" => Some("  ".to_string()),
            "groq_api_key" => Some("lower-key".to_string()),
            _ => None,
        })
        .unwrap();
        assert_eq!(credential.expose(), "lower-key");
    }

    #[test]
    fn test_missing_credential() {
        let err = Credential::from_lookup(|_| None).unwrap_err();
        assert!(matches!(err, ConfigurationError::MissingCredential));
    }

    #[test]
    fn test_explicit_credential_wins() {
        let credential = Credential::resolve(Some("cli-key")).unwrap();
        assert_eq!(credential.expose(), "cli-key");
        assert_eq!(format!("{:?}", credential), "Credential([REDACTED])");
        assert!(Credential::resolve(Some("")).is_err());
    }
}
