//! TOML configuration.
//!
//! The whole application is driven by one [`Config`] value, loaded once at
//! startup by [`load_config`] and handed by reference to the adapters, the
//! manager and the recommendation engine.
//!
//! ```toml
//! [emby]
//! url = "http://emby.local:8096"
//! api_key = "..."
//!
//! [booklore]
//! url = "http://booklore.local:6060"
//!
//! [llm]
//! provider = "openai"
//! model = "gpt-4o-mini"
//!
//! [server]
//! bind = "0.0.0.0:8090"
//!
//! [logging]
//! level = "info"
//! file = "logs/colh.log"
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub emby: Option<EmbyConfig>,
    #[serde(default)]
    pub booklore: Option<BookloreConfig>,
    #[serde(default)]
    pub llm: Option<LlmConfig>,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub recommendations: RecommendationsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbyConfig {
    pub url: String,
    pub api_key: String,
    #[serde(default = "default_backend_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BookloreConfig {
    pub url: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_backend_timeout")]
    pub timeout_secs: u64,
}

fn default_backend_timeout() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct LlmConfig {
    #[serde(default = "default_llm_provider")]
    pub provider: String,
    pub model: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,
}

fn default_llm_provider() -> String {
    "openai".to_string()
}
fn default_max_tokens() -> u32 {
    1000
}
fn default_temperature() -> f32 {
    0.7
}
fn default_llm_timeout() -> u64 {
    120
}

impl LlmConfig {
    /// The configured key, or `<PROVIDER>_API_KEY` from the environment.
    pub fn resolved_api_key(&self) -> Option<String> {
        if let Some(key) = &self.api_key {
            if !key.is_empty() {
                return Some(key.clone());
            }
        }
        let var = format!("{}_API_KEY", self.provider.to_uppercase().replace('-', "_"));
        std::env::var(var).ok().filter(|k| !k.is_empty())
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "0.0.0.0:8090".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct RecommendationsConfig {
    #[serde(default = "default_recommendation_count")]
    pub count: usize,
    #[serde(default = "default_fetch_limit")]
    pub fetch_limit: usize,
}

impl Default for RecommendationsConfig {
    fn default() -> Self {
        Self {
            count: default_recommendation_count(),
            fetch_limit: default_fetch_limit(),
        }
    }
}

fn default_recommendation_count() -> usize {
    5
}
fn default_fetch_limit() -> usize {
    1000
}

impl Config {
    /// A config with no backends and every other section at its default.
    pub fn minimal() -> Self {
        Self::default()
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

pub fn validate(config: &Config) -> Result<()> {
    if let Some(emby) = &config.emby {
        check_url("emby.url", &emby.url)?;
        if emby.timeout_secs == 0 {
            anyhow::bail!("emby.timeout_secs must be > 0");
        }
    }

    if let Some(booklore) = &config.booklore {
        check_url("booklore.url", &booklore.url)?;
        if booklore.timeout_secs == 0 {
            anyhow::bail!("booklore.timeout_secs must be > 0");
        }
    }

    if let Some(llm) = &config.llm {
        if llm.model.trim().is_empty() {
            anyhow::bail!("llm.model must not be empty");
        }
        if llm.max_tokens == 0 {
            anyhow::bail!("llm.max_tokens must be > 0");
        }
        if !(0.0..=2.0).contains(&llm.temperature) {
            anyhow::bail!("llm.temperature must be in [0.0, 2.0]");
        }
        if llm.timeout_secs == 0 {
            anyhow::bail!("llm.timeout_secs must be > 0");
        }
        if let Some(base_url) = &llm.base_url {
            check_url("llm.base_url", base_url)?;
        }
    }

    if config.recommendations.count == 0 {
        anyhow::bail!("recommendations.count must be >= 1");
    }

    crate::logging::parse_level(&config.logging.level)?;

    Ok(())
}

fn check_url(field: &str, url: &str) -> Result<()> {
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        anyhow::bail!("{} must start with http:// or https:// (got '{}')", field, url);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_to_empty_file() {
        let config: Config = toml::from_str("").unwrap();
        assert!(config.emby.is_none());
        assert!(config.booklore.is_none());
        assert!(config.llm.is_none());
        assert_eq!(config.server.bind, "0.0.0.0:8090");
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.recommendations.count, 5);
        assert_eq!(config.recommendations.fetch_limit, 1000);
    }

    #[test]
    fn backend_and_llm_defaults() {
        let config: Config = toml::from_str(
            r#"
[emby]
url = "http://localhost:8096"
api_key = "abc"

[booklore]
url = "http://localhost:6060"

[llm]
model = "gpt-4o-mini"
"#,
        )
        .unwrap();

        let emby = config.emby.as_ref().unwrap();
        assert_eq!(emby.timeout_secs, 30);
        assert!(config.booklore.as_ref().unwrap().api_key.is_none());

        let llm = config.llm.as_ref().unwrap();
        assert_eq!(llm.provider, "openai");
        assert_eq!(llm.max_tokens, 1000);
        assert!((llm.temperature - 0.7).abs() < f32::EPSILON);
        assert_eq!(llm.timeout_secs, 120);
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn rejects_non_http_url() {
        let config: Config = toml::from_str(
            r#"
[emby]
url = "emby.local:8096"
api_key = "abc"
"#,
        )
        .unwrap();
        let err = validate(&config).unwrap_err().to_string();
        assert!(err.contains("emby.url"));
    }

    #[test]
    fn rejects_out_of_range_temperature() {
        let config: Config = toml::from_str(
            r#"
[llm]
model = "m"
temperature = 3.5
"#,
        )
        .unwrap();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn rejects_unknown_log_level() {
        let config: Config = toml::from_str(
            r#"
[logging]
level = "chatty"
"#,
        )
        .unwrap();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn explicit_api_key_wins() {
        let llm = LlmConfig {
            provider: "some-provider".to_string(),
            model: "m".to_string(),
            api_key: Some("inline".to_string()),
            base_url: None,
            max_tokens: 10,
            temperature: 0.1,
            timeout_secs: 5,
        };
        assert_eq!(llm.resolved_api_key().as_deref(), Some("inline"));
    }

    #[test]
    fn load_config_reads_file() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("colh.toml");
        std::fs::write(
            &path,
            "[server]\nbind = \"127.0.0.1:9999\"\n[recommendations]\ncount = 3\n",
        )
        .unwrap();
        let config = load_config(&path).unwrap();
        assert_eq!(config.server.bind, "127.0.0.1:9999");
        assert_eq!(config.recommendations.count, 3);
    }

    #[test]
    fn load_config_missing_file_errors() {
        let err = load_config(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }

    #[test]
    fn example_config_is_valid() {
        let config: Config = toml::from_str(include_str!("../config/colh.example.toml")).unwrap();
        validate(&config).unwrap();
        assert_eq!(config.llm.unwrap().provider, "openai");
    }
}
