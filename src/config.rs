//! Configuration for the shield, tone and rewrite service layers.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::rewriter::RewriterKind;
use crate::shield::{Replacement, ShieldConfig, DEFAULT_REPLACEMENT};

/// Environment variable read by [`ServiceConfig::with_api_key_from_env`].
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Main configuration for TextAngel.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Shield settings.
    pub shield: ShieldSettings,
    /// Tone selection settings.
    pub tone: ToneSettings,
    /// External rewrite service settings.
    pub service: ServiceConfig,
    /// Outbound rate limiting.
    pub rate_limit: RateLimitConfig,
    /// Message journal settings.
    pub journal: JournalConfig,
}

/// Where shield categories come from and how matches are replaced.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ShieldSettings {
    /// JSON category file (bundled list if None).
    pub path: Option<PathBuf>,
    /// Replacement token.
    pub replacement: String,
    /// Mask glyph repeated per matched character; overrides `replacement`.
    pub mask: Option<char>,
}

impl Default for ShieldSettings {
    fn default() -> Self {
        Self {
            path: None,
            replacement: DEFAULT_REPLACEMENT.into(),
            mask: None,
        }
    }
}

impl ShieldSettings {
    /// The replacement style these settings describe.
    pub fn replacement_style(&self) -> Replacement {
        match self.mask {
            Some(glyph) => Replacement::Mask(glyph),
            None => Replacement::Token(self.replacement.clone()),
        }
    }

    /// Load the base shield configuration these settings point at.
    pub fn load(&self) -> crate::Result<ShieldConfig> {
        let base = match &self.path {
            Some(path) => ShieldConfig::load(path)?,
            None => ShieldConfig::builtin()?,
        };
        base.with_replacement(self.replacement_style())
    }
}

/// Tone selection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToneSettings {
    /// Tone used when a request names none.
    pub default_tone: String,
    /// Reject unknown tone names instead of falling back to the first tone.
    pub strict: bool,
}

impl Default for ToneSettings {
    fn default() -> Self {
        Self {
            default_tone: crate::tone::default_tone().name.into(),
            strict: false,
        }
    }
}

/// Request/response shape used against the OpenAI API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiStyle {
    /// `/chat/completions` with a message list.
    #[default]
    Chat,
    /// `/completions` with a single prompt string.
    Legacy,
}

impl ApiStyle {
    /// Model used when none is configured.
    pub fn default_model(&self) -> &'static str {
        match self {
            ApiStyle::Chat => "gpt-4o-mini",
            ApiStyle::Legacy => "gpt-3.5-turbo-instruct",
        }
    }
}

/// External rewrite service settings.
///
/// The API key is never serialized and is redacted from `Debug` output.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Which backend rewrites messages.
    pub backend: RewriterKind,
    /// API key / bearer token.
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    /// Base URL (provider default if None).
    pub base_url: Option<String>,
    /// Model name for generative backends (per-style default if None).
    pub model: Option<String>,
    /// OpenAI request shape.
    pub api_style: ApiStyle,
    /// Sampling temperature.
    pub temperature: f32,
    /// Completion token cap.
    pub max_tokens: u32,
    /// System prompt for chat-style requests.
    pub system_prompt: String,
    /// Per-call timeout.
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
    /// Use the local tone engine when the service fails.
    pub fallback_to_local: bool,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            backend: RewriterKind::Local,
            api_key: None,
            base_url: None,
            model: None,
            api_style: ApiStyle::Chat,
            temperature: 0.7,
            max_tokens: 200,
            system_prompt: "You are a kind, emotionally intelligent assistant.".into(),
            timeout: Duration::from_secs(30),
            fallback_to_local: true,
        }
    }
}

impl ServiceConfig {
    /// The configured model, or the default for `api_style`.
    pub fn model(&self) -> &str {
        self.model
            .as_deref()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| self.api_style.default_model())
    }

    /// Fill `api_key` from the `OPENAI_API_KEY` environment variable if unset.
    pub fn with_api_key_from_env(mut self) -> Self {
        if self.api_key.is_none() {
            self.api_key = std::env::var(API_KEY_ENV).ok().filter(|k| !k.trim().is_empty());
        }
        self
    }
}

impl fmt::Debug for ServiceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceConfig")
            .field("backend", &self.backend)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("model", &self.model())
            .field("api_style", &self.api_style)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("timeout", &self.timeout)
            .field("fallback_to_local", &self.fallback_to_local)
            .finish()
    }
}

/// Rate limiting configuration for outbound service calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Minimum delay between requests.
    #[serde(with = "humantime_serde")]
    pub min_delay: Duration,
    /// Requests per minute limit.
    pub requests_per_minute: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            min_delay: Duration::from_millis(250),
            requests_per_minute: 30,
        }
    }
}

/// Message journal configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JournalConfig {
    /// Record processed messages.
    pub enabled: bool,
    /// Log file (platform data directory if None).
    pub path: Option<PathBuf>,
}

impl Default for JournalConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: None,
        }
    }
}

impl JournalConfig {
    /// The journal file path, resolving the platform default.
    pub fn resolved_path(&self) -> PathBuf {
        self.path.clone().unwrap_or_else(|| {
            dirs::data_local_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join("textangel")
                .join("message_log.txt")
        })
    }
}

impl Config {
    /// Load configuration from file.
    pub fn from_file(path: &std::path::Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            crate::Error::Config(format!("unable to read {}: {}", path.display(), e))
        })?;
        toml::from_str(&content).map_err(|e| crate::Error::Config(e.to_string()))
    }

    /// Save configuration to file.
    pub fn save(&self, path: &std::path::Path) -> crate::Result<()> {
        let content =
            toml::to_string_pretty(self).map_err(|e| crate::Error::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Create a builder for configuration.
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }
}

/// Builder for Config.
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the shield category file.
    pub fn shield_path(mut self, path: PathBuf) -> Self {
        self.config.shield.path = Some(path);
        self
    }

    /// Set the replacement token.
    pub fn replacement(mut self, token: impl Into<String>) -> Self {
        self.config.shield.replacement = token.into();
        self
    }

    /// Mask matches with a repeated glyph.
    pub fn mask(mut self, glyph: char) -> Self {
        self.config.shield.mask = Some(glyph);
        self
    }

    /// Set the default tone.
    pub fn default_tone(mut self, tone: impl Into<String>) -> Self {
        self.config.tone.default_tone = tone.into();
        self
    }

    /// Reject unknown tones.
    pub fn strict_tones(mut self, strict: bool) -> Self {
        self.config.tone.strict = strict;
        self
    }

    /// Select the rewrite backend.
    pub fn backend(mut self, backend: RewriterKind) -> Self {
        self.config.service.backend = backend;
        self
    }

    /// Set the service API key.
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.service.api_key = Some(key.into());
        self
    }

    /// Set the service timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.service.timeout = timeout;
        self
    }

    /// Set the journal file.
    pub fn journal_path(mut self, path: PathBuf) -> Self {
        self.config.journal.path = Some(path);
        self
    }

    /// Disable the journal.
    pub fn no_journal(mut self) -> Self {
        self.config.journal.enabled = false;
        self
    }

    /// Build the configuration.
    pub fn build(self) -> Config {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.service.backend, RewriterKind::Local);
        assert!(config.service.fallback_to_local);
        assert_eq!(config.tone.default_tone, "Gentle & Kind");
        assert_eq!(
            config.shield.replacement_style(),
            Replacement::Token(DEFAULT_REPLACEMENT.into())
        );
    }

    #[test]
    fn test_partial_toml() {
        let config: Config = toml::from_str(
            r#"
            [shield]
            mask = "▆"

            [service]
            backend = "openai"
            timeout = "5s"
            api_style = "legacy"
            "#,
        )
        .unwrap();
        assert_eq!(config.shield.replacement_style(), Replacement::Mask('▆'));
        assert_eq!(config.service.backend, RewriterKind::OpenAi);
        assert_eq!(config.service.timeout, Duration::from_secs(5));
        assert_eq!(config.service.api_style, ApiStyle::Legacy);
        assert_eq!(config.service.model(), "gpt-3.5-turbo-instruct");
    }

    #[test]
    fn test_default_model_follows_api_style() {
        let mut service = ServiceConfig::default();
        assert_eq!(service.model(), "gpt-4o-mini");
        service.api_style = ApiStyle::Legacy;
        assert_eq!(service.model(), "gpt-3.5-turbo-instruct");
        service.model = Some("davinci-002".into());
        assert_eq!(service.model(), "davinci-002");
    }

    #[test]
    fn test_missing_config_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::from_file(&dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, crate::Error::Config(_)), "{:?}", err);
        assert!(err.to_string().contains("absent.toml"));
    }

    #[test]
    fn test_api_key_never_serialized_or_printed() {
        let config = Config::builder().api_key("sk-secret").build();
        let text = toml::to_string_pretty(&config).unwrap();
        assert!(!text.contains("sk-secret"));
        assert!(!format!("{:?}", config.service).contains("sk-secret"));
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("textangel.toml");
        let config = Config::builder()
            .default_tone("Professional")
            .strict_tones(true)
            .timeout(Duration::from_secs(12))
            .no_journal()
            .build();
        config.save(&path).unwrap();

        let loaded = Config::from_file(&path).unwrap();
        assert_eq!(loaded.tone.default_tone, "Professional");
        assert!(loaded.tone.strict);
        assert_eq!(loaded.service.timeout, Duration::from_secs(12));
        assert!(!loaded.journal.enabled);
    }

    #[test]
    fn test_shield_settings_load_builtin_with_mask() {
        let settings = ShieldSettings {
            mask: Some('#'),
            ..Default::default()
        };
        let config = settings.load().unwrap();
        assert_eq!(config.replacement(), &Replacement::Mask('#'));
    }
}
