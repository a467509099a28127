//! Studio configuration
//!
//! Loaded from TOML, overlaid with the environment, and validated before any
//! run starts so credential problems never surface mid-run.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Environment variable holding the API key
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Fallback environment variable for the API key
pub const API_KEY_ENV_FALLBACK: &str = "API_KEY";

/// Environment variable holding the export webhook URL
pub const WEBHOOK_ENV: &str = "REEL_EXPORT_WEBHOOK";

/// What happens when the renderer fails for a frame
///
/// One policy per deployment; never chosen per call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderFailurePolicy {
    /// Frame ends in `FAILED` with no media
    #[default]
    MarkFailed,
    /// Renderer substitutes a placeholder and the frame completes
    Placeholder,
}

/// Studio configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StudioConfig {
    /// API key for the generative service
    pub api_key: Option<String>,
    /// Service base URL
    pub api_base_url: String,
    /// Model used for idea generation
    pub idea_model: String,
    /// Model used for storyboard generation
    pub storyboard_model: String,
    /// Model used for frame rendering
    pub image_model: String,
    /// Number of ideas requested per batch
    pub idea_count: usize,
    /// Rendered frame aspect ratio
    pub aspect_ratio: String,
    /// Rendered frame size class
    pub image_size: String,
    /// Per-frame render deadline in seconds
    pub render_timeout_secs: u64,
    /// Per-request deadline for text generation in seconds
    pub request_timeout_secs: u64,
    /// Render failure policy
    pub failure_policy: RenderFailurePolicy,
    /// Placeholder URL template (`{n}` is replaced with a random number)
    pub placeholder_url: String,
    /// Export webhook
    pub export_webhook_url: Option<String>,
}

impl StudioConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults overlaid with the environment
    #[must_use]
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// Load from a TOML file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&text).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Save to a TOML file
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let text = toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))?;
        std::fs::write(path, text).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Fill the API key and webhook from the environment when set there
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        let key = std::env::var(API_KEY_ENV)
            .ok()
            .or_else(|| std::env::var(API_KEY_ENV_FALLBACK).ok())
            .filter(|k| !k.trim().is_empty());
        if key.is_some() {
            self.api_key = key;
        }
        if let Some(url) = std::env::var(WEBHOOK_ENV).ok().filter(|u| !u.trim().is_empty()) {
            self.export_webhook_url = Some(url);
        }
        self
    }

    /// With API key
    #[inline]
    #[must_use]
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// With base URL
    #[inline]
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }

    /// With render timeout
    #[inline]
    #[must_use]
    pub fn with_render_timeout(mut self, secs: u64) -> Self {
        self.render_timeout_secs = secs;
        self
    }

    /// With failure policy
    #[inline]
    #[must_use]
    pub fn with_failure_policy(mut self, policy: RenderFailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    /// With export webhook
    #[inline]
    #[must_use]
    pub fn with_webhook(mut self, url: impl Into<String>) -> Self {
        self.export_webhook_url = Some(url.into());
        self
    }

    /// Per-frame render deadline
    #[inline]
    #[must_use]
    pub fn render_timeout(&self) -> Duration {
        Duration::from_secs(self.render_timeout_secs)
    }

    /// Per-request text generation deadline
    #[inline]
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// API key, if configured and non-blank
    #[must_use]
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref().filter(|k| !k.trim().is_empty())
    }

    /// Check every precondition a run depends on
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api_key().is_none() {
            return Err(ConfigError::MissingApiKey);
        }
        if !(self.api_base_url.starts_with("http://") || self.api_base_url.starts_with("https://"))
        {
            return Err(ConfigError::invalid(
                "api_base_url",
                format!("not an http(s) URL: {}", self.api_base_url),
            ));
        }
        for (field, value) in [
            ("idea_model", &self.idea_model),
            ("storyboard_model", &self.storyboard_model),
            ("image_model", &self.image_model),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::invalid(field, "must not be empty"));
            }
        }
        if self.idea_count == 0 {
            return Err(ConfigError::invalid("idea_count", "must be at least 1"));
        }
        if self.render_timeout_secs == 0 {
            return Err(ConfigError::invalid("render_timeout_secs", "must be positive"));
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::invalid("request_timeout_secs", "must be positive"));
        }
        if self.failure_policy == RenderFailurePolicy::Placeholder
            && self.placeholder_url.trim().is_empty()
        {
            return Err(ConfigError::invalid(
                "placeholder_url",
                "required by the placeholder failure policy",
            ));
        }
        Ok(())
    }
}

impl Default for StudioConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base_url: "https://generativelanguage.googleapis.com".to_string(),
            idea_model: "gemini-2.5-flash".to_string(),
            storyboard_model: "gemini-3-pro-preview".to_string(),
            image_model: "gemini-3-pro-image-preview".to_string(),
            idea_count: 5,
            aspect_ratio: "9:16".to_string(),
            image_size: "1K".to_string(),
            render_timeout_secs: 120,
            request_timeout_secs: 60,
            failure_policy: RenderFailurePolicy::MarkFailed,
            placeholder_url: "https://picsum.photos/1080/1920?random={n}".to_string(),
            export_webhook_url: None,
        }
    }
}
