//! Library configuration.
//!
//! Loaded from TOML. Every section and field is optional; missing values take
//! the defaults below.
//!
//! ```toml
//! [scoring]
//! timeout_ms = 2500
//! max_attempts = 3
//! backoff_ms = 200
//! extra_shorteners = ["lnk.example"]
//! extra_suspicious_tlds = ["biz"]
//!
//! [render]
//! default_error_correction = "h"
//! max_dimension = 4096
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::qr::ErrorCorrection;
use crate::scoring::RetryPolicy;

/// Default timeout per semantic-service attempt.
pub const DEFAULT_TIMEOUT_MS: u64 = 2500;

/// Default number of semantic-service attempts.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default linear backoff step between attempts.
pub const DEFAULT_BACKOFF_MS: u64 = 200;

/// Default cap on rendered width and height in pixels.
pub const DEFAULT_MAX_DIMENSION: u32 = 4096;

/// Errors loading configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParseError(#[from] toml::de::Error),

    #[error("Invalid config value: {0}")]
    Invalid(String),
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GlyphlockConfig {
    pub scoring: ScoringConfig,
    pub render: RenderConfig,
}

/// `[scoring]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Timeout per semantic-service attempt, in milliseconds.
    pub timeout_ms: u64,
    /// Attempts before falling back to static-only scoring.
    pub max_attempts: u32,
    /// Linear backoff step, in milliseconds.
    pub backoff_ms: u64,
    /// Shortener domains added to the built-in list.
    pub extra_shorteners: Vec<String>,
    /// TLDs added to the built-in suspicious list.
    pub extra_suspicious_tlds: Vec<String>,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_TIMEOUT_MS,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff_ms: DEFAULT_BACKOFF_MS,
            extra_shorteners: Vec::new(),
            extra_suspicious_tlds: Vec::new(),
        }
    }
}

impl ScoringConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            timeout: Duration::from_millis(self.timeout_ms),
            max_attempts: self.max_attempts.max(1),
            backoff: Duration::from_millis(self.backoff_ms),
        }
    }
}

/// `[render]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Error correction used when a request does not name one.
    pub default_error_correction: ErrorCorrection,
    /// Largest width or height the renderer will produce.
    pub max_dimension: u32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            default_error_correction: ErrorCorrection::default(),
            max_dimension: DEFAULT_MAX_DIMENSION,
        }
    }
}

impl GlyphlockConfig {
    /// Parses and validates a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads and validates a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.scoring.timeout_ms == 0 {
            return Err(ConfigError::Invalid("scoring.timeout_ms must be > 0".into()));
        }
        if self.scoring.max_attempts == 0 {
            return Err(ConfigError::Invalid("scoring.max_attempts must be >= 1".into()));
        }
        if self.render.max_dimension == 0 {
            return Err(ConfigError::Invalid("render.max_dimension must be > 0".into()));
        }
        Ok(())
    }
}
