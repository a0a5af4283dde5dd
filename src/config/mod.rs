//! Configuration loading and management

use crate::core::error::ConfigError;
use crate::server::status::{FixedStatusDecider, HttpCodeDecider, StatusDecider};
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

pub const ENV_URI: &str = "GRAPHQL_URI";
pub const ENV_DEBUG: &str = "GRAPHQL_DEBUG";
pub const ENV_HTTP_CODE_DECIDER: &str = "GRAPHQL_HTTP_CODE_DECIDER";

/// How much internal error detail reaches clients
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DebugFlag {
    /// Internal errors are reported as "Internal server error" only
    #[default]
    None,
    /// Internal errors also carry `extensions.debugMessage`
    IncludeDebugMessage,
}

impl DebugFlag {
    pub fn includes_debug_message(&self) -> bool {
        matches!(self, DebugFlag::IncludeDebugMessage)
    }
}

impl FromStr for DebugFlag {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "none" | "false" | "0" => Ok(DebugFlag::None),
            "include_debug_message" | "true" | "1" => Ok(DebugFlag::IncludeDebugMessage),
            other => Err(format!(
                "expected 'none' or 'include_debug_message', got '{}'",
                other
            )),
        }
    }
}

/// Which status decider the bridge uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum StatusPolicy {
    /// [`HttpCodeDecider`]
    #[default]
    Default,
    /// Every response gets the same status
    Fixed(StatusCode),
}

impl StatusPolicy {
    pub fn decider(&self) -> Arc<dyn StatusDecider> {
        match self {
            StatusPolicy::Default => Arc::new(HttpCodeDecider),
            StatusPolicy::Fixed(code) => Arc::new(FixedStatusDecider(*code)),
        }
    }
}

impl FromStr for StatusPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() || s == "default" {
            return Ok(StatusPolicy::Default);
        }
        let Some(code) = s.strip_prefix("fixed:") else {
            return Err(format!("expected 'default' or 'fixed:<code>', got '{}'", s));
        };
        code.trim()
            .parse::<u16>()
            .ok()
            .and_then(|c| StatusCode::from_u16(c).ok())
            .map(StatusPolicy::Fixed)
            .ok_or_else(|| format!("'{}' is not a valid HTTP status code", code))
    }
}

impl TryFrom<String> for StatusPolicy {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<StatusPolicy> for String {
    fn from(policy: StatusPolicy) -> Self {
        policy.to_string()
    }
}

impl fmt::Display for StatusPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusPolicy::Default => f.write_str("default"),
            StatusPolicy::Fixed(code) => write!(f, "fixed:{}", code.as_u16()),
        }
    }
}

fn default_uri() -> String {
    "/graphql".to_string()
}

/// Bridge configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Route of the single POST endpoint
    #[serde(default = "default_uri")]
    pub uri: String,

    #[serde(default)]
    pub debug: DebugFlag,

    #[serde(default)]
    pub http_code_decider: StatusPolicy,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            uri: default_uri(),
            debug: DebugFlag::default(),
            http_code_decider: StatusPolicy::default(),
        }
    }
}

impl BridgeConfig {
    /// Load configuration from a YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::FileNotFound {
                path: path.display().to_string(),
            });
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_yaml::from_str(&content).map_err(|e| ConfigError::ParseError {
            file: Some(path.display().to_string()),
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a YAML string
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `GRAPHQL_URI`, `GRAPHQL_DEBUG` and `GRAPHQL_HTTP_CODE_DECIDER`
    pub fn with_env_overrides(self) -> Result<Self, ConfigError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides read through `lookup`
    pub fn apply_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(uri) = lookup(ENV_URI) {
            self.uri = uri;
        }
        if let Some(debug) = lookup(ENV_DEBUG) {
            self.debug = debug.parse().map_err(|message| ConfigError::InvalidValue {
                field: ENV_DEBUG.to_string(),
                value: debug.clone(),
                message,
            })?;
        }
        if let Some(policy) = lookup(ENV_HTTP_CODE_DECIDER) {
            self.http_code_decider =
                policy.parse().map_err(|message| ConfigError::InvalidValue {
                    field: ENV_HTTP_CODE_DECIDER.to_string(),
                    value: policy.clone(),
                    message,
                })?;
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.uri.starts_with('/') {
            return Err(ConfigError::InvalidValue {
                field: "uri".to_string(),
                value: self.uri.clone(),
                message: "must start with '/'".to_string(),
            });
        }
        Ok(())
    }
}
