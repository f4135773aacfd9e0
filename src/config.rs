//! Tap configuration
//!
//! The connector is configured from a single JSON object, loaded once at
//! process start and immutable afterwards. Two keys are recognized:
//! `auth_token` (required, secret) and `api_url` (optional, defaulted to the
//! production Survicate data API).

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;

/// Default base URL for the Survicate data API
pub const DEFAULT_API_URL: &str = "https://data-api.survicate.com/v2/";

/// Runtime configuration for the tap
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TapConfig {
    /// API token, sent verbatim as `Authorization: Basic <token>`
    pub auth_token: String,

    /// Base URL for all requests
    #[serde(default = "default_api_url")]
    pub api_url: String,
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

impl TapConfig {
    /// Build a config from an already-parsed JSON value
    pub fn from_value(value: &Value) -> Result<Self> {
        // Surface a missing token as a dedicated error before serde's
        // generic "missing field" message.
        match value.get("auth_token") {
            None | Some(Value::Null) => return Err(Error::missing_field("auth_token")),
            Some(Value::String(s)) if s.is_empty() => {
                return Err(Error::InvalidConfigValue {
                    field: "auth_token".to_string(),
                    message: "must be a non-empty string".to_string(),
                })
            }
            _ => {}
        }

        let config: Self = serde_json::from_value(value.clone())?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a config from an inline JSON string
    pub fn from_json_str(json: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(json)
            .map_err(|e| Error::config(format!("Invalid config JSON: {e}")))?;
        Self::from_value(&value)
    }

    /// Load a config from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| Error::config(format!("Failed to read config file: {e}")))?;
        Self::from_json_str(&content)
    }

    /// Validate field values
    fn validate(&self) -> Result<()> {
        url::Url::parse(&self.api_url)?;
        Ok(())
    }
}

/// Configuration property descriptor, as reported by the `spec` command
#[derive(Debug, Clone, Serialize)]
pub struct ConfigProperty {
    /// Property name
    pub name: &'static str,
    /// Property type
    #[serde(rename = "type")]
    pub property_type: &'static str,
    /// Whether this property is required
    pub required: bool,
    /// Whether this is a secret (should be masked)
    pub secret: bool,
    /// Default value, if any
    pub default: Option<&'static str>,
    /// Human-readable description
    pub description: &'static str,
}

/// The configuration spec for this connector
pub fn config_spec() -> Vec<ConfigProperty> {
    vec![
        ConfigProperty {
            name: "auth_token",
            property_type: "string",
            required: true,
            secret: true,
            default: None,
            description: "The token to authenticate against the API service",
        },
        ConfigProperty {
            name: "api_url",
            property_type: "string",
            required: false,
            secret: false,
            default: Some(DEFAULT_API_URL),
            description: "The URL for the API service",
        },
    ]
}
