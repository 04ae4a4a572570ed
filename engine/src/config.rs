//! API configuration shared by route resolution and request building.

use crate::inflect::Delimiter;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;

/// Default `credentials` mode sent with every request.
pub const DEFAULT_CREDENTIALS: &str = "same-origin";

/// API settings: route prefix, delimiter style and request options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ApiConfig {
    /// Prefix for generated routes (e.g. `/api`)
    pub prefix: String,
    /// Delimiter style for generated routes
    pub delimiter: Delimiter,
    /// Headers sent with every request
    pub headers: BTreeMap<String, String>,
    /// Credentials mode (`same-origin`, `include`, `omit`)
    pub credentials: String,
    /// Send only changed fields on update
    pub diff_mode: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        let mut headers = BTreeMap::new();
        headers.insert("Accept".to_string(), "application/json".to_string());
        headers.insert("Content-Type".to_string(), "application/json".to_string());

        Self {
            prefix: String::new(),
            delimiter: Delimiter::Dasherize,
            headers,
            credentials: DEFAULT_CREDENTIALS.to_string(),
            diff_mode: true,
        }
    }
}

/// A partial update to an [`ApiConfig`]. Absent fields keep their value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ApiUpdate {
    pub prefix: Option<String>,
    pub delimiter: Option<Delimiter>,
    /// Merged into the existing headers, never replacing them wholesale
    pub headers: Option<BTreeMap<String, String>>,
    pub credentials: Option<String>,
    pub diff_mode: Option<bool>,
}

impl ApiConfig {
    /// Apply a partial update.
    pub fn apply(&mut self, update: ApiUpdate) {
        if let Some(prefix) = update.prefix {
            self.prefix = prefix;
        }
        if let Some(delimiter) = update.delimiter {
            self.delimiter = delimiter;
        }
        if let Some(headers) = update.headers {
            self.headers.extend(headers);
        }
        if let Some(credentials) = update.credentials {
            self.credentials = credentials;
        }
        if let Some(diff_mode) = update.diff_mode {
            self.diff_mode = diff_mode;
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Reads `FLUTE_API_PREFIX`, `FLUTE_API_DELIMITER`,
    /// `FLUTE_API_CREDENTIALS` and `FLUTE_DIFF_MODE`; unset variables keep
    /// their defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut update = ApiUpdate {
            prefix: lookup("FLUTE_API_PREFIX"),
            delimiter: lookup("FLUTE_API_DELIMITER").map(|d| Delimiter::parse(&d)),
            credentials: lookup("FLUTE_API_CREDENTIALS"),
            ..ApiUpdate::default()
        };

        if let Some(raw) = lookup("FLUTE_DIFF_MODE") {
            update.diff_mode = Some(parse_flag(&raw).ok_or(ConfigError::InvalidDiffMode(raw))?);
        }

        let mut config = Self::default();
        config.apply(update);
        Ok(config)
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid FLUTE_DIFF_MODE value: {0}")]
    InvalidDiffMode(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn defaults() {
        let config = ApiConfig::default();
        assert_eq!(config.prefix, "");
        assert_eq!(config.delimiter, Delimiter::Dasherize);
        assert_eq!(config.credentials, "same-origin");
        assert!(config.diff_mode);
        assert_eq!(config.headers.get("Accept").unwrap(), "application/json");
        assert_eq!(
            config.headers.get("Content-Type").unwrap(),
            "application/json"
        );
    }

    #[test]
    fn update_merges_headers() {
        let mut config = ApiConfig::default();
        let mut headers = BTreeMap::new();
        headers.insert("X-Token".to_string(), "abc".to_string());

        config.apply(ApiUpdate {
            prefix: Some("/api".into()),
            headers: Some(headers),
            ..ApiUpdate::default()
        });

        assert_eq!(config.prefix, "/api");
        assert_eq!(config.headers.len(), 3);
        assert_eq!(config.headers.get("X-Token").unwrap(), "abc");
        assert_eq!(config.delimiter, Delimiter::Dasherize);
    }

    #[test]
    fn from_lookup_reads_variables() {
        let config = ApiConfig::from_lookup(lookup(&[
            ("FLUTE_API_PREFIX", "/v1"),
            ("FLUTE_API_DELIMITER", "underscores"),
            ("FLUTE_API_CREDENTIALS", "include"),
            ("FLUTE_DIFF_MODE", "false"),
        ]))
        .unwrap();

        assert_eq!(config.prefix, "/v1");
        assert_eq!(config.delimiter, Delimiter::Underscore);
        assert_eq!(config.credentials, "include");
        assert!(!config.diff_mode);
    }

    #[test]
    fn from_lookup_rejects_bad_flag() {
        let result = ApiConfig::from_lookup(lookup(&[("FLUTE_DIFF_MODE", "maybe")]));
        assert!(matches!(result, Err(ConfigError::InvalidDiffMode(v)) if v == "maybe"));
    }

    #[test]
    fn config_from_json() {
        let config: ApiConfig =
            serde_json::from_str(r#"{"prefix": "/api", "delimiter": "_", "diffMode": false}"#)
                .unwrap();
        assert_eq!(config.delimiter, Delimiter::Underscore);
        assert!(!config.diff_mode);
        assert_eq!(config.credentials, "same-origin");
    }
}
