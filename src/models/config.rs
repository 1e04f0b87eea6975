// src/models/config.rs

//! Client configuration.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, UnipaError};

/// Portal connection configuration, loaded from a JSON file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Portal base URL: everything before `/up/` of the login page URL,
    /// e.g. `https://unipa.itp.example.ac.jp/`
    pub base_url: String,

    /// Login user name
    pub username: String,

    /// Login password
    pub password: String,
}

impl Config {
    /// Load configuration from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.base_url.trim().is_empty() {
            return Err(UnipaError::config("base_url is empty"));
        }
        if url::Url::parse(&self.base_url).is_err() {
            return Err(UnipaError::config(format!(
                "base_url is not a valid URL: {}",
                self.base_url
            )));
        }
        if self.username.trim().is_empty() {
            return Err(UnipaError::config("username is empty"));
        }
        if self.password.is_empty() {
            return Err(UnipaError::config("password is empty"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let config: Config = serde_json::from_str(
            r#"{
                "base_url": "https://unipa.example.ac.jp/",
                "username": "s1234567",
                "password": "hunter2"
            }"#,
        )
        .unwrap();
        assert_eq!(config.base_url, "https://unipa.example.ac.jp/");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_blank_fields() {
        let config = Config {
            base_url: "https://unipa.example.ac.jp/".to_string(),
            username: "  ".to_string(),
            password: "x".to_string(),
        };
        assert!(matches!(config.validate(), Err(UnipaError::Config(_))));
    }

    #[test]
    fn test_validate_rejects_bad_url() {
        let config = Config {
            base_url: "not a url".to_string(),
            username: "u".to_string(),
            password: "p".to_string(),
        };
        assert!(config.validate().is_err());
    }
}
