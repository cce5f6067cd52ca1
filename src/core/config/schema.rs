//! core::config::schema
//!
//! Configuration file schema.
//!
//! Every field is optional; anything left out falls back to the defaults
//! documented on [`super::RelayConfig`].
//!
//! # Example
//!
//! ```toml
//! [server]
//! bind = "127.0.0.1"
//! port = 8080
//!
//! [upstream]
//! owner = "wen-zeng"
//! repo = "ChinaTransport"
//! branch = "main"
//! timeout_secs = 30
//!
//! [resolve]
//! mode = "buffered"
//! max_document_bytes = 67108864
//! verify_large_objects = false
//! ```
//!
//! The credential is not part of the file schema; it is read
//! from the `GITHUB_TOKEN` environment variable only.

use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Top-level configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    /// HTTP listener settings
    pub server: Option<ServerSection>,

    /// Upstream repository settings
    pub upstream: Option<UpstreamSection>,

    /// Resolution pipeline settings
    pub resolve: Option<ResolveSection>,
}

impl FileConfig {
    /// Validate the values that can be checked without defaults applied.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(upstream) = &self.upstream {
            upstream.validate()?;
        }
        if let Some(resolve) = &self.resolve {
            resolve.validate()?;
        }
        Ok(())
    }
}

/// `[server]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ServerSection {
    /// Address to bind (default: "0.0.0.0")
    pub bind: Option<String>,

    /// Port to listen on (default: 3000)
    pub port: Option<u16>,
}

/// `[upstream]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct UpstreamSection {
    /// Repository owner (user or organization)
    pub owner: Option<String>,

    /// Repository name
    pub repo: Option<String>,

    /// Branch all lookups resolve against
    pub branch: Option<String>,

    /// Contents API base URL (GitHub Enterprise: `https://host/api/v3`)
    pub api_base: Option<String>,

    /// Large-object media base URL
    pub media_base: Option<String>,

    /// Timeout for each outbound call, in seconds
    pub timeout_secs: Option<u64>,
}

impl UpstreamSection {
    /// Validate the upstream section.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [("owner", &self.owner), ("repo", &self.repo)] {
            if let Some(value) = value {
                if value.is_empty() || value.contains('/') {
                    return Err(ConfigError::InvalidValue(format!(
                        "upstream.{field} must be a single non-empty path segment, got '{value}'"
                    )));
                }
            }
        }
        if self.timeout_secs == Some(0) {
            return Err(ConfigError::InvalidValue(
                "upstream.timeout_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// How resolved documents are delivered to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryMode {
    /// Read the whole document, validate it as JSON, then respond.
    #[default]
    Buffered,
    /// Relay bytes as they arrive; the document is not validated.
    Streaming,
}

impl std::fmt::Display for DeliveryMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeliveryMode::Buffered => write!(f, "buffered"),
            DeliveryMode::Streaming => write!(f, "streaming"),
        }
    }
}

impl std::str::FromStr for DeliveryMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "buffered" => Ok(DeliveryMode::Buffered),
            "streaming" => Ok(DeliveryMode::Streaming),
            other => Err(ConfigError::InvalidValue(format!(
                "invalid delivery mode '{other}', must be one of: buffered, streaming"
            ))),
        }
    }
}

/// `[resolve]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ResolveSection {
    /// Delivery mode (default: buffered)
    pub mode: Option<DeliveryMode>,

    /// Upper bound for a buffered document, in bytes
    pub max_document_bytes: Option<u64>,

    /// Check large-object bytes against the pointer's size and oid
    pub verify_large_objects: Option<bool>,
}

impl ResolveSection {
    /// Validate the resolve section.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_document_bytes == Some(0) {
            return Err(ConfigError::InvalidValue(
                "resolve.max_document_bytes must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_full_file() {
        let parsed: FileConfig = toml::from_str(
            r#"
            [server]
            bind = "127.0.0.1"
            port = 8080

            [upstream]
            owner = "wen-zeng"
            repo = "ChinaTransport"
            branch = "main"
            timeout_secs = 10

            [resolve]
            mode = "streaming"
            max_document_bytes = 1024
            verify_large_objects = true
            "#,
        )
        .unwrap();

        assert_eq!(parsed.server.as_ref().unwrap().port, Some(8080));
        assert_eq!(
            parsed.upstream.as_ref().unwrap().repo.as_deref(),
            Some("ChinaTransport")
        );
        let resolve = parsed.resolve.unwrap();
        assert_eq!(resolve.mode, Some(DeliveryMode::Streaming));
        assert_eq!(resolve.verify_large_objects, Some(true));
    }

    #[test]
    fn empty_file_is_default() {
        let parsed: FileConfig = toml::from_str("").unwrap();
        assert_eq!(parsed, FileConfig::default());
        assert!(parsed.validate().is_ok());
    }

    #[test]
    fn unknown_fields_rejected() {
        let result: Result<FileConfig, _> = toml::from_str(
            r#"
            [upstream]
            token = "ghp_should_not_live_here"
            "#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn owner_with_slash_rejected() {
        let section = UpstreamSection {
            owner: Some("a/b".to_string()),
            ..Default::default()
        };
        assert!(section.validate().is_err());
    }

    #[test]
    fn zero_timeout_rejected() {
        let section = UpstreamSection {
            timeout_secs: Some(0),
            ..Default::default()
        };
        assert!(section.validate().is_err());
    }

    #[test]
    fn zero_document_limit_rejected() {
        let section = ResolveSection {
            max_document_bytes: Some(0),
            ..Default::default()
        };
        assert!(section.validate().is_err());
    }

    #[test]
    fn delivery_mode_parse_and_display() {
        assert_eq!(
            "buffered".parse::<DeliveryMode>().unwrap(),
            DeliveryMode::Buffered
        );
        assert_eq!(
            "streaming".parse::<DeliveryMode>().unwrap(),
            DeliveryMode::Streaming
        );
        assert!("chunked".parse::<DeliveryMode>().is_err());
        assert_eq!(DeliveryMode::Streaming.to_string(), "streaming");
        assert_eq!(DeliveryMode::default(), DeliveryMode::Buffered);
    }
}
