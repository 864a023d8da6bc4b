//! Error types for the harness

use reqwest::StatusCode;
use thiserror::Error;

/// Everything that can stop a scenario case or the harness itself
#[derive(Debug, Error)]
pub enum HarnessError {
  /// The request never produced a response
  #[error("request to {url} failed: {source}")]
  Transport {
    url: String,
    #[source]
    source: reqwest::Error,
  },

  /// The response body was not valid JSON
  #[error("response from {url} ({status}) is not JSON: {source}")]
  Decode {
    url: String,
    status: StatusCode,
    #[source]
    source: serde_json::Error,
  },

  /// A status or payload check did not hold
  #[error("assertion failed: {0}")]
  Assertion(String),

  /// A wallet fixture a case depends on could not be set up
  #[error("{0}")]
  Setup(String),

  /// The base URL could not be parsed or joined
  #[error("invalid base url `{url}`: {reason}")]
  InvalidBaseUrl { url: String, reason: String },

  /// Invalid configuration value
  #[error("invalid configuration: {0}")]
  Config(String),

  /// The config file could not be read
  #[error("cannot read config file {path}: {source}")]
  ConfigIo {
    path: String,
    #[source]
    source: std::io::Error,
  },

  /// The config file is not valid TOML for the harness
  #[error("cannot parse config file {path}: {source}")]
  ConfigFile {
    path: String,
    #[source]
    source: toml::de::Error,
  },
}

impl HarnessError {
  /// Build an assertion failure from anything displayable
  pub fn assertion(message: impl Into<String>) -> Self {
    HarnessError::Assertion(message.into())
  }

  /// Whether this error is a failed check rather than an error in reaching the service
  pub fn is_assertion(&self) -> bool {
    matches!(self, HarnessError::Assertion(_))
  }

  /// Whether this error comes from startup configuration
  pub fn is_config(&self) -> bool {
    matches!(
      self,
      HarnessError::Config(_)
        | HarnessError::ConfigIo { .. }
        | HarnessError::ConfigFile { .. }
        | HarnessError::InvalidBaseUrl { .. }
    )
  }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, HarnessError>;
