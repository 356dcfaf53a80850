//! Host-supplied configuration for the verification core.

use serde::Deserialize;
use thiserror::Error;

use crate::assertion::{Assertion, AssertionSet};

/// One secondary claim check: response field `key` must equal `value`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ClaimCheck {
    pub key: String,
    pub value: String,
}

/// Static configuration for one authentication backend instance.
#[derive(Debug, Clone, Deserialize)]
pub struct ModuleConfig {
    /// Tokeninfo endpoint; the credential is appended to this URL
    /// verbatim, so any query prefix (e.g. `...?access_token=`)
    /// belongs here.
    pub tokeninfo_url: String,

    /// Response field that must carry the username being authenticated.
    pub login_field: String,

    /// Additional claims that must hold for the attempt to succeed.
    #[serde(default)]
    pub checks: Vec<ClaimCheck>,

    /// Cap on scanned JSON tokens per response.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,
}

fn default_max_tokens() -> usize {
    tollgate_json::DEFAULT_MAX_TOKENS
}

/// Configuration errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("tokeninfo_url is not defined or empty")]
    MissingUrl,

    #[error("login_field is not defined or empty")]
    MissingLoginField,
}

impl ModuleConfig {
    /// Parse an argument vector in the classic module convention:
    /// endpoint URL, identity field name, then any number of
    /// `key=value` checks. Arguments without a `=` are ignored.
    pub fn from_args<S: AsRef<str>>(args: &[S]) -> Result<Self, ConfigError> {
        let tokeninfo_url = args.first().map(|s| s.as_ref()).unwrap_or_default();
        if tokeninfo_url.is_empty() {
            return Err(ConfigError::MissingUrl);
        }

        let login_field = args.get(1).map(|s| s.as_ref()).unwrap_or_default();
        if login_field.is_empty() {
            return Err(ConfigError::MissingLoginField);
        }

        let checks = args
            .iter()
            .skip(2)
            .filter_map(|arg| {
                arg.as_ref().split_once('=').map(|(key, value)| ClaimCheck {
                    key: key.to_string(),
                    value: value.to_string(),
                })
            })
            .collect();

        Ok(Self {
            tokeninfo_url: tokeninfo_url.to_string(),
            login_field: login_field.to_string(),
            checks,
            max_tokens: default_max_tokens(),
        })
    }

    /// Validate a configuration that arrived through deserialization.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tokeninfo_url.is_empty() {
            return Err(ConfigError::MissingUrl);
        }
        if self.login_field.is_empty() {
            return Err(ConfigError::MissingLoginField);
        }
        Ok(())
    }

    /// Build the assertion set for one attempt: the identity claim bound
    /// to the live username, followed by the configured checks.
    pub fn assertions_for(&self, username: &str) -> AssertionSet {
        AssertionSet::new(
            Assertion::new(self.login_field.clone(), username),
            self.checks
                .iter()
                .map(|check| Assertion::new(check.key.clone(), check.value.clone()))
                .collect(),
        )
    }
}
