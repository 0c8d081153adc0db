//! Client configuration from the environment

use crate::state_machine::LateReplyPolicy;
use std::path::PathBuf;
use thiserror::Error;

pub const DEFAULT_API_URL: &str = "http://localhost:5000";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("JENNIE_API_URL must not be empty")]
    EmptyApiUrl,
    #[error("invalid JENNIE_LATE_REPLIES value {0:?} (expected \"discard\" or \"append\")")]
    InvalidLateReplyPolicy(String),
}

/// Configuration for the chat client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatConfig {
    /// Backend base URL, without trailing slash
    pub api_url: String,
    pub late_reply_policy: LateReplyPolicy,
    /// Where JSON logs go; no logging when unset
    pub log_file: Option<PathBuf>,
}

impl ChatConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_url = match lookup("JENNIE_API_URL") {
            Some(url) => {
                let url = url.trim().trim_end_matches('/').to_string();
                if url.is_empty() {
                    return Err(ConfigError::EmptyApiUrl);
                }
                url
            }
            None => DEFAULT_API_URL.to_string(),
        };

        let late_reply_policy = match lookup("JENNIE_LATE_REPLIES") {
            Some(raw) => raw
                .parse()
                .map_err(|_| ConfigError::InvalidLateReplyPolicy(raw))?,
            None => LateReplyPolicy::default(),
        };

        let log_file = lookup("JENNIE_LOG_FILE")
            .filter(|path| !path.trim().is_empty())
            .map(PathBuf::from);

        Ok(Self {
            api_url,
            late_reply_policy,
            log_file,
        })
    }
}
