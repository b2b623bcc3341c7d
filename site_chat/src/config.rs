use std::env;
use std::time::Duration;

use crate::ai::DEFAULT_API_URL;
use crate::error::ConfigError;

pub const API_URL_VAR: &str = "SITE_CHAT_API_URL";
pub const API_KEY_VAR: &str = "GROQ_API_KEY";
pub const COMPLETION_TIMEOUT_VAR: &str = "COMPLETION_TIMEOUT_SECS";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub api_url: String,
    pub api_key: Option<String>,
    /// `None` leaves the completion call bounded only by the provider.
    pub completion_timeout: Option<Duration>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            api_key: None,
            completion_timeout: None,
        }
    }
}

impl Settings {
    /// Load from the process environment. Binaries load their `.env` file
    /// before calling this.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let completion_timeout = match non_empty(COMPLETION_TIMEOUT_VAR) {
            Some(raw) => {
                let secs = raw
                    .trim()
                    .parse::<u64>()
                    .map_err(|_| ConfigError::InvalidSeconds {
                        name: COMPLETION_TIMEOUT_VAR,
                        value: raw.clone(),
                    })?;
                Some(Duration::from_secs(secs))
            }
            None => None,
        };

        Ok(Self {
            api_url: non_empty(API_URL_VAR).unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            api_key: non_empty(API_KEY_VAR),
            completion_timeout,
        })
    }
}
