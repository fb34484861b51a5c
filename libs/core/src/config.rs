use std::time::Duration;

use anyhow::{Context, Result};

use crate::credentials::Credentials;
use crate::retry::RetryConfig;

pub const REQUEST_TIMEOUT_ENV: &str = "LXR_REQUEST_TIMEOUT_SECS";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Settings for a [`crate::LeanIxClient`] backed by reqwest.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub credentials: Credentials,
    pub request_timeout: Duration,
    pub retry: RetryConfig,
}

impl ClientConfig {
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            retry: RetryConfig::DEFAULT,
        }
    }

    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let request_timeout = match lookup(REQUEST_TIMEOUT_ENV) {
            Some(raw) => {
                let secs: u64 = raw
                    .trim()
                    .parse()
                    .with_context(|| format!("invalid {REQUEST_TIMEOUT_ENV} '{raw}'"))?;
                Duration::from_secs(secs.max(1))
            }
            None => DEFAULT_REQUEST_TIMEOUT,
        };
        Ok(Self {
            credentials: Credentials::from_lookup(&lookup),
            request_timeout,
            retry: RetryConfig::DEFAULT,
        })
    }
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
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = ClientConfig::from_lookup(lookup(&[
            ("LXR_HOST", "demo.leanix.net"),
            ("LXR_APITOKEN", "secret"),
        ]))
        .unwrap();
        assert_eq!(config.credentials.host(), "demo.leanix.net");
        assert_eq!(config.credentials.api_token(), "secret");
        assert_eq!(config.request_timeout, DEFAULT_REQUEST_TIMEOUT);
        assert_eq!(config.retry, RetryConfig::DEFAULT);
    }

    #[test]
    fn timeout_override_is_parsed() {
        let config =
            ClientConfig::from_lookup(lookup(&[("LXR_REQUEST_TIMEOUT_SECS", "5")])).unwrap();
        assert_eq!(config.request_timeout, Duration::from_secs(5));
        assert_eq!(config.credentials.host(), "");
    }

    #[test]
    fn bad_timeout_is_rejected() {
        let err = ClientConfig::from_lookup(lookup(&[("LXR_REQUEST_TIMEOUT_SECS", "soon")]))
            .unwrap_err();
        assert!(err.to_string().contains("LXR_REQUEST_TIMEOUT_SECS"));
    }
}
