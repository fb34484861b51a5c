use std::fmt;

use url::Url;

use crate::error::LeanIxError;

pub const HOST_ENV: &str = "LXR_HOST";
pub const API_TOKEN_ENV: &str = "LXR_APITOKEN";

const TOKEN_PATH: &str = "/services/mtm/v1/oauth2/token";

/// Host and api token of a LeanIX workspace.
///
/// Values are not validated on construction; a bad host or token surfaces
/// on the first authentication attempt.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    host: String,
    api_token: String,
}

impl Credentials {
    pub fn new(host: impl Into<String>, api_token: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            api_token: api_token.into(),
        }
    }

    /// Reads `LXR_HOST` and `LXR_APITOKEN`; missing values become empty strings.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self::new(
            lookup(HOST_ENV).unwrap_or_default(),
            lookup(API_TOKEN_ENV).unwrap_or_default(),
        )
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn api_token(&self) -> &str {
        &self.api_token
    }

    /// OAuth2 token endpoint for these credentials.
    pub fn token_url(&self) -> Result<Url, LeanIxError> {
        let raw = if self.host.contains("://") {
            self.host.clone()
        } else {
            format!("https://{}", self.host)
        };
        let mut url = Url::parse(&raw).map_err(LeanIxError::InvalidHost)?;
        url.set_path(TOKEN_PATH);
        url.query_pairs_mut()
            .clear()
            .append_pair("grant_type", "client_credentials");
        Ok(url)
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("host", &self.host)
            .field("api_token", &"<redacted>")
            .finish()
    }
}
