use reqwest::StatusCode;
use thiserror::Error;

/// Failures surfaced by the LeanIX client.
#[derive(Debug, Error)]
pub enum LeanIxError {
    #[error("invalid leanix host in credentials")]
    InvalidHost(#[source] url::ParseError),
    #[error("invalid apitoken in credentials")]
    InvalidApiToken,
    #[error("host is unreachable *** {hostname} ***")]
    NetworkConnectivity { hostname: String },
    #[error("unauthenticated")]
    Unauthenticated,
    #[error("leanix responded with status {status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error("leanix transport error")]
    Transport(#[source] reqwest::Error),
    #[error("invalid leanix response body")]
    Payload(#[source] serde_json::Error),
    #[error("access token is not a valid jwt")]
    Jwt(#[source] jsonwebtoken::errors::Error),
    #[error("access token carries an invalid instance url '{0}'")]
    InvalidInstanceUrl(String),
}

/// Flat discriminant for matching on [`LeanIxError`] without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidHost,
    InvalidApiToken,
    NetworkConnectivity,
    Unauthenticated,
    Status,
    Transport,
    Payload,
    Jwt,
    InvalidInstanceUrl,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidHost => "invalid_host",
            ErrorKind::InvalidApiToken => "invalid_api_token",
            ErrorKind::NetworkConnectivity => "network_connectivity",
            ErrorKind::Unauthenticated => "unauthenticated",
            ErrorKind::Status => "status",
            ErrorKind::Transport => "transport",
            ErrorKind::Payload => "payload",
            ErrorKind::Jwt => "jwt",
            ErrorKind::InvalidInstanceUrl => "invalid_instance_url",
        }
    }
}

impl LeanIxError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LeanIxError::InvalidHost(_) => ErrorKind::InvalidHost,
            LeanIxError::InvalidApiToken => ErrorKind::InvalidApiToken,
            LeanIxError::NetworkConnectivity { .. } => ErrorKind::NetworkConnectivity,
            LeanIxError::Unauthenticated => ErrorKind::Unauthenticated,
            LeanIxError::Status { .. } => ErrorKind::Status,
            LeanIxError::Transport(_) => ErrorKind::Transport,
            LeanIxError::Payload(_) => ErrorKind::Payload,
            LeanIxError::Jwt(_) => ErrorKind::Jwt,
            LeanIxError::InvalidInstanceUrl(_) => ErrorKind::InvalidInstanceUrl,
        }
    }

    pub fn is_unauthenticated(&self) -> bool {
        self.kind() == ErrorKind::Unauthenticated
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_match_operator_facing_wording() {
        assert_eq!(
            LeanIxError::InvalidApiToken.to_string(),
            "invalid apitoken in credentials"
        );
        let err = url::Url::parse("https://").unwrap_err();
        assert_eq!(
            LeanIxError::InvalidHost(err).to_string(),
            "invalid leanix host in credentials"
        );
        let status = LeanIxError::Status {
            status: StatusCode::BAD_GATEWAY,
            body: "upstream".into(),
        };
        assert!(status.to_string().contains("502"));
    }

    #[test]
    fn kinds_have_stable_labels() {
        assert_eq!(LeanIxError::InvalidApiToken.kind().as_str(), "invalid_api_token");
        assert_eq!(
            LeanIxError::NetworkConnectivity {
                hostname: "demo.leanix.net".into()
            }
            .kind()
            .as_str(),
            "network_connectivity"
        );
        assert!(LeanIxError::Unauthenticated.is_unauthenticated());
        assert!(!LeanIxError::InvalidApiToken.is_unauthenticated());
    }
}
