use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url, header};
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::error::LeanIxError;

/// Username LeanIX expects for api token basic auth.
pub const API_TOKEN_USER: &str = "apitoken";

/// Body of a GraphQL request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphQlRequest {
    pub query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variables: Option<Value>,
}

/// Status and body of a LeanIX response, before interpretation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: StatusCode,
    pub body: String,
}

impl RawResponse {
    pub fn new(status: StatusCode, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

/// HTTP seam between the client and LeanIX.
#[async_trait]
pub trait Transport: Send + Sync {
    /// POSTs a client-credentials token request authenticated with the api token.
    async fn request_token(&self, url: Url, api_token: &str) -> Result<RawResponse, LeanIxError>;

    /// POSTs a GraphQL request authenticated with a bearer access token.
    async fn post_graphql(
        &self,
        url: Url,
        access_token: &str,
        request: &GraphQlRequest,
    ) -> Result<RawResponse, LeanIxError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    http: Client,
}

impl ReqwestTransport {
    pub fn new(http: Client) -> Self {
        Self { http }
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, LeanIxError> {
        let http = Client::builder()
            .user_agent(concat!("lx-core/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(LeanIxError::Transport)?;
        Ok(Self::new(http))
    }

    async fn read(response: reqwest::Response) -> Result<RawResponse, LeanIxError> {
        let status = response.status();
        let body = response.text().await.map_err(LeanIxError::Transport)?;
        Ok(RawResponse { status, body })
    }
}

fn send_error(url: &Url, err: reqwest::Error) -> LeanIxError {
    if err.is_connect() {
        let hostname = url.host_str().unwrap_or_default().to_string();
        debug!(%hostname, error = %err, "connection to leanix failed");
        LeanIxError::NetworkConnectivity { hostname }
    } else {
        LeanIxError::Transport(err)
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn request_token(&self, url: Url, api_token: &str) -> Result<RawResponse, LeanIxError> {
        let response = self
            .http
            .post(url.clone())
            .basic_auth(API_TOKEN_USER, Some(api_token))
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .send()
            .await
            .map_err(|err| send_error(&url, err))?;
        Self::read(response).await
    }

    async fn post_graphql(
        &self,
        url: Url,
        access_token: &str,
        request: &GraphQlRequest,
    ) -> Result<RawResponse, LeanIxError> {
        let response = self
            .http
            .post(url.clone())
            .bearer_auth(access_token)
            .json(request)
            .send()
            .await
            .map_err(|err| send_error(&url, err))?;
        Self::read(response).await
    }
}
