use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::watch;
use tracing::warn;

use crate::auth::TokenManager;
use crate::config::ClientConfig;
use crate::credentials::Credentials;
use crate::error::LeanIxError;
use crate::graphql::{GraphQlExecutor, GraphQlResponse};
use crate::retry::RetryConfig;
use crate::token::{AccessToken, JwtClaims, Session};
use crate::transport::{ReqwestTransport, Transport};

/// Narrow authentication seam used by workers and handlers.
#[async_trait]
pub trait Authenticate: Send + Sync {
    async fn authenticate(&self) -> Result<(), LeanIxError>;

    /// True once an authentication has published a token.
    fn is_authenticated(&self) -> bool;

    /// Authenticates only when no token was ever obtained.
    async fn ensure_authenticated(&self) -> Result<(), LeanIxError> {
        if self.is_authenticated() {
            Ok(())
        } else {
            self.authenticate().await
        }
    }
}

/// Errors that can report a rejected or missing access token.
pub trait AuthFailure {
    fn is_unauthenticated(&self) -> bool;
}

impl AuthFailure for LeanIxError {
    fn is_unauthenticated(&self) -> bool {
        LeanIxError::is_unauthenticated(self)
    }
}

/// Runs `operation`; when it fails with an unauthenticated error,
/// re-authenticates once and runs it exactly once more.
pub async fn retry_unauthenticated<A, F, Fut, R, E>(auth: &A, mut operation: F) -> Result<R, E>
where
    A: Authenticate + ?Sized,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<R, E>>,
    E: AuthFailure + From<LeanIxError>,
{
    match operation().await {
        Err(err) if err.is_unauthenticated() => {
            warn!("leanix rejected the access token; re-authenticating");
            auth.authenticate().await?;
            operation().await
        }
        other => other,
    }
}

/// One LeanIX workspace connection: token lifecycle plus GraphQL execution.
pub struct LeanIxClient<T: Transport = ReqwestTransport> {
    tokens: TokenManager<T>,
    executor: GraphQlExecutor<T>,
}

impl LeanIxClient<ReqwestTransport> {
    pub fn new(credentials: Credentials) -> Result<Self, LeanIxError> {
        Self::from_config(ClientConfig::new(credentials))
    }

    pub fn from_config(config: ClientConfig) -> Result<Self, LeanIxError> {
        let transport = ReqwestTransport::with_timeout(config.request_timeout)?;
        Ok(Self::with_transport(config.credentials, transport, config.retry))
    }
}

impl<T: Transport> LeanIxClient<T> {
    pub fn with_transport(credentials: Credentials, transport: T, retry: RetryConfig) -> Self {
        Self::with_shared_transport(credentials, Arc::new(transport), retry)
    }

    pub fn with_shared_transport(
        credentials: Credentials,
        transport: Arc<T>,
        retry: RetryConfig,
    ) -> Self {
        Self {
            tokens: TokenManager::new(credentials, transport.clone(), retry),
            executor: GraphQlExecutor::new(transport),
        }
    }

    pub fn credentials(&self) -> &Credentials {
        self.tokens.credentials()
    }

    pub fn access_token(&self) -> AccessToken {
        self.tokens.access_token()
    }

    pub fn jwt_claims(&self) -> JwtClaims {
        self.tokens.jwt_claims()
    }

    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.tokens.subscribe()
    }

    pub fn authentication_count(&self) -> u64 {
        self.tokens.authentication_count()
    }

    pub fn is_authenticating(&self) -> bool {
        self.tokens.is_authenticating()
    }

    pub async fn authenticate(&self) -> Result<(), LeanIxError> {
        self.tokens.authenticate().await
    }

    pub fn is_authenticated(&self) -> bool {
        !self.tokens.access_token().is_default()
    }

    pub async fn ensure_authenticated(&self) -> Result<(), LeanIxError> {
        Authenticate::ensure_authenticated(self).await
    }

    pub async fn execute_graphql<D: DeserializeOwned>(
        &self,
        query: &str,
        variables: Option<Value>,
    ) -> Result<GraphQlResponse<D>, LeanIxError> {
        let token = self.tokens.access_token();
        self.executor.execute(&token, query, variables).await
    }
}

#[async_trait]
impl<T: Transport> Authenticate for LeanIxClient<T> {
    async fn authenticate(&self) -> Result<(), LeanIxError> {
        self.tokens.authenticate().await
    }

    fn is_authenticated(&self) -> bool {
        LeanIxClient::is_authenticated(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::testing::{MockTransport, token_body};
    use crate::transport::RawResponse;
    use reqwest::StatusCode;
    use serde_json::json;

    fn client() -> (LeanIxClient<MockTransport>, Arc<MockTransport>) {
        let transport = Arc::new(MockTransport::default());
        let client = LeanIxClient::with_shared_transport(
            Credentials::new("demo.leanix.net", "api-token"),
            transport.clone(),
            RetryConfig::NONE,
        );
        (client, transport)
    }

    #[tokio::test]
    async fn execute_before_authentication_is_unauthenticated() {
        let (client, _) = client();
        assert!(!client.is_authenticated());
        let err = client
            .execute_graphql::<Value>("{allFactSheets{totalCount}}", None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unauthenticated);
    }

    #[tokio::test]
    async fn ensure_authenticated_only_authenticates_once() {
        let (client, mock) = client();
        mock.push_token(Ok(RawResponse::new(
            StatusCode::OK,
            token_body("https://demo-eu.leanix.net"),
        )));
        client.ensure_authenticated().await.unwrap();
        client.ensure_authenticated().await.unwrap();
        assert!(client.is_authenticated());
        assert_eq!(client.authentication_count(), 1);
        assert_eq!(mock.token_calls(), 1);
    }

    #[tokio::test]
    async fn unauthenticated_operation_is_retried_once_after_reauth() {
        let (client, mock) = client();
        for _ in 0..2 {
            mock.push_token(Ok(RawResponse::new(
                StatusCode::OK,
                token_body("https://demo-eu.leanix.net"),
            )));
        }
        mock.push_graphql(Ok(RawResponse::new(StatusCode::UNAUTHORIZED, "")));
        mock.push_graphql(Ok(RawResponse::new(
            StatusCode::OK,
            json!({ "data": { "ok": true } }).to_string(),
        )));
        client.authenticate().await.unwrap();

        let response: GraphQlResponse<Value> =
            retry_unauthenticated(&client, || client.execute_graphql("{ok}", None))
                .await
                .unwrap();
        assert_eq!(response.data.unwrap()["ok"], true);
        assert_eq!(client.authentication_count(), 2);
        assert_eq!(mock.graphql_requests().len(), 2);
    }

    #[tokio::test]
    async fn second_unauthenticated_failure_surfaces() {
        let (client, mock) = client();
        for _ in 0..2 {
            mock.push_token(Ok(RawResponse::new(
                StatusCode::OK,
                token_body("https://demo-eu.leanix.net"),
            )));
            mock.push_graphql(Ok(RawResponse::new(StatusCode::UNAUTHORIZED, "")));
        }
        client.authenticate().await.unwrap();

        let err = retry_unauthenticated(&client, || client.execute_graphql::<Value>("{ok}", None))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unauthenticated);
        assert_eq!(mock.graphql_requests().len(), 2);
    }

    #[tokio::test]
    async fn other_errors_are_not_retried() {
        let (client, mock) = client();
        mock.push_token(Ok(RawResponse::new(
            StatusCode::OK,
            token_body("https://demo-eu.leanix.net"),
        )));
        mock.push_graphql(Ok(RawResponse::new(StatusCode::BAD_GATEWAY, "")));
        client.authenticate().await.unwrap();

        let err = retry_unauthenticated(&client, || client.execute_graphql::<Value>("{ok}", None))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Status);
        assert_eq!(client.authentication_count(), 1);
    }
}
