use std::sync::Arc;

use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, instrument};

use crate::error::LeanIxError;
use crate::token::{AccessToken, decode_claims};
use crate::transport::{GraphQlRequest, Transport};

/// Path of the pathfinder GraphQL endpoint on a LeanIX instance.
pub const GRAPHQL_PATH: &str = "/services/pathfinder/v1/graphql";

/// Standard GraphQL response envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphQlResponse<T> {
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<GraphQlError>>,
}

impl<T> GraphQlResponse<T> {
    pub fn has_errors(&self) -> bool {
        self.errors.as_ref().is_some_and(|errors| !errors.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphQlError {
    pub message: String,
    #[serde(default)]
    pub locations: Vec<Location>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<Vec<Value>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub line: u32,
    pub column: u32,
}

/// Posts GraphQL documents to the instance named inside an access token.
pub struct GraphQlExecutor<T: Transport> {
    transport: Arc<T>,
}

impl<T: Transport> GraphQlExecutor<T> {
    pub fn new(transport: Arc<T>) -> Self {
        Self { transport }
    }

    /// Executes `query` with `access_token`.
    ///
    /// A token that does not decode (including the never-authenticated
    /// sentinel) and an HTTP 401 both yield [`LeanIxError::Unauthenticated`].
    /// GraphQL-level errors come back inside an `Ok` response.
    #[instrument(name = "lx.graphql", skip_all)]
    pub async fn execute<D: DeserializeOwned>(
        &self,
        access_token: &AccessToken,
        query: &str,
        variables: Option<Value>,
    ) -> Result<GraphQlResponse<D>, LeanIxError> {
        let claims = decode_claims(&access_token.access_token).map_err(|err| {
            debug!(error = %err, "access token unusable");
            LeanIxError::Unauthenticated
        })?;
        let mut url = claims.instance_url()?;
        url.set_path(GRAPHQL_PATH);
        url.set_query(None);

        let request = GraphQlRequest {
            query: query.to_string(),
            variables,
        };
        let response = self
            .transport
            .post_graphql(url, &access_token.access_token, &request)
            .await?;

        match response.status {
            StatusCode::OK => serde_json::from_str(&response.body).map_err(LeanIxError::Payload),
            StatusCode::UNAUTHORIZED => Err(LeanIxError::Unauthenticated),
            status => Err(LeanIxError::Status {
                status,
                body: response.body,
            }),
        }
    }
}
