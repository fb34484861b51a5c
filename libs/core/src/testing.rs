use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Url;
use serde_json::json;

use crate::error::LeanIxError;
use crate::token::test_tokens;
use crate::transport::{GraphQlRequest, RawResponse, Transport};

/// Token endpoint body carrying a freshly signed token for `instance_url`.
pub fn token_body(instance_url: &str) -> String {
    json!({
        "access_token": test_tokens::signed(instance_url),
        "token_type": "bearer",
        "expires_in": 3599,
        "scope": "",
        "expired": false
    })
    .to_string()
}

#[derive(Default)]
pub struct MockTransport {
    token_delay: Duration,
    token_responses: Mutex<VecDeque<Result<RawResponse, LeanIxError>>>,
    graphql_responses: Mutex<VecDeque<Result<RawResponse, LeanIxError>>>,
    token_requests: Mutex<Vec<(Url, String)>>,
    graphql_requests: Mutex<Vec<(Url, String, GraphQlRequest)>>,
    token_calls: AtomicUsize,
}

impl MockTransport {
    pub fn with_token_delay(token_delay: Duration) -> Self {
        Self {
            token_delay,
            ..Self::default()
        }
    }

    pub fn push_token(&self, response: Result<RawResponse, LeanIxError>) {
        self.token_responses.lock().unwrap().push_back(response);
    }

    pub fn push_graphql(&self, response: Result<RawResponse, LeanIxError>) {
        self.graphql_responses.lock().unwrap().push_back(response);
    }

    pub fn token_calls(&self) -> usize {
        self.token_calls.load(Ordering::SeqCst)
    }

    pub fn last_token_request(&self) -> Option<(Url, String)> {
        self.token_requests.lock().unwrap().last().cloned()
    }

    pub fn graphql_requests(&self) -> Vec<(Url, String, GraphQlRequest)> {
        self.graphql_requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn request_token(&self, url: Url, api_token: &str) -> Result<RawResponse, LeanIxError> {
        self.token_calls.fetch_add(1, Ordering::SeqCst);
        self.token_requests
            .lock()
            .unwrap()
            .push((url, api_token.to_string()));
        if !self.token_delay.is_zero() {
            tokio::time::sleep(self.token_delay).await;
        }
        self.token_responses
            .lock()
            .unwrap()
            .pop_front()
            .expect("unexpected token request")
    }

    async fn post_graphql(
        &self,
        url: Url,
        access_token: &str,
        request: &GraphQlRequest,
    ) -> Result<RawResponse, LeanIxError> {
        self.graphql_requests
            .lock()
            .unwrap()
            .push((url, access_token.to_string(), request.clone()));
        self.graphql_responses
            .lock()
            .unwrap()
            .pop_front()
            .expect("unexpected graphql request")
    }
}
