use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use metrics::counter;
use reqwest::StatusCode;
use tokio::sync::{Mutex, watch};
use tracing::{debug, info, instrument};

use crate::credentials::Credentials;
use crate::error::LeanIxError;
use crate::retry::{RetryConfig, retry_connectivity};
use crate::token::{AccessToken, JwtClaims, Session, decode_claims};
use crate::transport::Transport;

/// Owns the access token of one credential set and refreshes it single-flight.
///
/// Callers that arrive while an authentication is in flight wait for it; if
/// that cycle succeeds they return without requesting a token of their own.
pub struct TokenManager<T: Transport> {
    credentials: Credentials,
    transport: Arc<T>,
    retry: RetryConfig,
    session: watch::Sender<Session>,
    in_flight: Mutex<()>,
    authentication_count: AtomicU64,
}

impl<T: Transport> TokenManager<T> {
    pub fn new(credentials: Credentials, transport: Arc<T>, retry: RetryConfig) -> Self {
        let (session, _) = watch::channel(Session::default());
        Self {
            credentials,
            transport,
            retry,
            session,
            in_flight: Mutex::new(()),
            authentication_count: AtomicU64::new(0),
        }
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn access_token(&self) -> AccessToken {
        self.session.borrow().access_token.clone()
    }

    pub fn jwt_claims(&self) -> JwtClaims {
        self.session.borrow().claims.clone()
    }

    /// Receiver notified every time a new session is published.
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.session.subscribe()
    }

    /// Number of successful authentication cycles.
    pub fn authentication_count(&self) -> u64 {
        self.authentication_count.load(Ordering::SeqCst)
    }

    pub fn is_authenticating(&self) -> bool {
        self.in_flight.try_lock().is_err()
    }

    #[instrument(name = "lx.authenticate", skip(self), fields(host = %self.credentials.host()))]
    pub async fn authenticate(&self) -> Result<(), LeanIxError> {
        let observed = self.authentication_count();
        let _in_flight = self.in_flight.lock().await;
        if self.authentication_count() != observed {
            debug!("token refreshed by a concurrent authentication");
            return Ok(());
        }

        let session = self.request_session().await?;
        let workspace = session.claims.principal.permission.workspace_name.clone();
        self.session.send_replace(session);
        let count = self.authentication_count.fetch_add(1, Ordering::SeqCst) + 1;
        counter!("lx_authentications_total").increment(1);
        info!(count, %workspace, "authenticated against leanix");
        Ok(())
    }

    async fn request_session(&self) -> Result<Session, LeanIxError> {
        let url = self.credentials.token_url()?;
        let response = retry_connectivity(self.retry, || {
            self.transport
                .request_token(url.clone(), self.credentials.api_token())
        })
        .await?;

        match response.status {
            StatusCode::UNAUTHORIZED => return Err(LeanIxError::InvalidApiToken),
            status if !status.is_success() => {
                return Err(LeanIxError::Status {
                    status,
                    body: response.body,
                });
            }
            _ => {}
        }

        let access_token = AccessToken::from_token_response(&response.body)?;
        let claims = decode_claims(&access_token.access_token)?;
        claims.instance_url()?;
        Ok(Session {
            access_token,
            claims,
        })
    }
}
