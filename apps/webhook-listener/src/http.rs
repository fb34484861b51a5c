use std::sync::Arc;

use axum::{
    Router, debug_handler,
    extract::{Extension, Json, rejection::JsonRejection},
    http::{Method, StatusCode},
    middleware,
    routing::{any, get},
};
use lx_core::{Authenticate, ErrorKind, LeanIxError};
use lx_reconcile::{ReconcileTask, WorkQueue};
use lx_sequencing::SequencingGuard;
use lx_telemetry::record_entity;
use serde::Serialize;
use serde_json::{Value, json};
use tracing::{Instrument, Span, debug, error, field, info};

use crate::payload::{FACT_SHEET_UPDATED_EVENT, WebhookPayload};
use crate::reqid::{RequestId, with_request_id};

#[derive(Clone)]
pub struct ListenerState {
    pub auth: Arc<dyn Authenticate>,
    pub guard: SequencingGuard,
    pub queue: Arc<WorkQueue>,
    /// Fact sheet type whose updates are reconciled.
    pub fact_sheet_type: &'static str,
}

#[derive(Serialize, Debug)]
pub struct ApiError {
    error: String,
}

type ApiFailure = (StatusCode, Json<ApiError>);

fn api_error(status: StatusCode, message: impl Into<String>) -> ApiFailure {
    (
        status,
        Json(ApiError {
            error: message.into(),
        }),
    )
}

fn invalid_request() -> ApiFailure {
    api_error(StatusCode::BAD_REQUEST, "invalid request")
}

fn unauthorized() -> ApiFailure {
    api_error(StatusCode::UNAUTHORIZED, "unauthorized")
}

fn internal() -> ApiFailure {
    api_error(
        StatusCode::INTERNAL_SERVER_ERROR,
        "something went wrong, please try again later",
    )
}

/// HTTP response for a client failure.
pub fn failure_response(err: &LeanIxError) -> ApiFailure {
    let kind = err.kind();
    match kind {
        ErrorKind::InvalidHost | ErrorKind::InvalidApiToken => {
            error!(kind = kind.as_str(), error = %err, "invalid credentials");
            unauthorized()
        }
        ErrorKind::Unauthenticated => {
            error!(kind = kind.as_str(), error = %err, "unauthenticated");
            unauthorized()
        }
        ErrorKind::NetworkConnectivity => {
            error!(kind = kind.as_str(), error = %err, "leanix unreachable");
            internal()
        }
        ErrorKind::Status
        | ErrorKind::Transport
        | ErrorKind::Payload
        | ErrorKind::Jwt
        | ErrorKind::InvalidInstanceUrl => {
            error!(kind = kind.as_str(), error = %err, "leanix request failed");
            internal()
        }
    }
}

pub fn build_router(state: ListenerState) -> Router {
    Router::new()
        .route("/webhook", any(webhook))
        .route("/healthz", get(healthz))
        .layer(middleware::from_fn(with_request_id))
        .layer(Extension(Arc::new(state)))
}

#[debug_handler]
async fn webhook(
    Extension(state): Extension<Arc<ListenerState>>,
    Extension(request_id): Extension<RequestId>,
    method: Method,
    payload: Result<Json<WebhookPayload>, JsonRejection>,
) -> Result<StatusCode, ApiFailure> {
    let span = tracing::info_span!(
        "webhook",
        request_id = %request_id.0,
        entity_id = field::Empty,
        sequence = field::Empty
    );
    async move {
        // Rejected tokens are recovered by the worker when it calls LeanIX.
        state
            .auth
            .ensure_authenticated()
            .await
            .map_err(|err| failure_response(&err))?;
        admit(&state, method, payload).await
    }
    .instrument(span)
    .await
}

async fn admit(
    state: &ListenerState,
    method: Method,
    payload: Result<Json<WebhookPayload>, JsonRejection>,
) -> Result<StatusCode, ApiFailure> {
    if method != Method::POST {
        debug!(%method, "rejecting non-POST delivery");
        return Err(invalid_request());
    }
    let Json(payload) = payload.map_err(|rejection| {
        debug!(error = %rejection, "rejecting malformed delivery");
        invalid_request()
    })?;
    let Some(entity_id) = payload.updated_fact_sheet(state.fact_sheet_type) else {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            format!(
                "not a \"{FACT_SHEET_UPDATED_EVENT}\" or an \"{}\" factsheet type",
                state.fact_sheet_type
            ),
        ));
    };
    let sequence = payload.transaction_sequence_number;
    record_entity(&Span::current(), entity_id, Some(sequence));

    let admitted = state
        .guard
        .should_process(entity_id, sequence)
        .await
        .map_err(|err| {
            error!(error = %err, "sequence store unavailable");
            internal()
        })?;
    if !admitted {
        return Ok(StatusCode::NO_CONTENT);
    }

    state
        .queue
        .push(ReconcileTask::new(entity_id))
        .map_err(|err| {
            error!(error = %err, "could not queue reconcile task");
            internal()
        })?;
    info!(pending = state.queue.pending(), "reconcile task queued");
    Ok(StatusCode::OK)
}

async fn healthz(Extension(state): Extension<Arc<ListenerState>>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "authenticated": state.auth.is_authenticated(),
        "pending": state.queue.pending(),
    }))
}
