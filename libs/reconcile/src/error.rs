use lx_core::{AuthFailure, ErrorKind, LeanIxError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error(transparent)]
    LeanIx(#[from] LeanIxError),
    /// The response carried a GraphQL `errors` array or no data.
    #[error("graphql request failed: {0}")]
    GraphQl(String),
    #[error("unexpected fact sheet payload")]
    Payload(#[source] serde_json::Error),
}

impl ReconcileError {
    /// Kind of the underlying client error, if any.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            ReconcileError::LeanIx(err) => Some(err.kind()),
            _ => None,
        }
    }

    pub fn is_unauthenticated(&self) -> bool {
        self.kind() == Some(ErrorKind::Unauthenticated)
    }
}

impl AuthFailure for ReconcileError {
    fn is_unauthenticated(&self) -> bool {
        ReconcileError::is_unauthenticated(self)
    }
}

/// Returned by [`crate::WorkQueue::push`] once the queue has shut down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("work queue is closed")]
pub struct QueueClosed;
