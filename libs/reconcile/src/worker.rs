use std::sync::Arc;

use async_trait::async_trait;
use lx_core::{Authenticate, retry_unauthenticated};
use metrics::counter;
use tracing::{Instrument, error, info, info_span, warn};

use crate::error::ReconcileError;
use crate::factsheet::Reconciler;
use crate::queue::{ReconcileTask, TaskHandler};

/// What handling a task did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Unchanged,
    Updated,
    NotFound,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Unchanged => "unchanged",
            Outcome::Updated => "updated",
            Outcome::NotFound => "not_found",
        }
    }
}

/// Brings one fact sheet's derived field in line with its source fields.
#[derive(Clone)]
pub struct ReconcileWorker {
    auth: Arc<dyn Authenticate>,
    reconciler: Arc<dyn Reconciler>,
}

impl ReconcileWorker {
    pub fn new(auth: Arc<dyn Authenticate>, reconciler: Arc<dyn Reconciler>) -> Self {
        Self { auth, reconciler }
    }

    pub async fn reconcile(&self, task: &ReconcileTask) -> Result<Outcome, ReconcileError> {
        let id = task.entity_id.as_str();
        let reconciler = self.reconciler.as_ref();
        let Some(state) = retry_unauthenticated(self.auth.as_ref(), || reconciler.fetch(id)).await?
        else {
            warn!(id, "could not fetch fact sheet");
            return Ok(Outcome::NotFound);
        };
        if !state.needs_update() {
            return Ok(Outcome::Unchanged);
        }
        self.reconciler.apply(&state).await?;
        info!(
            id,
            name = %state.name,
            field = self.reconciler.field(),
            from = ?state.current,
            to = ?state.expected,
            "updated derived field"
        );
        Ok(Outcome::Updated)
    }
}

#[async_trait]
impl TaskHandler for ReconcileWorker {
    async fn handle(&self, task: ReconcileTask) {
        let span = info_span!(
            "reconcile.task",
            entity_id = %task.entity_id,
            fact_sheet_type = self.reconciler.fact_sheet_type()
        );
        let outcome = match self.reconcile(&task).instrument(span).await {
            Ok(outcome) => outcome.as_str(),
            Err(err) => {
                error!(entity_id = %task.entity_id, error = %err, "reconcile task failed");
                "failed"
            }
        };
        counter!("reconcile_tasks_total", "outcome" => outcome).increment(1);
    }
}
