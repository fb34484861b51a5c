use lx_core::{Authenticate, retry_unauthenticated};
use serde::Serialize;
use tracing::{error, info, instrument};

use crate::error::ReconcileError;
use crate::factsheet::{FactSheetState, Reconciler};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepSummary {
    pub scanned: usize,
    pub updated: usize,
    pub failed: usize,
}

/// Reconciles every fact sheet of the reconciler's type.
///
/// Paging failures abort the sweep; a failed mutation is counted and the
/// sweep moves on.
#[instrument(name = "reconcile.sweep", skip_all, fields(fact_sheet_type = reconciler.fact_sheet_type()))]
pub async fn refresh_all(
    auth: &dyn Authenticate,
    reconciler: &dyn Reconciler,
) -> Result<SweepSummary, ReconcileError> {
    auth.ensure_authenticated().await?;

    let mut states: Vec<FactSheetState> = Vec::new();
    let mut after: Option<String> = None;
    loop {
        let cursor = after.as_deref();
        let page = retry_unauthenticated(auth, || reconciler.fetch_page(cursor)).await?;
        states.extend(page.states);
        match page.next {
            Some(next) => after = Some(next),
            None => break,
        }
    }

    let mut summary = SweepSummary {
        scanned: states.len(),
        ..SweepSummary::default()
    };
    for state in states.iter().filter(|state| state.needs_update()) {
        match reconciler.apply(state).await {
            Ok(()) => {
                info!(id = %state.id, name = %state.name, to = ?state.expected, "updating");
                summary.updated += 1;
            }
            Err(err) => {
                error!(id = %state.id, error = %err, "update failed");
                summary.failed += 1;
            }
        }
    }

    if summary.updated == 0 && summary.failed == 0 {
        info!(scanned = summary.scanned, field = reconciler.field(), "all fact sheets up to date");
    } else {
        info!(
            scanned = summary.scanned,
            updated = summary.updated,
            failed = summary.failed,
            "sweep finished"
        );
    }
    Ok(summary)
}
