//! Reconciliation of derived LeanIX fact sheet fields.
//!
//! Webhook deliveries become [`ReconcileTask`]s on a [`WorkQueue`] that a
//! [`ReconcileWorker`] drains one at a time. [`refresh_all`] performs the same
//! reconciliation over every fact sheet of a type.

pub mod error;
pub mod factsheet;
pub mod kind;
pub mod maturity_gap;
pub mod operational_status;
pub mod queue;
pub mod rules;
pub mod sweep;
pub mod worker;

pub use error::{QueueClosed, ReconcileError};
pub use factsheet::{FactSheetState, PAGE_SIZE, Page, Reconciler};
pub use kind::{ReconcilerKind, UnknownReconciler};
pub use maturity_gap::MaturityGapReconciler;
pub use operational_status::OperationalStatusReconciler;
pub use queue::{ReconcileTask, TaskHandler, WorkQueue};
pub use sweep::{SweepSummary, refresh_all};
pub use worker::{Outcome, ReconcileWorker};
