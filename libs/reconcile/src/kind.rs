use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use lx_core::{LeanIxClient, Transport};
use thiserror::Error;

use crate::factsheet::Reconciler;
use crate::maturity_gap::{BUSINESS_CAPABILITY, MaturityGapReconciler};
use crate::operational_status::{APPLICATION, OperationalStatusReconciler};

/// Selects one of the known derived-field reconcilers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReconcilerKind {
    #[default]
    OperationalStatus,
    MaturityGap,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown reconciler '{0}' (expected operational-status or maturity-gap)")]
pub struct UnknownReconciler(pub String);

impl ReconcilerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReconcilerKind::OperationalStatus => "operational-status",
            ReconcilerKind::MaturityGap => "maturity-gap",
        }
    }

    /// Fact sheet type the reconciler handles.
    pub fn fact_sheet_type(&self) -> &'static str {
        match self {
            ReconcilerKind::OperationalStatus => APPLICATION,
            ReconcilerKind::MaturityGap => BUSINESS_CAPABILITY,
        }
    }

    pub fn build<T: Transport + 'static>(&self, client: Arc<LeanIxClient<T>>) -> Arc<dyn Reconciler> {
        match self {
            ReconcilerKind::OperationalStatus => Arc::new(OperationalStatusReconciler::new(client)),
            ReconcilerKind::MaturityGap => Arc::new(MaturityGapReconciler::new(client)),
        }
    }
}

impl fmt::Display for ReconcilerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReconcilerKind {
    type Err = UnknownReconciler;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "operational-status" => Ok(ReconcilerKind::OperationalStatus),
            "maturity-gap" => Ok(ReconcilerKind::MaturityGap),
            other => Err(UnknownReconciler(other.to_string())),
        }
    }
}
