use std::sync::Arc;

use async_trait::async_trait;
use lx_core::{LeanIxClient, ReqwestTransport, Transport};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::error::ReconcileError;
use crate::factsheet::{
    AllFactSheetsData, FactSheetData, FactSheetState, PAGE_SIZE, Page, Reconciler, query,
};
use crate::rules;

pub const APPLICATION: &str = "Application";
pub const OPERATIONAL_STATUS_FIELD: &str = "mbgAppOperationalStatus";

const FETCH_APPLICATION: &str = "query ($factSheetId: ID!) { factSheet(id: $factSheetId) { id type ...on Application { rev name lifecycle { asString } mbgAppOperationalStatus } } }";

const FETCH_APPLICATIONS_PAGE: &str = r#"
query ($first: Int, $after: String) {
  allFactSheets(factSheetType: Application, first: $first, after: $after) {
    pageInfo { hasNextPage endCursor }
    edges {
      node {
        ... on Application { id type rev name lifecycle { asString } mbgAppOperationalStatus }
      }
    }
  }
}"#;

const UPDATE_OPERATIONAL_STATUS: &str = r#"
mutation ($factSheetId: ID!, $rev: Long, $patches: [Patch]!) {
  updateFactSheet(id: $factSheetId, rev: $rev, patches: $patches) {
    factSheet { id }
  }
}"#;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApplicationNode {
    id: String,
    #[serde(rename = "type", default)]
    fact_sheet_type: String,
    #[serde(default)]
    name: String,
    rev: Option<i64>,
    lifecycle: Option<Lifecycle>,
    mbg_app_operational_status: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Lifecycle {
    as_string: Option<String>,
}

impl From<ApplicationNode> for FactSheetState {
    fn from(node: ApplicationNode) -> Self {
        let lifecycle = node.lifecycle.and_then(|lifecycle| lifecycle.as_string);
        let expected = rules::operational_status(lifecycle.as_deref()).map(str::to_string);
        FactSheetState {
            id: node.id,
            name: node.name,
            rev: node.rev,
            current: node.mbg_app_operational_status,
            expected,
        }
    }
}

/// Derives `mbgAppOperationalStatus` on Applications from their lifecycle phase.
///
/// Patches are conditioned on the revision read, so a concurrent edit makes
/// the mutation fail instead of overwriting it.
pub struct OperationalStatusReconciler<T: Transport = ReqwestTransport> {
    client: Arc<LeanIxClient<T>>,
}

impl<T: Transport> OperationalStatusReconciler<T> {
    pub fn new(client: Arc<LeanIxClient<T>>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl<T: Transport> Reconciler for OperationalStatusReconciler<T> {
    fn fact_sheet_type(&self) -> &'static str {
        APPLICATION
    }

    fn field(&self) -> &'static str {
        OPERATIONAL_STATUS_FIELD
    }

    async fn fetch(&self, id: &str) -> Result<Option<FactSheetState>, ReconcileError> {
        let data: FactSheetData<ApplicationNode> =
            query(&self.client, FETCH_APPLICATION, json!({ "factSheetId": id })).await?;
        match data.fact_sheet {
            Some(node) if node.fact_sheet_type == APPLICATION => Ok(Some(node.into())),
            Some(node) => {
                debug!(id, fact_sheet_type = %node.fact_sheet_type, "not an application");
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn fetch_page(&self, after: Option<&str>) -> Result<Page, ReconcileError> {
        let data: AllFactSheetsData<ApplicationNode> = query(
            &self.client,
            FETCH_APPLICATIONS_PAGE,
            json!({ "first": PAGE_SIZE, "after": after }),
        )
        .await?;
        Ok(data.all_fact_sheets.into_page(FactSheetState::from))
    }

    async fn apply(&self, state: &FactSheetState) -> Result<(), ReconcileError> {
        let variables = json!({
            "factSheetId": state.id,
            "rev": state.rev,
            "patches": [{
                "op": "replace",
                "path": format!("/{OPERATIONAL_STATUS_FIELD}"),
                "value": state.expected,
            }]
        });
        let _: serde_json::Value = query(&self.client, UPDATE_OPERATIONAL_STATUS, variables).await?;
        Ok(())
    }
}
