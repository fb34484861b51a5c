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

pub const BUSINESS_CAPABILITY: &str = "BusinessCapability";
pub const MATURITY_GAP_FIELD: &str = "maturityGap";

const FETCH_CAPABILITY: &str = "query ($id: ID!) { factSheet(id: $id) { id type name ...on BusinessCapability { targetMaturity currentMaturity maturityGap } } }";

const FETCH_CAPABILITIES_PAGE: &str = r#"
query ($first: Int, $after: String) {
  allFactSheets(factSheetType: BusinessCapability, first: $first, after: $after) {
    pageInfo { hasNextPage endCursor }
    edges {
      node {
        ... on BusinessCapability { id type name targetMaturity currentMaturity maturityGap }
      }
    }
  }
}"#;

const UPDATE_MATURITY_GAP: &str = "mutation ($id: ID!, $patches: [Patch]!) { updateFactSheet(id: $id, patches: $patches, validateOnly: false) { factSheet { ...on BusinessCapability { id type maturityGap } } } }";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CapabilityNode {
    id: String,
    #[serde(rename = "type", default)]
    fact_sheet_type: String,
    #[serde(default)]
    name: String,
    target_maturity: Option<String>,
    current_maturity: Option<String>,
    maturity_gap: Option<String>,
}

impl From<CapabilityNode> for FactSheetState {
    fn from(node: CapabilityNode) -> Self {
        let expected = rules::maturity_gap(
            node.current_maturity.as_deref(),
            node.target_maturity.as_deref(),
        )
        .map(str::to_string);
        FactSheetState {
            id: node.id,
            name: node.name,
            rev: None,
            current: node.maturity_gap,
            expected,
        }
    }
}

/// Derives `maturityGap` on Business Capabilities from current and target maturity.
pub struct MaturityGapReconciler<T: Transport = ReqwestTransport> {
    client: Arc<LeanIxClient<T>>,
}

impl<T: Transport> MaturityGapReconciler<T> {
    pub fn new(client: Arc<LeanIxClient<T>>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl<T: Transport> Reconciler for MaturityGapReconciler<T> {
    fn fact_sheet_type(&self) -> &'static str {
        BUSINESS_CAPABILITY
    }

    fn field(&self) -> &'static str {
        MATURITY_GAP_FIELD
    }

    async fn fetch(&self, id: &str) -> Result<Option<FactSheetState>, ReconcileError> {
        let data: FactSheetData<CapabilityNode> =
            query(&self.client, FETCH_CAPABILITY, json!({ "id": id })).await?;
        match data.fact_sheet {
            Some(node) if node.fact_sheet_type == BUSINESS_CAPABILITY => Ok(Some(node.into())),
            Some(node) => {
                debug!(id, fact_sheet_type = %node.fact_sheet_type, "not a business capability");
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn fetch_page(&self, after: Option<&str>) -> Result<Page, ReconcileError> {
        let data: AllFactSheetsData<CapabilityNode> = query(
            &self.client,
            FETCH_CAPABILITIES_PAGE,
            json!({ "first": PAGE_SIZE, "after": after }),
        )
        .await?;
        Ok(data.all_fact_sheets.into_page(FactSheetState::from))
    }

    async fn apply(&self, state: &FactSheetState) -> Result<(), ReconcileError> {
        let variables = json!({
            "id": state.id,
            "patches": [{
                "op": "replace",
                "path": format!("/{MATURITY_GAP_FIELD}"),
                "value": state.expected,
            }]
        });
        let _: serde_json::Value = query(&self.client, UPDATE_MATURITY_GAP, variables).await?;
        Ok(())
    }
}
