use async_trait::async_trait;
use lx_core::{LeanIxClient, Transport};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::ReconcileError;

/// Current and expected value of a derived field on one fact sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FactSheetState {
    pub id: String,
    pub name: String,
    /// Revision the state was read at, when the reconciler patches conditionally.
    pub rev: Option<i64>,
    pub current: Option<String>,
    pub expected: Option<String>,
}

impl FactSheetState {
    pub fn needs_update(&self) -> bool {
        self.current != self.expected
    }
}

/// One page of fact sheets plus the cursor of the next page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Page {
    pub states: Vec<FactSheetState>,
    pub next: Option<String>,
}

/// Reads and patches one derived field on one fact sheet type.
#[async_trait]
pub trait Reconciler: Send + Sync {
    /// LeanIX fact sheet type handled, e.g. `Application`.
    fn fact_sheet_type(&self) -> &'static str;

    /// Name of the derived field.
    fn field(&self) -> &'static str;

    /// State of fact sheet `id`, or `None` when it does not exist or has
    /// another type.
    async fn fetch(&self, id: &str) -> Result<Option<FactSheetState>, ReconcileError>;

    /// One page of all fact sheets of the handled type.
    async fn fetch_page(&self, after: Option<&str>) -> Result<Page, ReconcileError>;

    /// Writes `state.expected` into the derived field.
    async fn apply(&self, state: &FactSheetState) -> Result<(), ReconcileError>;
}

/// Page size used when listing fact sheets.
pub const PAGE_SIZE: u32 = 5000;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct FactSheetData<N> {
    pub fact_sheet: Option<N>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AllFactSheetsData<N> {
    pub all_fact_sheets: Connection<N>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Connection<N> {
    pub page_info: PageInfo,
    pub edges: Vec<Edge<N>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PageInfo {
    pub has_next_page: bool,
    pub end_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Edge<N> {
    pub node: N,
}

impl<N> Connection<N> {
    pub fn into_page<F>(self, mut to_state: F) -> Page
    where
        F: FnMut(N) -> FactSheetState,
    {
        let next = if self.page_info.has_next_page {
            self.page_info.end_cursor
        } else {
            None
        };
        Page {
            states: self.edges.into_iter().map(|edge| to_state(edge.node)).collect(),
            next,
        }
    }
}

/// Executes a document and returns its data, mapping GraphQL errors and
/// missing data to [`ReconcileError::GraphQl`].
pub(crate) async fn query<T, D>(
    client: &LeanIxClient<T>,
    document: &str,
    variables: Value,
) -> Result<D, ReconcileError>
where
    T: Transport,
    D: DeserializeOwned,
{
    let response = client.execute_graphql::<Value>(document, Some(variables)).await?;
    if response.has_errors() {
        let messages: Vec<&str> = response
            .errors
            .iter()
            .flatten()
            .map(|error| error.message.as_str())
            .collect();
        return Err(ReconcileError::GraphQl(messages.join("; ")));
    }
    match response.data {
        Some(Value::Null) | None => Err(ReconcileError::GraphQl("response carried no data".into())),
        Some(data) => serde_json::from_value(data).map_err(ReconcileError::Payload),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn state_needs_update_only_on_difference() {
        let mut state = FactSheetState {
            id: "fs-1".into(),
            name: "CRM".into(),
            rev: Some(3),
            current: Some("operational".into()),
            expected: Some("operational".into()),
        };
        assert!(!state.needs_update());
        state.expected = None;
        assert!(state.needs_update());
        state.current = None;
        assert!(!state.needs_update());
    }

    #[test]
    fn last_page_has_no_cursor() {
        let connection: Connection<Value> = serde_json::from_value(json!({
            "pageInfo": { "hasNextPage": false, "endCursor": "c2" },
            "edges": [{ "node": { "id": "fs-1" } }]
        }))
        .unwrap();
        let page = connection.into_page(|node| FactSheetState {
            id: node["id"].as_str().unwrap().to_string(),
            name: String::new(),
            rev: None,
            current: None,
            expected: None,
        });
        assert_eq!(page.next, None);
        assert_eq!(page.states.len(), 1);
    }
}
