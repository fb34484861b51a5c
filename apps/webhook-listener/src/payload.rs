use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const FACT_SHEET_UPDATED_EVENT: &str = "FactSheetUpdatedEvent";

/// LeanIX webhook delivery body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookPayload {
    #[serde(default)]
    pub id: i64,
    pub transaction_sequence_number: i64,
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub workspace_id: Option<String>,
    #[serde(default)]
    pub fact_sheet: Option<FactSheetRef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactSheetRef {
    pub id: String,
    #[serde(rename = "type")]
    pub fact_sheet_type: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<Value>,
}

impl WebhookPayload {
    /// Fact sheet id when this is an update event for `fact_sheet_type`.
    pub fn updated_fact_sheet(&self, fact_sheet_type: &str) -> Option<&str> {
        if self.event_type != FACT_SHEET_UPDATED_EVENT {
            return None;
        }
        self.fact_sheet
            .as_ref()
            .filter(|fact_sheet| fact_sheet.fact_sheet_type == fact_sheet_type)
            .map(|fact_sheet| fact_sheet.id.as_str())
    }
}
