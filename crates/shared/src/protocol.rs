use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::{CategorySummary, HistoryEntry, SessionId};

pub const DOWNLOAD_FILENAME: &str = "po_classification.json";
pub const DOWNLOAD_CONTENT_TYPE: &str = "application/json";

pub const EMPTY_DESCRIPTION_MESSAGE: &str = "Please enter a PO description.";
pub const MALFORMED_RESPONSE_MESSAGE: &str = "Invalid model response (could not parse JSON).";
pub const CLASSIFIER_UNAVAILABLE_MESSAGE: &str = "Classification service is unavailable.";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSessionResponse {
    pub session_id: SessionId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExamplesResponse {
    pub examples: Vec<String>,
}

/// Partial form update; absent fields keep their current value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateFormRequest {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub supplier: Option<String>,
    #[serde(default)]
    pub debug_raw: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ClassifyOutcome {
    Displayed {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        summary: Option<CategorySummary>,
        result: Value,
    },
    Errored {
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        raw_response: Option<String>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionView {
    pub session_id: SessionId,
    pub description: String,
    pub supplier: String,
    pub debug_raw: bool,
    pub can_classify: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_outcome: Option<ClassifyOutcome>,
    pub history: Vec<HistoryEntry>,
    pub download_available: bool,
}

pub fn session_route(session_id: SessionId) -> String {
    format!("/sessions/{session_id}")
}

pub fn session_page_route(session_id: SessionId) -> String {
    format!("/sessions/{session_id}/page")
}

pub fn download_route(session_id: SessionId) -> String {
    format!("/sessions/{session_id}/download")
}
